//! Reconciles a command state snapshot with the resident command language.
//!
//! Synchronisation first disables every command, then re-enables those the
//! backend reports as available and walks their parameters. Unavailable
//! parameters are disabled without touching their values. Available ones
//! have their state-side description copied through the translation table
//! in [`translate`]. Failures are collected per parameter and never abort the
//! pass.

pub mod translate;

use thiserror::Error;
use tracing::{debug, warn};

pub use translate::{BoundIndex, BoundSide, Translation, TranslationError, translation_for};

use crate::language::{
    CmdParam, CommandLanguage, LanguageCommand, LanguageShape, LanguageTypeInfo,
};
use crate::model::SessionModel;
use crate::sets::{SetKind, SetMergeError};
use crate::state::{CommandState, CommandStateModel, ParamState, StateShape, StateTypeInfo};

pub(crate) const SYNC_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::sync");

/// A non-fatal problem found while synchronising one parameter or set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// No language parameter matches the state parameter.
    #[error("command {command}, param {param} not processed: no matching parameter")]
    UnmatchedParam {
        /// Command label.
        command: String,
        /// Parameter label or placement.
        param: String,
    },
    /// The shapes on either side have no translation.
    #[error(
        "command {command}, param {param} not processed: no translation from {state:?} to {language:?}"
    )]
    NoTranslation {
        /// Command label.
        command: String,
        /// Parameter label or placement.
        param: String,
        /// State-side shape.
        state: StateShape,
        /// Language-side shape.
        language: LanguageShape,
    },
    /// The translation rejected a value.
    #[error("command {command}, param {param} not processed: {source}")]
    Translation {
        /// Command label.
        command: String,
        /// Parameter label or placement.
        param: String,
        /// What went wrong.
        #[source]
        source: TranslationError,
    },
    /// A set snapshot carried unparsable members.
    #[error("{} sets: {source}", .kind.short_name())]
    InvalidSetMembers {
        /// Domain of the set.
        kind: SetKind,
        /// What went wrong.
        #[source]
        source: SetMergeError,
    },
}

/// Outcome of one synchronisation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    enabled_commands: Vec<String>,
    unknown_commands: Vec<String>,
    processed_params: usize,
    errors: Vec<SyncError>,
}

impl SyncReport {
    /// Labels of commands enabled by the pass.
    #[must_use]
    pub fn enabled_commands(&self) -> &[String] {
        &self.enabled_commands
    }

    /// Available commands the registry does not know.
    #[must_use]
    pub fn unknown_commands(&self) -> &[String] {
        &self.unknown_commands
    }

    /// Number of parameters applied without error.
    #[must_use]
    pub const fn processed_params(&self) -> usize {
        self.processed_params
    }

    /// Problems skipped during the pass.
    #[must_use]
    pub fn errors(&self) -> &[SyncError] {
        &self.errors
    }

    /// Returns `true` when nothing was skipped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, error: SyncError) {
        warn!(target: SYNC_TARGET, %error, "command state entry skipped");
        self.errors.push(error);
    }
}

/// Where a state parameter landed in a language command.
enum Location {
    Direct(usize),
    Mixed {
        index: usize,
        candidates: Vec<usize>,
    },
}

/// Applies command state snapshots to the resident model.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateSyncEngine;

impl StateSyncEngine {
    /// Creates an engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies a snapshot to the language and the indexed-set tables.
    pub fn synchronize(&self, state: &CommandStateModel, model: &mut SessionModel) -> SyncReport {
        let mut report = self.synchronize_language(state, model.language_mut());
        for (kind, snapshot) in state.set_snapshots() {
            for source in model.sets_mut(*kind).merge_snapshot(snapshot) {
                report.record(SyncError::InvalidSetMembers {
                    kind: *kind,
                    source,
                });
            }
        }
        report
    }

    /// Applies availability and values to the language only.
    pub fn synchronize_language(
        &self,
        state: &CommandStateModel,
        language: &mut CommandLanguage,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        language.disable_all();
        for command_state in state.commands() {
            if !command_state.available() {
                continue;
            }
            let Some(command) = language.get_mut(command_state.label()) else {
                debug!(
                    target: SYNC_TARGET,
                    command = command_state.label(),
                    "available command is not registered"
                );
                report
                    .unknown_commands
                    .push(command_state.label().to_owned());
                continue;
            };
            command.set_enabled(true);
            report.enabled_commands.push(command_state.label().to_owned());

            let bounds = BoundIndex::capture(command, command_state);
            for param_state in command_state.params() {
                match sync_param(command, command_state, param_state, &bounds) {
                    Ok(()) => report.processed_params += 1,
                    Err(error) => report.record(error),
                }
            }
        }
        debug!(
            target: SYNC_TARGET,
            enabled = report.enabled_commands.len(),
            processed = report.processed_params,
            skipped = report.errors.len(),
            "command state applied"
        );
        report
    }
}

fn sync_param(
    command: &mut LanguageCommand,
    command_state: &CommandState,
    param_state: &ParamState,
    bounds: &BoundIndex,
) -> Result<(), SyncError> {
    let unmatched = || SyncError::UnmatchedParam {
        command: command_state.label().to_owned(),
        param: param_state.display_name(),
    };
    let location = locate(command.params(), param_state).ok_or_else(unmatched)?;
    let index = match &location {
        Location::Direct(index) | Location::Mixed { index, .. } => *index,
    };
    let param = command.params_mut().get_mut(index).ok_or_else(unmatched)?;

    if !param_state.available() {
        param.set_enabled(false);
        return Ok(());
    }
    param.set_enabled(true);
    let Some(info) = param_state.type_info() else {
        return Ok(());
    };

    let context = |source: TranslationError| SyncError::Translation {
        command: command_state.label().to_owned(),
        param: param_state.display_name(),
        source,
    };
    let untranslatable = |language| SyncError::NoTranslation {
        command: command_state.label().to_owned(),
        param: param_state.display_name(),
        state: info.shape(),
        language,
    };

    match location {
        Location::Direct(_) => {
            let target = param.type_info_mut();
            let translation = translation_for(info.shape(), target.shape())
                .ok_or_else(|| untranslatable(target.shape()))?;
            translation(info, target, bounds).map_err(context)
        }
        Location::Mixed { candidates, .. } => {
            let LanguageTypeInfo::Mixed {
                alternatives,
                active,
            } = param.type_info_mut()
            else {
                return Err(untranslatable(LanguageShape::Mixed));
            };
            apply_to_alternative(info, alternatives, active, &candidates, bounds)
                .ok_or_else(|| untranslatable(LanguageShape::Mixed))?
                .map_err(context)
        }
    }
}

/// Applies the first candidate alternative with a translation and marks it
/// active. Returns `None` when no candidate accepts the state shape.
fn apply_to_alternative(
    info: &StateTypeInfo,
    alternatives: &mut [CmdParam],
    active: &mut Option<usize>,
    candidates: &[usize],
    bounds: &BoundIndex,
) -> Option<Result<(), TranslationError>> {
    candidates.iter().find_map(|&candidate| {
        let alternative = alternatives.get_mut(candidate)?;
        let translation = translation_for(info.shape(), alternative.type_info().shape())?;
        *active = Some(candidate);
        alternative.set_enabled(true);
        Some(translation(info, alternative.type_info_mut(), bounds))
    })
}

fn locate(params: &[CmdParam], param_state: &ParamState) -> Option<Location> {
    let (label, placement) = (param_state.label(), param_state.placement());
    params.iter().enumerate().find_map(|(index, param)| {
        let LanguageTypeInfo::Mixed { alternatives, .. } = param.type_info() else {
            return param.matches(label, placement).then_some(Location::Direct(index));
        };
        let matching: Vec<usize> = alternatives
            .iter()
            .enumerate()
            .filter(|(_, alternative)| alternative.matches(label, placement))
            .map(|(position, _)| position)
            .collect();
        if !matching.is_empty() {
            Some(Location::Mixed {
                index,
                candidates: matching,
            })
        } else if param.matches(label, placement) {
            Some(Location::Mixed {
                index,
                candidates: (0..alternatives.len()).collect(),
            })
        } else {
            None
        }
    })
}
