//! Session-scoped state shared between the reader thread and the UI.

use std::sync::{Arc, RwLock};

use crate::language::CommandLanguage;
use crate::sets::{SetKind, SetManager};

/// Handle to the model shared across threads.
pub type SharedModel = Arc<RwLock<SessionModel>>;

/// Everything the backend keeps synchronised on the client side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionModel {
    language: CommandLanguage,
    char_sets: SetManager,
    tax_sets: SetManager,
    tree_sets: SetManager,
}

impl SessionModel {
    /// Creates a model around a command language with empty set tables.
    #[must_use]
    pub fn new(language: CommandLanguage) -> Self {
        Self {
            language,
            ..Self::default()
        }
    }

    /// Wraps the model for sharing.
    #[must_use]
    pub fn into_shared(self) -> SharedModel {
        Arc::new(RwLock::new(self))
    }

    /// The command language.
    #[must_use]
    pub const fn language(&self) -> &CommandLanguage {
        &self.language
    }

    /// The command language, mutably.
    pub const fn language_mut(&mut self) -> &mut CommandLanguage {
        &mut self.language
    }

    /// Set table for a domain.
    #[must_use]
    pub const fn sets(&self, kind: SetKind) -> &SetManager {
        match kind {
            SetKind::Character => &self.char_sets,
            SetKind::Taxon => &self.tax_sets,
            SetKind::Tree => &self.tree_sets,
        }
    }

    /// Set table for a domain, mutably.
    pub const fn sets_mut(&mut self, kind: SetKind) -> &mut SetManager {
        match kind {
            SetKind::Character => &mut self.char_sets,
            SetKind::Taxon => &mut self.tax_sets,
            SetKind::Tree => &mut self.tree_sets,
        }
    }
}
