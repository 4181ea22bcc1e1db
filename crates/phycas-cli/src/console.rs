//! Local console commands, prefixed with `:`.

use phycas_session::{SessionModel, SetKind};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConsoleCommand {
    /// Lists the enabled commands.
    Commands,
    /// Prints the labels of a set domain.
    Domain(SetKind),
    /// Prints the sets of a domain in canonical form.
    Sets(SetKind),
    /// Ends the session.
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ConsoleError {
    #[error("unknown console command ':{0}'")]
    UnknownCommand(String),
    #[error("':{command}' needs one of char, tax or tree")]
    MissingDomain { command: &'static str },
    #[error("unknown set domain '{0}'; expected char, tax or tree")]
    UnknownDomain(String),
}

impl ConsoleCommand {
    /// Parses a console line. Returns `None` for lines meant for the backend.
    pub(crate) fn parse(line: &str) -> Option<Result<Self, ConsoleError>> {
        let body = line.trim().strip_prefix(':')?;
        let mut words = body.split_whitespace();
        let name = words.next().unwrap_or_default();
        let argument = words.next();
        Some(match name {
            "commands" => Ok(Self::Commands),
            "domain" => parse_kind("domain", argument).map(Self::Domain),
            "sets" => parse_kind("sets", argument).map(Self::Sets),
            "quit" | "q" => Ok(Self::Quit),
            other => Err(ConsoleError::UnknownCommand(other.to_owned())),
        })
    }

    /// Renders the output of a query command against the model.
    pub(crate) fn render(self, model: &SessionModel) -> Vec<String> {
        match self {
            Self::Commands => model
                .language()
                .enabled_labels()
                .map(str::to_owned)
                .collect(),
            Self::Domain(kind) => vec![model.sets(kind).get_domain().join(" ")],
            Self::Sets(kind) => model
                .sets(kind)
                .sets()
                .iter()
                .map(|set| format!("{} = {}", set.label(), set.member_spec()))
                .collect(),
            Self::Quit => Vec::new(),
        }
    }
}

fn parse_kind(command: &'static str, argument: Option<&str>) -> Result<SetKind, ConsoleError> {
    let name = argument.ok_or(ConsoleError::MissingDomain { command })?;
    SetKind::from_short_name(name).ok_or_else(|| ConsoleError::UnknownDomain(name.to_owned()))
}
