//! Blocking questions the backend asks the user.

use strum::{Display, EnumString};

use crate::xml::Element;

/// Presentation style requested by a `user_query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
pub enum QueryKind {
    /// Choose a file.
    #[strum(serialize = "file")]
    File,
    /// Enter free text.
    #[strum(serialize = "string")]
    Text,
    /// Acknowledge a message.
    #[strum(serialize = "alert")]
    Alert,
    /// Pick one of several labelled choices.
    #[strum(serialize = "choices")]
    Choices,
    /// Confirm with OK or cancel.
    #[strum(serialize = "cancel_ok")]
    ConfirmOkCancel,
    /// Answer yes or no.
    #[strum(serialize = "no_yes")]
    ConfirmYesNo,
}

/// What the user did when presented with a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryAnswer {
    /// Dismissed an informational prompt.
    Acknowledged,
    /// Entered text or chose a path.
    Text(String),
    /// Selected the choice at this index.
    Choice(usize),
    /// Accepted (`true`) or declined (`false`).
    Confirmed(bool),
    /// Closed the prompt without answering.
    Cancelled,
}

/// A parsed `user_query` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    title: String,
    message: String,
    kind: QueryKind,
    choices: Vec<String>,
    default_choice: usize,
}

impl QuerySpec {
    /// Creates a query without choices.
    #[must_use]
    pub fn new(kind: QueryKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            choices: Vec::new(),
            default_choice: 0,
        }
    }

    /// Appends a choice, optionally marking it as the default.
    #[must_use]
    pub fn with_choice(mut self, label: impl Into<String>, is_default: bool) -> Self {
        if is_default {
            self.default_choice = self.choices.len();
        }
        self.choices.push(label.into());
        self
    }

    /// Decodes a `user_query` element.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the `type` attribute is
    /// missing or unknown, or when an unexpected child element is present.
    pub fn from_element(element: &Element) -> Result<Self, String> {
        let kind_name = element
            .attribute("type")
            .ok_or_else(|| String::from("missing type attribute"))?;
        let kind: QueryKind = kind_name
            .parse()
            .map_err(|_| format!("unknown query type '{kind_name}'"))?;

        let mut spec = Self::new(kind, "", "");
        for child in element.children() {
            match child.name() {
                "title" => child.text().trim().clone_into(&mut spec.title),
                "message" => child.text().trim().clone_into(&mut spec.message),
                "choice" => spec = spec.with_choice(child.text().trim(), child.flag("default")),
                other => return Err(format!("unexpected query element '{other}'")),
            }
        }
        Ok(spec)
    }

    /// Dialog title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Prompt text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Presentation style.
    #[must_use]
    pub const fn kind(&self) -> QueryKind {
        self.kind
    }

    /// Choice labels, in wire order.
    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Index of the choice marked as default, zero when none is.
    #[must_use]
    pub const fn default_choice(&self) -> usize {
        self.default_choice
    }

    /// Encodes an answer as the reply line the backend expects.
    ///
    /// `None` means nothing is sent.
    #[must_use]
    pub fn reply(&self, answer: QueryAnswer) -> Option<String> {
        match (self.kind, answer) {
            (QueryKind::File, QueryAnswer::Text(path)) if !path.is_empty() => Some(path),
            (QueryKind::File, _) => Some(String::from("cancel")),
            (QueryKind::Text, QueryAnswer::Text(text)) => Some(text),
            (QueryKind::Text, _) => None,
            (QueryKind::Alert, _) => Some(String::from("1")),
            (QueryKind::Choices, QueryAnswer::Choice(index)) if index < self.choices.len() => {
                Some(index.to_string())
            }
            (QueryKind::Choices, QueryAnswer::Cancelled) => self
                .cancel_choice()
                .map(|index| index.to_string()),
            (QueryKind::Choices, _) => None,
            (QueryKind::ConfirmOkCancel, QueryAnswer::Confirmed(true)) => Some(String::from("0")),
            (QueryKind::ConfirmOkCancel, QueryAnswer::Confirmed(false) | QueryAnswer::Cancelled) => {
                Some(String::from("2"))
            }
            (QueryKind::ConfirmYesNo, QueryAnswer::Confirmed(true)) => Some(String::from("0")),
            (QueryKind::ConfirmYesNo, QueryAnswer::Confirmed(false)) => Some(String::from("1")),
            (QueryKind::ConfirmOkCancel | QueryKind::ConfirmYesNo, _) => None,
        }
    }

    fn cancel_choice(&self) -> Option<usize> {
        self.choices
            .iter()
            .position(|choice| choice.to_ascii_lowercase().contains("cancel"))
    }
}
