use std::fmt;

use crate::location::Location;

/// A single line of preprocessor text with its origin.
///
/// A line may carry a preprocessor error message. Such lines stand in for a
/// directive that could not be resolved, so the enclosing pipeline can report
/// the problem at the right place instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    text: String,
    location: Location,
    error: Option<String>,
}

impl Line {
    pub fn new(text: impl Into<String>, location: Location) -> Self {
        Line {
            text: text.into(),
            location,
            error: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Copy of this line annotated with a preprocessor error.
    pub fn with_error(&self, message: impl Into<String>) -> Line {
        Line {
            text: self.text.clone(),
            location: self.location.clone(),
            error: Some(message.into()),
        }
    }

    /// Copy of this line as seen when replayed by the directive at `anchor`.
    pub fn replayed_at(&self, anchor: &Location) -> Line {
        Line {
            text: self.text.clone(),
            location: self.location.within(anchor),
            error: self.error.clone(),
        }
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
