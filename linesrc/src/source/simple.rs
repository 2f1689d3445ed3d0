use crate::error::SourceError;
use crate::line::Line;
use crate::source::LineSource;

/// Yields a single line carrying an error message, then nothing.
#[derive(Debug)]
pub struct ErrorSource {
    line: Option<Line>,
}

impl ErrorSource {
    pub fn new(line: &Line, message: impl Into<String>) -> Self {
        ErrorSource {
            line: Some(line.with_error(message)),
        }
    }
}

impl LineSource for ErrorSource {
    fn next_line(&mut self) -> Result<Option<Line>, SourceError> {
        Ok(self.line.take())
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.line = None;
        Ok(())
    }
}
