pub mod list;
pub mod reader;
pub mod simple;

use crate::error::SourceError;
use crate::line::Line;

/// A pull-based producer of lines.
///
/// Once `next_line` has returned `Ok(None)` it keeps doing so. `close`
/// releases whatever the source owns (file handles, wrapped sources) and may
/// be called any number of times; a closed source reports exhaustion.
pub trait LineSource {
    fn next_line(&mut self) -> Result<Option<Line>, SourceError>;

    fn close(&mut self) -> Result<(), SourceError>;

    /// Pull every remaining line, discarding it. Returns how many lines were read.
    fn drain(&mut self) -> Result<usize, SourceError> {
        let mut count = 0;
        while self.next_line()?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// Pull every remaining line into a vector.
    fn collect_lines(&mut self) -> Result<Vec<Line>, SourceError> {
        let mut lines = Vec::new();
        while let Some(line) = self.next_line()? {
            lines.push(line);
        }
        Ok(lines)
    }
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn next_line(&mut self) -> Result<Option<Line>, SourceError> {
        (**self).next_line()
    }

    fn close(&mut self) -> Result<(), SourceError> {
        (**self).close()
    }
}
