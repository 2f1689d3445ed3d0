use crate::error::SourceError;
use crate::line::Line;
use crate::location::Location;
use crate::source::LineSource;

/// Replays a fixed list of lines, each re-anchored at the directive that
/// requested the replay.
#[derive(Debug)]
pub struct ListSource {
    lines: std::vec::IntoIter<Line>,
    anchor: Location,
}

impl ListSource {
    pub fn new(lines: Vec<Line>, anchor: Location) -> Self {
        ListSource {
            lines: lines.into_iter(),
            anchor,
        }
    }

    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineSource for ListSource {
    fn next_line(&mut self) -> Result<Option<Line>, SourceError> {
        Ok(self.lines.next().map(|line| line.replayed_at(&self.anchor)))
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.lines = Vec::new().into_iter();
        Ok(())
    }
}
