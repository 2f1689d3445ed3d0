use linesrc::{Line, ListSource, Location};

/// A named, append-only buffer of captured lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sub {
    name: String,
    lines: Vec<Line>,
}

impl Sub {
    pub fn new(name: impl Into<String>) -> Self {
        Sub {
            name: name.into(),
            lines: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Append a line. Only the engine calls this, and only while this block
    /// is its learning target.
    pub(crate) fn append(&mut self, line: Line) {
        self.lines.push(line);
    }

    /// A fresh replay cursor over the lines captured so far. Each call is
    /// independent of the others and of later appends.
    pub fn to_source(&self, anchor: &Location) -> ListSource {
        ListSource::new(self.lines.clone(), anchor.clone())
    }
}
