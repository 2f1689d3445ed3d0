use std::fmt;
use std::rc::Rc;

/// Where a line came from: a source description (usually a file path) and a
/// 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub source: Rc<str>,
    pub line: usize,
    /// Location of the directive that caused this line to be produced, if any.
    pub parent: Option<Rc<Location>>,
}

impl Location {
    pub fn new(source: impl Into<Rc<str>>, line: usize) -> Self {
        Location {
            source: source.into(),
            line,
            parent: None,
        }
    }

    /// Replace the include parent of this location.
    pub fn with_parent(mut self, parent: Option<Location>) -> Self {
        self.parent = parent.map(Rc::new);
        self
    }

    /// This location seen through the directive at `anchor`: the anchor is
    /// appended after the outermost parent. A chain that already ends in
    /// `anchor` is left as is.
    pub fn within(&self, anchor: &Location) -> Location {
        let parent = match self.parent.as_deref() {
            Some(parent) if parent == anchor => return self.clone(),
            Some(parent) => parent.within(anchor),
            None => anchor.clone(),
        };
        Location {
            source: Rc::clone(&self.source),
            line: self.line,
            parent: Some(Rc::new(parent)),
        }
    }

    /// Walk the include chain outward, starting with the direct parent.
    pub fn included_from(&self) -> impl Iterator<Item = &Location> {
        std::iter::successors(self.parent.as_deref(), |loc| loc.parent.as_deref())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.line)?;
        for parent in self.included_from() {
            write!(f, " (included from {}:{})", parent.source, parent.line)?;
        }
        Ok(())
    }
}
