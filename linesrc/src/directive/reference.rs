/// The target of an `!includesub` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubRef {
    /// A block of the current document: `!includesub name`
    Local(String),
    /// A block defined in another file: `!includesub path!name`
    External { path: String, name: String },
}

impl SubRef {
    /// Split a reference at its first `!` into file path and block name.
    pub fn parse(reference: &str) -> SubRef {
        match reference.split_once('!') {
            Some((path, name)) => SubRef::External {
                path: path.to_string(),
                name: name.to_string(),
            },
            None => SubRef::Local(reference.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SubRef::Local(name) => name,
            SubRef::External { name, .. } => name,
        }
    }
}
