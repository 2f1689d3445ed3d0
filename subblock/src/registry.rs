use std::collections::HashMap;

use crate::sub::Sub;

/// All sub-blocks known to one preprocessing run, indexed by name.
///
/// Entries are created on first reference and never removed, so looking up a
/// name that was never defined yields an empty block rather than an error.
#[derive(Debug, Default)]
pub struct SubRegistry {
    subs: HashMap<String, Sub>,
}

impl SubRegistry {
    pub fn new() -> Self {
        SubRegistry::default()
    }

    pub fn get(&self, name: &str) -> Option<&Sub> {
        self.subs.get(name)
    }

    pub fn get_or_create(&mut self, name: &str) -> &mut Sub {
        self.subs
            .entry(name.to_string())
            .or_insert_with(|| Sub::new(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.subs.contains_key(name)
    }

    /// Blocks sorted by name (for `--list-subs`).
    pub fn sorted(&self) -> Vec<&Sub> {
        let mut subs: Vec<&Sub> = self.subs.values().collect();
        subs.sort_by(|a, b| a.name().cmp(b.name()));
        subs
    }
}
