use std::collections::HashSet;

/// First-seen-wins index of identity keys already emitted in one crawl.
///
/// Scoped to a single crawl invocation; there is no removal.
#[derive(Debug, Default)]
pub struct DedupeIndex {
    keys: HashSet<String>,
}

impl DedupeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Returns true if the key was newly inserted, false if already seen.
    pub fn insert(&mut self, key: &str) -> bool {
        self.keys.insert(key.to_string())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
