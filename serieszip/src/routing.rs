use std::collections::HashMap;

/// In-memory hint table mapping metric paths to the backends that last
/// reported owning them.
///
/// Entries are hints, never authoritative: a missing or empty entry widens
/// the fan-out back to every configured backend, and a stale entry corrects
/// itself on the next find that touches the path.
#[derive(Debug, Default)]
pub(crate) struct RoutingTable {
    paths: HashMap<String, Vec<String>>,
}

impl RoutingTable {
    /// Returns the backends believed to hold `path`, or None when the path
    /// is unknown and the caller should ask everyone.
    pub(crate) fn lookup(&self, path: &str) -> Option<Vec<String>> {
        match self.paths.get(path) {
            Some(backends) if !backends.is_empty() => Some(backends.clone()),
            _ => None,
        }
    }

    /// Replaces the entry for every path in `learned`. The latest find is
    /// the most current truth for the paths it observed.
    pub(crate) fn commit(&mut self, learned: HashMap<String, Vec<String>>) {
        for (path, backends) in learned {
            self.paths.insert(path, backends);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.paths.len()
    }
}
