use serde::Serialize;

use std::collections::BTreeSet;

/// The import paths one file must declare.
///
/// A single set is threaded through every nested build of a file so that
/// contributions from arbitrarily deep fields converge. Iteration is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImportSet {
    paths: BTreeSet<String>,
}

impl ImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the path was not already present.
    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        self.paths.insert(path.into())
    }

    pub fn merge(&mut self, other: &ImportSet) {
        self.paths.extend(other.paths.iter().cloned());
    }

    pub fn remove(&mut self, path: &str) -> bool {
        self.paths.remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.paths.iter().cloned().collect()
    }
}

impl<S: Into<String>> Extend<S> for ImportSet {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        for path in iter {
            self.insert(path);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for ImportSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = ImportSet::new();
        set.extend(iter);
        set
    }
}
