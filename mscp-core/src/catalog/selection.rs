//! Ordered display mappings

use serde::Serialize;

/// Where a catalog's entries came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// Queried from the remote repository
    Remote,
    /// Scanned from the local clone
    Local,
    /// Static defaults used because discovery produced nothing
    Fallback,
}

impl CatalogSource {
    pub fn is_fallback(self) -> bool {
        self == CatalogSource::Fallback
    }
}

/// One selectable entry: a human label and the value it stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub label: String,
    pub value: String,
}

/// Label -> value mapping that keeps insertion order
///
/// Re-inserting an existing label replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectionMap {
    entries: Vec<Selection>,
}

impl SelectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.label == label) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Selection { label, value }),
        }
    }

    /// Value for a display label
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.value.as_str())
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    /// Entry whose value is `value`
    pub fn find_value(&self, value: &str) -> Option<&Selection> {
        self.entries.iter().find(|e| e.value == value)
    }

    pub fn first(&self) -> Option<&Selection> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selection> {
        self.entries.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L: Into<String>, V: Into<String>> FromIterator<(L, V)> for SelectionMap {
    fn from_iter<I: IntoIterator<Item = (L, V)>>(iter: I) -> Self {
        let mut map = SelectionMap::new();
        for (label, value) in iter {
            map.insert(label, value);
        }
        map
    }
}
