use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use serde::{Serialize, Serializer};

/// Composite (role, state) key that partitions nearly every hiring metric.
///
/// Kept as two fields rather than a joined string so role or state values that
/// contain a delimiter cannot collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SegmentKey {
    pub role: String,
    pub state: String,
}

impl SegmentKey {
    pub fn new(role: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            state: state.into(),
        }
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.role, self.state)
    }
}

/// Ordered map keyed by segment.
///
/// Serializes as a JSON array of objects with `role` and `state` merged into each value,
/// since JSON object keys cannot carry a composite key.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMap<V>(BTreeMap<SegmentKey, V>);

impl<V> SegmentMap<V> {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, key: SegmentKey, value: V) -> Option<V> {
        self.0.insert(key, value)
    }

    pub fn get(&self, key: &SegmentKey) -> Option<&V> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &SegmentKey) -> Option<&mut V> {
        self.0.get_mut(key)
    }

    pub fn entry(&mut self, key: SegmentKey) -> btree_map::Entry<'_, SegmentKey, V> {
        self.0.entry(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, SegmentKey, V> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for SegmentMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(SegmentKey, V)> for SegmentMap<V> {
    fn from_iter<I: IntoIterator<Item = (SegmentKey, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<V> IntoIterator for SegmentMap<V> {
    type Item = (SegmentKey, V);
    type IntoIter = btree_map::IntoIter<SegmentKey, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<V: Serialize> Serialize for SegmentMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Keyed<'a, V> {
            #[serde(flatten)]
            key: &'a SegmentKey,
            #[serde(flatten)]
            value: &'a V,
        }

        serializer.collect_seq(self.0.iter().map(|(key, value)| Keyed { key, value }))
    }
}
