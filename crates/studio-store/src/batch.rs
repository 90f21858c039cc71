//! Write batches and scan ranges.

use std::collections::BTreeMap;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

/// An ordered set of puts that a store applies atomically.
///
/// Puts are applied in insertion order, so a later put to the same key wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBatch {
    puts: Vec<(String, Vec<u8>)>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put of `value` under `key`.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.puts.push((key.into(), value.into()));
        self
    }

    /// Number of queued puts.
    pub fn len(&self) -> usize {
        self.puts.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }

    /// Iterate over the queued puts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.puts.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Keys touched by this batch, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.puts.iter().map(|(k, _)| k.as_str())
    }

    /// Apply every put to an ordered map.
    pub(crate) fn apply_to(self, map: &mut BTreeMap<String, Vec<u8>>) {
        for (key, value) in self.puts {
            map.insert(key, value);
        }
    }
}

/// A selection of keys for a scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyRange {
    /// Every key in the store.
    All,
    /// Keys starting with the given prefix.
    Prefix(String),
    /// Keys in `[start, end)`. An empty bound is unbounded on that side.
    Between { start: String, end: String },
}

impl KeyRange {
    /// Keys starting with `prefix`.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    /// Keys in `[start, end)`; `""` leaves a side open.
    pub fn between(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::Between {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Returns `true` if `key` falls inside this range.
    pub fn contains(&self, key: &str) -> bool {
        match self {
            Self::All => true,
            Self::Prefix(prefix) => key.starts_with(prefix.as_str()),
            Self::Between { start, end } => {
                key >= start.as_str() && (end.is_empty() || key < end.as_str())
            }
        }
    }

    /// Collect matching entries from an ordered map, in key order.
    pub(crate) fn collect_from(&self, map: &BTreeMap<String, Vec<u8>>) -> Vec<(String, Vec<u8>)> {
        let lower = match self {
            Self::All => Bound::Unbounded,
            Self::Prefix(prefix) => Bound::Included(prefix.as_str()),
            Self::Between { start, .. } if start.is_empty() => Bound::Unbounded,
            Self::Between { start, .. } => Bound::Included(start.as_str()),
        };

        map.range::<str, _>((lower, Bound::Unbounded))
            .take_while(|(key, _)| match self {
                Self::All => true,
                Self::Prefix(prefix) => key.starts_with(prefix.as_str()),
                Self::Between { end, .. } => end.is_empty() || key.as_str() < end.as_str(),
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BTreeMap<String, Vec<u8>> {
        ["alpha", "beta", "betamax", "gamma"]
            .into_iter()
            .map(|k| (k.to_string(), k.as_bytes().to_vec()))
            .collect()
    }

    fn keys(entries: Vec<(String, Vec<u8>)>) -> Vec<String> {
        entries.into_iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn later_put_to_same_key_wins() {
        let mut batch = WriteBatch::new();
        batch.put("k", b"first".to_vec()).put("k", b"second".to_vec());
        assert_eq!(batch.len(), 2);

        let mut map = BTreeMap::new();
        batch.apply_to(&mut map);
        assert_eq!(map.get("k").unwrap(), b"second");
    }

    #[test]
    fn prefix_scan_stops_at_first_mismatch() {
        let got = keys(KeyRange::prefix("beta").collect_from(&sample()));
        assert_eq!(got, vec!["beta", "betamax"]);
    }

    #[test]
    fn between_is_half_open() {
        let got = keys(KeyRange::between("beta", "gamma").collect_from(&sample()));
        assert_eq!(got, vec!["beta", "betamax"]);
    }

    #[test]
    fn empty_bounds_are_unbounded() {
        let got = keys(KeyRange::between("", "").collect_from(&sample()));
        assert_eq!(got.len(), 4);
        assert_eq!(got, keys(KeyRange::All.collect_from(&sample())));
    }

    #[test]
    fn contains_agrees_with_collect() {
        let map = sample();
        for range in [
            KeyRange::All,
            KeyRange::prefix("be"),
            KeyRange::between("b", "c"),
            KeyRange::between("", "beta"),
        ] {
            let expected: Vec<_> = map.keys().filter(|k| range.contains(k)).cloned().collect();
            assert_eq!(keys(range.collect_from(&map)), expected);
        }
    }
}
