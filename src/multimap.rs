use std::{
    borrow::Borrow,
    collections::{btree_map, BTreeMap},
    fmt::{self, Debug},
};

/// A map whose value contains a set of multiple values. Keys iterate in
/// order.
#[derive(Clone)]
pub struct MultiMap<K, V> {
    inner: BTreeMap<K, Vec<V>>,
}

impl<K: Ord, V: Eq> MultiMap<K, V> {
    pub fn new() -> Self {
        MultiMap {
            inner: BTreeMap::new(),
        }
    }

    pub fn get<Q: ?Sized>(&self, k: &Q) -> &[V]
    where
        K: Borrow<Q>,
        Q: Ord,
    {
        self.inner.get(k).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn insert(&mut self, k: K, v: V) {
        let bucket = self.inner.entry(k).or_default();

        if !bucket.contains(&v) {
            bucket.push(v);
        }
    }

    pub fn remove<Q: ?Sized>(&mut self, k: &Q) -> Vec<V>
    where
        K: Borrow<Q>,
        Q: Ord,
    {
        self.inner.remove(k).unwrap_or_default()
    }

    /// The number of values across every key.
    pub fn len(&self) -> usize {
        self.inner.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Debug, V: Debug> Debug for MultiMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        self.inner.fmt(formatter)
    }
}

impl<K: Ord, V: Eq> PartialEq for MultiMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<K, V> Default for MultiMap<K, V> {
    fn default() -> Self {
        Self {
            inner: Default::default(),
        }
    }
}

impl<K, V> IntoIterator for MultiMap<K, V> {
    type IntoIter = btree_map::IntoIter<K, Vec<V>>;
    type Item = (K, Vec<V>);

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn values_are_deduplicated() {
        let mut map = MultiMap::new();
        map.insert("b", 1);
        map.insert("b", 1);
        map.insert("b", 2);
        map.insert("a", 3);

        assert_eq!(map.get("b"), &[1, 2]);
        assert_eq!(map.len(), 3);

        let keys: Vec<_> = map.clone().into_iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["a", "b"]);

        assert_eq!(map.remove("b"), vec![1, 2]);
        assert!(map.get("b").is_empty());
    }
}
