use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Keyed access to the corpus partition a dispatch runs over.
pub trait ChunkSource: Send + Sync {
    fn keys(&self) -> Vec<String>;
    fn get(&self, key: &str) -> Option<Arc<str>>;
}

impl ChunkSource for BTreeMap<String, String> {
    fn keys(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }

    fn get(&self, key: &str) -> Option<Arc<str>> {
        BTreeMap::get(self, key).map(|s| Arc::from(s.as_str()))
    }
}

impl<S: std::hash::BuildHasher + Send + Sync> ChunkSource for HashMap<String, String, S> {
    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    fn get(&self, key: &str) -> Option<Arc<str>> {
        HashMap::get(self, key).map(|s| Arc::from(s.as_str()))
    }
}

/// Insertion-ordered chunk map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkMap {
    entries: Vec<(String, Arc<str>)>,
}

impl ChunkMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<Arc<str>>) {
        let key = key.into();
        let text = text.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = text,
            None => self.entries.push((key, text)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

impl ChunkSource for ChunkMap {
    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    fn get(&self, key: &str) -> Option<Arc<str>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

impl<K: Into<String>, V: Into<Arc<str>>> FromIterator<(K, V)> for ChunkMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// A chunk bound to its text for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkAssignment {
    pub key: Arc<str>,
    pub text: Arc<str>,
}

impl ChunkAssignment {
    /// Number of backend operations typing this chunk produces.
    pub fn units(&self) -> u64 {
        count_units(&self.text)
    }
}

/// Characters that become one operation each; carriage returns are dropped.
pub fn count_units(text: &str) -> u64 {
    text.chars().filter(|c| *c != '\r').count() as u64
}

/// Snapshots every chunk of `source` up front so the run works on an immutable assignment list.
pub fn resolve_assignments(source: &dyn ChunkSource) -> Result<Vec<ChunkAssignment>> {
    let keys = source.keys();
    if keys.is_empty() {
        return Err(Error::PartitionLookup("chunk map is empty".to_string()));
    }

    keys.into_iter()
        .map(|key| {
            let text = source
                .get(&key)
                .ok_or_else(|| Error::PartitionLookup(format!("missing chunk `{key}`")))?;
            Ok(ChunkAssignment {
                key: Arc::from(key),
                text,
            })
        })
        .collect()
}

pub fn chunk_key(index: usize) -> String {
    format!("p-{index}")
}

/// Splits `text` on line boundaries into at most `parts` chunks of similar size.
///
/// Keys are `p-0`, `p-1`, ... in corpus order. Empty input yields an empty map.
pub fn partition_corpus(text: &str, parts: usize) -> Result<ChunkMap> {
    if parts == 0 {
        return Err(Error::InvalidParts);
    }

    let mut out = ChunkMap::new();
    if text.is_empty() {
        return Ok(out);
    }

    let target = text.len().div_ceil(parts);
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        current.push_str(line);
        if current.len() >= target && out.len() + 1 < parts {
            out.insert(chunk_key(out.len()), std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        out.insert(chunk_key(out.len()), current);
    }

    Ok(out)
}
