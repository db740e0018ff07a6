use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Identifiers owned by the document root (`0`) and the default layer (`1`).
///
/// These are never renumbered and never appear as table keys.
pub const RESERVED_IDS: [&str; 2] = ["0", "1"];

/// First identifier handed out by a default table, right after the reserved ones.
pub const DEFAULT_FIRST_ID: u64 = 2;

pub fn is_reserved(id: &str) -> bool {
    RESERVED_IDS.contains(&id)
}

/// Ordered mapping from original cell identifiers to their sequential replacements.
///
/// Entries keep the order in which identifiers were first assigned, which is the document order
/// of the cells that introduced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameTable {
    first: u64,
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl Default for RenameTable {
    fn default() -> Self {
        Self::new(DEFAULT_FIRST_ID)
    }
}

impl RenameTable {
    pub fn new(first: u64) -> Self {
        Self {
            first,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn first_id(&self) -> u64 {
        self.first
    }

    /// The identifier the next call to [`RenameTable::assign`] would hand out for a new key.
    pub fn next_id(&self) -> u64 {
        self.first + self.entries.len() as u64
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the replacement for `original`, allocating the next sequential identifier if this
    /// is the first time it is seen.
    pub fn assign(&mut self, original: &str) -> &str {
        let idx = match self.index.get(original) {
            Some(&idx) => idx,
            None => {
                let idx = self.entries.len();
                let new_id = self.next_id().to_string();
                self.entries.push((original.to_string(), new_id));
                self.index.insert(original.to_string(), idx);
                idx
            }
        };
        &self.entries[idx].1
    }

    pub fn contains(&self, original: &str) -> bool {
        self.index.contains_key(original)
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.index
            .get(original)
            .map(|&idx| self.entries[idx].1.as_str())
    }

    /// `(original, replacement)` pairs in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries
            .iter()
            .map(|(old, new)| (old.as_str(), new.as_str()))
    }

    /// Pretty-printed JSON object in assignment order, e.g. `{"a5": "2", "b7": "3"}`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for RenameTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (old, new) in &self.entries {
            map.serialize_entry(old, new)?;
        }
        map.end()
    }
}
