// # SPF Splitter Trait
//
// Defines the interface to the flattening/splitting collaborator: the
// component that turns a zone's authored SPF text into a size-bounded set of
// sub-records linked by includes.
//
// ## Implementations
//
// - Chunking splitter: `spf-splitter` crate

use crate::error::Result;
use async_trait::async_trait;

/// Sentinel plan key denoting the zone apex record
pub const PRIMARY_KEY: &str = "primary";

/// Normalized SPF text for one zone, ready to be split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRecord {
    /// Zone apex name
    pub zone: String,
    /// Full SPF content, starting with the version marker
    pub content: String,
}

/// Desired TXT content per record name, insertion-ordered
///
/// The sentinel key [`PRIMARY_KEY`] denotes the zone apex record; every other
/// key is a fully-qualified sub-domain name. A plan with fewer than two
/// entries is degenerate and must never be applied: either the stub did not
/// need splitting or splitting failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitPlan {
    entries: Vec<(String, String)>,
}

impl SplitPlan {
    /// An empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, replacing any previous entry with the same key
    pub fn insert(&mut self, key: impl Into<String>, content: impl Into<String>) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = content.into();
        } else {
            self.entries.push((key, content.into()));
        }
    }

    /// Total entries, the primary included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the plan has no entries at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fewer than two entries: must not be applied
    pub fn is_degenerate(&self) -> bool {
        self.entries.len() < 2
    }

    /// Content for the zone apex record, if present
    pub fn primary(&self) -> Option<&str> {
        self.get(PRIMARY_KEY)
    }

    /// Content for a given key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All entries in plan order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Non-primary entries in plan order
    pub fn sub_records(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| *k != PRIMARY_KEY)
    }
}

impl FromIterator<(String, String)> for SplitPlan {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut plan = SplitPlan::new();
        for (key, content) in iter {
            plan.insert(key, content);
        }
        plan
    }
}

/// Trait for the SPF flattening/splitting collaborator
///
/// `pattern` is the sub-record naming pattern with `#` as the placeholder for
/// the running number, already suffixed with the zone, e.g.
/// `spf#.example.com`.
#[async_trait]
pub trait SpfSplitter: Send + Sync {
    /// Normalize authored SPF text for one zone
    async fn flatten_from_text(&self, zone: &str, spf_text: &str) -> Result<FlatRecord>;

    /// Partition a flat record into a plan bounded by `max_chars` per record
    async fn split(&self, flat: &FlatRecord, max_chars: usize, pattern: &str)
    -> Result<SplitPlan>;
}
