//! Records and destination keys shared by sources, batches and sinks.

use std::borrow::Cow;
use std::fmt;

// ------------------------------------------------------------------------------------------------
// BatchKey
// ------------------------------------------------------------------------------------------------

/// Names a logical destination inside one data store (a collection, an
/// index, a table).
///
/// Stores with a single destination use one constant key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchKey(Cow<'static, str>);

impl BatchKey {
    /// Creates a key from a static name without allocating.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Returns the destination name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BatchKey {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl From<&str> for BatchKey {
    fn from(name: &str) -> Self {
        Self(Cow::Owned(name.to_owned()))
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ------------------------------------------------------------------------------------------------
// Record
// ------------------------------------------------------------------------------------------------

/// A flattened row or document: an ordered list of string fields.
///
/// Records are immutable once built. By convention the first field is the
/// id of the event that produced the record, which is what the random-read
/// workload looks up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns field `index`, if present.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Record {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Records produced for one logical event, each tagged with its destination.
pub type RecordGroup = Vec<(BatchKey, Record)>;
