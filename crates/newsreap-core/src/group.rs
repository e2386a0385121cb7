//! Newsgroup name handling
//!
//! Group names compare and store in one normalized form; [`Group::normalize`]
//! is the single entry point for comparison and membership checks.

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};

/// A normalized newsgroup name.
///
/// Construction always normalizes, so two `Group` values compare equal iff
/// their normalized names do. `Borrow<str>` allows lookups in a
/// `BTreeSet<Group>` with a plain `&str`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Group(String);

impl Group {
    /// Create a group from a raw name, normalizing it first.
    pub fn new(name: &str) -> Result<Self> {
        Self::normalize(name)
            .map(Group)
            .ok_or_else(|| Error::InvalidGroup(name.to_string()))
    }

    /// Normalize a group identifier.
    ///
    /// Characters outside `[A-Za-z0-9.-]` are stripped, the remainder is
    /// lowercased, consecutive dots collapse into one and leading/trailing
    /// dots are dropped. Returns `None` when nothing valid remains.
    ///
    /// Normalization is idempotent: `normalize(normalize(g)) == normalize(g)`.
    pub fn normalize(name: &str) -> Option<String> {
        let mut out = String::with_capacity(name.len());
        for c in name.chars() {
            match c {
                'a'..='z' | '0'..='9' | '-' => out.push(c),
                'A'..='Z' => out.push(c.to_ascii_lowercase()),
                '.' => {
                    if !out.is_empty() && !out.ends_with('.') {
                        out.push('.');
                    }
                }
                _ => {}
            }
        }
        while out.ends_with('.') {
            out.pop();
        }

        if out.is_empty() { None } else { Some(out) }
    }

    /// Split a string naming one or more groups (any non-name character is a
    /// separator) into a normalized set. Unsalvageable tokens are dropped.
    pub fn split(groups: &str) -> BTreeSet<Group> {
        groups
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '.' || c == '-'))
            .filter_map(|token| Group::new(token).ok())
            .collect()
    }

    /// The normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Group {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
