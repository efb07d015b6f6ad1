// bmk/src/domain/tag.rs
use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;

use crate::domain::error::{DomainError, DomainResult};

/// Surface form for a record without tags. The normalizer emits it for empty
/// input and the parser drops it, so it never reaches the relation table.
pub const NO_TAG: &str = "notag";

/// A single tag as a value object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    value: String,
}

impl Tag {
    /// Creates a new Tag with validation.
    pub fn new<S: AsRef<str>>(value: S) -> DomainResult<Self> {
        let value = value.as_ref().trim().to_lowercase();

        if value.is_empty() {
            return Err(DomainError::InvalidTag("tag cannot be empty".to_string()));
        }

        if value.contains(',') || value.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidTag(
                "tag cannot contain commas or whitespace".to_string(),
            ));
        }

        Ok(Self { value })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Parse free-form text into a sorted set of tags.
    ///
    /// Commas and whitespace are both separators; empty fragments and the
    /// `notag` sentinel are dropped.
    pub fn parse_tags<S: AsRef<str>>(input: S) -> DomainResult<BTreeSet<Tag>> {
        let mut result = BTreeSet::new();

        for fragment in input
            .as_ref()
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case(NO_TAG))
        {
            result.insert(Tag::new(fragment)?);
        }

        Ok(result)
    }

    /// Format a set of tags into the canonical surface form: sorted, deduped,
    /// comma-terminated (`"go,tag1,test,"`). The empty set becomes `notag`.
    pub fn format_tags(tags: &BTreeSet<Tag>) -> String {
        if tags.is_empty() {
            return NO_TAG.to_string();
        }

        let mut formatted = tags.iter().map(|tag| tag.value.as_str()).join(",");
        formatted.push(',');
        formatted
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Canonicalize a free-form tag string.
///
/// Idempotent: `normalize_tag_string(normalize_tag_string(s))` equals
/// `normalize_tag_string(s)`. The output contains no spaces and either equals
/// `notag` or matches `^([^,]+,)+$`.
pub fn normalize_tag_string<S: AsRef<str>>(input: S) -> DomainResult<String> {
    Ok(Tag::format_tags(&Tag::parse_tags(input)?))
}

/// Split a canonical tag string into its tag names, dropping empties and the
/// sentinel. Used for the JSON projection and tag association.
pub fn tag_names(canonical: &str) -> Vec<String> {
    canonical
        .split(',')
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case(NO_TAG))
        .map(str::to_string)
        .collect()
}
