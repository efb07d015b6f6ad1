// bmk/src/application/dto/bookmark_json.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::bookmark::Bookmark;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::tag::{self, Tag};
use crate::util::hashing;

/// JSON projection of a bookmark exchanged with import/export collaborators.
///
/// Tags travel as an ordered list of non-empty names (the sentinel never
/// appears); timestamps are RFC 3339 strings. A record that came out of
/// `from_domain` converts back to an identical projection, so the round trip
/// through the domain interface is a fixed point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkJson {
    #[serde(default)]
    pub id: Option<i32>,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub last_visit: Option<String>,
    #[serde(default)]
    pub visit_count: i32,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub favicon_url: String,
    #[serde(default)]
    pub favicon_local: String,
    #[serde(default)]
    pub archive_url: String,
    #[serde(default)]
    pub archive_timestamp: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub last_checked: Option<String>,
    #[serde(default)]
    pub status_code: i32,
    #[serde(default)]
    pub status_text: String,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_is_active() -> bool {
    true
}

impl BookmarkJson {
    pub fn from_domain(bookmark: &Bookmark) -> Self {
        Self {
            id: bookmark.id,
            url: bookmark.url.clone(),
            title: bookmark.title.clone(),
            desc: bookmark.desc.clone(),
            notes: bookmark.notes.clone(),
            tags: tag::tag_names(&bookmark.formatted_tags()),
            created_at: bookmark.created_at.map(|ts| ts.to_rfc3339()),
            updated_at: Some(bookmark.updated_at.to_rfc3339()),
            last_visit: bookmark.last_visit.map(|ts| ts.to_rfc3339()),
            visit_count: bookmark.visit_count,
            favorite: bookmark.favorite,
            favicon_url: bookmark.favicon_url.clone(),
            favicon_local: bookmark.favicon_local.clone(),
            archive_url: bookmark.archive_url.clone(),
            archive_timestamp: bookmark.archive_timestamp.clone(),
            checksum: bookmark.checksum.clone(),
            last_checked: bookmark.last_checked.map(|ts| ts.to_rfc3339()),
            status_code: bookmark.status_code,
            status_text: bookmark.status_text.clone(),
            is_active: bookmark.is_active,
        }
    }

    pub fn from_domain_collection(bookmarks: &[Bookmark]) -> Vec<Self> {
        bookmarks.iter().map(Self::from_domain).collect()
    }

    /// Convert to the domain entity; tags are re-canonicalized on the way in.
    pub fn to_domain(&self) -> DomainResult<Bookmark> {
        let tags = Tag::parse_tags(self.tags.join(","))?;

        Ok(Bookmark {
            id: self.id,
            url: self.url.clone(),
            title: self.title.clone(),
            desc: self.desc.clone(),
            notes: self.notes.clone(),
            tags,
            created_at: parse_rfc3339(self.created_at.as_deref())?,
            updated_at: parse_rfc3339(self.updated_at.as_deref())?.unwrap_or_else(Utc::now),
            last_visit: parse_rfc3339(self.last_visit.as_deref())?,
            visit_count: self.visit_count,
            favorite: self.favorite,
            favicon_url: self.favicon_url.clone(),
            favicon_local: self.favicon_local.clone(),
            archive_url: self.archive_url.clone(),
            archive_timestamp: self.archive_timestamp.clone(),
            checksum: self.checksum.clone(),
            last_checked: parse_rfc3339(self.last_checked.as_deref())?,
            status_code: self.status_code,
            status_text: self.status_text.clone(),
            is_active: self.is_active,
        })
    }

    /// Canonical tag form of the projection's tag list.
    pub fn canonical_tags(&self) -> DomainResult<String> {
        tag::normalize_tag_string(self.tags.join(","))
    }

    /// Recompute the checksum from the projection and compare. Detects
    /// records tampered with outside this system.
    pub fn validate_checksum(&self) -> DomainResult<bool> {
        let canonical = self.canonical_tags()?;
        let expected = hashing::checksum(&self.url, &self.title, &self.desc, &canonical);
        Ok(expected == self.checksum)
    }
}

fn parse_rfc3339(value: Option<&str>) -> DomainResult<Option<DateTime<Utc>>> {
    match value {
        None => Ok(None),
        Some("") => Ok(None),
        Some(ts) => DateTime::parse_from_rfc3339(ts)
            .map(|parsed| Some(parsed.with_timezone(&Utc)))
            .map_err(|e| DomainError::RecordScan(format!("bad timestamp '{}': {}", ts, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bookmark {
        Bookmark::new(
            "https://example.com",
            "Example",
            "A sample record",
            Tag::parse_tags("go,test").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_projection_emits_tag_list_without_sentinel() {
        let json = BookmarkJson::from_domain(&sample());
        assert_eq!(json.tags, vec!["go", "test"]);
    }

    #[test]
    fn test_checksum_validates_for_untampered_record() {
        let json = BookmarkJson::from_domain(&sample());
        assert!(json.validate_checksum().unwrap());
    }

    #[test]
    fn test_checksum_detects_tampering() {
        let mut json = BookmarkJson::from_domain(&sample());
        json.title.push_str(" (edited)");
        assert!(!json.validate_checksum().unwrap());

        let mut json = BookmarkJson::from_domain(&sample());
        json.tags.push("sneaky".to_string());
        assert!(!json.validate_checksum().unwrap());
    }

    #[test]
    fn test_round_trip_is_fixed_point() {
        let bookmark = sample();
        let json = BookmarkJson::from_domain(&bookmark);
        let back = json.to_domain().unwrap();
        let again = BookmarkJson::from_domain(&back);
        assert_eq!(json, again);
    }

    #[test]
    fn test_serde_round_trip() {
        let json = BookmarkJson::from_domain(&sample());
        let text = serde_json::to_string(&json).unwrap();
        let parsed: BookmarkJson = serde_json::from_str(&text).unwrap();
        assert_eq!(json, parsed);
    }

    #[test]
    fn test_minimal_json_deserializes_with_defaults() {
        let parsed: BookmarkJson =
            serde_json::from_str(r#"{"url": "https://example.com", "tags": ["a"]}"#).unwrap();
        assert!(parsed.is_active);
        assert_eq!(parsed.visit_count, 0);
        assert!(parsed.checksum.is_empty());
    }

    #[test]
    fn test_bad_timestamp_is_a_scan_error() {
        let mut json = BookmarkJson::from_domain(&sample());
        json.created_at = Some("not-a-timestamp".to_string());
        assert!(matches!(
            json.to_domain(),
            Err(DomainError::RecordScan(_))
        ));
    }
}
