// bmk/src/domain/bookmark.rs
use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use derive_builder::Builder;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::tag::Tag;
use crate::util::hashing;

/// A bookmark record.
///
/// The tag set is the in-memory source of truth; `formatted_tags` yields the
/// canonical comma-terminated surface form that the checksum and the JSON
/// projection are computed from. Persistence stores tags relationally.
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(setter(into))]
pub struct Bookmark {
    #[builder(default)]
    pub id: Option<i32>,
    pub url: String,
    #[builder(default)]
    pub title: String,
    #[builder(default)]
    pub desc: String,
    #[builder(default)]
    pub notes: String,
    #[builder(default)]
    pub tags: BTreeSet<Tag>,
    #[builder(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[builder(default = "Utc::now()")]
    pub updated_at: DateTime<Utc>,
    #[builder(default)]
    pub last_visit: Option<DateTime<Utc>>,
    #[builder(default)]
    pub visit_count: i32,
    #[builder(default)]
    pub favorite: bool,
    #[builder(default)]
    pub favicon_url: String,
    #[builder(default)]
    pub favicon_local: String,
    #[builder(default)]
    pub archive_url: String,
    #[builder(default)]
    pub archive_timestamp: String,
    #[builder(default)]
    pub checksum: String,
    #[builder(default)]
    pub last_checked: Option<DateTime<Utc>>,
    #[builder(default)]
    pub status_code: i32,
    #[builder(default)]
    pub status_text: String,
    #[builder(default = "true")]
    pub is_active: bool,
}

impl Bookmark {
    /// Create a new record with a freshly computed checksum.
    pub fn new<S: AsRef<str>>(url: S, title: S, desc: S, tags: BTreeSet<Tag>) -> DomainResult<Self> {
        let now = Utc::now();

        let mut bookmark = Self {
            id: None,
            url: url.as_ref().to_string(),
            title: title.as_ref().to_string(),
            desc: desc.as_ref().to_string(),
            notes: String::new(),
            tags,
            created_at: Some(now),
            updated_at: now,
            last_visit: None,
            visit_count: 0,
            favorite: false,
            favicon_url: String::new(),
            favicon_local: String::new(),
            archive_url: String::new(),
            archive_timestamp: String::new(),
            checksum: String::new(),
            last_checked: None,
            status_code: 0,
            status_text: String::new(),
            is_active: true,
        };

        bookmark.validate()?;
        bookmark.update_checksum();
        Ok(bookmark)
    }

    /// Canonical tag surface form (`"go,tag1,test,"`, or the sentinel for an
    /// empty set).
    pub fn formatted_tags(&self) -> String {
        Tag::format_tags(&self.tags)
    }

    /// Checksum over `(url, title, desc, canonical tags)`.
    pub fn compute_checksum(&self) -> String {
        hashing::checksum(&self.url, &self.title, &self.desc, &self.formatted_tags())
    }

    pub fn update_checksum(&mut self) {
        self.checksum = self.compute_checksum();
    }

    /// Validate the record for any write.
    pub fn validate(&self) -> DomainResult<()> {
        if self.url.is_empty() {
            return Err(DomainError::UrlEmpty);
        }
        if self.tags.is_empty() {
            return Err(DomainError::TagsEmpty);
        }
        Ok(())
    }

    /// Validate the record for insertion; the checksum must already be set.
    pub fn validate_for_insert(&self) -> DomainResult<()> {
        self.validate()?;
        if self.checksum.is_empty() {
            return Err(DomainError::ChecksumEmpty);
        }
        Ok(())
    }

    /// Replace all tags, keeping the checksum in step.
    pub fn set_tags(&mut self, tags: BTreeSet<Tag>) {
        self.tags = tags;
        self.updated_at = Utc::now();
        self.update_checksum();
    }

    pub fn add_tag(&mut self, tag: Tag) {
        self.tags.insert(tag);
        self.updated_at = Utc::now();
        self.update_checksum();
    }

    pub fn remove_tag(&mut self, tag: &Tag) -> DomainResult<()> {
        if !self.tags.remove(tag) {
            return Err(DomainError::InvalidTag(format!(
                "tag '{}' not present on record",
                tag
            )));
        }
        self.updated_at = Utc::now();
        self.update_checksum();
        Ok(())
    }

    /// Update title and description.
    pub fn update(&mut self, title: String, desc: String) {
        self.title = title;
        self.desc = desc;
        self.updated_at = Utc::now();
        self.update_checksum();
    }

    /// Record a visit: bump the counter and stamp the visit time.
    pub fn record_visit(&mut self) {
        self.visit_count += 1;
        self.last_visit = Some(Utc::now());
    }

    pub fn set_favorite(&mut self, favorite: bool) {
        self.favorite = favorite;
    }

    pub fn set_id(&mut self, id: i32) {
        self.id = Some(id);
    }

    /// Rebuild a record from its storage row. The tag string may be any
    /// parseable form; it is re-canonicalized on the way in.
    #[allow(clippy::too_many_arguments)]
    pub fn from_storage(
        id: i32,
        url: String,
        title: String,
        desc: String,
        notes: String,
        tag_string: String,
        created_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
        last_visit: Option<DateTime<Utc>>,
        visit_count: i32,
        favorite: bool,
        favicon_url: String,
        favicon_local: String,
        archive_url: String,
        archive_timestamp: String,
        checksum: String,
        last_checked: Option<DateTime<Utc>>,
        status_code: i32,
        status_text: String,
        is_active: bool,
    ) -> DomainResult<Self> {
        let tags = Tag::parse_tags(tag_string)?;

        Ok(Self {
            id: Some(id),
            url,
            title,
            desc,
            notes,
            tags,
            created_at,
            updated_at,
            last_visit,
            visit_count,
            favorite,
            favicon_url,
            favicon_local,
            archive_url,
            archive_timestamp,
            checksum,
            last_checked,
            status_code,
            status_text,
            is_active,
        })
    }
}

impl fmt::Display for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bookmark{{ id: {:?}, url: {}, tags: {} }}",
            self.id,
            self.url,
            self.formatted_tags()
        )
    }
}
