#![crate_type = "lib"]
#![crate_name = "bmk"]

//! Bookmark repository and record-lifecycle engine.
//!
//! Persistent state lives in per-collection SQLite databases; records carry
//! relational tags, a deterministic checksum and visit statistics. The crate
//! provides the transactional repository, id compaction, verified backups
//! and at-rest encryption of the database file. Rendering, prompting, HTTP
//! fetching and CLI parsing are collaborator concerns and live elsewhere.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod util;

pub use application::dto::bookmark_json::BookmarkJson;
pub use application::error::{ApplicationError, ApplicationResult};
pub use application::services::{BookmarkService, BookmarkServiceImpl};
pub use config::Settings;
pub use domain::bookmark::Bookmark;
pub use domain::error::{DomainError, DomainResult};
pub use domain::repositories::bookmark_repository::BookmarkRepository;
pub use domain::tag::Tag;
pub use infrastructure::locker::{LockerError, LockerResult};
pub use infrastructure::repositories::sqlite::repository::SqliteBookmarkRepository;
