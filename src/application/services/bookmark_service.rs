// bmk/src/application/services/bookmark_service.rs

use std::collections::HashMap;

use crate::application::dto::bookmark_json::BookmarkJson;
use crate::application::error::ApplicationResult;

/// Stable surface consumed by collaborators (CLI, TUI, import/export).
///
/// The service hides the database model: records cross this boundary as
/// their JSON projection, and the checksum is recomputed here on every write
/// so a caller-supplied checksum is never trusted.
pub trait BookmarkService {
    fn add_bookmark(&self, record: &BookmarkJson) -> ApplicationResult<BookmarkJson>;

    fn add_bookmarks(&self, records: &[BookmarkJson]) -> ApplicationResult<Vec<BookmarkJson>>;

    fn update_bookmark(&self, record: &BookmarkJson) -> ApplicationResult<BookmarkJson>;

    /// Delete the given records, compact ids and reclaim space - three
    /// separate transactions, in that order.
    fn delete_reorder(&self, records: &[BookmarkJson]) -> ApplicationResult<()>;

    fn get_all(&self) -> ApplicationResult<Vec<BookmarkJson>>;

    fn get_by_id(&self, id: i32) -> ApplicationResult<BookmarkJson>;

    fn get_by_ids(&self, ids: &[i32]) -> ApplicationResult<Vec<BookmarkJson>>;

    fn get_by_url(&self, url: &str) -> ApplicationResult<BookmarkJson>;

    fn get_by_tag(&self, tag: &str) -> ApplicationResult<Vec<BookmarkJson>>;

    fn search(&self, query: &str) -> ApplicationResult<Vec<BookmarkJson>>;

    fn get_sorted(&self, column: &str, direction: &str) -> ApplicationResult<Vec<BookmarkJson>>;

    fn set_favorite(&self, url: &str, favorite: bool) -> ApplicationResult<()>;

    fn record_visit(&self, url: &str) -> ApplicationResult<()>;

    fn count_favorites(&self) -> ApplicationResult<i64>;

    fn tag_counts(&self) -> ApplicationResult<HashMap<String, i64>>;
}
