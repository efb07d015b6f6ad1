// bmk/src/domain/repositories/bookmark_repository.rs

use std::collections::HashMap;

use crate::domain::bookmark::Bookmark;
use crate::domain::error::DomainResult;

/// Repository contract for bookmark persistence.
///
/// Methods speak in domain terms and hide the relational tag storage: every
/// returned record carries re-canonicalized tags, and every write runs inside
/// a transaction owned by the implementation.
pub trait BookmarkRepository {
    /// All records, id ascending.
    fn all(&self) -> DomainResult<Vec<Bookmark>>;

    /// Single record by id; `RecordNotFound` when missing.
    fn by_id(&self, id: i32) -> DomainResult<Bookmark>;

    /// Records matching the given ids; empty input is `RecordIdNotProvided`.
    fn by_id_list(&self, ids: &[i32]) -> DomainResult<Vec<Bookmark>>;

    /// Single record by exact URL; `RecordNotFound` when missing.
    fn by_url(&self, url: &str) -> DomainResult<Bookmark>;

    /// Records having at least one tag matching `%tag%` (case-insensitive);
    /// each match carries all of its tags, not only the matching one.
    fn by_tag(&self, tag: &str) -> DomainResult<Vec<Bookmark>>;

    /// Records whose id, title, URL, description or any tag matches `%q%`;
    /// `RecordNoMatch` when nothing does.
    fn by_query(&self, query: &str) -> DomainResult<Vec<Bookmark>>;

    /// All records ordered by a whitelisted column and `ASC`/`DESC`;
    /// anything else is `InvalidSortBy`.
    fn by_order(&self, column: &str, direction: &str) -> DomainResult<Vec<Bookmark>>;

    /// Insert a single record; assigns the id unless the record carries one.
    /// A URL collision is `RecordDuplicate`.
    fn insert_one(&self, bookmark: &mut Bookmark) -> DomainResult<()>;

    /// Insert a batch atomically, sorted by id for stability. Any failure
    /// rolls the whole batch back.
    fn insert_many(&self, bookmarks: &mut [Bookmark]) -> DomainResult<()>;

    /// Replace a record in place: delete plus reinsert at the same id, one
    /// transaction.
    fn update(&self, bookmark: &Bookmark) -> DomainResult<()>;

    /// Delete a record by URL. The delete is driven through the relation
    /// table; the cleanup trigger removes the bookmark row and orphan tags.
    fn delete_by_url(&self, url: &str) -> DomainResult<()>;

    /// Delete a batch of records by URL in one statement; empty input is
    /// `RecordIdNotProvided`.
    fn delete_many(&self, bookmarks: &[Bookmark]) -> DomainResult<()>;

    /// Persist the record's favorite flag by URL.
    fn set_favorite(&self, bookmark: &Bookmark) -> DomainResult<()>;

    /// Increment the visit counter and stamp the visit time by URL.
    fn set_visit(&self, bookmark: &Bookmark) -> DomainResult<()>;

    /// Row count of a schema table (`bookmarks`, `tags`, `bookmark_tags`).
    /// A failing count means the data model is broken and is fatal.
    fn count_records_from(&self, table: &str) -> i64;

    /// Number of records flagged favorite.
    fn count_favorites(&self) -> DomainResult<i64>;

    /// Tag name -> reference count; tags with zero references map to 0.
    fn tags_counter(&self) -> DomainResult<HashMap<String, i64>>;

    /// Lookup by URL for callers that only need existence. A failing count
    /// query means the schema invariants are broken and is fatal.
    fn has(&self, url: &str) -> Option<Bookmark>;

    /// Compact ids to a dense 1..N sequence, preserving tag relations.
    fn reorder_ids(&self) -> DomainResult<()>;

    /// Reclaim free space.
    fn vacuum(&self) -> DomainResult<()>;

    /// Highest assigned id, 0 when the table is empty.
    fn max_id(&self) -> DomainResult<i32>;
}
