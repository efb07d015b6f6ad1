// bmk/src/infrastructure/repositories/sqlite/repository.rs

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Integer, Text};
use itertools::Itertools;
use tracing::{debug, instrument};

use super::connection::{self, ConnectionPool, PooledConnection};
use super::error::{SqliteRepositoryError, SqliteResult};
use super::schema::bookmark_tags::dsl as bt;
use super::schema::bookmarks::dsl as b;
use super::schema::tags::dsl as t;
use crate::domain::bookmark::Bookmark;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::repositories::bookmark_repository::BookmarkRepository;
use crate::domain::tag::Tag;

/// Joined read shape: every bookmark column plus the aggregated tag names.
/// Tags are re-canonicalized before leaving the repository, so the arbitrary
/// GROUP_CONCAT order never reaches callers.
pub(crate) const SELECT_WITH_TAGS: &str = "
SELECT b.id, b.url, b.title, b.desc, b.notes,
       b.created_at, b.updated_at, b.last_visit,
       b.visit_count, b.favorite,
       b.favicon_url, b.favicon_local, b.archive_url, b.archive_timestamp,
       b.checksum, b.last_checked, b.status_code, b.status_text, b.is_active,
       COALESCE(GROUP_CONCAT(t.name, ','), '') AS tags
  FROM bookmarks b
  LEFT JOIN bookmark_tags bt ON bt.bookmark_url = b.url
  LEFT JOIN tags t ON t.id = bt.tag_id";

const TAGS_COUNTER: &str = "
SELECT t.name AS name, COUNT(bt.tag_id) AS n
  FROM tags t
  LEFT JOIN bookmark_tags bt ON bt.tag_id = t.id
 GROUP BY t.id, t.name";

/// SQLite implementation of the bookmark repository.
#[derive(Clone)]
pub struct SqliteBookmarkRepository {
    pool: ConnectionPool,
    path: PathBuf,
}

impl SqliteBookmarkRepository {
    /// Open an existing database; fails with `DbNotFound` when the file is
    /// missing.
    pub fn open<P: AsRef<Path>>(path: P) -> DomainResult<Self> {
        let path = path.as_ref().to_path_buf();
        let pool = connection::open_pool(&path.to_string_lossy()).map_err(DomainError::from)?;
        Ok(Self { pool, path })
    }

    /// Create a fresh database with the full schema; fails with `DbExists`
    /// when the file is already there.
    pub fn create<P: AsRef<Path>>(path: P) -> DomainResult<Self> {
        let path = path.as_ref().to_path_buf();
        let pool = connection::create_pool(&path.to_string_lossy()).map_err(DomainError::from)?;
        Ok(Self { pool, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Database file name, e.g. `bookmarks.db`.
    pub fn db_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub(crate) fn get_connection(&self) -> SqliteResult<PooledConnection> {
        self.pool
            .get()
            .map_err(|e| SqliteRepositoryError::ConnectionPoolError(e.to_string()))
    }

    /// Run `f` inside one immediate transaction. An error from `f` rolls
    /// back and is surfaced unchanged; a failing commit surfaces as the
    /// `Commit` kind. Nested helpers take the open connection instead of
    /// starting their own transaction.
    pub(crate) fn with_tx<T, F>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> SqliteResult<T>,
    {
        let mut conn = self.get_connection()?;
        conn.immediate_transaction(f)
    }

    /// Verify the database file on a fresh handle.
    pub fn check_integrity(&self) -> DomainResult<()> {
        connection::check_integrity(&self.path.to_string_lossy()).map_err(DomainError::from)
    }

    /// `VACUUM INTO` a snapshot at `dest`; atomic and WAL-independent.
    pub fn vacuum_into(&self, dest: &Path) -> DomainResult<()> {
        let mut conn = self.get_connection().map_err(DomainError::from)?;
        let dest_sql = dest.to_string_lossy().replace('\'', "''");
        sql_query(format!("VACUUM INTO '{}'", dest_sql))
            .execute(&mut conn)
            .map_err(|e| DomainError::from(SqliteRepositoryError::from(e)))?;
        Ok(())
    }

    // --- transaction-scoped helpers -------------------------------------

    pub(crate) fn insert_one_tx(
        conn: &mut SqliteConnection,
        bookmark: &mut Bookmark,
    ) -> SqliteResult<()> {
        if bookmark.checksum.is_empty() {
            bookmark.update_checksum();
        }
        bookmark
            .validate_for_insert()
            .map_err(SqliteRepositoryError::Domain)?;

        let existing: i64 = b::bookmarks
            .filter(b::url.eq(&bookmark.url))
            .count()
            .get_result(conn)?;
        if existing > 0 {
            return Err(SqliteRepositoryError::Domain(DomainError::RecordDuplicate(
                bookmark.url.clone(),
            )));
        }

        let created_at = bookmark
            .created_at
            .unwrap_or_else(Utc::now)
            .to_rfc3339();
        let updated_at = bookmark.updated_at.to_rfc3339();
        let last_visit = bookmark
            .last_visit
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_default();
        let last_checked = bookmark
            .last_checked
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_default();

        let values = (
            b::url.eq(&bookmark.url),
            b::title.eq(&bookmark.title),
            b::desc.eq(&bookmark.desc),
            b::notes.eq(&bookmark.notes),
            b::created_at.eq(&created_at),
            b::updated_at.eq(&updated_at),
            b::last_visit.eq(&last_visit),
            b::visit_count.eq(bookmark.visit_count),
            b::favorite.eq(bookmark.favorite),
            b::favicon_url.eq(&bookmark.favicon_url),
            b::favicon_local.eq(&bookmark.favicon_local),
            b::archive_url.eq(&bookmark.archive_url),
            b::archive_timestamp.eq(&bookmark.archive_timestamp),
            b::checksum.eq(&bookmark.checksum),
            b::last_checked.eq(&last_checked),
            b::status_code.eq(bookmark.status_code),
            b::status_text.eq(&bookmark.status_text),
            b::is_active.eq(bookmark.is_active),
        );

        let assigned_id = match bookmark.id {
            // Caller-preserved id (update path, imports keeping their ids).
            Some(id) => {
                diesel::insert_into(b::bookmarks)
                    .values((b::id.eq(id), values.clone()))
                    .execute(conn)?;
                id
            }
            None => diesel::insert_into(b::bookmarks)
                .values(values)
                .returning(b::id)
                .get_result::<i32>(conn)?,
        };
        bookmark.set_id(assigned_id);

        Self::associate_tags_tx(conn, &bookmark.url, &bookmark.tags)
    }

    /// Delete through the relation table only; the cleanup trigger removes
    /// the bookmark row and any orphaned tags.
    pub(crate) fn delete_by_url_tx(conn: &mut SqliteConnection, url: &str) -> SqliteResult<()> {
        let deleted =
            diesel::delete(bt::bookmark_tags.filter(bt::bookmark_url.eq(url))).execute(conn)?;
        if deleted == 0 {
            return Err(SqliteRepositoryError::Domain(DomainError::RecordNotFound(
                url.to_string(),
            )));
        }
        debug!("deleted {} relation rows for {}", deleted, url);
        Ok(())
    }

    pub(crate) fn get_or_create_tag_tx(
        conn: &mut SqliteConnection,
        name: &str,
    ) -> SqliteResult<i32> {
        diesel::insert_or_ignore_into(t::tags)
            .values(t::name.eq(name))
            .execute(conn)?;
        let tag_id = t::tags
            .filter(t::name.eq(name))
            .select(t::id)
            .first::<i32>(conn)?;
        Ok(tag_id)
    }

    pub(crate) fn associate_tags_tx(
        conn: &mut SqliteConnection,
        url: &str,
        tags: &BTreeSet<Tag>,
    ) -> SqliteResult<()> {
        for tag in tags {
            let tag_id = Self::get_or_create_tag_tx(conn, tag.value())?;
            diesel::insert_or_ignore_into(bt::bookmark_tags)
                .values((bt::bookmark_url.eq(url), bt::tag_id.eq(tag_id)))
                .execute(conn)?;
        }
        Ok(())
    }

    /// Snapshot every record with canonical tags, id ascending. Used by the
    /// read paths and the reorder engine (inside its transaction).
    pub(crate) fn load_all_tx(conn: &mut SqliteConnection) -> SqliteResult<Vec<Bookmark>> {
        let rows: Vec<BookmarkRow> =
            sql_query(format!("{} GROUP BY b.id ORDER BY b.id ASC", SELECT_WITH_TAGS))
                .load(conn)?;
        rows.into_iter().map(to_domain).collect()
    }

    pub(crate) fn max_id_tx(conn: &mut SqliteConnection) -> SqliteResult<i32> {
        let max: Option<i32> = b::bookmarks
            .select(diesel::dsl::max(b::id))
            .first(conn)?;
        Ok(max.unwrap_or(0))
    }
}

impl BookmarkRepository for SqliteBookmarkRepository {
    #[instrument(skip(self), level = "trace")]
    fn all(&self) -> DomainResult<Vec<Bookmark>> {
        let mut conn = self.get_connection().map_err(DomainError::from)?;
        Self::load_all_tx(&mut conn).map_err(DomainError::from)
    }

    #[instrument(skip(self), level = "trace")]
    fn by_id(&self, id: i32) -> DomainResult<Bookmark> {
        let mut conn = self.get_connection().map_err(DomainError::from)?;

        let mut rows: Vec<BookmarkRow> =
            sql_query(format!("{} WHERE b.id = ? GROUP BY b.id", SELECT_WITH_TAGS))
                .bind::<Integer, _>(id)
                .load(&mut conn)
                .map_err(|e| DomainError::from(SqliteRepositoryError::from(e)))?;

        match rows.pop() {
            Some(row) => to_domain(row).map_err(DomainError::from),
            None => Err(DomainError::RecordNotFound(format!("id {}", id))),
        }
    }

    fn by_id_list(&self, ids: &[i32]) -> DomainResult<Vec<Bookmark>> {
        if ids.is_empty() {
            return Err(DomainError::RecordIdNotProvided);
        }
        let mut conn = self.get_connection().map_err(DomainError::from)?;

        // ids are integers; inlining them keeps the statement bindable for
        // any list length.
        let id_list = ids.iter().join(",");
        let rows: Vec<BookmarkRow> = sql_query(format!(
            "{} WHERE b.id IN ({}) GROUP BY b.id ORDER BY b.id ASC",
            SELECT_WITH_TAGS, id_list
        ))
        .load(&mut conn)
        .map_err(|e| DomainError::from(SqliteRepositoryError::from(e)))?;

        rows.into_iter()
            .map(|row| to_domain(row).map_err(DomainError::from))
            .collect()
    }

    #[instrument(skip(self), level = "trace")]
    fn by_url(&self, url: &str) -> DomainResult<Bookmark> {
        let mut conn = self.get_connection().map_err(DomainError::from)?;

        let mut rows: Vec<BookmarkRow> =
            sql_query(format!("{} WHERE b.url = ? GROUP BY b.id", SELECT_WITH_TAGS))
                .bind::<Text, _>(url)
                .load(&mut conn)
                .map_err(|e| DomainError::from(SqliteRepositoryError::from(e)))?;

        match rows.pop() {
            Some(row) => to_domain(row).map_err(DomainError::from),
            None => Err(DomainError::RecordNotFound(url.to_string())),
        }
    }

    fn by_tag(&self, tag: &str) -> DomainResult<Vec<Bookmark>> {
        let mut conn = self.get_connection().map_err(DomainError::from)?;

        let pattern = format!("%{}%", tag);
        let rows: Vec<BookmarkRow> = sql_query(format!(
            "{} WHERE b.url IN (
                 SELECT bt2.bookmark_url
                   FROM bookmark_tags bt2
                   JOIN tags t2 ON t2.id = bt2.tag_id
                  WHERE t2.name LIKE ?)
             GROUP BY b.id ORDER BY b.id ASC",
            SELECT_WITH_TAGS
        ))
        .bind::<Text, _>(pattern)
        .load(&mut conn)
        .map_err(|e| DomainError::from(SqliteRepositoryError::from(e)))?;

        rows.into_iter()
            .map(|row| to_domain(row).map_err(DomainError::from))
            .collect()
    }

    fn by_query(&self, query: &str) -> DomainResult<Vec<Bookmark>> {
        let mut conn = self.get_connection().map_err(DomainError::from)?;

        let pattern = format!("%{}%", query);
        let rows: Vec<BookmarkRow> = sql_query(format!(
            "{} WHERE b.id IN (
                 SELECT b2.id
                   FROM bookmarks b2
                   LEFT JOIN bookmark_tags bt2 ON bt2.bookmark_url = b2.url
                   LEFT JOIN tags t2 ON t2.id = bt2.tag_id
                  WHERE (CAST(b2.id AS TEXT) || b2.title || b2.url || b2.desc) LIKE ?
                     OR t2.name LIKE ?)
             GROUP BY b.id ORDER BY b.id ASC",
            SELECT_WITH_TAGS
        ))
        .bind::<Text, _>(pattern.clone())
        .bind::<Text, _>(pattern)
        .load(&mut conn)
        .map_err(|e| DomainError::from(SqliteRepositoryError::from(e)))?;

        if rows.is_empty() {
            return Err(DomainError::RecordNoMatch(query.to_string()));
        }
        rows.into_iter()
            .map(|row| to_domain(row).map_err(DomainError::from))
            .collect()
    }

    fn by_order(&self, column: &str, direction: &str) -> DomainResult<Vec<Bookmark>> {
        const SORTABLE: &[&str] = &[
            "id",
            "url",
            "title",
            "desc",
            "notes",
            "created_at",
            "updated_at",
            "last_visit",
            "visit_count",
            "favorite",
        ];

        let column = column.to_lowercase();
        let direction = direction.to_uppercase();
        if !SORTABLE.contains(&column.as_str())
            || !matches!(direction.as_str(), "ASC" | "DESC")
        {
            return Err(DomainError::InvalidSortBy(format!(
                "{} {}",
                column, direction
            )));
        }

        let mut conn = self.get_connection().map_err(DomainError::from)?;
        let rows: Vec<BookmarkRow> = sql_query(format!(
            "{} GROUP BY b.id ORDER BY b.{} {}",
            SELECT_WITH_TAGS, column, direction
        ))
        .load(&mut conn)
        .map_err(|e| DomainError::from(SqliteRepositoryError::from(e)))?;

        rows.into_iter()
            .map(|row| to_domain(row).map_err(DomainError::from))
            .collect()
    }

    #[instrument(skip(self, bookmark), fields(url = %bookmark.url), level = "debug")]
    fn insert_one(&self, bookmark: &mut Bookmark) -> DomainResult<()> {
        self.with_tx(|conn| Self::insert_one_tx(conn, bookmark))
            .map_err(DomainError::from)
    }

    #[instrument(skip(self, bookmarks), fields(count = bookmarks.len()), level = "debug")]
    fn insert_many(&self, bookmarks: &mut [Bookmark]) -> DomainResult<()> {
        // Stable insertion order so assigned ids follow the caller's ids.
        bookmarks.sort_by_key(|bookmark| bookmark.id.unwrap_or(i32::MAX));

        self.with_tx(|conn| {
            for bookmark in bookmarks.iter_mut() {
                Self::insert_one_tx(conn, bookmark)?;
            }
            Ok(())
        })
        .map_err(DomainError::from)
    }

    #[instrument(skip(self, bookmark), fields(url = %bookmark.url), level = "debug")]
    fn update(&self, bookmark: &Bookmark) -> DomainResult<()> {
        let id = bookmark
            .id
            .ok_or_else(|| DomainError::Other("record has no id".to_string()))?;

        self.with_tx(|conn| {
            Self::delete_by_url_tx(conn, &bookmark.url)?;

            let mut reinserted = bookmark.clone();
            reinserted.id = Some(id);
            reinserted.updated_at = Utc::now();
            Self::insert_one_tx(conn, &mut reinserted)
        })
        .map_err(DomainError::from)
    }

    #[instrument(skip(self), level = "debug")]
    fn delete_by_url(&self, url: &str) -> DomainResult<()> {
        self.with_tx(|conn| Self::delete_by_url_tx(conn, url))
            .map_err(DomainError::from)
    }

    #[instrument(skip(self, bookmarks), fields(count = bookmarks.len()), level = "debug")]
    fn delete_many(&self, bookmarks: &[Bookmark]) -> DomainResult<()> {
        if bookmarks.is_empty() {
            return Err(DomainError::RecordIdNotProvided);
        }

        let urls: Vec<&str> = bookmarks.iter().map(|b| b.url.as_str()).collect();
        self.with_tx(|conn| {
            diesel::delete(bt::bookmark_tags.filter(bt::bookmark_url.eq_any(urls)))
                .execute(conn)?;
            Ok(())
        })
        .map_err(DomainError::from)
    }

    fn set_favorite(&self, bookmark: &Bookmark) -> DomainResult<()> {
        let mut conn = self.get_connection().map_err(DomainError::from)?;

        let updated = diesel::update(b::bookmarks.filter(b::url.eq(&bookmark.url)))
            .set(b::favorite.eq(bookmark.favorite))
            .execute(&mut conn)
            .map_err(|e| DomainError::from(SqliteRepositoryError::from(e)))?;

        if updated == 0 {
            return Err(DomainError::RecordNotFound(bookmark.url.clone()));
        }
        Ok(())
    }

    fn set_visit(&self, bookmark: &Bookmark) -> DomainResult<()> {
        let mut conn = self.get_connection().map_err(DomainError::from)?;

        let now = Utc::now().to_rfc3339();
        let updated = diesel::update(b::bookmarks.filter(b::url.eq(&bookmark.url)))
            .set((
                b::visit_count.eq(b::visit_count + 1),
                b::last_visit.eq(now),
            ))
            .execute(&mut conn)
            .map_err(|e| DomainError::from(SqliteRepositoryError::from(e)))?;

        if updated == 0 {
            return Err(DomainError::RecordNotFound(bookmark.url.clone()));
        }
        Ok(())
    }

    fn count_records_from(&self, table: &str) -> i64 {
        const SCHEMA_TABLES: &[&str] = &["bookmarks", "tags", "bookmark_tags"];
        assert!(
            SCHEMA_TABLES.contains(&table),
            "not a schema table: {}",
            table
        );

        // A failing count on a schema table means the data model is broken.
        self.get_connection()
            .and_then(|mut conn| {
                let row: CountRow =
                    sql_query(format!("SELECT COUNT(*) AS n FROM {}", table))
                        .get_result(&mut conn)?;
                Ok(row.n)
            })
            .unwrap_or_else(|e| panic!("count on {} failed, schema is broken: {}", table, e))
    }

    fn count_favorites(&self) -> DomainResult<i64> {
        let mut conn = self.get_connection().map_err(DomainError::from)?;
        b::bookmarks
            .filter(b::favorite.eq(true))
            .count()
            .get_result(&mut conn)
            .map_err(|e| DomainError::from(SqliteRepositoryError::from(e)))
    }

    fn tags_counter(&self) -> DomainResult<HashMap<String, i64>> {
        let mut conn = self.get_connection().map_err(DomainError::from)?;

        let rows: Vec<TagCountRow> = sql_query(TAGS_COUNTER)
            .load(&mut conn)
            .map_err(|e| DomainError::from(SqliteRepositoryError::from(e)))?;

        Ok(rows.into_iter().map(|row| (row.name, row.n)).collect())
    }

    fn has(&self, url: &str) -> Option<Bookmark> {
        // A failing count on a schema table means the data model is broken;
        // there is nothing sensible to return.
        let count: i64 = self
            .get_connection()
            .map_err(DomainError::from)
            .and_then(|mut conn| {
                b::bookmarks
                    .filter(b::url.eq(url))
                    .count()
                    .get_result(&mut conn)
                    .map_err(|e| DomainError::from(SqliteRepositoryError::from(e)))
            })
            .unwrap_or_else(|e| panic!("bookmark count failed, schema is broken: {}", e));

        if count == 0 {
            return None;
        }
        self.by_url(url).ok()
    }

    fn reorder_ids(&self) -> DomainResult<()> {
        self.with_tx(Self::reorder_ids_tx).map_err(DomainError::from)
    }

    fn vacuum(&self) -> DomainResult<()> {
        let mut conn = self.get_connection().map_err(DomainError::from)?;
        sql_query("VACUUM")
            .execute(&mut conn)
            .map_err(|e| DomainError::from(SqliteRepositoryError::from(e)))?;
        Ok(())
    }

    fn max_id(&self) -> DomainResult<i32> {
        let mut conn = self.get_connection().map_err(DomainError::from)?;
        Self::max_id_tx(&mut conn).map_err(DomainError::from)
    }
}

// --- row mapping --------------------------------------------------------

#[derive(QueryableByName, Debug)]
pub(crate) struct BookmarkRow {
    #[diesel(sql_type = Integer)]
    pub id: i32,
    #[diesel(sql_type = Text)]
    pub url: String,
    #[diesel(sql_type = Text)]
    pub title: String,
    #[diesel(sql_type = Text)]
    pub desc: String,
    #[diesel(sql_type = Text)]
    pub notes: String,
    #[diesel(sql_type = Text)]
    pub created_at: String,
    #[diesel(sql_type = Text)]
    pub updated_at: String,
    #[diesel(sql_type = Text)]
    pub last_visit: String,
    #[diesel(sql_type = Integer)]
    pub visit_count: i32,
    #[diesel(sql_type = diesel::sql_types::Bool)]
    pub favorite: bool,
    #[diesel(sql_type = Text)]
    pub favicon_url: String,
    #[diesel(sql_type = Text)]
    pub favicon_local: String,
    #[diesel(sql_type = Text)]
    pub archive_url: String,
    #[diesel(sql_type = Text)]
    pub archive_timestamp: String,
    #[diesel(sql_type = Text)]
    pub checksum: String,
    #[diesel(sql_type = Text)]
    pub last_checked: String,
    #[diesel(sql_type = Integer)]
    pub status_code: i32,
    #[diesel(sql_type = Text)]
    pub status_text: String,
    #[diesel(sql_type = diesel::sql_types::Bool)]
    pub is_active: bool,
    #[diesel(sql_type = Text)]
    pub tags: String,
}

#[derive(QueryableByName, Debug)]
struct CountRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    n: i64,
}

#[derive(QueryableByName, Debug)]
struct TagCountRow {
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    n: i64,
}

/// Timestamps are written as RFC 3339; rows created through SQL defaults
/// carry the `CURRENT_TIMESTAMP` format instead. Both parse.
fn parse_timestamp(value: &str) -> SqliteResult<Option<DateTime<Utc>>> {
    if value.is_empty() {
        return Ok(None);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| Some(Utc.from_utc_datetime(&naive)))
        .map_err(|e| {
            SqliteRepositoryError::ConversionError(format!("bad timestamp '{}': {}", value, e))
        })
}

pub(crate) fn to_domain(row: BookmarkRow) -> SqliteResult<Bookmark> {
    let created_at = parse_timestamp(&row.created_at)?;
    let updated_at = parse_timestamp(&row.updated_at)?.unwrap_or_else(Utc::now);
    let last_visit = parse_timestamp(&row.last_visit)?;
    let last_checked = parse_timestamp(&row.last_checked)?;

    Bookmark::from_storage(
        row.id,
        row.url,
        row.title,
        row.desc,
        row.notes,
        row.tags,
        created_at,
        updated_at,
        last_visit,
        row.visit_count,
        row.favorite,
        row.favicon_url,
        row.favicon_local,
        row.archive_url,
        row.archive_timestamp,
        row.checksum,
        last_checked,
        row.status_code,
        row.status_text,
        row.is_active,
    )
    .map_err(|e| SqliteRepositoryError::ConversionError(format!("row id {}: {}", row.id, e)))
}
