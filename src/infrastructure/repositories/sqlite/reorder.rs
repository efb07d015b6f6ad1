// bmk/src/infrastructure/repositories/sqlite/reorder.rs
//
// ID compaction. After deletions the id sequence has holes; consumers that
// address records by position need ids 1..N again. The whole rebuild runs in
// one immediate transaction:
//
//   1. empty table: reset the autoincrement sequence and return
//   2. snapshot all records (id order) with canonical tags
//   3. drop the cleanup trigger - it must not fire while tables are rebuilt
//   4. create the temp twin and fill it WITHOUT ids, so AUTOINCREMENT
//      assigns a dense 1..N sequence in snapshot order
//   5. clear the relation and tag tables before dropping the main table;
//      with foreign_keys=ON, DROP TABLE runs an implicit DELETE whose
//      cascade would otherwise purge the relation rows mid-rebuild
//   6. drop bookmarks, rename the twin, recreate index and triggers
//   7. re-associate tags from the snapshot

use diesel::connection::SimpleConnection;
use diesel::sql_query;
use diesel::sql_types::{Bool, Integer, Text};
use diesel::{RunQueryDsl, SqliteConnection};
use chrono::Utc;
use tracing::debug;

use super::ddl;
use super::error::SqliteResult;
use super::repository::SqliteBookmarkRepository;

const RESET_BOOKMARKS_SEQUENCE: &str = "DELETE FROM sqlite_sequence WHERE name = 'bookmarks';";

const INSERT_INTO_TEMP: &str = "
INSERT INTO temp_bookmarks (
    url, title, desc, notes,
    created_at, updated_at, last_visit,
    visit_count, favorite,
    favicon_url, favicon_local, archive_url, archive_timestamp,
    checksum, last_checked, status_code, status_text, is_active
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

impl SqliteBookmarkRepository {
    pub(crate) fn reorder_ids_tx(conn: &mut SqliteConnection) -> SqliteResult<()> {
        if Self::max_id_tx(conn)? == 0 {
            debug!("no records, resetting id sequence");
            conn.batch_execute(RESET_BOOKMARKS_SEQUENCE)?;
            return Ok(());
        }

        let snapshot = Self::load_all_tx(conn)?;
        debug!("reordering {} records", snapshot.len());

        conn.batch_execute(ddl::DROP_CLEANUP_TRIGGER)?;
        conn.batch_execute(&ddl::create_bookmarks_table(ddl::TEMP_BOOKMARKS_TABLE))?;

        for bookmark in &snapshot {
            let created_at = bookmark
                .created_at
                .unwrap_or_else(Utc::now)
                .to_rfc3339();
            let last_visit = bookmark
                .last_visit
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default();
            let last_checked = bookmark
                .last_checked
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default();

            sql_query(INSERT_INTO_TEMP)
                .bind::<Text, _>(&bookmark.url)
                .bind::<Text, _>(&bookmark.title)
                .bind::<Text, _>(&bookmark.desc)
                .bind::<Text, _>(&bookmark.notes)
                .bind::<Text, _>(created_at)
                .bind::<Text, _>(bookmark.updated_at.to_rfc3339())
                .bind::<Text, _>(last_visit)
                .bind::<Integer, _>(bookmark.visit_count)
                .bind::<Bool, _>(bookmark.favorite)
                .bind::<Text, _>(&bookmark.favicon_url)
                .bind::<Text, _>(&bookmark.favicon_local)
                .bind::<Text, _>(&bookmark.archive_url)
                .bind::<Text, _>(&bookmark.archive_timestamp)
                .bind::<Text, _>(&bookmark.checksum)
                .bind::<Text, _>(last_checked)
                .bind::<Integer, _>(bookmark.status_code)
                .bind::<Text, _>(&bookmark.status_text)
                .bind::<Bool, _>(bookmark.is_active)
                .execute(conn)?;
        }

        conn.batch_execute("DELETE FROM bookmark_tags; DELETE FROM tags;")?;
        conn.batch_execute("DROP TABLE bookmarks;")?;
        conn.batch_execute("ALTER TABLE temp_bookmarks RENAME TO bookmarks;")?;
        conn.batch_execute(ddl::CREATE_BOOKMARKS_URL_INDEX)?;
        conn.batch_execute(ddl::CREATE_TOUCH_TRIGGER)?;
        conn.batch_execute(ddl::CREATE_CLEANUP_TRIGGER)?;

        for bookmark in &snapshot {
            Self::associate_tags_tx(conn, &bookmark.url, &bookmark.tags)?;
        }

        Ok(())
    }
}
