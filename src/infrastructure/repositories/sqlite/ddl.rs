// bmk/src/infrastructure/repositories/sqlite/ddl.rs
//
// Declarative schema catalog. These strings are the single source of truth
// for the schema: `create()` runs them at init time and the reorder engine
// re-runs the index and trigger statements after rebuilding the main table.

/// Applied on every pooled connection before it is handed out.
pub const SESSION_PRAGMAS: &str = "
    PRAGMA foreign_keys = ON;
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA busy_timeout = 5000;
";

/// Name of the main table; the reorder engine rebuilds it through its twin.
pub const BOOKMARKS_TABLE: &str = "bookmarks";

/// Temporary twin used only during reorder.
pub const TEMP_BOOKMARKS_TABLE: &str = "temp_bookmarks";

const BOOKMARK_COLUMNS: &str = "
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    url               TEXT NOT NULL UNIQUE,
    title             TEXT NOT NULL DEFAULT '',
    desc              TEXT NOT NULL DEFAULT '',
    notes             TEXT NOT NULL DEFAULT '',
    created_at        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    last_visit        TEXT NOT NULL DEFAULT '',
    visit_count       INTEGER NOT NULL DEFAULT 0,
    favorite          INTEGER NOT NULL DEFAULT 0,
    favicon_url       TEXT NOT NULL DEFAULT '',
    favicon_local     TEXT NOT NULL DEFAULT '',
    archive_url       TEXT NOT NULL DEFAULT '',
    archive_timestamp TEXT NOT NULL DEFAULT '',
    checksum          TEXT NOT NULL DEFAULT '',
    last_checked      TEXT NOT NULL DEFAULT '',
    status_code       INTEGER NOT NULL DEFAULT 0,
    status_text       TEXT NOT NULL DEFAULT '',
    is_active         INTEGER NOT NULL DEFAULT 1
";

/// `CREATE TABLE` for the bookmarks table or its reorder twin; both must
/// share the exact same shape.
pub fn create_bookmarks_table(table: &str) -> String {
    format!("CREATE TABLE IF NOT EXISTS {} ({});", table, BOOKMARK_COLUMNS)
}

pub const CREATE_TAGS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS tags (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);";

pub const CREATE_BOOKMARK_TAGS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS bookmark_tags (
    bookmark_url TEXT NOT NULL,
    tag_id       INTEGER NOT NULL,
    PRIMARY KEY (bookmark_url, tag_id),
    FOREIGN KEY (bookmark_url) REFERENCES bookmarks (url) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags (id) ON DELETE CASCADE
);";

pub const CREATE_BOOKMARKS_URL_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_bookmarks_url ON bookmarks (url);";

pub const CREATE_TAGS_NAME_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_name ON tags (name);";

pub const CREATE_BOOKMARK_TAGS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_bookmark_tags ON bookmark_tags (bookmark_url, tag_id);";

/// Stamp `updated_at` on any row update.
pub const CREATE_TOUCH_TRIGGER: &str = "
CREATE TRIGGER IF NOT EXISTS update_bookmarks_updated_at
AFTER UPDATE ON bookmarks
FOR EACH ROW
BEGIN
    UPDATE bookmarks SET updated_at = CURRENT_TIMESTAMP WHERE id = OLD.id;
END;";

/// Deleting a relation row removes the bookmark when it was its last tag,
/// and the tag when no other bookmark references it. Deletion is driven
/// through the relation table so this trigger is the single cleanup path.
pub const CREATE_CLEANUP_TRIGGER: &str = "
CREATE TRIGGER IF NOT EXISTS cleanup_bookmark_and_tags
AFTER DELETE ON bookmark_tags
FOR EACH ROW
BEGIN
    DELETE FROM bookmarks
     WHERE url = OLD.bookmark_url
       AND NOT EXISTS (SELECT 1 FROM bookmark_tags WHERE bookmark_url = OLD.bookmark_url);
    DELETE FROM tags
     WHERE id = OLD.tag_id
       AND NOT EXISTS (SELECT 1 FROM bookmark_tags WHERE tag_id = OLD.tag_id);
END;";

pub const DROP_CLEANUP_TRIGGER: &str = "DROP TRIGGER IF EXISTS cleanup_bookmark_and_tags;";

/// Everything `create()` runs, in dependency order.
pub fn full_schema() -> Vec<String> {
    vec![
        create_bookmarks_table(BOOKMARKS_TABLE),
        CREATE_TAGS_TABLE.to_string(),
        CREATE_BOOKMARK_TAGS_TABLE.to_string(),
        CREATE_BOOKMARKS_URL_INDEX.to_string(),
        CREATE_TAGS_NAME_INDEX.to_string(),
        CREATE_BOOKMARK_TAGS_INDEX.to_string(),
        CREATE_TOUCH_TRIGGER.to_string(),
        CREATE_CLEANUP_TRIGGER.to_string(),
    ]
}
