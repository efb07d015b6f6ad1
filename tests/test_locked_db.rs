// Locking a real database file end-to-end: the repository is dropped before
// the locker touches the path, and reopened only after unlock.

use std::fs;

use bmk::infrastructure::locker;
use bmk::util::testing::init_test_env;
use bmk::{Bookmark, BookmarkRepository, LockerError, SqliteBookmarkRepository, Tag};
use tempfile::TempDir;

#[test]
fn test_lock_unlock_database_file_roundtrip() {
    init_test_env();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("bookmarks.db");

    {
        let repo = SqliteBookmarkRepository::create(&db_path).unwrap();
        let mut bookmark = Bookmark::new(
            "https://example.com",
            "Title",
            "Description",
            Tag::parse_tags("test").unwrap(),
        )
        .unwrap();
        repo.insert_one(&mut bookmark).unwrap();
        // Pool dropped here; the locker never coexists with an open handle.
    }
    // Closing the last connection checkpoints the WAL; only the main file
    // remains to be locked.
    let _ = fs::remove_file(dir.path().join("bookmarks.db-wal"));
    let _ = fs::remove_file(dir.path().join("bookmarks.db-shm"));

    let plain_bytes = fs::read(&db_path).unwrap();

    let locked = locker::lock(&db_path, "passphrase").unwrap();
    assert!(!db_path.exists());
    assert!(matches!(
        locker::is_locked(&db_path),
        Err(LockerError::ItemLocked(_))
    ));

    let unlocked = locker::unlock(&locked, "passphrase").unwrap();
    assert_eq!(unlocked, db_path);
    assert_eq!(fs::read(&db_path).unwrap(), plain_bytes);
    assert!(locker::is_locked(&db_path).is_ok());

    let repo = SqliteBookmarkRepository::open(&db_path).unwrap();
    let read = repo.by_url("https://example.com").unwrap();
    assert_eq!(read.title, "Title");
}

#[test]
fn test_zero_byte_file_roundtrip() {
    init_test_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.db");
    fs::write(&path, b"").unwrap();

    let locked = locker::lock(&path, "k").unwrap();
    let unlocked = locker::unlock(&locked, "k").unwrap();
    assert_eq!(fs::read(&unlocked).unwrap().len(), 0);
}

#[test]
fn test_wrong_passphrase_mutates_nothing() {
    init_test_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bookmarks.db");
    fs::write(&path, b"database bytes").unwrap();

    let locked = locker::lock(&path, "right").unwrap();
    let locked_bytes = fs::read(&locked).unwrap();

    assert!(matches!(
        locker::unlock(&locked, "wrong"),
        Err(LockerError::Crypto(_))
    ));

    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["bookmarks.db.enc"]);
    assert_eq!(fs::read(&locked).unwrap(), locked_bytes);
}
