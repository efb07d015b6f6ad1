// End-to-end lifecycle scenarios against a real temp-file database.

use std::sync::Arc;

use bmk::application::dto::bookmark_json::BookmarkJson;
use bmk::infrastructure::backup;
use bmk::util::testing::init_test_env;
use bmk::{
    ApplicationError, Bookmark, BookmarkRepository, BookmarkService, BookmarkServiceImpl,
    DomainError, SqliteBookmarkRepository, Tag,
};
use tempfile::TempDir;

fn setup() -> (SqliteBookmarkRepository, TempDir) {
    init_test_env();
    let dir = TempDir::new().unwrap();
    let repo = SqliteBookmarkRepository::create(dir.path().join("bookmarks.db")).unwrap();
    (repo, dir)
}

fn record(url: &str, tags: &str) -> BookmarkJson {
    let bookmark = Bookmark::new(url, "Title", "Description", Tag::parse_tags(tags).unwrap())
        .unwrap();
    BookmarkJson::from_domain(&bookmark)
}

#[test]
fn test_populate_delete_reorder_end_to_end() {
    let (repo, _dir) = setup();
    let service = BookmarkServiceImpl::new(Arc::new(repo));

    let mut urls = Vec::new();
    for i in 1..=10 {
        let url = format!("https://example{}.com", i);
        service
            .add_bookmark(&record(&url, &format!("test,tag{},go", i)))
            .unwrap();
        urls.push(url);
    }

    let doomed = service.get_by_ids(&[2, 3, 6]).unwrap();
    service.delete_reorder(&doomed).unwrap();

    let remaining = service.get_all().unwrap();
    let ids: Vec<_> = remaining.iter().filter_map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);

    let expected: Vec<_> = urls
        .iter()
        .enumerate()
        .filter(|(i, _)| ![1, 2, 5].contains(i))
        .map(|(_, url)| url.as_str())
        .collect();
    let actual: Vec<_> = remaining.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(actual, expected);

    // Every surviving record still validates its checksum.
    for r in &remaining {
        assert!(r.validate_checksum().unwrap());
    }
}

#[test]
fn test_messy_tags_come_back_canonical() {
    let (repo, _dir) = setup();

    let mut bookmark = Bookmark::new(
        "https://example.com",
        "Title",
        "Description",
        Tag::parse_tags("tag1, tag2, tag3 tag").unwrap(),
    )
    .unwrap();
    repo.insert_one(&mut bookmark).unwrap();

    let read = repo.by_url("https://example.com").unwrap();
    assert_eq!(read.formatted_tags(), "tag,tag1,tag2,tag3,");
}

#[test]
fn test_relation_delete_leaves_no_orphan_tags() {
    let (repo, _dir) = setup();

    for i in 1..=3 {
        let mut bookmark = Bookmark::new(
            format!("https://example{}.com", i).as_str(),
            "Title",
            "Description",
            Tag::parse_tags("t").unwrap(),
        )
        .unwrap();
        repo.insert_one(&mut bookmark).unwrap();
    }

    let all = repo.all().unwrap();
    repo.delete_many(&all).unwrap();

    let counter = repo.tags_counter().unwrap();
    assert!(counter.is_empty(), "no tag rows may survive: {:?}", counter);
    assert_eq!(repo.count_records_from("bookmarks"), 0);
    assert_eq!(repo.count_records_from("tags"), 0);
    assert_eq!(repo.count_records_from("bookmark_tags"), 0);
}

#[test]
fn test_boundary_behaviors() {
    let (repo, _dir) = setup();

    let mut bookmark = Bookmark::new(
        "https://example.com",
        "Title",
        "Description",
        Tag::parse_tags("test").unwrap(),
    )
    .unwrap();
    repo.insert_one(&mut bookmark).unwrap();

    let max = repo.max_id().unwrap();
    assert!(matches!(
        repo.by_id(max + 1),
        Err(DomainError::RecordNotFound(_))
    ));
    assert!(matches!(
        repo.by_id_list(&[]),
        Err(DomainError::RecordIdNotProvided)
    ));
    assert!(matches!(
        repo.delete_many(&[]),
        Err(DomainError::RecordIdNotProvided)
    ));
    assert!(matches!(
        repo.by_order("id", "SIDEWAYS"),
        Err(DomainError::InvalidSortBy(_))
    ));
}

#[test]
fn test_backup_restores_identical_records() {
    let (repo, dir) = setup();

    for i in 1..=4 {
        let mut bookmark = Bookmark::new(
            format!("https://example{}.com", i).as_str(),
            "Title",
            "Description",
            Tag::parse_tags("test,snapshot").unwrap(),
        )
        .unwrap();
        repo.insert_one(&mut bookmark).unwrap();
    }

    let dest = backup::create_backup(&repo, &dir.path().join("backups")).unwrap();
    let restored = backup::from_backup(&dest).unwrap();

    let describe = |records: Vec<Bookmark>| {
        records
            .into_iter()
            .map(|b| (b.id, b.formatted_tags(), b.url, b.checksum))
            .collect::<Vec<_>>()
    };
    assert_eq!(
        describe(repo.all().unwrap()),
        describe(restored.all().unwrap())
    );
}

#[test]
fn test_tampered_backup_surfaces_corruption() {
    let (repo, dir) = setup();

    let mut bookmark = Bookmark::new(
        "https://example.com",
        "Title",
        "Description",
        Tag::parse_tags("test").unwrap(),
    )
    .unwrap();
    repo.insert_one(&mut bookmark).unwrap();

    let dest = backup::create_backup(&repo, &dir.path().join("backups")).unwrap();

    let mut bytes = std::fs::read(&dest).unwrap();
    bytes[0] ^= 0xff;
    std::fs::write(&dest, &bytes).unwrap();

    assert!(matches!(
        backup::from_backup(&dest),
        Err(DomainError::DbCorrupted(_))
    ));
}

#[test]
fn test_service_surfaces_domain_kinds() {
    let (repo, _dir) = setup();
    let service = BookmarkServiceImpl::new(Arc::new(repo));

    assert!(matches!(
        service.get_by_url("https://absent.com"),
        Err(ApplicationError::Domain(DomainError::RecordNotFound(_)))
    ));
    assert!(matches!(
        service.search("nothing"),
        Err(ApplicationError::Domain(DomainError::RecordNoMatch(_)))
    ));
}
