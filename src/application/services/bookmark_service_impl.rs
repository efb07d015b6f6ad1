// bmk/src/application/services/bookmark_service_impl.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::dto::bookmark_json::BookmarkJson;
use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::bookmark_service::BookmarkService;
use crate::domain::bookmark::Bookmark;
use crate::domain::repositories::bookmark_repository::BookmarkRepository;
use crate::infrastructure::backup;
use crate::infrastructure::repositories::sqlite::repository::SqliteBookmarkRepository;

#[derive(Debug)]
pub struct BookmarkServiceImpl<R: BookmarkRepository> {
    repository: Arc<R>,
}

impl<R: BookmarkRepository> BookmarkServiceImpl<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Translate a projection and stamp it with an authoritative checksum.
    fn to_checked_domain(&self, record: &BookmarkJson) -> ApplicationResult<Bookmark> {
        let mut bookmark = record.to_domain()?;
        bookmark.update_checksum();
        Ok(bookmark)
    }
}

impl BookmarkServiceImpl<SqliteBookmarkRepository> {
    /// Snapshot the underlying database into `backup_dir`.
    pub fn backup_to(&self, backup_dir: &Path) -> ApplicationResult<PathBuf> {
        Ok(backup::create_backup(&self.repository, backup_dir)?)
    }
}

impl<R: BookmarkRepository> BookmarkService for BookmarkServiceImpl<R> {
    #[instrument(skip(self, record), fields(url = %record.url), level = "debug")]
    fn add_bookmark(&self, record: &BookmarkJson) -> ApplicationResult<BookmarkJson> {
        let mut bookmark = self.to_checked_domain(record)?;
        self.repository.insert_one(&mut bookmark)?;
        Ok(BookmarkJson::from_domain(&bookmark))
    }

    #[instrument(skip(self, records), fields(count = records.len()), level = "debug")]
    fn add_bookmarks(&self, records: &[BookmarkJson]) -> ApplicationResult<Vec<BookmarkJson>> {
        let mut bookmarks = records
            .iter()
            .map(|record| self.to_checked_domain(record))
            .collect::<ApplicationResult<Vec<_>>>()?;

        self.repository.insert_many(&mut bookmarks)?;
        Ok(BookmarkJson::from_domain_collection(&bookmarks))
    }

    #[instrument(skip(self, record), fields(url = %record.url), level = "debug")]
    fn update_bookmark(&self, record: &BookmarkJson) -> ApplicationResult<BookmarkJson> {
        if record.id.is_none() {
            return Err(ApplicationError::Validation(
                "update requires a record id".to_string(),
            ));
        }

        let bookmark = self.to_checked_domain(record)?;
        self.repository.update(&bookmark)?;
        Ok(BookmarkJson::from_domain(&bookmark))
    }

    #[instrument(skip(self, records), fields(count = records.len()), level = "debug")]
    fn delete_reorder(&self, records: &[BookmarkJson]) -> ApplicationResult<()> {
        let bookmarks = records
            .iter()
            .map(BookmarkJson::to_domain)
            .collect::<Result<Vec<_>, _>>()?;

        self.repository.delete_many(&bookmarks)?;
        self.repository.reorder_ids()?;
        self.repository.vacuum()?;
        debug!("deleted {} records, ids compacted", bookmarks.len());
        Ok(())
    }

    fn get_all(&self) -> ApplicationResult<Vec<BookmarkJson>> {
        let bookmarks = self.repository.all()?;
        Ok(BookmarkJson::from_domain_collection(&bookmarks))
    }

    fn get_by_id(&self, id: i32) -> ApplicationResult<BookmarkJson> {
        Ok(BookmarkJson::from_domain(&self.repository.by_id(id)?))
    }

    fn get_by_ids(&self, ids: &[i32]) -> ApplicationResult<Vec<BookmarkJson>> {
        let bookmarks = self.repository.by_id_list(ids)?;
        Ok(BookmarkJson::from_domain_collection(&bookmarks))
    }

    fn get_by_url(&self, url: &str) -> ApplicationResult<BookmarkJson> {
        Ok(BookmarkJson::from_domain(&self.repository.by_url(url)?))
    }

    fn get_by_tag(&self, tag: &str) -> ApplicationResult<Vec<BookmarkJson>> {
        let bookmarks = self.repository.by_tag(tag)?;
        Ok(BookmarkJson::from_domain_collection(&bookmarks))
    }

    fn search(&self, query: &str) -> ApplicationResult<Vec<BookmarkJson>> {
        let bookmarks = self.repository.by_query(query)?;
        Ok(BookmarkJson::from_domain_collection(&bookmarks))
    }

    fn get_sorted(&self, column: &str, direction: &str) -> ApplicationResult<Vec<BookmarkJson>> {
        let bookmarks = self.repository.by_order(column, direction)?;
        Ok(BookmarkJson::from_domain_collection(&bookmarks))
    }

    fn set_favorite(&self, url: &str, favorite: bool) -> ApplicationResult<()> {
        let mut bookmark = self.repository.by_url(url)?;
        bookmark.set_favorite(favorite);
        self.repository.set_favorite(&bookmark)?;
        Ok(())
    }

    fn record_visit(&self, url: &str) -> ApplicationResult<()> {
        let bookmark = self.repository.by_url(url)?;
        self.repository.set_visit(&bookmark)?;
        Ok(())
    }

    fn count_favorites(&self) -> ApplicationResult<i64> {
        Ok(self.repository.count_favorites()?)
    }

    fn tag_counts(&self) -> ApplicationResult<HashMap<String, i64>> {
        Ok(self.repository.tags_counter()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::util::testing::init_test_env;
    use tempfile::TempDir;

    fn setup_service() -> (BookmarkServiceImpl<SqliteBookmarkRepository>, TempDir) {
        init_test_env();
        let dir = TempDir::new().unwrap();
        let repo = SqliteBookmarkRepository::create(dir.path().join("bmk.db")).unwrap();
        (BookmarkServiceImpl::new(Arc::new(repo)), dir)
    }

    fn record(url: &str, tags: &[&str]) -> BookmarkJson {
        BookmarkJson {
            id: None,
            url: url.to_string(),
            title: "Title".to_string(),
            desc: "Description".to_string(),
            notes: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: None,
            updated_at: None,
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
        }
    }

    #[test]
    fn test_add_recomputes_checksum() {
        let (service, _dir) = setup_service();

        let mut input = record("https://example.com", &["test"]);
        input.checksum = "bogus123".to_string();

        let stored = service.add_bookmark(&input).unwrap();
        assert_ne!(stored.checksum, "bogus123");
        assert!(stored.validate_checksum().unwrap());
        assert_eq!(stored.id, Some(1));
    }

    #[test]
    fn test_update_recomputes_checksum_and_keeps_id() {
        let (service, _dir) = setup_service();

        let stored = service
            .add_bookmark(&record("https://example.com", &["test"]))
            .unwrap();

        let mut changed = stored.clone();
        changed.title = "New title".to_string();
        changed.checksum = "stale".to_string();

        let updated = service.update_bookmark(&changed).unwrap();
        assert_eq!(updated.id, stored.id);
        assert!(updated.validate_checksum().unwrap());

        let read = service.get_by_url("https://example.com").unwrap();
        assert_eq!(read.title, "New title");
        assert!(read.validate_checksum().unwrap());
    }

    #[test]
    fn test_update_without_id_is_rejected() {
        let (service, _dir) = setup_service();
        let result = service.update_bookmark(&record("https://example.com", &["test"]));
        assert!(matches!(result, Err(ApplicationError::Validation(_))));
    }

    #[test]
    fn test_delete_reorder_compacts_ids() {
        let (service, _dir) = setup_service();

        for i in 1..=5 {
            service
                .add_bookmark(&record(&format!("https://example{}.com", i), &["test"]))
                .unwrap();
        }

        let doomed = service.get_by_ids(&[2, 4]).unwrap();
        service.delete_reorder(&doomed).unwrap();

        let remaining = service.get_all().unwrap();
        let ids: Vec<_> = remaining.iter().filter_map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let urls: Vec<_> = remaining.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example1.com",
                "https://example3.com",
                "https://example5.com"
            ]
        );
    }

    #[test]
    fn test_favorite_lifecycle() {
        let (service, _dir) = setup_service();

        service
            .add_bookmark(&record("https://example.com", &["test"]))
            .unwrap();

        service.set_favorite("https://example.com", true).unwrap();
        assert_eq!(service.count_favorites().unwrap(), 1);

        service.set_favorite("https://example.com", false).unwrap();
        assert_eq!(service.count_favorites().unwrap(), 0);
    }

    #[test]
    fn test_record_visit() {
        let (service, _dir) = setup_service();

        service
            .add_bookmark(&record("https://example.com", &["test"]))
            .unwrap();
        service.record_visit("https://example.com").unwrap();

        let read = service.get_by_url("https://example.com").unwrap();
        assert_eq!(read.visit_count, 1);
        assert!(read.last_visit.is_some());
    }

    #[test]
    fn test_duplicate_add_surfaces_domain_kind() {
        let (service, _dir) = setup_service();

        service
            .add_bookmark(&record("https://example.com", &["test"]))
            .unwrap();
        let result = service.add_bookmark(&record("https://example.com", &["test"]));
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::RecordDuplicate(_)))
        ));
    }

    #[test]
    fn test_backup_to() {
        let (service, dir) = setup_service();

        service
            .add_bookmark(&record("https://example.com", &["test"]))
            .unwrap();

        let dest = service.backup_to(&dir.path().join("backups")).unwrap();
        assert!(dest.exists());
    }
}
