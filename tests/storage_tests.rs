use site_cms::storage::{
    DiskStorage, MockStorageService, StorageService, sanitize_file_name, sanitize_folder,
};

#[cfg(test)]
mod sanitization_tests {
    use super::*;

    #[test]
    fn test_folder_keeps_only_safe_characters() {
        assert_eq!(sanitize_folder("bando_2025-cv").as_deref(), Some("bando_2025-cv"));
        assert_eq!(sanitize_folder("../../etc").as_deref(), Some("etc"));
        assert_eq!(sanitize_folder("a b/c.d").as_deref(), Some("abcd"));
    }

    #[test]
    fn test_folder_that_sanitizes_to_nothing_is_absent() {
        assert_eq!(sanitize_folder("../.."), None);
        assert_eq!(sanitize_folder(""), None);
    }

    #[test]
    fn test_file_name_keeps_last_component() {
        assert_eq!(sanitize_file_name("cv.pdf"), "cv.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\maria\\cv.pdf"), "cv.pdf");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }
}

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockStorageService::new();
        let stored = mock.store(Some("media"), "logo.png", b"png").await.unwrap();

        assert!(stored.public_path.starts_with("/uploads/media/"));
        assert!(stored.public_path.ends_with("-logo.png"));
        assert_eq!(stored.size, 3);
        assert_eq!(mock.stored_paths(), vec![stored.public_path.clone()]);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockStorageService::new_failing();
        let result = mock.store(None, "logo.png", b"png").await;
        assert!(result.is_err());
        assert!(mock.stored_paths().is_empty());
    }

    #[tokio::test]
    async fn test_mock_discard() {
        let mock = MockStorageService::new();
        let first = mock.store(None, "a.pdf", b"1").await.unwrap();
        let second = mock.store(None, "a.pdf", b"2").await.unwrap();
        assert_ne!(first.public_path, second.public_path);

        mock.discard(&first).await;

        assert_eq!(mock.stored_paths(), vec![second.public_path]);
    }
}

#[cfg(test)]
mod disk_tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_root_exists_creates_directory() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("nested").join("uploads");
        let storage = DiskStorage::new(&root);

        storage.ensure_root_exists().await.unwrap();

        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_store_writes_under_sanitized_folder() {
        let temp = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(temp.path());

        let stored = storage
            .store(Some("../cv 2025"), "../../cv.pdf", b"%PDF-1.4")
            .await
            .unwrap();

        assert!(stored.disk_path.starts_with(temp.path().join("cv2025")));
        assert_eq!(std::fs::read(&stored.disk_path).unwrap(), b"%PDF-1.4");
        assert!(stored.public_path.starts_with("/uploads/cv2025/"));
        assert!(stored.public_path.ends_with("-cv.pdf"));

        let stamp = stored
            .public_path
            .trim_start_matches("/uploads/cv2025/")
            .trim_end_matches("-cv.pdf");
        assert!(stamp.parse::<i64>().is_ok(), "prefix is a millisecond timestamp");
    }

    #[tokio::test]
    async fn test_store_without_folder() {
        let temp = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(temp.path());

        let stored = storage.store(None, "banner.jpg", b"jpg").await.unwrap();

        assert_eq!(stored.disk_path.parent(), Some(temp.path()));
        assert_eq!(stored.public_path.matches('/').count(), 2);
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_overwrite() {
        let temp = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(temp.path());

        let first = storage.store(None, "cv.pdf", b"first").await.unwrap();
        let second = storage.store(None, "cv.pdf", b"second").await.unwrap();

        assert_ne!(first.disk_path, second.disk_path);
        assert_eq!(std::fs::read(&first.disk_path).unwrap(), b"first");
        assert_eq!(std::fs::read(&second.disk_path).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_discard_removes_file_and_tolerates_missing() {
        let temp = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(temp.path());
        let stored = storage.store(None, "cv.pdf", b"x").await.unwrap();

        storage.discard(&stored).await;
        assert!(!stored.disk_path.exists());

        // Second discard only logs.
        storage.discard(&stored).await;
    }
}
