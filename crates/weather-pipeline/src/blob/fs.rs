use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;

use super::{BlobError, BlobStore};

/// Blob store rooted at a local directory.
///
/// Objects live at `<root>/<container>/<key>`. Writes go to a temporary file
/// in the target directory and are published with a no-clobber link, which
/// fails atomically when the target exists. The temporary file is removed
/// whenever publishing does not happen.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `container/key` under the root, rejecting escapes.
    pub fn object_path(&self, container: &str, key: &str) -> Result<PathBuf, BlobError> {
        let mut path = self.root.clone();
        for part in [container, key] {
            let rel = Path::new(part);
            if part.is_empty()
                || !rel
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)))
            {
                return Err(BlobError::Unavailable(format!(
                    "invalid object path segment '{part}'"
                )));
            }
            path.push(rel);
        }
        Ok(path)
    }
}

impl BlobStore for FsBlobStore {
    async fn put(
        &self,
        container: &str,
        key: &str,
        bytes: Vec<u8>,
        overwrite: bool,
    ) -> Result<(), BlobError> {
        let target = self.object_path(container, key)?;
        let (container, key) = (container.to_string(), key.to_string());

        tokio::task::spawn_blocking(move || {
            publish(&target, &bytes, overwrite).map_err(|e| match e {
                PublishError::Exists => BlobError::AlreadyExists { container, key },
                PublishError::Io(path, e) => unavailable(&path, e),
            })
        })
        .await
        .map_err(|e| BlobError::Unavailable(format!("blob write task failed: {e}")))?
    }
}

enum PublishError {
    Exists,
    Io(PathBuf, std::io::Error),
}

/// Write `bytes` next to `target` and move them into place.
fn publish(target: &Path, bytes: &[u8], overwrite: bool) -> Result<(), PublishError> {
    let parent = target.parent().ok_or_else(|| {
        PublishError::Io(
            target.to_path_buf(),
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent directory"),
        )
    })?;
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |e: std::io::Error| PublishError::Io(path, e)
    };

    std::fs::create_dir_all(parent).map_err(io_err(parent))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(io_err(parent))?;
    tmp.write_all(bytes).map_err(io_err(tmp.path()))?;
    tmp.as_file().sync_all().map_err(io_err(tmp.path()))?;

    let persisted = if overwrite {
        tmp.persist(target)
    } else {
        tmp.persist_noclobber(target)
    };

    match persisted {
        Ok(_) => Ok(()),
        Err(e) if !overwrite && e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(PublishError::Exists)
        }
        Err(e) => Err(PublishError::Io(target.to_path_buf(), e.error)),
    }
}

fn unavailable(path: &Path, e: std::io::Error) -> BlobError {
    BlobError::Unavailable(format!("{}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str =
        "PT_Porto_weather_data/2024-01-01T10:00:00+00:00_PT_Porto_processed_weather_data.json";

    #[tokio::test]
    async fn test_put_creates_hierarchy() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        store.put("tst", KEY, b"{}".to_vec(), false).await.unwrap();

        let path = dir.path().join("tst").join(KEY);
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_no_overwrite_reports_existing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        store.put("tst", KEY, b"first".to_vec(), false).await.unwrap();

        let err = store
            .put("tst", KEY, b"second".to_vec(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::AlreadyExists { .. }));
        assert_eq!(
            std::fs::read(dir.path().join("tst").join(KEY)).unwrap(),
            b"first"
        );
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        store.put("tst", "a/x.json", b"1".to_vec(), false).await.unwrap();
        let _ = store.put("tst", "a/x.json", b"2".to_vec(), false).await;

        let names: Vec<String> = std::fs::read_dir(dir.path().join("tst/a"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["x.json".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_publish_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        // A directory squatting on the key makes the final rename fail.
        std::fs::create_dir_all(dir.path().join("tst/a/x.json/inner")).unwrap();

        let err = store
            .put("tst", "a/x.json", b"payload".to_vec(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Unavailable(_)));

        let names: Vec<String> = std::fs::read_dir(dir.path().join("tst/a"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["x.json".to_string()]);
    }

    #[tokio::test]
    async fn test_overwrite_allowed_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        store.put("tst", "x.json", b"1".to_vec(), false).await.unwrap();
        store.put("tst", "x.json", b"2".to_vec(), true).await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("tst/x.json")).unwrap(), b"2");
    }

    #[tokio::test]
    async fn test_concurrent_writers_one_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FsBlobStore::new(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .put("tst", KEY, format!("writer-{i}").into_bytes(), false)
                        .await
                })
            })
            .collect();

        let mut ok = 0;
        let mut dup = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(()) => ok += 1,
                Err(BlobError::AlreadyExists { .. }) => dup += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(dup, 7);
    }

    #[test]
    fn test_object_path_rejects_escapes() {
        let store = FsBlobStore::new("/data");
        assert!(store.object_path("tst", "../etc/passwd").is_err());
        assert!(store.object_path("tst", "/abs.json").is_err());
        assert!(store.object_path("..", "x.json").is_err());
        assert!(store.object_path("", "x.json").is_err());
        assert_eq!(
            store.object_path("tst", "a/b.json").unwrap(),
            PathBuf::from("/data/tst/a/b.json")
        );
    }

    #[tokio::test]
    async fn test_unwritable_root_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let file_root = dir.path().join("not-a-dir");
        std::fs::write(&file_root, b"x").unwrap();

        let store = FsBlobStore::new(&file_root);
        let err = store.put("tst", "x.json", vec![], false).await.unwrap_err();
        assert!(matches!(err, BlobError::Unavailable(_)));
    }
}
