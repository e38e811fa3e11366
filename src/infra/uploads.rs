//! Filesystem-backed object storage for product images.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use slug::slugify;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::application::storage::{ObjectStorage, ObjectStorageError, StoredObject};

/// Stores objects under a root directory and addresses them by a relative
/// `public_id` (`{folder}/{yyyy}/{mm}/{dd}/{uuid}-{name}`).
#[derive(Debug)]
pub struct LocalObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf, public_base_url: &str) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, public_id: &str) -> String {
        format!("{}/{public_id}", self.public_base_url)
    }

    /// Read a stored object back into memory.
    pub async fn read(&self, public_id: &str) -> Result<Bytes, ObjectStorageError> {
        let absolute = self.resolve(public_id)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    fn resolve(&self, public_id: &str) -> Result<PathBuf, ObjectStorageError> {
        let relative = Path::new(public_id);
        if public_id.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(ObjectStorageError::InvalidIdentifier {
                public_id: public_id.to_string(),
            });
        }

        Ok(self.root.join(relative))
    }

    fn build_public_id(folder: &str, original_name: &str) -> String {
        let (year, month, day) = time::OffsetDateTime::now_utc().to_calendar_date();
        let folder = match slugify(folder) {
            folder if folder.is_empty() => "misc".to_string(),
            folder => folder,
        };
        let identifier = Uuid::new_v4();
        let filename = sanitize_filename(original_name);
        format!(
            "{folder}/{year}/{:02}/{day:02}/{identifier}-{filename}",
            month as u8
        )
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        data: Bytes,
    ) -> Result<StoredObject, ObjectStorageError> {
        let public_id = Self::build_public_id(folder, filename);
        let absolute = self.resolve(&public_id)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&data).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;

        Ok(StoredObject {
            url: self.url_for(&public_id),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), ObjectStorageError> {
        let absolute = self.resolve(public_id)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("upload");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "upload".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_read_then_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage =
            LocalObjectStorage::new(dir.path().to_path_buf(), "http://localhost:8000/uploads/")
                .expect("storage");

        let stored = storage
            .upload("products", "Blue Sapphire Ring.PNG", Bytes::from_static(b"png"))
            .await
            .expect("upload");

        assert!(stored.public_id.starts_with("products/"));
        assert!(stored.public_id.ends_with("-blue-sapphire-ring.png"));
        assert_eq!(
            stored.url,
            format!("http://localhost:8000/uploads/{}", stored.public_id)
        );
        assert_eq!(
            storage.read(&stored.public_id).await.expect("read"),
            Bytes::from_static(b"png")
        );

        storage.delete(&stored.public_id).await.expect("delete");
        storage
            .delete(&stored.public_id)
            .await
            .expect("second delete is a no-op");
        assert!(storage.read(&stored.public_id).await.is_err());
    }

    #[tokio::test]
    async fn escaping_identifiers_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalObjectStorage::new(dir.path().to_path_buf(), "/uploads")
            .expect("storage");

        for public_id in ["../etc/passwd", "/etc/passwd", ""] {
            assert!(matches!(
                storage.delete(public_id).await,
                Err(ObjectStorageError::InvalidIdentifier { .. })
            ));
        }
    }

    #[test]
    fn filenames_are_slugified() {
        assert_eq!(sanitize_filename("My Photo.JPG"), "my-photo.jpg");
        assert_eq!(sanitize_filename("???"), "upload");
        assert_eq!(sanitize_filename("noext"), "noext");
    }
}
