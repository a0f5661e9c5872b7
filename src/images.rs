//! Local object store for post cover images.
//!
//! Uploaded files are copied into `<root>/book-covers/` under a name derived
//! from the SHA-256 of their contents, so re-uploading the same cover is a
//! no-op. Stored files are addressed by public URL
//! (`<public_base_url>/book-covers/<hash>.<ext>`), which is what gets saved on
//! the post row.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

const COVER_FOLDER: &str = "book-covers";

/// Largest accepted upload (10 MB).
const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif"];

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("Image I/O failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported image type '{0}' (expected one of jpg, jpeg, png, gif, webp, avif)")]
    UnsupportedType(String),

    #[error("Image is too large ({0} bytes, max {MAX_IMAGE_BYTES})")]
    TooLarge(u64),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ImageStoreError + '_ {
    move |source| ImageStoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    public_base_url: String,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Copies an image into the store and returns its public URL.
    ///
    /// The destination is written to a temporary file and renamed into place,
    /// so a failed upload never leaves a partial image behind.
    pub async fn upload(&self, source: &Path) -> Result<String, ImageStoreError> {
        let ext = image_extension(source)?;

        let meta = tokio::fs::metadata(source)
            .await
            .map_err(io_error(source))?;
        if meta.len() > MAX_IMAGE_BYTES {
            return Err(ImageStoreError::TooLarge(meta.len()));
        }

        let bytes = tokio::fs::read(source).await.map_err(io_error(source))?;
        let file_name = format!("{:x}.{}", Sha256::digest(&bytes), ext);

        let folder = self.root.join(COVER_FOLDER);
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(io_error(&folder))?;

        let dest = folder.join(&file_name);
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            tracing::debug!(path = %dest.display(), "Image already stored");
        } else {
            let temp = dest.with_extension(format!("{ext}.tmp"));
            tokio::fs::write(&temp, &bytes)
                .await
                .map_err(io_error(&temp))?;
            if let Err(e) = tokio::fs::rename(&temp, &dest).await {
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(io_error(&dest)(e));
            }
            tracing::info!(path = %dest.display(), bytes = bytes.len(), "Stored image");
        }

        Ok(format!("{}/{}/{}", self.public_base_url, COVER_FOLDER, file_name))
    }

    /// Deletes a stored image by its public URL.
    ///
    /// Returns `Ok(false)` for URLs this store does not manage (external
    /// links pasted by hand) and for files that are already gone.
    pub async fn remove(&self, url: &str) -> Result<bool, ImageStoreError> {
        let Some(path) = self.path_for(url) else {
            return Ok(false);
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Removed image");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path)(e)),
        }
    }

    /// Whether a URL points at a file managed by this store.
    pub fn owns(&self, url: &str) -> bool {
        self.path_for(url).is_some()
    }

    fn path_for(&self, url: &str) -> Option<PathBuf> {
        let rest = url
            .strip_prefix(&self.public_base_url)?
            .strip_prefix('/')?
            .strip_prefix(COVER_FOLDER)?
            .strip_prefix('/')?;

        // Only flat file names produced by upload(); rejects traversal like "../"
        let valid = !rest.is_empty()
            && rest
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.')
            && !rest.starts_with('.');
        valid.then(|| self.root.join(COVER_FOLDER).join(rest))
    }
}

fn image_extension(path: &Path) -> Result<String, ImageStoreError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(ImageStoreError::UnsupportedType(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("folio_images_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_upload_then_remove() {
        let dir = temp_dir("upload_remove");
        let source = dir.join("cover.JPG");
        std::fs::write(&source, b"fake jpeg bytes").unwrap();

        let store = ImageStore::new(dir.join("store"), "/uploads/");
        let url = store.upload(&source).await.unwrap();

        assert!(url.starts_with("/uploads/book-covers/"));
        assert!(url.ends_with(".jpg"));
        assert!(store.owns(&url));

        let stored = dir
            .join("store")
            .join("book-covers")
            .join(url.rsplit('/').next().unwrap());
        assert_eq!(std::fs::read(&stored).unwrap(), b"fake jpeg bytes");

        assert!(store.remove(&url).await.unwrap());
        assert!(!stored.exists());
        // Second removal is a no-op
        assert!(!store.remove(&url).await.unwrap());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_same_content_same_url() {
        let dir = temp_dir("dedupe");
        let a = dir.join("a.png");
        let b = dir.join("b.png");
        std::fs::write(&a, b"identical").unwrap();
        std::fs::write(&b, b"identical").unwrap();

        let store = ImageStore::new(dir.join("store"), "https://cdn.example.com");
        let url_a = store.upload(&a).await.unwrap();
        let url_b = store.upload(&b).await.unwrap();
        assert_eq!(url_a, url_b);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_rejects_non_image_extension() {
        let dir = temp_dir("bad_ext");
        let source = dir.join("notes.txt");
        std::fs::write(&source, b"hello").unwrap();

        let store = ImageStore::new(dir.join("store"), "/uploads");
        let err = store.upload(&source).await.unwrap_err();
        assert!(matches!(err, ImageStoreError::UnsupportedType(ref ext) if ext == "txt"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_source_is_io_error() {
        let dir = temp_dir("missing");
        let store = ImageStore::new(dir.join("store"), "/uploads");
        let err = store.upload(&dir.join("nope.png")).await.unwrap_err();
        assert!(matches!(err, ImageStoreError::Io { .. }));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_foreign_urls_ignored() {
        let store = ImageStore::new("/tmp/folio_never_used", "/uploads");
        assert!(!store.owns("https://res.cloudinary.com/demo/book-covers/x.jpg"));
        assert!(!store.owns("/uploads/book-covers/../../etc/passwd"));
        assert!(!store.owns("/uploads/other/abc.jpg"));
        assert!(!store.remove("https://elsewhere.example/a.jpg").await.unwrap());
    }
}
