//! Upload processing: classification, key layout and writes to the media store

use std::sync::Arc;

use media_store::MediaStore;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::error::{AppError, Result};
use crate::models::{MediaType, NewMedia};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "heic"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt"];

pub const MAX_CAPTION_CHARS: usize = 100;
/// Width of `media.filename`
pub const MAX_FILENAME_CHARS: usize = 255;

/// Media type and lowercased extension for a client-supplied filename
pub fn classify(filename: &str) -> Result<(MediaType, String)> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.trim().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .ok_or_else(|| AppError::BadRequest("Unsupported file type".to_string()))?;

    let media_type = if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        MediaType::Image
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaType::Video
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        MediaType::Audio
    } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
        MediaType::Document
    } else {
        return Err(AppError::BadRequest("Unsupported file type".to_string()));
    };

    Ok((media_type, ext))
}

/// Shortens the stem so the name fits the `media.filename` column; the extension is kept
pub fn fit_filename(filename: &str) -> String {
    let total = filename.chars().count();
    if total <= MAX_FILENAME_CHARS {
        return filename.to_string();
    }

    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if ext.chars().count() < MAX_FILENAME_CHARS => (stem, ext),
        _ => return filename.chars().take(MAX_FILENAME_CHARS).collect(),
    };

    let keep = MAX_FILENAME_CHARS - ext.chars().count() - 1;
    let mut fitted: String = stem.chars().take(keep).collect();
    fitted.push('.');
    fitted.push_str(ext);
    fitted
}

/// Store-relative key; the store applies its own prefix
pub fn storage_key(media_type: MediaType, ext: &str) -> String {
    format!("{}s/{}.{}", media_type.as_str(), Uuid::new_v4(), ext)
}

/// Multipart field names used by the submission form: `media_N` and `media_N_caption`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaField {
    File(u32),
    Caption(u32),
}

pub fn parse_media_field(name: &str) -> Option<MediaField> {
    let rest = name.strip_prefix("media_")?;
    if let Some(index) = rest.strip_suffix("_caption") {
        return index.parse().ok().map(MediaField::Caption);
    }
    rest.parse().ok().map(MediaField::File)
}

#[derive(Clone)]
pub struct MediaService {
    store: Arc<dyn MediaStore>,
    max_file_bytes: usize,
}

impl MediaService {
    pub fn new(store: Arc<dyn MediaStore>, uploads: &UploadConfig) -> Self {
        Self {
            store,
            max_file_bytes: uploads.max_file_bytes,
        }
    }

    /// Validate and upload one file
    pub async fn store(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        caption: Option<String>,
    ) -> Result<NewMedia> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(AppError::BadRequest("No file selected".to_string()));
        }

        let (media_type, ext) = classify(filename)?;

        if bytes.len() > self.max_file_bytes {
            return Err(AppError::BadRequest(format!(
                "File {} exceeds the maximum size of {} MB",
                filename,
                self.max_file_bytes / (1024 * 1024)
            )));
        }

        let caption = caption
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if caption
            .as_ref()
            .is_some_and(|c| c.chars().count() > MAX_CAPTION_CHARS)
        {
            return Err(AppError::BadRequest(format!(
                "Caption must be {} characters or fewer",
                MAX_CAPTION_CHARS
            )));
        }

        let key = storage_key(media_type, &ext);
        let content_type = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string();
        let size = bytes.len();

        let url = self.store.put(&key, bytes, &content_type).await?;

        tracing::info!(key = %key, media_type = media_type.as_str(), size, "media stored");

        Ok(NewMedia {
            url,
            media_type,
            storage_key: key,
            filename: fit_filename(filename),
            caption,
        })
    }

    /// Best-effort removal; failures are logged only
    pub async fn discard(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.store.delete(key).await {
                tracing::warn!(key = %key, error = %e, "failed to delete stored media");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_store::MemoryMediaStore;

    fn service(max_file_bytes: usize) -> (MediaService, MemoryMediaStore) {
        let store = MemoryMediaStore::new("http://media.test");
        let uploads = UploadConfig {
            max_media_per_post: 5,
            max_file_bytes,
        };
        (MediaService::new(Arc::new(store.clone()), &uploads), store)
    }

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(classify("photo.JPG").unwrap().0, MediaType::Image);
        assert_eq!(classify("photo.heic").unwrap().0, MediaType::Image);
        assert_eq!(classify("clip.mov").unwrap().0, MediaType::Video);
        assert_eq!(classify("song.m4a").unwrap().0, MediaType::Audio);
        assert_eq!(classify("letter.docx").unwrap().0, MediaType::Document);
        assert_eq!(classify("a.b.png").unwrap().1, "png");
    }

    #[test]
    fn test_classify_rejects_unknown() {
        assert!(matches!(classify("virus.exe"), Err(AppError::BadRequest(_))));
        assert!(matches!(classify("noextension"), Err(AppError::BadRequest(_))));
        assert!(matches!(classify("trailingdot."), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_storage_key_layout() {
        let key = storage_key(MediaType::Video, "mp4");
        assert!(key.starts_with("videos/"));
        assert!(key.ends_with(".mp4"));
    }

    #[test]
    fn test_fit_filename_keeps_extension() {
        assert_eq!(fit_filename("porch.jpg"), "porch.jpg");

        let long = format!("{}.jpeg", "a".repeat(400));
        let fitted = fit_filename(&long);
        assert_eq!(fitted.chars().count(), MAX_FILENAME_CHARS);
        assert!(fitted.ends_with("a.jpeg"));

        let wide = format!("{}.png", "é".repeat(300));
        assert_eq!(fit_filename(&wide).chars().count(), MAX_FILENAME_CHARS);
    }

    #[test]
    fn test_parse_media_field() {
        assert_eq!(parse_media_field("media_0"), Some(MediaField::File(0)));
        assert_eq!(parse_media_field("media_3_caption"), Some(MediaField::Caption(3)));
        assert_eq!(parse_media_field("media_x"), None);
        assert_eq!(parse_media_field("title"), None);
    }

    #[tokio::test]
    async fn test_store_writes_object_with_guessed_type() {
        let (media, store) = service(1024);
        let stored = media
            .store("porch.png", b"png".to_vec(), Some("  Front porch ".into()))
            .await
            .unwrap();

        assert_eq!(stored.media_type, MediaType::Image);
        assert_eq!(stored.caption.as_deref(), Some("Front porch"));
        assert!(stored.url.starts_with("http://media.test/images/"));

        let object = store.get(&stored.storage_key).await.unwrap();
        assert_eq!(object.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_store_rejects_oversized_file() {
        let (media, store) = service(2);
        let err = media.store("big.jpg", vec![0; 3], None).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_shortens_long_filename() {
        let (media, _store) = service(1024);
        let name = format!("{}.txt", "scan-".repeat(80));
        let stored = media.store(&name, b"hi".to_vec(), None).await.unwrap();

        assert_eq!(stored.filename.chars().count(), MAX_FILENAME_CHARS);
        assert!(stored.filename.ends_with(".txt"));
        assert!(stored.storage_key.ends_with(".txt"));
    }

    #[tokio::test]
    async fn test_discard_ignores_missing_objects() {
        let (media, store) = service(1024);
        let stored = media.store("a.txt", b"hi".to_vec(), None).await.unwrap();

        media
            .discard(&[stored.storage_key.clone(), "documents/missing.txt".into()])
            .await;
        assert!(store.is_empty().await);
    }
}
