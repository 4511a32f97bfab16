use std::future::Future;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use image::ImageFormat;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub const PAYMENT_PROOF_FOLDER: &str = "payment_proofs";
pub const PROFILE_PHOTO_FOLDER: &str = "profile_photos";

pub const MAX_EVIDENCE_SIZE: usize = 2 * 1024 * 1024; // 2MB
pub const MAX_PROFILE_PHOTO_SIZE: usize = 4 * 1024 * 1024; // 4MB

/// An uploaded binary waiting to be handed to the media host.
#[derive(Debug, Clone)]
pub struct Evidence {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Evidence {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// JPEG or PNG only, checked against both the declared type and the bytes.
    pub fn validate_image(&self, max_size: usize) -> AppResult<()> {
        if !validate_image_content_type(&self.content_type) {
            return Err(AppError::Validation(
                "Format harus JPG, JPEG, atau PNG".to_string(),
            ));
        }

        if self.data.is_empty() {
            return Err(AppError::Validation("Berkas kosong".to_string()));
        }

        if self.data.len() > max_size {
            return Err(AppError::Validation(format!(
                "Ukuran berkas maksimal {}MB",
                max_size / (1024 * 1024)
            )));
        }

        match image::guess_format(&self.data) {
            Ok(ImageFormat::Jpeg) | Ok(ImageFormat::Png) => Ok(()),
            _ => Err(AppError::Validation(
                "Isi berkas bukan gambar JPG atau PNG".to_string(),
            )),
        }
    }

    fn extension(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
            .unwrap_or("bin")
    }
}

pub fn validate_image_content_type(content_type: &str) -> bool {
    matches!(content_type, "image/jpeg" | "image/jpg" | "image/png")
}

/// Remote media host that keeps evidence and photos and hands back durable URLs.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    async fn store(&self, evidence: Evidence, folder: &str) -> AppResult<String>;
    async fn delete(&self, url: &str) -> AppResult<()>;
}

/// Swaps a hosted asset: upload the replacement, `persist` its URL, and only
/// then remove the previously hosted asset.
///
/// If `persist` fails the fresh upload is removed again and the previous asset
/// is left alone. Removing the old asset is best-effort: a failure is logged
/// and the new URL is still returned.
pub async fn replace_asset<F, Fut>(
    store: &dyn EvidenceStore,
    previous: Option<&str>,
    replacement: Evidence,
    folder: &str,
    persist: F,
) -> AppResult<String>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = AppResult<()>>,
{
    let url = store.store(replacement, folder).await?;

    if let Err(e) = persist(url.clone()).await {
        if let Err(cleanup) = store.delete(&url).await {
            tracing::warn!(url = %url, error = %cleanup, "Failed to delete unsaved asset");
        }
        return Err(e);
    }

    if let Some(old) = previous.filter(|old| old.starts_with("http")) {
        if let Err(e) = store.delete(old).await {
            tracing::warn!(url = %old, error = %e, "Failed to delete replaced asset");
        }
    }

    Ok(url)
}

pub struct S3EvidenceStore {
    client: Client,
    bucket: String,
    public_url: Option<String>,
}

impl S3EvidenceStore {
    pub fn new(config: &Config) -> Self {
        let credentials = Credentials::new(
            &config.minio_access_key,
            &config.minio_secret_key,
            None,
            None,
            "kos",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new("us-east-1"))
            .endpoint_url(&config.minio_endpoint)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.minio_bucket.clone(),
            public_url: config.minio_public_url.clone(),
        }
    }

    pub fn key_from_url(&self, url: &str) -> Option<String> {
        key_from_url(&self.bucket, url)
    }
}

fn key_from_url(bucket: &str, url: &str) -> Option<String> {
    let prefix = format!("/{}/", bucket);
    url.find(&prefix)
        .map(|pos| url[pos + prefix.len()..].to_string())
        .filter(|key| !key.is_empty())
}

#[async_trait]
impl EvidenceStore for S3EvidenceStore {
    async fn store(&self, evidence: Evidence, folder: &str) -> AppResult<String> {
        let key = format!("{}/{}.{}", folder, Uuid::new_v4(), evidence.extension());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(evidence.data))
            .content_type(evidence.content_type)
            .send()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;

        tracing::debug!(key = %key, "Stored object");

        let url = match &self.public_url {
            Some(base_url) => format!("{}/{}/{}", base_url, self.bucket, key),
            None => format!("/{}/{}", self.bucket, key),
        };

        Ok(url)
    }

    async fn delete(&self, url: &str) -> AppResult<()> {
        let key = self
            .key_from_url(url)
            .ok_or_else(|| AppError::Delete(format!("URL is not hosted in this bucket: {}", url)))?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| AppError::Delete(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::{InMemoryEvidenceStore, SAMPLE_JPEG, SAMPLE_PNG};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[test]
    fn test_validate_image_accepts_png_and_jpeg() {
        let png = Evidence::new("bukti.png", "image/png", SAMPLE_PNG.to_vec());
        assert!(png.validate_image(MAX_EVIDENCE_SIZE).is_ok());

        let jpeg = Evidence::new("bukti.jpg", "image/jpeg", SAMPLE_JPEG.to_vec());
        assert!(jpeg.validate_image(MAX_EVIDENCE_SIZE).is_ok());
    }

    #[test]
    fn test_validate_image_rejects_bad_input() {
        let gif = Evidence::new("bukti.gif", "image/gif", SAMPLE_PNG.to_vec());
        assert!(matches!(gif.validate_image(MAX_EVIDENCE_SIZE), Err(AppError::Validation(_))));

        let disguised = Evidence::new("bukti.png", "image/png", b"%PDF-1.7".to_vec());
        assert!(matches!(
            disguised.validate_image(MAX_EVIDENCE_SIZE),
            Err(AppError::Validation(_))
        ));

        let mut big = SAMPLE_PNG.to_vec();
        big.resize(MAX_EVIDENCE_SIZE + 1, 0);
        let oversized = Evidence::new("bukti.png", "image/png", big);
        assert!(matches!(
            oversized.validate_image(MAX_EVIDENCE_SIZE),
            Err(AppError::Validation(_))
        ));

        let empty = Evidence::new("bukti.png", "image/png", Vec::new());
        assert!(empty.validate_image(MAX_EVIDENCE_SIZE).is_err());
    }

    #[test]
    fn test_extension() {
        assert_eq!(Evidence::new("a.b.png", "image/png", vec![]).extension(), "png");
        assert_eq!(Evidence::new("noext", "image/png", vec![]).extension(), "bin");
    }

    #[test]
    fn test_key_from_url() {
        assert_eq!(
            key_from_url("kos", "https://cdn.example/kos/payment_proofs/a.png"),
            Some("payment_proofs/a.png".to_string())
        );
        assert_eq!(key_from_url("kos", "https://res.cloudinary.com/x/old.jpg"), None);
    }

    #[tokio::test]
    async fn test_replace_asset_removes_previous() {
        let store = InMemoryEvidenceStore::new();
        let old = store
            .store(Evidence::new("old.png", "image/png", SAMPLE_PNG.to_vec()), PROFILE_PHOTO_FOLDER)
            .await
            .unwrap();

        let saved = Arc::new(Mutex::new(None));
        let new = replace_asset(
            &store,
            Some(&old),
            Evidence::new("new.png", "image/png", SAMPLE_PNG.to_vec()),
            PROFILE_PHOTO_FOLDER,
            |url| {
                let saved = saved.clone();
                async move {
                    *saved.lock().await = Some(url);
                    Ok::<(), AppError>(())
                }
            },
        )
        .await
        .unwrap();

        assert_ne!(old, new);
        assert_eq!(saved.lock().await.as_deref(), Some(new.as_str()));
        assert!(!store.contains(&old).await);
        assert!(store.contains(&new).await);
    }

    #[tokio::test]
    async fn test_replace_asset_keeps_previous_when_persist_fails() {
        let store = InMemoryEvidenceStore::new();
        let old = store
            .store(Evidence::new("old.png", "image/png", SAMPLE_PNG.to_vec()), PROFILE_PHOTO_FOLDER)
            .await
            .unwrap();

        let result = replace_asset(
            &store,
            Some(&old),
            Evidence::new("new.png", "image/png", SAMPLE_PNG.to_vec()),
            PROFILE_PHOTO_FOLDER,
            |_| async { Err::<(), _>(AppError::Internal("tenant row not updated".to_string())) },
        )
        .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(store.contains(&old).await);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_replace_asset_keeps_previous_when_upload_fails() {
        let store = InMemoryEvidenceStore::new();
        let old = store
            .store(Evidence::new("old.png", "image/png", SAMPLE_PNG.to_vec()), PROFILE_PHOTO_FOLDER)
            .await
            .unwrap();
        store.fail_uploads(true);

        let result = replace_asset(
            &store,
            Some(&old),
            Evidence::new("new.png", "image/png", SAMPLE_PNG.to_vec()),
            PROFILE_PHOTO_FOLDER,
            |_| async { Ok::<(), AppError>(()) },
        )
        .await;

        assert!(matches!(result, Err(AppError::Upload(_))));
        assert!(store.contains(&old).await);
    }
}
