use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder as S3ConfigBuilder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;

use crate::config::AppConfig;

/// Uninterpreted get/put/delete of named JSON blobs. Implementations carry
/// no business knowledge; a missing blob is `Ok(None)`, not an error.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>>;

    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<()>;

    async fn delete(&self, name: &str) -> Result<()>;
}

pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
}

impl S3BlobStore {
    /// Builds the client from the app's own settings: the configured region,
    /// an optional endpoint override (MinIO and friends), and optional
    /// static credentials. Path-style addressing so bucket names never have
    /// to be valid hostnames.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let bucket = config
            .s3_bucket
            .clone()
            .context("S3_BUCKET must be set when cloud storage is selected")?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()));
        if let Some(endpoint) = &config.aws_endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(access_key), Some(secret_key)) = (
            config.aws_access_key_id.clone(),
            config.aws_secret_access_key.clone(),
        ) {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "voicepress-config",
            ));
        }

        let base_config = loader.load().await;
        let s3_config = S3ConfigBuilder::from(&base_config)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: S3Client::from_conf(s3_config),
            bucket,
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await;

        let output = match response {
            Ok(output) => output,
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|service| service.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    return Ok(None);
                }
                return Err(err).context("failed to download blob from S3");
            }
        };

        let bytes = output
            .body
            .collect()
            .await
            .context("failed to read blob stream")?
            .into_bytes()
            .to_vec();

        Ok(Some(bytes))
    }

    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .content_type("application/json")
            .body(ByteStream::from(bytes))
            .send()
            .await
            .context("failed to upload blob to S3")?;

        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .context("failed to delete blob from S3")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            server_host: "127.0.0.1".into(),
            server_port: 0,
            cors_allowed_origin: None,
            demo_token: "demo-token".into(),
            demo_user_id: uuid::Uuid::nil(),
            data_dir: "./data".into(),
            use_cloud_storage: true,
            production: false,
            aws_endpoint_url: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: "us-east-1".into(),
            s3_bucket: None,
            openai_api_key: None,
            openai_base_url: None,
            model: "gpt-4o".into(),
            system_prompt: None,
            prompt_blog: None,
            prompt_linkedin: None,
            prompt_twitter: None,
            prompt_podcast: None,
            prompt_thread: None,
        }
    }

    #[tokio::test]
    async fn client_construction_requires_a_bucket() {
        let config = base_config();
        assert!(S3BlobStore::from_config(&config).await.is_err());
    }

    #[tokio::test]
    async fn builds_with_endpoint_override_and_static_credentials() {
        let mut config = base_config();
        config.s3_bucket = Some("blobs".into());
        config.aws_endpoint_url = Some("http://127.0.0.1:9000".into());
        config.aws_access_key_id = Some("access".into());
        config.aws_secret_access_key = Some("secret".into());

        let store = S3BlobStore::from_config(&config)
            .await
            .expect("client builds without touching the network");
        assert_eq!(store.bucket, "blobs");
    }
}
