use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub cors_allowed_origin: Option<String>,
    pub demo_token: String,
    pub demo_user_id: Uuid,
    pub data_dir: PathBuf,
    pub use_cloud_storage: bool,
    pub production: bool,
    pub aws_endpoint_url: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: String,
    pub s3_bucket: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub model: String,
    pub system_prompt: Option<String>,
    pub prompt_blog: Option<String>,
    pub prompt_linkedin: Option<String>,
    pub prompt_twitter: Option<String>,
    pub prompt_podcast: Option<String>,
    pub prompt_thread: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();

        let demo_token = env::var("DEMO_TOKEN").unwrap_or_else(|_| "demo-token".to_string());
        let demo_user_id = env::var("DEMO_USER_ID")
            .ok()
            .map(|raw| raw.parse().context("DEMO_USER_ID must be a valid UUID"))
            .transpose()?
            .unwrap_or_else(|| Uuid::nil());

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let use_cloud_storage = env_flag("USE_CLOUD_STORAGE");
        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let aws_endpoint_url = env::var("AWS_ENDPOINT_URL").ok();
        let aws_access_key_id = env::var("AWS_ACCESS_KEY_ID").ok();
        let aws_secret_access_key = env::var("AWS_SECRET_ACCESS_KEY").ok();
        let aws_region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let s3_bucket = env::var("S3_BUCKET").ok();

        if (use_cloud_storage || production) && s3_bucket.is_none() {
            anyhow::bail!("S3_BUCKET must be set when cloud storage is selected");
        }

        let openai_api_key = env::var("OPENAI_API_KEY").ok();
        let openai_base_url = env::var("OPENAI_BASE_URL").ok();
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let system_prompt = env::var("SYSTEM_PROMPT").ok();
        let prompt_blog = env::var("PROMPT_BLOG").ok();
        let prompt_linkedin = env::var("PROMPT_LINKEDIN").ok();
        let prompt_twitter = env::var("PROMPT_TWITTER").ok();
        let prompt_podcast = env::var("PROMPT_PODCAST").ok();
        let prompt_thread = env::var("PROMPT_THREAD").ok();

        Ok(Self {
            server_host,
            server_port,
            cors_allowed_origin,
            demo_token,
            demo_user_id,
            data_dir,
            use_cloud_storage,
            production,
            aws_endpoint_url,
            aws_access_key_id,
            aws_secret_access_key,
            aws_region,
            s3_bucket,
            openai_api_key,
            openai_base_url,
            model,
            system_prompt,
            prompt_blog,
            prompt_linkedin,
            prompt_twitter,
            prompt_podcast,
            prompt_thread,
        })
    }

    /// Object storage is selected by an explicit opt-in flag or by running
    /// in production; everything else uses the local file backend.
    pub fn wants_cloud_storage(&self) -> bool {
        self.use_cloud_storage || self.production
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::AppConfig;

    #[test]
    fn cloud_selection_combines_flag_and_environment() {
        let mut config = test_config();
        assert!(!config.wants_cloud_storage());

        config.use_cloud_storage = true;
        assert!(config.wants_cloud_storage());

        config.use_cloud_storage = false;
        config.production = true;
        assert!(config.wants_cloud_storage());
    }

    fn test_config() -> AppConfig {
        AppConfig {
            server_host: "127.0.0.1".into(),
            server_port: 0,
            cors_allowed_origin: None,
            demo_token: "demo-token".into(),
            demo_user_id: uuid::Uuid::nil(),
            data_dir: "./data".into(),
            use_cloud_storage: false,
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
}
