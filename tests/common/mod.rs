use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use http_body_util::BodyExt;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

use voicepress::config::AppConfig;
use voicepress::generation::provider::{
    ChatMessage, ChatOptions, ChatProvider, ChatRole, Completion, Finish, ProviderError,
};
use voicepress::generation::{ContentGenerator, PromptSet};
use voicepress::routes;
use voicepress::state::AppState;
use voicepress::storage::{BlobStore, HybridStorage};

pub const DEMO_TOKEN: &str = "test-token";

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.lock().await.get(name).cloned())
    }

    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        self.blobs.lock().await.insert(name.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.blobs.lock().await.remove(name);
        Ok(())
    }
}

pub type Responder =
    Box<dyn Fn(&[ChatMessage]) -> Result<Completion, ProviderError> + Send + Sync>;

/// Fake model backend. The default responder answers every prompt with a
/// canned completion keyed off the prompt text, so full generation flows run
/// without a network.
pub struct ScriptedProvider {
    responder: Responder,
    calls: std::sync::Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    pub fn new(responder: Responder) -> Self {
        Self {
            responder,
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn canned() -> Self {
        Self::new(Box::new(default_responder))
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn default_responder(messages: &[ChatMessage]) -> Result<Completion, ProviderError> {
    let refining = messages
        .iter()
        .any(|m| matches!(m.role, ChatRole::Assistant));
    let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
    let text = if refining {
        "Refined output.".to_string()
    } else if last.contains("thread") {
        "1. First tweet from the model\n2. Second tweet from the model".to_string()
    } else if last.contains("blog post") {
        "Generated blog post. It has several sentences. Each one carries a point.".to_string()
    } else if last.contains("LinkedIn") {
        "Generated LinkedIn post.".to_string()
    } else if last.contains("Twitter") {
        "Generated Twitter post.".to_string()
    } else if last.contains("podcast") {
        "Generated podcast script.".to_string()
    } else {
        "Generated output.".to_string()
    };
    Ok(Completion {
        text,
        finish: Finish::Stop,
    })
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: &ChatOptions,
    ) -> Result<Completion, ProviderError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        (self.responder)(messages)
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    provider: Arc<ScriptedProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_provider(ScriptedProvider::canned())
    }

    pub fn with_provider(provider: ScriptedProvider) -> Self {
        let config = test_config();
        let local: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::default());
        let store = Arc::new(HybridStorage::new(None, local, false));

        let provider = Arc::new(provider);
        let generator = Arc::new(ContentGenerator::new(
            provider.clone(),
            PromptSet::default(),
        ));

        let state = AppState::new(config, store, generator);
        let router = routes::create_router(state.clone());
        Self {
            state,
            router,
            provider,
        }
    }

    #[allow(dead_code)]
    pub fn provider(&self) -> Arc<ScriptedProvider> {
        self.provider.clone()
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PATCH, path, payload, token).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::DELETE).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn body_to_json(body: Body) -> Result<serde_json::Value> {
    let bytes = body_to_vec(body).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn test_config() -> AppConfig {
    AppConfig {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        cors_allowed_origin: None,
        demo_token: DEMO_TOKEN.to_string(),
        demo_user_id: Uuid::nil(),
        data_dir: "./test-data".into(),
        use_cloud_storage: false,
        production: false,
        aws_endpoint_url: None,
        aws_access_key_id: None,
        aws_secret_access_key: None,
        aws_region: "us-east-1".to_string(),
        s3_bucket: None,
        openai_api_key: None,
        openai_base_url: None,
        model: "gpt-4o".to_string(),
        system_prompt: None,
        prompt_blog: None,
        prompt_linkedin: None,
        prompt_twitter: None,
        prompt_podcast: None,
        prompt_thread: None,
    }
}
