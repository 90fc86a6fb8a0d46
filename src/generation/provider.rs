use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, FinishReason,
    },
    Client,
};
use async_trait::async_trait;
use thiserror::Error;

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Why the model stopped. `Length` and `ContentFilter` mean the response was
/// cut off and a continuation round may recover the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    Stop,
    Length,
    ContentFilter,
    Other,
}

impl Finish {
    pub fn is_truncated(&self) -> bool {
        matches!(self, Finish::Length | Finish::ContentFilter)
    }
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub finish: Finish,
}

#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("model context window exceeded: {0}")]
    ContextOverflow(String),
    #[error("model request failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<Completion, ProviderError>;
}

/// Chat-completions adapter over an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiProvider {
    pub fn from_config(config: &AppConfig) -> Self {
        let mut openai_config = OpenAIConfig::new();
        if let Some(key) = &config.openai_api_key {
            openai_config = openai_config.with_api_key(key.clone());
        }
        if let Some(base) = &config.openai_base_url {
            openai_config = openai_config.with_api_base(base.clone());
        }
        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
        }
    }
}

/// Newer reasoning-model families reject explicit max-token and temperature
/// parameters; those requests must omit them entirely.
pub fn supports_sampling_params(model: &str) -> bool {
    let family_prefixes = ["o1", "o3", "o4", "gpt-5"];
    !family_prefixes
        .iter()
        .any(|prefix| model.starts_with(prefix))
}

fn convert_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let converted = match message.role {
        ChatRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.clone())
            .build()?
            .into(),
        ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.clone())
            .build()?
            .into(),
        ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(message.content.clone())
            .build()?
            .into(),
    };
    Ok(converted)
}

fn classify_error(err: OpenAIError) -> ProviderError {
    let message = err.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("context_length")
        || lowered.contains("maximum context length")
        || lowered.contains("context window")
    {
        ProviderError::ContextOverflow(message)
    } else {
        ProviderError::Failed(message)
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<Completion, ProviderError> {
        let converted: Vec<ChatCompletionRequestMessage> = messages
            .iter()
            .map(convert_message)
            .collect::<Result<_, _>>()
            .map_err(|err| ProviderError::Failed(err.to_string()))?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(converted).n(1);
        if supports_sampling_params(&self.model) {
            if let Some(max_tokens) = options.max_tokens {
                args.max_tokens(max_tokens);
            }
            if let Some(temperature) = options.temperature {
                args.temperature(temperature);
            }
        }
        let request = args.build().map_err(classify_error)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify_error)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Failed("model returned no choices".into()))?;

        let finish = match choice.finish_reason {
            Some(FinishReason::Length) => Finish::Length,
            Some(FinishReason::ContentFilter) => Finish::ContentFilter,
            Some(FinishReason::Stop) => Finish::Stop,
            Some(_) => Finish::Other,
            None => Finish::Stop,
        };

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            finish,
        })
    }
}
