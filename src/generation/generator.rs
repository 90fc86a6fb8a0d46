use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, warn};

use super::prompts::PromptSet;
use super::provider::{ChatMessage, ChatOptions, ChatProvider, ProviderError};
use super::thread::{fallback_thread, looks_like_refusal, parse_model_thread};
use crate::models::{GeneratedContent, Platform};

pub const MAX_CONTINUATION_ROUNDS: usize = 10;
pub const CHUNK_SIZE_CHARS: usize = 8000;
pub const CONTINUE_PROMPT: &str =
    "Continue exactly where you left off. Do not repeat any text you have already written.";

const BOUNDED_MAX_TOKENS: u32 = 1500;
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Generation failures surface as a generic error; the underlying provider
/// failure is logged, not exposed. No retries.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to generate content")]
    Generation,
    #[error("failed to refine content")]
    Refinement,
}

pub struct ContentGenerator {
    provider: Arc<dyn ChatProvider>,
    prompts: PromptSet,
}

impl ContentGenerator {
    pub fn new(provider: Arc<dyn ChatProvider>, prompts: PromptSet) -> Self {
        Self { provider, prompts }
    }

    /// Generates one platform's output. Blog posts are long-form: unbounded
    /// length with a continuation loop, falling back to chunked generation
    /// when the transcript itself overflows the context window. Every other
    /// platform is a single bounded request.
    pub async fn generate(
        &self,
        platform: Platform,
        transcript: &str,
        input_language: &str,
        output_language: &str,
    ) -> Result<String, GenerateError> {
        let system = ChatMessage::system(self.prompts.system(input_language, output_language));

        let result = match platform {
            Platform::Blog => {
                self.generate_blog(&system, transcript, input_language, output_language)
                    .await
            }
            _ => {
                let prompt = self.prompts.for_platform(
                    platform,
                    input_language,
                    output_language,
                    transcript,
                );
                self.provider
                    .complete(
                        &[system, ChatMessage::user(prompt)],
                        &bounded_options(),
                    )
                    .await
                    .map(|completion| completion.text)
            }
        };

        result.map_err(|err| {
            error!(platform = platform.as_str(), error = %err, "content generation failed");
            GenerateError::Generation
        })
    }

    async fn generate_blog(
        &self,
        system: &ChatMessage,
        transcript: &str,
        input_language: &str,
        output_language: &str,
    ) -> Result<String, ProviderError> {
        let prompt =
            self.prompts
                .for_platform(Platform::Blog, input_language, output_language, transcript);
        let base = vec![system.clone(), ChatMessage::user(prompt)];

        match self.generate_long(&base).await {
            Ok(text) => Ok(text),
            Err(ProviderError::ContextOverflow(message)) => {
                warn!(error = %message, "transcript exceeds context window, switching to chunked generation");
                self.generate_chunked(system, transcript, input_language, output_language)
                    .await
            }
            Err(err) => Err(err),
        }
    }

    /// Issues the request and keeps asking the model to continue while the
    /// response is cut off (length or content-filter finish), up to
    /// `MAX_CONTINUATION_ROUNDS`. The accumulated text is replayed as an
    /// assistant turn; the model is trusted not to repeat itself.
    async fn generate_long(&self, base: &[ChatMessage]) -> Result<String, ProviderError> {
        let mut completion = self.provider.complete(base, &unbounded_options()).await?;
        let mut accumulated = completion.text;

        let mut rounds = 0;
        while completion.finish.is_truncated() && rounds < MAX_CONTINUATION_ROUNDS {
            rounds += 1;
            let mut messages = base.to_vec();
            messages.push(ChatMessage::assistant(accumulated.clone()));
            messages.push(ChatMessage::user(CONTINUE_PROMPT));
            completion = self
                .provider
                .complete(&messages, &unbounded_options())
                .await?;
            accumulated.push_str(&completion.text);
        }

        Ok(accumulated)
    }

    /// Splits the transcript into fixed-size character chunks and runs the
    /// blog flow independently per chunk, each informed of its position.
    /// No cross-chunk coherence pass beyond the positional note.
    async fn generate_chunked(
        &self,
        system: &ChatMessage,
        transcript: &str,
        input_language: &str,
        output_language: &str,
    ) -> Result<String, ProviderError> {
        let chunks = chunk_transcript(transcript, CHUNK_SIZE_CHARS);
        let total = chunks.len();
        let mut sections = Vec::with_capacity(total);

        for (index, chunk) in chunks.iter().enumerate() {
            let mut prompt = self.prompts.for_platform(
                Platform::Blog,
                input_language,
                output_language,
                chunk,
            );
            prompt.push_str(&format!(
                "\n\nThis transcript is part {} of {} of a longer recording; write the corresponding section of the blog post.",
                index + 1,
                total
            ));
            let base = vec![system.clone(), ChatMessage::user(prompt)];
            sections.push(self.generate_long(&base).await?);
        }

        Ok(sections.join("\n\n"))
    }

    /// Generates the full per-platform bundle. The blog is generated first
    /// because it is the richest fallback source for thread splitting; the
    /// short-form platforms run in parallel after it, then the thread.
    pub async fn generate_all(
        &self,
        transcript: &str,
        input_language: &str,
        output_language: &str,
    ) -> Result<GeneratedContent, GenerateError> {
        let blog_post = self
            .generate(Platform::Blog, transcript, input_language, output_language)
            .await?;

        let (linkedin, twitter, podcast) = tokio::join!(
            self.generate(Platform::Linkedin, transcript, input_language, output_language),
            self.generate(Platform::Twitter, transcript, input_language, output_language),
            self.generate(Platform::Podcast, transcript, input_language, output_language),
        );

        let twitter_thread = self
            .generate_thread(transcript, input_language, output_language, &blog_post)
            .await;

        Ok(GeneratedContent {
            blog_post,
            linkedin_post: linkedin?,
            twitter_post: twitter?,
            podcast_script: podcast?,
            twitter_thread: Some(twitter_thread),
            generated_at: Utc::now(),
        })
    }

    /// Asks the model for a numbered tweet list; on failure, refusal, or
    /// empty output, splits the fallback source deterministically instead of
    /// erroring.
    pub async fn generate_thread(
        &self,
        transcript: &str,
        input_language: &str,
        output_language: &str,
        fallback_source: &str,
    ) -> Vec<String> {
        let system = ChatMessage::system(self.prompts.system(input_language, output_language));
        let prompt = self
            .prompts
            .thread(input_language, output_language, transcript);

        match self
            .provider
            .complete(&[system, ChatMessage::user(prompt)], &bounded_options())
            .await
        {
            Ok(completion) if !looks_like_refusal(&completion.text) => {
                let tweets = parse_model_thread(&completion.text);
                if tweets.is_empty() {
                    fallback_thread(fallback_source)
                } else {
                    tweets
                }
            }
            Ok(_) => {
                warn!("thread prompt refused, falling back to deterministic splitting");
                fallback_thread(fallback_source)
            }
            Err(err) => {
                warn!(error = %err, "thread prompt failed, falling back to deterministic splitting");
                fallback_thread(fallback_source)
            }
        }
    }

    /// Regenerates the platform's base output, then asks the model to revise
    /// it according to the instruction while keeping the original facts
    /// intact. No continuation or chunking; refinement outputs are assumed
    /// short.
    pub async fn refine(
        &self,
        transcript: &str,
        input_language: &str,
        output_language: &str,
        platform: Platform,
        instruction: &str,
        current_output: Option<&str>,
    ) -> Result<String, GenerateError> {
        let system = ChatMessage::system(self.prompts.system(input_language, output_language));
        let base_prompt =
            self.prompts
                .for_platform(platform, input_language, output_language, transcript);

        let base = self
            .provider
            .complete(
                &[system.clone(), ChatMessage::user(base_prompt.clone())],
                &bounded_options(),
            )
            .await
            .map_err(|err| {
                error!(platform = platform.as_str(), error = %err, "refinement base generation failed");
                GenerateError::Refinement
            })?;

        let mut instruction_text = format!(
            "Revise the {} content above. Apply this instruction exactly: {}\n\
             Preserve the meaning and all facts of the original; do not introduce new information.",
            platform.as_str(),
            instruction
        );
        if let Some(current) = current_output {
            instruction_text.push_str(&format!(
                "\n\nFor reference, the user's current saved version:\n{current}"
            ));
        }

        let messages = vec![
            system,
            ChatMessage::user(base_prompt),
            ChatMessage::assistant(base.text),
            ChatMessage::user(instruction_text),
        ];

        self.provider
            .complete(&messages, &bounded_options())
            .await
            .map(|completion| completion.text)
            .map_err(|err| {
                error!(platform = platform.as_str(), error = %err, "refinement failed");
                GenerateError::Refinement
            })
    }
}

fn bounded_options() -> ChatOptions {
    ChatOptions {
        max_tokens: Some(BOUNDED_MAX_TOKENS),
        temperature: Some(DEFAULT_TEMPERATURE),
    }
}

fn unbounded_options() -> ChatOptions {
    ChatOptions {
        max_tokens: None,
        temperature: Some(DEFAULT_TEMPERATURE),
    }
}

/// Fixed-size character chunks, split on char boundaries.
pub fn chunk_transcript(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= size {
        return vec![text.to_string()];
    }
    chars
        .chunks(size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
