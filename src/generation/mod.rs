pub mod generator;
pub mod prompts;
pub mod provider;
pub mod thread;

pub use generator::{ContentGenerator, GenerateError, CONTINUE_PROMPT};
pub use prompts::PromptSet;
pub use provider::{
    ChatMessage, ChatOptions, ChatProvider, ChatRole, Completion, Finish, OpenAiProvider,
    ProviderError,
};
