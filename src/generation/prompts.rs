use crate::config::AppConfig;
use crate::models::Platform;

const DEFAULT_SYSTEM: &str = "You rewrite spoken transcripts into polished written content. \
Preserve the exact meaning of the transcript. \
The transcript is in {input_language}; write your output in {output_language}, translating if the two differ. \
Do not add new information, opinions, or commentary of your own.";

const DEFAULT_BLOG: &str = "Rewrite the following transcript (spoken in {input_language}) as a well-structured \
blog post in {output_language}. Use headings and paragraphs where they help readability. \
Keep every point the speaker made; do not summarize away detail.\n\nTranscript:\n{transcript}";

const DEFAULT_LINKEDIN: &str = "Rewrite the following transcript (spoken in {input_language}) as a professional \
LinkedIn post in {output_language}. Keep it engaging but faithful to what was said.\n\nTranscript:\n{transcript}";

const DEFAULT_TWITTER: &str = "Rewrite the following transcript (spoken in {input_language}) as a single concise \
post in {output_language} suitable for Twitter/X. Stay under 280 characters.\n\nTranscript:\n{transcript}";

const DEFAULT_PODCAST: &str = "Rewrite the following transcript (spoken in {input_language}) as a podcast script \
in {output_language}, with natural spoken phrasing and clear segment transitions.\n\nTranscript:\n{transcript}";

const DEFAULT_THREAD: &str = "Turn the following transcript (spoken in {input_language}) into a Twitter/X thread \
in {output_language}. Output a numbered list with one tweet per line, each under 280 characters.\n\nTranscript:\n{transcript}";

/// Prompt templates, each independently overridable through configuration.
/// Placeholders: {input_language}, {output_language}, {transcript}.
#[derive(Clone)]
pub struct PromptSet {
    system: String,
    blog: String,
    linkedin: String,
    twitter: String,
    podcast: String,
    thread: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM.to_string(),
            blog: DEFAULT_BLOG.to_string(),
            linkedin: DEFAULT_LINKEDIN.to_string(),
            twitter: DEFAULT_TWITTER.to_string(),
            podcast: DEFAULT_PODCAST.to_string(),
            thread: DEFAULT_THREAD.to_string(),
        }
    }
}

impl PromptSet {
    pub fn from_config(config: &AppConfig) -> Self {
        let defaults = Self::default();
        Self {
            system: config.system_prompt.clone().unwrap_or(defaults.system),
            blog: config.prompt_blog.clone().unwrap_or(defaults.blog),
            linkedin: config.prompt_linkedin.clone().unwrap_or(defaults.linkedin),
            twitter: config.prompt_twitter.clone().unwrap_or(defaults.twitter),
            podcast: config.prompt_podcast.clone().unwrap_or(defaults.podcast),
            thread: config.prompt_thread.clone().unwrap_or(defaults.thread),
        }
    }

    pub fn system(&self, input_language: &str, output_language: &str) -> String {
        render(&self.system, input_language, output_language, "")
    }

    pub fn for_platform(
        &self,
        platform: Platform,
        input_language: &str,
        output_language: &str,
        transcript: &str,
    ) -> String {
        let template = match platform {
            Platform::Blog => &self.blog,
            Platform::Linkedin => &self.linkedin,
            Platform::Twitter => &self.twitter,
            Platform::Podcast => &self.podcast,
        };
        render(template, input_language, output_language, transcript)
    }

    pub fn thread(&self, input_language: &str, output_language: &str, transcript: &str) -> String {
        render(&self.thread, input_language, output_language, transcript)
    }
}

fn render(template: &str, input_language: &str, output_language: &str, transcript: &str) -> String {
    template
        .replace("{input_language}", language_name(input_language))
        .replace("{output_language}", language_name(output_language))
        .replace("{transcript}", transcript)
}

/// Maps common language codes to English names for prompt text. Unknown
/// codes pass through unchanged.
pub fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "gu" => "Gujarati",
        "hi" => "Hindi",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "pt" => "Portuguese",
        "it" => "Italian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "ar" => "Arabic",
        "ru" => "Russian",
        "bn" => "Bengali",
        "ta" => "Tamil",
        "te" => "Telugu",
        "mr" => "Marathi",
        "pa" => "Punjabi",
        "ur" => "Urdu",
        other => other,
    }
}
