use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Workflow state of a document. Doubles as the storage partition the
/// document (and its sessions) physically lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Draft,
    Completed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(DocumentStatus::Draft),
            "completed" => Some(DocumentStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Blog,
    Linkedin,
    Twitter,
    Podcast,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Blog => "blog",
            Platform::Linkedin => "linkedin",
            Platform::Twitter => "twitter",
            Platform::Podcast => "podcast",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "blog" => Some(Platform::Blog),
            "linkedin" => Some(Platform::Linkedin),
            "twitter" => Some(Platform::Twitter),
            "podcast" => Some(Platform::Podcast),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub blog_post: String,
    pub linkedin_post: String,
    pub twitter_post: String,
    pub podcast_script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_thread: Option<Vec<String>>,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedContent {
    pub fn platform_text(&self, platform: Platform) -> &str {
        match platform {
            Platform::Blog => &self.blog_post,
            Platform::Linkedin => &self.linkedin_post,
            Platform::Twitter => &self.twitter_post,
            Platform::Podcast => &self.podcast_script,
        }
    }

    pub fn set_platform_text(&mut self, platform: Platform, text: String) {
        match platform {
            Platform::Blog => self.blog_post = text,
            Platform::Linkedin => self.linkedin_post = text,
            Platform::Twitter => self.twitter_post = text,
            Platform::Podcast => self.podcast_script = text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub input_language: String,
    pub output_language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_sessions: u32,
    pub total_duration: u64,
    pub word_count: u64,
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_content: Option<GeneratedContent>,
    pub has_generated_content: bool,
    pub requires_regeneration: bool,
}

impl Document {
    pub fn new(
        user_id: Uuid,
        title: String,
        input_language: String,
        output_language: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            input_language,
            output_language,
            created_at: now,
            updated_at: now,
            total_sessions: 0,
            total_duration: 0,
            word_count: 0,
            status: DocumentStatus::Draft,
            generated_content: None,
            has_generated_content: false,
            requires_regeneration: false,
        }
    }

    /// Recomputes all aggregate stats from the complete current session set.
    /// Aggregates are never incremented in place.
    pub fn recompute_stats(&mut self, sessions: &[VoiceSession]) {
        self.total_sessions = sessions.len() as u32;
        self.total_duration = sessions.iter().map(|s| s.duration).sum();
        self.word_count = sessions
            .iter()
            .map(|s| transcript_word_count(&s.transcript) as u64)
            .sum();
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSession {
    pub id: Uuid,
    pub document_id: Uuid,
    /// 1-based, assigned as current session count + 1 at creation time.
    /// Ascending order is the logical transcript order; descending order is
    /// the history view. Both derive from this one field.
    pub session_number: u32,
    pub transcript: String,
    pub duration: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub id: Uuid,
    pub display_name: String,
}

/// One partition blob. Both the draft and completed collections share this
/// shape and are auto-created empty on first access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(default)]
    pub users: Vec<StoredUser>,
    #[serde(default)]
    pub user_documents: Vec<Document>,
    #[serde(default)]
    pub voice_sessions: Vec<VoiceSession>,
}

/// Whitespace-token count of the trimmed transcript. Deliberately naive;
/// downstream stats depend on exactly this tokenization.
pub fn transcript_word_count(transcript: &str) -> usize {
    let trimmed = transcript.trim();
    if trimmed.is_empty() {
        return 0;
    }
    trimmed.split_whitespace().count()
}
