use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::blob::BlobStore;
use super::retry::read_with_retry;
use super::{StorageError, StorageResult};
use crate::models::{
    Collection, Document, DocumentStatus, GeneratedContent, Platform, StoredUser, VoiceSession,
};

pub const DRAFTS_BLOB: &str = "drafts.json";
pub const COMPLETED_BLOB: &str = "completed.json";

const CREATE_CONFIRM_ATTEMPTS: u32 = 5;
const CREATE_CONFIRM_BACKOFF: Duration = Duration::from_millis(200);

fn blob_name(status: DocumentStatus) -> &'static str {
    match status {
        DocumentStatus::Draft => DRAFTS_BLOB,
        DocumentStatus::Completed => COMPLETED_BLOB,
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    /// Newly recorded text, appended to the existing transcript.
    pub transcript: Option<String>,
    /// Additional recorded seconds, added to the existing duration.
    pub duration: Option<u64>,
    /// Replaces the session notes when present.
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub backend: &'static str,
    pub object_store_reachable: bool,
    pub local_reachable: bool,
}

/// Document database over two interchangeable blob backends. Documents and
/// their sessions live together in exactly one of two partition blobs
/// ("drafts", "completed"); every write is a whole-collection
/// read-modify-write, serialized through one in-process lock.
pub struct HybridStorage {
    object: Option<Arc<dyn BlobStore>>,
    local: Arc<dyn BlobStore>,
    prefer_object: bool,
    write_lock: Mutex<()>,
}

impl HybridStorage {
    pub fn new(
        object: Option<Arc<dyn BlobStore>>,
        local: Arc<dyn BlobStore>,
        prefer_object: bool,
    ) -> Self {
        Self {
            object,
            local,
            prefer_object,
            write_lock: Mutex::new(()),
        }
    }

    fn uses_object_store(&self) -> bool {
        self.prefer_object && self.object.is_some()
    }

    async fn read_blob(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        if self.uses_object_store() {
            let object = self.object.as_ref().expect("object store configured");
            match object.get(name).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(blob = name, error = %err, "object store read failed, falling back to local");
                }
            }
        }
        self.local
            .get(name)
            .await
            .map_err(|err| StorageError::Backend(err.to_string()))
    }

    async fn write_blob(&self, name: &str, bytes: Vec<u8>) -> StorageResult<()> {
        if self.uses_object_store() {
            let object = self.object.as_ref().expect("object store configured");
            match object.put(name, bytes.clone()).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(blob = name, error = %err, "object store write failed, falling back to local");
                }
            }
        }
        self.local
            .put(name, bytes)
            .await
            .map_err(|err| StorageError::Backend(err.to_string()))
    }

    async fn load_collection(&self, status: DocumentStatus) -> StorageResult<Collection> {
        match self.read_blob(blob_name(status)).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| StorageError::Backend(format!("corrupt collection blob: {err}"))),
            None => Ok(Collection::default()),
        }
    }

    async fn store_collection(
        &self,
        status: DocumentStatus,
        collection: &Collection,
    ) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(collection)
            .map_err(|err| StorageError::Backend(format!("failed to encode collection: {err}")))?;
        self.write_blob(blob_name(status), bytes).await
    }

    async fn locate_document(&self, id: Uuid) -> StorageResult<(DocumentStatus, Document)> {
        // draft partition is checked first
        for status in [DocumentStatus::Draft, DocumentStatus::Completed] {
            let collection = self.load_collection(status).await?;
            if let Some(doc) = collection.user_documents.iter().find(|d| d.id == id) {
                return Ok((status, doc.clone()));
            }
        }
        Err(StorageError::not_found(format!("document {id} not found")))
    }

    async fn collect_sessions(&self, document_id: Uuid) -> StorageResult<Vec<VoiceSession>> {
        // merged across both partitions: the parent document could have just
        // been migrated
        let mut sessions = Vec::new();
        for status in [DocumentStatus::Draft, DocumentStatus::Completed] {
            let collection = self.load_collection(status).await?;
            sessions.extend(
                collection
                    .voice_sessions
                    .into_iter()
                    .filter(|s| s.document_id == document_id),
            );
        }
        sessions.sort_by_key(|s| s.session_number);
        Ok(sessions)
    }

    // ---- reads (wrapped in the eventual-consistency retry) ----

    pub async fn list_documents(
        &self,
        owner: Uuid,
        status: DocumentStatus,
    ) -> StorageResult<Vec<Document>> {
        read_with_retry(move || async move {
            let collection = self.load_collection(status).await?;
            let mut docs: Vec<Document> = collection
                .user_documents
                .into_iter()
                .filter(|d| d.user_id == owner)
                .collect();
            docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(docs)
        })
        .await
    }

    pub async fn get_document(&self, id: Uuid) -> StorageResult<Document> {
        read_with_retry(move || async move { self.locate_document(id).await.map(|(_, doc)| doc) })
            .await
    }

    /// Sessions in ascending `sessionNumber` order (logical transcript
    /// order). History views reverse this client-side or via the route.
    pub async fn get_sessions(&self, document_id: Uuid) -> StorageResult<Vec<VoiceSession>> {
        read_with_retry(move || async move { self.collect_sessions(document_id).await }).await
    }

    /// Resolves a session together with its parent document (ownership
    /// checks need both).
    pub async fn get_session(&self, id: Uuid) -> StorageResult<(VoiceSession, Document)> {
        read_with_retry(move || async move {
            let drafts = self.load_collection(DocumentStatus::Draft).await?;
            let completed = self.load_collection(DocumentStatus::Completed).await?;
            let session = drafts
                .voice_sessions
                .iter()
                .chain(completed.voice_sessions.iter())
                .find(|s| s.id == id)
                .cloned()
                .ok_or_else(|| StorageError::not_found(format!("session {id} not found")))?;
            let partition = partition_of(&drafts, &completed, session.document_id)?;
            let doc = match partition {
                DocumentStatus::Draft => &drafts,
                DocumentStatus::Completed => &completed,
            }
            .user_documents
            .iter()
            .find(|d| d.id == session.document_id)
            .cloned()
            .expect("partition located above");
            Ok((session, doc))
        })
        .await
    }

    // ---- writes (serialized, never retried) ----

    pub async fn create_document(
        &self,
        owner: Uuid,
        title: &str,
        input_language: &str,
        output_language: &str,
    ) -> StorageResult<Document> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StorageError::Validation("title must not be empty".into()));
        }

        let doc = {
            let _guard = self.write_lock.lock().await;
            let mut drafts = self.load_collection(DocumentStatus::Draft).await?;
            let completed = self.load_collection(DocumentStatus::Completed).await?;

            let wanted = title.to_lowercase();
            let taken = drafts
                .user_documents
                .iter()
                .chain(completed.user_documents.iter())
                .any(|d| d.user_id == owner && d.title.to_lowercase() == wanted);
            if taken {
                return Err(StorageError::Conflict(format!(
                    "a document titled \"{title}\" already exists"
                )));
            }

            if !drafts.users.iter().any(|u| u.id == owner) {
                drafts.users.push(StoredUser {
                    id: owner,
                    display_name: "Demo User".to_string(),
                });
            }

            let doc = Document::new(
                owner,
                title.to_string(),
                input_language.to_string(),
                output_language.to_string(),
            );
            drafts.user_documents.push(doc.clone());
            self.store_collection(DocumentStatus::Draft, &drafts).await?;
            doc
        };

        // Post-write confirmation: the object store may not show the new
        // document immediately. If it never becomes readable we still return
        // the record and let the caller proceed optimistically.
        let mut delay = CREATE_CONFIRM_BACKOFF;
        for attempt in 1..=CREATE_CONFIRM_ATTEMPTS {
            if self.locate_document(doc.id).await.is_ok() {
                return Ok(doc);
            }
            if attempt < CREATE_CONFIRM_ATTEMPTS {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
        warn!(document_id = %doc.id, "created document not yet readable; proceeding optimistically");
        Ok(doc)
    }

    pub async fn save_document(&self, doc: &Document) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        for status in [DocumentStatus::Draft, DocumentStatus::Completed] {
            let mut collection = self.load_collection(status).await?;
            if let Some(slot) = collection
                .user_documents
                .iter_mut()
                .find(|d| d.id == doc.id)
            {
                *slot = doc.clone();
                return self.store_collection(status, &collection).await;
            }
        }
        Err(StorageError::not_found(format!(
            "document {} not found",
            doc.id
        )))
    }

    pub async fn delete_document(&self, id: Uuid) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut found = false;
        for status in [DocumentStatus::Draft, DocumentStatus::Completed] {
            let mut collection = self.load_collection(status).await?;
            let docs_before = collection.user_documents.len();
            let sessions_before = collection.voice_sessions.len();
            collection.user_documents.retain(|d| d.id != id);
            collection.voice_sessions.retain(|s| s.document_id != id);
            let changed = collection.user_documents.len() != docs_before
                || collection.voice_sessions.len() != sessions_before;
            if collection.user_documents.len() != docs_before {
                found = true;
            }
            if changed {
                self.store_collection(status, &collection).await?;
            }
        }
        if found {
            Ok(())
        } else {
            Err(StorageError::not_found(format!("document {id} not found")))
        }
    }

    pub async fn add_session(
        &self,
        document_id: Uuid,
        transcript: String,
        duration: u64,
        notes: Option<String>,
    ) -> StorageResult<VoiceSession> {
        let _guard = self.write_lock.lock().await;
        let mut drafts = self.load_collection(DocumentStatus::Draft).await?;
        let mut completed = self.load_collection(DocumentStatus::Completed).await?;

        let partition = partition_of(&drafts, &completed, document_id)?;

        let existing = drafts
            .voice_sessions
            .iter()
            .chain(completed.voice_sessions.iter())
            .filter(|s| s.document_id == document_id)
            .count();

        let session = VoiceSession {
            id: Uuid::new_v4(),
            document_id,
            session_number: existing as u32 + 1,
            transcript,
            duration,
            created_at: Utc::now(),
            notes,
        };

        pick(&mut drafts, &mut completed, partition)
            .voice_sessions
            .push(session.clone());

        let merged = sessions_for(&drafts, &completed, document_id);
        let target = pick(&mut drafts, &mut completed, partition);
        let doc = target
            .user_documents
            .iter_mut()
            .find(|d| d.id == document_id)
            .expect("document located above");
        doc.recompute_stats(&merged);
        doc.requires_regeneration = true;

        self.store_collection(partition, pick(&mut drafts, &mut completed, partition))
            .await?;
        Ok(session)
    }

    pub async fn update_session(
        &self,
        id: Uuid,
        patch: SessionPatch,
    ) -> StorageResult<VoiceSession> {
        let _guard = self.write_lock.lock().await;
        let mut drafts = self.load_collection(DocumentStatus::Draft).await?;
        let mut completed = self.load_collection(DocumentStatus::Completed).await?;

        let (session_partition, document_id) =
            session_home(&drafts, &completed, id).ok_or_else(|| {
                StorageError::not_found(format!("session {id} not found"))
            })?;

        let updated = {
            let collection = pick(&mut drafts, &mut completed, session_partition);
            let session = collection
                .voice_sessions
                .iter_mut()
                .find(|s| s.id == id)
                .expect("session located above");
            if let Some(extra) = patch.transcript {
                if session.transcript.is_empty() {
                    session.transcript = extra;
                } else {
                    session.transcript.push(' ');
                    session.transcript.push_str(&extra);
                }
            }
            if let Some(extra) = patch.duration {
                session.duration += extra;
            }
            if let Some(notes) = patch.notes {
                session.notes = Some(notes);
            }
            session.clone()
        };

        let doc_partition = partition_of(&drafts, &completed, document_id)?;
        let merged = sessions_for(&drafts, &completed, document_id);
        {
            let collection = pick(&mut drafts, &mut completed, doc_partition);
            let doc = collection
                .user_documents
                .iter_mut()
                .find(|d| d.id == document_id)
                .expect("document located above");
            doc.recompute_stats(&merged);
            doc.requires_regeneration = true;
        }

        self.store_collection(
            session_partition,
            pick(&mut drafts, &mut completed, session_partition),
        )
        .await?;
        if doc_partition != session_partition {
            self.store_collection(
                doc_partition,
                pick(&mut drafts, &mut completed, doc_partition),
            )
            .await?;
        }
        Ok(updated)
    }

    pub async fn delete_session(&self, id: Uuid) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut drafts = self.load_collection(DocumentStatus::Draft).await?;
        let mut completed = self.load_collection(DocumentStatus::Completed).await?;

        let (session_partition, document_id) =
            session_home(&drafts, &completed, id).ok_or_else(|| {
                StorageError::not_found(format!("session {id} not found"))
            })?;

        pick(&mut drafts, &mut completed, session_partition)
            .voice_sessions
            .retain(|s| s.id != id);

        let doc_partition = partition_of(&drafts, &completed, document_id)?;
        let merged = sessions_for(&drafts, &completed, document_id);
        {
            let collection = pick(&mut drafts, &mut completed, doc_partition);
            let doc = collection
                .user_documents
                .iter_mut()
                .find(|d| d.id == document_id)
                .expect("document located above");
            doc.recompute_stats(&merged);
            doc.requires_regeneration = true;
        }

        self.store_collection(
            session_partition,
            pick(&mut drafts, &mut completed, session_partition),
        )
        .await?;
        if doc_partition != session_partition {
            self.store_collection(
                doc_partition,
                pick(&mut drafts, &mut completed, doc_partition),
            )
            .await?;
        }
        Ok(())
    }

    /// Moves a document (with all of its sessions) between partitions, or
    /// flips the status in place when no physical move is needed. The two
    /// partition writes are not atomic; a crash between them can leave the
    /// document duplicated, never silently dropped, since the destination is
    /// written first.
    pub async fn set_status(
        &self,
        id: Uuid,
        new_status: DocumentStatus,
    ) -> StorageResult<Document> {
        let _guard = self.write_lock.lock().await;
        let mut drafts = self.load_collection(DocumentStatus::Draft).await?;
        let mut completed = self.load_collection(DocumentStatus::Completed).await?;

        let source = partition_of(&drafts, &completed, id)?;
        let mut doc = pick(&mut drafts, &mut completed, source)
            .user_documents
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .expect("document located above");

        if new_status == DocumentStatus::Completed && !doc.has_generated_content {
            return Err(StorageError::Conflict(
                "document has no generated content; generate content before completing".into(),
            ));
        }

        doc.status = new_status;
        doc.updated_at = Utc::now();

        if source == new_status {
            // pure status flip, single partition write
            let collection = pick(&mut drafts, &mut completed, source);
            let slot = collection
                .user_documents
                .iter_mut()
                .find(|d| d.id == id)
                .expect("document located above");
            *slot = doc.clone();
            self.store_collection(source, collection).await?;
            return Ok(doc);
        }

        // sessions swept from both partitions, defensive against a previous
        // partial migration
        let sessions = sessions_for(&drafts, &completed, id);

        {
            let destination = pick(&mut drafts, &mut completed, new_status);
            destination.user_documents.retain(|d| d.id != id);
            destination.voice_sessions.retain(|s| s.document_id != id);
            destination.user_documents.push(doc.clone());
            destination.voice_sessions.extend(sessions.iter().cloned());
            if !destination.users.iter().any(|u| u.id == doc.user_id) {
                destination.users.push(StoredUser {
                    id: doc.user_id,
                    display_name: "Demo User".to_string(),
                });
            }
        }
        {
            let origin = pick(&mut drafts, &mut completed, source);
            origin.user_documents.retain(|d| d.id != id);
            origin.voice_sessions.retain(|s| s.document_id != id);
        }

        self.store_collection(new_status, pick(&mut drafts, &mut completed, new_status))
            .await?;
        self.store_collection(source, pick(&mut drafts, &mut completed, source))
            .await?;

        info!(document_id = %id, from = source.as_str(), to = new_status.as_str(), "document migrated");
        Ok(doc)
    }

    /// Persists a freshly generated bundle. Only called after a fully
    /// successful generation; partial output never lands here.
    pub async fn store_generated_content(
        &self,
        id: Uuid,
        content: GeneratedContent,
    ) -> StorageResult<Document> {
        let _guard = self.write_lock.lock().await;
        self.mutate_document(id, |doc| {
            doc.generated_content = Some(content);
            doc.has_generated_content = true;
            doc.requires_regeneration = false;
            Ok(())
        })
        .await
    }

    /// Patches one platform's slot without touching the others or the
    /// staleness flags.
    pub async fn patch_generated_content(
        &self,
        id: Uuid,
        platform: Platform,
        text: String,
    ) -> StorageResult<Document> {
        let _guard = self.write_lock.lock().await;
        self.mutate_document(id, |doc| {
            let content = doc.generated_content.as_mut().ok_or_else(|| {
                StorageError::Conflict("document has no generated content yet".into())
            })?;
            content.set_platform_text(platform, text);
            Ok(())
        })
        .await
    }

    async fn mutate_document<F>(&self, id: Uuid, apply: F) -> StorageResult<Document>
    where
        F: FnOnce(&mut Document) -> StorageResult<()>,
    {
        for status in [DocumentStatus::Draft, DocumentStatus::Completed] {
            let mut collection = self.load_collection(status).await?;
            if let Some(doc) = collection.user_documents.iter_mut().find(|d| d.id == id) {
                apply(doc)?;
                doc.updated_at = Utc::now();
                let updated = doc.clone();
                self.store_collection(status, &collection).await?;
                return Ok(updated);
            }
        }
        Err(StorageError::not_found(format!("document {id} not found")))
    }

    pub async fn health(&self) -> HealthReport {
        let object_store_reachable = match &self.object {
            Some(object) => object.get(DRAFTS_BLOB).await.is_ok(),
            None => false,
        };
        let local_reachable = self.local.get(DRAFTS_BLOB).await.is_ok();
        HealthReport {
            backend: if self.uses_object_store() { "s3" } else { "local" },
            object_store_reachable,
            local_reachable,
        }
    }
}

fn pick<'a>(
    drafts: &'a mut Collection,
    completed: &'a mut Collection,
    status: DocumentStatus,
) -> &'a mut Collection {
    match status {
        DocumentStatus::Draft => drafts,
        DocumentStatus::Completed => completed,
    }
}

fn partition_of(
    drafts: &Collection,
    completed: &Collection,
    document_id: Uuid,
) -> StorageResult<DocumentStatus> {
    if drafts.user_documents.iter().any(|d| d.id == document_id) {
        Ok(DocumentStatus::Draft)
    } else if completed
        .user_documents
        .iter()
        .any(|d| d.id == document_id)
    {
        Ok(DocumentStatus::Completed)
    } else {
        Err(StorageError::not_found(format!(
            "document {document_id} not found"
        )))
    }
}

fn session_home(
    drafts: &Collection,
    completed: &Collection,
    session_id: Uuid,
) -> Option<(DocumentStatus, Uuid)> {
    if let Some(s) = drafts.voice_sessions.iter().find(|s| s.id == session_id) {
        return Some((DocumentStatus::Draft, s.document_id));
    }
    completed
        .voice_sessions
        .iter()
        .find(|s| s.id == session_id)
        .map(|s| (DocumentStatus::Completed, s.document_id))
}

fn sessions_for(
    drafts: &Collection,
    completed: &Collection,
    document_id: Uuid,
) -> Vec<VoiceSession> {
    let mut merged: Vec<VoiceSession> = drafts
        .voice_sessions
        .iter()
        .chain(completed.voice_sessions.iter())
        .filter(|s| s.document_id == document_id)
        .cloned()
        .collect();
    merged.sort_by_key(|s| s.session_number);
    merged
}
