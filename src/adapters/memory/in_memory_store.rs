//! In-memory implementation of the persistence ports.
//!
//! Used when no database is configured, and by tests. One store backs all
//! three ports so conversation, message and knowledge state stay consistent
//! with each other.
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(InMemoryStore::new());
//! store.insert_module(ModuleConfig::new(module_id, "Communication Basics")?).await;
//! store.insert_profile(profile).await;
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::domain::conversation::{
    ConversationRecord, ConversationStatus, EngagementCounters, EngagementDelta, MessageDraft,
    StoredMessage,
};
use crate::domain::foundation::{ConversationId, LearnerId, ModuleId, Timestamp};
use crate::domain::learning::{
    CrossModuleKnowledge, KnowledgeSummaryUpdate, LearningProfile, ModuleConfig,
};
use crate::ports::{ConversationRepository, KnowledgeRepository, ProfileReader, StoreError};

#[derive(Default)]
struct Tables {
    profiles: HashMap<LearnerId, LearningProfile>,
    modules: HashMap<ModuleId, ModuleConfig>,
    conversations: HashMap<ConversationId, ConversationRecord>,
    messages: HashMap<ConversationId, Vec<StoredMessage>>,
    knowledge: HashMap<(LearnerId, ModuleId), CrossModuleKnowledge>,
}

/// Read paths that can be made to fail independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadPath {
    Profile,
    Module,
    /// Single and open-conversation lookups.
    Conversation,
    Messages,
    Knowledge,
}

const READ_PATHS: usize = 5;

/// In-memory store for profiles, modules, conversations and knowledge.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    failing_writes: AtomicUsize,
    failing_reads: [AtomicUsize; READ_PATHS],
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Seeding ===

    pub async fn insert_profile(&self, profile: LearningProfile) {
        self.tables
            .write()
            .await
            .profiles
            .insert(profile.learner_id.clone(), profile);
    }

    pub async fn insert_module(&self, module: ModuleConfig) {
        self.tables
            .write()
            .await
            .modules
            .insert(module.id.clone(), module);
    }

    pub async fn insert_knowledge(&self, record: CrossModuleKnowledge) {
        self.tables
            .write()
            .await
            .knowledge
            .insert((record.learner_id.clone(), record.module_id.clone()), record);
    }

    /// Appends a message with an explicit timestamp, bypassing write failures.
    pub async fn insert_message(&self, message: StoredMessage) {
        self.tables
            .write()
            .await
            .messages
            .entry(message.conversation_id)
            .or_default()
            .push(message);
    }

    // === Failure injection ===

    /// Makes the next `count` writes fail with `StoreError::Unavailable`.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` reads on `path` fail with `StoreError::Unavailable`.
    pub fn fail_next_reads(&self, path: ReadPath, count: usize) {
        self.failing_reads[path as usize].store(count, Ordering::SeqCst);
    }

    fn check(counter: &AtomicUsize, what: &str) -> Result<(), StoreError> {
        let tripped = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            Err(StoreError::Unavailable(format!("injected {} failure", what)))
        } else {
            Ok(())
        }
    }

    fn check_write(&self) -> Result<(), StoreError> {
        Self::check(&self.failing_writes, "write")
    }

    fn check_read(&self, path: ReadPath) -> Result<(), StoreError> {
        Self::check(&self.failing_reads[path as usize], "read")
    }

    // === Test Helpers ===

    /// All messages of a conversation, oldest first.
    pub async fn messages(&self, conversation_id: &ConversationId) -> Vec<StoredMessage> {
        self.tables
            .read()
            .await
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn conversation_count(&self) -> usize {
        self.tables.read().await.conversations.len()
    }

    pub async fn knowledge_for(
        &self,
        learner_id: &LearnerId,
        module_id: &ModuleId,
    ) -> Option<CrossModuleKnowledge> {
        self.tables
            .read()
            .await
            .knowledge
            .get(&(learner_id.clone(), module_id.clone()))
            .cloned()
    }

    fn open_for<'a>(
        tables: &'a Tables,
        learner_id: &LearnerId,
        module_id: &ModuleId,
    ) -> Option<&'a ConversationRecord> {
        tables
            .conversations
            .values()
            .filter(|c| &c.learner_id == learner_id && &c.module_id == module_id && c.is_open())
            .max_by_key(|c| c.created_at)
    }
}

#[async_trait]
impl ProfileReader for InMemoryStore {
    async fn get_profile(
        &self,
        learner_id: &LearnerId,
    ) -> Result<Option<LearningProfile>, StoreError> {
        self.check_read(ReadPath::Profile)?;
        Ok(self.tables.read().await.profiles.get(learner_id).cloned())
    }

    async fn get_module(&self, module_id: &ModuleId) -> Result<Option<ModuleConfig>, StoreError> {
        self.check_read(ReadPath::Module)?;
        Ok(self.tables.read().await.modules.get(module_id).cloned())
    }
}

#[async_trait]
impl ConversationRepository for InMemoryStore {
    async fn get_or_create_conversation(
        &self,
        learner_id: &LearnerId,
        module_id: &ModuleId,
    ) -> Result<ConversationRecord, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = Self::open_for(&tables, learner_id, module_id) {
            return Ok(existing.clone());
        }

        self.check_write()?;
        let record = ConversationRecord::start(learner_id.clone(), module_id.clone());
        tables.conversations.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_open_conversation(
        &self,
        learner_id: &LearnerId,
        module_id: &ModuleId,
    ) -> Result<Option<ConversationRecord>, StoreError> {
        self.check_read(ReadPath::Conversation)?;
        let tables = self.tables.read().await;
        Ok(Self::open_for(&tables, learner_id, module_id).cloned())
    }

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<ConversationRecord>, StoreError> {
        self.check_read(ReadPath::Conversation)?;
        Ok(self.tables.read().await.conversations.get(id).cloned())
    }

    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        draft: &MessageDraft,
    ) -> Result<StoredMessage, StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        let now = Timestamp::now();

        let conversation = tables
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| StoreError::not_found(format!("conversation {}", conversation_id)))?;
        conversation.updated_at = now;

        let stored = draft.clone().into_stored(*conversation_id, now);
        tables
            .messages
            .entry(*conversation_id)
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn get_recent_messages(
        &self,
        conversation_id: &ConversationId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        self.check_read(ReadPath::Messages)?;
        let tables = self.tables.read().await;
        let all = tables
            .messages
            .get(conversation_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let start = all.len().saturating_sub(limit);
        Ok(all[start..].to_vec())
    }

    async fn bump_engagement_counters(
        &self,
        conversation_id: &ConversationId,
        delta: &EngagementDelta,
    ) -> Result<EngagementCounters, StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        let conversation = tables
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| StoreError::not_found(format!("conversation {}", conversation_id)))?;
        conversation.counters.apply(delta);
        conversation.updated_at = Timestamp::now();
        Ok(conversation.counters)
    }

    async fn update_status(
        &self,
        conversation_id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<(), StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        let conversation = tables
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| StoreError::not_found(format!("conversation {}", conversation_id)))?;
        conversation.status = status;
        conversation.updated_at = Timestamp::now();
        Ok(())
    }
}

#[async_trait]
impl KnowledgeRepository for InMemoryStore {
    async fn get_cross_module_knowledge(
        &self,
        learner_id: &LearnerId,
        exclude_module_id: &ModuleId,
        limit: usize,
    ) -> Result<Vec<CrossModuleKnowledge>, StoreError> {
        self.check_read(ReadPath::Knowledge)?;
        let tables = self.tables.read().await;
        let mut records: Vec<CrossModuleKnowledge> = tables
            .knowledge
            .values()
            .filter(|k| &k.learner_id == learner_id && &k.module_id != exclude_module_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn get_knowledge_summary(
        &self,
        learner_id: &LearnerId,
        module_id: &ModuleId,
    ) -> Result<Option<CrossModuleKnowledge>, StoreError> {
        self.check_read(ReadPath::Knowledge)?;
        Ok(self
            .tables
            .read()
            .await
            .knowledge
            .get(&(learner_id.clone(), module_id.clone()))
            .cloned())
    }

    async fn upsert_knowledge_summary(
        &self,
        update: KnowledgeSummaryUpdate,
    ) -> Result<CrossModuleKnowledge, StoreError> {
        self.check_write()?;
        let record = update.into_record(Timestamp::now());
        self.tables.write().await.knowledge.insert(
            (record.learner_id.clone(), record.module_id.clone()),
            record.clone(),
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learner() -> LearnerId {
        LearnerId::new("learner-1").unwrap()
    }

    fn module(id: &str) -> ModuleId {
        ModuleId::new(id).unwrap()
    }

    fn knowledge(module_id: &str, title: &str, age_secs: i64) -> CrossModuleKnowledge {
        CrossModuleKnowledge {
            learner_id: learner(),
            module_id: module(module_id),
            module_title: title.to_string(),
            summary: format!("Explored {}", title),
            confidence: 0.6,
            retention_strength: 0.9,
            links: Vec::new(),
            updated_at: Timestamp::now().plus_secs(-age_secs),
        }
    }

    mod conversations {
        use super::*;

        #[tokio::test]
        async fn get_or_create_reuses_open_conversation() {
            let store = InMemoryStore::new();
            let first = store
                .get_or_create_conversation(&learner(), &module("1"))
                .await
                .unwrap();
            let second = store
                .get_or_create_conversation(&learner(), &module("1"))
                .await
                .unwrap();

            assert_eq!(first.id, second.id);
            assert_eq!(store.conversation_count().await, 1);
        }

        #[tokio::test]
        async fn finalized_conversation_is_not_reused() {
            let store = InMemoryStore::new();
            let first = store
                .get_or_create_conversation(&learner(), &module("1"))
                .await
                .unwrap();
            store
                .update_status(&first.id, ConversationStatus::Finalized)
                .await
                .unwrap();

            let next = store
                .get_or_create_conversation(&learner(), &module("1"))
                .await
                .unwrap();

            assert_ne!(first.id, next.id);
            assert_eq!(next.status, ConversationStatus::New);
            assert!(store
                .find_open_conversation(&learner(), &module("1"))
                .await
                .unwrap()
                .is_some_and(|c| c.id == next.id));
        }

        #[tokio::test]
        async fn recent_messages_are_oldest_first_and_limited() {
            let store = InMemoryStore::new();
            let conv = store
                .get_or_create_conversation(&learner(), &module("1"))
                .await
                .unwrap();
            for i in 0..5 {
                store
                    .append_message(&conv.id, &MessageDraft::learner(format!("m{}", i)))
                    .await
                    .unwrap();
            }

            let recent = store.get_recent_messages(&conv.id, 3).await.unwrap();
            let texts: Vec<_> = recent.iter().map(|m| m.text.as_str()).collect();
            assert_eq!(texts, vec!["m2", "m3", "m4"]);
        }

        #[tokio::test]
        async fn append_to_unknown_conversation_is_not_found() {
            let store = InMemoryStore::new();
            let err = store
                .append_message(&ConversationId::new(), &MessageDraft::learner("hi"))
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::NotFound(_)));
        }

        #[tokio::test]
        async fn counters_accumulate() {
            let store = InMemoryStore::new();
            let conv = store
                .get_or_create_conversation(&learner(), &module("1"))
                .await
                .unwrap();
            let delta = EngagementDelta {
                questions_asked: 2,
                insights_gained: 1,
                learner_messages: 1,
            };
            store.bump_engagement_counters(&conv.id, &delta).await.unwrap();
            let counters = store.bump_engagement_counters(&conv.id, &delta).await.unwrap();

            assert_eq!(counters.questions_asked, 4);
            assert_eq!(counters.learner_messages, 2);
        }
    }

    mod knowledge {
        use super::*;

        #[tokio::test]
        async fn cross_module_excludes_current_and_orders_most_recent_first() {
            let store = InMemoryStore::new();
            store.insert_knowledge(knowledge("1", "Current", 0)).await;
            store.insert_knowledge(knowledge("2", "Older", 300)).await;
            store.insert_knowledge(knowledge("3", "Newer", 10)).await;
            store.insert_knowledge(knowledge("4", "Oldest", 900)).await;

            let records = store
                .get_cross_module_knowledge(&learner(), &module("1"), 2)
                .await
                .unwrap();
            let titles: Vec<_> = records.iter().map(|k| k.module_title.as_str()).collect();
            assert_eq!(titles, vec!["Newer", "Older"]);
        }

        #[tokio::test]
        async fn upsert_replaces_existing_summary() {
            let store = InMemoryStore::new();
            store.insert_knowledge(knowledge("2", "Media", 60)).await;

            let update = KnowledgeSummaryUpdate {
                learner_id: learner(),
                module_id: module("2"),
                module_title: "Media".to_string(),
                summary: "Explored Media: framing".to_string(),
                confidence: 0.8,
                retention_strength: 0.9,
                links: vec!["Society".to_string()],
            };
            store.upsert_knowledge_summary(update).await.unwrap();

            let stored = store.knowledge_for(&learner(), &module("2")).await.unwrap();
            assert_eq!(stored.summary, "Explored Media: framing");
            assert_eq!(stored.links, vec!["Society".to_string()]);
        }
    }

    mod failure_injection {
        use super::*;

        #[tokio::test]
        async fn injected_write_failures_are_consumed() {
            let store = InMemoryStore::new();
            let conv = store
                .get_or_create_conversation(&learner(), &module("1"))
                .await
                .unwrap();
            store.fail_next_writes(1);

            let first = store
                .append_message(&conv.id, &MessageDraft::learner("hi"))
                .await;
            let second = store
                .append_message(&conv.id, &MessageDraft::learner("hi"))
                .await;

            assert!(first.unwrap_err().is_transient());
            assert!(second.is_ok());
            assert_eq!(store.messages(&conv.id).await.len(), 1);
        }

        #[tokio::test]
        async fn injected_read_failures_hit_reads_only() {
            let store = InMemoryStore::new();
            store.fail_next_reads(ReadPath::Conversation, 1);

            assert!(store.get_conversation(&ConversationId::new()).await.is_err());
            assert!(store
                .get_conversation(&ConversationId::new())
                .await
                .unwrap()
                .is_none());
        }

        #[tokio::test]
        async fn read_failures_are_scoped_to_their_path() {
            let store = InMemoryStore::new();
            store.fail_next_reads(ReadPath::Knowledge, 1);

            assert!(store.get_profile(&learner()).await.unwrap().is_none());
            assert!(store.get_module(&module("1")).await.unwrap().is_none());
            assert!(store
                .get_cross_module_knowledge(&learner(), &module("1"), 3)
                .await
                .is_err());
            assert!(store
                .get_cross_module_knowledge(&learner(), &module("1"), 3)
                .await
                .unwrap()
                .is_empty());
        }
    }
}
