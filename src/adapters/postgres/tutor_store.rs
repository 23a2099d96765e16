//! PostgreSQL implementation of the persistence ports.
//!
//! Structured columns (goals, mastery, objectives, analysis, links) are stored
//! as JSON text. The `tutor_conversations_one_open` partial unique index keeps
//! at most one open conversation per (learner, module), which makes
//! `get_or_create_conversation` safe under concurrent connects.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::compliance::ComplianceAnalysis;
use crate::domain::conversation::{
    ConversationRecord, ConversationStatus, EngagementCounters, EngagementDelta, MessageDraft,
    StoredMessage,
};
use crate::domain::foundation::{
    ConversationId, LearnerId, MessageId, ModuleId, Timestamp, ValidationError,
};
use crate::domain::learning::{
    CrossModuleKnowledge, KnowledgeSummaryUpdate, LearningProfile, ModuleConfig,
};
use crate::ports::{ConversationRepository, KnowledgeRepository, ProfileReader, StoreError};

/// PostgreSQL store for profiles, modules, conversations and knowledge.
#[derive(Clone)]
pub struct PostgresTutorStore {
    pool: PgPool,
}

impl PostgresTutorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Migration failed: {}", e)))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_open(
        &self,
        learner_id: &LearnerId,
        module_id: &ModuleId,
    ) -> Result<Option<ConversationRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, learner_id, module_id, status, questions_asked, insights_gained,
                   learner_messages, created_at, updated_at
            FROM tutor_conversations
            WHERE learner_id = $1 AND module_id = $2 AND status <> 'finalized'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(learner_id.as_str())
        .bind(module_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db("fetch open conversation"))?;

        row.as_ref().map(conversation_from_row).transpose()
    }
}

fn db(context: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("Failed to {}: {}", context, e))
        }
        other => StoreError::database(format!("Failed to {}: {}", context, other)),
    }
}

fn invalid(err: ValidationError) -> StoreError {
    StoreError::Serialization(err.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Serialization(format!("column {}: {}", name, e)))
}

fn count(row: &PgRow, name: &str) -> Result<u32, StoreError> {
    let value: i32 = column(row, name)?;
    Ok(value.max(0) as u32)
}

fn timestamp(row: &PgRow, name: &str) -> Result<Timestamp, StoreError> {
    let value: chrono::DateTime<chrono::Utc> = column(row, name)?;
    Ok(Timestamp::from_datetime(value))
}

fn conversation_from_row(row: &PgRow) -> Result<ConversationRecord, StoreError> {
    let id: uuid::Uuid = column(row, "id")?;
    let learner_id: String = column(row, "learner_id")?;
    let module_id: String = column(row, "module_id")?;
    let status: String = column(row, "status")?;

    Ok(ConversationRecord {
        id: ConversationId::from_uuid(id),
        learner_id: LearnerId::new(learner_id).map_err(invalid)?,
        module_id: ModuleId::new(module_id).map_err(invalid)?,
        status: status.parse().map_err(invalid)?,
        counters: EngagementCounters {
            questions_asked: count(row, "questions_asked")?,
            insights_gained: count(row, "insights_gained")?,
            learner_messages: count(row, "learner_messages")?,
        },
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

fn message_from_row(row: &PgRow) -> Result<StoredMessage, StoreError> {
    let id: uuid::Uuid = column(row, "id")?;
    let conversation_id: uuid::Uuid = column(row, "conversation_id")?;
    let role: String = column(row, "role")?;
    let analysis: Option<String> = column(row, "analysis")?;

    Ok(StoredMessage {
        id: MessageId::from_uuid(id),
        conversation_id: ConversationId::from_uuid(conversation_id),
        role: role.parse().map_err(invalid)?,
        text: column(row, "content")?,
        token_count: count(row, "token_count")?,
        analysis: analysis
            .as_deref()
            .map(from_json::<ComplianceAnalysis>)
            .transpose()?,
        created_at: timestamp(row, "created_at")?,
    })
}

fn knowledge_from_row(row: &PgRow) -> Result<CrossModuleKnowledge, StoreError> {
    let learner_id: String = column(row, "learner_id")?;
    let module_id: String = column(row, "module_id")?;
    let links: String = column(row, "links")?;

    Ok(CrossModuleKnowledge {
        learner_id: LearnerId::new(learner_id).map_err(invalid)?,
        module_id: ModuleId::new(module_id).map_err(invalid)?,
        module_title: column(row, "module_title")?,
        summary: column(row, "summary")?,
        confidence: column(row, "confidence")?,
        retention_strength: column(row, "retention_strength")?,
        links: from_json(&links)?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

const CONVERSATION_COLUMNS: &str = "id, learner_id, module_id, status, questions_asked, \
     insights_gained, learner_messages, created_at, updated_at";

const KNOWLEDGE_COLUMNS: &str = "learner_id, module_id, module_title, summary, confidence, \
     retention_strength, links, updated_at";

#[async_trait]
impl ProfileReader for PostgresTutorStore {
    async fn get_profile(
        &self,
        learner_id: &LearnerId,
    ) -> Result<Option<LearningProfile>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT learning_style, pace, interaction_preference, goals, mastery
            FROM learning_profiles
            WHERE learner_id = $1
            "#,
        )
        .bind(learner_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db("fetch learning profile"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let style: String = column(&row, "learning_style")?;
        let pace: String = column(&row, "pace")?;
        let preference: String = column(&row, "interaction_preference")?;
        let goals: String = column(&row, "goals")?;
        let mastery: String = column(&row, "mastery")?;

        Ok(Some(LearningProfile {
            learner_id: learner_id.clone(),
            learning_style: style.parse().map_err(invalid)?,
            pace: pace.parse().map_err(invalid)?,
            interaction_preference: preference.parse().map_err(invalid)?,
            goals: from_json(&goals)?,
            mastery: from_json(&mastery)?,
        }))
    }

    async fn get_module(&self, module_id: &ModuleId) -> Result<Option<ModuleConfig>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT title, description, teaching_directive, objectives, socratic_intensity
            FROM learning_modules
            WHERE id = $1
            "#,
        )
        .bind(module_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db("fetch module"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let title: String = column(&row, "title")?;
        let description: String = column(&row, "description")?;
        let directive: String = column(&row, "teaching_directive")?;
        let objectives: String = column(&row, "objectives")?;
        let intensity: String = column(&row, "socratic_intensity")?;

        let module = ModuleConfig::new(module_id.clone(), title)
            .map_err(invalid)?
            .with_description(description)
            .with_directive(directive)
            .with_objectives(from_json(&objectives)?)
            .with_intensity(intensity.parse().map_err(invalid)?);
        Ok(Some(module))
    }
}

#[async_trait]
impl ConversationRepository for PostgresTutorStore {
    async fn get_or_create_conversation(
        &self,
        learner_id: &LearnerId,
        module_id: &ModuleId,
    ) -> Result<ConversationRecord, StoreError> {
        if let Some(open) = self.fetch_open(learner_id, module_id).await? {
            return Ok(open);
        }

        let fresh = ConversationRecord::start(learner_id.clone(), module_id.clone());
        sqlx::query(
            r#"
            INSERT INTO tutor_conversations (
                id, learner_id, module_id, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (learner_id, module_id) WHERE status <> 'finalized' DO NOTHING
            "#,
        )
        .bind(fresh.id.as_uuid())
        .bind(learner_id.as_str())
        .bind(module_id.as_str())
        .bind(fresh.status.as_str())
        .bind(fresh.created_at.as_datetime())
        .bind(fresh.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db("insert conversation"))?;

        // A concurrent connect may have won the insert; read back whichever row is open.
        self.fetch_open(learner_id, module_id)
            .await?
            .ok_or_else(|| StoreError::database("open conversation vanished after insert"))
    }

    async fn find_open_conversation(
        &self,
        learner_id: &LearnerId,
        module_id: &ModuleId,
    ) -> Result<Option<ConversationRecord>, StoreError> {
        self.fetch_open(learner_id, module_id).await
    }

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<ConversationRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM tutor_conversations WHERE id = $1",
            CONVERSATION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db("fetch conversation"))?;

        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        draft: &MessageDraft,
    ) -> Result<StoredMessage, StoreError> {
        let stored = draft.clone().into_stored(*conversation_id, Timestamp::now());
        let analysis = stored.analysis.as_ref().map(to_json).transpose()?;

        let mut tx = self.pool.begin().await.map_err(db("start transaction"))?;

        let touched = sqlx::query("UPDATE tutor_conversations SET updated_at = $2 WHERE id = $1")
            .bind(conversation_id.as_uuid())
            .bind(stored.created_at.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(db("touch conversation"))?;
        if touched.rows_affected() == 0 {
            return Err(StoreError::not_found(format!(
                "conversation {}",
                conversation_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO tutor_messages (
                id, conversation_id, role, content, token_count, analysis, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(stored.id.as_uuid())
        .bind(conversation_id.as_uuid())
        .bind(stored.role.as_str())
        .bind(&stored.text)
        .bind(stored.token_count.min(i32::MAX as u32) as i32)
        .bind(analysis)
        .bind(stored.created_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(db("insert message"))?;

        tx.commit().await.map_err(db("commit message"))?;
        Ok(stored)
    }

    async fn get_recent_messages(
        &self,
        conversation_id: &ConversationId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, conversation_id, role, content, token_count, analysis, created_at
            FROM (
                SELECT * FROM tutor_messages
                WHERE conversation_id = $1
                ORDER BY seq DESC
                LIMIT $2
            ) recent
            ORDER BY seq ASC
            "#,
        )
        .bind(conversation_id.as_uuid())
        .bind(limit.min(i64::MAX as usize) as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db("fetch recent messages"))?;

        rows.iter().map(message_from_row).collect()
    }

    async fn bump_engagement_counters(
        &self,
        conversation_id: &ConversationId,
        delta: &EngagementDelta,
    ) -> Result<EngagementCounters, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE tutor_conversations SET
                questions_asked = questions_asked + $2,
                insights_gained = insights_gained + $3,
                learner_messages = learner_messages + $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING questions_asked, insights_gained, learner_messages
            "#,
        )
        .bind(conversation_id.as_uuid())
        .bind(delta.questions_asked as i32)
        .bind(delta.insights_gained as i32)
        .bind(delta.learner_messages as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(db("bump engagement counters"))?
        .ok_or_else(|| StoreError::not_found(format!("conversation {}", conversation_id)))?;

        Ok(EngagementCounters {
            questions_asked: count(&row, "questions_asked")?,
            insights_gained: count(&row, "insights_gained")?,
            learner_messages: count(&row, "learner_messages")?,
        })
    }

    async fn update_status(
        &self,
        conversation_id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE tutor_conversations SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(conversation_id.as_uuid())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(db("update conversation status"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!(
                "conversation {}",
                conversation_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl KnowledgeRepository for PostgresTutorStore {
    async fn get_cross_module_knowledge(
        &self,
        learner_id: &LearnerId,
        exclude_module_id: &ModuleId,
        limit: usize,
    ) -> Result<Vec<CrossModuleKnowledge>, StoreError> {
        let sql = format!(
            "SELECT {} FROM knowledge_summaries \
             WHERE learner_id = $1 AND module_id <> $2 \
             ORDER BY updated_at DESC LIMIT $3",
            KNOWLEDGE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(learner_id.as_str())
            .bind(exclude_module_id.as_str())
            .bind(limit.min(i64::MAX as usize) as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db("fetch cross-module knowledge"))?;

        rows.iter().map(knowledge_from_row).collect()
    }

    async fn get_knowledge_summary(
        &self,
        learner_id: &LearnerId,
        module_id: &ModuleId,
    ) -> Result<Option<CrossModuleKnowledge>, StoreError> {
        let sql = format!(
            "SELECT {} FROM knowledge_summaries WHERE learner_id = $1 AND module_id = $2",
            KNOWLEDGE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(learner_id.as_str())
            .bind(module_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db("fetch knowledge summary"))?;

        row.as_ref().map(knowledge_from_row).transpose()
    }

    async fn upsert_knowledge_summary(
        &self,
        update: KnowledgeSummaryUpdate,
    ) -> Result<CrossModuleKnowledge, StoreError> {
        let record = update.into_record(Timestamp::now());
        let links = to_json(&record.links)?;

        sqlx::query(
            r#"
            INSERT INTO knowledge_summaries (
                learner_id, module_id, module_title, summary, confidence,
                retention_strength, links, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (learner_id, module_id) DO UPDATE SET
                module_title = EXCLUDED.module_title,
                summary = EXCLUDED.summary,
                confidence = EXCLUDED.confidence,
                retention_strength = EXCLUDED.retention_strength,
                links = EXCLUDED.links,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.learner_id.as_str())
        .bind(record.module_id.as_str())
        .bind(&record.module_title)
        .bind(&record.summary)
        .bind(record.confidence)
        .bind(record.retention_strength)
        .bind(links)
        .bind(record.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db("upsert knowledge summary"))?;

        Ok(record)
    }
}
