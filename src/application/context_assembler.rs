//! Context assembler: gathers layer sources through the ports, then runs the
//! pure assembly engine.
//!
//! Only a missing module is fatal. Missing profiles and store failures on the
//! optional layers degrade to labeled defaults and are logged.

use std::sync::Arc;
use thiserror::Error;

use crate::domain::context::{compose, AssembledContext, ContextConfig, LayerSources};
use crate::domain::conversation::ConversationRecord;
use crate::domain::foundation::{ConversationId, LearnerId, ModuleId};
use crate::ports::{ConversationRepository, KnowledgeRepository, ProfileReader, StoreError};

/// Errors that abort assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("Module not found: {0}")]
    ModuleNotFound(ModuleId),

    #[error("Module lookup failed: {0}")]
    Store(#[from] StoreError),
}

/// Builds assembled contexts from the stores.
#[derive(Clone)]
pub struct ContextAssembler {
    profiles: Arc<dyn ProfileReader>,
    conversations: Arc<dyn ConversationRepository>,
    knowledge: Arc<dyn KnowledgeRepository>,
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(
        profiles: Arc<dyn ProfileReader>,
        conversations: Arc<dyn ConversationRepository>,
        knowledge: Arc<dyn KnowledgeRepository>,
        config: ContextConfig,
    ) -> Self {
        Self {
            profiles,
            conversations,
            knowledge,
            config,
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Assembles the context for a learner's open conversation in a module.
    ///
    /// Reads only; calling it twice against unchanged stores yields the same
    /// prompt.
    pub async fn assemble(
        &self,
        learner_id: &LearnerId,
        module_id: &ModuleId,
        current_message: &str,
    ) -> Result<AssembledContext, AssemblyError> {
        let conversation_id = match self
            .conversations
            .find_open_conversation(learner_id, module_id)
            .await
        {
            Ok(found) => found.map(|c| c.id),
            Err(err) => {
                tracing::warn!(
                    learner_id = %learner_id,
                    module_id = %module_id,
                    error = %err,
                    "Open conversation lookup failed, assembling without history"
                );
                None
            }
        };

        let sources = self
            .gather(learner_id, module_id, conversation_id.as_ref(), current_message)
            .await?;
        Ok(self.compose(&sources))
    }

    /// Gathers sources for a known conversation.
    pub async fn gather_for(
        &self,
        conversation: &ConversationRecord,
        current_message: &str,
    ) -> Result<LayerSources, AssemblyError> {
        self.gather(
            &conversation.learner_id,
            &conversation.module_id,
            Some(&conversation.id),
            current_message,
        )
        .await
    }

    /// Runs the pure engine and logs what had to be cut.
    pub fn compose(&self, sources: &LayerSources) -> AssembledContext {
        let context = compose(sources, &self.config);

        for layer in &context.layers {
            tracing::debug!(
                layer = %layer.kind,
                included = layer.included,
                is_default = layer.is_default,
                bytes = layer.bytes,
                entries_kept = layer.entries_kept,
                entries_total = layer.entries_total,
                "Context layer assembled"
            );
        }

        let metrics = context.metrics();
        tracing::debug!(
            learner_id = %sources.learner_id,
            module_id = %sources.module.id,
            size_bytes = metrics.size_bytes,
            word_count = metrics.word_count,
            layers_active = metrics.layers_active,
            optimization_score = metrics.optimization_score,
            "Context assembled"
        );

        if context.was_truncated() {
            tracing::warn!(
                learner_id = %sources.learner_id,
                module_id = %sources.module.id,
                size_bytes = context.size_bytes,
                max_context_chars = self.config.max_context_chars,
                "Context exceeded size cap, optional layers truncated"
            );
        }

        context
    }

    async fn gather(
        &self,
        learner_id: &LearnerId,
        module_id: &ModuleId,
        conversation_id: Option<&ConversationId>,
        current_message: &str,
    ) -> Result<LayerSources, AssemblyError> {
        let module = self
            .profiles
            .get_module(module_id)
            .await?
            .ok_or_else(|| AssemblyError::ModuleNotFound(module_id.clone()))?;

        let messages = async {
            let id = conversation_id?;
            match self
                .conversations
                .get_recent_messages(id, self.config.recent_message_limit)
                .await
            {
                Ok(messages) => Some(messages),
                Err(err) => {
                    tracing::warn!(conversation_id = %id, error = %err, "Recent messages unavailable");
                    None
                }
            }
        };

        let knowledge = async {
            match self
                .knowledge
                .get_cross_module_knowledge(learner_id, module_id, self.config.knowledge_limit)
                .await
            {
                Ok(entries) => Some(entries),
                Err(err) => {
                    tracing::warn!(learner_id = %learner_id, error = %err, "Cross-module knowledge unavailable");
                    None
                }
            }
        };

        let profile = async {
            match self.profiles.get_profile(learner_id).await {
                Ok(Some(profile)) => Some(profile),
                Ok(None) => {
                    tracing::warn!(learner_id = %learner_id, "Profile not found, using default profile");
                    None
                }
                Err(err) => {
                    tracing::warn!(learner_id = %learner_id, error = %err, "Profile lookup failed, using default profile");
                    None
                }
            }
        };

        let (profile, messages, knowledge) = tokio::join!(profile, messages, knowledge);

        Ok(LayerSources {
            learner_id: learner_id.clone(),
            module,
            profile,
            messages,
            knowledge,
            current_message: current_message.to_string(),
        })
    }
}
