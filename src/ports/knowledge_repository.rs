//! Knowledge repository port: per (learner, module) learning summaries.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::foundation::{LearnerId, ModuleId};
use crate::domain::learning::{CrossModuleKnowledge, KnowledgeSummaryUpdate};

#[async_trait]
pub trait KnowledgeRepository: Send + Sync {
    /// Up to `limit` summaries from modules other than `exclude_module_id`,
    /// most recently updated first.
    async fn get_cross_module_knowledge(
        &self,
        learner_id: &LearnerId,
        exclude_module_id: &ModuleId,
        limit: usize,
    ) -> Result<Vec<CrossModuleKnowledge>, StoreError>;

    /// Summary for exactly this learner and module.
    async fn get_knowledge_summary(
        &self,
        learner_id: &LearnerId,
        module_id: &ModuleId,
    ) -> Result<Option<CrossModuleKnowledge>, StoreError>;

    /// Inserts or replaces the summary for the update's learner and module.
    async fn upsert_knowledge_summary(
        &self,
        update: KnowledgeSummaryUpdate,
    ) -> Result<CrossModuleKnowledge, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn KnowledgeRepository) {}
    }
}
