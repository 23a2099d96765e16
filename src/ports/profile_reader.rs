//! ProfileReader port: read-only access to learner profiles and module
//! configuration.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::foundation::{LearnerId, ModuleId};
use crate::domain::learning::{LearningProfile, ModuleConfig};

/// Query operations for profiles and modules.
///
/// Both lookups return `Ok(None)` for unknown ids; errors are reserved for
/// store failures.
#[async_trait]
pub trait ProfileReader: Send + Sync {
    /// Learner profile, if one has been recorded.
    async fn get_profile(&self, learner_id: &LearnerId) -> Result<Option<LearningProfile>, StoreError>;

    /// Module configuration, if the module exists.
    async fn get_module(&self, module_id: &ModuleId) -> Result<Option<ModuleConfig>, StoreError>;

    /// Titles of the given modules, for knowledge links. Unknown ids are
    /// skipped.
    async fn module_titles(&self, module_ids: &[ModuleId]) -> Result<Vec<String>, StoreError> {
        let mut titles = Vec::with_capacity(module_ids.len());
        for id in module_ids {
            if let Some(module) = self.get_module(id).await? {
                titles.push(module.title);
            }
        }
        Ok(titles)
    }
}
