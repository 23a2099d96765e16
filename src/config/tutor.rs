//! Tutoring core configuration
//!
//! Converted into the explicit `ContextConfig` and `ExchangeConfig` values the
//! application layer is constructed with.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::ai::AiConfig;
use super::error::ValidationError;
use crate::application::ExchangeConfig;
use crate::domain::context::ContextConfig;

/// Limits and timings of context assembly and exchanges
#[derive(Debug, Clone, Deserialize)]
pub struct TutorConfig {
    /// Soft cap on assembled prompt size in bytes
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Recent messages read for the conversation layer
    #[serde(default = "default_recent_message_limit")]
    pub recent_message_limit: usize,

    /// Other-module summaries read for the knowledge layer
    #[serde(default = "default_knowledge_limit")]
    pub knowledge_limit: usize,

    /// Bound on one provider call in seconds
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    /// Pause before the single persistence retry, in milliseconds
    #[serde(default = "default_persistence_retry_backoff")]
    pub persistence_retry_backoff_ms: u64,

    /// Longest accepted learner message in characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// Stored turns sent to the provider as chat history
    #[serde(default = "default_history_messages")]
    pub history_messages: usize,

    /// YAML file replacing the built-in fallback templates
    pub fallback_templates_path: Option<PathBuf>,
}

impl TutorConfig {
    pub fn context_config(&self) -> ContextConfig {
        ContextConfig {
            max_context_chars: self.max_context_chars,
            recent_message_limit: self.recent_message_limit,
            knowledge_limit: self.knowledge_limit,
        }
    }

    /// Combines tutor timings with the provider's sampling settings.
    pub fn exchange_config(&self, ai: &AiConfig) -> ExchangeConfig {
        ExchangeConfig {
            provider_timeout: Duration::from_secs(self.provider_timeout_secs),
            persistence_retry_backoff: Duration::from_millis(self.persistence_retry_backoff_ms),
            max_message_chars: self.max_message_chars,
            temperature: ai.temperature,
            max_tokens: ai.max_tokens,
            history_messages: self.history_messages,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive = [
            ("max_context_chars", self.max_context_chars),
            ("max_message_chars", self.max_message_chars),
            ("provider_timeout_secs", self.provider_timeout_secs as usize),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ValidationError::NonPositiveTutorSetting(name));
            }
        }
        Ok(())
    }
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            max_context_chars: default_max_context_chars(),
            recent_message_limit: default_recent_message_limit(),
            knowledge_limit: default_knowledge_limit(),
            provider_timeout_secs: default_provider_timeout(),
            persistence_retry_backoff_ms: default_persistence_retry_backoff(),
            max_message_chars: default_max_message_chars(),
            history_messages: default_history_messages(),
            fallback_templates_path: None,
        }
    }
}

fn default_max_context_chars() -> usize {
    4000
}

fn default_recent_message_limit() -> usize {
    10
}

fn default_knowledge_limit() -> usize {
    3
}

fn default_provider_timeout() -> u64 {
    30
}

fn default_persistence_retry_backoff() -> u64 {
    250
}

fn default_max_message_chars() -> usize {
    2000
}

fn default_history_messages() -> usize {
    6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_defaults() {
        let config = TutorConfig::default();
        assert_eq!(config.context_config(), ContextConfig::default());

        let exchange = config.exchange_config(&AiConfig::default());
        let expected = ExchangeConfig::default();
        assert_eq!(exchange.provider_timeout, expected.provider_timeout);
        assert_eq!(
            exchange.persistence_retry_backoff,
            expected.persistence_retry_backoff
        );
        assert_eq!(exchange.max_message_chars, expected.max_message_chars);
        assert_eq!(exchange.history_messages, expected.history_messages);
        assert_eq!(exchange.temperature, expected.temperature);
        assert_eq!(exchange.max_tokens, expected.max_tokens);
    }

    #[test]
    fn exchange_config_takes_sampling_from_ai_section() {
        let ai = AiConfig {
            temperature: 0.2,
            max_tokens: 120,
            ..Default::default()
        };
        let exchange = TutorConfig::default().exchange_config(&ai);
        assert_eq!(exchange.temperature, 0.2);
        assert_eq!(exchange.max_tokens, 120);
    }

    #[test]
    fn zero_context_cap_is_rejected() {
        let config = TutorConfig {
            max_context_chars: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::NonPositiveTutorSetting("max_context_chars"))
        ));
    }
}
