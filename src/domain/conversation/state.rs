//! Conversation lifecycle.
//!
//! `New` on creation, `Active` once the first learner message lands, and
//! `Finalized` only on an explicit close from outside the core. There is no
//! idle-timeout transition.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// The lifecycle status of a tutoring conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Created lazily, no learner message yet.
    #[default]
    New,

    /// At least one exchange has started.
    Active,

    /// Closed; read-only from here on.
    Finalized,
}

impl ConversationStatus {
    /// Returns true if new exchanges may run against the conversation.
    pub fn accepts_messages(&self) -> bool {
        matches!(self, Self::New | Self::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Active => "active",
            Self::Finalized => "finalized",
        }
    }
}

impl StateMachine for ConversationStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ConversationStatus::*;
        matches!(
            (self, target),
            (New, Active) | (Active, Active) | (Active, Finalized) | (New, Finalized)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ConversationStatus::*;
        match self {
            New => vec![Active, Finalized],
            Active => vec![Active, Finalized],
            Finalized => vec![],
        }
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "active" => Ok(Self::Active),
            "finalized" => Ok(Self::Finalized),
            other => Err(ValidationError::invalid_format(
                "conversation_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod state_definition {
        use super::*;

        #[test]
        fn default_status_is_new() {
            assert_eq!(ConversationStatus::default(), ConversationStatus::New);
        }

        #[test]
        fn serializes_to_snake_case() {
            let json = serde_json::to_string(&ConversationStatus::Finalized).unwrap();
            assert_eq!(json, "\"finalized\"");
        }

        #[test]
        fn round_trips_through_str() {
            for status in [
                ConversationStatus::New,
                ConversationStatus::Active,
                ConversationStatus::Finalized,
            ] {
                assert_eq!(status.as_str().parse::<ConversationStatus>().unwrap(), status);
            }
        }
    }

    mod transitions {
        use super::*;

        #[test]
        fn first_message_activates() {
            assert!(ConversationStatus::New.can_transition_to(&ConversationStatus::Active));
        }

        #[test]
        fn active_stays_active_on_each_exchange() {
            assert_eq!(
                ConversationStatus::Active.transition_to(ConversationStatus::Active),
                Ok(ConversationStatus::Active)
            );
        }

        #[test]
        fn close_is_allowed_from_new_and_active() {
            assert!(ConversationStatus::New.can_transition_to(&ConversationStatus::Finalized));
            assert!(ConversationStatus::Active.can_transition_to(&ConversationStatus::Finalized));
        }

        #[test]
        fn finalized_is_terminal() {
            assert!(ConversationStatus::Finalized.is_terminal());
            assert!(ConversationStatus::Finalized
                .transition_to(ConversationStatus::Active)
                .is_err());
        }

        #[test]
        fn cannot_go_back_to_new() {
            assert!(!ConversationStatus::Active.can_transition_to(&ConversationStatus::New));
        }

        #[test]
        fn only_open_statuses_accept_messages() {
            assert!(ConversationStatus::New.accepts_messages());
            assert!(ConversationStatus::Active.accepts_messages());
            assert!(!ConversationStatus::Finalized.accepts_messages());
        }
    }
}
