//! Context Assembly Engine.
//!
//! Merges four layers into one bounded prompt:
//!
//! 1. learner profile (never truncated)
//! 2. module and pedagogy (never truncated)
//! 3. live conversation (oldest messages dropped first)
//! 4. cross-module knowledge (first to be omitted)
//!
//! `compose` is a pure function of its inputs. Gathering the inputs from the
//! stores happens in the application layer.

use super::layers::{
    AssembledContext, ContextConfig, LayerKind, LayerMetadata, LAYER_SEPARATOR,
};
use super::strategy::{dialogue_context, response_strategy, socratic_strategy};
use crate::domain::conversation::StoredMessage;
use crate::domain::foundation::LearnerId;
use crate::domain::learning::{CrossModuleKnowledge, LearningProfile, ModuleConfig};

const CORE_INSTRUCTION: &str = "Use questioning to guide discovery. Never give direct answers.";
const DEFAULT_CONVERSATION: &str = "No previous messages; this is the start of the dialogue.";
const DEFAULT_KNOWLEDGE: &str = "No prior module knowledge recorded yet.";

/// Everything `compose` reads, already fetched from the stores.
///
/// `None` means the source had nothing to offer (no profile record, no
/// open conversation, store unavailable); the layer then renders its
/// labeled default.
#[derive(Debug, Clone)]
pub struct LayerSources {
    pub learner_id: LearnerId,
    pub module: ModuleConfig,
    pub profile: Option<LearningProfile>,
    /// Oldest first.
    pub messages: Option<Vec<StoredMessage>>,
    /// Most recent first, other modules only.
    pub knowledge: Option<Vec<CrossModuleKnowledge>>,
    pub current_message: String,
}

/// Builds the prompt for one exchange under the configured size cap.
pub fn compose(sources: &LayerSources, config: &ContextConfig) -> AssembledContext {
    let (profile_block, profile_default) = render_profile(sources);
    let module_block = render_module(&sources.module, &sources.current_message);

    let mut prompt = String::with_capacity(config.max_context_chars.max(profile_block.len()));
    prompt.push_str(&profile_block);
    prompt.push_str(LAYER_SEPARATOR);
    prompt.push_str(&module_block);
    let core_bytes = prompt.len();

    let mut layers = vec![
        LayerMetadata {
            kind: LayerKind::Profile,
            included: true,
            is_default: profile_default,
            bytes: profile_block.len(),
            entries_total: 1,
            entries_kept: 1,
        },
        LayerMetadata {
            kind: LayerKind::Module,
            included: true,
            is_default: false,
            bytes: module_block.len(),
            entries_total: 1,
            entries_kept: 1,
        },
    ];

    let mut budget = config.max_context_chars.saturating_sub(core_bytes);

    let messages = recent_slice(sources.messages.as_deref(), config.recent_message_limit);
    let conversation = fit_conversation(messages, budget);
    if let Some(block) = &conversation.block {
        prompt.push_str(LAYER_SEPARATOR);
        prompt.push_str(block);
        budget -= LAYER_SEPARATOR.len() + block.len();
    }
    layers.push(conversation.metadata(LayerKind::Conversation));

    let knowledge_entries = sources
        .knowledge
        .as_deref()
        .map(|k| &k[..k.len().min(config.knowledge_limit)]);
    let knowledge = if conversation.complete {
        fit_knowledge(knowledge_entries, budget)
    } else {
        // Layer 3 already lost content, so layer 4 gets nothing.
        let total = knowledge_entries.map_or(0, |k| k.len());
        FittedLayer::omitted(total == 0, total)
    };
    if let Some(block) = &knowledge.block {
        prompt.push_str(LAYER_SEPARATOR);
        prompt.push_str(block);
    }
    layers.push(knowledge.metadata(LayerKind::Knowledge));

    let layers_active = layers.iter().filter(|l| l.is_active()).count() as u8;

    AssembledContext {
        size_bytes: prompt.len(),
        prompt,
        layers_active,
        core_bytes,
        layers,
    }
}

fn render_profile(sources: &LayerSources) -> (String, bool) {
    let (profile, is_default) = match &sources.profile {
        Some(profile) => (profile.clone(), false),
        None => (LearningProfile::default_for(sources.learner_id.clone()), true),
    };

    let mut lines = vec![
        LayerKind::Profile.header(is_default),
        format!("LEARNING STYLE: {}", profile.learning_style),
        format!("PACE: {}", profile.pace),
        format!("INTERACTION PREFERENCE: {}", profile.interaction_preference),
    ];
    if !profile.goals.is_empty() {
        lines.push(format!("GOALS: {}", profile.goals.join("; ")));
    }
    if let Some(digest) = profile.mastery_digest(&sources.module.id) {
        lines.push(format!("PRIOR MASTERY: {}", digest));
    }
    (lines.join("\n"), is_default)
}

fn render_module(module: &ModuleConfig, current_message: &str) -> String {
    let mut lines = vec![
        LayerKind::Module.header(false),
        format!("TITLE: {}", module.title),
    ];
    if !module.description.trim().is_empty() {
        lines.push(format!("DESCRIPTION: {}", module.description.trim()));
    }
    if !module.objectives.is_empty() {
        lines.push("OBJECTIVES:".to_string());
        lines.extend(module.objectives.iter().map(|o| format!("- {}", o)));
    }
    if !module.teaching_directive.trim().is_empty() {
        lines.push(format!("TEACHING DIRECTIVE: {}", module.teaching_directive.trim()));
    }
    lines.push(format!(
        "SOCRATIC INTENSITY: {} - {}",
        module.socratic_intensity,
        module.socratic_intensity.guidance()
    ));
    lines.push(format!("SOCRATIC APPROACH: {}", socratic_strategy(&module.title)));
    if !current_message.trim().is_empty() {
        lines.push(format!("RESPONSE STRATEGY: {}", response_strategy(current_message)));
    }
    lines.push(format!("CORE INSTRUCTION: {}", CORE_INSTRUCTION));
    lines.join("\n")
}

fn recent_slice(messages: Option<&[StoredMessage]>, limit: usize) -> Option<&[StoredMessage]> {
    messages.map(|m| &m[m.len().saturating_sub(limit)..])
}

/// Outcome of fitting one optional layer into the remaining budget.
struct FittedLayer {
    block: Option<String>,
    is_default: bool,
    entries_total: usize,
    entries_kept: usize,
    /// Every available entry made it in.
    complete: bool,
}

impl FittedLayer {
    fn omitted(is_default: bool, entries_total: usize) -> Self {
        Self {
            block: None,
            is_default,
            entries_total,
            entries_kept: 0,
            complete: false,
        }
    }

    fn metadata(&self, kind: LayerKind) -> LayerMetadata {
        LayerMetadata {
            kind,
            included: self.block.is_some(),
            is_default: self.is_default,
            bytes: self.block.as_ref().map_or(0, |b| b.len()),
            entries_total: self.entries_total,
            entries_kept: self.entries_kept,
        }
    }
}

fn fits(block: &str, budget: usize) -> bool {
    LAYER_SEPARATOR.len() + block.len() <= budget
}

fn fit_conversation(messages: Option<&[StoredMessage]>, budget: usize) -> FittedLayer {
    let messages = match messages {
        Some(m) if !m.is_empty() => m,
        _ => {
            let block = format!(
                "{}\n{}",
                LayerKind::Conversation.header(true),
                DEFAULT_CONVERSATION
            );
            return if fits(&block, budget) {
                FittedLayer {
                    block: Some(block),
                    is_default: true,
                    entries_total: 0,
                    entries_kept: 0,
                    complete: true,
                }
            } else {
                FittedLayer::omitted(true, 0)
            };
        }
    };

    let digest = dialogue_context(messages);
    let total = messages.len();

    // Drop the oldest messages until the block fits; keep at least one.
    for dropped in 0..total {
        let block = render_conversation(&digest, &messages[dropped..], dropped);
        if fits(&block, budget) {
            return FittedLayer {
                block: Some(block),
                is_default: false,
                entries_total: total,
                entries_kept: total - dropped,
                complete: dropped == 0,
            };
        }
    }

    FittedLayer::omitted(false, total)
}

fn render_conversation(digest: &str, kept: &[StoredMessage], dropped: usize) -> String {
    let mut lines = vec![
        LayerKind::Conversation.header(false),
        format!("DIALOGUE CONTEXT: {}", digest),
    ];
    if dropped > 0 {
        lines.push(format!("({} earlier messages omitted)", dropped));
    }
    lines.extend(kept.iter().map(StoredMessage::render_line));
    lines.join("\n")
}

fn fit_knowledge(entries: Option<&[CrossModuleKnowledge]>, budget: usize) -> FittedLayer {
    let entries = match entries {
        Some(e) if !e.is_empty() => e,
        _ => {
            let block = format!("{}\n{}", LayerKind::Knowledge.header(true), DEFAULT_KNOWLEDGE);
            return if fits(&block, budget) {
                FittedLayer {
                    block: Some(block),
                    is_default: true,
                    entries_total: 0,
                    entries_kept: 0,
                    complete: true,
                }
            } else {
                FittedLayer::omitted(true, 0)
            };
        }
    };

    let mut block = LayerKind::Knowledge.header(false);
    let mut kept = 0;
    for entry in entries {
        let line = entry.render_line();
        if LAYER_SEPARATOR.len() + block.len() + 1 + line.len() > budget {
            break;
        }
        block.push('\n');
        block.push_str(&line);
        kept += 1;
    }

    if kept == 0 {
        return FittedLayer::omitted(false, entries.len());
    }

    FittedLayer {
        block: Some(block),
        is_default: false,
        entries_total: entries.len(),
        entries_kept: kept,
        complete: kept == entries.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::{MessageDraft, MessageRole};
    use crate::domain::foundation::{ConversationId, ModuleId, Timestamp};
    use crate::domain::learning::{
        KnowledgeSummaryUpdate, LearningStyle, MasteryTier, ModuleMastery, Pace, SocraticIntensity,
    };
    use proptest::prelude::*;

    fn module() -> ModuleConfig {
        ModuleConfig::new(ModuleId::new("1").unwrap(), "Intro to Communication")
            .unwrap()
            .with_description("How people exchange meaning")
            .with_objectives(vec!["Name the parts of a message".into()])
            .with_directive("Anchor every question in the learner's daily life")
            .with_intensity(SocraticIntensity::High)
    }

    fn messages(count: usize, len: usize) -> Vec<StoredMessage> {
        let conversation_id = ConversationId::new();
        (0..count)
            .map(|i| {
                let text = format!("m{:03} {}", i, "x".repeat(len));
                let draft = if i % 2 == 0 {
                    MessageDraft::learner(text)
                } else {
                    MessageDraft {
                        role: MessageRole::Tutor,
                        token_count: 1,
                        text,
                        analysis: None,
                    }
                };
                draft.into_stored(conversation_id, Timestamp::now())
            })
            .collect()
    }

    fn knowledge(count: usize, len: usize) -> Vec<CrossModuleKnowledge> {
        (0..count)
            .map(|i| {
                KnowledgeSummaryUpdate {
                    learner_id: LearnerId::new("learner").unwrap(),
                    module_id: ModuleId::new(format!("{}", i + 2)).unwrap(),
                    module_title: format!("Module {}", i + 2),
                    summary: format!("k{} {}", i, "y".repeat(len)),
                    confidence: 0.6,
                    retention_strength: 0.9,
                    links: vec![],
                }
                .into_record(Timestamp::now())
            })
            .collect()
    }

    fn sources() -> LayerSources {
        LayerSources {
            learner_id: LearnerId::new("learner").unwrap(),
            module: module(),
            profile: None,
            messages: Some(messages(4, 20)),
            knowledge: Some(knowledge(2, 20)),
            current_message: "What is encoding?".into(),
        }
    }

    mod layout {
        use super::*;

        #[test]
        fn default_profile_tokens_and_three_active_layers() {
            let context = compose(&sources(), &ContextConfig::default());

            assert!(context.prompt.contains("=== LEARNER PROFILE (default) ==="));
            assert!(context.prompt.contains("LEARNING STYLE: reading"));
            assert!(context.prompt.contains("PACE: medium"));
            assert_eq!(context.layers_active, 3);
            assert!(!context.was_truncated());
        }

        #[test]
        fn real_profile_counts_as_active() {
            let mut sources = sources();
            let mut profile = LearningProfile::default_for(sources.learner_id.clone());
            profile.learning_style = LearningStyle::Visual;
            profile.pace = Pace::Fast;
            profile
                .mastery
                .insert(ModuleId::new("2").unwrap(), ModuleMastery::new(50.0, MasteryTier::Developing));
            sources.profile = Some(profile);

            let context = compose(&sources, &ContextConfig::default());
            assert!(context.prompt.starts_with("=== LEARNER PROFILE ===\nLEARNING STYLE: visual"));
            assert!(context.prompt.contains("PRIOR MASTERY: module 2 50% (developing)"));
            assert_eq!(context.layers_active, 4);
        }

        #[test]
        fn blocks_appear_in_priority_order() {
            let context = compose(&sources(), &ContextConfig::default());
            let p = context.prompt.find("=== LEARNER PROFILE").unwrap();
            let m = context.prompt.find("=== MODULE ===").unwrap();
            let c = context.prompt.find("=== CONVERSATION ===").unwrap();
            let k = context.prompt.find("=== PRIOR KNOWLEDGE ===").unwrap();
            assert!(p < m && m < c && c < k);
        }

        #[test]
        fn module_block_carries_pedagogy() {
            let context = compose(&sources(), &ContextConfig::default());
            assert!(context.prompt.contains("TITLE: Intro to Communication"));
            assert!(context.prompt.contains("- Name the parts of a message"));
            assert!(context.prompt.contains("SOCRATIC INTENSITY: high"));
            assert!(context.prompt.contains("SOCRATIC APPROACH: Guide discovery"));
            assert!(context.prompt.contains("RESPONSE STRATEGY: Learner is asking"));
            assert!(context.prompt.contains("CORE INSTRUCTION: Use questioning"));
        }

        #[test]
        fn missing_sources_render_labeled_defaults() {
            let mut sources = sources();
            sources.messages = None;
            sources.knowledge = Some(vec![]);

            let context = compose(&sources, &ContextConfig::default());
            assert!(context.prompt.contains("=== CONVERSATION (default) ==="));
            assert!(context.prompt.contains("=== PRIOR KNOWLEDGE (default) ==="));
            assert_eq!(context.layers_active, 1);
            assert_eq!(context.layers.len(), 4);
        }

        #[test]
        fn message_and_knowledge_limits_apply() {
            let mut sources = sources();
            sources.messages = Some(messages(15, 5));
            sources.knowledge = Some(knowledge(5, 5));
            let config = ContextConfig {
                max_context_chars: 100_000,
                ..ContextConfig::default()
            };

            let context = compose(&sources, &config);
            let conv = context.layer(LayerKind::Conversation).unwrap();
            let know = context.layer(LayerKind::Knowledge).unwrap();
            assert_eq!(conv.entries_total, 10);
            assert_eq!(know.entries_kept, 3);
            assert!(!context.prompt.contains("m004"));
            assert!(context.prompt.contains("m005"));
        }

        #[test]
        fn is_deterministic() {
            let sources = sources();
            let config = ContextConfig::default();
            assert_eq!(compose(&sources, &config).prompt, compose(&sources, &config).prompt);
        }
    }

    mod truncation {
        use super::*;

        fn core_len(sources: &LayerSources) -> usize {
            compose(
                sources,
                &ContextConfig {
                    max_context_chars: 0,
                    ..ContextConfig::default()
                },
            )
            .core_bytes
        }

        #[test]
        fn knowledge_dropped_before_conversation() {
            let mut sources = sources();
            sources.messages = Some(messages(4, 200));
            sources.knowledge = Some(knowledge(3, 200));
            let core = core_len(&sources);
            let config = ContextConfig {
                max_context_chars: core + 1000,
                ..ContextConfig::default()
            };

            let context = compose(&sources, &config);
            let conv = context.layer(LayerKind::Conversation).unwrap();
            let know = context.layer(LayerKind::Knowledge).unwrap();
            assert_eq!(conv.entries_kept, 4);
            assert!(know.entries_kept < 3);
            assert!(context.size_bytes <= config.max_context_chars);
        }

        #[test]
        fn oldest_messages_dropped_first() {
            let mut sources = sources();
            sources.messages = Some(messages(6, 200));
            let core = core_len(&sources);
            let config = ContextConfig {
                max_context_chars: core + 700,
                ..ContextConfig::default()
            };

            let context = compose(&sources, &config);
            let conv = context.layer(LayerKind::Conversation).unwrap();
            assert!(conv.included);
            assert!(conv.entries_kept < 6);
            assert!(context.prompt.contains("m005"));
            assert!(!context.prompt.contains("m000"));
            assert!(context.prompt.contains("earlier messages omitted"));
            assert!(!context.layer(LayerKind::Knowledge).unwrap().included);
        }

        #[test]
        fn core_layers_survive_a_tiny_cap() {
            let sources = sources();
            let config = ContextConfig {
                max_context_chars: 10,
                ..ContextConfig::default()
            };

            let context = compose(&sources, &config);
            assert_eq!(context.size_bytes, context.core_bytes);
            assert!(context.prompt.contains("CORE INSTRUCTION"));
            assert!(!context.layer(LayerKind::Conversation).unwrap().included);
            assert!(!context.layer(LayerKind::Knowledge).unwrap().included);
            assert_eq!(context.layers_active, 1);
        }
    }

    proptest! {
        #[test]
        fn optional_layers_stay_within_budget(
            message_count in 0usize..14,
            message_len in 0usize..400,
            knowledge_count in 0usize..5,
            knowledge_len in 0usize..400,
            max in 0usize..6000,
        ) {
            let mut sources = sources();
            sources.messages = Some(messages(message_count, message_len));
            sources.knowledge = Some(knowledge(knowledge_count, knowledge_len));
            let config = ContextConfig { max_context_chars: max, ..ContextConfig::default() };

            let context = compose(&sources, &config);
            let optional = context.size_bytes - context.core_bytes;
            prop_assert!(optional <= max.saturating_sub(context.core_bytes));
            prop_assert!(context.prompt.contains("=== MODULE ==="));
        }

        #[test]
        fn knowledge_never_kept_when_conversation_truncated(
            message_count in 1usize..14,
            message_len in 0usize..400,
            max in 0usize..6000,
        ) {
            let mut sources = sources();
            sources.messages = Some(messages(message_count, message_len));
            sources.knowledge = Some(knowledge(3, 50));
            let config = ContextConfig { max_context_chars: max, ..ContextConfig::default() };

            let context = compose(&sources, &config);
            let conv = context.layer(LayerKind::Conversation).unwrap();
            let know = context.layer(LayerKind::Knowledge).unwrap();
            if conv.is_truncated() {
                prop_assert!(!know.included);
            }
        }
    }
}
