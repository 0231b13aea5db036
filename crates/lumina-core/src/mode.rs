//! Chat modes.
//!
//! Each mode selects a fixed style instruction that is appended to the
//! system prompt. Modes form a closed enumeration with an associated
//! instruction table rather than a dynamic string key.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The active persona mode for a conversation turn.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ChatMode {
    /// Academic clarity with structured headings.
    Study,
    /// Simple analogies, explained like the reader is twelve.
    #[strum(serialize = "eli12")]
    Eli12,
    /// Highly technical insights in plain English.
    Expert,
    /// Extremely concise and task-oriented.
    Focus,
    /// Empathetic, supportive structure.
    Emotional,
    /// The fastest route to the answer.
    Quick,
    /// Pure utility, zero fluff.
    Ghost,
}

impl Default for ChatMode {
    fn default() -> Self {
        ChatMode::Study
    }
}

impl ChatMode {
    /// Human-readable label, as shown in the mode selector.
    pub fn label(&self) -> &'static str {
        match self {
            ChatMode::Study => "Study Mode",
            ChatMode::Eli12 => "ELI12",
            ChatMode::Expert => "Deep Expert",
            ChatMode::Focus => "Focus Mode",
            ChatMode::Emotional => "Emotional Support",
            ChatMode::Quick => "Quick Answer",
            ChatMode::Ghost => "Ghost Mode",
        }
    }

    /// The fixed style instruction sent for this mode.
    pub fn instruction(&self) -> &'static str {
        match self {
            ChatMode::Study => {
                "You are LUMINA in Study Mode. Provide academic clarity using a structured Heading and Paragraph format. Avoid all technical symbols."
            }
            ChatMode::Eli12 => {
                "You are LUMINA in ELI12 Mode. Use simple analogies. Always start with a Heading, followed by a simple Paragraph explanation. No symbols."
            }
            ChatMode::Expert => {
                "You are LUMINA in Deep Expert Mode. Highly technical insights but delivered in plain, elegant English. Strictly Heading followed by Paragraph."
            }
            ChatMode::Focus => {
                "You are LUMINA in Focus Mode. Extremely concise, task-oriented, and minimal. Use headings only if absolutely necessary. Zero fluff."
            }
            ChatMode::Emotional => {
                "You are LUMINA in Emotional Support Mode. Empathetic and clear. Structure every thought with a Heading then a supportive Paragraph."
            }
            ChatMode::Quick => {
                "You are LUMINA in Quick Answer Mode. The fastest route to the answer. Heading first, then a single clear Paragraph."
            }
            ChatMode::Ghost => {
                "You are LUMINA in Ghost Mode. Pure utility. Heading, then direct Paragraph answer. No fluff, no symbols."
            }
        }
    }
}
