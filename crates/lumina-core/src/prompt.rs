//! System-instruction assembly.
//!
//! The full instruction sent with every request is a fixed-order
//! concatenation: core identity preamble, user-identity line, mode style
//! template, facts summary, and the symbol-prohibition reminder.

use crate::memory::MemoryItem;
use crate::mode::ChatMode;
use crate::user::UserIdentity;

/// Core identity and style preamble, shared by every mode.
pub const CORE_IDENTITY: &str = "\
You are LUMINA, a next-generation AI assistant.
Personality: Calm, confident, mentor-like, emotionally intelligent.

IDENTITY:
- High-performance cognitive partner. Maximum clarity. Verified truth.

STRICT SYMBOL PROHIBITION:
- NEVER USE ANY OF THESE SYMBOLS: *, $, [, ], {, }, # (except for ### headers).
- THIS MEANS: No bolding, no italics, no brackets, no braces, no math symbols.
- Use only plain, elegant English. For emphasis, use descriptive language.

STRICT RESPONSE STRUCTURE:
- Use ### followed by a space for headers.
- Format: ### Heading, then a blank line, then the Paragraph.
- Do not manually generate links or URLs in the text unless specifically asked; official search results will be provided separately.";

/// Trailing reminder; the client also strips these symbols as a safety net.
const CRITICAL_INSTRUCTION: &str = "\
CRITICAL INSTRUCTION:
Strictly prohibited to use symbols: *, $, [, ], {, }.
# is allowed ONLY for ### headers.";

/// Builds the identity line for the active user, or a guest line.
fn identity_line(user: Option<&UserIdentity>) -> String {
    match user {
        Some(user) if !user.name.trim().is_empty() => format!(
            "USER IDENTITY: The person you are speaking with is {} ({}). Adjust your tone to be personalized for them.",
            user.name, user.email
        ),
        _ => "USER IDENTITY: Guest User.".to_string(),
    }
}

/// Builds the facts summary line; empty when there is nothing remembered.
fn facts_line(memory: &[MemoryItem]) -> Option<String> {
    if memory.is_empty() {
        return None;
    }
    let facts: Vec<&str> = memory.iter().map(|m| m.fact.as_str()).collect();
    Some(format!("Recent Facts Learned: {}", facts.join(". ")))
}

/// Assembles the complete system instruction for one turn.
pub fn build_system_instruction(
    mode: ChatMode,
    user: Option<&UserIdentity>,
    memory: &[MemoryItem],
) -> String {
    let mut sections = vec![
        CORE_IDENTITY.to_string(),
        identity_line(user),
        mode.instruction().to_string(),
    ];
    if let Some(facts) = facts_line(memory) {
        sections.push(facts);
    }
    sections.push(CRITICAL_INSTRUCTION.to_string());
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserIdentity {
        UserIdentity {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let memory = vec![MemoryItem::new("prefers tea", "preferences")];
        let instruction = build_system_instruction(ChatMode::Expert, Some(&user()), &memory);

        let identity_pos = instruction.find("You are LUMINA, a next-generation").unwrap();
        let user_pos = instruction.find("USER IDENTITY:").unwrap();
        let mode_pos = instruction.find("Deep Expert Mode").unwrap();
        let facts_pos = instruction.find("Recent Facts Learned:").unwrap();
        let critical_pos = instruction.find("CRITICAL INSTRUCTION:").unwrap();

        assert!(identity_pos < user_pos);
        assert!(user_pos < mode_pos);
        assert!(mode_pos < facts_pos);
        assert!(facts_pos < critical_pos);
    }

    #[test]
    fn test_guest_identity_without_user() {
        let instruction = build_system_instruction(ChatMode::Study, None, &[]);
        assert!(instruction.contains("USER IDENTITY: Guest User."));
        assert!(!instruction.contains("Recent Facts Learned:"));
    }

    #[test]
    fn test_blank_name_treated_as_guest() {
        let blank = UserIdentity {
            name: "   ".to_string(),
            email: String::new(),
        };
        let instruction = build_system_instruction(ChatMode::Study, Some(&blank), &[]);
        assert!(instruction.contains("USER IDENTITY: Guest User."));
    }

    #[test]
    fn test_facts_joined_with_periods() {
        let memory = vec![
            MemoryItem::new("prefers tea", "preferences"),
            MemoryItem::new("studies physics", "background"),
        ];
        let instruction = build_system_instruction(ChatMode::Quick, Some(&user()), &memory);
        assert!(instruction.contains("Recent Facts Learned: prefers tea. studies physics"));
    }
}
