//! System-prompt composition for the two chat personas.
//!
//! Personal mode embeds the user's stored preferences; every composed prompt
//! mentions color, food, hobby, music, and mood, substituting "unknown" for
//! any field that is unset. Academy mode is a fixed tutoring instruction
//! that ignores the record entirely.

use crate::shared::{ChatMode, PreferenceRecord};

/// Placeholder substituted for any preference field the user has not set.
pub const UNKNOWN_VALUE: &str = "unknown";

/// Companion persona template. Placeholders are replaced with the user's
/// stored favorites and mood, or `UNKNOWN_VALUE` when unset.
pub const PERSONAL_SYSTEM_TEMPLATE: &str = "You are Saathi, a warm and affectionate companion. \
The user's favorite color is {color}, their favorite food is {food}, their favorite hobby is {hobby}, \
and their favorite music is {music}. Their current mood is {mood}. \
Respond in a caring, personal way that reflects what you know about them.";

/// Tutoring persona instruction. Fixed text; the preference record plays no
/// part in academy mode.
pub const ACADEMY_SYSTEM: &str = "You are Saathi, an expert tutor specializing in NCERT/CBSE \
Class 10 subjects. Provide clear, detailed explanations using examples when appropriate.";

/// Favorite categories the personal template always mentions.
const PERSONAL_FAVORITE_SLOTS: [&str; 4] = ["color", "food", "hobby", "music"];

/// Builds the instruction text framing the conversational request.
/// Deterministic and side-effect-free: the same `(mode, record)` input
/// always yields the same text.
pub fn compose_system_prompt(mode: ChatMode, record: &PreferenceRecord) -> String {
    match mode {
        ChatMode::Personal => personal_system_prompt(record),
        ChatMode::Academy => ACADEMY_SYSTEM.to_string(),
    }
}

/// Fills the personal template from the record, substituting `UNKNOWN_VALUE`
/// for unset fields so the model always sees all five slots.
fn personal_system_prompt(record: &PreferenceRecord) -> String {
    let mut out = PERSONAL_SYSTEM_TEMPLATE.to_string();
    for slot in PERSONAL_FAVORITE_SLOTS {
        let value = record
            .favorites
            .get(slot)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_VALUE);
        out = out.replace(&format!("{{{slot}}}"), value);
    }
    let mood = record.mood.as_deref().unwrap_or(UNKNOWN_VALUE);
    out.replace("{mood}", mood)
}
