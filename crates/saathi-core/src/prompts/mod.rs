//! Prompt templates for the chat personas.

pub mod chat;

pub use chat::{compose_system_prompt, ACADEMY_SYSTEM, PERSONAL_SYSTEM_TEMPLATE, UNKNOWN_VALUE};
