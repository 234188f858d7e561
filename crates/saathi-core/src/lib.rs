//! saathi-core: core library for the Saathi backend relay (shared types,
//! per-user preference store, prompt composition, and the LLM completion
//! bridge).
//!
//! The gateway depends on this crate only; it re-exports everything the
//! HTTP layer needs so the public API stays in one place.

mod completion;
mod error;
mod memory;
mod shared;
pub mod prompts;

pub use completion::{CompletionService, LlmMode};
pub use error::{CoreError, CoreResult};
pub use memory::PreferenceStore;
pub use shared::{ChatMode, CoreConfig, PreferenceRecord};
