//! Chat relay: fetch stored preferences, compose the persona instruction,
//! and forward the two-message exchange to the completion service.

use saathi_core::prompts::compose_system_prompt;
use saathi_core::{ChatMode, CoreResult};

use crate::{AppState, ChatRequest};

/// Runs the linear relay flow for one chat request:
/// preferences, then instruction, then completion. No retries; the first
/// failure propagates to the boundary unchanged.
pub(crate) async fn relay_chat(state: &AppState, req: &ChatRequest) -> CoreResult<String> {
    let record = state.store.get(&req.user_id)?;
    let mode = ChatMode::from_raw(&req.mode);
    let instruction = compose_system_prompt(mode, &record);
    tracing::debug!(
        target: "saathi::gateway",
        mode = ?mode,
        instruction_chars = instruction.len(),
        "composed system instruction"
    );
    state.completions.complete(&instruction, &req.message).await
}
