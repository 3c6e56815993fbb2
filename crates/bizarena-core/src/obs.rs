//! Structured observability hooks for battles, submissions and verification.
//!
//! Events are emitted at `info!` (failures at `warn!`) with an `event` field
//! naming them, so JSON log pipelines can filter on it. Verbosity is set with
//! `BIZARENA_LOG`.

use tracing::{info, warn, Span};

/// Battle-scoped span. Attach it to the battle future with
/// [`tracing::Instrument::instrument`] so every event inside carries the
/// battle id and mode.
pub fn battle_span(battle_id: &str, mode: &str) -> Span {
    tracing::info_span!("bizarena.battle", battle_id = %battle_id, mode = %mode)
}

pub fn emit_battle_started(battle_id: &str, category: &str, participants: usize, rounds: usize) {
    info!(
        event = "battle.started",
        battle_id = %battle_id,
        category = %category,
        participants = participants,
        rounds = rounds,
    );
}

/// Emit event: one round finished, with how many participants failed in it.
pub fn emit_round_completed(battle_id: &str, index: usize, actions: usize, failed: usize) {
    info!(
        event = "battle.round_completed",
        battle_id = %battle_id,
        round = index,
        actions = actions,
        failed = failed,
    );
}

pub fn emit_battle_finished(battle_id: &str, rounds: usize, winner: Option<&str>) {
    info!(
        event = "battle.finished",
        battle_id = %battle_id,
        rounds = rounds,
        winner = winner.unwrap_or("none"),
    );
}

/// Emit event: a participant call failed and was recorded as a sentinel.
pub fn emit_action_failed(round: usize, participant_id: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "participant.action_failed",
        round = round,
        participant_id = %participant_id,
        error = %error,
    );
}

pub fn emit_submission_registered(submission_id: &str, agent_name: &str, task_count: usize) {
    info!(
        event = "submission.registered",
        submission_id = %submission_id,
        agent_name = %agent_name,
        task_count = task_count,
    );
}

pub fn emit_verification_completed(submission_id: &str, sampled: usize, score_diff: f64, passed: bool) {
    info!(
        event = "verification.completed",
        submission_id = %submission_id,
        sampled = sampled,
        score_diff = score_diff,
        passed = passed,
    );
}
