use anyhow::{Context, Result};
use std::path::Path;

use crate::battle::{BattleReport, BattleSummary};
use crate::leaderboard::RankingEntry;

/// Write a battle report as pretty JSON.
pub fn write_battle_report_json(path: &Path, report: &BattleReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize battle report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render rankings as a markdown table.
pub fn render_leaderboard_md(entries: &[RankingEntry]) -> String {
    let mut out = String::new();
    out.push_str("# Leaderboard\n\n");
    if entries.is_empty() {
        out.push_str("_No submissions._\n");
        return out;
    }
    out.push_str("| Rank | Submission | Agent | Category | Score | Verified | Tasks |\n");
    out.push_str("|---:|---|---|---|---:|:---:|---:|\n");
    for (i, e) in entries.iter().enumerate() {
        out.push_str(&format!(
            "| {} | `{}` | {} | {} | {:.2} | {} | {} |\n",
            i + 1,
            e.submission_id,
            e.agent_name,
            e.category,
            e.score,
            if e.verified { "yes" } else { "no" },
            e.task_count
        ));
    }
    out
}

/// Render a battle summary for PR comments or terminals.
pub fn render_battle_summary_md(summary: &BattleSummary) -> String {
    let mut out = String::new();
    out.push_str("# Battle Summary\n\n");
    out.push_str(&format!(
        "- battle: `{}`\n- mode: {}\n- category: {}\n- rounds played: {}\n- winner: {}\n\n",
        summary.battle_id,
        summary.mode,
        summary.category,
        summary.rounds_played,
        summary.winner.as_deref().unwrap_or("draw")
    ));

    out.push_str("## Standings\n");
    for (i, s) in summary.standings.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} ({:.2}, {} failed actions)\n",
            i + 1,
            s.participant_id,
            s.score,
            s.failed_actions
        ));
    }
    out
}
