//! Round results, battle reports and the derived summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collaborators::{ActionLog, RoundMetrics};
use crate::domain::AgentCategory;
use crate::scoring::{mean, WeightTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleMode {
    HeadToHead,
    Tournament,
    TeamBattle,
}

impl BattleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BattleMode::HeadToHead => "head_to_head",
            BattleMode::Tournament => "tournament",
            BattleMode::TeamBattle => "team_battle",
        }
    }
}

impl std::fmt::Display for BattleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executed round (or stage). Immutable once the round completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub index: usize,
    pub participant_actions: ActionLog,
    pub metrics: RoundMetrics,
}

/// Complete record of a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleReport {
    pub battle_id: Uuid,
    pub mode: BattleMode,
    pub category: AgentCategory,
    /// Scenario name, for team battles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rounds: Vec<RoundResult>,
    pub final_scores: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub participant_id: String,
    pub score: f64,
    pub failed_actions: usize,
}

/// Condensed view of a report: standings and a winner, if there is one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSummary {
    pub battle_id: Uuid,
    pub mode: BattleMode,
    pub category: AgentCategory,
    pub rounds_played: usize,
    /// `None` when the top score is shared.
    pub winner: Option<String>,
    pub standings: Vec<Standing>,
}

impl BattleReport {
    pub fn summary(&self) -> BattleSummary {
        let mut standings: Vec<Standing> = self
            .final_scores
            .iter()
            .map(|(id, score)| Standing {
                participant_id: id.clone(),
                score: *score,
                failed_actions: self
                    .rounds
                    .iter()
                    .filter(|r| {
                        r.participant_actions
                            .get(id)
                            .map(|o| o.is_failed())
                            .unwrap_or(false)
                    })
                    .count(),
            })
            .collect();
        standings.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.participant_id.cmp(&b.participant_id))
        });

        let winner = match standings.as_slice() {
            [first, second, ..] if first.score == second.score => None,
            [first, ..] => Some(first.participant_id.clone()),
            [] => None,
        };

        BattleSummary {
            battle_id: self.battle_id,
            mode: self.mode,
            category: self.category,
            rounds_played: self.rounds.len(),
            winner,
            standings,
        }
    }
}

/// Final score per participant: the mean, over rounds where the participant
/// has scorable metrics, of its weighted round score. Participants without any
/// scorable round get 0. Metrics for unregistered ids are ignored.
pub fn final_scores(
    participants: &[String],
    rounds: &[RoundResult],
    table: &WeightTable,
) -> BTreeMap<String, f64> {
    participants
        .iter()
        .map(|id| {
            let per_round: Vec<f64> = rounds
                .iter()
                .filter_map(|r| r.metrics.get(id))
                .filter_map(|metrics| table.score(metrics).ok())
                .collect();
            (id.clone(), mean(&per_round).unwrap_or(0.0))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::ActionOutcome;
    use serde_json::json;

    fn metrics(entries: &[(&str, &[(&str, f64)])]) -> RoundMetrics {
        entries
            .iter()
            .map(|(id, m)| {
                (
                    id.to_string(),
                    m.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                )
            })
            .collect()
    }

    fn round(index: usize, m: RoundMetrics) -> RoundResult {
        RoundResult {
            index,
            participant_actions: ActionLog::new(),
            metrics: m,
        }
    }

    #[test]
    fn test_final_scores_average_over_scorable_rounds() {
        let table = WeightTable::for_category(AgentCategory::GeneralPurpose);
        let rounds = vec![
            round(0, metrics(&[("a", &[("task_completion", 8.0)]), ("b", &[("task_completion", 4.0)])])),
            round(1, metrics(&[("a", &[("task_completion", 6.0)])])),
        ];
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let scores = final_scores(&ids, &rounds, &table);
        assert_eq!(scores["a"], 7.0);
        assert_eq!(scores["b"], 4.0);
        assert_eq!(scores["c"], 0.0);
    }

    #[test]
    fn test_final_scores_ignore_unregistered_ids() {
        let table = WeightTable::for_category(AgentCategory::GeneralPurpose);
        let rounds = vec![round(0, metrics(&[("ghost", &[("efficiency", 9.0)])]))];
        let scores = final_scores(&["a".to_string()], &rounds, &table);
        assert_eq!(scores.len(), 1);
        assert!(!scores.contains_key("ghost"));
    }

    fn report(scores: &[(&str, f64)]) -> BattleReport {
        let mut log = ActionLog::new();
        log.push("b", ActionOutcome::Failed { error: "timeout".into() });
        log.push("a", ActionOutcome::Completed { action: json!("x") });
        BattleReport {
            battle_id: Uuid::new_v4(),
            mode: BattleMode::HeadToHead,
            category: AgentCategory::Marketing,
            scenario: None,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            rounds: vec![RoundResult {
                index: 0,
                participant_actions: log,
                metrics: RoundMetrics::new(),
            }],
            final_scores: scores.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn test_summary_orders_standings_and_counts_failures() {
        let summary = report(&[("a", 4.0), ("b", 7.5)]).summary();
        assert_eq!(summary.winner.as_deref(), Some("b"));
        assert_eq!(summary.rounds_played, 1);
        assert_eq!(summary.standings[0].participant_id, "b");
        assert_eq!(summary.standings[0].failed_actions, 1);
        assert_eq!(summary.standings[1].failed_actions, 0);
    }

    #[test]
    fn test_summary_draw_has_no_winner() {
        let summary = report(&[("a", 5.0), ("b", 5.0)]).summary();
        assert_eq!(summary.winner, None);
        assert_eq!(summary.standings[0].participant_id, "a");
    }

    #[test]
    fn test_report_json_uses_snake_case_mode() {
        let value = serde_json::to_value(report(&[("a", 1.0)])).unwrap();
        assert_eq!(value["mode"], "head_to_head");
        assert_eq!(value["category"], "marketing");
        assert!(value.get("scenario").is_none());
    }
}
