//! Team battles over a staged business scenario.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{instrument, warn, Instrument};
use uuid::Uuid;

use crate::battle::report::{final_scores, BattleMode, BattleReport};
use crate::battle::round::{Entrant, RoundExecutor, Visibility};
use crate::collaborators::{
    ActionLog, ActionOutcome, Agent, BusinessScenario, DataQuery, DataSource, Participant,
    RoundEvaluator,
};
use crate::domain::{AgentCategory, ArenaError, CollabResult, CollaboratorError, Criterion, Result};
use crate::obs;
use crate::scoring::WeightTable;

const DURATION_PATTERN: &str = r"^\s*(\d+)\s*([A-Za-z]*)\s*$";

/// Number of stages a scenario duration maps to.
///
/// Accepts `"<n>"` or `"<n> <unit>"`. Stage, round and day units count one
/// stage each; a week is five business days, a month twenty and a quarter
/// sixty.
pub fn parse_duration(duration: &str) -> Result<usize> {
    let invalid = || ArenaError::InvalidDuration(duration.to_string());
    let re = Regex::new(DURATION_PATTERN).map_err(|_| invalid())?;
    let caps = re.captures(duration).ok_or_else(invalid)?;
    let count: usize = caps[1].parse().map_err(|_| invalid())?;
    let per_unit = match caps[2].to_ascii_lowercase().as_str() {
        "" | "stage" | "stages" | "round" | "rounds" | "day" | "days" => 1,
        "week" | "weeks" => 5,
        "month" | "months" => 20,
        "quarter" | "quarters" => 60,
        _ => return Err(invalid()),
    };
    match count.checked_mul(per_unit) {
        Some(stages) if stages > 0 => Ok(stages),
        _ => Err(invalid()),
    }
}

/// A named group of agents acting as one participant.
#[derive(Clone)]
pub struct AiTeam {
    pub name: String,
    pub team_strategy: String,
    members: Vec<(String, Arc<dyn Agent>)>,
}

impl AiTeam {
    pub fn new(name: impl Into<String>, team_strategy: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            team_strategy: team_strategy.into(),
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, id: impl Into<String>, agent: Arc<dyn Agent>) -> Self {
        self.members.push((id.into(), agent));
        self
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl std::fmt::Debug for AiTeam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiTeam")
            .field("name", &self.name)
            .field("team_strategy", &self.team_strategy)
            .field("members", &self.member_ids().collect::<Vec<_>>())
            .finish()
    }
}

/// Derives one team action from its members.
///
/// Collaborative teams call members in order; each member sees the stage log
/// followed by its teammates' earlier proposals. Independent teams call all
/// members concurrently without visibility. A team whose members all fail
/// has failed.
pub struct TeamParticipant {
    team: AiTeam,
    collaborative: bool,
}

impl TeamParticipant {
    pub fn new(team: AiTeam, collaborative: bool) -> Self {
        Self {
            team,
            collaborative,
        }
    }
}

#[async_trait]
impl Participant for TeamParticipant {
    async fn act(&self, data: &Value, visible: Option<&ActionLog>) -> CollabResult<Value> {
        let mut member_log = ActionLog::new();

        if self.collaborative {
            let mut seen = visible.cloned().unwrap_or_default();
            for (id, agent) in &self.team.members {
                let outcome = ActionOutcome::from(agent.act(data, Some(&seen)).await);
                seen.push(id.clone(), outcome.clone());
                member_log.push(id.clone(), outcome);
            }
        } else {
            let calls = self.team.members.iter().map(|(_, agent)| agent.act(data, None));
            let results = join_all(calls).await;
            for ((id, _), result) in self.team.members.iter().zip(results) {
                member_log.push(id.clone(), ActionOutcome::from(result));
            }
        }

        let mut proposals = Vec::new();
        let mut failed_members = Vec::new();
        for entry in &member_log {
            match &entry.outcome {
                ActionOutcome::Completed { action } => {
                    proposals.push(json!({ "member": entry.participant_id, "action": action }))
                }
                ActionOutcome::Failed { error } => {
                    failed_members.push(json!({ "member": entry.participant_id, "error": error }))
                }
            }
        }

        if proposals.is_empty() {
            return Err(CollaboratorError::failed(format!(
                "all {} members of team {} failed",
                self.team.len(),
                self.team.name
            )));
        }

        Ok(json!({
            "team_strategy": self.team.team_strategy,
            "proposals": proposals,
            "failed_members": failed_members,
        }))
    }
}

/// Static description of a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    pub duration: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub constraints: Value,
}

/// A scenario whose stage data comes from a [`DataSource`].
pub struct DataSourceScenario {
    spec: ScenarioSpec,
    source: Arc<dyn DataSource>,
}

impl DataSourceScenario {
    pub fn new(spec: ScenarioSpec, source: Arc<dyn DataSource>) -> Self {
        Self { spec, source }
    }

    pub fn spec(&self) -> &ScenarioSpec {
        &self.spec
    }
}

#[async_trait]
impl BusinessScenario for DataSourceScenario {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn duration(&self) -> &str {
        &self.spec.duration
    }

    fn objectives(&self) -> &[String] {
        &self.spec.objectives
    }

    async fn get_stage_data(&self, stage: usize) -> CollabResult<Value> {
        self.source.get_data(&DataQuery::for_stage(stage)).await
    }
}

/// A staged competition between teams.
pub struct TeamBattle {
    teams: Vec<AiTeam>,
    scenario: Arc<dyn BusinessScenario>,
    collaboration_enabled: bool,
    category: AgentCategory,
    round_timeout: Option<Duration>,
    criteria: Option<Vec<Criterion>>,
}

impl TeamBattle {
    pub fn new(
        teams: Vec<AiTeam>,
        scenario: Arc<dyn BusinessScenario>,
        collaboration_enabled: bool,
    ) -> Self {
        Self {
            teams,
            scenario,
            collaboration_enabled,
            category: AgentCategory::GeneralPurpose,
            round_timeout: None,
            criteria: None,
        }
    }

    pub fn with_category(mut self, category: AgentCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_round_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.round_timeout = timeout;
        self
    }

    pub fn with_criteria(mut self, criteria: Vec<Criterion>) -> Self {
        self.criteria = Some(criteria);
        self
    }

    fn validate(&self) -> Result<usize> {
        if self.teams.is_empty() {
            return Err(ArenaError::InvalidConfiguration(
                "team_battle requires at least 1 team".to_string(),
            ));
        }
        let mut names = BTreeSet::new();
        for team in &self.teams {
            if !names.insert(team.name.as_str()) {
                return Err(ArenaError::InvalidConfiguration(format!(
                    "duplicate team name: {}",
                    team.name
                )));
            }
            if team.is_empty() {
                return Err(ArenaError::InvalidConfiguration(format!(
                    "team {} has no members",
                    team.name
                )));
            }
        }
        if let Some(criteria) = &self.criteria {
            crate::domain::validate_criteria(criteria)?;
        }
        parse_duration(self.scenario.duration())
    }

    fn weight_table(&self) -> WeightTable {
        match &self.criteria {
            Some(criteria) => WeightTable::from_criteria(criteria),
            None => WeightTable::for_category(self.category),
        }
    }

    /// Run every stage of the scenario and score the teams.
    #[instrument(skip_all, fields(scenario = %self.scenario.name(), teams = self.teams.len()))]
    pub async fn execute(&self, evaluator: &dyn RoundEvaluator) -> Result<BattleReport> {
        let stages = self.validate()?;
        let battle_id = Uuid::new_v4();
        let span = obs::battle_span(&battle_id.to_string(), BattleMode::TeamBattle.as_str());
        self.run_stages(battle_id, stages, evaluator)
            .instrument(span)
            .await
    }

    async fn run_stages(
        &self,
        battle_id: Uuid,
        stages: usize,
        evaluator: &dyn RoundEvaluator,
    ) -> Result<BattleReport> {
        let id_str = battle_id.to_string();
        obs::emit_battle_started(&id_str, self.category.as_str(), self.teams.len(), stages);

        let entrants: Vec<Entrant> = self
            .teams
            .iter()
            .map(|team| {
                let participant = TeamParticipant::new(team.clone(), self.collaboration_enabled);
                Entrant::new(team.name.clone(), Arc::new(participant))
            })
            .collect();
        let visibility = if self.collaboration_enabled {
            Visibility::Shared
        } else {
            Visibility::Isolated
        };
        let executor = RoundExecutor::new(visibility).with_round_timeout(self.round_timeout);

        let started_at = Utc::now();
        let mut rounds = Vec::with_capacity(stages);
        for stage in 0..stages {
            let data = self.scenario.get_stage_data(stage).await;
            if let Err(err) = &data {
                warn!(stage = stage, error = %err, "stage data fetch failed");
            }
            let result = executor.run_round(stage, data, &entrants, evaluator).await?;
            obs::emit_round_completed(
                &id_str,
                stage,
                result.participant_actions.len(),
                result.participant_actions.failed_count(),
            );
            rounds.push(result);
        }

        let team_names: Vec<String> = self.teams.iter().map(|t| t.name.clone()).collect();
        let report = BattleReport {
            battle_id,
            mode: BattleMode::TeamBattle,
            category: self.category,
            scenario: Some(self.scenario.name().to_string()),
            started_at,
            finished_at: Utc::now(),
            final_scores: final_scores(&team_names, &rounds, &self.weight_table()),
            rounds,
        };
        obs::emit_battle_finished(&id_str, report.rounds.len(), report.summary().winner.as_deref());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("4").unwrap(), 4);
        assert_eq!(parse_duration("3 stages").unwrap(), 3);
        assert_eq!(parse_duration("1 day").unwrap(), 1);
        assert_eq!(parse_duration("2 weeks").unwrap(), 10);
        assert_eq!(parse_duration("1 Month").unwrap(), 20);
        assert_eq!(parse_duration(" 1 quarter ").unwrap(), 60);
    }

    #[test]
    fn test_parse_duration_rejects_garbage_and_zero() {
        for bad in ["", "soon", "0 weeks", "3 fortnights", "-2 days", "2.5 weeks"] {
            assert!(
                matches!(parse_duration(bad), Err(ArenaError::InvalidDuration(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    struct Member {
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl Agent for Member {
        async fn act(&self, _data: &Value, seen: Option<&ActionLog>) -> CollabResult<Value> {
            match self.reply {
                Some(reply) => Ok(json!({ "reply": reply, "seen": seen.map(ActionLog::len) })),
                None => Err(CollaboratorError::failed("member offline")),
            }
        }
    }

    fn team(replies: &[Option<&'static str>]) -> AiTeam {
        replies
            .iter()
            .enumerate()
            .fold(AiTeam::new("red", "divide and conquer"), |t, (i, reply)| {
                t.with_member(format!("m{i}"), Arc::new(Member { reply: *reply }))
            })
    }

    #[tokio::test]
    async fn test_collaborative_members_see_stage_log_then_teammates() {
        let mut stage_log = ActionLog::new();
        stage_log.push("blue", ActionOutcome::Completed { action: json!("x") });

        let participant = TeamParticipant::new(team(&[Some("a"), Some("b")]), true);
        let action = participant.act(&json!({}), Some(&stage_log)).await.unwrap();

        let proposals = action["proposals"].as_array().unwrap();
        assert_eq!(proposals[0]["action"]["seen"], 1);
        assert_eq!(proposals[1]["action"]["seen"], 2);
        assert_eq!(action["team_strategy"], "divide and conquer");
    }

    #[tokio::test]
    async fn test_independent_members_see_nothing() {
        let participant = TeamParticipant::new(team(&[Some("a"), Some("b")]), false);
        let action = participant.act(&json!({}), None).await.unwrap();
        for p in action["proposals"].as_array().unwrap() {
            assert!(p["action"]["seen"].is_null());
        }
    }

    #[tokio::test]
    async fn test_partial_member_failure_is_reported() {
        let participant = TeamParticipant::new(team(&[None, Some("b")]), true);
        let action = participant.act(&json!({}), None).await.unwrap();
        assert_eq!(action["proposals"].as_array().unwrap().len(), 1);
        assert_eq!(action["failed_members"][0]["member"], "m0");
    }

    #[tokio::test]
    async fn test_all_members_failing_fails_the_team() {
        let participant = TeamParticipant::new(team(&[None, None]), false);
        assert!(participant.act(&json!({}), None).await.is_err());
    }
}
