use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use bizarena_core::{
    ActionLog, Agent, AgentCategory, AiTeam, ArenaError, BattleMode, CollabResult,
    DataSourceScenario, RoundEvaluator, RoundMetrics, ScenarioSpec, StaticDataSource, TeamBattle,
};

/// Member that records which participant ids it could see.
struct Member {
    seen: Mutex<Vec<Option<Vec<String>>>>,
}

impl Member {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Agent for Member {
    async fn act(&self, data: &Value, visible: Option<&ActionLog>) -> CollabResult<Value> {
        self.seen.lock().unwrap().push(
            visible.map(|log| log.iter().map(|e| e.participant_id.clone()).collect()),
        );
        Ok(json!({ "stage": data["stage"] }))
    }
}

/// Gives every team that acted a fixed `task_completion` score per stage.
struct TeamScores;

#[async_trait]
impl RoundEvaluator for TeamScores {
    async fn evaluate_round(&self, index: usize, actions: &ActionLog) -> CollabResult<RoundMetrics> {
        Ok(actions
            .iter()
            .filter(|e| !e.outcome.is_failed())
            .map(|e| {
                let score = if e.participant_id == "red" { 8.0 } else { 4.0 + index as f64 };
                (
                    e.participant_id.clone(),
                    BTreeMap::from([("task_completion".to_string(), score)]),
                )
            })
            .collect())
    }
}

fn scenario(duration: &str) -> Arc<DataSourceScenario> {
    Arc::new(DataSourceScenario::new(
        ScenarioSpec {
            name: "q3-pipeline-push".to_string(),
            duration: duration.to_string(),
            objectives: vec!["grow qualified pipeline".to_string()],
            constraints: json!({"budget": 5000}),
        },
        Arc::new(StaticDataSource::new()),
    ))
}

fn teams() -> (Vec<AiTeam>, [Arc<Member>; 4]) {
    let members = [Member::new(), Member::new(), Member::new(), Member::new()];
    let red = AiTeam::new("red", "outbound blitz")
        .with_member("r1", members[0].clone())
        .with_member("r2", members[1].clone());
    let blue = AiTeam::new("blue", "account based")
        .with_member("b1", members[2].clone())
        .with_member("b2", members[3].clone());
    (vec![red, blue], members)
}

#[tokio::test]
async fn duration_in_weeks_maps_to_business_day_stages() {
    let (teams, _) = teams();
    let report = TeamBattle::new(teams, scenario("1 week"), true)
        .execute(&TeamScores)
        .await
        .expect("team battle");

    assert_eq!(report.rounds.len(), 5);
    let indices: Vec<usize> = report.rounds.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    assert_eq!(report.mode, BattleMode::TeamBattle);
    assert_eq!(report.scenario.as_deref(), Some("q3-pipeline-push"));
}

#[tokio::test]
async fn collaborative_members_see_other_teams_then_teammates() {
    let (teams, [r1, r2, b1, b2]) = teams();
    TeamBattle::new(teams, scenario("1 stage"), true)
        .execute(&TeamScores)
        .await
        .expect("team battle");

    assert_eq!(*r1.seen.lock().unwrap(), vec![Some(vec![])]);
    assert_eq!(*r2.seen.lock().unwrap(), vec![Some(vec!["r1".to_string()])]);
    assert_eq!(*b1.seen.lock().unwrap(), vec![Some(vec!["red".to_string()])]);
    assert_eq!(
        *b2.seen.lock().unwrap(),
        vec![Some(vec!["red".to_string(), "b1".to_string()])]
    );
}

#[tokio::test]
async fn independent_teams_see_nothing() {
    let (teams, members) = teams();
    TeamBattle::new(teams, scenario("2"), false)
        .execute(&TeamScores)
        .await
        .expect("team battle");

    for member in &members {
        assert_eq!(*member.seen.lock().unwrap(), vec![None, None]);
    }
}

#[tokio::test]
async fn team_actions_carry_strategy_and_proposals() {
    let (teams, _) = teams();
    let report = TeamBattle::new(teams, scenario("1"), true)
        .execute(&TeamScores)
        .await
        .expect("team battle");

    let red = report.rounds[0]
        .participant_actions
        .get("red")
        .and_then(|o| o.action())
        .cloned()
        .expect("red acted");
    assert_eq!(red["team_strategy"], "outbound blitz");
    assert_eq!(red["proposals"].as_array().map(Vec::len), Some(2));
    assert_eq!(red["proposals"][0]["member"], "r1");
    assert_eq!(red["proposals"][0]["action"]["stage"], 0);
    assert_eq!(red["failed_members"], json!([]));
}

#[tokio::test]
async fn team_final_scores_average_over_stages() {
    let (teams, _) = teams();
    let report = TeamBattle::new(teams, scenario("3 days"), true)
        .with_category(AgentCategory::GeneralPurpose)
        .execute(&TeamScores)
        .await
        .expect("team battle");

    assert_eq!(report.final_scores["red"], 8.0);
    // blue scores 4, 5, 6
    assert_eq!(report.final_scores["blue"], 5.0);
    assert_eq!(report.summary().winner.as_deref(), Some("red"));
}

#[tokio::test]
async fn unparseable_or_zero_duration_is_fatal() {
    for duration in ["whenever", "0 weeks"] {
        let (teams, members) = teams();
        let err = TeamBattle::new(teams, scenario(duration), true)
            .execute(&TeamScores)
            .await
            .expect_err("invalid duration");
        assert!(matches!(err, ArenaError::InvalidDuration(_)));
        assert!(members[0].seen.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn battle_without_teams_is_rejected() {
    let err = TeamBattle::new(Vec::new(), scenario("1"), true)
        .execute(&TeamScores)
        .await
        .expect_err("no teams");
    assert!(matches!(err, ArenaError::InvalidConfiguration(_)));
}
