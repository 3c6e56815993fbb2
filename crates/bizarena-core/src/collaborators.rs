//! Capability traits for the external collaborators the engine drives.
//!
//! The engine never talks to an LLM, a CRM or a data warehouse directly. It
//! consumes these traits; production wiring and test fakes implement them.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use bizarena_state::Evaluation;

use crate::domain::{CollabResult, CollaboratorError, Criterion};

/// Per-round metrics: participant id → metric name → raw score.
pub type RoundMetrics = BTreeMap<String, Evaluation>;

/// A query against a [`DataSource`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<usize>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, Value>,
    #[serde(default)]
    pub competitive: bool,
}

impl DataQuery {
    pub fn for_round(round: usize, competitive: bool) -> Self {
        Self {
            round: Some(round),
            competitive,
            ..Self::default()
        }
    }

    pub fn for_stage(stage: usize) -> Self {
        Self {
            stage: Some(stage),
            ..Self::default()
        }
    }

    pub fn of_type(data_type: impl Into<String>) -> Self {
        Self {
            data_type: Some(data_type.into()),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.filters.insert(key.into(), value);
        self
    }
}

/// What a participant produced in a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    Completed { action: Value },
    /// Sentinel recorded when the participant call failed or timed out.
    Failed { error: String },
}

impl ActionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ActionOutcome::Failed { .. })
    }

    pub fn action(&self) -> Option<&Value> {
        match self {
            ActionOutcome::Completed { action } => Some(action),
            ActionOutcome::Failed { .. } => None,
        }
    }
}

impl From<CollabResult<Value>> for ActionOutcome {
    fn from(result: CollabResult<Value>) -> Self {
        match result {
            Ok(action) => ActionOutcome::Completed { action },
            Err(err) => ActionOutcome::Failed {
                error: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub participant_id: String,
    pub outcome: ActionOutcome,
}

/// Actions recorded in one round, in turn order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionLog {
    entries: Vec<ActionEntry>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, participant_id: impl Into<String>, outcome: ActionOutcome) {
        self.entries.push(ActionEntry {
            participant_id: participant_id.into(),
            outcome,
        });
    }

    pub fn entries(&self) -> &[ActionEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Outcome recorded for `participant_id`, if it has acted.
    pub fn get(&self, participant_id: &str) -> Option<&ActionOutcome> {
        self.entries
            .iter()
            .find(|e| e.participant_id == participant_id)
            .map(|e| &e.outcome)
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failed()).count()
    }
}

impl<'a> IntoIterator for &'a ActionLog {
    type Item = &'a ActionEntry;
    type IntoIter = std::slice::Iter<'a, ActionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Provider of round, stage and task data.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Prepare the source before a benchmark run.
    async fn initialize(&self) -> CollabResult<()> {
        Ok(())
    }

    async fn get_data(&self, query: &DataQuery) -> CollabResult<Value>;
}

/// An agent under evaluation.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Produce an action for a battle round. `opponent_actions` is present
    /// only in a competitive environment.
    async fn act(&self, data: &Value, opponent_actions: Option<&ActionLog>) -> CollabResult<Value>;

    /// Analyse benchmark task data under `prompt`.
    async fn analyze(&self, _data: &Value, _prompt: &str) -> CollabResult<Value> {
        Err(CollaboratorError::failed("agent does not support analysis"))
    }
}

/// Anything that takes a turn in a round: a single agent or a team.
#[async_trait]
pub trait Participant: Send + Sync {
    async fn act(&self, data: &Value, visible: Option<&ActionLog>) -> CollabResult<Value>;
}

/// The LLM judge: prompt in, criterion → raw score out.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn evaluate(&self, prompt: &str) -> CollabResult<BTreeMap<String, f64>>;
}

/// Turns natural-language criteria into structured [`Criterion`] values.
#[async_trait]
pub trait CriteriaParser: Send + Sync {
    async fn parse(&self, criteria_text: &str) -> CollabResult<Vec<Criterion>>;

    async fn generate_judge_prompt(&self, criteria: &[Criterion]) -> CollabResult<String> {
        Ok(render_judge_prompt(criteria))
    }
}

/// Default judge prompt: a header followed by one block per criterion.
pub fn render_judge_prompt(criteria: &[Criterion]) -> String {
    let mut prompt = String::from("Evaluate the following based on these criteria:\n");
    for c in criteria {
        let _ = write!(
            prompt,
            "\n{} (weight: {})\nDescription: {}\nScoring: {}\n",
            c.name, c.weight, c.description, c.scoring_guide
        );
    }
    prompt
}

/// A staged business scenario for team battles.
#[async_trait]
pub trait BusinessScenario: Send + Sync {
    fn name(&self) -> &str;

    /// Free-form duration, e.g. `"3 weeks"`.
    fn duration(&self) -> &str;

    fn objectives(&self) -> &[String];

    async fn get_stage_data(&self, stage: usize) -> CollabResult<Value>;
}

/// Scores the actions of a completed round.
#[async_trait]
pub trait RoundEvaluator: Send + Sync {
    async fn evaluate_round(&self, index: usize, actions: &ActionLog) -> CollabResult<RoundMetrics>;
}
