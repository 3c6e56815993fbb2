//! Executes a single round (or stage) across a fixed set of entrants.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::battle::report::RoundResult;
use crate::collaborators::{ActionLog, ActionOutcome, Agent, Participant, RoundEvaluator};
use crate::domain::{ArenaError, CollabResult, CollaboratorError, Result};
use crate::obs;

/// Whether later participants in a round see earlier participants' actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Participant N sees the actions of 1..N-1. Calls run sequentially.
    Shared,
    /// Nobody sees anything. Calls run concurrently.
    Isolated,
}

/// A registered participant with its id. Registration order is turn order.
#[derive(Clone)]
pub struct Entrant {
    pub id: String,
    pub participant: Arc<dyn Participant>,
}

impl Entrant {
    pub fn new(id: impl Into<String>, participant: Arc<dyn Participant>) -> Self {
        Self {
            id: id.into(),
            participant,
        }
    }
}

impl std::fmt::Debug for Entrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entrant").field("id", &self.id).finish()
    }
}

/// Adapts an [`Agent`] to the [`Participant`] seam.
pub struct AgentParticipant {
    agent: Arc<dyn Agent>,
}

impl AgentParticipant {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Participant for AgentParticipant {
    async fn act(&self, data: &Value, visible: Option<&ActionLog>) -> CollabResult<Value> {
        self.agent.act(data, visible).await
    }
}

/// Await `fut`, failing with `DeadlineExceeded` once `deadline` passes.
pub(crate) async fn call_before<F>(fut: F, deadline: Option<Instant>) -> CollabResult<Value>
where
    F: Future<Output = CollabResult<Value>>,
{
    match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::DeadlineExceeded),
        },
        None => fut.await,
    }
}

#[derive(Debug, Clone)]
pub struct RoundExecutor {
    visibility: Visibility,
    round_timeout: Option<Duration>,
}

impl RoundExecutor {
    pub fn new(visibility: Visibility) -> Self {
        Self {
            visibility,
            round_timeout: None,
        }
    }

    /// Every participant call must finish within `timeout` of the round start.
    pub fn with_round_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.round_timeout = timeout;
        self
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Run one round.
    ///
    /// `data` is the result of the round's data fetch; when it failed every
    /// entrant is recorded as failed with the fetch error. A failing entrant
    /// never aborts the round. Evaluator failure is fatal.
    #[instrument(skip(self, data, entrants, evaluator), fields(round = index, entrants = entrants.len()))]
    pub async fn run_round(
        &self,
        index: usize,
        data: CollabResult<Value>,
        entrants: &[Entrant],
        evaluator: &dyn RoundEvaluator,
    ) -> Result<RoundResult> {
        let mut log = ActionLog::new();

        match data {
            Err(err) => {
                let error = format!("data fetch failed: {err}");
                for entrant in entrants {
                    obs::emit_action_failed(index, &entrant.id, &error);
                    log.push(entrant.id.clone(), ActionOutcome::Failed { error: error.clone() });
                }
            }
            Ok(data) => {
                let deadline = self.round_timeout.map(|t| Instant::now() + t);
                match self.visibility {
                    Visibility::Shared => {
                        for entrant in entrants {
                            let result =
                                call_before(entrant.participant.act(&data, Some(&log)), deadline)
                                    .await;
                            record(&mut log, index, &entrant.id, result);
                        }
                    }
                    Visibility::Isolated => {
                        let calls = entrants
                            .iter()
                            .map(|e| call_before(e.participant.act(&data, None), deadline));
                        let results = join_all(calls).await;
                        for (entrant, result) in entrants.iter().zip(results) {
                            record(&mut log, index, &entrant.id, result);
                        }
                    }
                }
            }
        }

        debug!(round = index, failed = log.failed_count(), "round actions collected");

        let metrics = evaluator
            .evaluate_round(index, &log)
            .await
            .map_err(|e| ArenaError::RoundEvaluation {
                index,
                reason: e.to_string(),
            })?;

        Ok(RoundResult {
            index,
            participant_actions: log,
            metrics,
        })
    }
}

fn record(log: &mut ActionLog, round: usize, participant_id: &str, result: CollabResult<Value>) {
    if let Err(err) = &result {
        obs::emit_action_failed(round, participant_id, err);
    }
    log.push(participant_id, ActionOutcome::from(result));
}
