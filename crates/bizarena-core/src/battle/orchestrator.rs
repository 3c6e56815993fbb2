//! Head-to-head and tournament battles between individual agents.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{instrument, warn, Instrument};
use uuid::Uuid;

use crate::battle::report::{final_scores, BattleMode, BattleReport};
use crate::battle::round::{AgentParticipant, Entrant, RoundExecutor, Visibility};
use crate::collaborators::{Agent, DataQuery, DataSource, Participant, RoundEvaluator};
use crate::domain::{AgentCategory, ArenaError, Criterion, Result};
use crate::obs;
use crate::scoring::WeightTable;

/// Battle settings.
#[derive(Debug, Clone)]
pub struct BattleConfig {
    pub mode: BattleMode,
    pub max_rounds: usize,
    /// Competitive environments share earlier actions within a round.
    pub competitive: bool,
    pub round_timeout: Option<Duration>,
    /// Parsed criteria used for final scoring; the category table otherwise.
    pub criteria: Option<Vec<Criterion>>,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            mode: BattleMode::Tournament,
            max_rounds: 10,
            competitive: true,
            round_timeout: None,
            criteria: None,
        }
    }
}

impl BattleConfig {
    pub fn new(mode: BattleMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_competitive(mut self, competitive: bool) -> Self {
        self.competitive = competitive;
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
}

/// A multi-round competition between registered agents.
pub struct AgentBattle {
    category: AgentCategory,
    config: BattleConfig,
    entrants: Vec<Entrant>,
}

impl AgentBattle {
    pub fn new(category: AgentCategory, config: BattleConfig) -> Self {
        Self {
            category,
            config,
            entrants: Vec::new(),
        }
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Register an agent. Re-registering an id replaces the agent and keeps
    /// its turn slot.
    pub fn register_agent(&mut self, id: impl Into<String>, agent: Arc<dyn Agent>) {
        self.register_participant(id, Arc::new(AgentParticipant::new(agent)));
    }

    pub fn register_participant(&mut self, id: impl Into<String>, participant: Arc<dyn Participant>) {
        let id = id.into();
        match self.entrants.iter_mut().find(|e| e.id == id) {
            Some(existing) => existing.participant = participant,
            None => self.entrants.push(Entrant::new(id, participant)),
        }
    }

    /// Participant ids in turn order.
    pub fn participants(&self) -> Vec<String> {
        self.entrants.iter().map(|e| e.id.clone()).collect()
    }

    pub fn weight_table(&self) -> WeightTable {
        match &self.config.criteria {
            Some(criteria) => WeightTable::from_criteria(criteria),
            None => WeightTable::for_category(self.category),
        }
    }

    fn validate(&self) -> Result<()> {
        let count = self.entrants.len();
        match self.config.mode {
            BattleMode::HeadToHead if count != 2 => {
                return Err(ArenaError::InvalidConfiguration(format!(
                    "head_to_head requires exactly 2 participants, got {count}"
                )))
            }
            BattleMode::Tournament if count < 2 => {
                return Err(ArenaError::InvalidConfiguration(format!(
                    "tournament requires at least 2 participants, got {count}"
                )))
            }
            BattleMode::TeamBattle => {
                return Err(ArenaError::InvalidConfiguration(
                    "team_battle runs through TeamBattle, not AgentBattle".to_string(),
                ))
            }
            _ => {}
        }
        if self.config.max_rounds == 0 {
            return Err(ArenaError::InvalidConfiguration(
                "max_rounds must be at least 1".to_string(),
            ));
        }
        if let Some(criteria) = &self.config.criteria {
            crate::domain::validate_criteria(criteria)?;
        }
        Ok(())
    }

    /// Run exactly `max_rounds` rounds and score them.
    #[instrument(skip_all, fields(category = %self.category, mode = %self.config.mode))]
    pub async fn run_competition(
        &self,
        data_source: &dyn DataSource,
        evaluator: &dyn RoundEvaluator,
    ) -> Result<BattleReport> {
        self.validate()?;

        let battle_id = Uuid::new_v4();
        let span = obs::battle_span(&battle_id.to_string(), self.config.mode.as_str());
        self.run_rounds(battle_id, data_source, evaluator)
            .instrument(span)
            .await
    }

    async fn run_rounds(
        &self,
        battle_id: Uuid,
        data_source: &dyn DataSource,
        evaluator: &dyn RoundEvaluator,
    ) -> Result<BattleReport> {
        let id_str = battle_id.to_string();
        obs::emit_battle_started(
            &id_str,
            self.category.as_str(),
            self.entrants.len(),
            self.config.max_rounds,
        );

        let started_at = Utc::now();
        let visibility = if self.config.competitive {
            Visibility::Shared
        } else {
            Visibility::Isolated
        };
        let executor = RoundExecutor::new(visibility).with_round_timeout(self.config.round_timeout);

        let mut rounds = Vec::with_capacity(self.config.max_rounds);
        for index in 0..self.config.max_rounds {
            let query = DataQuery::for_round(index, self.config.competitive);
            let data = data_source.get_data(&query).await;
            if let Err(err) = &data {
                warn!(round = index, error = %err, "round data fetch failed");
            }
            let round = executor
                .run_round(index, data, &self.entrants, evaluator)
                .await?;
            obs::emit_round_completed(
                &id_str,
                index,
                round.participant_actions.len(),
                round.participant_actions.failed_count(),
            );
            rounds.push(round);
        }

        let report = BattleReport {
            battle_id,
            mode: self.config.mode,
            category: self.category,
            scenario: None,
            started_at,
            finished_at: Utc::now(),
            final_scores: final_scores(&self.participants(), &rounds, &self.weight_table()),
            rounds,
        };
        obs::emit_battle_finished(&id_str, report.rounds.len(), report.summary().winner.as_deref());
        Ok(report)
    }
}
