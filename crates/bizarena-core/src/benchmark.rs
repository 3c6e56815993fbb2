//! Benchmark tasks and the runner that executes them against an agent.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

use bizarena_state::{BenchmarkRun, Evaluation, TaskOutcome};

use crate::collaborators::{Agent, CriteriaParser, DataQuery, DataSource, Judge};
use crate::domain::{validate_criteria, AgentCategory, CollabResult, CollaboratorError, Criterion, Result};

/// What a task may read while it runs.
#[derive(Clone, Copy)]
pub struct TaskContext<'a> {
    pub data_sources: &'a [Arc<dyn DataSource>],
}

/// One unit of benchmark work: run the agent, then have the judge score it.
#[async_trait]
pub trait BenchmarkTask: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> AgentCategory;

    /// Prepare the task's criteria. Called once before any evaluation.
    async fn initialize(&self, _parser: &dyn CriteriaParser) -> CollabResult<()> {
        Ok(())
    }

    /// Whether `initialize` has completed, so `evaluate` can score results.
    async fn is_initialized(&self) -> bool {
        true
    }

    async fn run(&self, agent: &dyn Agent, ctx: TaskContext<'_>) -> CollabResult<Value>;

    /// Score `result`; returns criterion → weighted score.
    async fn evaluate(&self, result: &Value, judge: &dyn Judge) -> CollabResult<Evaluation>;
}

#[derive(Debug, Clone)]
struct PreparedCriteria {
    criteria: Vec<Criterion>,
    judge_prompt: String,
}

/// A task driven by natural-language criteria.
///
/// `run` gathers every record of `data_type` from the available sources
/// (sources that fail are skipped) and asks the agent to analyse them.
/// `evaluate` weights each judge score by its criterion weight; criteria the
/// judge did not score are left out.
pub struct CriteriaTask {
    name: String,
    description: String,
    category: AgentCategory,
    data_type: String,
    criteria_text: String,
    prepared: RwLock<Option<PreparedCriteria>>,
}

impl CriteriaTask {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: AgentCategory,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            data_type: data_type.into(),
            criteria_text: category.default_criteria().to_string(),
            prepared: RwLock::new(None),
        }
    }

    /// Extend the category defaults with company-specific criteria.
    pub fn with_custom_criteria(mut self, custom: &str) -> Self {
        self.criteria_text = self.category.criteria_text(Some(custom));
        self
    }

    pub fn criteria_text(&self) -> &str {
        &self.criteria_text
    }

    /// Parsed criteria, once initialised.
    pub async fn criteria(&self) -> Option<Vec<Criterion>> {
        self.prepared.read().await.as_ref().map(|p| p.criteria.clone())
    }
}

#[async_trait]
impl BenchmarkTask for CriteriaTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> AgentCategory {
        self.category
    }

    async fn initialize(&self, parser: &dyn CriteriaParser) -> CollabResult<()> {
        let criteria = parser.parse(&self.criteria_text).await?;
        validate_criteria(&criteria).map_err(|e| CollaboratorError::failed(e))?;
        let judge_prompt = parser.generate_judge_prompt(&criteria).await?;
        *self.prepared.write().await = Some(PreparedCriteria {
            criteria,
            judge_prompt,
        });
        Ok(())
    }

    async fn is_initialized(&self) -> bool {
        self.prepared.read().await.is_some()
    }

    async fn run(&self, agent: &dyn Agent, ctx: TaskContext<'_>) -> CollabResult<Value> {
        let query = DataQuery::of_type(self.data_type.clone());
        let mut records = Vec::new();
        for source in ctx.data_sources {
            match source.get_data(&query).await {
                Ok(Value::Array(items)) => records.extend(items),
                Ok(Value::Null) => {}
                Ok(other) => records.push(other),
                Err(err) => debug!(task = %self.name, error = %err, "data source skipped"),
            }
        }
        let data_points = records.len();
        let analysis = agent
            .analyze(&Value::Array(records), &self.description)
            .await?;
        Ok(json!({ "analysis": analysis, "data_points": data_points }))
    }

    async fn evaluate(&self, result: &Value, judge: &dyn Judge) -> CollabResult<Evaluation> {
        let guard = self.prepared.read().await;
        let prepared = guard.as_ref().ok_or_else(|| {
            CollaboratorError::failed(format!("task {} evaluated before initialize", self.name))
        })?;

        let prompt = format!("{}\n\nResults to evaluate:\n{}", prepared.judge_prompt, result);
        let raw = judge.evaluate(&prompt).await?;

        Ok(prepared
            .criteria
            .iter()
            .filter_map(|c| raw.get(&c.name).map(|score| (c.name.clone(), score * c.weight)))
            .collect())
    }
}

/// Runs benchmark tasks against an agent.
pub struct BenchmarkRunner {
    data_sources: Vec<Arc<dyn DataSource>>,
    tasks: Vec<Arc<dyn BenchmarkTask>>,
    judge: Arc<dyn Judge>,
}

impl BenchmarkRunner {
    pub fn new(
        data_sources: Vec<Arc<dyn DataSource>>,
        tasks: Vec<Arc<dyn BenchmarkTask>>,
        judge: Arc<dyn Judge>,
    ) -> Self {
        Self {
            data_sources,
            tasks,
            judge,
        }
    }

    /// Registered tasks in declared order.
    pub fn tasks(&self) -> &[Arc<dyn BenchmarkTask>] {
        &self.tasks
    }

    /// Parse every task's criteria. Any failure is fatal.
    pub async fn initialize_tasks(&self, parser: &dyn CriteriaParser) -> Result<()> {
        for task in &self.tasks {
            task.initialize(parser).await?;
        }
        Ok(())
    }

    /// Initialise every data source. Any failure is fatal.
    pub async fn initialize_sources(&self) -> Result<()> {
        for source in &self.data_sources {
            source.initialize().await?;
        }
        Ok(())
    }

    /// Run the full suite in declared order.
    #[instrument(skip(self, agent), fields(tasks = self.tasks.len()))]
    pub async fn run_benchmark(&self, agent_id: &str, agent: &dyn Agent) -> Result<BenchmarkRun> {
        self.initialize_sources().await?;
        let tasks = self.run_tasks(agent, &self.tasks).await;
        Ok(BenchmarkRun {
            agent_id: agent_id.to_string(),
            timestamp: Utc::now(),
            tasks,
        })
    }

    /// Run `tasks` in order. A failing task becomes an outcome with `error`
    /// and never affects its siblings.
    pub async fn run_tasks(
        &self,
        agent: &dyn Agent,
        tasks: &[Arc<dyn BenchmarkTask>],
    ) -> Vec<TaskOutcome> {
        let ctx = TaskContext {
            data_sources: &self.data_sources,
        };
        let mut outcomes = Vec::with_capacity(tasks.len());
        for task in tasks {
            let outcome = match self.run_one(task.as_ref(), agent, ctx).await {
                Ok((result, evaluation)) => TaskOutcome::succeeded(task.name(), result, evaluation),
                Err(err) => {
                    error!(task = %task.name(), error = %err, "benchmark task failed");
                    TaskOutcome::failed(task.name(), err.to_string())
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn run_one(
        &self,
        task: &dyn BenchmarkTask,
        agent: &dyn Agent,
        ctx: TaskContext<'_>,
    ) -> CollabResult<(Value, Evaluation)> {
        let result = task.run(agent, ctx).await?;
        let evaluation = task.evaluate(&result, self.judge.as_ref()).await?;
        Ok((result, evaluation))
    }
}
