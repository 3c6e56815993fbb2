//! bizarena core library
//!
//! Competitive evaluation of business-task agents: battles, weighted scoring,
//! submission registration, leaderboard ranking and sampled verification.

pub mod battle;
pub mod benchmark;
pub mod collaborators;
pub mod config;
pub mod domain;
pub mod leaderboard;
pub mod obs;
pub mod registry;
pub mod reporting;
pub mod scoring;
pub mod sources;
pub mod telemetry;
pub mod verification;

pub use battle::{
    parse_duration, AgentBattle, AgentParticipant, AiTeam, BattleConfig, BattleMode,
    BattleReport, BattleSummary, DataSourceScenario, Entrant, RoundExecutor, RoundResult,
    ScenarioSpec, TeamBattle, TeamParticipant, Visibility,
};

pub use benchmark::{BenchmarkRunner, BenchmarkTask, CriteriaTask, TaskContext};

pub use collaborators::{
    render_judge_prompt, ActionEntry, ActionLog, ActionOutcome, Agent, BusinessScenario,
    CriteriaParser, DataQuery, DataSource, Judge, Participant, RoundEvaluator, RoundMetrics,
};

pub use config::ArenaConfig;

pub use domain::{
    AgentCategory, ArenaError, CollabResult, CollaboratorError, Criterion, Result, ScoringError,
};

pub use leaderboard::{category_score, Leaderboard, RankingEntry, SubmissionDetails};
pub use registry::{sanitize_agent_name, SubmissionRegistry};
pub use scoring::{weighted_score, WeightTable};
pub use sources::StaticDataSource;
pub use verification::{score_diff, VerificationRunner, DEFAULT_TOLERANCE};

pub use bizarena_state::{
    BenchmarkRun, FsSubmissionStore, Submission, SubmissionStore, TaskOutcome, VerificationRecord,
};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
