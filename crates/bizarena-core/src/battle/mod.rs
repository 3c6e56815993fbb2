//! Multi-round battles: the round executor, the agent battle orchestrator
//! and staged team battles.

pub mod orchestrator;
pub mod report;
pub mod round;
pub mod teams;

pub use orchestrator::{AgentBattle, BattleConfig};
pub use report::{final_scores, BattleMode, BattleReport, BattleSummary, RoundResult, Standing};
pub use round::{AgentParticipant, Entrant, RoundExecutor, Visibility};
pub use teams::{parse_duration, AiTeam, DataSourceScenario, ScenarioSpec, TeamBattle, TeamParticipant};
