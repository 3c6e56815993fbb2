//! bizarena - competitive evaluation of business-task agents
//!
//! ## Commands
//!
//! - `rankings`: Show the leaderboard, optionally for one category
//! - `show`: Print a submission together with its verification record
//! - `register`: Import a benchmark run as a new submission
//! - `criteria`: Print the default criteria and weight table of a category
//! - `summary`: Render a stored battle report as markdown

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use bizarena_core::reporting::{render_battle_summary_md, render_leaderboard_md};
use bizarena_core::{
    AgentCategory, ArenaConfig, BattleReport, BenchmarkRun, FsSubmissionStore, Leaderboard,
    RankingEntry, SubmissionRegistry, SubmissionStore, WeightTable,
};

#[derive(Parser)]
#[command(name = "bizarena")]
#[command(version = bizarena_core::VERSION)]
#[command(about = "Battles, leaderboards and verification for business-task agents", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Root directory of the submission store
    #[arg(long, global = true, env = "BIZARENA_SUBMISSIONS_DIR")]
    submissions_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the leaderboard
    Rankings {
        /// Only rank submissions of this category
        #[arg(short, long)]
        category: Option<String>,

        /// Show only the first N entries
        #[arg(short, long)]
        top: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Print a submission and its verification record as JSON
    Show {
        /// Submission id, e.g. 20260314_acme-sdr
        submission_id: String,
    },

    /// Register a benchmark run as a new submission
    Register {
        /// Agent name (sanitized into the submission id)
        #[arg(short, long)]
        agent: String,

        /// Agent category, e.g. sales_development
        #[arg(short, long)]
        category: String,

        /// Benchmark run JSON file
        #[arg(short, long)]
        results: PathBuf,

        /// Extra metadata JSON file, stored verbatim
        #[arg(short, long)]
        metadata: Option<PathBuf>,
    },

    /// Print the default criteria and leaderboard weights of a category
    Criteria {
        /// Agent category, e.g. marketing
        category: String,
    },

    /// Render a battle report JSON file as a markdown summary
    Summary {
        /// Battle report JSON file
        report: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Markdown,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    bizarena_core::telemetry::init_tracing(cli.json, level);

    let mut config = ArenaConfig::from_env().context("Invalid bizarena configuration")?;
    if let Some(dir) = cli.submissions_dir {
        config = config.with_submissions_dir(dir);
    }

    match cli.command {
        Commands::Rankings {
            category,
            top,
            format,
        } => {
            let store = open_store(&config)?;
            let out = cmd_rankings(store, category.as_deref(), top, format).await?;
            print!("{out}");
            Ok(())
        }
        Commands::Show { submission_id } => {
            let out = cmd_show(open_store(&config)?, &submission_id).await?;
            println!("{out}");
            Ok(())
        }
        Commands::Register {
            agent,
            category,
            results,
            metadata,
        } => {
            let id = cmd_register(
                open_store(&config)?,
                &agent,
                &category,
                &results,
                metadata.as_deref(),
            )
            .await?;
            println!("Registered submission: {id}");
            Ok(())
        }
        Commands::Criteria { category } => {
            print!("{}", cmd_criteria(&category)?);
            Ok(())
        }
        Commands::Summary { report } => {
            print!("{}", cmd_summary(&report)?);
            Ok(())
        }
    }
}

fn open_store(config: &ArenaConfig) -> Result<Arc<dyn SubmissionStore>> {
    let store = FsSubmissionStore::new(&config.submissions_dir).with_context(|| {
        format!(
            "Failed to open submission store at {:?}",
            config.submissions_dir
        )
    })?;
    Ok(Arc::new(store))
}

fn parse_category(label: &str) -> Result<AgentCategory> {
    label.parse::<AgentCategory>().with_context(|| {
        let known: Vec<&str> = AgentCategory::ALL.iter().map(|c| c.as_str()).collect();
        format!("Unknown category {label:?}, expected one of: {}", known.join(", "))
    })
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?} as JSON", path))
}

/// Rank submissions and render them in the requested format.
async fn cmd_rankings(
    store: Arc<dyn SubmissionStore>,
    category: Option<&str>,
    top: Option<usize>,
    format: OutputFormat,
) -> Result<String> {
    let category = category.map(parse_category).transpose()?;
    let leaderboard = Leaderboard::new(store);
    let entries = match top {
        Some(n) => leaderboard.top(n, category).await?,
        None => leaderboard.rankings(category).await?,
    };

    Ok(match format {
        OutputFormat::Table => render_rankings_table(&entries),
        OutputFormat::Markdown => render_leaderboard_md(&entries),
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(&entries)?;
            out.push('\n');
            out
        }
    })
}

fn render_rankings_table(entries: &[RankingEntry]) -> String {
    if entries.is_empty() {
        return "No submissions.\n".to_string();
    }
    let mut out = format!(
        "{:>4}  {:<32} {:<20} {:<18} {:>7}  {:<8}\n",
        "RANK", "SUBMISSION", "AGENT", "CATEGORY", "SCORE", "VERIFIED"
    );
    for (i, e) in entries.iter().enumerate() {
        out.push_str(&format!(
            "{:>4}  {:<32} {:<20} {:<18} {:>7.2}  {:<8}\n",
            i + 1,
            e.submission_id,
            e.agent_name,
            e.category,
            e.score,
            if e.verified { "✓" } else { "-" }
        ));
    }
    out
}

async fn cmd_show(store: Arc<dyn SubmissionStore>, submission_id: &str) -> Result<String> {
    let details = Leaderboard::new(store)
        .submission_details(submission_id)
        .await
        .with_context(|| format!("Failed to load submission {submission_id}"))?;
    Ok(serde_json::to_string_pretty(&details)?)
}

/// Import a benchmark run file and register it under a fresh submission id.
async fn cmd_register(
    store: Arc<dyn SubmissionStore>,
    agent: &str,
    category: &str,
    results_path: &Path,
    metadata_path: Option<&Path>,
) -> Result<String> {
    let category = parse_category(category)?;
    let results: BenchmarkRun = serde_json::from_value(read_json(results_path)?)
        .with_context(|| format!("{:?} is not a benchmark run", results_path))?;
    let metadata = match metadata_path {
        Some(path) => read_json(path)?,
        None => serde_json::json!({}),
    };

    info!(agent, category = %category, tasks = results.tasks.len(), "registering submission");
    let id = SubmissionRegistry::new(store)
        .register_submission(agent, category, metadata, results)
        .await
        .context("Failed to register submission")?;
    Ok(id)
}

fn cmd_criteria(category: &str) -> Result<String> {
    let category = parse_category(category)?;
    let mut out = format!("Category: {category}\n\n{}\n\n", category.default_criteria());
    out.push_str("Leaderboard weights:\n");
    let table = WeightTable::for_category(category);
    for (metric, _) in category.leaderboard_weights() {
        let weight = table.weight_of(metric).unwrap_or(1.0);
        out.push_str(&format!("  {metric:<24} {weight:.1}\n"));
    }
    Ok(out)
}

fn cmd_summary(report_path: &Path) -> Result<String> {
    let report: BattleReport = serde_json::from_value(read_json(report_path)?)
        .with_context(|| format!("{:?} is not a battle report", report_path))?;
    Ok(render_battle_summary_md(&report.summary()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizarena_core::reporting::write_battle_report_json;
    use bizarena_core::{AgentBattle, BattleConfig, BattleMode, StaticDataSource, TaskOutcome};
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, Arc<dyn SubmissionStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSubmissionStore::new(dir.path().join("submissions")).unwrap();
        (dir, Arc::new(store))
    }

    fn write_run(dir: &Path, name: &str, score: f64) -> PathBuf {
        let run = BenchmarkRun {
            agent_id: name.to_string(),
            timestamp: chrono::Utc::now(),
            tasks: vec![TaskOutcome::succeeded(
                "pipeline_review",
                json!({"analysis": "ok"}),
                [("conversation_quality".to_string(), score)].into(),
            )],
        };
        let path = dir.join(format!("{name}.json"));
        std::fs::write(&path, serde_json::to_string(&run).unwrap()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_register_then_rank_and_show() {
        let (dir, store) = temp_store();
        let low = write_run(dir.path(), "low", 4.0);
        let high = write_run(dir.path(), "high", 9.0);
        let meta = dir.path().join("meta.json");
        std::fs::write(&meta, r#"{"contact": "ops@acme.test"}"#).unwrap();

        cmd_register(store.clone(), "low", "sales_development", &low, None)
            .await
            .unwrap();
        let high_id = cmd_register(store.clone(), "high", "sales_development", &high, Some(&meta))
            .await
            .unwrap();
        assert!(high_id.ends_with("_high"));

        let out = cmd_rankings(store.clone(), Some("sales_development"), None, OutputFormat::Json)
            .await
            .unwrap();
        let entries: Vec<RankingEntry> = serde_json::from_str(&out).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].agent_name, "high");
        assert_eq!(entries[0].score, 9.0);

        let table = cmd_rankings(store.clone(), None, Some(1), OutputFormat::Table)
            .await
            .unwrap();
        assert_eq!(table.lines().count(), 2);
        assert!(table.contains(&high_id));

        let shown: serde_json::Value =
            serde_json::from_str(&cmd_show(store, &high_id).await.unwrap()).unwrap();
        assert_eq!(shown["metadata"]["extra"]["contact"], "ops@acme.test");
        assert!(shown["verification"].is_null());
    }

    #[tokio::test]
    async fn test_register_rejects_unknown_category_and_bad_results() {
        let (dir, store) = temp_store();
        let run = write_run(dir.path(), "bot", 5.0);
        let err = cmd_register(store.clone(), "bot", "astrology", &run, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown category"));

        let bogus = dir.path().join("bogus.json");
        std::fs::write(&bogus, r#"{"not": "a run"}"#).unwrap();
        let err = cmd_register(store, "bot", "marketing", &bogus, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("is not a benchmark run"));
    }

    #[tokio::test]
    async fn test_show_missing_submission_fails() {
        let (_dir, store) = temp_store();
        assert!(cmd_show(store, "20260101_nobody").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_rankings_render() {
        let (_dir, store) = temp_store();
        let table = cmd_rankings(store.clone(), None, None, OutputFormat::Table)
            .await
            .unwrap();
        assert_eq!(table, "No submissions.\n");
        let md = cmd_rankings(store, None, None, OutputFormat::Markdown)
            .await
            .unwrap();
        assert!(md.contains("_No submissions._"));
    }

    #[test]
    fn test_criteria_lists_weights() {
        let out = cmd_criteria("customer_support").unwrap();
        assert!(out.contains("Category: customer_support"));
        assert!(out.contains("empathy"));
        assert!(out.contains("2.0"));
        assert!(cmd_criteria("nope").is_err());
    }

    #[tokio::test]
    async fn test_summary_renders_stored_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut battle = AgentBattle::new(
            AgentCategory::Marketing,
            BattleConfig::new(BattleMode::Tournament).with_max_rounds(1),
        );
        battle.register_participant("a", Arc::new(Idle));
        battle.register_participant("b", Arc::new(Idle));
        let report = battle
            .run_competition(&StaticDataSource::new(), &NoMetrics)
            .await
            .unwrap();

        let path = dir.path().join("report.json");
        write_battle_report_json(&path, &report).unwrap();
        let md = cmd_summary(&path).unwrap();
        assert!(md.contains("mode: tournament"));
        assert!(md.contains("winner: draw"));
    }

    struct Idle;

    #[async_trait::async_trait]
    impl bizarena_core::Participant for Idle {
        async fn act(
            &self,
            _data: &serde_json::Value,
            _visible: Option<&bizarena_core::ActionLog>,
        ) -> bizarena_core::CollabResult<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
    }

    struct NoMetrics;

    #[async_trait::async_trait]
    impl bizarena_core::RoundEvaluator for NoMetrics {
        async fn evaluate_round(
            &self,
            _index: usize,
            _actions: &bizarena_core::ActionLog,
        ) -> bizarena_core::CollabResult<bizarena_core::RoundMetrics> {
            Ok(bizarena_core::RoundMetrics::new())
        }
    }
}
