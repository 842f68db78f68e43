use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use emotion_tracker_lib::capture::ReplayScript;
use emotion_tracker_lib::chat_history::ChatHistory;
use emotion_tracker_lib::config::{load_json_config, save_json_config, TrackerConfig};
use emotion_tracker_lib::journal::query::parse_query_date;
use emotion_tracker_lib::journal::{LogFormat, LogQuery, Period, TransitionLogger};
use emotion_tracker_lib::report::SessionReporter;
use emotion_tracker_lib::runner::run_session;
use emotion_tracker_lib::tracker::EmotionSession;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "emotion-tracker", about = "Track dominant emotions and log transitions")]
struct Cli {
    /// JSON config file; missing fields use defaults.
    #[arg(long, global = true, default_value = "emotion_tracker.json")]
    config: PathBuf,
    /// Override the transition log path.
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a sampling session from a replay script until it ends or Ctrl-C.
    Run {
        replay: PathBuf,
        /// Log line format: json or legacy.
        #[arg(long)]
        format: Option<LogFormat>,
        /// Directory for the end-of-session chart.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print totals across the whole log and chat history.
    Summary,
    /// Print the sessions and chats recorded on one day (MM/DD/YYYY or YYYY-MM-DD).
    Day { date: String },
    /// Write the effective config to the config path.
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config: TrackerConfig = load_json_config(&cli.config, "Config");
    if let Some(log) = cli.log {
        config.log_path = log;
    }

    match cli.cmd {
        Commands::Run {
            replay,
            format,
            output,
        } => {
            if let Some(format) = format {
                config.log_format = format;
            }
            if let Some(output) = output {
                config.output_dir = output;
            }
            run(config, replay).await
        }
        Commands::Summary => summary(&config),
        Commands::Day { date } => day(&config, &date),
        Commands::InitConfig => {
            save_json_config(&cli.config, &config, "Config")
                .with_context(|| format!("writing {}", cli.config.display()))
        }
    }
}

async fn run(config: TrackerConfig, replay: PathBuf) -> anyhow::Result<()> {
    let script = ReplayScript::load(&replay).context("opening frame source")?;
    let (mut frames, mut classifier) = script.into_parts(Local::now());

    let quit = Arc::new(AtomicBool::new(false));
    {
        let quit = quit.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received, stopping after the current frame");
                quit.store(true, Ordering::Relaxed);
            }
        });
    }

    let report = tokio::task::spawn_blocking(move || {
        let session = EmotionSession::new(config.history_capacity, config.recent_window_secs);
        let logger = TransitionLogger::new(&config.log_path, config.log_format);
        let reporter = SessionReporter::new(&config.output_dir);
        run_session(&mut frames, &mut classifier, session, &logger, &reporter, &quit)
    })
    .await
    .context("capture loop panicked")?
    .context("session failed")?;

    info!(
        "Stopped ({:?}) after {} frames, {} transitions",
        report.stop, report.summary.frames_ingested, report.summary.transitions
    );
    if let Some(artifact) = report.artifact {
        println!("{}", artifact.chart.display());
    }
    Ok(())
}

fn summary(config: &TrackerConfig) -> anyhow::Result<()> {
    let query = LogQuery::load(&config.log_path)
        .with_context(|| format!("reading {}", config.log_path.display()))?;
    let chats = ChatHistory::load(&config.chat_history_path);

    let transitions: Vec<_> = query
        .transition_counts()
        .into_iter()
        .map(|((from, to), count)| json!({ "from": from, "to": to, "count": count }))
        .collect();
    let weekly: serde_json::Map<_, _> = query
        .valence_by_period(Period::Week)
        .into_iter()
        .map(|(d, v)| (d.to_string(), json!(v)))
        .collect();
    let monthly: serde_json::Map<_, _> = query
        .valence_by_period(Period::Month)
        .into_iter()
        .map(|(d, v)| (d.to_string(), json!(v)))
        .collect();
    let recent: Vec<_> = chats
        .recent(5)
        .iter()
        .map(|e| json!({ "time": e.at.to_string(), "summary": e.summary }))
        .collect();

    let out = json!({
        "records": query.records().len(),
        "positive_percentage": query.positive_percentage(),
        "dominant_tally": query.dominant_tally(),
        "transitions": transitions,
        "weekly_valence": weekly,
        "monthly_valence": monthly,
        "total_interactions": chats.total_interactions(),
        "active_days": chats.active_days(),
        "recent_activities": recent,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn day(config: &TrackerConfig, date: &str) -> anyhow::Result<()> {
    let date = parse_query_date(date).context("invalid date, use MM/DD/YYYY or YYYY-MM-DD")?;
    let query = LogQuery::load(&config.log_path)
        .with_context(|| format!("reading {}", config.log_path.display()))?;
    let chats = ChatHistory::load(&config.chat_history_path);

    let sessions: Vec<_> = query
        .sessions_on(date)
        .into_iter()
        .map(|s| json!({ "time": s.time.format("%H:%M:%S").to_string(), "emotion": s.emotion, "score": s.score }))
        .collect();
    let chat_sessions: Vec<_> = chats
        .sessions_on(date)
        .into_iter()
        .map(|e| json!({ "time": e.display_time(), "summary": e.summary }))
        .collect();

    let out = json!({
        "date": date.to_string(),
        "sessions": sessions,
        "chats": chat_sessions,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
