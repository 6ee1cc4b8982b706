use crate::data::field::TARGET_TOTAL;
use crate::data::results::{ResultsStats, TOP_PRESETS};
use crate::data::{FieldDistribution, MatchupMatrix};
use crate::engine::api::ApiClient;
use crate::engine::OperationController;
use crate::model::{CrawlConfig, SessionConfig};
use crate::orchestrator::{self, OutputTargets, Session, SessionEvent, Stage};
use crate::storage::{self, DEFAULT_EXPORT_NAME};
use crate::text_summary;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "lineup-planner",
    version,
    about = "Plan a four-deck tournament lineup from crawled or uploaded matchup data"
)]
pub struct Cli {
    /// Base URL of the planning service
    #[arg(long, default_value = "http://localhost:8000")]
    pub base_url: String,

    /// Rank range to crawl (e.g. BRONZE_THROUGH_GOLD)
    #[arg(long)]
    pub rank_range: Option<String>,

    /// Game type to crawl (e.g. RANKED_STANDARD)
    #[arg(long)]
    pub game_type: Option<String>,

    /// Region to crawl (e.g. ALL)
    #[arg(long)]
    pub region: Option<String>,

    /// Time range to crawl (e.g. LAST_7_DAYS)
    #[arg(long)]
    pub time_range: Option<String>,

    /// Minimum games per matchup (1000-100000)
    #[arg(long)]
    pub min_games: Option<u32>,

    /// Upload a matchup CSV instead of crawling
    #[arg(long)]
    pub matchups: Option<PathBuf>,

    /// Field CSV to go with --matchups (defaults to an equal field)
    #[arg(long, requires = "matchups")]
    pub field: Option<PathBuf>,

    /// Continue from a saved session file
    #[arg(long, conflicts_with = "matchups")]
    pub resume: Option<PathBuf>,

    /// With --resume, go back to this stage (e.g. field) before continuing
    #[arg(long, requires = "resume")]
    pub restart_from: Option<Stage>,

    /// Override one matchup cell before confirming, as ROW_DECK,COL_DECK=WIN_RATE
    #[arg(long = "set-matchup", value_name = "ROW,COL=PCT")]
    pub set_matchups: Vec<String>,

    /// Override one field weight before confirming, as DECK=WEIGHT
    #[arg(long = "set-weight", value_name = "DECK=WEIGHT")]
    pub set_weights: Vec<String>,

    /// Rescale the field so its weights sum to 400
    #[arg(long, conflicts_with = "equal_field")]
    pub normalize: bool,

    /// Give every field deck the same weight (400 in total)
    #[arg(long)]
    pub equal_field: bool,

    /// Only show lineups containing a deck whose name includes this text
    #[arg(long, default_value = "")]
    pub filter: String,

    /// Number of lineups to show
    #[arg(long, default_value_t = 20)]
    pub top: usize,

    /// Print JSON result and exit
    #[arg(long)]
    pub json: bool,

    /// Print text summary and exit (the default; wins over --json)
    #[arg(long)]
    pub text: bool,

    /// Export every lineup as CSV (default file: lineup_results.csv)
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_EXPORT_NAME)]
    pub export_csv: Option<PathBuf>,

    /// Export every lineup as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Timeout for establishing a connection to the service
    #[arg(long, default_value = "10s")]
    pub connect_timeout: humantime::Duration,

    /// Use --save-session true or --save-session false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub save_session: bool,

    /// Print the service's crawl options and exit
    #[arg(long)]
    pub options: bool,

    /// Log progress details to stderr
    #[arg(long, short)]
    pub verbose: bool,
}

/// Build a `SessionConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> Result<SessionConfig> {
    SessionConfig::from_base_url(&args.base_url, Duration::from(args.connect_timeout))
        .map_err(|e| anyhow!(e))
}

/// Apply crawl flags on top of `base`.
pub fn build_crawl_config(args: &Cli, base: CrawlConfig) -> CrawlConfig {
    CrawlConfig {
        league_rank_range: args.rank_range.clone().unwrap_or(base.league_rank_range),
        game_type: args.game_type.clone().unwrap_or(base.game_type),
        region: args.region.clone().unwrap_or(base.region),
        time_range: args.time_range.clone().unwrap_or(base.time_range),
        min_games: args.min_games.unwrap_or(base.min_games),
    }
}

impl Cli {
    fn json_output(&self) -> bool {
        self.json && !self.text
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.top == 0 {
        bail!("--top must be at least 1 (presets: {TOP_PRESETS:?})");
    }
    let cfg = build_config(&args)?;
    info!(config = %serde_json::to_string(&cfg)?, "session config");
    let api = ApiClient::new(&cfg)?;

    let (out_tx, out_handle) = spawn_output_writer();

    if args.options {
        let options = api.fetch_options().await.context("failed to fetch options")?;
        let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&options)?));
        drop(out_tx);
        let _ = out_handle.await;
        return Ok(());
    }

    let mut session = match args.resume.as_deref() {
        Some(path) => {
            let snapshot = storage::load_session(path)?;
            let _ = out_tx.send(OutputLine::Stderr(format!(
                "Resuming session saved {} at stage {}",
                snapshot.saved_at_utc,
                snapshot.state.stage.label()
            )));
            Session::with_state(OperationController::new(cfg), snapshot.state)
        }
        None => Session::new(OperationController::new(cfg)),
    };
    if let Some(stage) = args.restart_from {
        if !session.go_to(stage) {
            bail!(
                "cannot restart from {} while the session is at {}",
                stage.label(),
                session.stage().label()
            );
        }
    }

    let res = match run_workflow(&args, &api, &mut session, &out_tx).await {
        Ok(()) => report_results(&args, &session, &out_tx),
        Err(e) => Err(e),
    };
    drop(out_tx);
    let _ = out_handle.await;
    res
}

/// Walk the session from its current stage to RESULTS.
async fn run_workflow(
    args: &Cli,
    api: &ApiClient,
    session: &mut Session,
    out: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    loop {
        let stage = session.stage();
        let accepted = match stage {
            Stage::DataSource => acquire(args, api, session, out).await?,
            Stage::Matchups => {
                let mut matchups = session
                    .state()
                    .matchups
                    .clone()
                    .ok_or_else(|| anyhow!("no matchup data to confirm"))?;
                apply_matchup_edits(&mut matchups, &args.set_matchups)?;
                session.confirm_matchups(matchups)
            }
            Stage::Field => {
                let mut field = session
                    .field_for_editing()
                    .ok_or_else(|| anyhow!("no matchup data to build a field from"))?;
                apply_field_edits(args, &mut field)?;
                session.confirm_field(field)
            }
            Stage::Calculate => {
                let state = session.state();
                if let (Some(m), Some(f)) = (state.matchups.as_ref(), state.field.as_ref()) {
                    for line in text_summary::build_data_summary(m, f).lines {
                        let _ = out.send(OutputLine::Stderr(line));
                    }
                }
                session.start_compute() && await_operation(session, out, args.json_output()).await?
            }
            Stage::Results => return Ok(()),
        };
        if !accepted {
            return Err(rejection(session, stage));
        }
    }
}

/// Split `KEY=VALUE` at the last `=`.
fn split_assignment(raw: &str) -> Result<(&str, &str)> {
    raw.rsplit_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got {raw:?}"))
}

fn apply_matchup_edits(matchups: &mut MatchupMatrix, edits: &[String]) -> Result<()> {
    for raw in edits {
        let (key, value) = split_assignment(raw)?;
        let (row, col) = key
            .split_once(',')
            .map(|(r, c)| (r.trim(), c.trim()))
            .ok_or_else(|| anyhow!("expected ROW,COL=PCT, got {raw:?}"))?;
        let r = matchups
            .index_of(row)
            .ok_or_else(|| anyhow!("unknown deck {row:?}"))?;
        let c = matchups
            .index_of(col)
            .ok_or_else(|| anyhow!("unknown deck {col:?}"))?;
        if !matchups.set_cell(r, c, value) {
            bail!("cannot edit {row} against itself");
        }
        info!(deck = row, average = ?matchups.average_for(row), "matchup edited");
    }
    Ok(())
}

fn apply_field_edits(args: &Cli, field: &mut FieldDistribution) -> Result<()> {
    for raw in &args.set_weights {
        let (deck, value) = split_assignment(raw)?;
        if !field.set_weight(deck, value) {
            bail!("{deck:?} is not in the matchup data");
        }
    }
    if args.equal_field {
        field.equal_distribution(TARGET_TOTAL);
    } else if args.normalize {
        field.normalize_to(TARGET_TOTAL);
    }
    Ok(())
}

/// Fill the data source stage from uploads or a crawl.
async fn acquire(
    args: &Cli,
    api: &ApiClient,
    session: &mut Session,
    out: &mpsc::UnboundedSender<OutputLine>,
) -> Result<bool> {
    if let Some(path) = args.matchups.as_deref() {
        let matchups = api.upload_matchups(path).await?;
        let field = match args.field.as_deref() {
            Some(p) => Some(api.upload_field(p).await?),
            None => None,
        };
        let _ = out.send(OutputLine::Stderr(format!(
            "Loaded {} decks from {}",
            matchups.len(),
            path.display()
        )));
        return Ok(session.load_manual(matchups, field));
    }

    let defaults = match api.fetch_options().await {
        Ok(options) => options.defaults,
        Err(e) => {
            warn!(error = %e, "options unavailable; using built-in crawl defaults");
            CrawlConfig::default()
        }
    };
    let crawl = build_crawl_config(args, defaults);
    Ok(session.start_acquire(crawl) && await_operation(session, out, args.json_output()).await?)
}

/// Drive the session until the operation in flight resolves. Ctrl-C resets the session.
async fn await_operation(
    session: &mut Session,
    out: &mpsc::UnboundedSender<OutputLine>,
    quiet: bool,
) -> Result<bool> {
    loop {
        tokio::select! {
            event = session.next_event() => match event {
                SessionEvent::Progress(p) => {
                    if !quiet {
                        let _ = out.send(OutputLine::Stderr(text_summary::progress_line(&p)));
                    }
                }
                SessionEvent::Acquired | SessionEvent::Computed => return Ok(true),
                SessionEvent::Failed(_) => return Ok(false),
            },
            _ = tokio::signal::ctrl_c() => {
                if let Some(status) = session.operation_status() {
                    let _ = out.send(OutputLine::Stderr(format!(
                        "Interrupted {} during {} ({:.0}%)",
                        status.kind,
                        status.phase.label(),
                        status.progress * 100.0
                    )));
                }
                session.reset();
                bail!("interrupted");
            }
        }
    }
}

fn rejection(session: &Session, stage: Stage) -> anyhow::Error {
    match session.state().notice.as_deref() {
        Some(notice) => anyhow!("{}: {notice}", stage.label()),
        None => anyhow!("{} could not be completed", stage.label()),
    }
}

#[derive(Serialize)]
struct JsonLineup<'a> {
    rank: usize,
    decks: &'a [String; 4],
    win_rate: f64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    stats: ResultsStats,
    lineups: Vec<JsonLineup<'a>>,
}

/// Print the results view, then export and save.
fn report_results(
    args: &Cli,
    session: &Session,
    out: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let state = session.state();
    let results = state
        .results
        .as_ref()
        .context("workflow finished without results")?;

    if args.json_output() {
        let report = JsonReport {
            stats: results.stats(),
            lineups: results
                .view(&args.filter, args.top)
                .into_iter()
                .map(|r| JsonLineup {
                    rank: r.rank + 1,
                    decks: &r.lineup.decks,
                    win_rate: r.lineup.win_rate,
                })
                .collect(),
        };
        let _ = out.send(OutputLine::Stdout(serde_json::to_string_pretty(&report)?));
    } else {
        for line in text_summary::build_text_summary(results, &args.filter, args.top).lines {
            let _ = out.send(OutputLine::Stdout(line));
        }
    }

    let session_dir = if args.save_session {
        match storage::sessions_dir() {
            Ok(dir) => Some(dir),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "not saving session");
                None
            }
        }
    } else {
        None
    };
    let processed = orchestrator::process_results(
        &OutputTargets {
            export_csv: args.export_csv.as_deref(),
            export_json: args.export_json.as_deref(),
            session_dir: session_dir.as_deref(),
        },
        state,
    );
    for msg in processed.export_messages {
        let _ = out.send(OutputLine::Stderr(msg));
    }
    if let Some(p) = processed.saved_session_path {
        let _ = out.send(OutputLine::Stderr(format!("Saved: {}", p.display())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawl_flags_override_service_defaults() {
        let args = Cli::parse_from(["lineup-planner", "--region", "EU", "--min-games", "2000"]);
        let base = CrawlConfig {
            time_range: "LAST_3_DAYS".into(),
            ..Default::default()
        };
        let crawl = build_crawl_config(&args, base);
        assert_eq!(crawl.region, "EU");
        assert_eq!(crawl.min_games, 2000);
        assert_eq!(crawl.time_range, "LAST_3_DAYS");
        assert_eq!(crawl.game_type, "RANKED_STANDARD");
    }

    #[test]
    fn defaults_match_local_service() {
        let args = Cli::parse_from(["lineup-planner"]);
        assert_eq!(args.top, 20);
        assert!(args.save_session);
        let cfg = build_config(&args).unwrap();
        assert_eq!(cfg.crawl_ws_url, "ws://localhost:8000/ws/crawl");
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
    }

    fn matrix() -> MatchupMatrix {
        MatchupMatrix::new(
            vec!["Control Warrior".into(), "Aggro Paladin".into()],
            vec![vec![50.0, 60.0], vec![40.0, 50.0]],
        )
        .unwrap()
    }

    #[test]
    fn matchup_edits_address_cells_by_deck_name() {
        let mut m = matrix();
        apply_matchup_edits(&mut m, &["Aggro Paladin, Control Warrior = 47.5".to_string()])
            .unwrap();
        assert_eq!(m.cell(1, 0), Some(47.5));
        assert!(apply_matchup_edits(&mut m, &["Big Priest,Aggro Paladin=50".to_string()]).is_err());
        assert!(apply_matchup_edits(&mut m, &["Aggro Paladin,Aggro Paladin=50".to_string()]).is_err());
        assert!(apply_matchup_edits(&mut m, &["no assignment".to_string()]).is_err());
    }

    #[test]
    fn field_edits_apply_before_rescaling() {
        let args = Cli::parse_from([
            "lineup-planner",
            "--set-weight",
            "Control Warrior=30",
            "--set-weight",
            "Aggro Paladin=10",
            "--normalize",
        ]);
        let mut field = FieldDistribution::uniform(matrix().deck_names(), 100.0);
        apply_field_edits(&args, &mut field).unwrap();
        assert_eq!(field.weight("Control Warrior"), Some(300.0));
        assert_eq!(field.weight("Aggro Paladin"), Some(100.0));

        let args = Cli::parse_from(["lineup-planner", "--set-weight", "Zoo Warlock=5"]);
        assert!(apply_field_edits(&args, &mut field).is_err());
    }

    #[test]
    fn export_csv_flag_has_default_file_name() {
        let args = Cli::parse_from(["lineup-planner", "--export-csv"]);
        assert_eq!(args.export_csv, Some(PathBuf::from("lineup_results.csv")));
        let args = Cli::parse_from(["lineup-planner", "--resume", "s.json", "--restart-from", "field"]);
        assert_eq!(args.restart_from, Some(Stage::Field));
    }

    #[test]
    fn field_requires_matchups() {
        assert!(Cli::try_parse_from(["lineup-planner", "--field", "f.csv"]).is_err());
        assert!(
            Cli::try_parse_from(["lineup-planner", "--matchups", "m.csv", "--field", "f.csv"])
                .is_ok()
        );
    }
}
