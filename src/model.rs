use crate::data::{FieldDistribution, LineupResult, MatchupMatrix, Results};
use crate::error::{OperationError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const MIN_GAMES_RANGE: (u32, u32) = (1_000, 100_000);

/// Where the remote service lives. Built once from the CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub base_url: String,
    pub crawl_ws_url: String,
    pub calculate_ws_url: String,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl SessionConfig {
    /// Derive every endpoint from an `http(s)://host[:port]` base URL.
    pub fn from_base_url(base_url: &str, connect_timeout: Duration) -> Result<Self, String> {
        let base = base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(format!(
                "base URL must start with http:// or https://, got {base_url}"
            ));
        };
        Ok(Self {
            base_url: base.to_string(),
            crawl_ws_url: format!("{ws_base}/ws/crawl"),
            calculate_ws_url: format!("{ws_base}/ws/calculate"),
            connect_timeout,
            user_agent: format!("lineup-planner/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn endpoint(&self, kind: OperationKind) -> &str {
        match kind {
            OperationKind::Acquire => &self.crawl_ws_url,
            OperationKind::Compute => &self.calculate_ws_url,
        }
    }
}

/// Crawl settings sent to the acquisition service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub league_rank_range: String,
    pub game_type: String,
    pub region: String,
    pub time_range: String,
    pub min_games: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            league_rank_range: "BRONZE_THROUGH_GOLD".into(),
            game_type: "RANKED_STANDARD".into(),
            region: "ALL".into(),
            time_range: "LAST_7_DAYS".into(),
            min_games: 10_000,
        }
    }
}

impl CrawlConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let (min, max) = MIN_GAMES_RANGE;
        if !(min..=max).contains(&self.min_games) {
            return Err(ValidationError::MinGamesOutOfRange {
                value: self.min_games,
                min,
                max,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionChoice {
    pub value: String,
    pub label: String,
}

/// Choices the crawler accepts, as served by `GET /api/options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsDescriptor {
    pub league_rank_range: Vec<OptionChoice>,
    pub game_type: Vec<OptionChoice>,
    pub region: Vec<OptionChoice>,
    pub time_range: Vec<OptionChoice>,
    pub defaults: CrawlConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Acquire,
    Compute,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Acquire => "acquire",
            OperationKind::Compute => "compute",
        }
    }

    /// Phases the service walks through for this kind, in order.
    pub fn phases(self) -> &'static [Phase] {
        match self {
            OperationKind::Acquire => &[
                Phase::FetchingMatchups,
                Phase::FetchingArchetypes,
                Phase::Processing,
                Phase::Completed,
            ],
            OperationKind::Compute => &[
                Phase::GeneratingLineups,
                Phase::GeneratingField,
                Phase::Calculating,
                Phase::Finalizing,
                Phase::Completed,
            ],
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named stage of a remote operation. Unknown wire values are kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Phase {
    FetchingMatchups,
    FetchingArchetypes,
    Processing,
    GeneratingLineups,
    GeneratingField,
    Calculating,
    Finalizing,
    Completed,
    Error,
    Other(String),
}

impl Phase {
    pub fn as_str(&self) -> &str {
        match self {
            Phase::FetchingMatchups => "fetching_matchups",
            Phase::FetchingArchetypes => "fetching_archetypes",
            Phase::Processing => "processing",
            Phase::GeneratingLineups => "generating_lineups",
            Phase::GeneratingField => "generating_field",
            Phase::Calculating => "calculating",
            Phase::Finalizing => "finalizing",
            Phase::Completed => "completed",
            Phase::Error => "error",
            Phase::Other(s) => s,
        }
    }

    /// Human-readable label; anything unrecognised reads as "Processing".
    pub fn label(&self) -> &'static str {
        match self {
            Phase::FetchingMatchups => "Fetching Matchups",
            Phase::FetchingArchetypes => "Fetching Archetypes",
            Phase::Processing => "Processing Data",
            Phase::Other(_) => "Processing",
            Phase::GeneratingLineups => "Generating Lineups",
            Phase::GeneratingField => "Generating Field",
            Phase::Calculating => "Calculating Win Rates",
            Phase::Finalizing => "Finalizing",
            Phase::Completed => "Completed",
            Phase::Error => "Error",
        }
    }
}

impl From<&str> for Phase {
    fn from(s: &str) -> Self {
        match s {
            "fetching_matchups" => Phase::FetchingMatchups,
            "fetching_archetypes" => Phase::FetchingArchetypes,
            "processing" => Phase::Processing,
            "generating_lineups" => Phase::GeneratingLineups,
            "generating_field" => Phase::GeneratingField,
            "calculating" => Phase::Calculating,
            "finalizing" => Phase::Finalizing,
            "completed" => Phase::Completed,
            "error" => Phase::Error,
            other => Phase::Other(other.to_string()),
        }
    }
}

impl From<String> for Phase {
    fn from(s: String) -> Self {
        Phase::from(s.as_str())
    }
}

impl From<Phase> for String {
    fn from(p: Phase) -> Self {
        p.as_str().to_string()
    }
}

/// One incremental status update from a remote operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    /// Fraction in `[0, 1]`. Advisory only; not checked for monotonicity.
    pub progress: f64,
    pub message: String,
    pub completed: bool,
}

/// A message as it arrives on an operation channel.
///
/// Every message is a progress event; the one with `completed: true` also carries either
/// `error` or the payload for its operation kind.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusMessage {
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub matchups: Option<MatchupMatrix>,
    #[serde(default)]
    pub field: Option<FieldDistribution>,
    #[serde(default)]
    pub results: Option<Vec<LineupResult>>,
}

impl StatusMessage {
    pub fn event(&self) -> ProgressEvent {
        ProgressEvent {
            phase: Phase::from(self.phase.as_str()),
            progress: self.progress,
            message: self.message.clone(),
            completed: self.completed,
        }
    }

    /// Turn a terminal message into the operation's resolution.
    pub fn into_outcome(self, kind: OperationKind) -> OperationOutcome {
        if let Some(err) = self.error.filter(|e| !e.is_empty()) {
            return Err(OperationError::Remote(err));
        }
        match kind {
            OperationKind::Acquire => match (self.matchups, self.field) {
                (Some(matchups), Some(field)) => Ok(OperationOutput::Acquired { matchups, field }),
                _ => Err(OperationError::Protocol(
                    "acquisition finished without matchups and field".into(),
                )),
            },
            OperationKind::Compute => match self.results {
                Some(results) => Ok(OperationOutput::Computed(Results::new(results))),
                None => Err(OperationError::Protocol(
                    "computation finished without results".into(),
                )),
            },
        }
    }
}

/// Payload for the computation service. Built from copies of the confirmed data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputeRequest {
    pub matchups: MatchupMatrix,
    pub field: FieldDistribution,
}

/// The single message sent when an operation channel opens.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationRequest {
    Acquire(CrawlConfig),
    Compute(ComputeRequest),
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::Acquire(_) => OperationKind::Acquire,
            OperationRequest::Compute(_) => OperationKind::Compute,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            OperationRequest::Acquire(cfg) => serde_json::to_string(cfg),
            OperationRequest::Compute(req) => serde_json::to_string(req),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutput {
    Acquired {
        matchups: MatchupMatrix,
        field: FieldDistribution,
    },
    Computed(Results),
}

pub type OperationOutcome = Result<OperationOutput, OperationError>;
