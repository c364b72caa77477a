//! Run configuration from the environment. Binaries load `.env.local` and
//! `.env` once at startup, before logging is installed.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate, Utc};

use crate::ingest::ColumnCandidates;
use crate::persist::default_backup_path;
use crate::teams::{TeamAliases, parse_alias_pairs};

pub const DEFAULT_OUTPUT_PATH: &str = "public/weekly_stats.json";
pub const DEFAULT_PBP_URL_TEMPLATE: &str =
    "https://github.com/nflverse/nflverse-data/releases/download/pbp/play_by_play_{season}.parquet";
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;
const CACHE_DIR: &str = "nfl_team_stats";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub season: u16,
    pub output_path: PathBuf,
    backup_path: Option<PathBuf>,
    pub pbp_url_template: String,
    pub season_summary_url_template: Option<String>,
    pub aliases: TeamAliases,
    pub columns: ColumnCandidates,
    pub cache_dir: PathBuf,
    pub timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            season: current_season(Utc::now().date_naive()),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            backup_path: None,
            pbp_url_template: DEFAULT_PBP_URL_TEMPLATE.to_string(),
            season_summary_url_template: None,
            aliases: TeamAliases::default(),
            columns: ColumnCandidates::default(),
            cache_dir: std::env::temp_dir().join(CACHE_DIR),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl PipelineConfig {
    /// Reads the process environment; call [`load_dotenv`] first so `.env`
    /// values are visible.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut cfg = Self::default();

        if let Some(season) = get("NFL_SEASON") {
            match season.parse::<u16>() {
                Ok(season) => cfg.season = season,
                Err(_) => tracing::warn!(value = %season, "ignoring unparsable NFL_SEASON"),
            }
        }
        if let Some(path) = get("STATS_OUTPUT_PATH") {
            cfg.output_path = PathBuf::from(path);
        }
        cfg.backup_path = get("STATS_BACKUP_PATH").map(PathBuf::from);
        if let Some(url) = get("PBP_URL_TEMPLATE") {
            cfg.pbp_url_template = url;
        }
        cfg.season_summary_url_template = get("SEASON_SUMMARY_URL_TEMPLATE");
        if let Some(raw) = get("TEAM_ALIASES") {
            cfg.aliases = cfg.aliases.with_extra(parse_alias_pairs(&raw));
        }
        if let Some(dir) = get("SOURCE_CACHE_DIR") {
            cfg.cache_dir = PathBuf::from(dir);
        }
        if let Some(secs) = get("SOURCE_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.timeout_secs = secs.max(1);
        }
        cfg
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_backup_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup_path = Some(path.into());
        self
    }

    pub fn with_aliases(mut self, aliases: TeamAliases) -> Self {
        self.aliases = aliases;
        self
    }

    /// Explicit backup path, else `<output>.bak`.
    pub fn backup_path(&self) -> PathBuf {
        self.backup_path
            .clone()
            .unwrap_or_else(|| default_backup_path(&self.output_path))
    }

    pub fn pbp_url(&self) -> String {
        fill_season(&self.pbp_url_template, self.season)
    }

    pub fn season_summary_url(&self) -> Option<String> {
        self.season_summary_url_template
            .as_deref()
            .map(|t| fill_season(t, self.season))
    }
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

/// The season a date belongs to: games before September count toward the
/// previous year's season.
pub fn current_season(today: NaiveDate) -> u16 {
    let year = if today.month() >= 9 {
        today.year()
    } else {
        today.year() - 1
    };
    u16::try_from(year).unwrap_or(u16::MAX)
}

fn fill_season(template: &str, season: u16) -> String {
    template.replace("{season}", &season.to_string())
}

/// `--out=<path>` or `--out <path>`.
pub fn parse_out_arg<I, S>(args: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args = args
        .into_iter()
        .map(|a| a.as_ref().to_string())
        .collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--out=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--out" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
