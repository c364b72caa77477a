use anyhow::{Context, Result};

use nfl_team_stats::config::{self, PipelineConfig, parse_out_arg};
use nfl_team_stats::logging;
use nfl_team_stats::pipeline::{self, Stage};
use nfl_team_stats::source::NflverseSource;

fn main() -> Result<()> {
    config::load_dotenv();
    logging::init_logging();
    let mut cfg = PipelineConfig::from_env();
    if let Some(out) = parse_out_arg(std::env::args().skip(1)) {
        cfg = cfg.with_output_path(out);
    }

    let source = NflverseSource::from_config(&cfg);
    let summary = pipeline::run_stage(Stage::Metrics, &cfg, &source)
        .with_context(|| format!("metrics stage for season {} failed", cfg.season))?;

    println!("Team metrics written");
    println!("Output: {}", summary.output_path.display());
    if summary.first_run {
        println!("First run: no prior document");
    } else {
        println!("Backup: {}", summary.backup_path.display());
    }
    if let Some(plays) = summary.plays {
        println!(
            "Plays: {} read, {} skipped",
            plays.rows_read, plays.rows_skipped
        );
    }
    if let Some(games) = summary.games {
        println!(
            "Games: {} seen, {} decided, {} ties",
            games.games_seen, games.decided, games.ties
        );
    }
    println!(
        "Teams: {} computed, {} updated, {} added, {} kept",
        summary.teams_computed,
        summary.merge.updated,
        summary.merge.appended,
        summary.merge.retained
    );
    Ok(())
}
