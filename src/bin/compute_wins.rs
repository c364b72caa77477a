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
    let summary = pipeline::run_stage(Stage::Records, &cfg, &source)
        .with_context(|| format!("win/loss stage for season {} failed", cfg.season))?;

    if let Some(games) = summary.games {
        println!(
            "Computed team W/L from {} decided games ({} ties, {} skipped)",
            games.decided,
            games.ties,
            games.skipped_missing_teams + games.skipped_conflicting_teams + games.skipped_missing_scores
        );
    }
    println!(
        "Merged wins/losses into {} ({} teams updated, {} untouched)",
        summary.output_path.display(),
        summary.merge.updated,
        summary.merge.retained
    );
    Ok(())
}
