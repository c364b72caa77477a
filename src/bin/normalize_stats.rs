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
    let summary = pipeline::run_stage(Stage::Normalize, &cfg, &source)
        .with_context(|| format!("normalize {}", cfg.output_path.display()))?;

    println!("Backed up original to {}", summary.backup_path.display());
    match summary.season_rows {
        Some(rows) => println!(
            "Merged seasonal records: {} rows ({} skipped)",
            rows.rows_read, rows.rows_skipped
        ),
        None => println!("No seasonal records available (continuing without wins/losses)"),
    }
    println!(
        "Wrote normalized file with {} teams to {} ({} duplicates collapsed)",
        summary.entries_written,
        summary.output_path.display(),
        summary.merge.duplicates_collapsed
    );
    Ok(())
}
