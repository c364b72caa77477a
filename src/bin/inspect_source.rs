use anyhow::{Context, Result};

use nfl_team_stats::config::{self, PipelineConfig};
use nfl_team_stats::logging;
use nfl_team_stats::source::{DataSource, NflverseSource};
use nfl_team_stats::table::RawTable;

const SAMPLE_ROWS: usize = 3;

fn main() -> Result<()> {
    config::load_dotenv();
    logging::init_logging();
    let cfg = PipelineConfig::from_env();
    let source = NflverseSource::from_config(&cfg);

    println!("Inspecting provider tables for season {}", cfg.season);

    let plays = source.play_table().context("load play table")?;
    describe("play-by-play", &plays);

    match source.season_table() {
        Ok(Some(table)) => describe("season summary", &table),
        Ok(None) => println!("\n- season summary: not configured (SEASON_SUMMARY_URL_TEMPLATE)"),
        Err(err) => println!("\n- season summary: ERROR {err}"),
    }

    println!("\nDone.");
    Ok(())
}

fn describe(label: &str, table: &RawTable) {
    let available = table.available_columns();
    println!("\n- {label}: {} rows, {} columns", table.len(), available.len());
    println!("  columns: {available:?}");
    println!("  materialized: {:?}", table.columns);
    println!("  sample rows:");
    for row in table.rows.iter().take(SAMPLE_ROWS) {
        let pairs = table
            .columns
            .iter()
            .zip(row.iter())
            .map(|(col, cell)| format!("{col}={cell:?}"))
            .collect::<Vec<_>>();
        println!("    {}", pairs.join(", "));
    }

    let wins = matching(&available, |c| c.contains("win") || c == "w");
    let losses = matching(&available, |c| c.contains("loss") || c == "l");
    println!("  potential wins cols: {wins:?}");
    println!("  potential losses cols: {losses:?}");
}

fn matching(columns: &[String], pred: impl Fn(&str) -> bool) -> Vec<String> {
    columns
        .iter()
        .filter(|c| pred(&c.to_ascii_lowercase()))
        .cloned()
        .collect()
}
