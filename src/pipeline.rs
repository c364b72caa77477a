use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::efficiency::{EfficiencyMetrics, aggregate_efficiency};
use crate::error::{PipelineError, Result};
use crate::ingest::{IngestReport, PlayColumns, ingest_plays, ingest_season_records};
use crate::merge::{MergeMode, MergeSummary, merge_document};
use crate::model::{PlayRecord, TeamMetrics, WinLoss};
use crate::outcomes::{
    ResolveReport, prefer_season_records, resolve_outcomes, season_records, tally_records,
};
use crate::persist;
use crate::source::DataSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Efficiency plus records, full rewrite. A missing document is a first run.
    Metrics,
    /// Wins and losses from play-by-play into an existing document.
    Records,
    /// Canonicalize and dedupe an existing document, attaching season-summary
    /// records when the provider has them.
    Normalize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Metrics => "metrics",
            Stage::Records => "records",
            Stage::Normalize => "normalize",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stage: Stage,
    pub output_path: PathBuf,
    pub backup_path: PathBuf,
    pub first_run: bool,
    pub plays: Option<IngestReport>,
    pub season_rows: Option<IngestReport>,
    pub games: Option<ResolveReport>,
    pub teams_computed: usize,
    pub merge: MergeSummary,
    pub entries_written: usize,
}

/// Runs one stage end to end. Every provider read and the prior-document
/// read finish before the document is touched, so any fatal error leaves
/// the previous document and its backup as they were.
pub fn run_stage(
    stage: Stage,
    cfg: &PipelineConfig,
    source: &dyn DataSource,
) -> Result<RunSummary> {
    tracing::info!(%stage, season = cfg.season, output = %cfg.output_path.display(), "starting stage");

    let (existing, first_run) = match stage {
        Stage::Metrics => match persist::load_document(&cfg.output_path)? {
            Some(entries) => (entries, false),
            None => {
                tracing::info!("no prior document; starting fresh");
                (Vec::new(), true)
            }
        },
        Stage::Records | Stage::Normalize => (persist::require_document(&cfg.output_path)?, false),
    };

    let mut summary = RunSummary {
        stage,
        output_path: cfg.output_path.clone(),
        backup_path: cfg.backup_path(),
        first_run,
        plays: None,
        season_rows: None,
        games: None,
        teams_computed: 0,
        merge: MergeSummary::default(),
        entries_written: 0,
    };

    let (computed, mode) = match stage {
        Stage::Metrics => {
            let (plays, report) = load_plays(source, cfg, PlayColumns::Full)?;
            summary.plays = Some(report);
            let season = load_season_records(source, cfg);
            summary.season_rows = season.as_ref().map(|(_, report)| *report);

            let efficiency = aggregate_efficiency(&plays, &cfg.aliases);
            let (records, games) = derive_records(&plays, cfg, season.map(|(map, _)| map));
            summary.games = Some(games);
            (assemble_metrics(efficiency, records), MergeMode::FullRewrite)
        }
        Stage::Records => {
            let (plays, report) = load_plays(source, cfg, PlayColumns::OutcomesOnly)?;
            summary.plays = Some(report);
            let season = load_season_records(source, cfg);
            summary.season_rows = season.as_ref().map(|(_, report)| *report);

            let (records, games) = derive_records(&plays, cfg, season.map(|(map, _)| map));
            summary.games = Some(games);
            (assemble_metrics(BTreeMap::new(), records), MergeMode::WinLossOnly)
        }
        Stage::Normalize => {
            let season = load_season_records(source, cfg);
            summary.season_rows = season.as_ref().map(|(_, report)| *report);
            let records = season.map(|(map, _)| map).unwrap_or_default();
            if records.is_empty() {
                tracing::info!("no season records available; normalizing only");
            }
            (assemble_metrics(BTreeMap::new(), records), MergeMode::WinLossOnly)
        }
    };
    summary.teams_computed = computed.len();

    let (entries, merge) = merge_document(existing, &computed, mode, &cfg.aliases);
    summary.merge = merge;
    summary.entries_written = entries.len();

    persist::write_document(&cfg.output_path, &summary.backup_path, &entries)?;
    tracing::info!(
        %stage,
        entries = entries.len(),
        updated = merge.updated,
        appended = merge.appended,
        retained = merge.retained,
        collapsed = merge.duplicates_collapsed,
        "wrote document"
    );
    Ok(summary)
}

fn load_plays(
    source: &dyn DataSource,
    cfg: &PipelineConfig,
    columns: PlayColumns,
) -> Result<(Vec<PlayRecord>, IngestReport)> {
    let table = source.play_table()?;
    if table.is_empty() {
        return Err(PipelineError::SourceUnavailable(format!(
            "play table for season {} returned zero rows",
            cfg.season
        )));
    }
    let (plays, report) = ingest_plays(&table, &cfg.columns, columns)?;
    if plays.is_empty() {
        return Err(PipelineError::SourceUnavailable(format!(
            "play table for season {} has no usable rows",
            cfg.season
        )));
    }
    tracing::info!(rows = report.rows_read, skipped = report.rows_skipped, "ingested plays");
    Ok((plays, report))
}

// The season summary is optional: any failure is logged and the run goes on
// with play-derived records only.
fn load_season_records(
    source: &dyn DataSource,
    cfg: &PipelineConfig,
) -> Option<(BTreeMap<String, WinLoss>, IngestReport)> {
    let table = match source.season_table() {
        Ok(Some(table)) => table,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(%err, "season summary unavailable; continuing without it");
            return None;
        }
    };
    match ingest_season_records(&table, &cfg.columns) {
        Ok((rows, report)) => {
            let records = season_records(&rows, &cfg.aliases);
            tracing::info!(teams = records.len(), "loaded season records");
            Some((records, report))
        }
        Err(err) => {
            tracing::warn!(%err, "season summary unusable; continuing without it");
            None
        }
    }
}

fn derive_records(
    plays: &[PlayRecord],
    cfg: &PipelineConfig,
    season: Option<BTreeMap<String, WinLoss>>,
) -> (BTreeMap<String, WinLoss>, ResolveReport) {
    let (outcomes, report) = resolve_outcomes(plays, &cfg.aliases);
    tracing::info!(
        games = report.games_seen,
        decided = report.decided,
        ties = report.ties,
        skipped = report.skipped_missing_teams
            + report.skipped_conflicting_teams
            + report.skipped_missing_scores,
        "resolved game outcomes"
    );
    let derived = tally_records(&outcomes);
    let records = match season {
        Some(season) => prefer_season_records(derived, &season),
        None => derived,
    };
    (records, report)
}

/// Joins efficiency and records on canonical team id. A team present in
/// only one input gets nulls for the other's fields.
pub fn assemble_metrics(
    efficiency: BTreeMap<String, EfficiencyMetrics>,
    records: BTreeMap<String, WinLoss>,
) -> BTreeMap<String, TeamMetrics> {
    let mut out: BTreeMap<String, TeamMetrics> = efficiency
        .into_iter()
        .map(|(team, eff)| {
            let metrics = TeamMetrics {
                off_efficiency: eff.off_efficiency,
                def_efficiency: eff.def_efficiency,
                off_pass_efficiency: eff.off_pass_efficiency,
                off_rush_efficiency: eff.off_rush_efficiency,
                def_pass_efficiency: eff.def_pass_efficiency,
                def_rush_efficiency: eff.def_rush_efficiency,
                tempo: eff.tempo,
                ..TeamMetrics::new(team.clone())
            };
            (team, metrics)
        })
        .collect();

    for (team, record) in records {
        let metrics = out
            .entry(team.clone())
            .or_insert_with(|| TeamMetrics::new(team));
        metrics.wins = record.wins;
        metrics.losses = record.losses;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_joins_on_team() {
        let efficiency = BTreeMap::from([(
            "NE".to_string(),
            EfficiencyMetrics {
                team: "NE".to_string(),
                off_efficiency: Some(0.1),
                def_efficiency: Some(-0.1),
                off_pass_efficiency: Some(0.2),
                off_rush_efficiency: Some(0.0),
                def_pass_efficiency: Some(-0.2),
                def_rush_efficiency: Some(0.0),
                offensive_plays: 34,
                tempo: Some(2.0),
            },
        )]);
        let records = BTreeMap::from([
            (
                "NE".to_string(),
                WinLoss {
                    wins: Some(1),
                    losses: Some(0),
                },
            ),
            (
                "NYJ".to_string(),
                WinLoss {
                    wins: Some(0),
                    losses: Some(1),
                },
            ),
        ]);
        let out = assemble_metrics(efficiency, records);
        assert_eq!(out["NE"].off_pass_efficiency, Some(0.2));
        assert_eq!(out["NE"].wins, Some(1));
        assert_eq!(out["NYJ"].off_efficiency, None);
        assert_eq!(out["NYJ"].losses, Some(1));
    }
}
