//! The single validation boundary between provider tables and typed records.
//!
//! Column names are resolved once per table against ordered candidate lists;
//! a missing required column fails the whole table, a row missing a required
//! value is skipped and counted.

use crate::error::{PipelineError, Result};
use crate::model::{PlayRecord, PlayType, TeamSeasonRecord};
use crate::table::{Cell, RawTable};

#[derive(Debug, Clone)]
pub struct ColumnCandidates {
    pub game_id: Vec<&'static str>,
    pub offense: Vec<&'static str>,
    pub defense: Vec<&'static str>,
    pub play_type: Vec<&'static str>,
    pub efficiency: Vec<&'static str>,
    pub home_team: Vec<&'static str>,
    pub away_team: Vec<&'static str>,
    pub home_score: Vec<&'static str>,
    pub away_score: Vec<&'static str>,
    pub season_team: Vec<&'static str>,
    pub wins: Vec<&'static str>,
    pub losses: Vec<&'static str>,
    pub record: Vec<&'static str>,
}

impl Default for ColumnCandidates {
    fn default() -> Self {
        Self {
            game_id: vec!["game_id", "old_game_id"],
            offense: vec!["posteam", "offense_team", "pos_team"],
            defense: vec!["defteam", "defense_team", "def_team"],
            play_type: vec!["play_type"],
            efficiency: vec!["epa"],
            home_team: vec!["home_team", "home_abbr", "home"],
            away_team: vec!["away_team", "away_abbr", "away"],
            home_score: vec![
                "total_home_score",
                "home_team_score",
                "home_score",
                "score_home",
            ],
            away_score: vec![
                "total_away_score",
                "away_team_score",
                "away_score",
                "score_away",
            ],
            season_team: vec!["team", "team_abbr", "team_name", "team_code"],
            wins: vec!["w", "wins", "wins_reg", "wins_season"],
            losses: vec!["l", "losses", "losses_reg", "losses_season"],
            record: vec!["record"],
        }
    }
}

impl ColumnCandidates {
    pub fn play_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        [
            &self.game_id,
            &self.offense,
            &self.defense,
            &self.play_type,
            &self.efficiency,
            &self.home_team,
            &self.away_team,
            &self.home_score,
            &self.away_score,
        ]
        .into_iter()
        .flatten()
        .copied()
    }

    pub fn season_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        [&self.season_team, &self.wins, &self.losses, &self.record]
            .into_iter()
            .flatten()
            .copied()
    }

    /// Whether a provider column is worth materializing for either table.
    pub fn wants(&self, column: &str) -> bool {
        let column = column.trim();
        self.play_columns()
            .chain(self.season_columns())
            .any(|cand| cand.eq_ignore_ascii_case(column))
    }
}

/// Which parts of the play table a stage reads. Outcome columns are always
/// required; offense, defense and efficiency only for `Full`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayColumns {
    Full,
    OutcomesOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeSchema {
    pub game_id: usize,
    pub home_team: usize,
    pub away_team: usize,
    pub home_score: usize,
    pub away_score: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EfficiencySchema {
    pub offense: usize,
    pub defense: usize,
    pub play_type: Option<usize>,
    pub efficiency: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaySchema {
    pub outcome: OutcomeSchema,
    pub efficiency: Option<EfficiencySchema>,
}

impl PlaySchema {
    pub fn resolve(
        table: &RawTable,
        candidates: &ColumnCandidates,
        columns: PlayColumns,
    ) -> Result<Self> {
        let mut missing = Vec::new();
        let mut need = |field: &'static str, cands: &[&str]| {
            let found = table.find_column(cands);
            if found.is_none() {
                missing.push(field);
            }
            found.unwrap_or_default()
        };
        let outcome = OutcomeSchema {
            game_id: need("game_id", &candidates.game_id),
            home_team: need("home_team", &candidates.home_team),
            away_team: need("away_team", &candidates.away_team),
            home_score: need("home_score", &candidates.home_score),
            away_score: need("away_score", &candidates.away_score),
        };
        let efficiency = match columns {
            PlayColumns::Full => Some(EfficiencySchema {
                offense: need("offense_team", &candidates.offense),
                defense: need("defense_team", &candidates.defense),
                play_type: table.find_column(&candidates.play_type),
                efficiency: need("efficiency", &candidates.efficiency),
            }),
            PlayColumns::OutcomesOnly => None,
        };
        if !missing.is_empty() {
            return Err(PipelineError::SchemaMismatch {
                table: "play",
                missing,
                available: table.available_columns(),
            });
        }
        Ok(PlaySchema {
            outcome,
            efficiency,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonSchema {
    pub team: usize,
    pub wins: Option<usize>,
    pub losses: Option<usize>,
    pub record: Option<usize>,
}

impl SeasonSchema {
    pub fn resolve(table: &RawTable, candidates: &ColumnCandidates) -> Result<Self> {
        let team = table.find_column(&candidates.season_team);
        let wins = table.find_column(&candidates.wins);
        let losses = table.find_column(&candidates.losses);
        let record = table.find_column(&candidates.record);

        let mut missing = Vec::new();
        if team.is_none() {
            missing.push("team");
        }
        if wins.is_none() && losses.is_none() && record.is_none() {
            missing.push("wins/losses/record");
        }
        let Some(team) = team.filter(|_| missing.is_empty()) else {
            return Err(PipelineError::SchemaMismatch {
                table: "season summary",
                missing,
                available: table.available_columns(),
            });
        };
        Ok(SeasonSchema {
            team,
            wins,
            losses,
            record,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
}

pub fn ingest_plays(
    table: &RawTable,
    candidates: &ColumnCandidates,
    columns: PlayColumns,
) -> Result<(Vec<PlayRecord>, IngestReport)> {
    let schema = PlaySchema::resolve(table, candidates, columns)?;
    let outcome = schema.outcome;
    let mut report = IngestReport::default();
    let mut out = Vec::with_capacity(table.len());

    for row in &table.rows {
        report.rows_read += 1;
        let text = |idx: usize| table.cell(row, idx).as_text();
        let Some(game_id) = text(outcome.game_id) else {
            report.rows_skipped += 1;
            continue;
        };
        let mut play = PlayRecord {
            game_id,
            offense_team: None,
            defense_team: None,
            play_type: PlayType::Unknown,
            efficiency: None,
            home_team: text(outcome.home_team),
            away_team: text(outcome.away_team),
            home_score: table.cell(row, outcome.home_score).as_u32(),
            away_score: table.cell(row, outcome.away_score).as_u32(),
        };
        if let Some(eff) = schema.efficiency {
            let play_type = eff
                .play_type
                .map(|idx| table.cell(row, idx))
                .and_then(Cell::as_text);
            play.offense_team = text(eff.offense);
            play.defense_team = text(eff.defense);
            play.play_type = PlayType::from_raw(play_type.as_deref());
            play.efficiency = table.cell(row, eff.efficiency).as_f64();
        }
        out.push(play);
    }

    if report.rows_skipped > 0 {
        tracing::warn!(
            skipped = report.rows_skipped,
            read = report.rows_read,
            "skipped play rows without a game id"
        );
    }
    Ok((out, report))
}

pub fn ingest_season_records(
    table: &RawTable,
    candidates: &ColumnCandidates,
) -> Result<(Vec<TeamSeasonRecord>, IngestReport)> {
    let schema = SeasonSchema::resolve(table, candidates)?;
    let mut report = IngestReport::default();
    let mut out = Vec::with_capacity(table.len());

    for row in &table.rows {
        report.rows_read += 1;
        let Some(team) = table.cell(row, schema.team).as_text() else {
            report.rows_skipped += 1;
            continue;
        };
        let count = |idx: Option<usize>| idx.and_then(|i| table.cell(row, i).as_u32());
        let mut wins = count(schema.wins);
        let mut losses = count(schema.losses);
        if (wins.is_none() || losses.is_none())
            && let Some((w, l)) = schema
                .record
                .and_then(|idx| table.cell(row, idx).as_text())
                .as_deref()
                .and_then(parse_record)
        {
            wins = wins.or(Some(w));
            losses = losses.or(Some(l));
        }
        out.push(TeamSeasonRecord { team, wins, losses });
    }

    if report.rows_skipped > 0 {
        tracing::warn!(
            skipped = report.rows_skipped,
            read = report.rows_read,
            "skipped season rows without a team"
        );
    }
    Ok((out, report))
}

/// `"12-5"` or `"10-6-1"`; ties are ignored.
pub fn parse_record(raw: &str) -> Option<(u32, u32)> {
    let mut parts = raw.trim().split('-').map(str::trim);
    let wins = parts.next()?.parse::<u32>().ok()?;
    let losses = parts.next()?.parse::<u32>().ok()?;
    match parts.next() {
        None => Some((wins, losses)),
        Some(ties) if ties.parse::<u32>().is_ok() && parts.next().is_none() => {
            Some((wins, losses))
        }
        Some(_) => None,
    }
}
