use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::model::{GameOutcome, GameResult, PlayRecord, TeamSeasonRecord, WinLoss};
use crate::teams::TeamAliases;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub games_seen: usize,
    pub decided: usize,
    pub ties: usize,
    pub skipped_missing_teams: usize,
    pub skipped_conflicting_teams: usize,
    pub skipped_missing_scores: usize,
}

#[derive(Debug, Default)]
struct GameAcc {
    home_team: Option<String>,
    away_team: Option<String>,
    conflicting: bool,
    home_score: Option<u32>,
    away_score: Option<u32>,
}

impl GameAcc {
    fn push(mut self, play: &PlayRecord, aliases: &TeamAliases) -> Self {
        self.conflicting |= !agree(&mut self.home_team, play.home_team.as_deref(), aliases);
        self.conflicting |= !agree(&mut self.away_team, play.away_team.as_deref(), aliases);
        self.home_score = self.home_score.max(play.home_score);
        self.away_score = self.away_score.max(play.away_score);
        self
    }
}

// Records the first identity seen; false when a later row disagrees.
fn agree(slot: &mut Option<String>, raw: Option<&str>, aliases: &TeamAliases) -> bool {
    let Some(team) = raw.map(|t| aliases.normalize(t)).filter(|t| !t.is_empty()) else {
        return true;
    };
    match slot {
        Some(existing) => *existing == team,
        None => {
            *slot = Some(team);
            true
        }
    }
}

/// One outcome per game id, ordered by game id. Final scores are the
/// maximum observed on each side, which assumes scores never decrease
/// within a game; a corrected (lowered) score is not detected.
pub fn resolve_outcomes(
    plays: &[PlayRecord],
    aliases: &TeamAliases,
) -> (Vec<GameOutcome>, ResolveReport) {
    let games = plays
        .iter()
        .fold(BTreeMap::<&str, GameAcc>::new(), |mut games, play| {
            let slot = games.entry(play.game_id.as_str()).or_default();
            *slot = std::mem::take(slot).push(play, aliases);
            games
        });

    let mut report = ResolveReport {
        games_seen: games.len(),
        ..ResolveReport::default()
    };
    let mut out = Vec::with_capacity(games.len());

    for (game_id, acc) in games {
        if acc.conflicting {
            report.skipped_conflicting_teams += 1;
            tracing::warn!(game_id, "rows disagree on home/away teams; skipping game");
            continue;
        }
        let (Some(home_team), Some(away_team)) = (acc.home_team, acc.away_team) else {
            report.skipped_missing_teams += 1;
            tracing::debug!(game_id, "no home/away identity; skipping game");
            continue;
        };
        if home_team == away_team {
            report.skipped_conflicting_teams += 1;
            tracing::warn!(game_id, team = %home_team, "home and away resolve to the same team");
            continue;
        }
        let (Some(home_score), Some(away_score)) = (acc.home_score, acc.away_score) else {
            report.skipped_missing_scores += 1;
            tracing::debug!(game_id, "no final score; skipping game");
            continue;
        };

        let result = if home_score > away_score {
            GameResult::Decided {
                winner: home_team.clone(),
                loser: away_team.clone(),
            }
        } else if away_score > home_score {
            GameResult::Decided {
                winner: away_team.clone(),
                loser: home_team.clone(),
            }
        } else {
            GameResult::Tie
        };
        match result {
            GameResult::Tie => report.ties += 1,
            GameResult::Decided { .. } => report.decided += 1,
        }

        out.push(GameOutcome {
            game_id: game_id.to_string(),
            home_team,
            away_team,
            home_score,
            away_score,
            result,
        });
    }

    (out, report)
}

/// Cumulative wins and losses. Ties contribute nothing, so a team with only
/// tied games has no entry.
pub fn tally_records(outcomes: &[GameOutcome]) -> BTreeMap<String, WinLoss> {
    outcomes
        .iter()
        .fold(BTreeMap::new(), |mut records, outcome| {
            if let GameResult::Decided { winner, loser } = &outcome.result {
                let w = records.entry(winner.clone()).or_insert_with(zero_record);
                w.wins = w.wins.map(|n| n + 1);
                let l = records.entry(loser.clone()).or_insert_with(zero_record);
                l.losses = l.losses.map(|n| n + 1);
            }
            records
        })
}

fn zero_record() -> WinLoss {
    WinLoss {
        wins: Some(0),
        losses: Some(0),
    }
}

/// Collapses season-summary rows to canonical teams. Duplicate rows keep the
/// first non-null value per field; rows without any count are dropped.
pub fn season_records(
    rows: &[TeamSeasonRecord],
    aliases: &TeamAliases,
) -> BTreeMap<String, WinLoss> {
    rows.iter().fold(BTreeMap::new(), |mut out, row| {
        let record = WinLoss {
            wins: row.wins,
            losses: row.losses,
        };
        let team = aliases.normalize(&row.team);
        if record.is_empty() || team.is_empty() {
            return out;
        }
        match out.entry(team) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                let first = *slot.get();
                slot.insert(record.overlay(first));
            }
        }
        out
    })
}

/// Season-summary values take precedence over play-derived ones wherever
/// they are non-null.
pub fn prefer_season_records(
    derived: BTreeMap<String, WinLoss>,
    season: &BTreeMap<String, WinLoss>,
) -> BTreeMap<String, WinLoss> {
    season.iter().fold(derived, |mut out, (team, record)| {
        let slot = out.entry(team.clone()).or_default();
        *slot = slot.overlay(*record);
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlayType;

    fn snapshot(game: &str, home: &str, away: &str, hs: u32, aws: u32) -> PlayRecord {
        PlayRecord {
            game_id: game.to_string(),
            offense_team: Some(home.to_string()),
            defense_team: Some(away.to_string()),
            play_type: PlayType::Pass,
            efficiency: Some(0.0),
            home_team: Some(home.to_string()),
            away_team: Some(away.to_string()),
            home_score: Some(hs),
            away_score: Some(aws),
        }
    }

    #[test]
    fn max_score_decides_winner() {
        let plays = vec![
            snapshot("G1", "NE", "NYJ", 0, 7),
            snapshot("G1", "NE", "NYJ", 14, 7),
            snapshot("G1", "NE", "NYJ", 10, 3),
        ];
        let (outcomes, report) = resolve_outcomes(&plays, &TeamAliases::identity());
        assert_eq!(report.decided, 1);
        assert_eq!(outcomes[0].home_score, 14);
        assert_eq!(outcomes[0].away_score, 7);
        assert_eq!(
            outcomes[0].result,
            GameResult::Decided {
                winner: "NE".to_string(),
                loser: "NYJ".to_string()
            }
        );
    }

    #[test]
    fn ties_leave_records_untouched() {
        let plays = vec![
            snapshot("G1", "NE", "NYJ", 17, 17),
            snapshot("G2", "MIA", "BUF", 10, 20),
        ];
        let (outcomes, report) = resolve_outcomes(&plays, &TeamAliases::identity());
        assert_eq!(report.ties, 1);
        let records = tally_records(&outcomes);
        assert!(!records.contains_key("NE"));
        assert!(!records.contains_key("NYJ"));
        assert_eq!(records["BUF"].wins, Some(1));
        assert_eq!(records["BUF"].losses, Some(0));
        assert_eq!(records["MIA"].losses, Some(1));
    }

    #[test]
    fn games_without_identity_are_skipped() {
        let mut anonymous = snapshot("G1", "NE", "NYJ", 21, 3);
        anonymous.home_team = None;
        let mut conflicting = snapshot("G2", "KC", "DEN", 21, 3);
        conflicting.away_team = Some("LV".to_string());
        let plays = vec![anonymous, snapshot("G2", "KC", "DEN", 0, 0), conflicting];
        let (outcomes, report) = resolve_outcomes(&plays, &TeamAliases::identity());
        assert!(outcomes.is_empty());
        assert_eq!(report.skipped_missing_teams, 1);
        assert_eq!(report.skipped_conflicting_teams, 1);
    }

    #[test]
    fn identity_can_come_from_any_row() {
        let mut first = snapshot("G1", "NE", "NYJ", 0, 0);
        first.home_team = None;
        first.away_team = None;
        let plays = vec![first, snapshot("G1", "ne", "nyj", 3, 0)];
        let (outcomes, _) = resolve_outcomes(&plays, &TeamAliases::identity());
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].home_team, "NE");
    }

    #[test]
    fn missing_scores_skip_the_game() {
        let mut play = snapshot("G1", "NE", "NYJ", 0, 0);
        play.home_score = None;
        let (outcomes, report) = resolve_outcomes(&[play], &TeamAliases::identity());
        assert!(outcomes.is_empty());
        assert_eq!(report.skipped_missing_scores, 1);
    }

    #[test]
    fn season_records_win_over_derived() {
        let derived = BTreeMap::from([
            (
                "NE".to_string(),
                WinLoss {
                    wins: Some(3),
                    losses: Some(2),
                },
            ),
            (
                "NYJ".to_string(),
                WinLoss {
                    wins: Some(1),
                    losses: Some(4),
                },
            ),
        ]);
        let rows = vec![
            TeamSeasonRecord {
                team: "ne".to_string(),
                wins: Some(4),
                losses: None,
            },
            TeamSeasonRecord {
                team: "NE".to_string(),
                wins: Some(9),
                losses: Some(1),
            },
            TeamSeasonRecord {
                team: "OAK".to_string(),
                wins: Some(2),
                losses: Some(3),
            },
        ];
        let season = season_records(&rows, &TeamAliases::default());
        assert_eq!(
            season["NE"],
            WinLoss {
                wins: Some(4),
                losses: Some(1)
            }
        );

        let merged = prefer_season_records(derived, &season);
        assert_eq!(merged["NE"].wins, Some(4));
        assert_eq!(merged["NE"].losses, Some(1));
        assert_eq!(merged["NYJ"].wins, Some(1));
        assert_eq!(merged["LV"].losses, Some(3));
    }
}
