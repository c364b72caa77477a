use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayType {
    Pass,
    Run,
    Other,
    Unknown,
}

impl PlayType {
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return PlayType::Unknown;
        };
        if raw.eq_ignore_ascii_case("pass") {
            PlayType::Pass
        } else if raw.eq_ignore_ascii_case("run") {
            PlayType::Run
        } else {
            PlayType::Other
        }
    }
}

/// One play as delivered by the provider. Team fields are raw spellings;
/// the score fields repeat the running score on every play of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub game_id: String,
    pub offense_team: Option<String>,
    pub defense_team: Option<String>,
    pub play_type: PlayType,
    pub efficiency: Option<f64>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSeasonRecord {
    pub team: String,
    pub wins: Option<u32>,
    pub losses: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLoss {
    pub wins: Option<u32>,
    pub losses: Option<u32>,
}

impl WinLoss {
    pub fn is_empty(&self) -> bool {
        self.wins.is_none() && self.losses.is_none()
    }

    /// Non-null fields of `newer` win; nulls never erase.
    pub fn overlay(self, newer: WinLoss) -> WinLoss {
        WinLoss {
            wins: newer.wins.or(self.wins),
            losses: newer.losses.or(self.losses),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Decided { winner: String, loser: String },
    Tie,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub result: GameResult,
}

/// Everything the pipeline derives for one canonical team in one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMetrics {
    pub team: String,
    pub off_efficiency: Option<f64>,
    pub def_efficiency: Option<f64>,
    pub off_pass_efficiency: Option<f64>,
    pub off_rush_efficiency: Option<f64>,
    pub def_pass_efficiency: Option<f64>,
    pub def_rush_efficiency: Option<f64>,
    pub tempo: Option<f64>,
    pub wins: Option<u32>,
    pub losses: Option<u32>,
}

impl TeamMetrics {
    pub fn new(team: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            ..Self::default()
        }
    }

    pub fn record(&self) -> WinLoss {
        WinLoss {
            wins: self.wins,
            losses: self.losses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_type_from_raw() {
        assert_eq!(PlayType::from_raw(Some("pass")), PlayType::Pass);
        assert_eq!(PlayType::from_raw(Some(" RUN ")), PlayType::Run);
        assert_eq!(PlayType::from_raw(Some("punt")), PlayType::Other);
        assert_eq!(PlayType::from_raw(Some("")), PlayType::Unknown);
        assert_eq!(PlayType::from_raw(None), PlayType::Unknown);
    }

    #[test]
    fn overlay_keeps_existing_when_newer_is_null() {
        let old = WinLoss {
            wins: Some(3),
            losses: Some(4),
        };
        let merged = old.overlay(WinLoss {
            wins: Some(5),
            losses: None,
        });
        assert_eq!(merged.wins, Some(5));
        assert_eq!(merged.losses, Some(4));
    }
}
