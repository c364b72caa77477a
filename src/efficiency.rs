use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;

use crate::model::{PlayRecord, PlayType};
use crate::teams::TeamAliases;

/// Regular-season games per team; tempo is offensive plays over this.
pub const SEASON_GAMES: f64 = 17.0;

#[derive(Debug, Clone, PartialEq)]
pub struct EfficiencyMetrics {
    pub team: String,
    pub off_efficiency: Option<f64>,
    pub def_efficiency: Option<f64>,
    pub off_pass_efficiency: Option<f64>,
    pub off_rush_efficiency: Option<f64>,
    pub def_pass_efficiency: Option<f64>,
    pub def_rush_efficiency: Option<f64>,
    pub offensive_plays: u64,
    pub tempo: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct MeanAcc {
    sum: f64,
    n: u64,
}

impl MeanAcc {
    fn push(self, value: f64) -> Self {
        Self {
            sum: self.sum + value,
            n: self.n + 1,
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            n: self.n + other.n,
        }
    }

    fn mean(self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SideAcc {
    all: MeanAcc,
    pass: MeanAcc,
    run: MeanAcc,
}

impl SideAcc {
    fn push(self, play_type: PlayType, value: f64) -> Self {
        let mut next = Self {
            all: self.all.push(value),
            ..self
        };
        match play_type {
            PlayType::Pass => next.pass = next.pass.push(value),
            PlayType::Run => next.run = next.run.push(value),
            PlayType::Other | PlayType::Unknown => {}
        }
        next
    }

    fn merge(self, other: Self) -> Self {
        Self {
            all: self.all.merge(other.all),
            pass: self.pass.merge(other.pass),
            run: self.run.merge(other.run),
        }
    }

    /// (overall, pass, run) with the splits falling back to overall.
    fn means(self) -> (Option<f64>, Option<f64>, Option<f64>) {
        let all = self.all.mean();
        (all, self.pass.mean().or(all), self.run.mean().or(all))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct TeamAcc {
    offense: SideAcc,
    defense: SideAcc,
}

impl TeamAcc {
    fn merge(self, other: Self) -> Self {
        Self {
            offense: self.offense.merge(other.offense),
            defense: self.defense.merge(other.defense),
        }
    }

    fn finish(self, team: String) -> EfficiencyMetrics {
        let (off, off_pass, off_rush) = self.offense.means();
        let (def, def_pass, def_rush) = self.defense.means();
        let offensive_plays = self.offense.all.n;
        EfficiencyMetrics {
            team,
            off_efficiency: off,
            def_efficiency: def,
            off_pass_efficiency: off_pass,
            off_rush_efficiency: off_rush,
            def_pass_efficiency: def_pass,
            def_rush_efficiency: def_rush,
            offensive_plays,
            tempo: (offensive_plays > 0).then(|| offensive_plays as f64 / SEASON_GAMES),
        }
    }
}

type Partial = HashMap<String, TeamAcc>;

/// Mean efficiency per canonical team, offense and defense, with pass/run
/// splits. Plays without an efficiency value never reach a bucket.
pub fn aggregate_efficiency(
    plays: &[PlayRecord],
    aliases: &TeamAliases,
) -> BTreeMap<String, EfficiencyMetrics> {
    let totals = plays
        .par_iter()
        .filter_map(|play| play.efficiency.map(|value| (play, value)))
        .fold(Partial::new, |acc, (play, value)| {
            fold_play(acc, play, value, aliases)
        })
        .reduce(Partial::new, merge_partials);

    totals
        .into_iter()
        .map(|(team, acc)| (team.clone(), acc.finish(team)))
        .collect()
}

fn fold_play(mut acc: Partial, play: &PlayRecord, value: f64, aliases: &TeamAliases) -> Partial {
    if let Some(team) = play.offense_team.as_deref().map(|t| aliases.normalize(t)) {
        let entry = acc.entry(team).or_default();
        entry.offense = entry.offense.push(play.play_type, value);
    }
    if let Some(team) = play.defense_team.as_deref().map(|t| aliases.normalize(t)) {
        let entry = acc.entry(team).or_default();
        entry.defense = entry.defense.push(play.play_type, value);
    }
    acc
}

fn merge_partials(mut left: Partial, right: Partial) -> Partial {
    for (team, acc) in right {
        let slot = left.entry(team).or_default();
        *slot = slot.merge(acc);
    }
    left
}
