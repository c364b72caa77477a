use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use crate::model::TeamMetrics;
use crate::persist::PersistedEntry;
use crate::teams::TeamAliases;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Every computed field overwrites; unknown teams are appended.
    FullRewrite,
    /// Only wins and losses are touched; nothing is appended.
    WinLossOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub updated: usize,
    pub appended: usize,
    /// Entries with no counterpart in this run's computation.
    pub retained: usize,
    pub duplicates_collapsed: usize,
}

impl PersistedEntry {
    /// The one merge primitive. `FullRewrite` replaces every efficiency and
    /// tempo field, nulls included; wins and losses only ever take non-null
    /// values, in either mode.
    pub fn apply_metrics(&mut self, metrics: &TeamMetrics, mode: MergeMode) {
        if mode == MergeMode::FullRewrite {
            self.off_efficiency = metrics.off_efficiency;
            self.def_efficiency = metrics.def_efficiency;
            self.off_pass_efficiency = metrics.off_pass_efficiency;
            self.off_rush_efficiency = metrics.off_rush_efficiency;
            self.def_pass_efficiency = metrics.def_pass_efficiency;
            self.def_rush_efficiency = metrics.def_rush_efficiency;
            self.tempo = metrics.tempo;
        }
        overwrite(&mut self.wins, metrics.wins);
        overwrite(&mut self.losses, metrics.losses);
    }

    /// First-wins: only fields still null here are taken from `other`.
    fn absorb(&mut self, other: PersistedEntry) {
        fill(&mut self.off_efficiency, other.off_efficiency);
        fill(&mut self.def_efficiency, other.def_efficiency);
        fill(&mut self.off_pass_efficiency, other.off_pass_efficiency);
        fill(&mut self.off_rush_efficiency, other.off_rush_efficiency);
        fill(&mut self.def_pass_efficiency, other.def_pass_efficiency);
        fill(&mut self.def_rush_efficiency, other.def_rush_efficiency);
        fill(&mut self.tempo, other.tempo);
        fill(&mut self.wins, other.wins);
        fill(&mut self.losses, other.losses);
        for (key, value) in other.extra {
            if value.is_null() {
                continue;
            }
            let slot = self.extra.entry(key).or_insert(Value::Null);
            if slot.is_null() {
                *slot = value;
            }
        }
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// Canonicalizes every team field and collapses duplicates into the first
/// entry carrying that id. Returns the number of entries dropped.
pub fn normalize_entries(
    entries: Vec<PersistedEntry>,
    aliases: &TeamAliases,
) -> (Vec<PersistedEntry>, usize) {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<PersistedEntry> = Vec::with_capacity(entries.len());
    let mut collapsed = 0usize;

    for mut entry in entries {
        entry.team = aliases.normalize(&entry.team);
        match index.get(&entry.team) {
            Some(&idx) => {
                tracing::debug!(team = %entry.team, "collapsing duplicate team entry");
                out[idx].absorb(entry);
                collapsed += 1;
            }
            None => {
                index.insert(entry.team.clone(), out.len());
                out.push(entry);
            }
        }
    }
    (out, collapsed)
}

/// Merges one run's computation into a previously persisted document.
/// Existing order is kept; appended teams follow in canonical-id order.
pub fn merge_document(
    existing: Vec<PersistedEntry>,
    computed: &BTreeMap<String, TeamMetrics>,
    mode: MergeMode,
    aliases: &TeamAliases,
) -> (Vec<PersistedEntry>, MergeSummary) {
    let (mut entries, duplicates_collapsed) = normalize_entries(existing, aliases);
    let mut summary = MergeSummary {
        duplicates_collapsed,
        ..MergeSummary::default()
    };

    let mut by_team: BTreeMap<String, &TeamMetrics> = BTreeMap::new();
    for (team, metrics) in computed {
        by_team.entry(aliases.normalize(team)).or_insert(metrics);
    }

    let mut seen = HashSet::new();
    for entry in &mut entries {
        match by_team.get(&entry.team) {
            Some(metrics) => {
                entry.apply_metrics(metrics, mode);
                seen.insert(entry.team.clone());
                summary.updated += 1;
            }
            None => summary.retained += 1,
        }
    }

    if mode == MergeMode::FullRewrite {
        for (team, metrics) in &by_team {
            if seen.contains(team) {
                continue;
            }
            let mut entry = PersistedEntry::new(team.clone());
            entry.apply_metrics(metrics, mode);
            entries.push(entry);
            summary.appended += 1;
        }
    }

    if summary.retained > 0 {
        tracing::info!(
            retained = summary.retained,
            "kept entries with no counterpart in this run"
        );
    }
    (entries, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(team: &str, off: f64, wins: Option<u32>, losses: Option<u32>) -> TeamMetrics {
        TeamMetrics {
            off_efficiency: Some(off),
            def_efficiency: Some(-off),
            off_pass_efficiency: Some(off),
            off_rush_efficiency: Some(off),
            def_pass_efficiency: Some(-off),
            def_rush_efficiency: Some(-off),
            tempo: Some(60.0),
            wins,
            losses,
            ..TeamMetrics::new(team)
        }
    }

    #[test]
    fn duplicates_merge_first_non_null_wins() {
        let mut a = PersistedEntry::new("ne");
        a.losses = Some(5);
        a.off_efficiency = Some(0.2);
        let mut b = PersistedEntry::new(" NE ");
        b.wins = Some(10);
        b.off_efficiency = Some(0.9);
        b.extra.insert("logo".to_string(), Value::from("ne.png"));

        let (entries, collapsed) = normalize_entries(vec![a, b], &TeamAliases::identity());
        assert_eq!(collapsed, 1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].team, "NE");
        assert_eq!(entries[0].wins, Some(10));
        assert_eq!(entries[0].losses, Some(5));
        assert_eq!(entries[0].off_efficiency, Some(0.2));
        assert_eq!(entries[0].extra["logo"], Value::from("ne.png"));
    }

    #[test]
    fn win_loss_only_leaves_other_fields() {
        let mut existing = PersistedEntry::new("NE");
        existing.off_efficiency = Some(0.3);
        existing.wins = Some(2);
        let computed = BTreeMap::from([
            ("NE".to_string(), metrics("NE", 0.9, Some(5), Some(1))),
            ("NYJ".to_string(), metrics("NYJ", 0.1, Some(1), Some(5))),
        ]);
        let (entries, summary) = merge_document(
            vec![existing],
            &computed,
            MergeMode::WinLossOnly,
            &TeamAliases::identity(),
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.appended, 0);
        assert_eq!(entries[0].off_efficiency, Some(0.3));
        assert_eq!(entries[0].wins, Some(5));
        assert_eq!(entries[0].losses, Some(1));
    }

    #[test]
    fn full_rewrite_overwrites_and_appends() {
        let mut existing = PersistedEntry::new("NE");
        existing.off_efficiency = Some(0.3);
        existing.wins = Some(7);
        let stale = PersistedEntry::new("HOU");
        let computed = BTreeMap::from([
            ("NE".to_string(), metrics("NE", 0.9, None, None)),
            ("BUF".to_string(), metrics("BUF", 0.1, Some(1), Some(0))),
        ]);
        let (entries, summary) = merge_document(
            vec![existing, stale],
            &computed,
            MergeMode::FullRewrite,
            &TeamAliases::identity(),
        );
        assert_eq!(
            summary,
            MergeSummary {
                updated: 1,
                appended: 1,
                retained: 1,
                duplicates_collapsed: 0,
            }
        );
        let teams: Vec<&str> = entries.iter().map(|e| e.team.as_str()).collect();
        assert_eq!(teams, vec!["NE", "HOU", "BUF"]);
        assert_eq!(entries[0].off_efficiency, Some(0.9));
        assert_eq!(entries[0].wins, Some(7));
        assert_eq!(entries[2].wins, Some(1));
    }

    #[test]
    fn full_rewrite_clears_efficiency_the_run_did_not_compute() {
        let mut existing = PersistedEntry::new("NE");
        existing.off_efficiency = Some(0.9);
        existing.tempo = Some(60.0);
        existing.wins = Some(4);
        let computed = BTreeMap::from([(
            "NE".to_string(),
            TeamMetrics {
                def_efficiency: Some(0.1),
                ..TeamMetrics::new("NE")
            },
        )]);
        let (entries, _) = merge_document(
            vec![existing],
            &computed,
            MergeMode::FullRewrite,
            &TeamAliases::identity(),
        );
        assert_eq!(entries[0].off_efficiency, None);
        assert_eq!(entries[0].tempo, None);
        assert_eq!(entries[0].def_efficiency, Some(0.1));
        assert_eq!(entries[0].wins, Some(4));
    }

    #[test]
    fn merging_twice_is_idempotent() {
        let existing = vec![PersistedEntry::new("la"), PersistedEntry::new("LAR")];
        let computed = BTreeMap::from([
            ("LAR".to_string(), metrics("LAR", 0.4, Some(3), Some(3))),
            ("SF".to_string(), metrics("SF", 0.2, Some(4), Some(2))),
        ]);
        let aliases = TeamAliases::default();
        let (once, _) = merge_document(existing, &computed, MergeMode::FullRewrite, &aliases);
        let (twice, summary) =
            merge_document(once.clone(), &computed, MergeMode::FullRewrite, &aliases);
        assert_eq!(once, twice);
        assert_eq!(summary.appended, 0);
        assert_eq!(summary.duplicates_collapsed, 0);
    }
}
