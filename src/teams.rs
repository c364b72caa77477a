use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Relocations and provider spellings that differ from the dashboard's
/// abbreviations. `LAC` stays the Chargers.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("LA", "LAR"),
    ("STL", "LAR"),
    ("SD", "LAC"),
    ("OAK", "LV"),
    ("WSH", "WAS"),
    ("JAC", "JAX"),
    ("ARZ", "ARI"),
    ("BLT", "BAL"),
    ("CLV", "CLE"),
    ("HST", "HOU"),
];

/// Canonical team identifiers: trimmed, upper-cased, alias-resolved.
#[derive(Debug, Clone)]
pub struct TeamAliases {
    pairs: BTreeMap<String, String>,
    resolved: HashMap<String, String>,
}

impl Default for TeamAliases {
    fn default() -> Self {
        Self::new(DEFAULT_ALIASES.iter().copied())
    }
}

impl TeamAliases {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut out = Self {
            pairs: BTreeMap::new(),
            resolved: HashMap::new(),
        };
        out.insert_pairs(pairs);
        out
    }

    /// No aliasing at all; only case folding and trimming.
    pub fn identity() -> Self {
        Self::new(std::iter::empty::<(&str, &str)>())
    }

    /// Later pairs replace earlier ones with the same source key.
    pub fn with_extra<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.insert_pairs(pairs);
        self
    }

    pub fn normalize(&self, raw: &str) -> String {
        let folded = fold(raw);
        match self.resolved.get(&folded) {
            Some(target) => target.clone(),
            None => folded,
        }
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    fn insert_pairs<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (from, to) in pairs {
            let from = fold(from.as_ref());
            let to = fold(to.as_ref());
            if from.is_empty() || to.is_empty() {
                continue;
            }
            self.pairs.insert(from, to);
        }
        self.resolved = resolve_chains(&self.pairs);
    }
}

/// Parses `FROM=TO` pairs separated by commas, semicolons or whitespace.
pub fn parse_alias_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split([',', ';', ' ', '\n', '\t'])
        .filter_map(|part| {
            let (from, to) = part.split_once('=')?;
            let (from, to) = (from.trim(), to.trim());
            if from.is_empty() || to.is_empty() {
                return None;
            }
            Some((from.to_string(), to.to_string()))
        })
        .collect()
}

fn fold(raw: &str) -> String {
    raw.trim().to_uppercase().trim().to_string()
}

// Every key maps straight to the end of its chain so a second lookup is a
// no-op. Keys on a cycle are dropped.
fn resolve_chains(pairs: &BTreeMap<String, String>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for key in pairs.keys() {
        let mut seen = BTreeSet::from([key.as_str()]);
        let mut current = key.as_str();
        let mut cyclic = false;
        while let Some(next) = pairs.get(current) {
            if next == current {
                break;
            }
            if !seen.insert(next.as_str()) {
                cyclic = true;
                break;
            }
            current = next;
        }
        if cyclic {
            tracing::warn!(alias = %key, "team alias chain is cyclic; ignoring it");
            continue;
        }
        if current != key {
            out.insert(key.clone(), current.to_string());
        }
    }
    out
}
