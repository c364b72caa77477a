use serde::{Deserialize, Serialize};

/// A provider-neutral cell. Parquet fields, JSON fixtures and in-memory test
/// tables all land here before ingestion types them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

static NULL_CELL: Cell = Cell::Null;

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Int(n) => Some(n.to_string()),
            Cell::Null | Cell::Float(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            Cell::Int(n) => *n as f64,
            Cell::Float(v) => *v,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
            Cell::Null => return None,
        };
        v.is_finite().then_some(v)
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Cell::Int(n) => u32::try_from(*n).ok(),
            Cell::Float(v) => integral_u32(*v),
            Cell::Text(s) => {
                let s = s.trim();
                s.parse::<u32>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral_u32))
            }
            Cell::Null => None,
        }
    }
}

fn integral_u32(v: f64) -> Option<u32> {
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 || v > f64::from(u32::MAX) {
        return None;
    }
    Some(v as u32)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    /// Names of the columns carried in `rows`, positionally.
    pub columns: Vec<String>,
    /// Every column the provider offered, including ones not materialized.
    #[serde(default)]
    pub available: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            columns,
            available: Vec::new(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn available_columns(&self) -> Vec<String> {
        if self.available.is_empty() {
            self.columns.clone()
        } else {
            self.available.clone()
        }
    }

    /// First candidate present wins; names compare case-insensitively.
    pub fn find_column(&self, candidates: &[&str]) -> Option<usize> {
        candidates.iter().find_map(|cand| {
            self.columns
                .iter()
                .position(|col| col.trim().eq_ignore_ascii_case(cand))
        })
    }

    pub fn cell<'a>(&self, row: &'a [Cell], idx: usize) -> &'a Cell {
        row.get(idx).unwrap_or(&NULL_CELL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_coercion_accepts_integral_values_only() {
        assert_eq!(Cell::Int(12).as_u32(), Some(12));
        assert_eq!(Cell::Int(-1).as_u32(), None);
        assert_eq!(Cell::Float(10.0).as_u32(), Some(10));
        assert_eq!(Cell::Float(10.5).as_u32(), None);
        assert_eq!(Cell::Text(" 7 ".to_string()).as_u32(), Some(7));
        assert_eq!(Cell::Text("7.0".to_string()).as_u32(), Some(7));
        assert_eq!(Cell::Text("seven".to_string()).as_u32(), None);
        assert_eq!(Cell::Null.as_u32(), None);
    }

    #[test]
    fn f64_coercion_rejects_nan() {
        assert_eq!(Cell::Float(f64::NAN).as_f64(), None);
        assert_eq!(Cell::Text("0.25".to_string()).as_f64(), Some(0.25));
        assert_eq!(Cell::Int(2).as_f64(), Some(2.0));
    }

    #[test]
    fn find_column_prefers_earlier_candidates() {
        let table = RawTable::new(
            vec!["Home_Score".to_string(), "total_home_score".to_string()],
            Vec::new(),
        );
        assert_eq!(
            table.find_column(&["total_home_score", "home_score"]),
            Some(1)
        );
        assert_eq!(table.find_column(&["home_score"]), Some(0));
        assert_eq!(table.find_column(&["score_home"]), None);
    }

    #[test]
    fn short_rows_read_as_null() {
        let table = RawTable::new(vec!["a".to_string(), "b".to_string()], Vec::new());
        let row = vec![Cell::Int(1)];
        assert!(table.cell(&row, 1).is_null());
    }

    #[test]
    fn cells_deserialize_untagged() {
        let cells: Vec<Cell> = serde_json::from_str(r#"[null, 3, 0.5, "NE"]"#).unwrap();
        assert_eq!(
            cells,
            vec![
                Cell::Null,
                Cell::Int(3),
                Cell::Float(0.5),
                Cell::Text("NE".to_string())
            ]
        );
    }
}
