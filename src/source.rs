use std::fs;
use std::path::{Path, PathBuf};

use parquet::errors::ParquetError;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use parquet::schema::types::{Type, TypePtr};
use reqwest::blocking::Client;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::http_client::http_client;
use crate::ingest::ColumnCandidates;
use crate::table::{Cell, RawTable};

/// Where raw rows come from. Implementations do no typing or validation;
/// that happens in [`crate::ingest`].
pub trait DataSource {
    fn play_table(&self) -> Result<RawTable>;

    /// `Ok(None)` when no season summary is configured.
    fn season_table(&self) -> Result<Option<RawTable>>;
}

/// nflverse release assets fetched over HTTP and decoded from parquet.
#[derive(Debug, Clone)]
pub struct NflverseSource {
    pub pbp_url: String,
    pub season_url: Option<String>,
    pub cache_dir: PathBuf,
    pub timeout_secs: u64,
    pub columns: ColumnCandidates,
}

impl NflverseSource {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            pbp_url: cfg.pbp_url(),
            season_url: cfg.season_summary_url(),
            cache_dir: cfg.cache_dir.clone(),
            timeout_secs: cfg.timeout_secs,
            columns: cfg.columns.clone(),
        }
    }

    fn fetch_table(&self, url: &str, file_name: &str) -> Result<RawTable> {
        let client = http_client(self.timeout_secs)?;
        let path = download_file(client, url, &self.cache_dir.join(file_name))?;
        let table = read_parquet_table(&path, |name| self.columns.wants(name))?;
        tracing::info!(
            url,
            rows = table.len(),
            columns = table.columns.len(),
            "loaded provider table"
        );
        Ok(table)
    }
}

impl DataSource for NflverseSource {
    fn play_table(&self) -> Result<RawTable> {
        self.fetch_table(&self.pbp_url, "play_by_play.parquet")
    }

    fn season_table(&self) -> Result<Option<RawTable>> {
        let Some(url) = self.season_url.as_deref() else {
            return Ok(None);
        };
        self.fetch_table(url, "season_summary.parquet").map(Some)
    }
}

/// Tables held in memory; a missing play table behaves like an unreachable
/// provider.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub plays: Option<RawTable>,
    pub season: Option<RawTable>,
}

impl StaticSource {
    pub fn new(plays: RawTable) -> Self {
        Self {
            plays: Some(plays),
            season: None,
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn with_season(mut self, season: RawTable) -> Self {
        self.season = Some(season);
        self
    }
}

impl DataSource for StaticSource {
    fn play_table(&self) -> Result<RawTable> {
        self.plays
            .clone()
            .ok_or_else(|| PipelineError::SourceUnavailable("no play table loaded".to_string()))
    }

    fn season_table(&self) -> Result<Option<RawTable>> {
        Ok(self.season.clone())
    }
}

// One attempt only; a failed retrieval aborts the run.
fn download_file(client: &Client, url: &str, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| PipelineError::io(format!("create {}", parent.display()), e))?;
    }
    let bytes = client
        .get(url)
        .send()
        .and_then(|res| res.error_for_status())
        .and_then(|res| res.bytes())
        .map_err(|e| PipelineError::SourceUnavailable(format!("download {url}: {e}")))?;
    fs::write(path, &bytes).map_err(|e| PipelineError::io(format!("write {}", path.display()), e))?;
    Ok(path.to_path_buf())
}

/// Reads the top-level columns accepted by `keep`. `available` still lists
/// every column in the file so schema errors can show what was offered.
pub fn read_parquet_table(path: &Path, keep: impl Fn(&str) -> bool) -> Result<RawTable> {
    let unreadable = |what: &str, err: ParquetError| {
        PipelineError::SourceUnavailable(format!("{what} {}: {err}", path.display()))
    };
    let file =
        fs::File::open(path).map_err(|e| PipelineError::io(format!("open {}", path.display()), e))?;
    let reader = SerializedFileReader::new(file).map_err(|e| unreadable("open parquet", e))?;
    let schema = reader.metadata().file_metadata().schema();

    let available = schema
        .get_fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect::<Vec<_>>();
    let fields = schema
        .get_fields()
        .iter()
        .filter(|f| keep(f.name()))
        .cloned()
        .collect::<Vec<TypePtr>>();
    let columns = fields
        .iter()
        .map(|f| f.name().to_string())
        .collect::<Vec<_>>();

    if fields.is_empty() {
        // Nothing to project; keep the row count so emptiness checks still hold.
        let num_rows = usize::try_from(reader.metadata().file_metadata().num_rows()).unwrap_or(0);
        return Ok(RawTable {
            columns,
            available,
            rows: vec![Vec::new(); num_rows],
        });
    }

    let projection = Type::group_type_builder(schema.name())
        .with_fields(fields)
        .build()
        .map_err(|e| unreadable("project parquet", e))?;
    let iter = reader
        .get_row_iter(Some(projection))
        .map_err(|e| unreadable("iterate parquet", e))?;

    let mut rows = Vec::new();
    let mut undecodable = 0usize;
    for row in iter {
        let Ok(row) = row else {
            undecodable += 1;
            continue;
        };
        rows.push(
            row.get_column_iter()
                .map(|(_, field)| cell_from_field(field))
                .collect::<Vec<_>>(),
        );
    }
    if undecodable > 0 {
        tracing::warn!(undecodable, path = %path.display(), "skipped undecodable parquet rows");
    }

    Ok(RawTable {
        columns,
        available,
        rows,
    })
}

fn cell_from_field(field: &Field) -> Cell {
    match field {
        Field::Null => Cell::Null,
        Field::Bool(v) => Cell::Int(i64::from(*v)),
        Field::Byte(v) => Cell::Int(i64::from(*v)),
        Field::Short(v) => Cell::Int(i64::from(*v)),
        Field::Int(v) => Cell::Int(i64::from(*v)),
        Field::Long(v) => Cell::Int(*v),
        Field::UByte(v) => Cell::Int(i64::from(*v)),
        Field::UShort(v) => Cell::Int(i64::from(*v)),
        Field::UInt(v) => Cell::Int(i64::from(*v)),
        Field::ULong(v) => i64::try_from(*v)
            .map(Cell::Int)
            .unwrap_or(Cell::Float(*v as f64)),
        Field::Float(v) => Cell::Float(f64::from(*v)),
        Field::Double(v) => Cell::Float(*v),
        Field::Str(s) => Cell::Text(s.clone()),
        _ => Cell::Null,
    }
}
