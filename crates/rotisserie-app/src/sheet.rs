// Spreadsheet mirror of the draft grid.
//
// Layout: row 1 is a header (`Players`, then one column per player in
// seating order), column 1 holds pick numbers. Rows and columns are 1-based,
// so the first pick lands at (2, 2).

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("failed to write sheet {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("failed to write sheet {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cell ({row}, {column}) is outside the sheet")]
    OutOfRange { row: u32, column: u32 },

    #[error("sheet unavailable: {0}")]
    Unavailable(String),
}

/// Write-only mirror of pick placement. The engine never reads it back.
#[async_trait]
pub trait SheetSink: Send + Sync {
    async fn initialize(&self, names: &[String], pick_count: usize) -> Result<(), SheetError>;
    async fn place(&self, value: &str, row: u32, column: u32) -> Result<(), SheetError>;
    async fn clear(&self) -> Result<(), SheetError>;
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SheetGrid {
    rows: Vec<Vec<String>>,
}

impl SheetGrid {
    pub fn new(names: &[String], pick_count: usize) -> Self {
        let mut header = vec!["Players".to_string()];
        header.extend(names.iter().cloned());
        let width = header.len();

        let mut rows = vec![header];
        for pick in 1..=pick_count {
            let mut row = vec![String::new(); width];
            row[0] = pick.to_string();
            rows.push(row);
        }
        Self { rows }
    }

    pub fn set(&mut self, value: &str, row: u32, column: u32) -> Result<(), SheetError> {
        let cell = match ((row as usize).checked_sub(1), (column as usize).checked_sub(1)) {
            (Some(r), Some(c)) => self.rows.get_mut(r).and_then(|cells| cells.get_mut(c)),
            _ => None,
        }
        .ok_or(SheetError::OutOfRange { row, column })?;
        *cell = value.to_string();
        Ok(())
    }

    /// Cell text at a 1-based position.
    pub fn get(&self, row: u32, column: u32) -> Option<&str> {
        let r = (row as usize).checked_sub(1)?;
        let c = (column as usize).checked_sub(1)?;
        self.rows.get(r)?.get(c).map(String::as_str)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn write_csv(&self, path: &Path) -> Result<(), SheetError> {
        let csv_err = |source| SheetError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(csv_err)?;
        for row in &self.rows {
            writer.write_record(row).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| SheetError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// CsvSheet
// ---------------------------------------------------------------------------

/// Keeps the grid in memory and rewrites the whole CSV file on every change.
pub struct CsvSheet {
    path: PathBuf,
    grid: Mutex<SheetGrid>,
}

impl CsvSheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            grid: Mutex::new(SheetGrid::default()),
        }
    }

    fn update(&self, f: impl FnOnce(&mut SheetGrid) -> Result<(), SheetError>) -> Result<(), SheetError> {
        let mut grid = self
            .grid
            .lock()
            .map_err(|_| SheetError::Unavailable("sheet mutex poisoned".into()))?;
        f(&mut grid)?;
        grid.write_csv(&self.path)
    }
}

#[async_trait]
impl SheetSink for CsvSheet {
    async fn initialize(&self, names: &[String], pick_count: usize) -> Result<(), SheetError> {
        debug!(path = %self.path.display(), players = names.len(), pick_count, "initializing sheet");
        self.update(|grid| {
            *grid = SheetGrid::new(names, pick_count);
            Ok(())
        })
    }

    async fn place(&self, value: &str, row: u32, column: u32) -> Result<(), SheetError> {
        self.update(|grid| grid.set(value, row, column))
    }

    async fn clear(&self) -> Result<(), SheetError> {
        self.update(|grid| {
            *grid = SheetGrid::default();
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// MemorySheet
// ---------------------------------------------------------------------------

/// In-memory sink for tests. Can be switched to fail every write.
#[derive(Default)]
pub struct MemorySheet {
    grid: Mutex<SheetGrid>,
    failing: bool,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every call fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Copy of the current grid.
    pub fn grid(&self) -> SheetGrid {
        self.grid.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn update(&self, f: impl FnOnce(&mut SheetGrid) -> Result<(), SheetError>) -> Result<(), SheetError> {
        if self.failing {
            return Err(SheetError::Unavailable("memory sheet set to fail".into()));
        }
        let mut grid = self
            .grid
            .lock()
            .map_err(|_| SheetError::Unavailable("sheet mutex poisoned".into()))?;
        f(&mut grid)
    }
}

#[async_trait]
impl SheetSink for MemorySheet {
    async fn initialize(&self, names: &[String], pick_count: usize) -> Result<(), SheetError> {
        self.update(|grid| {
            *grid = SheetGrid::new(names, pick_count);
            Ok(())
        })
    }

    async fn place(&self, value: &str, row: u32, column: u32) -> Result<(), SheetError> {
        self.update(|grid| grid.set(value, row, column))
    }

    async fn clear(&self) -> Result<(), SheetError> {
        self.update(|grid| {
            *grid = SheetGrid::default();
            Ok(())
        })
    }
}
