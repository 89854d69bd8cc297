//! The editing session
//!
//! A [`Session`] owns the loaded workbook, the index of the sheet being
//! viewed, and the dense grid materialized from that sheet. Grid edits stay
//! in the grid until the user switches sheets or exports; only then is the
//! grid flushed back into the workbook.
//!
//! ```text
//!            submit_file              finish_load (ok)
//!   Empty ──────────────▶ Busy ─────────────────────▶ Ready
//!     ▲                    │  ▲                          │
//!     └── finish_load ─────┘  └────── submit_file ───────┘
//!         (error, no prior workbook)
//! ```
//!
//! A failed, cancelled or timed-out load returns the session to the state it
//! was in before the file was submitted.

use std::sync::Arc;

use gridsheet_core::{check_rows, from_grid, to_grid, CellValue, Grid, GridRow, Workbook};

use crate::codec::{DefaultCodec, Parser, Serializer};
use crate::config::{SessionConfig, SizeAdvisory};
use crate::error::{Operation, ParseError, PreconditionError, SessionError, SessionResult};
use crate::export::{ExportArtifact, ExportFormat, Exporter};
use crate::scheduler::{ParseHandle, ParseScheduler};

/// Coarse session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No workbook loaded
    Empty,
    /// A workbook is loaded and a grid is materialized for the current sheet
    Ready,
    /// A file is being read; other operations are refused
    Busy,
}

/// The loaded workbook and the view onto its current sheet
#[derive(Debug)]
struct Loaded {
    workbook: Workbook,
    current: usize,
    grid: Grid,
    /// Whether the grid holds edits not yet flushed into `workbook`
    dirty: bool,
}

impl Loaded {
    fn open(workbook: Workbook) -> Self {
        let grid = workbook.worksheet(0).map(to_grid).unwrap_or_default();
        Self {
            workbook,
            current: 0,
            grid,
            dirty: false,
        }
    }

    fn current_name(&self) -> Option<&str> {
        self.workbook.worksheet(self.current).map(|s| s.name())
    }

    fn flush(&mut self) -> SessionResult<()> {
        if !self.dirty {
            return Ok(());
        }
        let name = self
            .current_name()
            .ok_or(PreconditionError::NoWorkbook)?
            .to_string();
        let sheet = from_grid(&name, self.grid.rows(), &self.grid.column_keys())?;
        self.workbook.replace_worksheet(sheet)?;
        self.dirty = false;
        tracing::debug!("Flushed grid into sheet '{}'", name);
        Ok(())
    }

    fn switch_to(&mut self, index: usize) -> SessionResult<()> {
        self.flush()?;
        let sheet = self
            .workbook
            .worksheet(index)
            .ok_or_else(|| PreconditionError::UnknownSheet(format!("#{index}")))?;
        self.grid = to_grid(sheet);
        self.current = index;
        tracing::debug!(
            "Materialized sheet '{}' ({} rows, {} columns)",
            sheet.name(),
            self.grid.row_count(),
            self.grid.column_count()
        );
        Ok(())
    }
}

/// A single-user spreadsheet editing session
pub struct Session {
    config: SessionConfig,
    scheduler: ParseScheduler,
    exporter: Exporter,
    loaded: Option<Loaded>,
    pending: Option<ParseHandle>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("current_sheet", &self.current_sheet())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// A session with the default configuration and codecs
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// A session using [`DefaultCodec`] for reading and writing
    pub fn with_config(config: SessionConfig) -> Self {
        let codec = DefaultCodec::new().with_csv_write_options(config.csv.clone());
        Self::with_codec(config, Arc::new(codec.clone()), Arc::new(codec))
    }

    /// A session with its own parser and serializer
    pub fn with_codec(
        config: SessionConfig,
        parser: Arc<dyn Parser>,
        serializer: Arc<dyn Serializer>,
    ) -> Self {
        let exporter = Exporter::new(serializer, config.single_sheet_policy);
        Self {
            config,
            scheduler: ParseScheduler::new(parser),
            exporter,
            loaded: None,
            pending: None,
        }
    }

    /// Settings the session was built with
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Busy while a file is being read, otherwise Ready once a workbook is loaded
    pub fn state(&self) -> SessionState {
        if self.pending.is_some() {
            SessionState::Busy
        } else if self.loaded.is_some() {
            SessionState::Ready
        } else {
            SessionState::Empty
        }
    }

    /// True while a file is being read
    pub fn is_busy(&self) -> bool {
        self.state() == SessionState::Busy
    }

    /// Warning to confirm before submitting a file of `len` bytes, if it is large
    pub fn size_advisory(&self, len: usize) -> Option<SizeAdvisory> {
        SizeAdvisory::check(len, self.config.large_file_threshold)
    }

    // === Loading ===

    /// Start reading a file in the background.
    ///
    /// The session is Busy until [`finish_load`](Session::finish_load)
    /// returns. A file submitted while another is being read is refused and
    /// the read in progress continues.
    pub fn submit_file(&mut self, bytes: impl Into<Vec<u8>>) -> SessionResult<()> {
        self.ensure_idle(Operation::LoadFile)?;
        let handle = self.scheduler.submit(bytes.into())?;
        tracing::debug!(
            "Session {:?} -> Busy: reading {} bytes",
            self.state(),
            handle.size()
        );
        self.pending = Some(handle);
        Ok(())
    }

    /// Wait for the submitted file and install its workbook.
    ///
    /// On success the first sheet becomes current. On failure the previous
    /// workbook, if any, is kept untouched.
    pub async fn finish_load(&mut self) -> SessionResult<()> {
        let handle = self.pending.take().ok_or(PreconditionError::NoPendingLoad)?;
        let size = handle.size();

        let result = match handle.wait().await {
            Ok(workbook) if workbook.is_empty() => Err(ParseError::Malformed(
                "Workbook contains no sheets".into(),
            )),
            other => other,
        };

        match result {
            Ok(workbook) => {
                tracing::info!(
                    "Loaded {} sheet(s) from {} bytes",
                    workbook.sheet_count(),
                    size
                );
                self.loaded = Some(Loaded::open(workbook));
                tracing::debug!("Session Busy -> Ready");
                Ok(())
            }
            Err(source) => {
                tracing::warn!("Failed to read file of {} bytes: {}", size, source);
                tracing::debug!("Session Busy -> {:?}", self.state());
                Err(SessionError::Parse { source, size })
            }
        }
    }

    /// Read a file and install its workbook
    pub async fn load_file(&mut self, bytes: impl Into<Vec<u8>>) -> SessionResult<()> {
        self.submit_file(bytes)?;
        self.finish_load().await
    }

    /// Stop the file being read; the pending
    /// [`finish_load`](Session::finish_load) fails with
    /// [`ParseError::Cancelled`]
    pub fn cancel_load(&mut self) -> SessionResult<()> {
        let handle = self
            .pending
            .as_ref()
            .ok_or(PreconditionError::NoPendingLoad)?;
        handle.cancel();
        tracing::debug!("Cancelled read of {} bytes", handle.size());
        Ok(())
    }

    // === Sheets ===

    /// Switch the grid to another sheet, flushing edits to the current one first
    pub fn select_sheet(&mut self, name: &str) -> SessionResult<()> {
        self.ensure_idle(Operation::SelectSheet)?;
        let loaded = self.loaded.as_mut().ok_or(PreconditionError::NoWorkbook)?;
        let index = loaded
            .workbook
            .sheet_index(name)
            .ok_or_else(|| PreconditionError::UnknownSheet(name.to_string()))?;
        loaded.switch_to(index)
    }

    /// Switch the grid to the sheet at `index` in workbook order
    pub fn select_sheet_index(&mut self, index: usize) -> SessionResult<()> {
        self.ensure_idle(Operation::SelectSheet)?;
        let loaded = self.loaded.as_mut().ok_or(PreconditionError::NoWorkbook)?;
        loaded.switch_to(index)
    }

    /// Sheet names in workbook order; empty when nothing is loaded
    pub fn sheet_names(&self) -> Vec<&str> {
        self.loaded
            .as_ref()
            .map(|l| l.workbook.sheet_names().collect())
            .unwrap_or_default()
    }

    /// Name of the sheet shown in the grid
    pub fn current_sheet(&self) -> Option<&str> {
        self.loaded.as_ref().and_then(Loaded::current_name)
    }

    /// Position of the sheet shown in the grid, in workbook order
    pub fn current_sheet_index(&self) -> Option<usize> {
        self.loaded.as_ref().map(|l| l.current)
    }

    /// The loaded workbook.
    ///
    /// Edits made through the grid show up here only after the next sheet
    /// switch or export.
    pub fn workbook(&self) -> Option<&Workbook> {
        self.loaded.as_ref().map(|l| &l.workbook)
    }

    // === Editing ===

    /// The grid of the current sheet
    pub fn grid(&self) -> Option<&Grid> {
        self.loaded.as_ref().map(|l| &l.grid)
    }

    /// Replace the rows of the current grid. The column descriptors stay as
    /// they were; the workbook is not touched until the next flush.
    ///
    /// Rows holding values outside the sheet limits are rejected and the
    /// grid is left as it was.
    pub fn edit_grid(&mut self, rows: Vec<GridRow>) -> SessionResult<()> {
        self.ensure_idle(Operation::EditGrid)?;
        let loaded = self.loaded.as_mut().ok_or(PreconditionError::NoWorkbook)?;
        check_rows(&rows)?;
        loaded.grid.replace_rows(rows);
        loaded.dirty = true;
        Ok(())
    }

    /// Change one grid cell, growing the grid if needed. Positions outside
    /// the sheet limits are rejected.
    pub fn set_cell(
        &mut self,
        row: usize,
        col: usize,
        value: impl Into<CellValue>,
    ) -> SessionResult<()> {
        self.ensure_idle(Operation::EditGrid)?;
        let loaded = self.loaded.as_mut().ok_or(PreconditionError::NoWorkbook)?;
        loaded.grid.set_cell(row, col, value.into())?;
        loaded.dirty = true;
        Ok(())
    }

    // === Export ===

    /// Serialize the workbook, including unflushed grid edits, as `format`
    pub fn export(&mut self, format: ExportFormat) -> SessionResult<ExportArtifact> {
        self.ensure_idle(Operation::Export)?;
        let loaded = self.loaded.as_mut().ok_or(PreconditionError::NoWorkbook)?;
        loaded.flush()?;

        let bytes = self
            .exporter
            .export(&loaded.workbook, format, loaded.current)
            .map_err(|e| {
                tracing::warn!("Export to {} failed: {}", format, e);
                e
            })?;

        let file_name = format!("{}.{}", self.config.export_base_name, format.extension());
        tracing::info!("Exported {} ({} bytes)", file_name, bytes.len());
        Ok(ExportArtifact {
            file_name,
            format,
            bytes,
        })
    }

    fn ensure_idle(&self, operation: Operation) -> Result<(), PreconditionError> {
        if self.pending.is_some() {
            tracing::warn!("Rejected {}: a file is being read", operation);
            return Err(PreconditionError::Busy(operation));
        }
        Ok(())
    }
}
