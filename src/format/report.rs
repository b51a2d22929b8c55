//! Options and outcome reports for ground truth reads and writes.

use std::path::PathBuf;

use crate::model::ObjectId;

/// Options for write operations.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Also write the full-frame object-id bitmap (needs a known frame size).
    pub export_frame_map: bool,

    /// Pretty-print the JSON document.
    pub pretty_json: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            export_frame_map: false,
            pretty_json: true,
        }
    }
}

impl WriteOptions {
    /// Create new write options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set frame map export.
    pub fn export_frame_map(mut self, export: bool) -> Self {
        self.export_frame_map = export;
        self
    }

    /// Set pretty printing.
    pub fn pretty_json(mut self, pretty: bool) -> Self {
        self.pretty_json = pretty;
        self
    }
}

/// Result of a write operation.
#[derive(Debug, Default)]
pub struct WriteReport {
    /// Number of objects written.
    pub objects_written: usize,

    /// Files created, main document last.
    pub files_created: Vec<PathBuf>,

    /// Warnings generated during the write (e.g., skipped objects).
    pub warnings: Vec<FormatWarning>,
}

impl WriteReport {
    /// Add a warning to the report.
    pub fn add_warning(&mut self, warning: FormatWarning) {
        log::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Check if there were any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Result of a read operation.
#[derive(Debug, Default)]
pub struct ReadReport {
    /// Whether a ground truth document was found at all.
    pub found: bool,

    /// Objects added to the frame.
    pub objects_loaded: usize,

    /// Objects dropped because their id was already present.
    pub duplicates_dropped: usize,

    /// Objects or crops skipped and other problems.
    pub warnings: Vec<FormatWarning>,
}

impl ReadReport {
    /// Add a warning to the report.
    pub fn add_warning(&mut self, warning: FormatWarning) {
        match warning.severity {
            WarningSeverity::Info => log::info!("{}", warning.message),
            WarningSeverity::Warning => log::warn!("{}", warning.message),
            WarningSeverity::Error => log::error!("{}", warning.message),
        }
        self.warnings.push(warning);
    }

    /// Check if there were any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if anything was skipped (error-level warnings).
    pub fn has_errors(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w.severity, WarningSeverity::Error))
    }
}

/// Warning generated while converting ground truth.
#[derive(Debug, Clone)]
pub struct FormatWarning {
    /// Object this warning relates to (if applicable).
    pub object_id: Option<ObjectId>,

    /// File this warning relates to (if applicable).
    pub path: Option<PathBuf>,

    /// Human-readable warning message.
    pub message: String,

    /// Severity level of the warning.
    pub severity: WarningSeverity,
}

impl FormatWarning {
    /// Create a new warning.
    pub fn new(message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            object_id: None,
            path: None,
            message: message.into(),
            severity,
        }
    }

    /// Create an info-level warning.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Info)
    }

    /// Create a warning-level warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Warning)
    }

    /// Create an error-level warning.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Error)
    }

    /// Set the object this warning relates to.
    pub fn with_object(mut self, object_id: ObjectId) -> Self {
        self.object_id = Some(object_id);
        self
    }

    /// Set the file this warning relates to.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Severity level for format warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Informational message, not a problem.
    Info,
    /// Something was modified or left out.
    Warning,
    /// An object or crop was skipped.
    Error,
}
