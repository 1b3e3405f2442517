//! Validation
//!
//! A validator consumes a byte stream and reports into an [`ErrorCollector`].
//! Schema validators live outside this crate and plug in through
//! [`SchemaValidator`]; [`WellFormedness`] is the built-in structural pass.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::config::Config;
use crate::diagnostics::{ErrorCollector, ErrorKind, ErrorRecord, UnitLink};
use crate::error::{Error, Result};
use crate::index::{FragmentIndex, StructuralIndexer};

/// Something that checks a document stream
pub trait SchemaValidator: Send + Sync {
    /// Read `input` to the end, reporting problems into `sink`.
    ///
    /// Problems in the document go to the sink; `Err` means the validator
    /// itself could not run.
    fn validate(&self, input: &mut dyn Read, sink: &ErrorCollector) -> Result<()>;
}

/// Structural well-formedness pass (tag matching, unterminated markup)
#[derive(Debug, Clone)]
pub struct WellFormedness {
    indexer: StructuralIndexer,
}

impl WellFormedness {
    pub fn new(config: &Config) -> Self {
        Self {
            indexer: StructuralIndexer::new(config),
        }
    }
}

impl SchemaValidator for WellFormedness {
    fn validate(&self, input: &mut dyn Read, sink: &ErrorCollector) -> Result<()> {
        let report = self.indexer.index(input);
        for record in report.errors {
            sink.add_record(record);
        }
        Ok(())
    }
}

/// Result of one validation run
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ErrorRecord>,
    pub error_count: usize,
    pub warning_count: usize,
    pub elapsed: Duration,
    /// Bytes validated
    pub file_size: u64,
    /// No error-severity records
    pub success: bool,
    pub limit_reached: bool,
}

impl ValidationReport {
    pub fn new(errors: Vec<ErrorRecord>, elapsed: Duration, file_size: u64) -> Self {
        let warning_count = errors.iter().filter(|e| e.is_warning()).count();
        // The truncation sentinel is not a finding of its own
        let error_count = errors
            .iter()
            .filter(|e| !e.is_warning() && e.kind != ErrorKind::LimitReached)
            .count();
        let limit_reached = errors.iter().any(|e| e.kind == ErrorKind::LimitReached);
        Self {
            errors,
            error_count,
            warning_count,
            elapsed,
            file_size,
            success: error_count == 0,
            limit_reached,
        }
    }

    /// One-line summary for logs and clients
    pub fn summary(&self) -> String {
        let status = if self.success { "valid" } else { "invalid" };
        let mut line = format!(
            "{status}: {} error(s), {} warning(s) in {} bytes ({:.1?})",
            self.error_count, self.warning_count, self.file_size, self.elapsed
        );
        if self.limit_reached {
            line.push_str(", output truncated");
        }
        line
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Run `validator` over a stream and build the report
pub fn run_validator(
    validator: &dyn SchemaValidator,
    input: &mut dyn Read,
    file_size: u64,
    max_errors: usize,
) -> Result<ValidationReport> {
    let started = Instant::now();
    let collector = ErrorCollector::with_limit(max_errors);
    validator.validate(input, &collector)?;
    Ok(ValidationReport::new(collector.take(), started.elapsed(), file_size))
}

/// Attach the enclosing unit (id and line span) to each record that falls
/// inside one. Records on lines outside every unit are left alone.
pub fn link_errors(errors: &mut [ErrorRecord], index: &FragmentIndex) {
    for record in errors.iter_mut() {
        if record.line == 0 {
            continue;
        }
        if let Some(fragment) = index.fragment_at_line(record.line) {
            record.unit = Some(UnitLink {
                unit: fragment.id(),
                start_line: fragment.start_line,
                end_line: fragment.end_line,
            });
        }
    }
}

/// Well-formedness check of many files in parallel, one report per path
pub fn validate_files(paths: &[PathBuf], config: &Config) -> Vec<(PathBuf, Result<ValidationReport>)> {
    let validator = WellFormedness::new(config);
    paths
        .par_iter()
        .map(|path| {
            let report = validate_file(&validator, path, config.max_errors);
            (path.clone(), report)
        })
        .collect()
}

fn validate_file(validator: &WellFormedness, path: &Path, max_errors: usize) -> Result<ValidationReport> {
    let mut file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let size = file.metadata().map_err(|e| Error::io(path, e))?.len();
    let report = run_validator(validator, &mut file, size, max_errors)?;
    tracing::debug!(path = %path.display(), summary = %report.summary(), "file validated");
    Ok(report)
}
