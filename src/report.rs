//! Quality-control report helpers
//!
//! The alignment rate is read from the aligner's log with a fixed rule:
//! take the last non-empty line, split it on the first `%` and keep the left
//! part. Downstream consumers of `report.tsv` depend on this exact rule, so it
//! must not be made "smarter".

use crate::error::{PipelineError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Row label for the alignment rate in `report.tsv`
pub const READS_ALIGNED_LABEL: &str = "Reads aligned (%)";

/// File name of the quality report inside the quality-control directory
pub const REPORT_FILE: &str = "report.tsv";

/// Where MetaQUAST leaves its combined report
pub const COMBINED_REPORT: &str = "combined_reference/report.tsv";

/// Extract the alignment rate from log text
///
/// `"97.34% overall alignment rate"` yields `"97.34"`. A line without `%`
/// is returned whole. `None` when the log has no non-empty line.
pub fn parse_alignment_rate(log: &str) -> Option<&str> {
    let last = log.lines().rev().find(|line| !line.trim().is_empty())?;
    Some(last.split('%').next().unwrap_or(last))
}

/// Read a log file and extract the alignment rate from it
pub fn read_alignment_rate(log_path: &Path) -> Result<String> {
    let content = fs::read_to_string(log_path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => PipelineError::MissingFile {
            path: log_path.to_path_buf(),
        },
        _ => PipelineError::io(log_path, source),
    })?;

    parse_alignment_rate(&content)
        .map(str::to_string)
        .ok_or_else(|| PipelineError::Report {
            path: log_path.to_path_buf(),
            reason: "log has no non-empty line".to_string(),
        })
}

/// Append one `label\tvalue` row, creating the file if needed
pub fn append_report_row(report: &Path, label: &str, value: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(report)
        .map_err(|e| PipelineError::io(report, e))?;
    writeln!(file, "{}\t{}", label, value).map_err(|e| PipelineError::io(report, e))?;
    debug!("Appended '{}' row to {}", label, report.display());
    Ok(())
}

/// Move MetaQUAST's combined report up into the quality-control directory
///
/// Returns the path of `<qc_dir>/report.tsv` whether or not anything moved.
pub fn promote_combined_report(qc_dir: &Path) -> Result<PathBuf> {
    let combined = qc_dir.join(COMBINED_REPORT);
    let report = qc_dir.join(REPORT_FILE);
    if combined.is_file() {
        fs::rename(&combined, &report).map_err(|e| PipelineError::io(&combined, e))?;
        debug!("Moved {} to {}", combined.display(), report.display());
    }
    Ok(report)
}

/// Result of finalizing the quality report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityReport {
    pub path: PathBuf,
    /// Percentage string exactly as extracted from the log
    pub reads_aligned: String,
}

/// Promote the MetaQUAST report and append the alignment rate to it
pub fn finalize_quality_report(qc_dir: &Path, alignment_log: &Path) -> Result<QualityReport> {
    let reads_aligned = read_alignment_rate(alignment_log)?;
    let path = promote_combined_report(qc_dir)?;
    append_report_row(&path, READS_ALIGNED_LABEL, &reads_aligned)?;
    info!("{}: {}", READS_ALIGNED_LABEL, reads_aligned);
    Ok(QualityReport { path, reads_aligned })
}
