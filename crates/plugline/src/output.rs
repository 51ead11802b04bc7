//! Line-protocol output on stdout.
//!
//! Nothing is written until the whole run has completed, so a strict-mode
//! abort leaves stdout empty.

use std::io::{self, Write};

use plugline_core::{LineBuilder, RunReport};

/// Measurement of the run summary line.
const SUMMARY_MEASUREMENT: &str = "plugline";

/// Render all plug lines, plus the `polltime_total` summary when enabled.
///
/// A run that produced no lines renders nothing, summary included.
pub fn render(report: &RunReport, poll_time: bool) -> String {
    let mut out = String::new();
    for line in &report.lines {
        out.push_str(line);
        out.push('\n');
    }
    if poll_time && !report.lines.is_empty() {
        let mut summary = LineBuilder::new(SUMMARY_MEASUREMENT);
        summary.field("polltime_total", report.total_millis);
        if let Some(line) = summary.build() {
            out.push_str(&line.to_string());
            out.push('\n');
        }
    }
    out
}

/// Write rendered output to stdout.
pub fn print_output(output: &str) -> io::Result<()> {
    if output.is_empty() {
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()
}
