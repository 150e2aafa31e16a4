use std::io::{self, Write};

use anyhow::Result;
use tracing::warn;

use crate::types::CycleReport;

/// Emit a sweep summary as a single JSON line to stdout.
///
/// A report that cannot be written is logged and dropped; it never stops
/// the polling loop.
pub fn report_cycle(report: &CycleReport) {
    if let Err(e) = write_cycle(&mut io::stdout().lock(), report) {
        warn!("Failed to write cycle report: {e:#}");
    }
}

/// Write one sweep summary as a newline-terminated JSON object.
pub fn write_cycle<W: Write>(out: &mut W, report: &CycleReport) -> Result<()> {
    serde_json::to_writer(&mut *out, report)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
