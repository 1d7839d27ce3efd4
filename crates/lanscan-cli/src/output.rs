//! Result printing

use anyhow::Result;
use lanscan_core::{ProgressReport, ScanResult};
use lanscan_discovery::ScanSummary;
use serde::Serialize;

/// Placeholder for a fact that was not found
const ABSENT: &str = "-";

/// One aligned line per host: address, latency, MAC, name, port/status
pub fn host_line(result: &ScanResult) -> String {
    let latency = result.latency_text().unwrap_or_else(|| ABSENT.to_string());
    let mac = result
        .hardware_address
        .map(|mac| mac.to_string())
        .unwrap_or_else(|| ABSENT.to_string());
    let name = result.host_name.as_deref().unwrap_or(ABSENT);

    format!(
        "{:<15}  {:>6}  {:<17}  {:<24}  {}/{}",
        result.address, latency, mac, name, result.port, result.port_status
    )
}

pub fn summary_line(summary: &ScanSummary) -> String {
    let mut line = format!(
        "Scanned {}: {} candidates, {} responded, {} reported in {:.1}s",
        summary.network,
        summary.candidates,
        summary.responded,
        summary.reported,
        summary.elapsed.as_secs_f64()
    );
    if summary.cancelled {
        line.push_str(" (cancelled)");
    }
    line
}

/// Progress as `[phase/2] name done/total (pct%)`
pub fn progress_line(report: &ProgressReport) -> String {
    format!("[{}/2] {} ({}%)", report.phase.index() + 1, report, report.percent())
}

/// Single-line JSON for `--json` output
pub fn json_line<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}
