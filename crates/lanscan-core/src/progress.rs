//! Scan progress reporting

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two phases of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    /// ICMP liveness sweep over every candidate address
    Sweep,
    /// Per-host enrichment of the addresses that answered
    Enrich,
}

impl ScanPhase {
    /// Numeric phase index (0 for the sweep, 1 for enrichment)
    pub fn index(&self) -> u8 {
        match self {
            ScanPhase::Sweep => 0,
            ScanPhase::Enrich => 1,
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanPhase::Sweep => write!(f, "sweep"),
            ScanPhase::Enrich => write!(f, "enrich"),
        }
    }
}

/// A single progress update: `completed` out of `total` units of work in `phase`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub phase: ScanPhase,
    pub completed: usize,
    pub total: usize,
}

impl ProgressReport {
    pub fn new(phase: ScanPhase, completed: usize, total: usize) -> Self {
        Self {
            phase,
            completed,
            total,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }

    /// Completion in percent, 100 for an empty phase
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed.min(self.total) * 100) / self.total) as u8
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.phase, self.completed, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_index() {
        assert_eq!(ScanPhase::Sweep.index(), 0);
        assert_eq!(ScanPhase::Enrich.index(), 1);
    }

    #[test]
    fn test_percent() {
        assert_eq!(ProgressReport::new(ScanPhase::Sweep, 0, 254).percent(), 0);
        assert_eq!(ProgressReport::new(ScanPhase::Sweep, 127, 254).percent(), 50);
        assert_eq!(ProgressReport::new(ScanPhase::Enrich, 3, 3).percent(), 100);
        assert_eq!(ProgressReport::new(ScanPhase::Enrich, 0, 0).percent(), 100);
    }

    #[test]
    fn test_display() {
        let report = ProgressReport::new(ScanPhase::Enrich, 2, 5);
        assert_eq!(report.to_string(), "enrich 2/5");
        assert!(!report.is_finished());
    }
}
