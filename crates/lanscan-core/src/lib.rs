//! lanscan Core - Types shared by the scanning engine and its front ends
//!
//! This crate provides:
//! - IPv4 subnet arithmetic and host enumeration
//! - Per-host scan results and hardware addresses
//! - Progress reports for the sweep and enrichment phases
//! - Configuration errors raised before a scan starts

pub mod address_space;
pub mod error;
pub mod progress;
pub mod result;

pub use address_space::AddressSpace;
pub use error::{Result, ScanError};
pub use progress::{ProgressReport, ScanPhase};
pub use result::{MacAddress, PortStatus, ScanResult};
