//! Host IP and uptime queries.
//!
//! Both fields fail independently: a broken sub-query shows "Error" in that
//! field only and the rest of the display keeps working.

use std::fs;
use std::process::Command;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::app::Event;

/// Field value shown when a sub-query fails.
const FIELD_ERROR: &str = "Error";

/// Snapshot of host state for the info lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    /// Primary IPv4 address, or "Error"
    pub ip: String,
    /// Uptime as `DD:HH:MM`, or "Error"
    pub uptime: String,
}

/// Query both fields, never failing as a whole.
pub fn query() -> SystemInfo {
    SystemInfo {
        ip: query_ip(),
        uptime: query_uptime(),
    }
}

/// First address reported by `hostname -I`.
fn query_ip() -> String {
    match Command::new("hostname").arg("-I").output() {
        Ok(output) if output.status.success() => {
            let text = String::from_utf8_lossy(&output.stdout);
            match text.split_whitespace().next() {
                Some(ip) => ip.to_string(),
                None => {
                    tracing::warn!("hostname -I returned no address");
                    FIELD_ERROR.to_string()
                }
            }
        }
        Ok(output) => {
            tracing::warn!("hostname -I exited with {}", output.status);
            FIELD_ERROR.to_string()
        }
        Err(e) => {
            tracing::warn!("hostname -I failed: {}", e);
            FIELD_ERROR.to_string()
        }
    }
}

/// Kernel uptime from `/proc/uptime`, formatted `DD:HH:MM`.
fn query_uptime() -> String {
    let seconds = fs::read_to_string("/proc/uptime")
        .ok()
        .and_then(|text| {
            text.split_whitespace()
                .next()
                .and_then(|field| field.parse::<f64>().ok())
        });
    match seconds {
        Some(seconds) => format_uptime(seconds as u64),
        None => {
            tracing::warn!("reading /proc/uptime failed");
            FIELD_ERROR.to_string()
        }
    }
}

/// Zero-padded `DD:HH:MM`.
fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    format!("{days:02}:{hours:02}:{minutes:02}")
}

/// Spawn the system-info poller; every snapshot triggers a redraw.
pub fn spawn_info_poller(interval: Duration, tx: Sender<Event>) -> JoinHandle<()> {
    thread::spawn(move || loop {
        thread::sleep(interval);
        if tx.send(Event::SystemInfo(query())).is_err() {
            return;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime_zero() {
        assert_eq!(format_uptime(0), "00:00:00");
    }

    #[test]
    fn test_format_uptime_rounds_down_to_minutes() {
        assert_eq!(format_uptime(59), "00:00:00");
        assert_eq!(format_uptime(60), "00:00:01");
    }

    #[test]
    fn test_format_uptime_days_hours_minutes() {
        assert_eq!(format_uptime(86_400 + 3_600 + 60), "01:01:01");
        assert_eq!(format_uptime(2 * 86_400 + 23 * 3_600 + 59 * 60 + 59), "02:23:59");
    }

    #[test]
    fn test_format_uptime_long_runs_keep_all_day_digits() {
        assert_eq!(format_uptime(100 * 86_400), "100:00:00");
    }
}
