//! AllStarLink control interface.
//!
//! Everything the panel asks of Asterisk goes through the [`ControlLink`]
//! trait, so the state machine never touches process spawning directly. The
//! production implementation shells out to `asterisk -rx` via sudo, the way
//! the AllStarLink tooling expects, with a bounded timeout per invocation.

use std::io;
use std::process::{Command, Output, Stdio};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::app::Event;

/// Report lines before the per-link rows in `rpt lstats` output.
const LSTATS_HEADER_LINES: usize = 2;

/// Peer link snapshot produced by each status poll.
///
/// The two failure states are distinct from a legitimately empty peer list
/// so the panel never shows "None" while the control interface is down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerStatus {
    /// Successful query: ids of ESTABLISHED links, in report order.
    Linked(Vec<String>),
    /// The control interface answered with an error.
    ControlError,
    /// The control interface is not present (asterisk or sudo not found).
    Unavailable,
}

impl PeerStatus {
    /// Connected peer ids; empty for the sentinel states.
    pub fn peers(&self) -> &[String] {
        match self {
            PeerStatus::Linked(peers) => peers,
            _ => &[],
        }
    }
}

/// Error from a connect/disconnect command.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("control command failed: {0}")]
    Command(String),
    #[error("control command timed out")]
    Timeout,
    #[error("control interface unavailable")]
    Unavailable,
    #[error("control command I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Narrow seam between the state machine and the radio-control backend.
pub trait ControlLink {
    /// Query currently linked peers for `node`.
    fn link_status(&self, node: &str) -> PeerStatus;
    /// Link `peer` to `node`; returns the textual ack.
    fn connect(&self, node: &str, peer: &str) -> Result<String, ControlError>;
    /// Unlink `peer` from `node`; returns the textual ack.
    fn disconnect(&self, node: &str, peer: &str) -> Result<String, ControlError>;
}

/// `asterisk -rx` command executor.
pub struct AsteriskCli {
    timeout: Duration,
}

impl AsteriskCli {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run one `asterisk -rx <request>` invocation under the timeout.
    fn rx(&self, request: &str) -> Result<Output, ControlError> {
        let mut cmd = Command::new("sudo");
        cmd.args(["asterisk", "-rx", request]);
        run_with_timeout(&mut cmd, self.timeout)
    }

    /// Run a link-control command, mapping a non-zero exit to an error.
    fn ilink(&self, node: &str, function: u8, peer: &str) -> Result<String, ControlError> {
        let request = format!("rpt cmd {node} ilink {function} {peer}");
        let output = self.rx(&request)?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let text = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(ControlError::Command(text))
        }
    }
}

impl ControlLink for AsteriskCli {
    fn link_status(&self, node: &str) -> PeerStatus {
        match self.rx(&format!("rpt lstats {node}")) {
            Ok(output) if output.status.success() => {
                PeerStatus::Linked(parse_link_status(&String::from_utf8_lossy(&output.stdout)))
            }
            Ok(output) => {
                tracing::warn!(
                    "lstats failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                PeerStatus::ControlError
            }
            Err(ControlError::Unavailable) => PeerStatus::Unavailable,
            Err(e) => {
                tracing::warn!("lstats error: {}", e);
                PeerStatus::ControlError
            }
        }
    }

    fn connect(&self, node: &str, peer: &str) -> Result<String, ControlError> {
        self.ilink(node, 3, peer)
    }

    fn disconnect(&self, node: &str, peer: &str) -> Result<String, ControlError> {
        self.ilink(node, 1, peer)
    }
}

/// Extract connected peer ids from an `rpt lstats` report.
///
/// The first two lines are header. A link counts when its line contains
/// `ESTABLISHED` and its first whitespace-delimited token is all digits.
fn parse_link_status(report: &str) -> Vec<String> {
    report
        .lines()
        .skip(LSTATS_HEADER_LINES)
        .filter(|line| line.contains("ESTABLISHED"))
        .filter_map(|line| line.split_whitespace().next())
        .filter(|token| !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

/// Spawn, then poll for completion until the deadline; kill on overrun.
///
/// Output is small (a link report or a one-line ack), so collecting it after
/// exit cannot fill the pipe.
fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, ControlError> {
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ControlError::Unavailable,
            _ => ControlError::Io(e),
        })?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait()? {
            Some(_) => break,
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ControlError::Timeout);
            }
            None => thread::sleep(Duration::from_millis(10)),
        }
    }

    Ok(child.wait_with_output()?)
}

/// Spawn the peer status poller.
///
/// Sends a [`PeerStatus`] snapshot every `interval`; the state machine
/// decides whether it is display-worthy. The initial grace period gives
/// Asterisk time to come up after boot.
pub fn spawn_status_poller(
    link: AsteriskCli,
    node: String,
    grace: Duration,
    interval: Duration,
    tx: Sender<Event>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(grace);
        loop {
            let status = link.link_status(&node);
            if tx.send(Event::PeerStatus(status)).is_err() {
                return;
            }
            thread::sleep(interval);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
Connected stations for node 58175
NODE      PEER               RECONNECTS DIRECTION CONNECT TIME    CONNECT STATE
2000      radio@a:4569       0          OUT       00:05:30        ESTABLISHED
555       radio@b:4569       1          IN        00:01:02        CONNECTING
27093     radio@c:4569       0          OUT       01:00:00        ESTABLISHED
";

    #[test]
    fn test_parse_established_links_in_order() {
        assert_eq!(parse_link_status(REPORT), vec!["2000", "27093"]);
    }

    #[test]
    fn test_parse_skips_header_lines() {
        // ESTABLISHED in the header must not produce a peer
        let report = "State header ESTABLISHED\nNODE PEER\n2000 x ESTABLISHED\n";
        assert_eq!(parse_link_status(report), vec!["2000"]);
    }

    #[test]
    fn test_parse_rejects_non_numeric_tokens() {
        let report = "h1\nh2\nnode2000 x ESTABLISHED\n3000 y ESTABLISHED\n";
        assert_eq!(parse_link_status(report), vec!["3000"]);
    }

    #[test]
    fn test_parse_empty_report() {
        assert!(parse_link_status("Connected stations\nNODE PEER\n").is_empty());
        assert!(parse_link_status("").is_empty());
    }

    #[test]
    fn test_sentinel_states_have_no_peers() {
        assert!(PeerStatus::ControlError.peers().is_empty());
        assert!(PeerStatus::Unavailable.peers().is_empty());
        assert_eq!(
            PeerStatus::Linked(vec!["100".to_string()]).peers(),
            ["100".to_string()]
        );
    }
}
