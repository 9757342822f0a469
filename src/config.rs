//! Configuration: application settings and the node file.
//!
//! Two inputs, both read once at startup:
//!
//! ```text
//! ~/.config/aslpanel/config.ini     optional tuning (pins, paths, intervals)
//! ~/.config/aslpanel/favourites.txt node number + favorites (path
//!                                   overridable via config.ini)
//! ```
//!
//! The favourites file is the interface shared with the node's shell
//! tooling: the first non-empty line is the AllStarLink node number, each
//! following line is `friendly_name,peer_id`. Malformed favorite lines are
//! skipped; only the first six favorites are kept.

use anyhow::{Context, Result};
use configparser::ini::Ini;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum favorites shown in the menu (panel height limit).
pub const MAX_FAVORITES: usize = 6;

/// A user-curated quick-connect entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Favorite {
    /// Friendly name shown on the panel
    pub name: String,
    /// Numeric AllStarLink node id
    pub peer_id: String,
}

/// Node identity and favorites loaded from the favourites file.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// This node's AllStarLink number (all digits)
    pub node_number: String,
    /// Quick-connect entries, file order, at most [`MAX_FAVORITES`]
    pub favorites: Vec<Favorite>,
}

/// Application configuration loaded from `~/.config/aslpanel/config.ini`
#[derive(Debug, Clone)]
pub struct Config {
    // [general]
    /// Path of the favourites file (node number + favorites)
    pub favourites_file: PathBuf,
    /// System-info refresh interval in seconds
    pub info_refresh_secs: u64,

    // [display]
    /// SPI device node for the panel
    pub spi_device: String,
    /// Data/command GPIO for the panel
    pub dc_pin: u64,
    /// Backlight GPIO, driven high at startup
    pub backlight_pin: u64,

    // [buttons]
    /// Cycle button GPIO (active low)
    pub button_a_pin: u64,
    /// Confirm button GPIO (active low)
    pub button_b_pin: u64,

    // [control]
    /// Peer status poll interval in seconds
    pub peer_poll_secs: u64,
    /// Upper bound on a single asterisk invocation, in seconds
    pub command_timeout_secs: u64,
    /// Delay before the first peer poll, giving Asterisk time to come up
    pub startup_grace_secs: u64,
}

impl Config {
    /// Build the default config, using the given config_dir as the base.
    /// Pin numbers match the Adafruit Mini PiTFT wiring.
    fn default_for(config_dir: &Path) -> Self {
        Self {
            favourites_file: config_dir.join("favourites.txt"),
            info_refresh_secs: 10,
            spi_device: "/dev/spidev0.0".to_string(),
            dc_pin: 25,
            backlight_pin: 22,
            button_a_pin: 23,
            button_b_pin: 24,
            peer_poll_secs: 5,
            command_timeout_secs: 10,
            startup_grace_secs: 10,
        }
    }

    /// Load config from an INI file, falling back to defaults for missing keys.
    fn load_from_ini(path: &Path, config_dir: &Path) -> Result<Self> {
        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        let defaults = Config::default_for(config_dir);

        let favourites_file = ini
            .get("general", "favourites_file")
            .map(|s| expand_tilde(&s))
            .unwrap_or(defaults.favourites_file);

        let info_refresh_secs = ini
            .getuint("general", "info_refresh_secs")
            .ok()
            .flatten()
            .unwrap_or(defaults.info_refresh_secs);

        let spi_device = ini
            .get("display", "spi_device")
            .unwrap_or(defaults.spi_device);

        let dc_pin = ini
            .getuint("display", "dc_pin")
            .ok()
            .flatten()
            .unwrap_or(defaults.dc_pin);

        let backlight_pin = ini
            .getuint("display", "backlight_pin")
            .ok()
            .flatten()
            .unwrap_or(defaults.backlight_pin);

        let button_a_pin = ini
            .getuint("buttons", "button_a_pin")
            .ok()
            .flatten()
            .unwrap_or(defaults.button_a_pin);

        let button_b_pin = ini
            .getuint("buttons", "button_b_pin")
            .ok()
            .flatten()
            .unwrap_or(defaults.button_b_pin);

        let peer_poll_secs = ini
            .getuint("control", "peer_poll_secs")
            .ok()
            .flatten()
            .unwrap_or(defaults.peer_poll_secs);

        let command_timeout_secs = ini
            .getuint("control", "command_timeout_secs")
            .ok()
            .flatten()
            .unwrap_or(defaults.command_timeout_secs);

        let startup_grace_secs = ini
            .getuint("control", "startup_grace_secs")
            .ok()
            .flatten()
            .unwrap_or(defaults.startup_grace_secs);

        Ok(Self {
            favourites_file,
            info_refresh_secs,
            spi_device,
            dc_pin,
            backlight_pin,
            button_a_pin,
            button_b_pin,
            peer_poll_secs,
            command_timeout_secs,
            startup_grace_secs,
        })
    }

    /// Load the application config, using defaults when no config.ini exists.
    pub fn load() -> Result<Self> {
        let config_dir = resolve_config_dir()
            .unwrap_or_else(|| PathBuf::from(".").join("aslpanel"));
        let path = config_dir.join("config.ini");
        if path.exists() {
            let config = Self::load_from_ini(&path, &config_dir)
                .with_context(|| format!("parsing {}", path.display()))?;
            tracing::info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            Ok(Self::default_for(&config_dir))
        }
    }
}

/// `~/.config/aslpanel`, or `None` when no home directory is resolvable.
fn resolve_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("aslpanel"))
}

/// Expand a leading `~/` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Load the node number and favorites from the favourites file.
///
/// Fatal on a missing file or an invalid node number; malformed favorite
/// lines are skipped so one bad entry cannot take the panel down.
pub fn load_node_config(path: &Path) -> Result<NodeConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;

    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let node_number = lines.next().context("favourites file is empty")?;
    if !node_number.chars().all(|c| c.is_ascii_digit()) {
        anyhow::bail!(
            "invalid node number {:?}: expected an all-digit first line",
            node_number
        );
    }

    let mut favorites = Vec::new();
    for line in lines {
        if favorites.len() == MAX_FAVORITES {
            break;
        }
        match parse_favorite(line) {
            Some(favorite) => favorites.push(favorite),
            None => tracing::debug!("Skipping malformed favorites line {:?}", line),
        }
    }

    Ok(NodeConfig {
        node_number: node_number.to_string(),
        favorites,
    })
}

/// Parse one `friendly_name,peer_id` line; `None` if malformed.
fn parse_favorite(line: &str) -> Option<Favorite> {
    let (name, peer_id) = line.split_once(',')?;
    let name = name.trim();
    let peer_id = peer_id.trim();
    if name.is_empty() || peer_id.is_empty() || !peer_id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(Favorite {
        name: name.to_string(),
        peer_id: peer_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_node_file(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favourites.txt");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_node_file_round_trip() {
        let (_dir, path) = write_node_file("58175\nHome,12345\n");
        let node = load_node_config(&path).unwrap();
        assert_eq!(node.node_number, "58175");
        assert_eq!(
            node.favorites,
            vec![Favorite {
                name: "Home".to_string(),
                peer_id: "12345".to_string(),
            }]
        );
    }

    #[test]
    fn test_malformed_favorite_lines_skipped() {
        let (_dir, path) = write_node_file(
            "58175\nno comma here\nHome,12345\nBad,12a45\n,2000\nRepeater,2000\n",
        );
        let node = load_node_config(&path).unwrap();
        let ids: Vec<&str> = node.favorites.iter().map(|f| f.peer_id.as_str()).collect();
        assert_eq!(ids, vec!["12345", "2000"]);
    }

    #[test]
    fn test_favorites_truncated_to_six() {
        let mut contents = String::from("58175\n");
        for i in 0..10 {
            contents.push_str(&format!("Node{i},{}\n", 1000 + i));
        }
        let (_dir, path) = write_node_file(&contents);
        let node = load_node_config(&path).unwrap();
        assert_eq!(node.favorites.len(), MAX_FAVORITES);
        assert_eq!(node.favorites[0].peer_id, "1000");
        assert_eq!(node.favorites[5].peer_id, "1005");
    }

    #[test]
    fn test_invalid_node_number_is_fatal() {
        let (_dir, path) = write_node_file("node-58175\nHome,12345\n");
        assert!(load_node_config(&path).is_err());
    }

    #[test]
    fn test_empty_file_is_fatal() {
        let (_dir, path) = write_node_file("\n\n");
        assert!(load_node_config(&path).is_err());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_node_config(&dir.path().join("nope.txt")).is_err());
    }
}
