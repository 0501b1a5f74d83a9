use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tally_journal::{JournalConfig, SyncMode};
use tally_ledger::LedgerConfig;
use tally_types::Address;

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_PORT: u16 = 7878;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_journal_path")]
    pub journal_path: PathBuf,
    #[serde(default)]
    pub sync_every_write: bool,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    pub ledger: LedgerConfig,
}

impl ServerConfig {
    pub fn new(authority: Address) -> Self {
        Self {
            bind_addr: default_bind_addr(),
            journal_path: default_journal_path(),
            sync_every_write: false,
            channel_capacity: default_channel_capacity(),
            ledger: LedgerConfig::new(authority),
        }
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> ServerResult<()> {
        let text = toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn journal_config(&self) -> JournalConfig {
        JournalConfig {
            sync_mode: if self.sync_every_write {
                SyncMode::EveryWrite
            } else {
                SyncMode::OsDefault
            },
            channel_capacity: self.channel_capacity,
        }
    }

    /// Journal path resolved against the directory holding the config file.
    /// Whether only local clients can reach the bind address.
    pub fn is_loopback_only(&self) -> bool {
        self.bind_addr.ip().is_loopback()
    }

    pub fn journal_path_relative_to(&self, config_path: &Path) -> PathBuf {
        match config_path.parent() {
            Some(dir) if self.journal_path.is_relative() => dir.join(&self.journal_path),
            _ => self.journal_path.clone(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT))
}

fn default_journal_path() -> PathBuf {
    PathBuf::from("tally.wal")
}

fn default_channel_capacity() -> usize {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ServerConfig::new(Address::zero());
        assert_eq!(c.bind_addr, "127.0.0.1:7878".parse::<SocketAddr>().unwrap());
        assert_eq!(c.journal_path, PathBuf::from("tally.wal"));
        assert_eq!(c.ledger.candidate_window_secs, 1);
        assert_eq!(c.journal_config().sync_mode, SyncMode::OsDefault);
    }

    #[test]
    fn loopback_detection() {
        let mut c = ServerConfig::new(Address::zero());
        assert!(c.is_loopback_only());
        c.bind_addr = "0.0.0.0:7878".parse().unwrap();
        assert!(!c.is_loopback_only());
        c.bind_addr = "[::1]:7878".parse().unwrap();
        assert!(c.is_loopback_only());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        let mut config = ServerConfig::new(Address::from_bytes([0xab; 20]));
        config.sync_every_write = true;
        config.save(&path).unwrap();

        let loaded = ServerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.journal_config().sync_mode, SyncMode::EveryWrite);
    }

    #[test]
    fn minimal_file_fills_defaults() {
        let text = "[ledger]\nauthority = \"0xabababababababababababababababababababab\"\n";
        let config: ServerConfig = toml::from_str(text).unwrap();
        assert_eq!(config.ledger.authority, Address::from_bytes([0xab; 20]));
        assert_eq!(config.channel_capacity, 1024);
        assert!(!config.sync_every_write);
    }

    #[test]
    fn journal_path_follows_config_dir() {
        let config = ServerConfig::new(Address::zero());
        assert_eq!(
            config.journal_path_relative_to(Path::new("/etc/tally/tally.toml")),
            PathBuf::from("/etc/tally/tally.wal")
        );
    }
}
