//! Settings management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tether_net::SyncConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Client settings, loaded from JSON. Missing sections fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub sync: SyncConfig,
    pub player: PlayerSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub name: String,
    /// Explicit player hash; derived from `name` when absent.
    pub hash: Option<u64>,
}

impl PlayerSettings {
    /// The hash the server identifies this player by.
    pub fn resolved_hash(&self) -> u64 {
        self.hash.unwrap_or_else(|| fnv1a(self.name.as_bytes()))
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            name: "pilot".to_string(),
            hash: None,
        }
    }
}

/// Headless session parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// One-way delay applied to every packet in each direction.
    pub latency_ms: u64,
    /// Interval between server snapshots.
    pub broadcast_interval_ms: u64,
    /// Simulated session length.
    pub duration_secs: f32,
    pub enemies: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            latency_ms: 60,
            broadcast_interval_ms: 50,
            duration_secs: 10.0,
            enemies: 3,
        }
    }
}

impl ClientSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json() {
        let settings = ClientSettings::from_json(
            r#"{ "sync": { "snap_threshold": 3.0 }, "player": { "name": "ada", "hash": 7 } }"#,
        )
        .unwrap();
        assert_eq!(settings.sync.snap_threshold, 3.0);
        assert_eq!(settings.sync.desync_threshold, 100.0);
        assert_eq!(settings.player.resolved_hash(), 7);
        assert_eq!(settings.session, SessionSettings::default());
    }

    #[test]
    fn test_hash_derived_from_name() {
        let a = PlayerSettings {
            name: "ada".into(),
            hash: None,
        };
        let b = PlayerSettings {
            name: "bob".into(),
            hash: None,
        };
        assert_eq!(a.resolved_hash(), a.resolved_hash());
        assert_ne!(a.resolved_hash(), b.resolved_hash());
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
    }

    #[test]
    fn test_load_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("tether-settings-{}.json", std::process::id()));
        let mut settings = ClientSettings::default();
        settings.session.latency_ms = 120;
        std::fs::write(&path, settings.to_json().unwrap()).unwrap();

        let loaded = ClientSettings::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            ClientSettings::load("/definitely/not/here.json"),
            Err(SettingsError::Io { .. })
        ));
        assert!(matches!(
            ClientSettings::from_json("{ not json"),
            Err(SettingsError::Parse(_))
        ));
    }
}
