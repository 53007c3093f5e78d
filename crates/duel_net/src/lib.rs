//! # Duel Network Layer
//!
//! Runs a duel between two processes over a byte stream.
//!
//! Both peers hold a full copy of both combatants. The acting peer resolves
//! its action locally and announces it; the passive peer replays the same
//! action against its own copy, then mirrors the actor's HP and mana from the
//! snapshot that follows.
//!
//! ## Crate Structure
//!
//! - [`codec`] - Message framing (JSON lines or length-prefixed bincode)
//! - [`connection`] - Single reader task, turn/side routing, shared writer
//! - [`session`] - Bootstrap handshake and the turn loop
//! - [`console`] - Text prompts shared by the console drivers

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

use std::path::Path;

use serde::{Deserialize, Serialize};

pub mod codec;
pub mod connection;
pub mod console;
pub mod error;
pub mod session;

use codec::WireFormat;
use duel_core::duel::DuelConfig;
use error::ConfigError;

/// Network and game configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Port to listen on / connect to.
    pub port: u16,
    /// Address the host binds.
    pub bind_host: String,
    /// Address the guest connects to.
    pub connect_host: String,
    /// Framing used on the wire; both peers must agree.
    pub wire_format: WireFormat,
    /// Character creation and campaign numbers.
    pub duel: DuelConfig,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_host: "0.0.0.0".to_string(),
            connect_host: "127.0.0.1".to_string(),
            wire_format: WireFormat::Json,
            duel: DuelConfig::default(),
        }
    }
}

impl NetConfig {
    /// Load a config from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or not valid RON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid RON.
    pub fn from_ron_str(ron_text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(ron_text)?)
    }

    /// `bind_host:port`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// `connect_host:port`.
    #[must_use]
    pub fn connect_addr(&self) -> String {
        format!("{}:{}", self.connect_host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NetConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.wire_format, WireFormat::Json);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_partial_ron() {
        let config =
            NetConfig::from_ron_str("(port: 9000, wire_format: Bincode, duel: (start_gold: 500))")
                .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.wire_format, WireFormat::Bincode);
        assert_eq!(config.duel.start_gold, 500);
        assert_eq!(config.duel.start_hp, 100);
        assert_eq!(config.connect_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_missing_file() {
        let err = NetConfig::load("does/not/exist.ron").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
