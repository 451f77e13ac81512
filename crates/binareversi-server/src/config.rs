//! Server configuration read from the environment.

use anyhow::Context;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// What happens when a player's last connection to a running game drops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisconnectPolicy {
    /// Keep the seat forever; the player may reconnect at any time
    #[default]
    Wait,
    /// The opponent wins if the player stays away for longer than `grace`
    Forfeit { grace: Duration },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (`SERVER_ADDR`)
    pub addr: SocketAddr,
    /// JSON seed for the in-memory room store (`ROOMS_FILE`)
    pub rooms_file: Option<PathBuf>,
    /// Set from `FORFEIT_AFTER_SECS`
    pub disconnect_policy: DisconnectPolicy,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let addr = lookup("SERVER_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.into())
            .parse()
            .context("SERVER_ADDR is not a socket address")?;

        let rooms_file = lookup("ROOMS_FILE").map(PathBuf::from);

        let disconnect_policy = match lookup("FORFEIT_AFTER_SECS") {
            Some(secs) => {
                let secs: u64 = secs
                    .parse()
                    .context("FORFEIT_AFTER_SECS must be a whole number of seconds")?;
                DisconnectPolicy::Forfeit {
                    grace: Duration::from_secs(secs),
                }
            }
            None => DisconnectPolicy::Wait,
        };

        Ok(Self {
            addr,
            rooms_file,
            disconnect_policy,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: ([0, 0, 0, 0], 8080).into(),
            rooms_file: None,
            disconnect_policy: DisconnectPolicy::Wait,
        }
    }
}
