use crate::error::{Error, Result};

use clap::Args;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Socket parameters of a TCP session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub ip: String,
    pub port: u16,
    /// Send and receive timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ip: String::from("127.0.0.1"),
            port: 502,
            timeout_ms: 3000,
        }
    }
}

impl Config {
    /// Apply the operator overrides on top of these values.
    pub fn merge(mut self, o: &Overrides) -> Self {
        if let Some(ref v) = o.ip {
            self.ip = v.clone();
        }
        if let Some(v) = o.port {
            self.port = v;
        }
        if let Some(v) = o.timeout_ms {
            self.timeout_ms = v;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.ip.is_empty() {
            return Err(Error::config("No host given."));
        }
        Ok(())
    }

    /// Resolve the configured host, accepting both addresses and names.
    pub async fn resolve(&self) -> Result<SocketAddr> {
        tokio::net::lookup_host((self.ip.as_str(), self.port))
            .await
            .map_err(|e| Error::Connection(format!("Unable to resolve {}: {}", self.ip, e)))?
            .next()
            .ok_or_else(|| Error::Connection(format!("No address found for {}", self.ip)))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Socket parameters given on the command line.
#[derive(Clone, Debug, Default, Args)]
pub struct Overrides {
    /// The host to connect to.
    #[arg(short = 'I', long)]
    pub ip: Option<String>,

    /// The port to connect to on the target host.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// The timeout in milliseconds for each Modbus operation
    #[arg(id = "timeout", short, long = "timeout")]
    pub timeout_ms: Option<u64>,
}
