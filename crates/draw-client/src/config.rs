//! Client Configuration

use anyhow::{bail, Context};
use draw_core::SessionConfig;
use draw_types::{Address, Stake};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Client configuration, loadable from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Contract admin (deployer) address
    pub admin: String,
    /// Account the wallet signs with, `None` for a locked wallet
    pub signer: Option<String>,
    /// Ticket price the contract is deployed with, in ether
    pub ticket_price: String,
    /// Sale window opened by the first ticket of a round, in seconds
    pub round_duration_secs: u64,
    /// Keeper upkeep check interval in seconds
    pub keeper_interval_secs: u64,
    /// Time for a purchase to be mined, in milliseconds
    pub confirmation_delay_ms: u64,
    /// Countdown tick period in milliseconds
    pub tick_period_ms: u64,
    /// Wait between a round closing and the winner check, in seconds
    pub settlement_delay_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            admin: "0x00000000000000000000000000000000000000ad".to_string(),
            signer: Some("0x0000000000000000000000000000000000000001".to_string()),
            ticket_price: "0.0001".to_string(),
            round_duration_secs: 300,
            keeper_interval_secs: 10,
            confirmation_delay_ms: 2_000,
            tick_period_ms: 1_000,
            settlement_delay_secs: 50,
        }
    }
}

impl ClientConfig {
    /// Read a JSON config file; missing fields take their defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Reject values the client cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_period_ms == 0 {
            bail!("tick_period_ms must be greater than zero");
        }
        if self.keeper_interval_secs == 0 {
            bail!("keeper_interval_secs must be greater than zero");
        }
        if self.round_duration_secs == 0 {
            bail!("round_duration_secs must be greater than zero");
        }
        self.admin_address()?;
        self.signer_address()?;
        self.ticket_price()?;
        Ok(())
    }

    pub fn admin_address(&self) -> anyhow::Result<Address> {
        self.admin
            .parse()
            .with_context(|| format!("invalid admin address {:?}", self.admin))
    }

    pub fn signer_address(&self) -> anyhow::Result<Option<Address>> {
        self.signer
            .as_deref()
            .map(|raw| {
                raw.parse()
                    .with_context(|| format!("invalid signer address {:?}", raw))
            })
            .transpose()
    }

    pub fn ticket_price(&self) -> anyhow::Result<Stake> {
        Stake::parse_ether(&self.ticket_price)
            .with_context(|| format!("invalid ticket price {:?}", self.ticket_price))
    }

    pub fn round_duration(&self) -> Duration {
        Duration::from_secs(self.round_duration_secs)
    }

    pub fn keeper_interval(&self) -> Duration {
        Duration::from_secs(self.keeper_interval_secs)
    }

    pub fn confirmation_delay(&self) -> Duration {
        Duration::from_millis(self.confirmation_delay_ms)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            tick_period: Duration::from_millis(self.tick_period_ms),
            settlement_delay: Duration::from_secs(self.settlement_delay_secs),
        }
    }
}
