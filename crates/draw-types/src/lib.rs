//! Shared types for the Minimal Draw client
//!
//! Value types exchanged between the round-state core and the ledger
//! collaborator: account addresses, fixed-point stakes and transaction
//! receipts, plus the ticket layout of a round.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lowest ticket number offered in a round
pub const MIN_TICKET: u8 = 1;

/// Highest ticket number offered in a round
pub const MAX_TICKET: u8 = 10;

/// Number of tickets in a round
pub const TICKETS_PER_ROUND: usize = (MAX_TICKET - MIN_TICKET + 1) as usize;

/// Decimal places of the native currency (wei per ether = 10^18)
pub const STAKE_DECIMALS: u32 = 18;

/// Fixed price of a single ticket as set by the contract (0.0001 ether)
pub const TICKET_STAKE: Stake = Stake::from_wei(100_000_000_000_000);

/// Check whether a ticket number belongs to a round
pub fn is_valid_ticket(ticket: u8) -> bool {
    (MIN_TICKET..=MAX_TICKET).contains(&ticket)
}

/// Errors produced while parsing value types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("address must be 0x followed by 40 hex digits: {0:?}")]
    InvalidAddress(String),

    #[error("invalid stake amount: {0:?}")]
    InvalidStake(String),
}

/// Account address as reported by the ledger
///
/// Comparison is exact: two addresses that differ only in letter case are
/// different values, matching how the contract's admin check is mirrored
/// on the client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// The all-zero address the contract reports before any draw settled
    pub fn zero() -> Self {
        Self(format!("0x{}", "0".repeat(40)))
    }

    /// Wrap a raw address string without validation
    pub fn new_unchecked(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// True for the empty string and the zero address
    pub fn is_unset(&self) -> bool {
        self.0.is_empty() || self.0.trim_start_matches("0x").bytes().all(|b| b == b'0')
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix("0x")
            .ok_or_else(|| ParseError::InvalidAddress(s.to_string()))?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseError::InvalidAddress(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-point amount of the native currency, stored in wei
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stake {
    wei: u128,
}

impl Stake {
    pub const fn from_wei(wei: u128) -> Self {
        Self { wei }
    }

    pub const fn wei(&self) -> u128 {
        self.wei
    }

    /// Parse a decimal ether amount such as `"0.0001"`
    pub fn parse_ether(s: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidStake(s.to_string());
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > STAKE_DECIMALS as usize
            || !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let unit = 10u128.pow(STAKE_DECIMALS);
        let whole_wei = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .ok()
                .and_then(|w| w.checked_mul(unit))
                .ok_or_else(invalid)?
        };
        let frac_wei = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = STAKE_DECIMALS as usize);
            padded.parse::<u128>().map_err(|_| invalid())?
        };

        whole_wei
            .checked_add(frac_wei)
            .map(Self::from_wei)
            .ok_or_else(invalid)
    }

    pub fn checked_add(self, other: Stake) -> Option<Stake> {
        self.wei.checked_add(other.wei).map(Self::from_wei)
    }
}

impl fmt::Display for Stake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = 10u128.pow(STAKE_DECIMALS);
        let whole = self.wei / unit;
        let frac = self.wei % unit;
        if frac == 0 {
            return write!(f, "{} ETH", whole);
        }
        let digits = format!("{:0>width$}", frac, width = STAKE_DECIMALS as usize);
        write!(f, "{}.{} ETH", whole, digits.trim_end_matches('0'))
    }
}

/// Receipt of a confirmed (mined) transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Transaction hash
    pub tx_hash: String,
    /// Block the transaction was mined in
    pub block_number: u64,
    /// Sender of the transaction
    pub from: Address,
    /// Value attached to the transaction
    pub value: Stake,
}
