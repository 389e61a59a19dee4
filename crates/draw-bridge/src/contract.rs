//! Simulated Lottery Contract
//!
//! In-process stand-in for the on-chain lottery. It keeps the same
//! observable surface the client relies on:
//! - `lottery_end_time()` is 0 until the first ticket of a round is sold
//! - the first sale opens the round for `round_duration`
//! - `perform_upkeep()` (driven by the keeper) draws a winner once the round
//!   has ended and resets it

use draw_core::Clock;
use draw_types::{Address, Stake, TransactionReceipt, TICKETS_PER_ROUND, TICKET_STAKE};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Share of the pot paid to the winner, in percent
pub const WINNER_SHARE_PERCENT: u128 = 90;

/// Contract reverts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("incorrect ticket price: expected {expected}, got {got}")]
    IncorrectStake { expected: Stake, got: Stake },

    #[error("lottery has ended, waiting for the draw")]
    RoundClosed,

    #[error("all tickets sold")]
    RoundFull,

    #[error("pot overflow")]
    PotOverflow,
}

/// Deployment parameters
#[derive(Debug, Clone)]
pub struct ContractConfig {
    /// Deployer, fixed for the contract's lifetime
    pub admin: Address,
    /// Price of one ticket
    pub ticket_price: Stake,
    /// Sale window opened by the first ticket of a round
    pub round_duration: Duration,
}

impl ContractConfig {
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            ticket_price: TICKET_STAKE,
            round_duration: Duration::from_secs(300),
        }
    }
}

/// Outcome of a settled round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawResult {
    pub round_end_time: u64,
    pub winner: Address,
    pub prize: Stake,
    pub tickets_sold: usize,
}

struct LedgerState {
    end_time: u64,
    players: Vec<Address>,
    pot: Stake,
    winner: Address,
    block_number: u64,
    rounds_settled: u64,
}

/// Lottery contract held in memory
pub struct SimulatedContract {
    config: ContractConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<LedgerState>,
}

impl SimulatedContract {
    /// Deploy a fresh contract with no rounds played
    pub fn deploy(config: ContractConfig, clock: Arc<dyn Clock>) -> Self {
        tracing::info!(
            "Lottery deployed (admin {}, price {}, round {}s)",
            config.admin,
            config.ticket_price,
            config.round_duration.as_secs()
        );
        Self {
            config,
            clock,
            state: Mutex::new(LedgerState {
                end_time: 0,
                players: Vec::new(),
                pot: Stake::default(),
                winner: Address::zero(),
                block_number: 0,
                rounds_settled: 0,
            }),
        }
    }

    pub fn admin(&self) -> Address {
        self.config.admin.clone()
    }

    pub fn ticket_price(&self) -> Stake {
        self.config.ticket_price
    }

    pub fn lottery_end_time(&self) -> u64 {
        self.state.lock().end_time
    }

    pub fn winner(&self) -> Address {
        self.state.lock().winner.clone()
    }

    pub fn players(&self) -> Vec<Address> {
        self.state.lock().players.clone()
    }

    pub fn pot(&self) -> Stake {
        self.state.lock().pot
    }

    pub fn rounds_settled(&self) -> u64 {
        self.state.lock().rounds_settled
    }

    /// Buy one ticket; the first sale of a round starts its timer
    pub fn buy_ticket(
        &self,
        from: &Address,
        value: Stake,
    ) -> Result<TransactionReceipt, ContractError> {
        if value != self.config.ticket_price {
            return Err(ContractError::IncorrectStake {
                expected: self.config.ticket_price,
                got: value,
            });
        }

        let now = self.clock.now_epoch_seconds();
        let mut state = self.state.lock();
        if state.end_time != 0 && now >= state.end_time {
            return Err(ContractError::RoundClosed);
        }
        if state.players.len() >= TICKETS_PER_ROUND {
            return Err(ContractError::RoundFull);
        }

        state.pot = state
            .pot
            .checked_add(value)
            .ok_or(ContractError::PotOverflow)?;
        if state.end_time == 0 {
            state.end_time = now + self.config.round_duration.as_secs();
            tracing::info!("Round opened, sales close at {}", state.end_time);
        }
        state.players.push(from.clone());
        state.block_number += 1;

        tracing::debug!(
            "Ticket sold to {} ({} in round, pot {})",
            from,
            state.players.len(),
            state.pot
        );

        Ok(TransactionReceipt {
            tx_hash: format!(
                "0x{:032x}{:032x}",
                state.block_number,
                state.players.len() as u128 ^ state.end_time as u128
            ),
            block_number: state.block_number,
            from: from.clone(),
            value,
        })
    }

    /// Whether an ended round is waiting to be drawn
    pub fn upkeep_needed(&self) -> bool {
        let state = self.state.lock();
        state.end_time != 0 && self.clock.now_epoch_seconds() >= state.end_time
    }

    /// Draw the winner of an ended round using the thread RNG
    pub fn perform_upkeep(&self) -> Option<DrawResult> {
        self.perform_upkeep_with(&mut rand::thread_rng())
    }

    /// Draw the winner of an ended round and reset it
    pub fn perform_upkeep_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<DrawResult> {
        let now = self.clock.now_epoch_seconds();
        let mut state = self.state.lock();
        if state.end_time == 0 || now < state.end_time || state.players.is_empty() {
            return None;
        }

        let winner = state.players[rng.gen_range(0..state.players.len())].clone();
        let prize = Stake::from_wei(state.pot.wei() * WINNER_SHARE_PERCENT / 100);
        let result = DrawResult {
            round_end_time: state.end_time,
            winner: winner.clone(),
            prize,
            tickets_sold: state.players.len(),
        };

        state.winner = winner;
        state.end_time = 0;
        state.players.clear();
        state.pot = Stake::default();
        state.block_number += 1;
        state.rounds_settled += 1;

        tracing::info!(
            "Round {} drawn: {} wins {} ({} tickets)",
            result.round_end_time,
            result.winner,
            result.prize,
            result.tickets_sold
        );
        Some(result)
    }
}
