//! Scripted gateway and wallet for protocol tests

use crate::error::GatewayError;
use crate::gateway::{ContractGateway, Wallet};
use async_trait::async_trait;
use draw_types::{Address, Stake, TransactionReceipt};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

/// Deterministic address ending in `tag`
pub fn addr(tag: u8) -> Address {
    Address::new_unchecked(format!("0x{:040x}", tag))
}

struct MockState {
    admin: Address,
    signer: Address,
    end_time: u64,
    winner: Address,
    /// End time reported once a purchase confirms
    end_time_after_purchase: Option<u64>,
    purchase_delay: Duration,
    winner_delay: Duration,
    fail_admin: bool,
    fail_end_time: bool,
    fail_winner: bool,
    purchase_revert: Option<String>,
}

/// In-memory contract double with call counters and failure switches
pub struct MockGateway {
    state: Mutex<MockState>,
    end_time_calls: AtomicUsize,
    winner_calls: AtomicUsize,
    purchase_calls: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                admin: addr(0xad),
                signer: addr(0x51),
                end_time: 0,
                winner: Address::zero(),
                end_time_after_purchase: None,
                purchase_delay: Duration::ZERO,
                winner_delay: Duration::ZERO,
                fail_admin: false,
                fail_end_time: false,
                fail_winner: false,
                purchase_revert: None,
            }),
            end_time_calls: AtomicUsize::new(0),
            winner_calls: AtomicUsize::new(0),
            purchase_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_admin(&self, admin: Address) {
        self.state.lock().admin = admin;
    }

    pub fn set_signer(&self, signer: Address) {
        self.state.lock().signer = signer;
    }

    pub fn set_end_time(&self, end_time: u64) {
        self.state.lock().end_time = end_time;
    }

    pub fn set_winner(&self, winner: Address) {
        self.state.lock().winner = winner;
    }

    pub fn end_time_after_purchase(&self, end_time: u64) {
        self.state.lock().end_time_after_purchase = Some(end_time);
    }

    pub fn set_purchase_delay(&self, delay: Duration) {
        self.state.lock().purchase_delay = delay;
    }

    pub fn set_winner_delay(&self, delay: Duration) {
        self.state.lock().winner_delay = delay;
    }

    pub fn fail_admin(&self, fail: bool) {
        self.state.lock().fail_admin = fail;
    }

    pub fn fail_end_time(&self, fail: bool) {
        self.state.lock().fail_end_time = fail;
    }

    pub fn fail_winner(&self, fail: bool) {
        self.state.lock().fail_winner = fail;
    }

    pub fn revert_purchases(&self, reason: Option<&str>) {
        self.state.lock().purchase_revert = reason.map(str::to_string);
    }

    pub fn end_time_calls(&self) -> usize {
        self.end_time_calls.load(Ordering::SeqCst)
    }

    pub fn winner_calls(&self) -> usize {
        self.winner_calls.load(Ordering::SeqCst)
    }

    pub fn purchase_calls(&self) -> usize {
        self.purchase_calls.load(Ordering::SeqCst)
    }
}

fn remote(reason: &str) -> GatewayError {
    GatewayError::RemoteCallFailed(reason.to_string())
}

#[async_trait]
impl ContractGateway for MockGateway {
    async fn admin(&self) -> Result<Address, GatewayError> {
        let state = self.state.lock();
        if state.fail_admin {
            return Err(remote("admin() unavailable"));
        }
        Ok(state.admin.clone())
    }

    async fn signer_address(&self) -> Result<Address, GatewayError> {
        Ok(self.state.lock().signer.clone())
    }

    async fn round_end_time(&self) -> Result<u64, GatewayError> {
        self.end_time_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();
        if state.fail_end_time {
            return Err(remote("lotteryEndTime() unavailable"));
        }
        Ok(state.end_time)
    }

    async fn winner(&self) -> Result<Address, GatewayError> {
        self.winner_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.state.lock().winner_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock();
        if state.fail_winner {
            return Err(remote("winner() unavailable"));
        }
        Ok(state.winner.clone())
    }

    async fn purchase_ticket(&self, stake: Stake) -> Result<TransactionReceipt, GatewayError> {
        let n = self.purchase_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.state.lock().purchase_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if let Some(reason) = &state.purchase_revert {
            return Err(remote(reason));
        }
        if let Some(end_time) = state.end_time_after_purchase {
            state.end_time = end_time;
        }
        Ok(TransactionReceipt {
            tx_hash: format!("0x{:064x}", n + 1),
            block_number: n as u64 + 1,
            from: state.signer.clone(),
            value: stake,
        })
    }
}

/// Wallet handing out a fixed gateway, or none
pub struct MockWallet {
    gateway: Option<Arc<MockGateway>>,
}

impl MockWallet {
    pub fn connected(gateway: Arc<MockGateway>) -> Self {
        Self {
            gateway: Some(gateway),
        }
    }

    pub fn disconnected() -> Self {
        Self { gateway: None }
    }
}

#[async_trait]
impl Wallet for MockWallet {
    async fn establish_session(&self) -> Option<Arc<dyn ContractGateway>> {
        self.gateway
            .clone()
            .map(|gateway| gateway as Arc<dyn ContractGateway>)
    }
}
