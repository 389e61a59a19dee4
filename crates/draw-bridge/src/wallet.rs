//! Wallet and gateway adapters over the simulated contract

use crate::contract::SimulatedContract;
use async_trait::async_trait;
use draw_core::{ContractGateway, GatewayError, Wallet};
use draw_types::{Address, Stake, TransactionReceipt};
use std::sync::Arc;
use std::time::Duration;

/// Default time for a purchase to be mined
pub const CONFIRMATION_DELAY: Duration = Duration::from_secs(2);

/// Contract gateway signing as one account
pub struct LedgerGateway {
    contract: Arc<SimulatedContract>,
    signer: Address,
    confirmation_delay: Duration,
}

impl LedgerGateway {
    pub fn new(contract: Arc<SimulatedContract>, signer: Address) -> Self {
        Self {
            contract,
            signer,
            confirmation_delay: CONFIRMATION_DELAY,
        }
    }

    /// Set how long a purchase waits to be mined
    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }
}

#[async_trait]
impl ContractGateway for LedgerGateway {
    async fn admin(&self) -> Result<Address, GatewayError> {
        Ok(self.contract.admin())
    }

    async fn signer_address(&self) -> Result<Address, GatewayError> {
        Ok(self.signer.clone())
    }

    async fn round_end_time(&self) -> Result<u64, GatewayError> {
        Ok(self.contract.lottery_end_time())
    }

    async fn winner(&self) -> Result<Address, GatewayError> {
        Ok(self.contract.winner())
    }

    async fn purchase_ticket(&self, stake: Stake) -> Result<TransactionReceipt, GatewayError> {
        tracing::debug!("Submitting buyTicket from {} with {}", self.signer, stake);
        // Mined after the confirmation delay; reverts surface only then
        tokio::time::sleep(self.confirmation_delay).await;
        self.contract
            .buy_ticket(&self.signer, stake)
            .map_err(|e| GatewayError::RemoteCallFailed(format!("execution reverted: {}", e)))
    }
}

/// Wallet bound to an optional signer account
pub struct SimulatedWallet {
    contract: Arc<SimulatedContract>,
    signer: Option<Address>,
    confirmation_delay: Duration,
}

impl SimulatedWallet {
    /// Wallet with an unlocked account
    pub fn connected(contract: Arc<SimulatedContract>, signer: Address) -> Self {
        Self {
            contract,
            signer: Some(signer),
            confirmation_delay: CONFIRMATION_DELAY,
        }
    }

    /// Wallet with no account available
    pub fn locked(contract: Arc<SimulatedContract>) -> Self {
        Self {
            contract,
            signer: None,
            confirmation_delay: CONFIRMATION_DELAY,
        }
    }

    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }
}

#[async_trait]
impl Wallet for SimulatedWallet {
    async fn establish_session(&self) -> Option<Arc<dyn ContractGateway>> {
        let signer = self.signer.clone()?;
        tracing::info!("Wallet session established for {}", signer);
        Some(Arc::new(
            LedgerGateway::new(self.contract.clone(), signer)
                .with_confirmation_delay(self.confirmation_delay),
        ))
    }
}
