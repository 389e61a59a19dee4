//! Ticket Purchase Flow
//!
//! Validates a ticket selection against local state, buys through the
//! gateway and merges the confirmed purchase into the round. The contract
//! stays the authority on which tickets are really taken; the local checks
//! only keep this client from submitting the same ticket twice.

use crate::error::{DrawError, GatewayError, PURCHASE_FAILED_MSG};
use crate::gateway::ContractGateway;
use crate::round_state::{RoundStore, UpdateCause};
use draw_types::{is_valid_ticket, TransactionReceipt, TICKET_STAKE};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Tickets with a purchase submitted but not yet settled locally
pub type InFlightTickets = Arc<Mutex<BTreeSet<u8>>>;

/// Removes a ticket from the in-flight set when the purchase finishes
struct InFlightGuard {
    in_flight: InFlightTickets,
    ticket: u8,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.ticket);
    }
}

/// Buys tickets and records them in the round
pub struct TicketPurchaseFlow {
    store: RoundStore,
    gateway: Arc<dyn ContractGateway>,
    in_flight: InFlightTickets,
}

impl TicketPurchaseFlow {
    pub fn new(store: RoundStore, gateway: Arc<dyn ContractGateway>) -> Self {
        Self {
            store,
            gateway,
            in_flight: InFlightTickets::default(),
        }
    }

    /// Share an in-flight set with other flows, so a purchase still running
    /// in a replaced flow keeps its ticket reserved
    pub fn with_in_flight(mut self, in_flight: InFlightTickets) -> Self {
        self.in_flight = in_flight;
        self
    }

    /// Buy `ticket` for the contract's fixed stake
    ///
    /// On confirmation the round end time is re-read and merged together with
    /// the ticket. Gateway failures are recorded in `last_error` and leave the
    /// round untouched.
    pub async fn purchase(&self, ticket: u8) -> Result<TransactionReceipt, DrawError> {
        if !is_valid_ticket(ticket) {
            return Err(DrawError::InvalidTicket(ticket));
        }
        let _guard = self.reserve(ticket)?;

        tracing::info!("Buying ticket {} for {}", ticket, TICKET_STAKE);
        match self.submit().await {
            Ok((receipt, end_time)) => {
                tracing::info!(
                    "Ticket {} confirmed in block {} ({})",
                    ticket,
                    receipt.block_number,
                    receipt.tx_hash
                );
                self.merge(ticket, end_time);
                Ok(receipt)
            }
            Err(source) => {
                let err = DrawError::PurchaseFailure { ticket, source };
                tracing::error!("{}", err);
                self.store.record_error(PURCHASE_FAILED_MSG);
                Err(err)
            }
        }
    }

    fn reserve(&self, ticket: u8) -> Result<InFlightGuard, DrawError> {
        let mut in_flight = self.in_flight.lock();
        if in_flight.contains(&ticket) || self.store.read(|state| state.is_sold(ticket)) {
            tracing::warn!("Ticket {} is sold or already being bought", ticket);
            return Err(DrawError::TicketUnavailable(ticket));
        }
        in_flight.insert(ticket);
        Ok(InFlightGuard {
            in_flight: self.in_flight.clone(),
            ticket,
        })
    }

    /// Purchase, then refresh the end time; strictly in that order
    async fn submit(&self) -> Result<(TransactionReceipt, u64), GatewayError> {
        let receipt = self.gateway.purchase_ticket(TICKET_STAKE).await?;
        let end_time = self.gateway.round_end_time().await?;
        Ok((receipt, end_time))
    }

    fn merge(&self, ticket: u8, end_time: u64) {
        if end_time == 0 {
            tracing::warn!(
                "Round settled before ticket {} could be recorded, not tracking it",
                ticket
            );
            return;
        }

        self.store.update(UpdateCause::TicketPurchased { ticket }, |state| {
            if state.end_time != 0 && state.end_time != end_time {
                // The purchase opened a new round
                state.sold_tickets.clear();
                state.is_settling = false;
                state.remaining_label.clear();
            }
            state.end_time = end_time;
            state.sold_tickets.insert(ticket);
        });
    }
}
