//! Client Errors

use thiserror::Error;

/// Message recorded when the initial sync fails
pub const BOOTSTRAP_FAILED_MSG: &str = "Failed to load lottery state.";

/// Message recorded when a ticket purchase fails
pub const PURCHASE_FAILED_MSG: &str = "Failed to purchase ticket.";

/// Message recorded when the post-settlement winner read fails
pub const WINNER_FETCH_FAILED_MSG: &str = "Failed to fetch winner.";

/// Errors returned by a [`ContractGateway`](crate::gateway::ContractGateway)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("no ledger session established")]
    SessionUnavailable,

    #[error("remote call failed: {0}")]
    RemoteCallFailed(String),
}

/// Errors surfaced by the draw session operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("no wallet session available")]
    SessionUnavailable,

    #[error("initial sync failed: {0}")]
    BootstrapReadFailure(#[source] GatewayError),

    #[error("purchase of ticket {ticket} failed: {source}")]
    PurchaseFailure {
        ticket: u8,
        #[source]
        source: GatewayError,
    },

    #[error("winner fetch failed: {0}")]
    WinnerFetchFailure(#[source] GatewayError),

    #[error("ticket {0} is not part of the draw")]
    InvalidTicket(u8),

    #[error("ticket {0} is sold or already being purchased")]
    TicketUnavailable(u8),
}

impl DrawError {
    /// The text recorded in `RoundState::last_error` for this failure, if any
    ///
    /// A missing session renders as a connect prompt and local rejections are
    /// never offered by the view, so neither produces a message.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            DrawError::BootstrapReadFailure(_) => Some(BOOTSTRAP_FAILED_MSG),
            DrawError::PurchaseFailure { .. } => Some(PURCHASE_FAILED_MSG),
            DrawError::WinnerFetchFailure(_) => Some(WINNER_FETCH_FAILED_MSG),
            DrawError::SessionUnavailable
            | DrawError::InvalidTicket(_)
            | DrawError::TicketUnavailable(_) => None,
        }
    }
}
