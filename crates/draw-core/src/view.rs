//! View Projection - read-only model of what the user sees
//!
//! Built from a [`RoundState`] snapshot; presentation code renders it and
//! routes ticket selections back through the purchase flow.

use crate::round_state::RoundState;
use draw_types::{Address, MAX_TICKET, MIN_TICKET};
use std::collections::BTreeSet;

pub const CONNECT_PROMPT: &str = "Please connect your wallet to participate.";
pub const SETTLING_NOTICE: &str = "Previous draw is settling, please wait for a minute...";
pub const START_HINT: &str = "Buy a ticket to start the draw";
pub const NO_WINNER: &str = "No winner yet";

/// Tickets per rendered row
pub const TICKETS_PER_ROW: usize = 5;

/// One ticket selection control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketView {
    pub number: u8,
    pub sold: bool,
    /// Purchase submitted, waiting for confirmation
    pub pending: bool,
}

impl TicketView {
    pub fn selectable(&self) -> bool {
        !self.sold && !self.pending
    }
}

/// Main panel of the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Panel {
    /// No wallet session
    ConnectPrompt,
    /// Round closed, waiting for the winner
    Settling,
    /// Tickets on sale
    Tickets {
        tickets: Vec<TicketView>,
        /// `M:SS` left, `None` before the first sale
        remaining: Option<String>,
    },
}

/// Complete projection of a round snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub panel: Panel,
    pub winner: Option<Address>,
    pub error: Option<String>,
    pub is_admin: bool,
    pub account: Option<Address>,
}

impl ViewModel {
    /// Project a snapshot; `pending` are tickets with a purchase in flight
    pub fn project(state: &RoundState, pending: &BTreeSet<u8>) -> Self {
        let panel = if !state.connected {
            Panel::ConnectPrompt
        } else if state.is_settling {
            Panel::Settling
        } else {
            let tickets = (MIN_TICKET..=MAX_TICKET)
                .map(|number| TicketView {
                    number,
                    sold: state.is_sold(number),
                    pending: pending.contains(&number),
                })
                .collect();
            let remaining = state
                .has_active_round()
                .then(|| state.remaining_label.clone());
            Panel::Tickets { tickets, remaining }
        };

        Self {
            panel,
            winner: state.winner.clone(),
            error: state.last_error.clone(),
            is_admin: state.is_admin,
            account: state.account.clone(),
        }
    }

    /// Whether the view offers `ticket` for selection
    pub fn is_selectable(&self, ticket: u8) -> bool {
        match &self.panel {
            Panel::Tickets { tickets, .. } => tickets
                .iter()
                .any(|view| view.number == ticket && view.selectable()),
            Panel::ConnectPrompt | Panel::Settling => false,
        }
    }

    /// Ticket rows as laid out on screen
    pub fn ticket_rows(&self) -> Vec<&[TicketView]> {
        match &self.panel {
            Panel::Tickets { tickets, .. } => tickets.chunks(TICKETS_PER_ROW).collect(),
            Panel::ConnectPrompt | Panel::Settling => Vec::new(),
        }
    }

    /// Footer under the tickets
    pub fn countdown_line(&self) -> Option<String> {
        match &self.panel {
            Panel::Tickets {
                remaining: Some(label),
                ..
            } => Some(format!("Draw ends in - {}", label)),
            Panel::Tickets { remaining: None, .. } => Some(START_HINT.to_string()),
            Panel::ConnectPrompt | Panel::Settling => None,
        }
    }

    pub fn winner_line(&self) -> String {
        match &self.winner {
            Some(winner) => format!("Previous winner - {}", winner),
            None => format!("Previous winner - {}", NO_WINNER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> RoundState {
        RoundState {
            connected: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_disconnected_shows_prompt() {
        let view = ViewModel::project(&RoundState::default(), &BTreeSet::new());
        assert_eq!(view.panel, Panel::ConnectPrompt);
        assert!(!(1..=10).any(|t| view.is_selectable(t)));
        assert_eq!(view.winner_line(), "Previous winner - No winner yet");
    }

    #[test]
    fn test_sold_tickets_are_disabled() {
        let mut state = connected();
        state.end_time = 1_000;
        state.remaining_label = "1:05".into();
        state.sold_tickets = [1, 5, 10].into_iter().collect();

        let view = ViewModel::project(&state, &BTreeSet::new());
        for ticket in 1..=10u8 {
            assert_eq!(view.is_selectable(ticket), !state.is_sold(ticket));
        }
        assert_eq!(view.countdown_line().as_deref(), Some("Draw ends in - 1:05"));
        assert_eq!(view.ticket_rows().len(), 2);
        assert_eq!(view.ticket_rows()[1][0].number, 6);
    }

    #[test]
    fn test_pending_tickets_are_disabled() {
        let pending: BTreeSet<u8> = [3].into_iter().collect();
        let view = ViewModel::project(&connected(), &pending);
        assert!(!view.is_selectable(3));
        assert!(view.is_selectable(4));
        assert_eq!(view.countdown_line().as_deref(), Some(START_HINT));
    }

    #[test]
    fn test_settling_hides_tickets() {
        let mut state = connected();
        state.end_time = 1_000;
        state.is_settling = true;

        let view = ViewModel::project(&state, &BTreeSet::new());
        assert_eq!(view.panel, Panel::Settling);
        assert!(view.ticket_rows().is_empty());
        assert!(!view.is_selectable(1));
    }
}
