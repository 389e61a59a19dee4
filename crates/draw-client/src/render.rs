//! Terminal rendering of the view model

use draw_core::view::{Panel, TicketView, CONNECT_PROMPT, SETTLING_NOTICE};
use draw_core::ViewModel;
use std::fmt::Write;

const TITLE: &str = "Minimal Draw";
const TAGLINE: &str =
    "Participate in a draw to win 90% of the whole amount collected from sold tickets.";

fn ticket_cell(ticket: &TicketView) -> String {
    if ticket.sold {
        "[--]".to_string()
    } else if ticket.pending {
        "[..]".to_string()
    } else {
        format!("[{:>2}]", ticket.number)
    }
}

/// Render the whole screen as text
pub fn render(view: &ViewModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", TITLE);
    let _ = writeln!(out, "{}", TAGLINE);

    if let Some(account) = &view.account {
        let role = if view.is_admin { " (admin)" } else { "" };
        let _ = writeln!(out, "Connected as {}{}", account, role);
    }
    let _ = writeln!(out);

    match &view.panel {
        Panel::ConnectPrompt => {
            let _ = writeln!(out, "{}", CONNECT_PROMPT);
        }
        Panel::Settling => {
            let _ = writeln!(out, "{}", SETTLING_NOTICE);
        }
        Panel::Tickets { .. } => {
            let _ = writeln!(out, "Tickets Available");
            for row in view.ticket_rows() {
                let cells: Vec<String> = row.iter().map(ticket_cell).collect();
                let _ = writeln!(out, "  {}", cells.join(" "));
            }
            if let Some(line) = view.countdown_line() {
                let _ = writeln!(out, "{}", line);
            }
        }
    }

    if let Some(error) = &view.error {
        let _ = writeln!(out, "! {}", error);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", view.winner_line());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use draw_core::RoundState;
    use std::collections::BTreeSet;

    #[test]
    fn test_render_open_round() {
        let state = RoundState {
            connected: true,
            end_time: 1_000,
            remaining_label: "4:09".into(),
            sold_tickets: [2, 7].into_iter().collect(),
            ..Default::default()
        };
        let pending: BTreeSet<u8> = [3].into_iter().collect();
        let text = render(&ViewModel::project(&state, &pending));

        assert!(text.contains("[ 1] [--] [..] [ 4] [ 5]"));
        assert!(text.contains("[ 6] [--] [ 8] [ 9] [10]"));
        assert!(text.contains("Draw ends in - 4:09"));
        assert!(text.contains("Previous winner - No winner yet"));
    }

    #[test]
    fn test_render_disconnected() {
        let text = render(&ViewModel::project(&RoundState::default(), &BTreeSet::new()));
        assert!(text.contains(CONNECT_PROMPT));
        assert!(!text.contains("Tickets Available"));
    }

    #[test]
    fn test_render_settling_with_error() {
        let state = RoundState {
            connected: true,
            is_settling: true,
            end_time: 1_000,
            last_error: Some("Failed to purchase ticket.".into()),
            ..Default::default()
        };
        let text = render(&ViewModel::project(&state, &BTreeSet::new()));
        assert!(text.contains(SETTLING_NOTICE));
        assert!(text.contains("! Failed to purchase ticket."));
    }
}
