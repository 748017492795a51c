//! Line-oriented console front end for a [`SyncClient`].

use anyhow::Result;
use schafkopf::{
    Card, ContractType, HandSorter, SortMode, bidding,
    constants::TRICKS_PER_ROUND,
    ordering::{is_display_trump, is_trump},
};
use std::fmt::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    commands::{Command, HELP, parse_command},
    reconciler::{GameSnapshot, GameView, SeatSource, ViewStatus},
    sync_client::SyncClient,
    transport::ConnectionState,
};

/// Where an opponent sits relative to the viewer.
fn position_label(position: usize) -> &'static str {
    match position {
        1 => "right",
        2 => "across",
        _ => "left",
    }
}

/// Interactive session state: the client plus local display preferences.
pub struct Console {
    client: SyncClient,
    sorter: HandSorter,
    mode: SortMode,
}

impl Console {
    pub fn new(client: SyncClient, mode: SortMode) -> Self {
        Self {
            client,
            sorter: HandSorter::new(),
            mode,
        }
    }

    /// Reads commands from stdin and prints view updates until the user
    /// quits or stdin closes.
    pub async fn run(mut self) -> Result<()> {
        let mut views = self.client.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut last_rendered = String::new();

        println!("Type 'help' for commands.");

        loop {
            tokio::select! {
                changed = views.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let view = views.borrow_and_update().clone();
                    let rendered = render_view(&view, &self.sorter, self.mode);
                    if rendered != last_rendered {
                        println!("{rendered}");
                        last_rendered = rendered;
                    }
                }

                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_command(&line) {
                        Ok(Command::Quit) => break,
                        Ok(command) => {
                            if let Some(output) = self.handle(command) {
                                println!("{output}");
                            }
                        }
                        Err(e) => println!("{e}"),
                    }
                }
            }
        }

        self.client.close();
        Ok(())
    }

    /// Executes one command, returning text to show the user.
    pub fn handle(&mut self, command: Command) -> Option<String> {
        let result = match command {
            Command::Play(card) => self.client.play_card(card),
            Command::Pass => self.client.pass(),
            Command::Bid(bid) => self.client.select_contract(bid),
            Command::Refresh => self.client.request_state(),
            Command::Sort(mode) => {
                self.mode = mode;
                return Some(self.render());
            }
            Command::CaptureCustom => {
                let view = self.client.view();
                let Some(snapshot) = view.snapshot.as_ref() else {
                    return Some("No hand to capture yet".to_string());
                };
                let shown = self.sorter.sort(&snapshot.your_hand, self.mode);
                self.sorter.capture_custom(&shown);
                self.mode = SortMode::Custom;
                return Some("Custom order captured".to_string());
            }
            Command::Help => return Some(HELP.to_string()),
            Command::Quit => return None,
        };
        result.err().map(|e| e.to_string())
    }

    fn render(&self) -> String {
        render_view(&self.client.view(), &self.sorter, self.mode)
    }
}

/// Renders a view as plain text.
pub fn render_view(view: &GameView, sorter: &HandSorter, mode: SortMode) -> String {
    let mut out = String::new();

    match (&view.status, view.connection) {
        (ViewStatus::Halted(reason), _) => {
            let _ = writeln!(out, "Game halted: {reason}");
            let _ = write!(out, "Type 'quit' to leave.");
            return out;
        }
        (_, ConnectionState::Closed) if view.snapshot.is_none() => {
            let _ = write!(out, "Not connected.");
            return out;
        }
        (ViewStatus::Loading, _) => {
            let _ = write!(out, "Waiting for the game to start ({})...", view.connection);
            return out;
        }
        _ => {}
    }

    let Some(snapshot) = view.snapshot.as_ref() else {
        let _ = write!(out, "Waiting for the game state...");
        return out;
    };

    render_snapshot(&mut out, snapshot, sorter, mode);

    if view.connection == ConnectionState::Closed {
        let _ = writeln!(out, "(connection closed)");
    }
    if let Some(notice) = &view.play_notice {
        let _ = writeln!(out, "! {}", notice.message);
    }

    out.trim_end().to_string()
}

fn render_snapshot(out: &mut String, snapshot: &GameSnapshot, sorter: &HandSorter, mode: SortMode) {
    let contract = snapshot.contract.as_deref().unwrap_or("none");
    let _ = writeln!(
        out,
        "== {} | trick {}/{TRICKS_PER_ROUND} | contract {contract} ==",
        snapshot.game_id, snapshot.trick_number
    );

    let name = snapshot.player_name(snapshot.your_seat).unwrap_or("you");
    let seat_note = match snapshot.seat_source {
        SeatSource::Reported | SeatSource::Retained => "",
        SeatSource::Inferred => " (inferred)",
        SeatSource::Degraded => " (unknown, assuming 0)",
    };
    let _ = writeln!(out, "You: {name}, seat {}{seat_note}", snapshot.your_seat);

    for opponent in snapshot.opponents() {
        let cards = opponent
            .hand_size
            .map_or_else(|| "?".to_string(), |n| n.to_string());
        let _ = writeln!(
            out,
            "  {:<6} {} (seat {}): {cards} cards{}",
            position_label(opponent.position),
            opponent.name.as_deref().unwrap_or("-"),
            opponent.seat,
            if opponent.to_act { "  <- to act" } else { "" }
        );
    }

    if snapshot.is_bidding_phase() {
        match &snapshot.highest_bid {
            Some(bid) => {
                let bidder = snapshot.player_name(bid.bidder_seat).unwrap_or("?");
                let _ = writeln!(out, "Bidding: {bid} by {bidder}, {} passes", snapshot.passes_in_a_row);
            }
            None => {
                let _ = writeln!(out, "Bidding: no bids yet, {} passes", snapshot.passes_in_a_row);
            }
        }
        if snapshot.is_your_bid_turn() {
            let options: Vec<String> = bidding::biddable(snapshot.highest_bid.as_ref())
                .iter()
                .map(ToString::to_string)
                .collect();
            if options.is_empty() {
                let _ = writeln!(out, "Your turn to bid: nothing outbids the current bid, pass");
            } else {
                let _ = writeln!(out, "Your turn to bid: {} or pass", options.join(", "));
            }
        }
    } else if !snapshot.current_trick.is_empty() {
        let trick: Vec<String> = snapshot.current_trick.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "Trick: {}", trick.join(", "));
    }

    let trump = trump_marker(snapshot);
    let hand: Vec<String> = sorter
        .sort(&snapshot.your_hand, mode)
        .iter()
        .map(|card| format!("{card}{}", if trump(card) { "*" } else { "" }))
        .collect();
    let _ = writeln!(out, "Hand ({mode}): {}", hand.join(", "));

    if snapshot.round_complete {
        let _ = writeln!(out, "Round complete.");
    } else if snapshot.is_your_play_turn() {
        let _ = writeln!(out, "Your turn to play.");
    }
}

/// Trump test for marking cards: the contract's own rule once it is known,
/// the display heuristic before that.
fn trump_marker(snapshot: &GameSnapshot) -> impl Fn(&Card) -> bool {
    let contract = snapshot
        .contract
        .as_deref()
        .and_then(|c| c.parse::<ContractType>().ok());
    let trump_suit = snapshot.highest_bid.as_ref().and_then(|bid| bid.trump_suit);
    move |card: &Card| match contract {
        Some(contract_type) => is_trump(card, contract_type, trump_suit),
        None => is_display_trump(card),
    }
}
