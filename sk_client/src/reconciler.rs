//! State reconciler: folds inbound server messages into a [`GameView`].
//!
//! The reconciler is a pure reducer. It performs no I/O and owns no timers;
//! every side effect it wants is returned as an [`Effect`] for the driver to
//! carry out. Scheduled timers come back through [`Reconciler::fire`].
//!
//! Server pushes other than `game_state` are treated as invalidation signals
//! only. The snapshot is always replaced wholesale, never patched.

use schafkopf::{
    Bid, Card, ClientMessage, GameStatePayload, NUM_SEATS, Seat, ServerMessage,
    constants::MAX_PASSES_IN_A_ROW, entities::seat_after,
};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{config::Timings, transport::ConnectionState};

/// Notice shown for a `play_error` that arrives without text.
pub const DEFAULT_PLAY_ERROR: &str = "Cannot play this card";

/// Error texts that are part of normal play and never halt the session.
const NON_FATAL_ERRORS: [&str; 2] = ["not your turn", "cannot play"];

/// Timers the reconciler asks the driver to run.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Timer {
    /// Send `get_state` when it fires.
    RequestState,
    /// Clear the play notice with this id, if it is still showing.
    ClearPlayNotice(u64),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Effect {
    Send(ClientMessage),
    Schedule { after: Duration, timer: Timer },
}

/// Where the viewer's seat in a snapshot came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SeatSource {
    /// Sent by the server in this snapshot.
    Reported,
    /// Missing from this snapshot; kept from an earlier report.
    Retained,
    /// Missing; taken from the single unknown slot in `other_hands`.
    Inferred,
    /// Missing and not inferable; defaulted to seat 0.
    Degraded,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum ViewStatus {
    /// No snapshot yet, or the server reported the game as not ready.
    #[default]
    Loading,
    Ready,
    /// An unrecoverable server error. Interaction stops until the session
    /// is closed.
    Halted(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlayNotice {
    pub id: u64,
    pub message: String,
}

/// The last authoritative game state with the viewer's seat resolved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameSnapshot {
    pub game_id: String,
    pub players: Vec<String>,
    pub your_seat: Seat,
    pub seat_source: SeatSource,
    pub your_hand: Vec<Card>,
    /// Hand sizes as sent by the server; `None` marks the viewer's slot.
    pub other_hands: Vec<Option<u8>>,
    pub current_trick: Vec<Card>,
    pub current_player: Seat,
    pub contract: Option<String>,
    pub trick_number: u8,
    pub round_complete: bool,
    pub bidding_phase: bool,
    pub current_bidder: Option<Seat>,
    pub highest_bid: Option<Bid>,
    pub passes_in_a_row: u8,
}

/// Another player as seen from the viewer's chair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Opponent {
    /// Visual position clockwise from the viewer, 1 to 3.
    pub position: usize,
    pub seat: Seat,
    pub name: Option<String>,
    pub hand_size: Option<u8>,
    /// Whether this player is the one the table is waiting on.
    pub to_act: bool,
}

impl GameSnapshot {
    fn from_payload(payload: GameStatePayload, your_seat: Seat, seat_source: SeatSource) -> Self {
        let passes_in_a_row = if payload.bidding_phase {
            payload.passes_in_a_row.min(MAX_PASSES_IN_A_ROW)
        } else {
            0
        };
        Self {
            game_id: payload.game_id,
            players: payload.players,
            your_seat,
            seat_source,
            your_hand: payload.your_hand,
            other_hands: payload.other_hands,
            current_trick: payload.current_trick,
            current_player: payload.current_player,
            contract: payload.contract,
            trick_number: payload.trick_number,
            round_complete: payload.round_complete,
            bidding_phase: payload.bidding_phase,
            current_bidder: payload.current_bidder,
            highest_bid: payload.highest_bid,
            passes_in_a_row,
        }
    }

    pub fn is_bidding_phase(&self) -> bool {
        self.bidding_phase && self.contract.is_none()
    }

    pub fn is_your_bid_turn(&self) -> bool {
        self.is_bidding_phase() && self.current_bidder == Some(self.your_seat)
    }

    pub fn is_your_play_turn(&self) -> bool {
        !self.is_bidding_phase() && self.current_player == self.your_seat && !self.round_complete
    }

    /// Seat shown `position` places clockwise from the viewer.
    pub fn seat_at(&self, position: usize) -> Seat {
        seat_after(self.your_seat, position)
    }

    pub fn player_name(&self, seat: Seat) -> Option<&str> {
        self.players.get(seat).map(String::as_str)
    }

    /// Cards held by `seat`, if known.
    pub fn hand_size(&self, seat: Seat) -> Option<u8> {
        if seat == self.your_seat {
            return u8::try_from(self.your_hand.len()).ok();
        }
        self.other_hands.get(seat).copied().flatten()
    }

    pub fn holds(&self, card: &Card) -> bool {
        self.your_hand.contains(card)
    }

    pub fn is_degraded(&self) -> bool {
        self.seat_source == SeatSource::Degraded
    }

    /// Seat the table is currently waiting on.
    pub fn seat_to_act(&self) -> Option<Seat> {
        if self.is_bidding_phase() {
            self.current_bidder
        } else if self.round_complete {
            None
        } else {
            Some(self.current_player)
        }
    }

    /// The three other players in clockwise order from the viewer.
    pub fn opponents(&self) -> Vec<Opponent> {
        let to_act = self.seat_to_act();
        (1..NUM_SEATS)
            .map(|position| {
                let seat = self.seat_at(position);
                Opponent {
                    position,
                    seat,
                    name: self.player_name(seat).map(str::to_owned),
                    hand_size: self.hand_size(seat),
                    to_act: to_act == Some(seat),
                }
            })
            .collect()
    }
}

/// Read-only projection handed to the surrounding UI.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GameView {
    pub connection: ConnectionState,
    pub status: ViewStatus,
    pub snapshot: Option<GameSnapshot>,
    pub play_notice: Option<PlayNotice>,
}

impl GameView {
    pub fn is_halted(&self) -> bool {
        matches!(self.status, ViewStatus::Halted(_))
    }

    pub fn is_your_bid_turn(&self) -> bool {
        self.snapshot.as_ref().is_some_and(GameSnapshot::is_your_bid_turn)
    }

    pub fn is_your_play_turn(&self) -> bool {
        self.snapshot.as_ref().is_some_and(GameSnapshot::is_your_play_turn)
    }
}

/// Whether an `error` message text should halt the session.
pub fn is_fatal_error(message: &str) -> bool {
    let lowered = message.to_lowercase();
    !NON_FATAL_ERRORS.iter().any(|text| lowered.contains(text))
}

/// Infers the viewer's seat from the single unknown slot in `other_hands`.
pub fn infer_seat(other_hands: &[Option<u8>]) -> Option<Seat> {
    let mut unknown = other_hands
        .iter()
        .enumerate()
        .filter(|(_, size)| size.is_none())
        .map(|(seat, _)| seat);
    match (unknown.next(), unknown.next()) {
        (Some(seat), None) if seat < NUM_SEATS => Some(seat),
        _ => None,
    }
}

/// Reducer over the inbound message stream of one session.
#[derive(Debug)]
pub struct Reconciler {
    timings: Timings,
    view: GameView,
    /// Seat from the first snapshot that reported one.
    locked_seat: Option<Seat>,
    /// Shortest delay among outstanding `RequestState` timers.
    retry_pending: Option<Duration>,
    next_notice_id: u64,
}

impl Reconciler {
    pub fn new(timings: Timings) -> Self {
        Self {
            timings,
            view: GameView::default(),
            locked_seat: None,
            retry_pending: None,
            next_notice_id: 0,
        }
    }

    pub fn view(&self) -> &GameView {
        &self.view
    }

    pub fn is_halted(&self) -> bool {
        self.view.is_halted()
    }

    pub fn set_connection(&mut self, state: ConnectionState) {
        self.view.connection = state;
    }

    /// Applies one inbound message in arrival order.
    pub fn apply(&mut self, msg: ServerMessage) -> Vec<Effect> {
        if self.is_halted() {
            debug!(kind = msg.kind(), "Ignoring message, session halted");
            return Vec::new();
        }

        match msg {
            ServerMessage::GameState { state } => self.apply_game_state(state),
            ServerMessage::GameNotReady { message } => {
                debug!(?message, "Game not ready");
                self.view.status = ViewStatus::Loading;
                self.view.snapshot = None;
                self.schedule_retry(self.timings.not_ready_retry)
            }
            ServerMessage::Error { message: None } => {
                debug!("Ignoring error without message");
                Vec::new()
            }
            ServerMessage::Error {
                message: Some(message),
            } => {
                if is_fatal_error(&message) {
                    warn!(%message, "Server error, halting session");
                    self.view.status = ViewStatus::Halted(message);
                    self.view.play_notice = None;
                } else {
                    info!(%message, "Server rejected action");
                }
                Vec::new()
            }
            ServerMessage::PlayError { message } => {
                let message = message.unwrap_or_else(|| DEFAULT_PLAY_ERROR.to_string());
                info!(%message, "Play rejected");
                self.next_notice_id += 1;
                let id = self.next_notice_id;
                self.view.play_notice = Some(PlayNotice { id, message });
                vec![Effect::Schedule {
                    after: self.timings.play_error_ttl,
                    timer: Timer::ClearPlayNotice(id),
                }]
            }
            notification if notification.is_change_notification() => {
                debug!(kind = notification.kind(), "Change notification, resyncing");
                vec![Effect::Send(ClientMessage::GetState)]
            }
            other => {
                debug!(kind = other.kind(), "Ignoring message");
                Vec::new()
            }
        }
    }

    /// Handles a timer previously requested through [`Effect::Schedule`].
    pub fn fire(&mut self, timer: Timer) -> Vec<Effect> {
        match timer {
            Timer::RequestState => {
                // a shorter retry already went out
                if self.retry_pending.take().is_none() || self.is_halted() {
                    return Vec::new();
                }
                vec![Effect::Send(ClientMessage::GetState)]
            }
            Timer::ClearPlayNotice(id) => {
                if self.view.play_notice.as_ref().is_some_and(|n| n.id == id) {
                    self.view.play_notice = None;
                }
                Vec::new()
            }
        }
    }

    fn apply_game_state(&mut self, payload: GameStatePayload) -> Vec<Effect> {
        let reported = payload.your_player_index.filter(|&seat| seat < NUM_SEATS);
        if reported.is_none() {
            if let Some(seat) = payload.your_player_index {
                warn!(seat, "Ignoring out-of-range seat index");
            }
        }

        let (seat, source) = self.resolve_seat(reported, &payload.other_hands);
        if source == SeatSource::Degraded {
            warn!("Seat unknown and not inferable, defaulting to seat 0");
        }

        self.view.snapshot = Some(GameSnapshot::from_payload(payload, seat, source));
        self.view.status = ViewStatus::Ready;

        if reported.is_none() {
            self.schedule_retry(self.timings.missing_seat_retry)
        } else {
            Vec::new()
        }
    }

    fn resolve_seat(&mut self, reported: Option<Seat>, other_hands: &[Option<u8>]) -> (Seat, SeatSource) {
        match (reported, self.locked_seat) {
            (Some(seat), None) => {
                self.locked_seat = Some(seat);
                (seat, SeatSource::Reported)
            }
            (Some(seat), Some(locked)) if seat == locked => (seat, SeatSource::Reported),
            (Some(seat), Some(locked)) => {
                warn!(reported = seat, locked, "Server reported a different seat, keeping the first");
                (locked, SeatSource::Retained)
            }
            (None, Some(locked)) => (locked, SeatSource::Retained),
            (None, None) => match infer_seat(other_hands) {
                Some(seat) => {
                    debug!(seat, "Inferred seat from hand sizes");
                    (seat, SeatSource::Inferred)
                }
                None => (0, SeatSource::Degraded),
            },
        }
    }

    fn schedule_retry(&mut self, after: Duration) -> Vec<Effect> {
        if self.retry_pending.is_some_and(|pending| pending <= after) {
            return Vec::new();
        }
        self.retry_pending = Some(after);
        vec![Effect::Schedule {
            after,
            timer: Timer::RequestState,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schafkopf::{ContractType, Rank, Suit};

    fn payload(seat: Option<Seat>, other_hands: Vec<Option<u8>>) -> GameStatePayload {
        GameStatePayload {
            game_id: "room-1".to_string(),
            players: vec!["anna".into(), "ben".into(), "cleo".into(), "dora".into()],
            your_player_index: seat,
            your_hand: vec![
                Card::new(Suit::Herz, Rank::Ace),
                Card::new(Suit::Gras, Rank::Ober),
            ],
            other_hands,
            ..GameStatePayload::default()
        }
    }

    fn game_state(seat: Option<Seat>, other_hands: Vec<Option<u8>>) -> ServerMessage {
        ServerMessage::GameState {
            state: payload(seat, other_hands),
        }
    }

    fn retry_after(ms: u64) -> Effect {
        Effect::Schedule {
            after: Duration::from_millis(ms),
            timer: Timer::RequestState,
        }
    }

    fn snapshot(reconciler: &Reconciler) -> &GameSnapshot {
        reconciler.view().snapshot.as_ref().unwrap()
    }

    #[test]
    fn test_reported_seat_needs_no_retry() {
        let mut r = Reconciler::new(Timings::default());
        let effects = r.apply(game_state(Some(2), vec![Some(8), Some(8), None, Some(8)]));
        assert!(effects.is_empty());
        assert_eq!(r.view().status, ViewStatus::Ready);
        assert_eq!(snapshot(&r).your_seat, 2);
        assert_eq!(snapshot(&r).seat_source, SeatSource::Reported);
    }

    #[test]
    fn test_missing_seat_inferred_from_unknown_slot() {
        let mut r = Reconciler::new(Timings::default());
        let effects = r.apply(game_state(None, vec![Some(8), None, Some(8)]));
        assert_eq!(effects, vec![retry_after(500)]);
        assert_eq!(snapshot(&r).your_seat, 1);
        assert_eq!(snapshot(&r).seat_source, SeatSource::Inferred);
    }

    #[test]
    fn test_uninferable_seat_is_degraded() {
        let mut r = Reconciler::new(Timings::default());
        r.apply(game_state(None, vec![None, None, Some(8), Some(8)]));
        assert_eq!(snapshot(&r).your_seat, 0);
        assert!(snapshot(&r).is_degraded());

        let mut r = Reconciler::new(Timings::default());
        r.apply(game_state(None, vec![]));
        assert!(snapshot(&r).is_degraded());
    }

    #[test]
    fn test_out_of_range_seat_treated_as_missing() {
        let mut r = Reconciler::new(Timings::default());
        let effects = r.apply(game_state(Some(7), vec![Some(8), Some(8), Some(8), None]));
        assert_eq!(effects, vec![retry_after(500)]);
        assert_eq!(snapshot(&r).your_seat, 3);
        assert_eq!(snapshot(&r).seat_source, SeatSource::Inferred);
    }

    #[test]
    fn test_seat_is_locked_once_reported() {
        let mut r = Reconciler::new(Timings::default());
        r.apply(game_state(Some(1), vec![Some(8), None, Some(8), Some(8)]));

        r.apply(game_state(None, vec![None, Some(8), Some(8), Some(8)]));
        assert_eq!(snapshot(&r).your_seat, 1);
        assert_eq!(snapshot(&r).seat_source, SeatSource::Retained);

        r.apply(game_state(Some(3), vec![]));
        assert_eq!(snapshot(&r).your_seat, 1);
    }

    #[test]
    fn test_only_one_retry_outstanding() {
        let mut r = Reconciler::new(Timings::default());
        assert_eq!(r.apply(game_state(None, vec![])), vec![retry_after(500)]);
        assert!(r.apply(game_state(None, vec![])).is_empty());
        assert!(r.apply(ServerMessage::GameNotReady { message: None }).is_empty());

        assert_eq!(
            r.fire(Timer::RequestState),
            vec![Effect::Send(ClientMessage::GetState)]
        );
        assert_eq!(
            r.apply(ServerMessage::GameNotReady { message: None }),
            vec![retry_after(1000)]
        );
    }

    #[test]
    fn test_missing_seat_retry_overtakes_not_ready_retry() {
        let mut r = Reconciler::new(Timings::default());
        assert_eq!(
            r.apply(ServerMessage::GameNotReady { message: None }),
            vec![retry_after(1000)]
        );
        assert_eq!(r.apply(game_state(None, vec![])), vec![retry_after(500)]);
        assert!(r.apply(game_state(None, vec![])).is_empty());

        // the 500ms timer fires first, the 1000ms one finds nothing pending
        assert_eq!(
            r.fire(Timer::RequestState),
            vec![Effect::Send(ClientMessage::GetState)]
        );
        assert!(r.fire(Timer::RequestState).is_empty());
    }

    #[test]
    fn test_not_ready_clears_snapshot() {
        let mut r = Reconciler::new(Timings::default());
        r.apply(game_state(Some(0), vec![]));
        r.apply(ServerMessage::GameNotReady {
            message: Some("Game not started".into()),
        });
        assert_eq!(r.view().status, ViewStatus::Loading);
        assert!(r.view().snapshot.is_none());
    }

    #[test]
    fn test_notifications_pull_full_state() {
        let mut r = Reconciler::new(Timings::default());
        for msg in [
            ServerMessage::GameStateUpdate,
            ServerMessage::BidMade,
            ServerMessage::BidPassed,
            ServerMessage::BiddingComplete,
            ServerMessage::AllPassed,
            ServerMessage::CardsReshuffled,
            ServerMessage::TrickComplete,
        ] {
            assert_eq!(r.apply(msg), vec![Effect::Send(ClientMessage::GetState)]);
        }
    }

    #[test]
    fn test_turn_errors_are_not_fatal() {
        let mut r = Reconciler::new(Timings::default());
        r.apply(ServerMessage::Error {
            message: Some("Not your turn".into()),
        });
        r.apply(ServerMessage::Error {
            message: Some("Cannot play Herz Ace now".into()),
        });
        r.apply(ServerMessage::Error { message: None });
        assert!(!r.is_halted());
    }

    #[test]
    fn test_fatal_error_halts_everything() {
        let mut r = Reconciler::new(Timings::default());
        r.apply(game_state(Some(0), vec![]));
        r.apply(ServerMessage::Error {
            message: Some("Game not found".into()),
        });
        assert_eq!(r.view().status, ViewStatus::Halted("Game not found".into()));

        assert!(r.apply(ServerMessage::TrickComplete).is_empty());
        assert!(r.apply(game_state(Some(0), vec![])).is_empty());
        assert!(r.fire(Timer::RequestState).is_empty());
        assert!(r.is_halted());
    }

    #[test]
    fn test_play_error_notice_expires() {
        let mut r = Reconciler::new(Timings::default());
        r.apply(game_state(Some(0), vec![]));
        let before = snapshot(&r).clone();

        let effects = r.apply(ServerMessage::PlayError { message: None });
        let notice = r.view().play_notice.clone().unwrap();
        assert_eq!(notice.message, DEFAULT_PLAY_ERROR);
        assert_eq!(
            effects,
            vec![Effect::Schedule {
                after: Duration::from_secs(5),
                timer: Timer::ClearPlayNotice(notice.id),
            }]
        );
        assert_eq!(snapshot(&r), &before);

        r.fire(Timer::ClearPlayNotice(notice.id));
        assert!(r.view().play_notice.is_none());
        assert_eq!(snapshot(&r), &before);
    }

    #[test]
    fn test_stale_notice_timer_keeps_newer_notice() {
        let mut r = Reconciler::new(Timings::default());
        r.apply(ServerMessage::PlayError {
            message: Some("first".into()),
        });
        let first = r.view().play_notice.clone().unwrap();
        r.apply(ServerMessage::PlayError {
            message: Some("second".into()),
        });

        r.fire(Timer::ClearPlayNotice(first.id));
        assert_eq!(r.view().play_notice.as_ref().unwrap().message, "second");
    }

    #[test]
    fn test_turn_derivation() {
        let mut state = payload(Some(1), vec![Some(8), None, Some(8), Some(8)]);
        state.bidding_phase = true;
        state.current_bidder = Some(1);
        state.current_player = 1;
        state.passes_in_a_row = 2;

        let mut r = Reconciler::new(Timings::default());
        r.apply(ServerMessage::GameState {
            state: state.clone(),
        });
        assert!(snapshot(&r).is_your_bid_turn());
        assert!(!snapshot(&r).is_your_play_turn());
        assert_eq!(snapshot(&r).passes_in_a_row, 2);

        state.contract = Some("Solo".into());
        r.apply(ServerMessage::GameState {
            state: state.clone(),
        });
        assert!(!snapshot(&r).is_bidding_phase());
        assert!(snapshot(&r).is_your_play_turn());

        state.round_complete = true;
        r.apply(ServerMessage::GameState { state });
        assert!(!snapshot(&r).is_your_play_turn());
    }

    #[test]
    fn test_passes_reset_outside_bidding() {
        let mut state = payload(Some(0), vec![]);
        state.passes_in_a_row = 2;
        let mut r = Reconciler::new(Timings::default());
        r.apply(ServerMessage::GameState { state });
        assert_eq!(snapshot(&r).passes_in_a_row, 0);
    }

    #[test]
    fn test_relative_seating() {
        let mut state = payload(Some(2), vec![Some(7), Some(6), None, Some(8)]);
        state.current_player = 3;
        state.highest_bid = Some(Bid {
            contract_type: ContractType::Wenz,
            trump_suit: None,
            called_ace: None,
            bidder_seat: 3,
        });
        let mut r = Reconciler::new(Timings::default());
        r.apply(ServerMessage::GameState { state });

        let opponents = snapshot(&r).opponents();
        let seats: Vec<Seat> = opponents.iter().map(|o| o.seat).collect();
        assert_eq!(seats, vec![3, 0, 1]);
        assert_eq!(opponents[0].name.as_deref(), Some("dora"));
        assert_eq!(opponents[0].hand_size, Some(8));
        assert!(opponents[0].to_act);
        assert_eq!(opponents[2].hand_size, Some(6));
        assert!(!opponents[2].to_act);
        assert_eq!(snapshot(&r).hand_size(2), Some(2));
    }

    #[test]
    fn test_error_classification() {
        assert!(!is_fatal_error("Not your turn"));
        assert!(!is_fatal_error("cannot play that card"));
        assert!(is_fatal_error("Room closed"));
    }
}
