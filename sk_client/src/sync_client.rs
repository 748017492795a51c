//! Sync facade: the single entry point the UI talks to.
//!
//! [`SyncClient`] opens one [`Session`] per room, runs a driver task that
//! feeds the session's messages and timers through a [`Reconciler`], and
//! publishes every resulting [`GameView`] on a watch channel. User intents
//! are checked against the latest view before anything is sent.

use schafkopf::{
    Bid, Card, ClientMessage, ContractBid,
    bidding::{self, BidError},
};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::{
    sync::watch,
    task::{JoinHandle, JoinSet},
};
use tracing::{debug, info};

use crate::{
    config::{ClientConfig, ConfigError},
    reconciler::{Effect, GameSnapshot, GameView, Reconciler, Timer, ViewStatus},
    transport::{ConnectionState, Connector, Session, Subscription},
};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no credential available, log in first")]
    MissingCredential,
    #[error("no room selected")]
    MissingRoom,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no game is open")]
    NotOpen,
    #[error("game halted: {0}")]
    Halted(String),
    #[error("waiting for the game state")]
    NoSnapshot,
    #[error("it is not your turn to play")]
    NotYourTurn,
    #[error("it is not your turn to bid")]
    NotYourBidTurn,
    #[error("{0} is not in your hand")]
    CardNotInHand(Card),
    #[error("invalid bid: {0}")]
    InvalidBid(#[from] BidError),
    #[error("{bid} does not outbid {highest}")]
    BidTooLow { bid: ContractBid, highest: Bid },
}

struct ActiveGame {
    session: Arc<Session>,
    driver: JoinHandle<()>,
}

/// Keeps a local view of one game in sync with the server.
pub struct SyncClient {
    connector: Arc<dyn Connector>,
    config: ClientConfig,
    view: Arc<watch::Sender<GameView>>,
    /// Bumped on every open and close. A driver only publishes while the
    /// epoch it was started with is current.
    epoch: Arc<Mutex<u64>>,
    active: Option<ActiveGame>,
}

impl SyncClient {
    pub fn new(connector: Arc<dyn Connector>, config: ClientConfig) -> Self {
        let closed = GameView {
            connection: ConnectionState::Closed,
            ..GameView::default()
        };
        Self {
            connector,
            config,
            view: Arc::new(watch::Sender::new(closed)),
            epoch: Arc::new(Mutex::new(0)),
            active: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Read-only view updates. Every receiver sees the latest view.
    pub fn subscribe(&self) -> watch::Receiver<GameView> {
        self.view.subscribe()
    }

    /// Copy of the current view.
    pub fn view(&self) -> GameView {
        self.view.borrow().clone()
    }

    pub fn room_id(&self) -> Option<&str> {
        self.active.as_ref().map(|game| game.session.room_id())
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Opens a session for `room_id`, closing any previous one first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        &mut self,
        room_id: &str,
        credential: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<(), SyncError> {
        let credential = credential
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(SyncError::MissingCredential)?;
        let room_id = room_id.trim();
        if room_id.is_empty() {
            return Err(SyncError::MissingRoom);
        }
        let url = self.config.endpoint(room_id, credential)?;

        self.close();

        let epoch = {
            let mut current = self.epoch.lock().unwrap_or_else(PoisonError::into_inner);
            *current += 1;
            self.view.send_replace(GameView::default());
            *current
        };

        let timings = self.config.timings;
        let (session, subscription) = Session::open(
            Arc::clone(&self.connector),
            url.to_string(),
            room_id,
            user_id.map(str::to_owned),
            timings.initial_state_delay,
        );
        let session = Arc::new(session);

        let driver = tokio::spawn(drive(
            epoch,
            Arc::clone(&self.epoch),
            Arc::clone(&session),
            subscription,
            Reconciler::new(timings),
            Arc::clone(&self.view),
        ));

        info!(room = %room_id, user = ?session.user_id(), epoch, "Game opened");
        self.active = Some(ActiveGame { session, driver });
        Ok(())
    }

    /// Closes the current session. Pending timers are cancelled and nothing
    /// from the old session reaches the view afterwards.
    pub fn close(&mut self) {
        let Some(game) = self.active.take() else {
            return;
        };

        {
            let mut current = self.epoch.lock().unwrap_or_else(PoisonError::into_inner);
            *current += 1;
            self.view.send_replace(GameView {
                connection: ConnectionState::Closed,
                ..GameView::default()
            });
        }

        game.session.close();
        game.driver.abort();
        info!(room = %game.session.room_id(), "Game closed");
    }

    /// Asks the server for a fresh snapshot.
    pub fn request_state(&self) -> Result<(), SyncError> {
        let session = self.session()?;
        if let ViewStatus::Halted(reason) = &self.view.borrow().status {
            return Err(SyncError::Halted(reason.clone()));
        }
        session.send(ClientMessage::GetState);
        Ok(())
    }

    pub fn play_card(&self, card: Card) -> Result<(), SyncError> {
        let session = self.session()?;
        {
            let view = self.view.borrow();
            let snapshot = ready_snapshot(&view)?;
            if !snapshot.is_your_play_turn() {
                return Err(SyncError::NotYourTurn);
            }
            if !snapshot.holds(&card) {
                return Err(SyncError::CardNotInHand(card));
            }
        }
        session.send(ClientMessage::play_card(card));
        Ok(())
    }

    pub fn pass(&self) -> Result<(), SyncError> {
        let session = self.session()?;
        {
            let view = self.view.borrow();
            if !ready_snapshot(&view)?.is_your_bid_turn() {
                return Err(SyncError::NotYourBidTurn);
            }
        }
        session.send(ClientMessage::Pass);
        Ok(())
    }

    pub fn select_contract(&self, bid: ContractBid) -> Result<(), SyncError> {
        let session = self.session()?;
        {
            let view = self.view.borrow();
            let snapshot = ready_snapshot(&view)?;
            if !snapshot.is_your_bid_turn() {
                return Err(SyncError::NotYourBidTurn);
            }
            bid.validate()?;
            let highest = snapshot.highest_bid.as_ref();
            if !bidding::can_bid(&bid, highest) {
                if let Some(highest) = highest {
                    return Err(SyncError::BidTooLow {
                        bid,
                        highest: highest.clone(),
                    });
                }
            }
        }
        session.send(ClientMessage::from(bid));
        Ok(())
    }

    fn session(&self) -> Result<&Session, SyncError> {
        self.active
            .as_ref()
            .map(|game| game.session.as_ref())
            .ok_or(SyncError::NotOpen)
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        self.close();
    }
}

fn ready_snapshot(view: &GameView) -> Result<&GameSnapshot, SyncError> {
    if let ViewStatus::Halted(reason) = &view.status {
        return Err(SyncError::Halted(reason.clone()));
    }
    view.snapshot.as_ref().ok_or(SyncError::NoSnapshot)
}

/// Runs one session: messages, timers and connection changes go through
/// the reconciler in arrival order.
async fn drive(
    epoch: u64,
    current_epoch: Arc<Mutex<u64>>,
    session: Arc<Session>,
    mut subscription: Subscription,
    mut reconciler: Reconciler,
    view: Arc<watch::Sender<GameView>>,
) {
    let mut timers: JoinSet<Timer> = JoinSet::new();
    let mut connection = session.state();
    let mut inbound_open = true;
    let mut watching = true;

    reconciler.set_connection(*connection.borrow_and_update());
    let mut effects = Vec::new();

    loop {
        let published = publish(
            epoch,
            &current_epoch,
            &session,
            &reconciler,
            effects,
            &mut timers,
            &view,
        );
        if !published {
            debug!(epoch, "Driver superseded, stopping");
            break;
        }

        effects = tokio::select! {
            msg = subscription.next(), if inbound_open => match msg {
                Some(msg) => reconciler.apply(msg),
                None => {
                    inbound_open = false;
                    Vec::new()
                }
            },

            Some(fired) = timers.join_next(), if !timers.is_empty() => match fired {
                Ok(timer) => reconciler.fire(timer),
                Err(_) => Vec::new(),
            },

            changed = connection.changed(), if watching => {
                if changed.is_ok() {
                    reconciler.set_connection(*connection.borrow_and_update());
                } else {
                    watching = false;
                }
                Vec::new()
            },

            else => break,
        };
    }

    debug!(epoch, "Driver finished");
}

/// Carries out `effects` and publishes the view, unless a newer session
/// has taken over. Returns whether this driver is still current.
fn publish(
    epoch: u64,
    current_epoch: &Mutex<u64>,
    session: &Session,
    reconciler: &Reconciler,
    effects: Vec<Effect>,
    timers: &mut JoinSet<Timer>,
    view: &watch::Sender<GameView>,
) -> bool {
    let current = current_epoch.lock().unwrap_or_else(PoisonError::into_inner);
    if *current != epoch {
        return false;
    }
    for effect in effects {
        match effect {
            Effect::Send(msg) => session.send(msg),
            Effect::Schedule { after, timer } => {
                debug!(?timer, ?after, "Scheduling timer");
                timers.spawn(async move {
                    tokio::time::sleep(after).await;
                    timer
                });
            }
        }
    }
    view.send_replace(reconciler.view().clone());
    true
}
