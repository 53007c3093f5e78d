//! Networked duel session.
//!
//! # Bootstrap
//!
//! ```text
//! send Snapshot(me) -> await Snapshot(opponent) -> send Ready -> await Ready
//! ```
//!
//! # Turn Loop
//!
//! The host acts first. On its turn a peer asks its [`Frontend`] for a valid
//! action, resolves it locally, then sends `Action` followed by `Snapshot`.
//! The passive peer waits for that pair, replays the action against its own
//! combatant and mirrors the actor's HP and mana from the snapshot. The loop
//! ends when either side falls; a final `Disconnect` is then sent. Any error
//! aborts the loop without sending anything further.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use duel_core::combatant::Combatant;
use duel_core::components::BodyPart;
use duel_core::engine::{resolve_turn, Action, TurnOutcome};
use duel_core::error::DuelError;
use duel_core::protocol::{Message, MessageKind, ProtocolGate};

use crate::codec::WireFormat;
use crate::connection::{Connection, MessageSender, SideEvent};
use crate::error::{Result, SessionError};
use crate::NetConfig;

/// Which end of the connection this peer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Accepted the connection; acts first.
    Host,
    /// Initiated the connection.
    Guest,
}

/// One resolved turn, as shown to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// Round the turn belonged to.
    pub round: u32,
    /// Whether the local player acted.
    pub mine: bool,
    /// Name of the acting combatant.
    pub actor: String,
    /// The action taken.
    pub action: Action,
    /// Resolution result (the actor is reported as the attacker).
    pub outcome: TurnOutcome,
}

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Whether the local player is the one standing.
    pub won: bool,
    /// Turns played by both sides.
    pub turns: u32,
}

/// Async action source and display for a networked duel.
#[async_trait]
pub trait Frontend: Send {
    /// Choose the local player's next action.
    async fn choose_action(&mut self, me: &Combatant, opponent: &Combatant, round: u32) -> Action;

    /// The previous choice was rejected; another will be requested.
    async fn show_rejection(&mut self, error: &DuelError) {
        tracing::debug!(%error, "Action rejected");
    }

    /// A turn (either side's) has resolved.
    async fn show_turn(&mut self, _report: &TurnReport) {}
}

/// Display for out-of-band messages, owned by the listener task.
pub trait ChatDisplay: Send + 'static {
    /// Show a chat line from the peer.
    fn show_chat(&mut self, text: &str);

    /// The peer has gone.
    fn peer_left(&mut self) {}
}

/// A bootstrapped duel with a remote peer.
#[derive(Debug)]
pub struct Session {
    connection: Connection,
    sender: MessageSender,
    gate: ProtocolGate,
    me: Combatant,
    opponent: Combatant,
    my_turn: bool,
    turns_taken: u32,
    my_guard: Option<BodyPart>,
    opponent_guard: Option<BodyPart>,
}

impl Session {
    /// Exchange snapshots and readiness over `stream`.
    ///
    /// # Errors
    ///
    /// Returns an error if the peer misbehaves or the connection fails.
    pub async fn bootstrap<S>(stream: S, format: WireFormat, me: Combatant, role: Role) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let mut connection = Connection::new(stream, format);
        let sender = connection.sender();
        let mut gate = ProtocolGate::new();

        sender.send(&Message::Snapshot(me.snapshot())).await?;
        let opponent = match receive(&mut connection, &mut gate).await? {
            Message::Snapshot(snapshot) => Combatant::from_snapshot(snapshot),
            other => return Err(unexpected(MessageKind::Snapshot, &other)),
        };

        sender.send(&Message::Ready).await?;
        receive(&mut connection, &mut gate).await?;

        tracing::info!(?role, me = %me.name, opponent = %opponent.name, "Session ready");
        Ok(Self {
            connection,
            sender,
            gate,
            me,
            opponent,
            my_turn: role == Role::Host,
            turns_taken: 0,
            my_guard: None,
            opponent_guard: None,
        })
    }

    /// The local combatant.
    #[must_use]
    pub const fn me(&self) -> &Combatant {
        &self.me
    }

    /// The local mirror of the remote combatant.
    #[must_use]
    pub const fn opponent(&self) -> &Combatant {
        &self.opponent
    }

    /// Whether the local player acts next.
    #[must_use]
    pub const fn is_my_turn(&self) -> bool {
        self.my_turn
    }

    /// Turns played by both sides.
    #[must_use]
    pub const fn turns_taken(&self) -> u32 {
        self.turns_taken
    }

    /// Current round: one round per two-sided exchange.
    #[must_use]
    pub const fn round(&self) -> u32 {
        1 + self.turns_taken / 2
    }

    /// Whether either side has fallen.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        !self.me.is_alive() || !self.opponent.is_alive()
    }

    /// Handle for sending chat from another task.
    #[must_use]
    pub fn sender(&self) -> MessageSender {
        self.sender.clone()
    }

    /// Start the background listener that shows chat.
    ///
    /// Returns `None` if the listener was already started.
    pub fn spawn_listener<D: ChatDisplay>(&mut self, display: D) -> Option<JoinHandle<()>> {
        let side = self.connection.take_side_events()?;
        Some(tokio::spawn(listen(side, display)))
    }

    /// Play one turn, local or remote.
    ///
    /// # Errors
    ///
    /// Returns an error on any protocol, decode or transport failure, or
    /// when the peer announces an action that does not resolve.
    pub async fn play_turn<F: Frontend + ?Sized>(&mut self, frontend: &mut F) -> Result<TurnReport> {
        let report = if self.my_turn {
            self.act(frontend).await?
        } else {
            self.await_opponent().await?
        };
        self.my_turn = !self.my_turn;
        self.turns_taken += 1;
        Ok(report)
    }

    /// Play turns until a side falls, then send Disconnect.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`play_turn`](Self::play_turn);
    /// nothing further is sent in that case.
    pub async fn run<F: Frontend + ?Sized>(&mut self, frontend: &mut F) -> Result<SessionOutcome> {
        while !self.is_over() {
            let report = self.play_turn(frontend).await?;
            frontend.show_turn(&report).await;
        }
        if let Err(error) = self.sender.send(&Message::Disconnect).await {
            tracing::debug!(%error, "Final Disconnect not delivered");
        }
        let outcome = SessionOutcome {
            won: self.me.is_alive(),
            turns: self.turns_taken,
        };
        tracing::info!(won = outcome.won, turns = outcome.turns, "Session finished");
        Ok(outcome)
    }

    async fn act<F: Frontend + ?Sized>(&mut self, frontend: &mut F) -> Result<TurnReport> {
        let round = self.round();
        let (action, outcome) = loop {
            let action = frontend.choose_action(&self.me, &self.opponent, round).await;
            match resolve_turn(&mut self.me, &mut self.opponent, action, self.opponent_guard) {
                Ok(outcome) => break (action, outcome),
                Err(error) if error.is_recoverable() => {
                    tracing::warn!(%error, "Local action rejected");
                    frontend.show_rejection(&error).await;
                }
                Err(error) => return Err(error.into()),
            }
        };
        self.my_guard = action.guard();

        self.sender.send(&Message::from(action)).await?;
        self.sender.send(&Message::Snapshot(self.me.snapshot())).await?;

        tracing::debug!(round, ?action, "Local turn sent");
        Ok(TurnReport {
            round,
            mine: true,
            actor: self.me.name.clone(),
            action,
            outcome,
        })
    }

    async fn await_opponent(&mut self) -> Result<TurnReport> {
        let round = self.round();
        let action = match receive(&mut self.connection, &mut self.gate).await? {
            Message::Action(wire) => {
                Action::try_from(wire).map_err(|e| SessionError::Decode(e.to_string()))?
            }
            other => return Err(unexpected(MessageKind::Action, &other)),
        };
        let snapshot = match receive(&mut self.connection, &mut self.gate).await? {
            Message::Snapshot(snapshot) => snapshot,
            other => return Err(unexpected(MessageKind::Snapshot, &other)),
        };

        let outcome = resolve_turn(&mut self.opponent, &mut self.me, action, self.my_guard)?;
        self.opponent.apply_vitals(&snapshot);
        self.opponent_guard = action.guard();

        tracing::debug!(round, ?action, "Remote turn replayed");
        Ok(TurnReport {
            round,
            mine: false,
            actor: self.opponent.name.clone(),
            action,
            outcome,
        })
    }
}

/// Wait for the next turn-sequence message and run it through the gate.
async fn receive(connection: &mut Connection, gate: &mut ProtocolGate) -> Result<Message> {
    let expected = gate.expected();
    tracing::trace!(%expected, "Waiting for peer");
    let message = connection.recv_turn().await?;
    gate.admit(message.kind())?;
    Ok(message)
}

fn unexpected(expected: MessageKind, received: &Message) -> SessionError {
    SessionError::ProtocolViolation {
        expected,
        received: received.kind(),
    }
}

async fn listen<D: ChatDisplay>(mut side: mpsc::UnboundedReceiver<SideEvent>, mut display: D) {
    while let Some(event) = side.recv().await {
        match event {
            SideEvent::Chat(text) => display.show_chat(&text),
            SideEvent::Disconnected => {
                display.peer_left();
                break;
            }
        }
    }
}

/// Accept one peer and bootstrap as host.
///
/// # Errors
///
/// Returns an error if binding, accepting or bootstrapping fails.
pub async fn host(config: &NetConfig, me: Combatant) -> Result<Session> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "Waiting for a challenger");
    let (stream, peer) = listener.accept().await?;
    tracing::info!(%peer, "Challenger connected");
    Session::bootstrap(stream, config.wire_format, me, Role::Host).await
}

/// Connect to a host and bootstrap as guest.
///
/// # Errors
///
/// Returns an error if connecting or bootstrapping fails.
pub async fn join(config: &NetConfig, me: Combatant) -> Result<Session> {
    let stream = TcpStream::connect(config.connect_addr()).await?;
    tracing::info!(addr = %config.connect_addr(), "Connected to host");
    Session::bootstrap(stream, config.wire_format, me, Role::Guest).await
}
