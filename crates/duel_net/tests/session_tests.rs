//! Two sessions over in-memory streams.

use async_trait::async_trait;
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;

use duel_core::prelude::*;
use duel_net::codec::{FrameReader, FrameWriter, WireFormat};
use duel_net::error::SessionError;
use duel_net::session::{ChatDisplay, Frontend, Role, Session, TurnReport};
use duel_test_utils::fixtures::{battlemage, fighter, melee, ScriptedController};

/// Scripted frontend that records every turn it is shown.
struct Scripted {
    controller: ScriptedController,
    reports: Vec<TurnReport>,
}

impl Scripted {
    fn new(controller: ScriptedController) -> Self {
        Self {
            controller,
            reports: Vec::new(),
        }
    }
}

#[async_trait]
impl Frontend for Scripted {
    async fn choose_action(&mut self, me: &Combatant, opponent: &Combatant, round: u32) -> Action {
        self.controller.choose_action(me, opponent, round)
    }

    async fn show_rejection(&mut self, error: &DuelError) {
        self.controller.reject(error);
    }

    async fn show_turn(&mut self, report: &TurnReport) {
        self.reports.push(report.clone());
    }
}

struct ForwardChat(mpsc::UnboundedSender<String>);

impl ChatDisplay for ForwardChat {
    fn show_chat(&mut self, text: &str) {
        let _ = self.0.send(text.to_string());
    }
}

type RawPeer = (
    FrameReader<ReadHalf<DuplexStream>>,
    FrameWriter<WriteHalf<DuplexStream>>,
);

fn raw_peer(stream: DuplexStream, format: WireFormat) -> RawPeer {
    let (read, write) = tokio::io::split(stream);
    (FrameReader::new(read, format), FrameWriter::new(write, format))
}

async fn pair(host: Combatant, guest: Combatant, format: WireFormat) -> (Session, Session) {
    let (a, b) = tokio::io::duplex(64 * 1024);
    let (host, guest) = tokio::join!(
        Session::bootstrap(a, format, host, Role::Host),
        Session::bootstrap(b, format, guest, Role::Guest),
    );
    (host.unwrap(), guest.unwrap())
}

/// Guest session whose peer has completed the handshake by hand.
async fn guest_with_raw_host() -> (Session, RawPeer) {
    let (a, b) = tokio::io::duplex(64 * 1024);
    let (mut reader, mut writer) = raw_peer(b, WireFormat::Json);
    writer
        .write_message(&Message::Snapshot(fighter("Raw").snapshot()))
        .await
        .unwrap();
    writer.write_message(&Message::Ready).await.unwrap();
    let session = Session::bootstrap(a, WireFormat::Json, fighter("Guest"), Role::Guest)
        .await
        .unwrap();
    assert!(matches!(
        reader.read_message().await.unwrap(),
        Some(Message::Snapshot(_))
    ));
    assert_eq!(reader.read_message().await.unwrap(), Some(Message::Ready));
    (session, (reader, writer))
}

// ============================================================================
// Full sessions
// ============================================================================

#[tokio::test]
async fn test_duel_to_knockout_over_json() {
    let (mut host, mut guest) = pair(fighter("Host"), fighter("Guest"), WireFormat::Json).await;
    assert_eq!(host.opponent().name, "Guest");
    assert!(host.is_my_turn());
    assert!(!guest.is_my_turn());

    let mut host_ui = Scripted::new(ScriptedController::repeating(melee(
        BodyPart::Torso,
        BodyPart::Legs,
    )));
    let mut guest_ui = Scripted::new(ScriptedController::repeating(melee(
        BodyPart::Torso,
        BodyPart::Head,
    )));

    let (host_outcome, guest_outcome) =
        tokio::join!(host.run(&mut host_ui), guest.run(&mut guest_ui));
    let host_outcome = host_outcome.unwrap();
    let guest_outcome = guest_outcome.unwrap();

    // Every strike lands for 10; the host strikes first and wins on turn 19
    assert!(host_outcome.won);
    assert!(!guest_outcome.won);
    assert_eq!(host_outcome.turns, 19);
    assert_eq!(guest_outcome.turns, 19);
    assert_eq!(host.me().hp(), 10);
    assert_eq!(guest.me().hp(), 0);

    // Both views agree
    assert_eq!(host.me().hp(), guest.opponent().hp());
    assert_eq!(guest.me().hp(), host.opponent().hp());

    assert_eq!(host_ui.reports.len(), 19);
    assert!(host_ui.reports[0].mine);
    assert!(!host_ui.reports[1].mine);
    assert_eq!(host_ui.reports[1].round, 1);
    assert_eq!(host_ui.reports[2].round, 2);
    assert_eq!(guest_ui.reports[0].actor, "Host");
}

#[tokio::test]
async fn test_abilities_stay_in_sync_over_bincode() {
    let (mut host, mut guest) =
        pair(battlemage("Host"), battlemage("Guest"), WireFormat::Bincode).await;

    let mut host_ui = Scripted::new(ScriptedController::new(
        [
            Action::Ability {
                index: 2,
                defend: Some(BodyPart::Legs),
            },
            Action::Item {
                index: 0,
                defend: BodyPart::Legs,
            },
        ],
        melee(BodyPart::Torso, BodyPart::Legs),
    ));
    let mut guest_ui = Scripted::new(ScriptedController::new(
        [
            Action::Ability {
                index: 0,
                defend: None,
            },
            Action::Ability {
                index: 1,
                defend: Some(BodyPart::Head),
            },
        ],
        melee(BodyPart::Torso, BodyPart::Head),
    ));

    let (host_outcome, guest_outcome) =
        tokio::join!(host.run(&mut host_ui), guest.run(&mut guest_ui));
    let host_outcome = host_outcome.unwrap();
    let guest_outcome = guest_outcome.unwrap();

    // Buffed and armed, the host hits for 38
    assert!(host_outcome.won);
    assert!(!guest_outcome.won);
    assert_eq!(host.me().strength(), 38);
    for (mine, mirror) in [(host.me(), guest.opponent()), (guest.me(), host.opponent())] {
        assert_eq!(mine.hp(), mirror.hp());
        assert_eq!(mine.mana(), mirror.mana());
        assert_eq!(mine.strength(), mirror.strength());
        assert_eq!(mine.inventory.len(), mirror.inventory.len());
    }
}

#[tokio::test]
async fn test_veteran_buffs_reach_the_mirror() {
    let mut veteran = fighter("Host");
    veteran.buffs.attack = 20;
    let (mut host, mut guest) = pair(veteran, fighter("Guest"), WireFormat::Json).await;
    assert_eq!(guest.opponent().strength(), 30);

    let mut host_ui = Scripted::new(ScriptedController::repeating(melee(
        BodyPart::Torso,
        BodyPart::Legs,
    )));
    let mut guest_ui = Scripted::new(ScriptedController::repeating(melee(
        BodyPart::Head,
        BodyPart::Head,
    )));
    let (host_turn, guest_turn) = tokio::join!(
        host.play_turn(&mut host_ui),
        guest.play_turn(&mut guest_ui)
    );
    host_turn.unwrap();
    guest_turn.unwrap();

    assert_eq!(guest.me().hp(), 70);
    assert_eq!(host.opponent().hp(), guest.me().hp());
}

#[tokio::test]
async fn test_rejected_choice_is_asked_again() {
    let (mut host, mut guest) = pair(fighter("Host"), fighter("Guest"), WireFormat::Json).await;

    let mut host_ui = Scripted::new(ScriptedController::repeating(melee(
        BodyPart::Head,
        BodyPart::Legs,
    )));
    // A plain fighter knows no abilities
    let mut guest_ui = Scripted::new(ScriptedController::new(
        [Action::Ability {
            index: 0,
            defend: None,
        }],
        melee(BodyPart::Torso, BodyPart::Head),
    ));

    let (host_outcome, guest_outcome) =
        tokio::join!(host.run(&mut host_ui), guest.run(&mut guest_ui));
    host_outcome.unwrap();
    guest_outcome.unwrap();

    assert_eq!(
        guest_ui.controller.rejections,
        vec![DuelError::InvalidAbility(0)]
    );
    assert!(host_ui.controller.rejections.is_empty());
}

// ============================================================================
// Misbehaving peers
// ============================================================================

#[tokio::test]
async fn test_ready_before_snapshot_is_violation() {
    let (a, b) = tokio::io::duplex(64 * 1024);
    let (_reader, mut writer) = raw_peer(b, WireFormat::Json);
    writer.write_message(&Message::Ready).await.unwrap();

    let result = Session::bootstrap(a, WireFormat::Json, fighter("Host"), Role::Host).await;
    assert!(matches!(
        result,
        Err(SessionError::ProtocolViolation {
            expected: MessageKind::Snapshot,
            received: MessageKind::Ready,
        })
    ));
}

#[tokio::test]
async fn test_snapshot_instead_of_action_is_violation() {
    let (mut guest, (_reader, mut writer)) = guest_with_raw_host().await;
    writer
        .write_message(&Message::Snapshot(fighter("Raw").snapshot()))
        .await
        .unwrap();

    let mut ui = Scripted::new(ScriptedController::repeating(melee(
        BodyPart::Head,
        BodyPart::Head,
    )));
    let error = guest.play_turn(&mut ui).await.unwrap_err();
    assert!(matches!(
        error,
        SessionError::ProtocolViolation {
            expected: MessageKind::Action,
            received: MessageKind::Snapshot,
        }
    ));
    assert_eq!(guest.turns_taken(), 0);
}

#[tokio::test]
async fn test_disconnect_mid_session() {
    let (mut guest, (_reader, mut writer)) = guest_with_raw_host().await;
    writer.write_message(&Message::Disconnect).await.unwrap();

    let mut ui = Scripted::new(ScriptedController::repeating(melee(
        BodyPart::Head,
        BodyPart::Head,
    )));
    assert!(matches!(
        guest.run(&mut ui).await,
        Err(SessionError::PeerDisconnected)
    ));
}

#[tokio::test]
async fn test_unresolvable_peer_action_fails() {
    let (mut guest, (_reader, mut writer)) = guest_with_raw_host().await;
    writer
        .write_message(&Message::from(Action::Ability {
            index: 5,
            defend: None,
        }))
        .await
        .unwrap();
    writer
        .write_message(&Message::Snapshot(fighter("Raw").snapshot()))
        .await
        .unwrap();

    let mut ui = Scripted::new(ScriptedController::repeating(melee(
        BodyPart::Head,
        BodyPart::Head,
    )));
    assert!(matches!(
        guest.play_turn(&mut ui).await,
        Err(SessionError::InvalidAction(DuelError::InvalidAbility(5)))
    ));
}

#[tokio::test]
async fn test_incomplete_action_frame_is_decode_error() {
    let (mut guest, (_reader, mut writer)) = guest_with_raw_host().await;
    let wire = ActionMessage {
        kind: ActionKind::Attack,
        target: None,
        defend: Some(BodyPart::Head),
        ability: None,
        item: None,
    };
    writer.write_message(&Message::Action(wire)).await.unwrap();
    writer
        .write_message(&Message::Snapshot(fighter("Raw").snapshot()))
        .await
        .unwrap();

    let mut ui = Scripted::new(ScriptedController::repeating(melee(
        BodyPart::Head,
        BodyPart::Head,
    )));
    assert!(matches!(
        guest.play_turn(&mut ui).await,
        Err(SessionError::Decode(_))
    ));
    assert_eq!(guest.me().hp(), 100);
}

#[tokio::test]
async fn test_remote_turn_is_replayed() {
    let (mut guest, (_reader, mut writer)) = guest_with_raw_host().await;
    let mut raw = fighter("Raw");
    let mut mirror = fighter("Guest");
    let action = melee(BodyPart::Arms, BodyPart::Legs);
    resolve_turn(&mut raw, &mut mirror, action, None).unwrap();

    writer.write_message(&Message::from(action)).await.unwrap();
    writer
        .write_message(&Message::Snapshot(raw.snapshot()))
        .await
        .unwrap();

    let mut ui = Scripted::new(ScriptedController::repeating(melee(
        BodyPart::Head,
        BodyPart::Head,
    )));
    let report = guest.play_turn(&mut ui).await.unwrap();
    assert!(!report.mine);
    assert_eq!(report.action, action);
    assert_eq!(guest.me().hp(), 90);
    assert!(guest.is_my_turn());
}

#[tokio::test]
async fn test_chat_reaches_listener() {
    let (mut guest, (_reader, mut writer)) = guest_with_raw_host().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    assert!(guest.spawn_listener(ForwardChat(tx.clone())).is_some());
    assert!(guest.spawn_listener(ForwardChat(tx)).is_none());

    writer
        .write_message(&Message::Chat {
            text: "gl hf".into(),
        })
        .await
        .unwrap();
    assert_eq!(rx.recv().await.as_deref(), Some("gl hf"));
}
