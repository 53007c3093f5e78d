//! Text prompts for console play.
//!
//! [`ActionPrompt`] is a small line-driven menu state machine shared by the
//! blocking [`ConsoleController`] (local duels) and the async
//! [`ConsoleFrontend`] (network duels).

use std::io::{BufRead, Write};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use duel_core::combatant::Combatant;
use duel_core::components::BodyPart;
use duel_core::controller::Controller;
use duel_core::engine::{Action, Event, Side};
use duel_core::error::DuelError;

use crate::connection::MessageSender;
use crate::session::{ChatDisplay, Frontend, TurnReport};

/// Played when input ends mid-prompt.
const FALLBACK_ACTION: Action = Action::Melee {
    attack: BodyPart::Torso,
    defend: BodyPart::Head,
};

// ============================================================================
// Formatting
// ============================================================================

/// One-line status: name, vitals, strength and defense.
#[must_use]
pub fn status(combatant: &Combatant) -> String {
    format!(
        "{}  HP {}/{}  MP {}/{}  STR {}  DEF {}",
        combatant.name,
        combatant.hp(),
        combatant.max_hp(),
        combatant.mana(),
        combatant.max_mana(),
        combatant.strength(),
        combatant.defense()
    )
}

/// Describe an event, naming the attacker and defender sides.
#[must_use]
pub fn describe(event: &Event, attacker: &str, defender: &str) -> String {
    let names = |side: Side| match side {
        Side::Attacker => (attacker, defender),
        Side::Defender => (defender, attacker),
    };
    match event {
        Event::Strike {
            side,
            zone,
            blocked: true,
            ..
        } => {
            let (actor, target) = names(*side);
            format!("{target} blocks {actor}'s strike to the {}", zone.name())
        }
        Event::Strike {
            side, zone, damage, ..
        } => {
            let (actor, target) = names(*side);
            format!("{actor} hits {target}'s {} for {damage}", zone.name())
        }
        Event::AbilityDamage {
            side,
            ability,
            damage,
        } => {
            let (actor, target) = names(*side);
            format!("{actor} casts {ability}: {target} takes {damage}")
        }
        Event::Heal {
            side,
            ability,
            amount,
        } => format!("{} casts {ability} and recovers {amount} HP", names(*side).0),
        Event::Buff {
            side,
            ability,
            attack,
            defense,
        } => format!(
            "{} casts {ability}: attack +{attack}, defense +{defense}",
            names(*side).0
        ),
        Event::ItemConsumed { side, item, hp, mana } => {
            format!("{} uses {item} (+{hp} HP, +{mana} MP)", names(*side).0)
        }
        Event::ItemEquipped { side, item } => format!("{} equips {item}", names(*side).0),
    }
}

fn zone_menu(title: &str, allow_none: bool) -> String {
    let mut menu = format!("{title}\n");
    if allow_none {
        menu.push_str("  0) nowhere\n");
    }
    for zone in BodyPart::ALL {
        menu.push_str(&format!("  {}) {}\n", zone.index() + 1, zone.name()));
    }
    menu
}

// ============================================================================
// Prompt state machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Kind,
    AttackZone,
    DefendZone { attack: BodyPart },
    Ability,
    AbilityGuard { index: usize },
    Item,
    ItemGuard { index: usize },
}

/// Line-driven action menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPrompt {
    stage: Stage,
}

impl Default for ActionPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionPrompt {
    /// Start at the top-level menu.
    #[must_use]
    pub const fn new() -> Self {
        Self { stage: Stage::Kind }
    }

    /// Menu text for the current stage.
    #[must_use]
    pub fn question(&self, me: &Combatant) -> String {
        match self.stage {
            Stage::Kind => "Choose: 1) attack  2) ability  3) item\n".to_string(),
            Stage::AttackZone => zone_menu("Strike where?", false),
            Stage::DefendZone { .. } | Stage::ItemGuard { .. } => zone_menu("Guard where?", false),
            Stage::AbilityGuard { .. } => zone_menu("Guard where?", true),
            Stage::Ability => {
                let mut menu = "Cast which ability? (0 to go back)\n".to_string();
                for (i, ability) in me.abilities.iter().enumerate() {
                    menu.push_str(&format!(
                        "  {}) {} ({} mana)\n",
                        i + 1,
                        ability.name,
                        ability.mana_cost
                    ));
                }
                menu
            }
            Stage::Item => {
                let mut menu = "Use which item? (0 to go back)\n".to_string();
                for (i, item) in me.inventory.iter().enumerate() {
                    menu.push_str(&format!("  {}) {} [{:?}]\n", i + 1, item.name, item.kind));
                }
                menu
            }
        }
    }

    /// Feed one line of input.
    ///
    /// Returns `Ok(Some(action))` when the menu completes (and resets),
    /// `Ok(None)` when it moved to another stage.
    ///
    /// # Errors
    ///
    /// Returns a message to show when the input is not a valid choice; the
    /// stage is unchanged.
    pub fn answer(&mut self, me: &Combatant, line: &str) -> Result<Option<Action>, String> {
        let choice: usize = line
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a number", line.trim()))?;
        let zone = || {
            choice
                .checked_sub(1)
                .and_then(BodyPart::from_index)
                .ok_or_else(|| format!("Pick a zone from 1 to {}", BodyPart::ALL.len()))
        };
        let pick = |len: usize| match choice {
            0 => Ok(None),
            n if n <= len => Ok(Some(n - 1)),
            _ => Err(format!("Pick 1 to {len}, or 0 to go back")),
        };

        let (next, action) = match self.stage {
            Stage::Kind => match choice {
                1 => (Stage::AttackZone, None),
                2 => (Stage::Ability, None),
                3 => (Stage::Item, None),
                _ => return Err("Pick 1, 2 or 3".to_string()),
            },
            Stage::AttackZone => (Stage::DefendZone { attack: zone()? }, None),
            Stage::DefendZone { attack } => (
                Stage::Kind,
                Some(Action::Melee {
                    attack,
                    defend: zone()?,
                }),
            ),
            Stage::Ability => match pick(me.abilities.len())? {
                Some(index) => (Stage::AbilityGuard { index }, None),
                None => (Stage::Kind, None),
            },
            Stage::AbilityGuard { index } => {
                let defend = if choice == 0 { None } else { Some(zone()?) };
                (Stage::Kind, Some(Action::Ability { index, defend }))
            }
            Stage::Item => match pick(me.inventory.len())? {
                Some(index) => (Stage::ItemGuard { index }, None),
                None => (Stage::Kind, None),
            },
            Stage::ItemGuard { index } => (
                Stage::Kind,
                Some(Action::Item {
                    index,
                    defend: zone()?,
                }),
            ),
        };
        self.stage = next;
        Ok(action)
    }
}

// ============================================================================
// Blocking controller
// ============================================================================

/// Prompts on a blocking reader/writer pair (stdin/stdout in the binary).
#[derive(Debug)]
pub struct ConsoleController<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleController<R, W> {
    /// Wrap an input and output.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print a line, ignoring write failures.
    pub fn say(&mut self, text: &str) {
        let _ = writeln!(self.output, "{text}");
    }

    /// Read one trimmed line; `None` at end of input.
    pub fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl<R: BufRead, W: Write> Controller for ConsoleController<R, W> {
    fn choose_action(&mut self, me: &Combatant, opponent: &Combatant, round: u32) -> Action {
        self.say(&format!("\n--- Round {round} ---"));
        self.say(&status(me));
        self.say(&status(opponent));
        let mut prompt = ActionPrompt::new();
        loop {
            let question = prompt.question(me);
            let _ = write!(self.output, "{question}> ");
            let _ = self.output.flush();
            let Some(line) = self.read_line() else {
                tracing::warn!("Input closed; playing a default strike");
                return FALLBACK_ACTION;
            };
            match prompt.answer(me, &line) {
                Ok(Some(action)) => return action,
                Ok(None) => {}
                Err(message) => self.say(&message),
            }
        }
    }

    fn reject(&mut self, error: &DuelError) {
        self.say(&format!("Cannot do that: {error}"));
    }
}

// ============================================================================
// Async frontend
// ============================================================================

/// Prompts on an async line source; `/say <text>` sends chat.
pub struct ConsoleFrontend<R> {
    lines: Lines<R>,
    chat: Option<MessageSender>,
}

impl<R: AsyncBufRead + Unpin + Send> ConsoleFrontend<R> {
    /// Wrap a line source. With a sender, `/say` lines become chat.
    pub fn new(input: R, chat: Option<MessageSender>) -> Self {
        Self {
            lines: input.lines(),
            chat,
        }
    }

    async fn next_line(&mut self) -> Option<String> {
        match self.lines.next_line().await {
            Ok(Some(line)) => Some(line),
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(%error, "Failed to read input");
                None
            }
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Frontend for ConsoleFrontend<R> {
    async fn choose_action(&mut self, me: &Combatant, opponent: &Combatant, round: u32) -> Action {
        println!("\n--- Round {round} (your turn) ---");
        println!("{}", status(me));
        println!("{}", status(opponent));
        let mut prompt = ActionPrompt::new();
        loop {
            print!("{}> ", prompt.question(me));
            let _ = std::io::stdout().flush();
            let Some(line) = self.next_line().await else {
                tracing::warn!("Input closed; playing a default strike");
                return FALLBACK_ACTION;
            };
            if let Some(text) = line.trim().strip_prefix("/say ") {
                if let Some(chat) = &self.chat {
                    if let Err(error) = chat.send_chat(text).await {
                        tracing::warn!(%error, "Chat not sent");
                    }
                }
                continue;
            }
            match prompt.answer(me, &line) {
                Ok(Some(action)) => return action,
                Ok(None) => {}
                Err(message) => println!("{message}"),
            }
        }
    }

    async fn show_rejection(&mut self, error: &DuelError) {
        println!("Cannot do that: {error}");
    }

    async fn show_turn(&mut self, report: &TurnReport) {
        if !report.mine {
            println!("\n--- Round {} (opponent's turn) ---", report.round);
        }
        let target = if report.mine { "opponent" } else { "you" };
        for event in &report.outcome.events {
            println!("{}", describe(event, &report.actor, target));
        }
    }
}

/// Prints chat lines on stdout.
#[derive(Debug, Clone)]
pub struct ConsoleChat {
    /// Peer name shown before each line.
    pub peer: String,
}

impl ChatDisplay for ConsoleChat {
    fn show_chat(&mut self, text: &str) {
        println!("[{}] {text}", self.peer);
    }

    fn peer_left(&mut self) {
        println!("[{} left]", self.peer);
    }
}
