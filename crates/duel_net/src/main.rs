//! Console duel runner.
//!
//! # Usage
//!
//! ```bash
//! # Wait for a challenger on port 8080
//! cargo run -p duel_net -- host --name Paladin
//!
//! # Challenge a host
//! cargo run -p duel_net -- join --host 127.0.0.1 --name Rogue
//!
//! # Fight one chapter boss locally
//! cargo run -p duel_net -- solo --chapter 2 --seed 7
//!
//! # Play the whole campaign
//! cargo run -p duel_net -- campaign
//! ```
//!
//! Prompts go to stdout, logs to stderr.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duel_core::combatant::ItemUse;
use duel_core::prelude::*;
use duel_net::codec::WireFormat;
use duel_net::console::{describe, status, ConsoleChat, ConsoleController, ConsoleFrontend};
use duel_net::session::{self, Session};
use duel_net::NetConfig;

type CliResult = std::result::Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "duel")]
#[command(about = "Turn-based duels, locally or over TCP")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// RON config file (network and character settings)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// RON catalog replacing the built-in items, abilities and chapters
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for one challenger and duel them
    Host {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Your character's name
        #[arg(short, long, default_value = "Host")]
        name: String,

        /// Wire framing
        #[arg(long, value_enum)]
        format: Option<WireFormat>,
    },

    /// Connect to a waiting host
    Join {
        /// Host address
        #[arg(long)]
        host: Option<String>,

        /// Host port
        #[arg(short, long)]
        port: Option<u16>,

        /// Your character's name
        #[arg(short, long, default_value = "Guest")]
        name: String,

        /// Wire framing
        #[arg(long, value_enum)]
        format: Option<WireFormat>,
    },

    /// Fight a single chapter boss
    Solo {
        /// Chapter whose boss to fight (1-based)
        #[arg(long, default_value = "1")]
        chapter: usize,

        /// Random seed for the boss (default: entropy)
        #[arg(long)]
        seed: Option<u64>,

        /// Your character's name
        #[arg(short, long, default_value = "Hero")]
        name: String,
    },

    /// Play every chapter in order, shopping between fights
    Campaign {
        /// Random seed for bosses and loot (default: entropy)
        #[arg(long)]
        seed: Option<u64>,

        /// Your character's name
        #[arg(short, long, default_value = "Hero")]
        name: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the prompts
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    if let Err(error) = run(cli) {
        tracing::error!(%error, "Duel aborted");
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult {
    let mut config = match &cli.config {
        Some(path) => NetConfig::load(path)?,
        None => NetConfig::default(),
    };
    let catalog = match &cli.catalog {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin()?,
    };

    match cli.command {
        Commands::Host { port, name, format } => {
            apply_overrides(&mut config, None, port, format);
            let hero = catalog.starting_combatant(name, &config.duel);
            cmd_network(&config, hero, true)
        }
        Commands::Join {
            host,
            port,
            name,
            format,
        } => {
            apply_overrides(&mut config, host, port, format);
            let hero = catalog.starting_combatant(name, &config.duel);
            cmd_network(&config, hero, false)
        }
        Commands::Solo {
            chapter,
            seed,
            name,
        } => cmd_solo(&catalog, &config.duel, chapter, seed_rng(seed), name),
        Commands::Campaign { seed, name } => {
            let hero = catalog.starting_combatant(name, &config.duel);
            cmd_campaign(Campaign::new(catalog, config.duel, hero), seed_rng(seed))
        }
    }
}

fn apply_overrides(
    config: &mut NetConfig,
    host: Option<String>,
    port: Option<u16>,
    format: Option<WireFormat>,
) {
    if let Some(host) = host {
        config.connect_host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(format) = format {
        config.wire_format = format;
    }
}

fn seed_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

fn cmd_network(config: &NetConfig, hero: Combatant, hosting: bool) -> CliResult {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        if hosting {
            println!("Waiting for a challenger on port {}...", config.port);
        }
        let mut session: Session = if hosting {
            session::host(config, hero).await?
        } else {
            session::join(config, hero).await?
        };
        println!("{} vs {}", session.me().name, session.opponent().name);
        println!("Type /say <text> at any prompt to chat.");

        session.spawn_listener(ConsoleChat {
            peer: session.opponent().name.clone(),
        });
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut frontend = ConsoleFrontend::new(stdin, Some(session.sender()));
        let outcome = session.run(&mut frontend).await?;

        if outcome.won {
            println!("\nVictory after {} turns!", outcome.turns);
        } else {
            println!("\nDefeat after {} turns.", outcome.turns);
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

fn cmd_solo(
    catalog: &Catalog,
    config: &DuelConfig,
    chapter: usize,
    rng: StdRng,
    name: String,
) -> CliResult {
    let data = chapter
        .checked_sub(1)
        .and_then(|index| catalog.chapters().get(index))
        .ok_or_else(|| format!("No chapter {chapter}; the catalog has {}", catalog.chapters().len()))?;
    let hero = catalog.starting_combatant(name, config);
    let enemy = catalog.chapter_enemy(data);

    let stdin = std::io::stdin();
    let mut console = ConsoleController::new(stdin.lock(), std::io::stdout());
    let mut boss = Autonomous::new(rng).with_ability_cadence(config.autonomous_ability_cadence);
    let mut duel = Duel::new(hero, enemy);
    console.say(&format!("{} faces {}!", duel.attacker().name, duel.defender().name));

    let mut played = 0;
    while !duel.is_over() && config.max_rounds.map_or(true, |cap| played < cap) {
        let outcome = duel.play_round(&mut console, &mut boss)?;
        for event in &outcome.events {
            console.say(&describe(event, &duel.attacker().name, &duel.defender().name));
        }
        played += 1;
    }

    match duel.winner() {
        Some(winner) => console.say(&format!("{} wins!", winner.name)),
        None => console.say("The duel ends in a stalemate."),
    }
    Ok(())
}

fn cmd_campaign(mut campaign: Campaign, mut rng: StdRng) -> CliResult {
    let stdin = std::io::stdin();
    let mut console = ConsoleController::new(stdin.lock(), std::io::stdout());

    while !campaign.is_complete() {
        let Some(chapter) = campaign.current_chapter()? else {
            break;
        };
        if !camp(&mut console, &mut campaign, chapter.number, &chapter.enemy.name) {
            console.say("You leave the road. Farewell.");
            return Ok(());
        }
        match campaign.fight_chapter(&mut console, &mut rng)? {
            ChapterOutcome::Won(reward) => {
                console.say(&format!(
                    "{} is defeated! +{} gold, learned {}, recovered {} HP and {} MP.",
                    chapter.enemy.name, reward.gold, reward.ability.name, reward.healed, reward.mana
                ));
                for item in &reward.loot {
                    console.say(&format!("  Found {}", item.name));
                }
            }
            ChapterOutcome::Lost => {
                console.say(&format!("{} has slain you in chapter {}.", chapter.enemy.name, chapter.number));
                return Ok(());
            }
            ChapterOutcome::Stalled => {
                console.say(&format!("Neither side yields; chapter {} is left unfinished.", chapter.number));
                return Ok(());
            }
        }
    }
    console.say("Every chapter is won. The campaign is complete!");
    Ok(())
}

/// Camp menu between chapters. Returns `false` when the player quits.
fn camp<R: BufRead, W: Write>(
    console: &mut ConsoleController<R, W>,
    campaign: &mut Campaign,
    chapter: usize,
    enemy: &str,
) -> bool {
    loop {
        console.say(&format!("\n=== Camp before chapter {chapter} ({enemy}) ==="));
        console.say(&status(campaign.hero()));
        console.say(&format!("Gold: {}", campaign.hero().gold));
        console.say("  1) fight\n  2) shop\n  3) use item\n  4) unequip\n  5) quit");
        let Some(line) = console.read_line() else {
            return false;
        };
        match line.as_str() {
            "1" => return true,
            "2" => shop(console, campaign),
            "3" => use_item(console, campaign),
            "4" => unequip(console, campaign),
            "5" => return false,
            _ => console.say("Pick 1 to 5"),
        }
    }
}

fn pick<R: BufRead, W: Write>(console: &mut ConsoleController<R, W>, len: usize) -> Option<usize> {
    let line = console.read_line()?;
    match line.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Some(n - 1),
        _ => None,
    }
}

fn shop<R: BufRead, W: Write>(console: &mut ConsoleController<R, W>, campaign: &mut Campaign) {
    console.say("Buy which? (0 to leave)");
    for (i, item) in campaign.catalog().shop().iter().enumerate() {
        console.say(&format!("  {}) {} - {} gold", i + 1, item.name, item.price));
    }
    let Some(index) = pick(console, campaign.catalog().shop().len()) else {
        return;
    };
    let item = match campaign.catalog().item(index) {
        Ok(item) => item.clone(),
        Err(error) => {
            console.say(&format!("Cannot buy: {error}"));
            return;
        }
    };
    match campaign.hero_mut().purchase(&item) {
        Ok(()) => console.say(&format!("Bought {}.", item.name)),
        Err(error) => console.say(&format!("Cannot buy: {error}")),
    }
}

fn use_item<R: BufRead, W: Write>(console: &mut ConsoleController<R, W>, campaign: &mut Campaign) {
    console.say("Use which? (0 to cancel)");
    for (i, item) in campaign.hero().inventory.iter().enumerate() {
        console.say(&format!("  {}) {} [{:?}]", i + 1, item.name, item.kind));
    }
    let Some(index) = pick(console, campaign.hero().inventory.len()) else {
        return;
    };
    match campaign.hero_mut().use_item(index) {
        Ok(ItemUse::Consumed { item, hp, mana }) => {
            console.say(&format!("Used {} (+{hp} HP, +{mana} MP).", item.name));
        }
        Ok(ItemUse::Equipped { item }) => console.say(&format!("Equipped {}.", item.name)),
        Err(error) => console.say(&format!("Cannot use: {error}")),
    }
}

fn unequip<R: BufRead, W: Write>(console: &mut ConsoleController<R, W>, campaign: &mut Campaign) {
    console.say("Take off which? (0 to cancel)");
    for (i, item) in campaign.hero().equipment.iter().enumerate() {
        console.say(&format!("  {}) {}", i + 1, item.name));
    }
    let Some(index) = pick(console, campaign.hero().equipment.len()) else {
        return;
    };
    match campaign.hero_mut().take_off(index) {
        Ok(item) => console.say(&format!("Took off {}.", item.name)),
        Err(error) => console.say(&format!("Cannot take off: {error}")),
    }
}
