//! Binary entrypoint for the abyssbot CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and create the data directory
//! - `status --user <id> [--json]` - show a player's record and the prize pool
//! - `hunt --user <id>` - fight one overworld monster, streaming each round
//! - `abyss --user <id>` - challenge the next Abyss floor
//! - `explore` / `gather` - timed loot actions
//! - `move --user <id> <north|south|east|west>` - step through the dungeon
//! - `craft --user <id> <recipe>` / `eat --user <id> <item>`
//! - `level --user <id> up|down` - change world level
//! - `expedition start --user <id> <destination>` / `expedition claim --user <id>`
//!
//! The CLI stands in for the chat command handlers; see the library crate docs
//! for module-level details: `abyssbot::`.
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use abyssbot::config::Config;
use abyssbot::economy::cooldown::format_wait;
use abyssbot::economy::{
    Action, CooldownStatus, EconomyCoordinator, ExpeditionClaim, InMemoryLeaseStore, PrizePool,
    SystemClock,
};
use abyssbot::game::combat::{format_damage, AttackOutcome};
use abyssbot::game::dungeon::{self, Direction};
use abyssbot::game::{spawn_encounter, Encounter, TurnReport};
use abyssbot::storage::{GameStore, GameStoreBuilder};

type Coordinator = EconomyCoordinator<GameStore, InMemoryLeaseStore<SystemClock>, SystemClock>;

#[derive(Parser)]
#[command(name = "abyssbot")]
#[command(about = "Turn-based encounter and economy engine for an RPG chat bot")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Show a player's stats, cooldowns and the prize pool
    Status {
        #[arg(short, long)]
        user: String,
        /// Dump the raw record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Hunt one overworld monster
    Hunt {
        #[arg(short, long)]
        user: String,
    },
    /// Challenge the next Abyss floor
    Abyss {
        #[arg(short, long)]
        user: String,
    },
    /// Open a chest
    Explore {
        #[arg(short, long)]
        user: String,
    },
    /// Gather materials
    Gather {
        #[arg(short, long)]
        user: String,
    },
    /// Take one step in the dungeon
    Move {
        #[arg(short, long)]
        user: String,
        direction: String,
    },
    /// Craft or cook a recipe
    Craft {
        #[arg(short, long)]
        user: String,
        recipe: String,
    },
    /// Eat a food item to restore HP
    Eat {
        #[arg(short, long)]
        user: String,
        item: String,
    },
    /// Raise or lower world level
    Level {
        #[arg(short, long)]
        user: String,
        /// "up" or "down"
        change: String,
    },
    /// Send the player on an expedition, or collect one
    Expedition {
        #[command(subcommand)]
        action: ExpeditionCommand,
    },
}

#[derive(Subcommand)]
enum ExpeditionCommand {
    Start {
        #[arg(short, long)]
        user: String,
        destination: String,
    },
    Claim {
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        Config::create_default(&cli.config).await?;
        let config = Config::load(&cli.config).await?;
        tokio::fs::create_dir_all(&config.storage.data_dir).await?;
        println!("Wrote default configuration to {}", cli.config);
        return Ok(());
    }

    let config = match Config::load(&cli.config).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} (run `abyssbot init` to create one); using defaults", e);
            Config::default()
        }
    };
    config.validate()?;
    init_logging(&Some(config.clone()), cli.verbose);

    let coordinator = build_coordinator(&config).await?;
    let mut rng = StdRng::from_entropy();

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Status { user, json } => {
            let player = coordinator.register(&user)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&player)?);
                return Ok(());
            }
            println!("{} - world level {}", player.user_id, player.level);
            println!(
                "HP {}/{}  ATK {}  coins {}",
                format_damage(player.hp),
                format_damage(player.max_hp),
                format_damage(player.attack_power),
                player.balance
            );
            println!("Abyss floor cleared: {}", player.abyss_floor);
            for action in Action::ALL {
                if let CooldownStatus::Waiting { remaining_ms, .. } =
                    coordinator.cooldown_status(&user, action)?
                {
                    println!("  {} ready in {}", action, format_wait(remaining_ms));
                }
            }
            for entry in &player.inventory {
                println!("  {} x{}", entry.item, entry.amount);
            }
            println!("Prize pool: {}", coordinator.pool().value().await?);
        }
        Commands::Hunt { user } => {
            coordinator.register(&user)?;
            let (encounter, guard) = coordinator.begin_hunt(&user, &mut rng)?;
            let finished = run_encounter(&config, encounter).await?;
            let summary = coordinator.finish_encounter(guard, &finished, &mut rng).await?;
            println!(
                "{:?} after {} turns. +{} coins",
                summary.state, summary.turns, summary.coins
            );
            for item in &summary.items {
                println!("  {} x{}", item.item, item.quantity);
            }
        }
        Commands::Abyss { user } => {
            coordinator.register(&user)?;
            let (encounter, guard) = coordinator.begin_abyss(&user, &mut rng).await?;
            let finished = run_encounter(&config, encounter).await?;
            let summary = coordinator.finish_encounter(guard, &finished, &mut rng).await?;
            println!("{:?} after {} turns", summary.state, summary.turns);
            if let Some(floor) = summary.floor_cleared {
                println!("Floor {} cleared. +{} coins", floor, summary.coins);
            }
            if let Some(prize) = summary.prize {
                println!("Boss floor! You take the prize pool of {} coins", prize);
            }
        }
        Commands::Explore { user } => {
            coordinator.register(&user)?;
            let chest = coordinator.explore(&user, &mut rng)?;
            println!("{} chest: {} coins", chest.rarity.label(), chest.coins);
            for item in &chest.items {
                println!("  {} x{}", item.item, item.quantity);
            }
        }
        Commands::Gather { user } => {
            coordinator.register(&user)?;
            match coordinator.gather(&user, &mut rng)? {
                Some(h) => println!("Gathered {} x{}", h.item, h.quantity),
                None => println!("Nothing to gather here"),
            }
        }
        Commands::Move { user, direction } => {
            coordinator.register(&user)?;
            let dir = Direction::parse(&direction)
                .ok_or_else(|| anyhow!("unknown direction {}", direction))?;
            let step = coordinator.dungeon_move(&user, dir, &mut rng)?;
            if let Some(old) = step.reset_from {
                println!("Saved position {:?} was invalid; back at the entrance.", old);
            }
            let pos = step.result.position;
            if let Some(grid) = dungeon::floor(pos.floor) {
                for row in grid.render(Some((pos.x, pos.y))) {
                    println!("{}", row);
                }
            }
            if step.picked_up_key {
                println!("You picked up a key.");
            }
            if let Some(chest) = &step.chest {
                println!("{} chest: {} coins", chest.rarity.label(), chest.coins);
            }
            let exits: Vec<String> = step.result.exits.iter().map(|d| format!("{:?}", d)).collect();
            println!("Exits: {}", exits.join(", "));
        }
        Commands::Craft { user, recipe } => {
            coordinator.register(&user)?;
            let made = coordinator.craft(&user, &recipe)?;
            println!("Made {} x{}", made.item, made.quantity);
        }
        Commands::Eat { user, item } => {
            coordinator.register(&user)?;
            let healed = coordinator.eat(&user, &item)?;
            println!("Restored {} HP", format_damage(healed));
        }
        Commands::Level { user, change } => {
            coordinator.register(&user)?;
            let upgrade = match change.to_ascii_lowercase().as_str() {
                "up" => true,
                "down" => false,
                other => return Err(anyhow!("expected up or down, got {}", other)),
            };
            println!("World level is now {}", coordinator.change_level(&user, upgrade)?);
        }
        Commands::Expedition { action } => match action {
            ExpeditionCommand::Start { user, destination } => {
                coordinator.register(&user)?;
                let active = coordinator.start_expedition(&user, &destination)?;
                let wait = active.ends_at_ms - active.started_at_ms;
                println!("Left for {}; back in {}", active.destination.name, format_wait(wait));
            }
            ExpeditionCommand::Claim { user } => {
                coordinator.register(&user)?;
                match coordinator.claim_expedition(&user, &mut rng)? {
                    ExpeditionClaim::Completed {
                        destination,
                        coins,
                        items,
                    } => {
                        println!("Back from {}: +{} coins", destination, coins);
                        for item in &items {
                            println!("  {} x{}", item.item, item.quantity);
                        }
                    }
                    ExpeditionClaim::NotReady { destination, ends_at_ms } => {
                        let remaining = ends_at_ms - chrono::Utc::now().timestamp_millis();
                        println!("Still at {}; back in {}", destination, format_wait(remaining));
                    }
                    ExpeditionClaim::CorruptedReset => {
                        println!("Your expedition data was corrupted and has been reset.");
                    }
                }
            }
        },
    }

    Ok(())
}

async fn build_coordinator(config: &Config) -> Result<Coordinator> {
    let store = GameStoreBuilder::new(config.storage.database_path())
        .write_retries(config.economy.store_write_retries)
        .open()?;
    let pool = PrizePool::load(
        config.storage.prize_pool_path(),
        config.economy.prize_pool_seed,
        config.prize_pool_lock_timeout(),
    )
    .await;
    Ok(EconomyCoordinator::new(
        Arc::new(store),
        InMemoryLeaseStore::new(SystemClock),
        SystemClock,
        Arc::new(pool),
        config.economy_settings(),
    ))
}

/// Drive an encounter on the configured timer, printing rounds as they land.
/// Ctrl-C flees.
async fn run_encounter(config: &Config, encounter: Encounter) -> Result<Encounter> {
    let (mut handle, mut reports) = spawn_encounter(
        encounter,
        config.combat.turn_interval(),
        StdRng::from_entropy(),
    );
    loop {
        tokio::select! {
            report = reports.recv() => match report {
                Some(r) => print_turn(&r),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted; fleeing the encounter");
                handle.cancel();
            }
        }
    }
    let finished = handle.finish().await?;
    info!("encounter finished in state {:?}", finished.state());
    Ok(finished)
}

fn describe_attack(who: &str, outcome: &AttackOutcome) -> String {
    let mut line = format!("{} hits for {}", who, format_damage(outcome.damage));
    if outcome.was_crit {
        line.push_str(" (crit)");
    }
    if outcome.was_defended {
        line.push_str(" (defended)");
    }
    line
}

fn print_turn(report: &TurnReport) {
    println!("-- Turn {} vs {} --", report.turn, report.monster);
    if let Some(a) = &report.monster_attack {
        println!("  {}", describe_attack(&report.monster, a));
    }
    if let Some(a) = &report.player_attack {
        println!("  {}", describe_attack("You", a));
    }
    for tick in &report.status {
        println!("  {:?} deals {}", tick.kind, format_damage(tick.damage));
    }
    println!(
        "  You {}/{} | {} {}/{}",
        format_damage(report.player_hp),
        format_damage(report.player_max_hp),
        report.monster,
        format_damage(report.monster_hp),
        format_damage(report.monster_max_hp)
    );
    if let Some(name) = &report.defeated {
        println!("  {} is defeated!", name);
    }
    if let Some(next) = &report.next_monster {
        println!("  {} steps forward", next);
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins; otherwise the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file = config.as_ref().and_then(|c| c.logging.file.clone());
    let economy_path = config.as_ref().and_then(|c| c.logging.economy_file.clone());
    let opened = file.as_ref().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });

    match opened {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Foreground runs echo to the console as well
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if record.target() == "economy" {
                    if let Some(ref path) = economy_path {
                        if let Ok(mut ef) = std::fs::OpenOptions::new()
                            .create(true)
                            .append(true)
                            .open(path)
                        {
                            let _ = writeln!(ef, "{}", line);
                        }
                    }
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if record.target() == "economy" {
                    if let Some(ref path) = economy_path {
                        if let Ok(mut ef) = std::fs::OpenOptions::new()
                            .create(true)
                            .append(true)
                            .open(path)
                        {
                            let _ = writeln!(ef, "{}", line);
                        }
                    }
                }
                writeln!(fmt, "{}", line)
            });
        }
    }
    let _ = builder.try_init();
}
