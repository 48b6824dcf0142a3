use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use glam::Vec2;
use stardrift_core::{Capabilities, Entity, EntityId, Event, SaveFile, Team, World, WorldConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stardrift", about = "Explore, save and inspect streaming Stardrift worlds")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// World configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fly a fresh ship through a generated world
    Explore {
        /// World seed, overriding the config
        #[arg(short, long)]
        seed: Option<u64>,
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "600")]
        ticks: u64,
        /// Thrust applied to the ship in -1..=1
        #[arg(long, default_value = "1.0")]
        thrust: f32,
        /// Write a save file when done
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Summarize a save file
    Inspect {
        /// Save file to read
        save: PathBuf,
    },
    /// Load a save file and keep flying its ship
    Resume {
        /// Save file to read
        save: PathBuf,
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "600")]
        ticks: u64,
        /// Write a save file when done
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

const DT: f32 = 1.0 / 60.0;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Explore {
            seed,
            ticks,
            thrust,
            out,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            println!("Exploring: seed={}, ticks={ticks}", config.seed);

            let mut world = World::new(config).context("creating world")?;
            let id = world.allocate_id();
            let template = world.config().ship.clone();
            let ship = world.add_entity(Entity::ship(
                id,
                Vec2::ZERO,
                &template,
                Capabilities::all(),
                Team::Player,
            ))?;
            steer(&mut world, ship, thrust)?;

            fly(&mut world, ship, ticks);
            if let Some(path) = out {
                save(&world, ship, &path)?;
            }
        }
        Commands::Inspect { save } => {
            let file = SaveFile::load(&save).with_context(|| format!("loading {}", save.display()))?;
            println!("Save {}: version={}, tick={}", save.display(), file.version, file.tick);
            println!(
                "Config: seed={}, cluster_size={}, vision_radius={}",
                file.config.seed, file.config.cluster_size, file.config.vision_radius
            );
            match &file.focus {
                Some(focus) => println!(
                    "Focus: {} #{} at {}",
                    focus.class_name, focus.id, focus.body.position
                ),
                None => println!("Focus: none"),
            }
            println!(
                "World: clusters={}, entities={}",
                file.world.cluster_count(),
                file.world.entity_count()
            );
            for (coord, cluster) in file.world.cluster_documents() {
                let count = cluster.independent_entities.len() + cluster.dependent_entities.len();
                if count > 0 {
                    println!("  {coord}: {count} entities");
                }
            }
        }
        Commands::Resume { save: path, ticks, out } => {
            let file = SaveFile::load(&path).with_context(|| format!("loading {}", path.display()))?;
            let Some(ship) = file.focus.as_ref().map(|focus| focus.id) else {
                bail!("{} has no focus entity to resume", path.display());
            };
            let mut world = file.restore().context("restoring world")?;
            println!("Resuming at tick {} with ship #{ship}", world.tick());

            fly(&mut world, ship, ticks);
            if let Some(path) = out {
                save(&world, ship, &path)?;
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<WorldConfig> {
    match path {
        Some(path) => {
            WorldConfig::load(path).with_context(|| format!("loading config {}", path.display()))
        }
        None => Ok(WorldConfig::default()),
    }
}

fn steer(world: &mut World, ship: EntityId, thrust: f32) -> anyhow::Result<()> {
    let Some(components) = world.entity_mut(ship).and_then(Entity::as_ship_mut) else {
        bail!("entity {ship} is not a ship");
    };
    components.controls.thrust = thrust.clamp(-1.0, 1.0);
    components.controls.fire = true;
    Ok(())
}

fn fly(world: &mut World, ship: EntityId, ticks: u64) {
    let mut generated = 0usize;
    let mut destroyed = 0usize;
    let mut collected = 0usize;
    let mut focal = world.entity(ship).map_or(Vec2::ZERO, Entity::position);

    for _ in 0..ticks {
        if let Some(entity) = world.entity(ship) {
            focal = entity.position();
        }
        world.update_at(focal, DT);
        for event in world.drain_events() {
            match event {
                Event::ClusterGenerated { .. } => generated += 1,
                Event::Destroyed { .. } => destroyed += 1,
                Event::ResourceCollected { .. } => collected += 1,
                _ => {}
            }
        }
    }

    info!(tick = world.tick(), generated, destroyed, collected, "flight finished");
    println!(
        "Tick {}: ship at {focal}, clusters={}, entities={}, generated={generated}, destroyed={destroyed}, collected={collected}",
        world.tick(),
        world.store().len(),
        world.store().entity_count()
    );
}

fn save(world: &World, ship: EntityId, path: &Path) -> anyhow::Result<()> {
    let focus = world.contains(ship).then_some(ship);
    let file = SaveFile::capture(world, focus).context("encoding world")?;
    file.save(path).with_context(|| format!("writing {}", path.display()))?;
    println!(
        "Saved {} clusters and {} entities to {}",
        file.world.cluster_count(),
        file.world.entity_count(),
        path.display()
    );
    Ok(())
}
