//! duo — two cooperating parcel-delivery agents on a small map.
//!
//! Both agents share an in-process `GridEnv`, talk over a `LocalLink` and
//! log their intentions and negotiations through `tracing`.  Parcels spawn
//! on the `S` tiles at a fixed rate.
//!
//! ```text
//! cargo run -p duo                      # default agent config
//! cargo run -p duo -- agent.json        # partial JSON override
//! RUST_LOG=debug,pd::observe=info cargo run -p duo
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pd_agent::{Agent, AgentBuilder, GridEnv, TracingObserver};
use pd_comm::LocalLink;
use pd_core::{AgentConfig, AgentId, AgentRng, GameConfig, Position};

// ── Constants ─────────────────────────────────────────────────────────────────

const MAP: [&str; 7] = [
    "D..S...S..D",
    ".##.###.##.",
    "S.........S",
    ".##.#D#.##.",
    "S.........S",
    ".##.###.##.",
    "D..S...S..D",
];

const SEED:            u64 = 42;
const RUN_SECS:        u64 = 30;
const PARCEL_EVERY_MS: u64 = 1_500;
const PARCEL_SCORE:    u32 = 30;

// ── Setup ─────────────────────────────────────────────────────────────────────

fn load_config() -> Result<AgentConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(AgentConfig { seed: SEED, ..AgentConfig::default() });
    };
    let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    Ok(AgentConfig::from_json_str(&json)?)
}

fn build_pair(env: &GridEnv, config: &AgentConfig) -> Result<(Arc<Agent>, Arc<Agent>)> {
    let starts = [(AgentId(1), Position::new(0, 3)), (AgentId(2), Position::new(10, 3))];
    let (la, lb) = LocalLink::pair();
    let links = [Arc::new(la), Arc::new(lb)];

    let mut agents = Vec::with_capacity(2);
    for ((id, at), link) in starts.into_iter().zip(links) {
        env.place_agent(id, at)?;
        let agent = AgentBuilder::new(id, env.map())
            .config(config.clone())
            .observer(Arc::new(TracingObserver))
            .position(at)
            .link(link.clone(), link.inbox())
            .build(env.connector(id))?;
        agents.push(Arc::new(agent));
    }
    let second = agents.pop().context("second agent")?;
    let first = agents.pop().context("first agent")?;
    Ok((first, second))
}

/// Spawn a parcel every `PARCEL_EVERY_MS` until `shutdown`.
async fn spawn_parcels(env: GridEnv, shutdown: CancellationToken) {
    let mut rng = AgentRng::new(SEED, AgentId(0));
    let mut tick = interval(Duration::from_millis(PARCEL_EVERY_MS));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tick.tick() => {
                if let Some(id) = env.spawn_random_parcel(&mut rng, PARCEL_SCORE) {
                    info!(parcel = %id, "parcel spawned");
                }
            }
        }
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    let game = GameConfig {
        movement_ms: 200,
        parcel_decay_interval_ms: 1_000,
        ..GameConfig::default()
    };
    let env = GridEnv::from_rows(&MAP, game)?;
    let (first, second) = build_pair(&env, &config)?;
    info!(agents = 2, secs = RUN_SECS, "duo starting");

    let shutdown = CancellationToken::new();
    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(env.clone().run_decay(shutdown.clone())));
    tasks.push(tokio::spawn(spawn_parcels(env.clone(), shutdown.clone())));
    for agent in [&first, &second] {
        env.feed(agent).await;
        tasks.push(tokio::spawn(env.clone().pump(agent.clone(), shutdown.clone())));
    }

    let runs = [first.clone(), second.clone()].map(|agent| {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { agent.run(shutdown).await })
    });

    sleep(Duration::from_secs(RUN_SECS)).await;
    shutdown.cancel();
    for run in runs {
        run.await??;
    }
    for task in tasks {
        task.await?;
    }

    for agent in [&first, &second] {
        info!(agent = %agent.id(), score = env.score(agent.id()), "final score");
    }
    let total = env.score(first.id()) + env.score(second.id());
    println!("team score after {RUN_SECS}s: {total}");
    Ok(())
}
