//! Tether Runtime
//!
//! Headless client that runs the sync pipeline against an in-process
//! server for a fixed session and logs how well prediction held up.
//!
//! Usage: `tether [settings.json]`. Log filtering follows `RUST_LOG`.

mod loopback;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tether_core::time::{FixedStep, TICK_DURATION_SECS};
use tether_net::SyncClient;
use tether_services::{IntentSource, ScriptedIntent};
use tracing_subscriber::EnvFilter;

use loopback::{LoopbackServer, LEVEL_OBSTACLE_CENTER, LEVEL_OBSTACLE_HALF, LEVEL_OBSTACLE_UID};

/// Simulated frame times, alternating to keep the fixed step honest.
const FRAME_TIMES: [Duration; 3] = [
    Duration::from_millis(16),
    Duration::from_millis(17),
    Duration::from_millis(17),
];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(
        "Tether v{} (protocol {})",
        tether_core::VERSION,
        tether_net::PROTOCOL_VERSION
    );

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings =
        tether_services::init_services(path.as_deref()).context("failed to load client settings")?;
    let hash = settings.player.resolved_hash();

    let mut client = SyncClient::new(settings.sync.clone(), hash);
    client
        .register_level_obstacle(LEVEL_OBSTACLE_UID, LEVEL_OBSTACLE_CENTER, LEVEL_OBSTACLE_HALF)
        .context("failed to place level obstacle")?;
    let mut server = LoopbackServer::new(hash, &settings.sync, &settings.session);
    let mut intent = ScriptedIntent::patrol();
    let mut clock = FixedStep::new();

    let session = Duration::from_secs_f32(settings.session.duration_secs.max(0.0));
    let mut elapsed = Duration::ZERO;
    let mut frame = 0usize;
    while elapsed < session {
        let frame_time = FRAME_TIMES[frame % FRAME_TIMES.len()];
        frame += 1;
        elapsed += frame_time;

        for _ in 0..clock.accumulate(frame_time) {
            let dt = TICK_DURATION_SECS;
            let bits = intent.sample(dt);
            server.advance(dt);
            client.step(bits, dt, &mut server);
        }
    }

    let stats = client.stats();
    let c = &stats.counters;
    tracing::info!(
        steps = c.steps,
        ticks = clock.tick_count(),
        frames = frame,
        snapshots = c.snapshots_applied,
        mapped = c.entities_mapped,
        despawned = c.entities_despawned,
        evicted = c.mappings_evicted,
        skipped = c.states_skipped,
        "session finished"
    );
    tracing::info!(
        accepted = c.acks_accepted,
        snapped = c.acks_snapped,
        replayed = c.acks_replayed,
        resynced = c.acks_resynced,
        ignored = c.acks_ignored,
        avg_error = stats.errors.average(),
        max_error = stats.errors.max(),
        "reconciliation"
    );
    tracing::info!(
        sent = c.inputs_sent,
        rate_limited = c.inputs_rate_limited,
        overflow = c.history_overflow,
        pending = client.sequencer().history().len(),
        "input"
    );
    if let Some(local) = client.local_position() {
        tracing::info!(
            client = %local,
            server = %server.server_position(),
            last_acked = ?client.last_acked(),
            server_processed = server.last_processed(),
            live_entities = client.world().live_count(),
            "final state"
        );
    } else {
        tracing::warn!("local player never appeared");
    }

    Ok(())
}
