//! The node's outer driving loop. Grounded on
//! `kimberlite-cluster::supervisor::ClusterSupervisor::monitor_loop`'s
//! `tokio::select!` shape (periodic tick, external event, ctrl-c
//! shutdown), generalized from "poll child processes, restart crashed
//! ones" to "poll the timer wheel, drive confchg-triggered sync,
//! deliver totem messages".

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::interval;

use availmf_totem::{ConfchgEvent, GroupPort};

use crate::engine::NodeEngine;

/// Drives `engine` until a confchg-channel close or ctrl-c.
///
/// `port` is whatever transport backs this node's group membership;
/// tests pass a `SimGroup`, production wiring a real totem socket
/// adapter. `tick_period` bounds how stale the timer wheel and the
/// sync driver's back-pressure retry can get between polls.
pub async fn run<P: GroupPort>(mut engine: NodeEngine, mut port: P, mut confchg_rx: mpsc::Receiver<ConfchgEvent>, tick_period: Duration) {
    let start = Instant::now();
    let mut ticker = interval(tick_period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = start.elapsed().as_nanos() as u64;
                let effects = engine.tick(now);
                if !effects.is_empty() {
                    tracing::debug!(count = effects.len(), "timer tick produced effects");
                    engine.run_effects(effects).await;
                }
                if !engine.drive_sync(&mut port) {
                    tracing::debug!("sync round still in progress, will resume next tick");
                }
            }
            maybe_event = confchg_rx.recv() => {
                match maybe_event {
                    Some(event) => engine.handle_confchg(&event),
                    None => {
                        tracing::info!("confchg channel closed, shutting down");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received shutdown signal");
                break;
            }
        }
    }
}
