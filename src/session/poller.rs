//! Status and heartbeat timers, each on its own thread so a slow request on one
//! never delays the other.

use crate::api::{ApiError, ControlApi, StatusReport};
use crate::log_debug;
use anyhow::{Context, Result};
use crossbeam_channel::{select, tick, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Result of one timer firing, delivered to the event loop.
#[derive(Debug)]
pub enum PollEvent {
    Status(Result<StatusReport, ApiError>),
    Heartbeat(Result<(), ApiError>),
}

/// Handle to the two timer threads. Dropping it stops and joins them.
pub struct Poller {
    stop_tx: Option<Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl Poller {
    /// Start both timers. Each fires once immediately, then on its interval.
    pub fn spawn(
        api: Arc<dyn ControlApi>,
        status_interval: Duration,
        heartbeat_interval: Duration,
        events: Sender<PollEvent>,
    ) -> Result<Self> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);

        let status_api = Arc::clone(&api);
        let status = spawn_timer(
            "sortpanel-status",
            status_interval,
            stop_rx.clone(),
            events.clone(),
            move || PollEvent::Status(status_api.status()),
        )?;
        let heartbeat = spawn_timer(
            "sortpanel-heartbeat",
            heartbeat_interval,
            stop_rx,
            events,
            move || PollEvent::Heartbeat(api.heartbeat()),
        )?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handles: vec![status, heartbeat],
        })
    }

    /// Stop both timers and wait for any request already in flight.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        // Disconnecting the stop channel wakes both selects.
        self.stop_tx.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log_debug("poller thread panicked");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn spawn_timer<F>(
    name: &str,
    interval: Duration,
    stop_rx: Receiver<()>,
    events: Sender<PollEvent>,
    mut fire: F,
) -> Result<JoinHandle<()>>
where
    F: FnMut() -> PollEvent + Send + 'static,
{
    let thread_name = name.to_string();
    thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let ticker = tick(interval);
            if events.send(fire()).is_err() {
                return;
            }
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        if events.send(fire()).is_err() {
                            break;
                        }
                    }
                }
            }
            log_debug(&format!("{thread_name} stopped"));
        })
        .with_context(|| format!("failed to spawn {name} thread"))
}
