//! The Dreaming: an independent counter loop on its own thread.

mod cancellation;

pub use cancellation::CancellationToken;

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum TickerError {
    #[error("Ticker already started")]
    AlreadyStarted,
    #[error("Failed to spawn ticker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Timing for the ticker loop
#[derive(Debug, Clone)]
pub struct TickerConfig {
    /// Sleep between increments
    pub interval: Duration,
    /// Longest `stop` waits for the loop to exit
    pub join_timeout: Duration,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1500),
            join_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

pub struct Dreaming {
    config: TickerConfig,
    level: Arc<AtomicU64>,
    token: CancellationToken,
    state: TickerState,
    handle: Option<JoinHandle<()>>,
    exited: Option<Receiver<()>>,
}

impl Dreaming {
    pub fn new(config: TickerConfig) -> Self {
        Self {
            config,
            level: Arc::new(AtomicU64::new(0)),
            token: CancellationToken::new(),
            state: TickerState::Idle,
            handle: None,
            exited: None,
        }
    }

    /// Spawns the dream loop. Returns immediately.
    pub fn start(&mut self) -> Result<(), TickerError> {
        if self.state != TickerState::Idle {
            return Err(TickerError::AlreadyStarted);
        }

        let level = Arc::clone(&self.level);
        let token = self.token.clone();
        let interval = self.config.interval;
        let (exit_tx, exit_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("the-dreaming".into())
            .spawn(move || {
                while !token.is_cancelled() {
                    let n = level.fetch_add(1, Ordering::Relaxed) + 1;
                    println!("The Dreaming: Deeper level {} — murmuration drifting...", n);
                    thread::sleep(interval);
                }
                debug!(level = level.load(Ordering::Relaxed), "dream loop exited");
                // Receiver may already be gone if stop gave up waiting
                let _ = exit_tx.send(());
            })?;

        info!(interval_ms = interval.as_millis() as u64, "dreaming started");
        self.handle = Some(handle);
        self.exited = Some(exit_rx);
        self.state = TickerState::Running;
        Ok(())
    }

    /// Requests the loop to stop and waits at most `join_timeout` for it.
    ///
    /// Returns `Stopping` if the loop is still asleep when the timeout
    /// elapses; the thread is then left to finish on its own.
    pub fn stop(&mut self) -> TickerState {
        match self.state {
            TickerState::Idle | TickerState::Stopped => return self.state,
            TickerState::Running => {
                self.token.cancel();
                self.state = TickerState::Stopping;
            }
            TickerState::Stopping => {}
        }

        let waited = match &self.exited {
            Some(rx) => rx.recv_timeout(self.config.join_timeout),
            None => Err(RecvTimeoutError::Disconnected),
        };
        match waited {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => self.finish(),
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout_ms = self.config.join_timeout.as_millis() as u64,
                    level = self.level(),
                    "dream loop did not stop in time"
                );
            }
        }
        self.state
    }

    /// Current state; notices a loop that exited after `stop` timed out.
    pub fn state(&mut self) -> TickerState {
        if self.state == TickerState::Stopping {
            let exited = match &self.exited {
                Some(rx) => !matches!(rx.try_recv(), Err(mpsc::TryRecvError::Empty)),
                None => true,
            };
            if exited {
                self.finish();
            }
        }
        self.state
    }

    pub fn level(&self) -> u64 {
        self.level.load(Ordering::Relaxed)
    }

    fn finish(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("dream loop panicked");
            }
        }
        self.exited = None;
        self.state = TickerState::Stopped;
        info!(level = self.level(), "dreaming stopped");
    }
}

impl Drop for Dreaming {
    /// Cancels a live loop without waiting for it to exit.
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl Default for Dreaming {
    fn default() -> Self {
        Self::new(TickerConfig::default())
    }
}
