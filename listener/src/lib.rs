//! Live capture and message classification for pdec.
//!
//! The listener opens one capture session per interface, extracts transport
//! payloads on the configured port, and runs them through framing,
//! reassembly, value decoding and classification. Classified messages are
//! sent on a crossbeam channel.
//!
//! # Threading
//!
//! Each interface gets its own named OS thread. The threads share a single
//! [`Dispatcher`], so fragments of one message may arrive on different
//! interfaces. Every capture wakes at least once per read timeout to check
//! the shutdown flag.

mod capture;
mod classify;
mod config;
mod dispatch;
mod error;
mod stats;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use schema::CodeTables;
use tracing::{error, info};

pub use capture::{
    extract_payload, list_interfaces, replay_file, resolve_interfaces, InterfaceInfo, LinkLayer,
};
pub use classify::{Classifier, Message, MessageKind, IMPLICIT_EVENT_NAME};
pub use config::{ListenerConfig, DEFAULT_PORT};
pub use dispatch::Dispatcher;
pub use error::{ListenerError, ListenerResult};
pub use stats::{DispatchSnapshot, DispatchStats};

/// A configured, not yet started, set of capture sessions.
#[derive(Debug)]
pub struct Listener {
    config: ListenerConfig,
    dispatcher: Dispatcher,
}

impl Listener {
    #[must_use]
    pub fn new(config: ListenerConfig, tables: Arc<CodeTables>, output: Sender<Message>) -> Self {
        let dispatcher = Dispatcher::from_config(&config, tables, output);
        Self { config, dispatcher }
    }

    #[must_use]
    pub const fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Opens every capture session, then spawns one thread per session.
    ///
    /// Nothing is spawned unless every requested interface opens.
    pub fn start(self) -> ListenerResult<ListenerHandle> {
        let names = resolve_interfaces(&self.config)?;
        let sessions = names
            .iter()
            .map(|name| capture::open_live(name, &self.config))
            .collect::<ListenerResult<Vec<_>>>()?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let mut handle = ListenerHandle {
            shutdown: Arc::clone(&shutdown),
            threads: Vec::with_capacity(sessions.len()),
            dispatcher: self.dispatcher.clone(),
        };

        for session in sessions {
            let name = session.name.clone();
            let dispatcher = self.dispatcher.clone();
            let flag = Arc::clone(&shutdown);
            let port = self.config.port;
            let spawned = thread::Builder::new()
                .name(format!("pdec-capture-{name}"))
                .spawn(move || {
                    let mut session = session;
                    capture::run_capture(
                        &mut session.capture,
                        &session.name,
                        session.link,
                        port,
                        &dispatcher,
                        &flag,
                    )
                });
            match spawned {
                Ok(thread) => handle.threads.push((name, thread)),
                Err(err) => {
                    handle.stop();
                    let _ = handle.join();
                    return Err(ListenerError::Spawn {
                        source: name,
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            interfaces = handle.threads.len(),
            port = self.config.port,
            "listener started"
        );
        Ok(handle)
    }
}

/// Controls running capture threads.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    threads: Vec<(String, JoinHandle<ListenerResult<()>>)>,
    dispatcher: Dispatcher,
}

impl ListenerHandle {
    /// Asks every capture thread to exit after its current read.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// True once every capture thread has returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.threads.iter().all(|(_, thread)| thread.is_finished())
    }

    /// Interfaces with a capture thread.
    pub fn interfaces(&self) -> impl Iterator<Item = &str> {
        self.threads.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn stats(&self) -> DispatchSnapshot {
        self.dispatcher.stats()
    }

    /// Waits for every capture thread. Returns the first failure after all
    /// threads have finished.
    pub fn join(self) -> ListenerResult<()> {
        let mut first_error = None;
        for (name, thread) in self.threads {
            let outcome = match thread.join() {
                Ok(result) => result,
                Err(_) => Err(ListenerError::ThreadPanicked {
                    source: name.clone(),
                }),
            };
            if let Err(err) = outcome {
                error!(interface = %name, error = %err, "capture thread failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
