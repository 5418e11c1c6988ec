//! Engine facade.
//!
//! The public face of the timer for UI and audio collaborators. It owns the
//! configuration, talks to the background scheduler only through messages and
//! derives [`TimerEngine::state`] from the most recent event it received.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(Preset::Beginner.config(), EngineOptions::default())?;
//! let sub = engine.subscribe(|event| println!("{}", event.kind.name()));
//! engine.start()?;
//! // ...
//! sub.unsubscribe();
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::{ConfigurationError, EngineError, ErrorKind};
use crate::events::{EventKind, TimerEvent};
use crate::protocol::{Command, InboundMessage};
use crate::scheduler::{self, SchedulerHandle};
use crate::timer::{EngineOptions, Preset, TimerConfig, TimerConfigPatch, TimerState};

const EVENT_CAPACITY: usize = 1024;

type Listener = Arc<dyn Fn(&TimerEvent) + Send + Sync>;

/// Timer engine facade.
///
/// Must be created inside a tokio runtime. Dropping the engine shuts the
/// scheduler down.
pub struct TimerEngine {
    config: TimerConfig,
    options: EngineOptions,
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<Shared>,
    scheduler: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

impl TimerEngine {
    /// Validate the configuration and spawn the scheduler.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for out-of-range values.
    pub fn new(config: TimerConfig, options: EngineOptions) -> Result<Self, EngineError> {
        config.validate()?;
        options.validate()?;
        let shared = Arc::new(Shared::new(TimerState::idle(&config)));
        let (commands, scheduler, dispatcher) = launch(&shared, config, options);
        Ok(Self {
            config,
            options,
            commands,
            shared,
            scheduler,
            dispatcher,
        })
    }

    pub fn from_preset(preset: Preset, options: EngineOptions) -> Result<Self, EngineError> {
        Self::new(preset.config(), options)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Snapshot carried by the latest event received from the scheduler.
    pub fn state(&self) -> TimerState {
        self.shared.book().snapshot
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// True between a start and the end of that run (completion, stop, reset).
    pub fn is_session_active(&self) -> bool {
        self.shared.book().session_active
    }

    pub fn is_available(&self) -> bool {
        self.shared.book().available && !self.commands.is_closed()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// # Errors
    ///
    /// `InvalidState` while a run is in progress, `Unavailable` when the
    /// scheduler is gone.
    pub fn start(&self) -> Result<(), EngineError> {
        self.ensure_available()?;
        self.begin_session()?;
        self.send(Command::Start {
            config: Some(self.config),
        })
    }

    /// No-op unless a phase is running.
    pub fn pause(&self) -> Result<(), EngineError> {
        self.ensure_available()?;
        self.send(Command::Pause)
    }

    /// No-op unless paused.
    pub fn resume(&self) -> Result<(), EngineError> {
        self.ensure_available()?;
        self.send(Command::Resume)
    }

    pub fn stop(&self) -> Result<(), EngineError> {
        self.ensure_available()?;
        self.shared.book().session_active = false;
        self.send(Command::Stop)
    }

    /// Stop and reapply the current configuration.
    pub fn reset(&self) -> Result<(), EngineError> {
        self.ensure_available()?;
        self.shared.book().session_active = false;
        self.send(Command::Reset {
            config: Some(self.config),
        })
    }

    /// Ask the scheduler for a `status` event.
    pub fn request_status(&self) -> Result<(), EngineError> {
        self.ensure_available()?;
        self.send(Command::Status)
    }

    /// Forward a raw wire message.
    ///
    /// A configuration carried by `start` or `reset` is validated here and
    /// becomes the engine's configuration before the command is sent. Other
    /// scheduler-side problems come back as `error` events.
    ///
    /// # Errors
    ///
    /// A configuration error for an out-of-range payload, `InvalidState` for
    /// a `start` during a run; nothing is sent in either case.
    pub fn send_message(&mut self, message: InboundMessage) -> Result<(), EngineError> {
        self.ensure_available()?;
        match Command::decode(message) {
            Command::Start {
                config: Some(config),
            } => {
                config.validate()?;
                self.begin_session()?;
                self.config = config;
                self.send(Command::Start {
                    config: Some(config),
                })
            }
            Command::Reset {
                config: Some(config),
            } => {
                config.validate()?;
                self.config = config;
                self.reset()
            }
            Command::Reset { config: None } => self.reset(),
            Command::Stop => self.stop(),
            command => self.send(command),
        }
    }

    // ── Configuration ────────────────────────────────────────────────

    /// # Errors
    ///
    /// `UnknownPreset`, or `SessionActive` outside Idle/Complete.
    pub fn load_preset(&mut self, name: &str) -> Result<TimerConfig, EngineError> {
        self.ensure_settled()?;
        let preset: Preset = name.parse()?;
        self.apply_config(preset.config())
    }

    /// Merge a partial update into the current configuration.
    ///
    /// # Errors
    ///
    /// `SessionActive` outside Idle/Complete, or the first out-of-range field.
    /// The configuration is unchanged on error.
    pub fn update_config(&mut self, patch: &TimerConfigPatch) -> Result<TimerConfig, EngineError> {
        self.ensure_settled()?;
        let merged = self.config.merged(patch)?;
        self.apply_config(merged)
    }

    // ── Observers ────────────────────────────────────────────────────

    /// Register a callback. Callbacks run on the dispatcher task in
    /// registration order, before the event is broadcast.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&TimerEvent) + Send + Sync + 'static,
    {
        let mut listeners = self.shared.listeners();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Async event stream. Receivers that fall behind lose the oldest events.
    pub fn events(&self) -> broadcast::Receiver<TimerEvent> {
        self.shared.broadcast.subscribe()
    }

    /// Replace a terminated scheduler. Subscribers and configuration are kept;
    /// the timer starts over in Idle.
    pub fn respawn(&mut self) {
        self.scheduler.abort();
        self.dispatcher.abort();
        {
            // Waits for an in-flight delivery of the retired dispatcher.
            let mut generation = self.shared.delivery();
            *generation += 1;
            let mut book = self.shared.book();
            book.snapshot = TimerState::idle(&self.config);
            book.session_active = false;
            book.available = true;
        }
        let (commands, scheduler, dispatcher) = launch(&self.shared, self.config, self.options);
        self.commands = commands;
        self.scheduler = scheduler;
        self.dispatcher = dispatcher;
        info!("timer engine respawned");
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_session(&self) -> Result<(), EngineError> {
        let mut book = self.shared.book();
        if book.session_active {
            return Err(EngineError::InvalidState {
                command: "start",
                phase: book.snapshot.phase,
            });
        }
        book.session_active = true;
        Ok(())
    }

    fn apply_config(&mut self, config: TimerConfig) -> Result<TimerConfig, EngineError> {
        self.ensure_available()?;
        config.validate()?;
        self.config = config;
        self.send(Command::Reset {
            config: Some(config),
        })?;
        Ok(config)
    }

    fn ensure_settled(&self) -> Result<(), EngineError> {
        if self.shared.book().session_active {
            return Err(ConfigurationError::SessionActive.into());
        }
        Ok(())
    }

    fn ensure_available(&self) -> Result<(), EngineError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(EngineError::Unavailable)
        }
    }

    fn send(&self, command: Command) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .map_err(|_| EngineError::Unavailable)
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        self.scheduler.abort();
        self.dispatcher.abort();
    }
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("config", &self.config)
            .field("options", &self.options)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Handle returned by [`TimerEngine::subscribe`].
#[must_use]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.listeners().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

struct Bookkeeping {
    snapshot: TimerState,
    last_timestamp: u64,
    session_active: bool,
    available: bool,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

struct Shared {
    /// Current dispatcher generation, bumped on respawn. Held for the whole
    /// of a delivery so a retired dispatcher cannot reach subscribers.
    delivery: Mutex<u64>,
    book: Mutex<Bookkeeping>,
    listeners: Mutex<Listeners>,
    broadcast: broadcast::Sender<TimerEvent>,
}

impl Shared {
    fn new(snapshot: TimerState) -> Self {
        let (broadcast, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            delivery: Mutex::new(0),
            book: Mutex::new(Bookkeeping {
                snapshot,
                last_timestamp: 0,
                session_active: false,
                available: true,
            }),
            listeners: Mutex::new(Listeners::default()),
            broadcast,
        }
    }

    fn delivery(&self) -> MutexGuard<'_, u64> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn book(&self) -> MutexGuard<'_, Bookkeeping> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, generation: u64, event: TimerEvent) {
        let current = self.delivery();
        if *current != generation {
            return;
        }
        {
            let mut book = self.book();
            book.snapshot = event.state;
            book.last_timestamp = event.timestamp;
            match &event.kind {
                EventKind::WorkoutComplete { .. } => book.session_active = false,
                EventKind::Error {
                    command: Some(command),
                    ..
                } if command == "start" && event.state.phase.is_settled() => {
                    book.session_active = false;
                }
                _ => {}
            }
        }
        self.notify(event);
        drop(current);
    }

    /// The scheduler's event channel closed without a respawn.
    fn mark_unavailable(&self, generation: u64) {
        let current = self.delivery();
        if *current != generation {
            return;
        }
        let event = {
            let mut book = self.book();
            if !book.available {
                return;
            }
            book.available = false;
            book.session_active = false;
            TimerEvent::new(
                EventKind::Error {
                    kind: ErrorKind::EngineUnavailable,
                    message: EngineError::Unavailable.to_string(),
                    command: None,
                },
                book.snapshot,
                book.last_timestamp,
            )
        };
        error!("timer scheduler terminated unexpectedly");
        self.notify(event);
        drop(current);
    }

    fn notify(&self, event: TimerEvent) {
        let listeners: Vec<Listener> = self
            .listeners()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&event);
        }
        // No receivers is fine.
        let _ = self.broadcast.send(event);
    }
}

fn launch(
    shared: &Arc<Shared>,
    config: TimerConfig,
    options: EngineOptions,
) -> (mpsc::UnboundedSender<Command>, JoinHandle<()>, JoinHandle<()>) {
    let SchedulerHandle {
        commands,
        mut events,
        task,
    } = scheduler::spawn(config, options.tick_interval);
    let generation = *shared.delivery();
    let shared = Arc::clone(shared);
    let dispatcher = tokio::spawn(async move {
        while let Some(batch) = events.recv().await {
            for event in batch {
                shared.dispatch(generation, event);
            }
        }
        shared.mark_unavailable(generation);
    });
    (commands, task, dispatcher)
}
