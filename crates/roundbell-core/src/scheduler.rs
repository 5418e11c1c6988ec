//! Background timing loop.
//!
//! The scheduler is the sole owner of the live timer state. It runs as its own
//! tokio task, receives [`Command`]s over an mpsc channel and answers with
//! batches of [`TimerEvent`]s. Everything produced while handling one command
//! or one tick goes out as a single batch, so a tick that ends a phase is
//! delivered together with the transition it caused.
//!
//! ## Timing
//!
//! ```text
//! start:  reference = now
//! tick:   elapsed   = now - reference - paused_total
//!         remaining = max(0, duration - elapsed)
//! pause:  pause_started = now
//! resume: paused_total += now - pause_started
//! ```
//!
//! A phase that runs out is rolled over inside the same tick; at most one
//! ticker exists at any time and it is dropped on stop, reset and pause.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::error::{EngineError, ErrorKind};
use crate::events::{EventKind, TimerEvent};
use crate::protocol::Command;
use crate::timer::{Phase, PhaseClock, PhaseMachine, TimerConfig, TimerState, Transition};

/// Events produced by one command or one tick, in emission order.
pub type EventBatch = Vec<TimerEvent>;

/// Both ends of a running scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    pub commands: mpsc::UnboundedSender<Command>,
    pub events: mpsc::UnboundedReceiver<EventBatch>,
    pub task: JoinHandle<()>,
}

/// Spawn a scheduler on the current tokio runtime.
///
/// The loop runs until the command sender is dropped or nobody listens to
/// its events any more. Its first batch is a single `ready` event.
pub fn spawn(config: TimerConfig, tick_interval: Duration) -> SchedulerHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let scheduler = Scheduler::new(config, tick_interval, event_tx);
    let task = tokio::spawn(scheduler.run(command_rx));
    SchedulerHandle {
        commands: command_tx,
        events: event_rx,
        task,
    }
}

struct Scheduler {
    config: TimerConfig,
    machine: PhaseMachine,
    clock: Option<PhaseClock>,
    ticker: Option<Interval>,
    tick_interval: Duration,
    epoch: Instant,
    events: mpsc::UnboundedSender<EventBatch>,
}

impl Scheduler {
    fn new(
        config: TimerConfig,
        tick_interval: Duration,
        events: mpsc::UnboundedSender<EventBatch>,
    ) -> Self {
        Self {
            config,
            machine: PhaseMachine::new(),
            clock: None,
            ticker: None,
            tick_interval,
            epoch: Instant::now(),
            events,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        info!(
            tick_ms = self.tick_interval.as_millis() as u64,
            "timer scheduler ready"
        );
        let ready = vec![self.event(EventKind::Ready, Instant::now())];
        if !self.emit(ready) {
            return;
        }

        loop {
            let batch = tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => self.handle(command, Instant::now()),
                    None => break,
                },
                _ = next_tick(&mut self.ticker) => self.on_tick(Instant::now()),
            };
            if !self.emit(batch) {
                break;
            }
        }
        info!("timer scheduler stopped");
    }

    fn handle(&mut self, command: Command, now: Instant) -> EventBatch {
        trace!(command = command.name(), "command received");
        match command {
            Command::Start { config: None } => vec![self.error(
                ErrorKind::Configuration,
                "start requires a configuration".to_string(),
                Some("start"),
                now,
            )],
            Command::Start {
                config: Some(config),
            } => self.start(config, now),
            Command::Pause => self.pause(now),
            Command::Resume => self.resume(now),
            Command::Stop => self.stop(now),
            Command::Reset { config } => self.reset(config, now),
            Command::Status => vec![self.event(EventKind::Status, now)],
            Command::Unknown { kind } => {
                let message = EngineError::UnknownCommand(kind.clone()).to_string();
                vec![self.error(ErrorKind::UnknownCommand, message, Some(&kind), now)]
            }
            Command::Malformed { kind, reason } => {
                let message = format!("malformed {kind} command: {reason}");
                vec![self.error(ErrorKind::UnknownCommand, message, Some(&kind), now)]
            }
        }
    }

    fn start(&mut self, config: TimerConfig, now: Instant) -> EventBatch {
        if let Err(e) = config.validate() {
            return vec![self.error(ErrorKind::Configuration, e.to_string(), Some("start"), now)];
        }
        let transitions = match self.machine.start(&config) {
            Ok(transitions) => transitions,
            Err(e) => {
                return vec![self.error(e.kind(), e.to_string(), Some("start"), now)];
            }
        };
        self.config = config;
        self.clock = Some(PhaseClock::start(now));
        self.ticker = Some(self.new_ticker(now));
        info!(
            rounds = config.total_rounds,
            work_secs = config.work_duration,
            rest_secs = config.rest_duration,
            prep_secs = config.prep_duration,
            "workout started"
        );

        let mut batch = self.transition_events(&transitions, now);
        batch.push(self.event(EventKind::Started, now));
        batch
    }

    fn pause(&mut self, now: Instant) -> EventBatch {
        // Apply any boundary that passed since the last tick before freezing.
        let mut batch = Vec::new();
        self.settle(now, &mut batch);
        if !self.machine.pause() {
            trace!(phase = %self.machine.phase(), "pause ignored");
            return batch;
        }
        self.ticker = None;
        if let Some(clock) = self.clock.as_mut() {
            clock.pause(now);
        }
        let event = self.event(EventKind::Paused, now);
        info!(remaining_ms = event.state.remaining, "workout paused");
        batch.push(event);
        batch
    }

    fn resume(&mut self, now: Instant) -> EventBatch {
        if !self.machine.resume() {
            trace!(phase = %self.machine.phase(), "resume ignored");
            return Vec::new();
        }
        if let Some(clock) = self.clock.as_mut() {
            clock.resume(now);
        }
        self.ticker = Some(self.new_ticker(now));
        let event = self.event(EventKind::Resumed, now);
        info!(remaining_ms = event.state.remaining, "workout resumed");
        vec![event]
    }

    fn stop(&mut self, now: Instant) -> EventBatch {
        if self.machine.phase() == Phase::Idle {
            trace!("stop ignored");
            return Vec::new();
        }
        self.halt();
        info!("workout stopped");
        vec![self.event(EventKind::Stopped, now)]
    }

    fn reset(&mut self, config: Option<TimerConfig>, now: Instant) -> EventBatch {
        if let Some(config) = config {
            if let Err(e) = config.validate() {
                return vec![self.error(ErrorKind::Configuration, e.to_string(), Some("reset"), now)];
            }
            self.config = config;
        }
        self.halt();
        debug!("timer reset");
        vec![self.event(EventKind::Reset, now)]
    }

    fn on_tick(&mut self, now: Instant) -> EventBatch {
        if !self.machine.is_ticking() {
            return Vec::new();
        }
        let mut batch = vec![TimerEvent::tick(self.snapshot(now), self.timestamp(now))];
        self.settle(now, &mut batch);
        batch
    }

    /// Fire due warnings and apply every phase boundary that `now` has passed.
    fn settle(&mut self, now: Instant, batch: &mut EventBatch) {
        while self.machine.is_ticking() {
            let Some(clock) = self.clock else {
                break;
            };
            let duration_ms = self.machine.phase_ms(&self.config);
            let remaining = duration_ms.saturating_sub(clock.elapsed_ms(now));

            if self.machine.take_warning(remaining, &self.config) {
                let phase = self.machine.phase();
                debug!(%phase, remaining_ms = remaining, "phase warning");
                batch.push(self.event(EventKind::Warning { phase, remaining }, now));
            }
            if remaining > 0 {
                break;
            }

            let transitions = self.machine.expire(&self.config);
            if self.machine.phase() == Phase::Complete {
                self.clock = None;
                self.ticker = None;
            } else if let Some(clock) = self.clock.as_mut() {
                clock.roll_over(Duration::from_millis(duration_ms));
            }
            batch.extend(self.transition_events(&transitions, now));
        }
    }

    fn halt(&mut self) {
        self.ticker = None;
        self.clock = None;
        self.machine.stop();
    }

    fn transition_events(&self, transitions: &[Transition], now: Instant) -> EventBatch {
        transitions
            .iter()
            .map(|transition| {
                let kind = match *transition {
                    Transition::Prepare => EventKind::PreparationStart,
                    Transition::PhaseChange { old, new, round } => {
                        debug!(%old, %new, round, "phase change");
                        EventKind::PhaseChange { old, new, round }
                    }
                    Transition::RoundComplete { round } => EventKind::RoundComplete { round },
                    Transition::WorkoutComplete { rounds } => {
                        info!(rounds, "workout complete");
                        EventKind::WorkoutComplete { rounds }
                    }
                };
                self.event(kind, now)
            })
            .collect()
    }

    fn new_ticker(&self, now: Instant) -> Interval {
        let mut ticker = time::interval_at(now + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    /// The single source of snapshots for ticks, status answers and every
    /// other event.
    fn snapshot(&self, now: Instant) -> TimerState {
        let elapsed = self.clock.map(|c| c.elapsed_ms(now)).unwrap_or(0);
        TimerState::capture(&self.machine, &self.config, elapsed)
    }

    fn timestamp(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.epoch).as_millis() as u64
    }

    fn event(&self, kind: EventKind, now: Instant) -> TimerEvent {
        TimerEvent::new(kind, self.snapshot(now), self.timestamp(now))
    }

    fn error(
        &self,
        kind: ErrorKind,
        message: String,
        command: Option<&str>,
        now: Instant,
    ) -> TimerEvent {
        warn!(?kind, command, "{message}");
        self.event(
            EventKind::Error {
                kind,
                message,
                command: command.map(str::to_string),
            },
            now,
        )
    }

    /// Returns false once the receiving side is gone.
    fn emit(&self, batch: EventBatch) -> bool {
        if batch.is_empty() {
            return true;
        }
        self.events.send(batch).is_ok()
    }
}

async fn next_tick(ticker: &mut Option<Interval>) -> Instant {
    match ticker {
        Some(ticker) => ticker.tick().await,
        None => std::future::pending().await,
    }
}
