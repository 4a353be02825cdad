//! Execution driver
//!
//! Runs a notebook end to end as a state machine:
//!
//! ```text
//! WaitForConnection -> Capturing -> Executing -> PollingBusy -> Validating -> Done
//! ```
//!
//! The two waiting states poll the host on a fixed interval using an
//! injected [`Clock`]. Without a timeout the driver waits for as long as it
//! takes; a timeout or a cancellation signal ends the run with an error.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::common::{Error, Result};
use crate::fixture::Fixture;
use crate::host::{NotebookHost, Page};
use crate::validator::{capture, validate, CellOutputSnapshot, Verdict};

/// Externally visible state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitForConnection,
    Capturing,
    Executing,
    PollingBusy,
    Validating,
    Done,
}

impl Phase {
    fn describe(self) -> &'static str {
        match self {
            Phase::WaitForConnection => "waiting for the kernel to connect",
            Phase::Capturing => "capturing outputs",
            Phase::Executing => "starting execution",
            Phase::PollingBusy => "waiting for execution to finish",
            Phase::Validating => "validating outputs",
            Phase::Done => "done",
        }
    }
}

enum State {
    WaitForConnection,
    Capturing,
    Executing { before: CellOutputSnapshot },
    PollingBusy { before: CellOutputSnapshot },
    Validating { before: CellOutputSnapshot },
    Done(Verdict),
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::WaitForConnection => Phase::WaitForConnection,
            State::Capturing => Phase::Capturing,
            State::Executing { .. } => Phase::Executing,
            State::PollingBusy { .. } => Phase::PollingBusy,
            State::Validating { .. } => Phase::Validating,
            State::Done(_) => Phase::Done,
        }
    }
}

/// Source of time for polling
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Real time, through tokio's timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual time: `sleep` returns at once and moves `now` forward
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Every sleep requested so far
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.lock().map(|now| *now).unwrap_or_else(|e| *e.into_inner())
    }

    async fn sleep(&self, duration: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += duration;
        }
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        tokio::task::yield_now().await;
    }
}

/// Driver settings
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Delay between connection and busy checks
    pub poll_interval: Duration,
    /// Upper bound for the whole run; `None` waits forever
    pub timeout: Option<Duration>,
    /// Wrap the run in a recorded-interaction cassette
    pub fixture: Option<Fixture>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: None,
            fixture: None,
        }
    }
}

/// Drives one notebook run and validates the result
pub struct Driver<H, P, C = TokioClock> {
    host: H,
    page: P,
    clock: C,
    options: DriverOptions,
    cancel: Option<watch::Receiver<bool>>,
    phase: Phase,
}

impl<H: NotebookHost, P: Page> Driver<H, P, TokioClock> {
    pub fn new(host: H, page: P, options: DriverOptions) -> Self {
        Self {
            host,
            page,
            clock: TokioClock,
            options,
            cancel: None,
            phase: Phase::WaitForConnection,
        }
    }
}

impl<H: NotebookHost, P: Page, C: Clock> Driver<H, P, C> {
    /// Replace the clock used for polling
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Driver<H, P, C2> {
        Driver {
            host: self.host,
            page: self.page,
            clock,
            options: self.options,
            cancel: self.cancel,
            phase: self.phase,
        }
    }

    /// Abort the run once `cancel` reads `true`
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn into_parts(self) -> (H, P) {
        (self.host, self.page)
    }

    /// Run every state until `Done` and return the verdict
    pub async fn run(&mut self) -> Result<Verdict> {
        let started = self.clock.now();
        let mut state = State::WaitForConnection;
        self.phase = state.phase();

        loop {
            state = self.step(state, started).await?;
            let next = state.phase();
            if next != self.phase {
                tracing::debug!("Driver: {:?} -> {:?}", self.phase, next);
                self.phase = next;
            }
            if let State::Done(verdict) = state {
                tracing::info!(
                    "{}: {}",
                    self.host.notebook_path(),
                    if verdict.passed { "PASS" } else { "FAIL" }
                );
                return Ok(verdict);
            }
        }
    }

    async fn step(&mut self, state: State, started: Instant) -> Result<State> {
        match state {
            State::WaitForConnection => {
                if self.host.is_connected().await {
                    Ok(State::Capturing)
                } else {
                    tracing::trace!("Kernel not connected");
                    self.wait(started).await?;
                    Ok(State::WaitForConnection)
                }
            }
            State::Capturing => {
                let before = capture(&self.host).await?;
                self.host.clear_all_output().await?;
                Ok(State::Executing { before })
            }
            State::Executing { before } => {
                tracing::info!("Starting execution of {}", self.host.notebook_path());
                if let Some(fixture) = &self.options.fixture {
                    tracing::debug!("Recording interactions to {}", fixture.cassette_file());
                    self.host.execute(&fixture.setup_code()).await?;
                }
                self.host.execute_all_cells().await?;
                // the busy flag may not be raised yet right after the request
                self.wait(started).await?;
                Ok(State::PollingBusy { before })
            }
            State::PollingBusy { before } => {
                if self.host.is_busy().await? {
                    tracing::trace!("Busy");
                    self.wait(started).await?;
                    Ok(State::PollingBusy { before })
                } else {
                    tracing::info!("Finished execution");
                    Ok(State::Validating { before })
                }
            }
            State::Validating { before } => {
                if let Some(fixture) = &self.options.fixture {
                    self.host.execute(fixture.teardown_code()).await?;
                }
                let after = capture(&self.host).await?;
                let verdict = validate(&before, &after, &mut self.page);
                Ok(State::Done(verdict))
            }
            State::Done(verdict) => Ok(State::Done(verdict)),
        }
    }

    /// Sleep one poll interval, unless cancelled or out of time
    async fn wait(&mut self, started: Instant) -> Result<()> {
        let phase = self.phase;
        let cancelled = || Error::Cancelled(phase.describe().to_string());
        if self.cancel.as_ref().is_some_and(|cancel| *cancel.borrow()) {
            return Err(cancelled());
        }
        if let Some(timeout) = self.options.timeout {
            let elapsed = self.clock.now().saturating_duration_since(started);
            if elapsed >= timeout {
                return Err(Error::timeout(self.phase.describe(), timeout.as_secs()));
            }
        }

        let interval = self.options.poll_interval;
        let interrupted = match &mut self.cancel {
            Some(cancel) => {
                tokio::select! {
                    _ = self.clock.sleep(interval) => false,
                    _ = cancel_requested(cancel) => true,
                }
            }
            None => {
                self.clock.sleep(interval).await;
                false
            }
        };
        if interrupted {
            return Err(cancelled());
        }
        Ok(())
    }
}

/// Resolves once `cancel` reads `true`; never, if the sender is gone
async fn cancel_requested(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}
