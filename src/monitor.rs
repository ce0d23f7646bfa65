//! Periodic polling of a single request against one session.

use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::net::DeviceSession;
use crate::output::Printer;

use futures_util::FutureExt;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Connected,
    Polling,
    Stopping,
    Disconnected,
}

/// Why the scheduler stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    ConnectFailed,
    Cancelled,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub outcome: Outcome,
    pub iterations: u64,
    pub failures: u64,
}

/// One execution of the request.
#[derive(Debug, Clone, Copy)]
pub struct PollCycle {
    pub index: u64,
    pub started: Instant,
    pub finished: Instant,
}

impl PollCycle {
    pub fn elapsed(&self) -> Duration {
        self.finished.duration_since(self.started)
    }
}

pub struct Monitor {
    period: Duration,
    /// Iterations to run, 0 runs until cancelled
    repeat: u64,
    token: CancellationToken,
    state: watch::Sender<State>,
}

impl Monitor {
    pub fn new(period: Duration, repeat: u64, token: CancellationToken) -> Self {
        Self {
            period,
            repeat,
            token,
            state: watch::Sender::new(State::Idle),
        }
    }

    /// Follow the state of the scheduler from another task.
    pub fn state(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    fn transition(&self, next: State) {
        let previous = self.state.send_replace(next);
        debug!("Monitor state {:?} -> {:?}", previous, next);
    }

    /// Connect, poll until cancelled or the repeat budget is used up, then disconnect.
    ///
    /// The session is disconnected exactly once on every path, including a panic inside the
    /// polling loop which is resumed afterwards. The token is cancelled when this returns so
    /// anyone waiting on it is released.
    pub async fn run<S, W>(
        &self,
        session: &mut S,
        dispatcher: &Dispatcher,
        printer: &mut Printer<W>,
    ) -> Report
    where
        S: DeviceSession + ?Sized,
        W: Write + Send,
    {
        let _guard = self.token.clone().drop_guard();
        self.state.send_replace(State::Idle);

        if !session.connect().await {
            self.transition(State::Stopping);
            session.disconnect().await;
            self.transition(State::Disconnected);
            return Report {
                outcome: Outcome::ConnectFailed,
                iterations: 0,
                failures: 0,
            };
        }
        self.transition(State::Connected);
        self.transition(State::Polling);

        let result = AssertUnwindSafe(self.poll(&mut *session, dispatcher, printer))
            .catch_unwind()
            .await;

        self.transition(State::Stopping);
        session.disconnect().await;
        self.transition(State::Disconnected);

        match result {
            Ok(report) => report,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn poll<S, W>(
        &self,
        session: &mut S,
        dispatcher: &Dispatcher,
        printer: &mut Printer<W>,
    ) -> Report
    where
        S: DeviceSession + ?Sized,
        W: Write + Send,
    {
        let mut remaining = self.repeat;
        let mut report = Report {
            outcome: Outcome::Cancelled,
            iterations: 0,
            failures: 0,
        };

        while !self.token.is_cancelled() {
            let started = Instant::now();
            let verbose = report.iterations == 0;
            let result = dispatcher
                .execute(session, verbose)
                .await
                .and_then(|lines| printer.print(&lines).map_err(Error::from));
            if let Err(e) = result {
                report.failures += 1;
                warn!("Iteration {} failed. [{}]", report.iterations, e);
            }
            let cycle = PollCycle {
                index: report.iterations,
                started,
                finished: Instant::now(),
            };
            report.iterations += 1;

            if remaining > 0 {
                remaining -= 1;
                if remaining == 0 {
                    debug!("Repeat budget of {} iterations used up.", self.repeat);
                    report.outcome = Outcome::Exhausted;
                    self.token.cancel();
                    break;
                }
            }

            self.delay(&cycle).await;
        }
        report
    }

    /// Wait for the rest of the period. Never stretches the period to catch up.
    async fn delay(&self, cycle: &PollCycle) {
        if self.period.is_zero() {
            tokio::task::yield_now().await;
            return;
        }
        let elapsed = cycle.elapsed();
        if elapsed >= self.period {
            warn!(
                "No time between reads. Iteration {} took {} ms of a {} ms period.",
                cycle.index,
                elapsed.as_millis(),
                self.period.as_millis()
            );
            tokio::task::yield_now().await;
            return;
        }
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = tokio::time::sleep(self.period - elapsed) => {}
        }
    }
}
