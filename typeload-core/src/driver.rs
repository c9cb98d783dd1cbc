use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use typeload_metrics::ChartBuffer;

use crate::backend::{AckStream, Marker, OpAck, Session, SessionProvider};
use crate::chunks::ChunkAssignment;
use crate::config::LoadOptions;
use crate::error::{Error, Result};
use crate::pacer::Pacer;
use crate::pause::PauseToken;
use crate::snapshot::{MetricsEvent, MetricsFn, MetricsSnapshot};
use crate::telemetry::{SessionTelemetry, spawn_snapshot_loop};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum EmitState {
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Connecting,
    Emitting(EmitState),
    Draining,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emitted {
    Char(char),
    Paragraph { line: u64, checkpoint: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Emitted(Emitted),
    Paused,
    Exhausted,
}

/// Types one chunk into one backend session.
///
/// Every emitted unit (character or paragraph marker) is one backend operation; the driver is
/// complete once the same number of acknowledgements attributed to its session came back.
pub struct TypingDriver<S> {
    assignment: ChunkAssignment,
    session: Option<S>,
    acks: Option<AckStream>,
    pause: PauseToken,
    telemetry: Arc<Mutex<SessionTelemetry>>,

    pacing_interval: Duration,
    checkpoint_every: u64,
    snapshot_interval: Duration,
    chart_len: usize,

    cursor: usize,
    lines: u64,
    state: DriverState,
}

impl<S: Session> TypingDriver<S> {
    pub fn new(assignment: ChunkAssignment, opts: &LoadOptions, pause: PauseToken) -> Result<Self> {
        let telemetry = SessionTelemetry::new(assignment.key.clone(), assignment.units(), opts)?;

        Ok(Self {
            assignment,
            session: None,
            acks: None,
            pause,
            telemetry: Arc::new(Mutex::new(telemetry)),
            pacing_interval: opts.pacing_interval,
            checkpoint_every: opts.checkpoint_every.max(1),
            snapshot_interval: opts.snapshot_interval,
            chart_len: opts.chart_len,
            cursor: 0,
            lines: 0,
            state: DriverState::Idle,
        })
    }

    pub async fn connect<P>(&mut self, provider: &P, document: &str) -> Result<()>
    where
        P: SessionProvider<Session = S>,
    {
        self.set_state(DriverState::Connecting);
        let session = provider.load_session(document).await?;
        self.attach(session);
        Ok(())
    }

    /// Binds a ready session; subscribes to its acks before anything is sent.
    pub fn attach(&mut self, session: S) {
        tracing::debug!(
            chunk = %self.assignment.key,
            client = session.client_id(),
            units = self.units(),
            "session ready"
        );
        self.acks = Some(session.acks());
        self.session = Some(session);

        let emit = if self.pause.is_paused() {
            EmitState::Paused
        } else {
            EmitState::Running
        };
        self.set_state(DriverState::Emitting(emit));
    }

    pub fn key(&self) -> &str {
        &self.assignment.key
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Byte offset of the next unread character.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn units(&self) -> u64 {
        self.telemetry.lock().units()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.telemetry.lock().snapshot()
    }

    pub fn session(&self) -> Option<&S> {
        self.session.as_ref()
    }

    /// One scheduling tick: emits at most one unit.
    pub fn step(&mut self) -> Result<StepOutcome> {
        match self.state {
            DriverState::Idle | DriverState::Connecting => {
                return Err(Error::NotConnected(self.assignment.key.to_string()));
            }
            DriverState::Draining | DriverState::Completed => return Ok(StepOutcome::Exhausted),
            DriverState::Emitting(_) => {}
        }

        if self.pause.is_paused() {
            self.set_state(DriverState::Emitting(EmitState::Paused));
            return Ok(StepOutcome::Paused);
        }
        self.set_state(DriverState::Emitting(EmitState::Running));

        let text = self.assignment.text.clone();
        loop {
            let Some(ch) = text[self.cursor..].chars().next() else {
                tracing::debug!(
                    chunk = %self.assignment.key,
                    pending = self.telemetry.lock().pending(),
                    "corpus exhausted, draining"
                );
                self.set_state(DriverState::Draining);
                self.check_completion();
                return Ok(StepOutcome::Exhausted);
            };

            if ch == '\r' {
                self.cursor += ch.len_utf8();
                continue;
            }

            let emitted = self.emit(ch)?;
            self.cursor += ch.len_utf8();
            self.telemetry.lock().on_send();
            return Ok(StepOutcome::Emitted(emitted));
        }
    }

    fn emit(&mut self, ch: char) -> Result<Emitted> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| Error::NotConnected(self.assignment.key.to_string()))?;
        let anchor = session.resolve_anchor()?;

        if ch != '\n' {
            session.insert_text(anchor, ch)?;
            return Ok(Emitted::Char(ch));
        }

        session.insert_marker(anchor, Marker::paragraph(&self.assignment.key))?;
        self.lines = self.lines.saturating_add(1);

        let checkpoint = self.lines % self.checkpoint_every == 0;
        if checkpoint {
            let label = format!("{}-line-{}", self.assignment.key, self.lines);
            tracing::debug!(chunk = %self.assignment.key, %label, "requesting checkpoint");
            session.checkpoint(&label);
        }

        Ok(Emitted::Paragraph {
            line: self.lines,
            checkpoint,
        })
    }

    /// Accounts an acknowledgement; acks of other clients are ignored.
    pub fn handle_ack(&mut self, ack: &OpAck, sink: Option<&MetricsFn>) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if ack.client_id.as_ref() != session.client_id() {
            return;
        }

        let snapshot = self.telemetry.lock().on_ack(ack);
        if let (Some(snapshot), Some(sink)) = (snapshot, sink) {
            (sink)(MetricsEvent::Ack(snapshot));
        }
        self.check_completion();
    }

    fn check_completion(&mut self) {
        if self.state != DriverState::Draining {
            return;
        }

        let (done, acked) = {
            let telemetry = self.telemetry.lock();
            (telemetry.is_complete(), telemetry.acked())
        };
        if done {
            tracing::info!(chunk = %self.assignment.key, acked, "chunk completed");
            self.set_state(DriverState::Completed);
        }
    }

    fn set_state(&mut self, next: DriverState) {
        if self.state != next {
            tracing::trace!(chunk = %self.assignment.key, from = ?self.state, to = ?next, "driver state");
            self.state = next;
        }
    }

    /// Drives the session to completion and returns its final metrics.
    ///
    /// `sink` receives a snapshot on every resolved acknowledgement and on every periodic tick.
    pub async fn run(mut self, sink: Option<MetricsFn>) -> Result<MetricsSnapshot> {
        let Some(mut acks) = self.acks.take() else {
            return Err(Error::NotConnected(self.assignment.key.to_string()));
        };

        self.telemetry.lock().start();

        let chart = ChartBuffer::new(self.chart_len)?;
        let ticker = sink.clone().map(|sink| {
            spawn_snapshot_loop(self.telemetry.clone(), chart, self.snapshot_interval, sink)
        });

        let result = self.drive(&mut acks, sink.as_ref()).await;

        if let Some(h) = ticker {
            h.abort();
            let _ = h.await;
        }

        result?;
        Ok(self.snapshot())
    }

    async fn drive(&mut self, acks: &mut AckStream, sink: Option<&MetricsFn>) -> Result<()> {
        let pause = self.pause.clone();
        let mut pacer = Pacer::new(self.pacing_interval);

        while self.state != DriverState::Completed {
            let emitting = matches!(self.state, DriverState::Emitting(_));
            let paused = self.state == DriverState::Emitting(EmitState::Paused);

            tokio::select! {
                biased;

                ack = acks.recv() => {
                    let Some(ack) = ack else {
                        let telemetry = self.telemetry.lock();
                        return Err(Error::AckStreamClosed {
                            chunk: self.assignment.key.to_string(),
                            acked: telemetry.acked(),
                            units: telemetry.units(),
                        });
                    };
                    self.handle_ack(&ack, sink);
                }

                () = pacer.next_turn(paused, &pause), if emitting => {
                    self.step()?;
                }
            }
        }

        Ok(())
    }
}
