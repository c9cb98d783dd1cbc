use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::backend::SessionProvider;
use crate::chunks::{ChunkAssignment, ChunkSource, resolve_assignments};
use crate::config::LoadOptions;
use crate::driver::TypingDriver;
use crate::error::{Error, Result};
use crate::pause::PauseToken;
use crate::snapshot::{MetricsFn, MetricsSnapshot};

/// Outcome of one chunk.
#[derive(Debug)]
pub struct ChunkReport {
    pub key: String,
    pub result: Result<MetricsSnapshot>,
}

impl ChunkReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug)]
pub struct LoadReport {
    /// Final snapshot of the first chunk that completed.
    pub snapshot: MetricsSnapshot,
    /// Per-chunk outcomes in assignment order.
    pub chunks: Vec<ChunkReport>,
    /// Highest number of simultaneously active sessions observed.
    pub peak_sessions: usize,
}

impl LoadReport {
    pub fn completed(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.chunks.len() - self.completed()
    }
}

/// Live session gauge with a high-water mark.
#[derive(Debug, Default)]
pub struct ActiveSessions {
    active: AtomicUsize,
    peak: AtomicUsize,
}

pub struct ActiveSessionGuard {
    gauge: Arc<ActiveSessions>,
}

impl Drop for ActiveSessionGuard {
    fn drop(&mut self) {
        self.gauge.active.fetch_sub(1, Ordering::Relaxed);
    }
}

impl ActiveSessions {
    pub fn enter(self: &Arc<Self>) -> ActiveSessionGuard {
        let now = self.active.fetch_add(1, Ordering::Relaxed).saturating_add(1);

        let mut cur = self.peak.load(Ordering::Relaxed);
        while now > cur {
            match self
                .peak
                .compare_exchange_weak(cur, now, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(observed) => cur = observed,
            }
        }

        ActiveSessionGuard {
            gauge: self.clone(),
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

/// Runs one typing driver per chunk with at most `concurrency` sessions alive at once.
pub struct ChunkDispatcher<P> {
    provider: Arc<P>,
    options: LoadOptions,
    pause: PauseToken,
}

impl<P: SessionProvider> ChunkDispatcher<P> {
    pub fn new(provider: Arc<P>, options: LoadOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            provider,
            options,
            pause: PauseToken::new(),
        })
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub fn pause_all(&self) {
        tracing::info!("pausing all writers");
        self.pause.pause();
    }

    pub fn resume_all(&self) {
        tracing::info!("resuming all writers");
        self.pause.resume();
    }

    /// Flips the pause state of every writer; returns `true` if they are now paused.
    pub fn toggle_pause(&self) -> bool {
        let paused = self.pause.toggle();
        tracing::info!(paused, "toggled writer pause");
        paused
    }

    /// Types every chunk of `source` into the configured document.
    ///
    /// A failing chunk is reported in [`LoadReport::chunks`] and does not stop the others. The
    /// run only fails as a whole if the partition cannot be resolved or no chunk completed.
    pub async fn run(
        &self,
        source: &dyn ChunkSource,
        on_metrics: Option<MetricsFn>,
    ) -> Result<LoadReport> {
        let assignments = resolve_assignments(source)?;
        let total = assignments.len();
        let workers = self.options.concurrency.min(total);

        tracing::debug!(
            document = %self.options.document,
            chunks = total,
            workers,
            "dispatch started"
        );

        let ctx = WorkerCtx {
            provider: self.provider.clone(),
            options: Arc::new(self.options.clone()),
            pause: self.pause.clone(),
            sink: on_metrics,
            gauge: Arc::new(ActiveSessions::default()),
            first: Arc::new(OnceLock::new()),
        };

        let mut reports: Vec<(usize, ChunkReport)> = if workers <= 1 {
            let mut out = Vec::with_capacity(total);
            for (idx, assignment) in assignments.into_iter().enumerate() {
                out.push((idx, ctx.run_chunk(assignment).await));
            }
            out
        } else {
            let queue = Arc::new(Mutex::new(
                assignments.into_iter().enumerate().collect::<VecDeque<_>>(),
            ));

            let mut handles = Vec::with_capacity(workers);
            for worker in 0..workers {
                let ctx = ctx.clone();
                let queue = queue.clone();
                handles.push(tokio::spawn(async move {
                    let mut done = Vec::new();
                    loop {
                        let next = queue.lock().pop_front();
                        let Some((idx, assignment)) = next else {
                            break;
                        };
                        tracing::trace!(worker, chunk = %assignment.key, "worker picked chunk");
                        done.push((idx, ctx.run_chunk(assignment).await));
                    }
                    done
                }));
            }

            let mut out = Vec::with_capacity(total);
            for h in handles {
                out.extend(h.await?);
            }
            out
        };
        reports.sort_by_key(|(idx, _)| *idx);

        let chunks: Vec<ChunkReport> = reports.into_iter().map(|(_, r)| r).collect();
        let peak_sessions = ctx.gauge.peak();

        let Some(snapshot) = ctx.first.get().cloned() else {
            return Err(Error::NoChunkCompleted { chunks });
        };

        let report = LoadReport {
            snapshot,
            chunks,
            peak_sessions,
        };
        tracing::info!(
            completed = report.completed(),
            failed = report.failed(),
            peak_sessions,
            "dispatch finished"
        );
        Ok(report)
    }
}

struct WorkerCtx<P> {
    provider: Arc<P>,
    options: Arc<LoadOptions>,
    pause: PauseToken,
    sink: Option<MetricsFn>,
    gauge: Arc<ActiveSessions>,
    first: Arc<OnceLock<MetricsSnapshot>>,
}

impl<P> Clone for WorkerCtx<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            options: self.options.clone(),
            pause: self.pause.clone(),
            sink: self.sink.clone(),
            gauge: self.gauge.clone(),
            first: self.first.clone(),
        }
    }
}

impl<P: SessionProvider> WorkerCtx<P> {
    async fn run_chunk(&self, assignment: ChunkAssignment) -> ChunkReport {
        let key = assignment.key.to_string();
        let _active = self.gauge.enter();

        let result = self.type_chunk(assignment).await;
        match &result {
            Ok(snapshot) => {
                if self.first.set(snapshot.clone()).is_ok() {
                    tracing::debug!(chunk = %key, "representative snapshot taken");
                }
            }
            Err(err) => tracing::warn!(chunk = %key, error = %err, "chunk failed"),
        }

        ChunkReport { key, result }
    }

    async fn type_chunk(&self, assignment: ChunkAssignment) -> Result<MetricsSnapshot> {
        let mut driver = TypingDriver::new(assignment, &self.options, self.pause.clone())?;
        driver
            .connect(self.provider.as_ref(), &self.options.document)
            .await?;
        driver.run(self.sink.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_sessions_track_peak() {
        let gauge = Arc::new(ActiveSessions::default());

        let a = gauge.enter();
        let b = gauge.enter();
        assert_eq!(gauge.active(), 2);
        drop(a);
        let c = gauge.enter();
        assert_eq!(gauge.active(), 2);
        assert_eq!(gauge.peak(), 2);

        drop(b);
        drop(c);
        assert_eq!(gauge.active(), 0);
        assert_eq!(gauge.peak(), 2);
    }

    #[test]
    fn load_report_counts_outcomes() {
        let report = LoadReport {
            snapshot: MetricsSnapshot::default(),
            chunks: vec![
                ChunkReport {
                    key: "p-0".to_string(),
                    result: Ok(MetricsSnapshot::default()),
                },
                ChunkReport {
                    key: "p-1".to_string(),
                    result: Err(Error::NotConnected("p-1".to_string())),
                },
            ],
            peak_sessions: 2,
        };
        assert_eq!(report.completed(), 1);
        assert_eq!(report.failed(), 1);
    }
}
