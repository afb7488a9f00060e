use std::sync::Arc;
use std::time::Duration;

use talkbot_phrase::PhraseError;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::types::{PhraseSink, PhraseSource};

/// Counters reported when the scheduler stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub attempts: u64,
    pub sent: u64,
    pub generation_failed: u64,
    pub send_failed: u64,
}

/// Generates and sends one phrase per interval until shut down.
pub struct PhraseScheduler<S: PhraseSink> {
    source: Arc<dyn PhraseSource>,
    sink: S,
    interval: Duration,
    word_count: usize,
}

impl<S: PhraseSink> PhraseScheduler<S> {
    pub fn new(
        source: Arc<dyn PhraseSource>,
        sink: S,
        interval: Duration,
        word_count: usize,
    ) -> Self {
        Self {
            source,
            sink,
            interval,
            word_count,
        }
    }

    /// Main loop. Runs until `shutdown` broadcasts `true` or its sender is dropped.
    ///
    /// The signal is only observed while sleeping between cycles.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> SchedulerStats {
        info!(
            interval_secs = self.interval.as_secs(),
            word_count = self.word_count,
            "phrase scheduler started"
        );
        let mut stats = SchedulerStats::default();

        while !*shutdown.borrow() {
            self.tick(&mut stats).await;

            let sleep = tokio::time::sleep(self.interval);
            tokio::pin!(sleep);
            let stop = loop {
                tokio::select! {
                    _ = &mut sleep => break false,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break true;
                        }
                    }
                }
            };
            if stop {
                break;
            }
        }

        info!(
            attempts = stats.attempts,
            sent = stats.sent,
            "phrase scheduler shutting down"
        );
        stats
    }

    /// One generate-and-send cycle. Never fails; problems are logged.
    async fn tick(&self, stats: &mut SchedulerStats) {
        stats.attempts += 1;

        let phrase = match self.source.generate(self.word_count) {
            Ok(p) => p,
            Err(PhraseError::InsufficientData { reason }) => {
                warn!(%reason, "not enough data for a phrase, retrying next cycle");
                stats.generation_failed += 1;
                return;
            }
            Err(e) => {
                error!(error = %e, "phrase generation failed, retrying next cycle");
                stats.generation_failed += 1;
                return;
            }
        };

        match self.sink.send(phrase).await {
            Ok(()) => stats.sent += 1,
            Err(e) => {
                warn!(error = %e, "phrase delivery failed");
                stats.send_failed += 1;
            }
        }
    }
}
