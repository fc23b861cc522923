//! Fans one listing page's detail URLs out over a bounded set of browsing
//! contexts.

use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use crate::error::{ScrapeError, SessionError};
use crate::pipeline::{DetailOutcome, DetailPipeline};
use crate::session::{BrowserHandle, PageSession, SessionPool};
use crate::store::{ProductStore, UpsertOutcome};
use crate::translator::Translator;

/// Counts for one batch, or summed over many.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub inserted: usize,
    pub replaced: usize,
    pub skipped: usize,
    /// Pages without a name or id.
    pub dropped: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn stored(&self) -> usize {
        self.inserted + self.replaced
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.inserted += other.inserted;
        self.replaced += other.replaced;
        self.skipped += other.skipped;
        self.dropped += other.dropped;
        self.failed += other.failed;
    }

    fn record(&mut self, url: &str, result: Result<DetailOutcome, ScrapeError>) {
        match result {
            Ok(DetailOutcome::Stored { id, outcome }) => {
                match outcome {
                    UpsertOutcome::Inserted => self.inserted += 1,
                    UpsertOutcome::Replaced => self.replaced += 1,
                }
                info!("Stored {} ({:?}) from {}", id, outcome, url);
            }
            Ok(DetailOutcome::Skipped { .. }) => self.skipped += 1,
            Err(ScrapeError::MissingRequiredField { url, field }) => {
                self.dropped += 1;
                info!("Dropped {}: no {}", url, field);
            }
            Err(e @ ScrapeError::NavigationTimeout { .. }) => {
                self.failed += 1;
                warn!("{}", e);
            }
            Err(e) => {
                self.failed += 1;
                error!("Failed {}: {}", url, e);
            }
        }
    }
}

pub struct Coordinator {
    workers: usize,
}

impl Coordinator {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Process every URL once, at most `workers` at a time.
    ///
    /// Contexts are opened for this batch and closed once every unit has
    /// finished. A failing unit only counts against the report.
    pub async fn run_batch<B, St, T>(
        &self,
        browser: &B,
        pipeline: &DetailPipeline<St, T>,
        urls: &[String],
    ) -> BatchReport
    where
        B: BrowserHandle,
        St: ProductStore,
        T: Translator,
    {
        let mut report = BatchReport::default();
        if urls.is_empty() {
            return report;
        }

        let wanted = self.workers.min(urls.len());
        let mut sessions = Vec::with_capacity(wanted);
        for _ in 0..wanted {
            match browser.open_context().await {
                Ok(session) => sessions.push(session),
                Err(e) => warn!("Could not open browsing context: {}", e),
            }
        }
        if sessions.is_empty() {
            error!("No browsing context available, {} products not processed", urls.len());
            report.failed = urls.len();
            return report;
        }

        let width = sessions.len();
        let pool = SessionPool::new(sessions);
        let pool_ref = &pool;

        let results: Vec<(&String, Result<DetailOutcome, ScrapeError>)> = stream::iter(urls)
            .map(|url| async move {
                let Some(mut lease) = pool_ref.checkout().await else {
                    return (url, Err(ScrapeError::Session(SessionError::Browser("session pool closed".to_string()))));
                };
                let result = pipeline.process(&mut lease.session, url).await;
                pool_ref.checkin(lease);
                (url, result)
            })
            .buffer_unordered(width)
            .collect()
            .await;

        for (url, result) in results {
            report.record(url, result);
        }

        for session in pool.into_sessions() {
            if let Err(e) = session.close().await {
                warn!("Failed to close browsing context: {}", e);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RequiredField, StoreError};

    #[test]
    fn test_report_counts_each_outcome() {
        let mut report = BatchReport::default();
        report.record(
            "u1",
            Ok(DetailOutcome::Stored {
                id: "1".to_string(),
                outcome: UpsertOutcome::Inserted,
            }),
        );
        report.record(
            "u2",
            Ok(DetailOutcome::Stored {
                id: "2".to_string(),
                outcome: UpsertOutcome::Replaced,
            }),
        );
        report.record("u3", Ok(DetailOutcome::Skipped { id: "3".to_string() }));
        report.record(
            "u4",
            Err(ScrapeError::MissingRequiredField {
                url: "u4".to_string(),
                field: RequiredField::Name,
            }),
        );
        report.record(
            "u5",
            Err(ScrapeError::StoreWrite {
                url: "u5".to_string(),
                id: "5".to_string(),
                source: StoreError::Other("down".to_string()),
            }),
        );

        assert_eq!(report.stored(), 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.replaced, 1);

        let mut sum = BatchReport::default();
        sum.merge(report);
        sum.merge(report);
        assert_eq!(sum.stored(), 4);
        assert_eq!(sum.failed, 2);
    }

    #[test]
    fn test_worker_count_is_at_least_one() {
        assert_eq!(Coordinator::new(0).workers, 1);
        assert_eq!(Coordinator::new(8).workers, 8);
    }
}
