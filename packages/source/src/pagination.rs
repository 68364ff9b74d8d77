//! Bounded pagination loop.
//!
//! [`fetch_all`] walks an offset-paginated [`PageSource`] until the source
//! runs dry, a page fails, or the record cap is reached. Failures never
//! propagate: whatever was fetched before the failure is kept.

use std::future::Future;
use std::sync::Arc;

use air_quality_station_models::RawApiRecord;

use crate::progress::ProgressCallback;
use crate::{FetchOptions, SourceError};

/// One decoded page of upstream rows.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    /// Rows on this page.
    pub records: Vec<RawApiRecord>,
    /// Total rows available upstream, when the API reports it.
    pub total: Option<u64>,
}

/// An offset-paginated source of raw station rows.
pub trait PageSource: Send + Sync {
    /// Label used in log messages.
    fn label(&self) -> &str;

    /// Rows requested per page.
    fn page_size(&self) -> u64;

    /// Fetches the page starting at `offset`.
    ///
    /// Returns `Ok(None)` when the response has no record array, which
    /// callers treat as end-of-data.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on transport or decode failures.
    fn fetch_page(
        &self,
        offset: u64,
    ) -> impl Future<Output = Result<Option<RecordPage>, SourceError>> + Send;
}

/// Result of a pagination run.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Ingested rows, never more than the configured cap.
    pub records: Vec<RawApiRecord>,
    /// Rows received from upstream, including any dropped by the cap.
    pub rows_received: u64,
    /// Pages that returned rows.
    pub pages: u32,
}

/// Fetches pages from `source` until exhausted or `options.max_records`
/// rows have been ingested.
///
/// Stops on the first failed page, a response without records, an empty
/// page, or a short page. Sleeps `options.page_delay` between requests.
pub async fn fetch_all(
    source: &impl PageSource,
    options: &FetchOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> FetchOutcome {
    let label = source.label();
    let page_size = source.page_size();
    let cap = usize::try_from(options.max_records).unwrap_or(usize::MAX);

    let mut outcome = FetchOutcome::default();
    let mut offset: u64 = 0;

    log::info!("[{label}] Starting fetch (page size {page_size}, cap {cap} records)");

    while outcome.records.len() < cap {
        if offset > 0 && !options.page_delay.is_zero() {
            tokio::time::sleep(options.page_delay).await;
        }

        log::info!("[{label}] Fetching data from offset {offset}, limit {page_size}");

        let page = match source.fetch_page(offset).await {
            Ok(Some(page)) => page,
            Ok(None) => {
                log::warn!("[{label}] No 'records' field in response at offset {offset}");
                break;
            }
            Err(e) => {
                log::error!("[{label}] Fetch failed at offset {offset}: {e}");
                break;
            }
        };

        if let Some(total) = page.total {
            progress.set_total(total.min(options.max_records));
        }

        let count = page.records.len();
        if count == 0 {
            log::info!("[{label}] No more records available");
            break;
        }

        outcome.rows_received += count as u64;
        outcome.pages += 1;

        let room = cap - outcome.records.len();
        let taken = count.min(room);
        outcome.records.extend(page.records.into_iter().take(taken));
        progress.inc(taken as u64);

        log::info!(
            "[{label}] Fetched {count} records, total: {}",
            outcome.records.len()
        );

        if (count as u64) < page_size {
            break;
        }
        offset += page_size;
    }

    if outcome.records.len() >= cap {
        log::info!("[{label}] Reached limit of {cap} records");
    }

    outcome
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::progress::null_progress;

    /// Serves canned pages and records every requested offset.
    struct FakeSource {
        page_size: u64,
        pages: Vec<Result<Option<RecordPage>, String>>,
        offsets: Mutex<Vec<u64>>,
    }

    impl FakeSource {
        fn new(page_size: u64, pages: Vec<Result<Option<RecordPage>, String>>) -> Self {
            Self {
                page_size,
                pages,
                offsets: Mutex::new(Vec::new()),
            }
        }

        fn offsets(&self) -> Vec<u64> {
            self.offsets.lock().unwrap().clone()
        }
    }

    impl PageSource for FakeSource {
        fn label(&self) -> &'static str {
            "fake"
        }

        fn page_size(&self) -> u64 {
            self.page_size
        }

        async fn fetch_page(&self, offset: u64) -> Result<Option<RecordPage>, SourceError> {
            self.offsets.lock().unwrap().push(offset);
            let index = usize::try_from(offset / self.page_size).unwrap();
            match self.pages.get(index) {
                Some(Ok(page)) => Ok(page.clone()),
                Some(Err(message)) => Err(SourceError::Config {
                    message: message.clone(),
                }),
                None => Ok(Some(RecordPage::default())),
            }
        }
    }

    fn page(stations: &[&str]) -> Result<Option<RecordPage>, String> {
        Ok(Some(RecordPage {
            records: stations
                .iter()
                .map(|s| RawApiRecord {
                    station: Some((*s).to_owned()),
                    ..RawApiRecord::default()
                })
                .collect(),
            total: None,
        }))
    }

    fn options(max_records: u64) -> FetchOptions {
        FetchOptions {
            max_records,
            page_delay: Duration::ZERO,
        }
    }

    fn stations(outcome: &FetchOutcome) -> Vec<&str> {
        outcome
            .records
            .iter()
            .filter_map(|r| r.station.as_deref())
            .collect()
    }

    #[tokio::test]
    async fn cap_stops_mid_page() {
        let source = FakeSource::new(
            2,
            vec![page(&["a", "b"]), page(&["c", "d"]), page(&["e", "f"])],
        );

        let outcome = fetch_all(&source, &options(3), &null_progress()).await;

        assert_eq!(stations(&outcome), ["a", "b", "c"]);
        assert_eq!(outcome.rows_received, 4);
        assert_eq!(outcome.pages, 2);
        assert_eq!(source.offsets(), [0, 2]);
    }

    #[tokio::test]
    async fn short_page_ends_pagination() {
        let source = FakeSource::new(2, vec![page(&["a", "b"]), page(&["c"]), page(&["x"])]);

        let outcome = fetch_all(&source, &options(100), &null_progress()).await;

        assert_eq!(stations(&outcome), ["a", "b", "c"]);
        assert_eq!(source.offsets(), [0, 2]);
    }

    #[tokio::test]
    async fn empty_page_ends_pagination() {
        let source = FakeSource::new(2, vec![page(&["a", "b"]), page(&[])]);

        let outcome = fetch_all(&source, &options(100), &null_progress()).await;

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.pages, 1);
    }

    #[tokio::test]
    async fn failed_page_keeps_earlier_pages() {
        let source = FakeSource::new(
            2,
            vec![
                page(&["a", "b"]),
                Err("connection reset".to_owned()),
                page(&["c", "d"]),
            ],
        );

        let outcome = fetch_all(&source, &options(100), &null_progress()).await;

        assert_eq!(stations(&outcome), ["a", "b"]);
        assert_eq!(source.offsets(), [0, 2]);
    }

    #[tokio::test]
    async fn missing_records_field_is_end_of_data() {
        let source = FakeSource::new(2, vec![Ok(None), page(&["a", "b"])]);

        let outcome = fetch_all(&source, &options(100), &null_progress()).await;

        assert!(outcome.records.is_empty());
        assert_eq!(source.offsets(), [0]);
    }

    #[tokio::test]
    async fn zero_cap_fetches_nothing() {
        let source = FakeSource::new(2, vec![page(&["a", "b"])]);

        let outcome = fetch_all(&source, &options(0), &null_progress()).await;

        assert!(outcome.records.is_empty());
        assert!(source.offsets().is_empty());
    }

    #[tokio::test]
    async fn ingestion_never_exceeds_cap() {
        for cap in 0..10u64 {
            let source = FakeSource::new(
                3,
                vec![
                    page(&["a", "b", "c"]),
                    page(&["d", "e", "f"]),
                    page(&["g", "h", "i"]),
                ],
            );
            let outcome = fetch_all(&source, &options(cap), &null_progress()).await;
            assert_eq!(outcome.records.len() as u64, cap.min(9));
            assert!(outcome.rows_received < cap.max(1) + 3);
        }
    }
}
