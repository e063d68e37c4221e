use std::{
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};

use {
    pagekeeper_channels::{Event, EventFetcher, EventProcessor},
    tokio::task::JoinSet,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

#[cfg(feature = "metrics")]
use {
    pagekeeper_metrics::{consumer as consumer_metrics, counter, gauge, histogram},
    std::time::Instant,
};

use crate::ConsumerConfig;

/// Long-running fetch and dispatch loop.
///
/// Every event of a batch runs in its own task; the next fetch starts only
/// after all of them finished. A failed event is logged and dropped, it is
/// never fetched again.
pub struct Consumer {
    fetcher: Arc<dyn EventFetcher>,
    processor: Arc<dyn EventProcessor>,
    config: ConsumerConfig,
    cursor: AtomicI64,
}

impl Consumer {
    pub fn new(
        fetcher: Arc<dyn EventFetcher>,
        processor: Arc<dyn EventProcessor>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            fetcher,
            processor,
            config,
            cursor: AtomicI64::new(0),
        }
    }

    /// Offset the next fetch will use.
    #[must_use]
    pub fn cursor(&self) -> i64 {
        self.cursor.load(Ordering::Acquire)
    }

    /// Run until `cancel` fires. A batch already being processed is finished
    /// first; a pending fetch or sleep is abandoned.
    pub async fn run(&self, cancel: CancellationToken) {
        let limit = self
            .config
            .batch_size
            .clamp(1, self.fetcher.max_batch_size().max(1));
        let backoff = self.config.fetch_backoff;
        let mut retry_delay = Duration::ZERO;

        info!(
            batch_size = limit,
            idle_interval_ms = self.config.idle_interval.as_millis() as u64,
            "consumer started"
        );

        while !cancel.is_cancelled() {
            let offset = self.cursor();
            let fetched = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                fetched = self.fetcher.fetch(offset, limit) => fetched,
            };

            let events = match fetched {
                Ok(events) => {
                    retry_delay = Duration::ZERO;
                    events
                },
                Err(e) => {
                    retry_delay = backoff.next(retry_delay);
                    warn!(
                        offset,
                        error = %e,
                        retry_in_ms = retry_delay.as_millis() as u64,
                        "consumer fetch failed"
                    );
                    #[cfg(feature = "metrics")]
                    counter!(consumer_metrics::FETCH_ERRORS_TOTAL).increment(1);

                    if !sleep_or_cancel(&cancel, retry_delay).await {
                        break;
                    }
                    continue;
                },
            };

            if events.is_empty() {
                if !sleep_or_cancel(&cancel, self.config.idle_interval).await {
                    break;
                }
                continue;
            }

            self.handle_batch(events).await;
        }

        info!(cursor = self.cursor(), "consumer stopped");
    }

    async fn handle_batch(&self, events: Vec<Event>) {
        let Some(last_id) = events.last().map(|e| e.id) else {
            return;
        };
        debug!(count = events.len(), last_id, "dispatching batch");

        #[cfg(feature = "metrics")]
        let started = Instant::now();
        #[cfg(feature = "metrics")]
        counter!(consumer_metrics::EVENTS_FETCHED_TOTAL).increment(events.len() as u64);

        let mut tasks = JoinSet::new();
        for event in events {
            let processor = Arc::clone(&self.processor);
            tasks.spawn(async move {
                let id = event.id;
                let session_id = event.session_id();
                (id, session_id, processor.process(event).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, _, Ok(()))) => {
                    #[cfg(feature = "metrics")]
                    counter!(consumer_metrics::EVENTS_PROCESSED_TOTAL).increment(1);
                },
                Ok((event_id, session_id, Err(e))) => {
                    error!(event_id, ?session_id, error = %e, "can't handle event");
                    #[cfg(feature = "metrics")]
                    counter!(consumer_metrics::EVENTS_FAILED_TOTAL).increment(1);
                },
                Err(e) => {
                    error!("event task crashed: {e}");
                    #[cfg(feature = "metrics")]
                    counter!(consumer_metrics::EVENTS_FAILED_TOTAL).increment(1);
                },
            }
        }

        self.advance(last_id.saturating_add(1));

        #[cfg(feature = "metrics")]
        {
            histogram!(consumer_metrics::BATCH_DURATION_SECONDS)
                .record(started.elapsed().as_secs_f64());
            gauge!(consumer_metrics::CURSOR).set(self.cursor() as f64);
        }
    }

    /// Move the cursor forward; it never goes back.
    fn advance(&self, next: i64) {
        let previous = self.cursor.fetch_max(next, Ordering::AcqRel);
        if next < previous {
            warn!(previous, next, "batch ended behind the cursor, keeping it");
        }
    }
}

/// Sleep for `duration` unless cancelled first. Returns false on cancel.
async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    if duration.is_zero() {
        tokio::task::yield_now().await;
        return !cancel.is_cancelled();
    }
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{
        collections::{HashSet, VecDeque},
        sync::Mutex,
    };

    use {
        super::*,
        crate::Backoff,
        async_trait::async_trait,
        pagekeeper_channels::Error as ChannelError,
        rstest::rstest,
        tokio::sync::Notify,
    };

    type Step = pagekeeper_channels::Result<Vec<Event>>;

    /// Serves a fixed script of fetch results, then cancels the consumer.
    struct ScriptedFetcher {
        script: Mutex<VecDeque<Step>>,
        calls: Mutex<Vec<(i64, usize)>>,
        done: CancellationToken,
        max_batch: usize,
        /// Ids the processor finished, shared with it.
        completed: Arc<Mutex<Vec<i64>>>,
        /// How many ids were finished at the moment of each fetch.
        completed_at_fetch: Mutex<Vec<usize>>,
    }

    impl ScriptedFetcher {
        fn new(steps: Vec<Step>, done: CancellationToken) -> Self {
            Self {
                script: Mutex::new(steps.into()),
                calls: Mutex::new(Vec::new()),
                done,
                max_batch: 100,
                completed: Arc::new(Mutex::new(Vec::new())),
                completed_at_fetch: Mutex::new(Vec::new()),
            }
        }

        fn offsets(&self) -> Vec<i64> {
            self.calls.lock().unwrap().iter().map(|(o, _)| *o).collect()
        }
    }

    #[async_trait]
    impl EventFetcher for ScriptedFetcher {
        async fn fetch(&self, offset: i64, limit: usize) -> Step {
            self.calls.lock().unwrap().push((offset, limit));
            self.completed_at_fetch
                .lock()
                .unwrap()
                .push(self.completed.lock().unwrap().len());
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(step) => step,
                None => {
                    self.done.cancel();
                    Ok(Vec::new())
                },
            }
        }

        fn max_batch_size(&self) -> usize {
            self.max_batch
        }
    }

    /// Records handled ids. Ids in `fail` return an error, ids in `panic`
    /// panic; ids in `slow` take a while.
    #[derive(Default)]
    struct RecordingProcessor {
        completed: Arc<Mutex<Vec<i64>>>,
        fail: HashSet<i64>,
        panic: HashSet<i64>,
        slow: HashSet<i64>,
    }

    #[async_trait]
    impl EventProcessor for RecordingProcessor {
        async fn process(&self, event: Event) -> anyhow::Result<()> {
            if self.slow.contains(&event.id) {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            if self.panic.contains(&event.id) {
                panic!("boom on {}", event.id);
            }
            self.completed.lock().unwrap().push(event.id);
            if self.fail.contains(&event.id) {
                anyhow::bail!("can't handle {}", event.id);
            }
            Ok(())
        }
    }

    fn quick_config() -> ConsumerConfig {
        ConsumerConfig {
            batch_size: 100,
            idle_interval: Duration::from_millis(1),
            fetch_backoff: Backoff {
                initial: Duration::from_millis(1),
                max: Duration::from_millis(4),
            },
        }
    }

    fn batch(ids: &[i64]) -> Step {
        Ok(ids
            .iter()
            .map(|&id| Event::message(id, id, "alice", "/help"))
            .collect())
    }

    fn fetch_error() -> Step {
        Err(ChannelError::external(
            "getUpdates",
            std::io::Error::other("connection reset"),
        ))
    }

    async fn run_script(
        steps: Vec<Step>,
        processor: RecordingProcessor,
        config: ConsumerConfig,
    ) -> (Arc<ScriptedFetcher>, Arc<Mutex<Vec<i64>>>, i64) {
        let cancel = CancellationToken::new();
        let mut fetcher = ScriptedFetcher::new(steps, cancel.clone());
        fetcher.completed = Arc::clone(&processor.completed);
        let fetcher = Arc::new(fetcher);
        let completed = Arc::clone(&processor.completed);

        let consumer = Consumer::new(
            Arc::clone(&fetcher) as Arc<dyn EventFetcher>,
            Arc::new(processor),
            config,
        );
        tokio::time::timeout(Duration::from_secs(5), consumer.run(cancel))
            .await
            .expect("consumer did not stop");
        (fetcher, completed, consumer.cursor())
    }

    #[tokio::test]
    async fn cursor_follows_last_event() {
        let (fetcher, completed, cursor) = run_script(
            vec![batch(&[1, 2, 3]), batch(&[4]), batch(&[10, 11])],
            RecordingProcessor::default(),
            quick_config(),
        )
        .await;

        assert_eq!(fetcher.offsets(), vec![0, 4, 5, 12]);
        assert_eq!(cursor, 12);
        let mut done = completed.lock().unwrap().clone();
        done.sort_unstable();
        assert_eq!(done, vec![1, 2, 3, 4, 10, 11]);
    }

    #[tokio::test]
    async fn empty_batch_keeps_cursor() {
        let (fetcher, _, cursor) = run_script(
            vec![batch(&[]), batch(&[7]), batch(&[]), batch(&[])],
            RecordingProcessor::default(),
            quick_config(),
        )
        .await;

        assert_eq!(fetcher.offsets(), vec![0, 0, 8, 8, 8]);
        assert_eq!(cursor, 8);
    }

    #[tokio::test]
    async fn fetch_errors_retry_at_same_cursor() {
        let (fetcher, completed, cursor) = run_script(
            vec![
                batch(&[1]),
                fetch_error(),
                fetch_error(),
                fetch_error(),
                batch(&[2]),
            ],
            RecordingProcessor::default(),
            quick_config(),
        )
        .await;

        assert_eq!(fetcher.offsets(), vec![0, 2, 2, 2, 2, 3]);
        assert_eq!(cursor, 3);
        assert_eq!(completed.lock().unwrap().len(), 2);
    }

    #[rstest]
    #[case::zero_backoff(Duration::ZERO)]
    #[case::small_backoff(Duration::from_millis(2))]
    #[tokio::test]
    async fn fetch_errors_never_process_events(#[case] initial: Duration) {
        let mut config = quick_config();
        config.fetch_backoff.initial = initial;
        let (fetcher, completed, cursor) = run_script(
            vec![fetch_error(), fetch_error()],
            RecordingProcessor::default(),
            config,
        )
        .await;

        assert_eq!(fetcher.offsets(), vec![0, 0, 0]);
        assert_eq!(cursor, 0);
        assert!(completed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_events_are_dropped() {
        let processor = RecordingProcessor {
            fail: HashSet::from([2]),
            ..Default::default()
        };
        let (fetcher, completed, cursor) =
            run_script(vec![batch(&[1, 2, 3])], processor, quick_config()).await;

        assert_eq!(fetcher.offsets(), vec![0, 4]);
        assert_eq!(cursor, 4);
        // Event 2 ran once and was not redelivered.
        assert_eq!(
            completed.lock().unwrap().iter().filter(|&&id| id == 2).count(),
            1
        );
    }

    #[tokio::test]
    async fn panicking_event_does_not_stop_the_loop() {
        let processor = RecordingProcessor {
            panic: HashSet::from([5]),
            ..Default::default()
        };
        let (fetcher, completed, cursor) = run_script(
            vec![batch(&[4, 5, 6]), batch(&[7])],
            processor,
            quick_config(),
        )
        .await;

        assert_eq!(fetcher.offsets(), vec![0, 7, 8]);
        assert_eq!(cursor, 8);
        let mut done = completed.lock().unwrap().clone();
        done.sort_unstable();
        assert_eq!(done, vec![4, 6, 7]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn next_fetch_waits_for_whole_batch() {
        let processor = RecordingProcessor {
            slow: HashSet::from([1, 3]),
            ..Default::default()
        };
        let (fetcher, _, _) = run_script(
            vec![batch(&[1, 2, 3]), batch(&[4, 5])],
            processor,
            quick_config(),
        )
        .await;

        assert_eq!(*fetcher.completed_at_fetch.lock().unwrap(), vec![0, 3, 5]);
    }

    #[tokio::test]
    async fn batch_size_is_clamped_to_fetcher_limit() {
        let cancel = CancellationToken::new();
        let mut fetcher = ScriptedFetcher::new(vec![batch(&[1])], cancel.clone());
        fetcher.max_batch = 10;
        let fetcher = Arc::new(fetcher);
        let mut config = quick_config();
        config.batch_size = 500;

        let consumer = Consumer::new(
            Arc::clone(&fetcher) as Arc<dyn EventFetcher>,
            Arc::new(RecordingProcessor::default()),
            config,
        );
        consumer.run(cancel).await;

        let calls = fetcher.calls.lock().unwrap();
        assert!(calls.iter().all(|(_, limit)| *limit == 10));
    }

    /// Event 1 only finishes once event 2 has started, so a sequential
    /// dispatcher would hang.
    struct RendezvousProcessor {
        second_started: Notify,
    }

    #[async_trait]
    impl EventProcessor for RendezvousProcessor {
        async fn process(&self, event: Event) -> anyhow::Result<()> {
            match event.id {
                1 => self.second_started.notified().await,
                _ => self.second_started.notify_one(),
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn batch_events_run_concurrently() {
        let cancel = CancellationToken::new();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![batch(&[1, 2])], cancel.clone()));
        let consumer = Consumer::new(
            Arc::clone(&fetcher) as Arc<dyn EventFetcher>,
            Arc::new(RendezvousProcessor {
                second_started: Notify::new(),
            }),
            quick_config(),
        );

        tokio::time::timeout(Duration::from_secs(5), consumer.run(cancel))
            .await
            .expect("batch events were not processed concurrently");
        assert_eq!(consumer.cursor(), 3);
    }

    /// Never returns from `fetch`.
    struct HangingFetcher;

    #[async_trait]
    impl EventFetcher for HangingFetcher {
        async fn fetch(&self, _offset: i64, _limit: usize) -> Step {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn cancel_interrupts_pending_fetch() {
        let cancel = CancellationToken::new();
        let consumer = Arc::new(Consumer::new(
            Arc::new(HangingFetcher),
            Arc::new(RecordingProcessor::default()),
            quick_config(),
        ));

        let handle = {
            let consumer = Arc::clone(&consumer);
            let cancel = cancel.clone();
            tokio::spawn(async move { consumer.run(cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("consumer ignored cancellation")
            .unwrap();
        assert_eq!(consumer.cursor(), 0);
    }

    #[tokio::test]
    async fn cancelled_before_start_never_fetches() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![batch(&[1])], cancel.clone()));
        let consumer = Consumer::new(
            Arc::clone(&fetcher) as Arc<dyn EventFetcher>,
            Arc::new(RecordingProcessor::default()),
            quick_config(),
        );
        consumer.run(cancel).await;
        assert!(fetcher.offsets().is_empty());
    }

    #[test]
    fn advance_never_moves_back() {
        let consumer = Consumer::new(
            Arc::new(HangingFetcher),
            Arc::new(RecordingProcessor::default()),
            ConsumerConfig::default(),
        );
        consumer.advance(10);
        consumer.advance(4);
        assert_eq!(consumer.cursor(), 10);
        consumer.advance(11);
        assert_eq!(consumer.cursor(), 11);
    }
}
