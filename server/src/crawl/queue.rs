//! Single-slot serialized crawl job queue (spec §4.7, §5 "single-flight
//! globally").
//!
//! Grounded in the teacher's `ReviewManager`: an `mpsc` job channel feeding
//! a background task, a dedup/lookup set guarded by a lock, and listeners
//! attached by job id. Two deliberate divergences from that template:
//! exactly one worker (not a pool — the engine process is not safe to run
//! concurrently), and no delete endpoint (spec §3 "never deleted by the
//! core").

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex, RwLock};

use engine::EngineDriver;

use super::client::SourceClient;
use super::pipeline::{run_crawl, PipelineError};
use super::{CrawlEvent, CrawlPayload};
use crate::persistence::sqlite::QuizStore;

const EVENT_CHANNEL_CAPACITY: usize = 64;

struct QueuedJob {
    id: String,
    payload: CrawlPayload,
}

struct JobHandle {
    events: broadcast::Sender<CrawlEvent>,
    latest: Mutex<CrawlEvent>,
}

/// Owns the one crawl-and-analyze pipeline for the whole process (spec §9
/// "Global mutable state": "one crawl queue and one per-user storage
/// gateway... created at process start, destroyed at shutdown").
pub struct CrawlQueue {
    job_tx: mpsc::Sender<QueuedJob>,
    jobs: Arc<RwLock<HashMap<String, Arc<JobHandle>>>>,
    order: Arc<Mutex<VecDeque<String>>>,
    running: Arc<Mutex<Option<String>>>,
    /// Kept alive so the channel stays open for the lifetime of the queue.
    _job_rx: Arc<Mutex<mpsc::Receiver<QueuedJob>>>,
}

impl CrawlQueue {
    pub fn new(
        store: Arc<QuizStore>,
        driver: Arc<EngineDriver>,
        source_base_url: String,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<QueuedJob>(64);
        let jobs: Arc<RwLock<HashMap<String, Arc<JobHandle>>>> = Arc::new(RwLock::new(HashMap::new()));
        let order = Arc::new(Mutex::new(VecDeque::new()));
        let running = Arc::new(Mutex::new(None));
        let shared_rx = Arc::new(Mutex::new(job_rx));

        {
            let jobs = jobs.clone();
            let order = order.clone();
            let running = running.clone();
            let rx = shared_rx.clone();
            tokio::spawn(async move {
                run_worker(rx, jobs, order, running, store, driver, source_base_url).await;
            });
        }

        tracing::info!("crawl queue initialized");

        Self {
            job_tx,
            jobs,
            order,
            running,
            _job_rx: shared_rx,
        }
    }

    /// Append a job to the queue, returning its id and the number of jobs
    /// ahead of it (spec §4.7 "Discipline").
    pub async fn enqueue(&self, payload: CrawlPayload) -> (String, usize) {
        let id = uuid::Uuid::new_v4().to_string();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let mut order = self.order.lock().await;
        order.push_back(id.clone());
        let ahead_count = order.len() - 1 + if self.running.lock().await.is_some() { 1 } else { 0 };
        drop(order);

        let handle = Arc::new(JobHandle {
            events,
            latest: Mutex::new(CrawlEvent::Queue { ahead_count }),
        });
        self.jobs.write().await.insert(id.clone(), handle);

        tracing::info!(job_id = %id, ahead_count, "crawl job enqueued");
        let _ = self.job_tx.send(QueuedJob { id: id.clone(), payload }).await;
        (id, ahead_count)
    }

    /// Subscribe to a job's events. Returns the current state synchronously
    /// plus a receiver for subsequent events (spec §4.7 "Listener attach").
    pub async fn attach(&self, job_id: &str) -> Option<(CrawlEvent, broadcast::Receiver<CrawlEvent>)> {
        let jobs = self.jobs.read().await;
        let handle = jobs.get(job_id)?;
        let latest = handle.latest.lock().await.clone();
        Some((latest, handle.events.subscribe()))
    }

    /// Poll the current state without holding a stream open (spec §11
    /// "Job status polling endpoint").
    pub async fn status(&self, job_id: &str) -> Option<CrawlEvent> {
        let jobs = self.jobs.read().await;
        let handle = jobs.get(job_id)?;
        Some(handle.latest.lock().await.clone())
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_worker(
    rx: Arc<Mutex<mpsc::Receiver<QueuedJob>>>,
    jobs: Arc<RwLock<HashMap<String, Arc<JobHandle>>>>,
    order: Arc<Mutex<VecDeque<String>>>,
    running: Arc<Mutex<Option<String>>>,
    store: Arc<QuizStore>,
    driver: Arc<EngineDriver>,
    source_base_url: String,
) {
    loop {
        let job = {
            let mut rx = rx.lock().await;
            match rx.recv().await {
                Some(job) => job,
                None => return,
            }
        };

        {
            let mut order_guard = order.lock().await;
            if order_guard.front() == Some(&job.id) {
                order_guard.pop_front();
            } else {
                order_guard.retain(|id| id != &job.id);
            }
            *running.lock().await = Some(job.id.clone());
        }
        broadcast_ahead_counts(&jobs, &order, &running).await;

        tracing::info!(job_id = %job.id, "crawl job starting");

        let jobs_for_progress = jobs.clone();
        let job_id = job.id.clone();
        let on_progress = move |event: CrawlEvent| {
            let jobs = jobs_for_progress.clone();
            let job_id = job_id.clone();
            tokio::spawn(async move {
                publish(&jobs, &job_id, event).await;
            });
        };

        let result = match SourceClient::new(source_base_url.clone()) {
            Ok(client) => {
                run_crawl(
                    &store,
                    &driver,
                    &client,
                    &job.payload.storage_key,
                    &job.payload.credentials,
                    &job.payload.credentials.username,
                    job.payload.days,
                    crate::config::get_default_threshold(),
                    on_progress,
                )
                .await
            }
            Err(err) => Err(PipelineError::Login(err)),
        };

        let terminal = match result {
            Ok(summary) => CrawlEvent::Done {
                added: summary.added,
                total: summary.total,
                matches_total: summary.matches_total,
            },
            Err(err) => {
                tracing::warn!(job_id = %job.id, error = %err, "crawl job failed");
                CrawlEvent::Error {
                    error: err.to_string(),
                }
            }
        };
        publish(&jobs, &job.id, terminal).await;

        *running.lock().await = None;
        broadcast_ahead_counts(&jobs, &order, &running).await;
    }
}

async fn publish(jobs: &Arc<RwLock<HashMap<String, Arc<JobHandle>>>>, job_id: &str, event: CrawlEvent) {
    let jobs = jobs.read().await;
    if let Some(handle) = jobs.get(job_id) {
        *handle.latest.lock().await = event.clone();
        let _ = handle.events.send(event);
    }
}

async fn broadcast_ahead_counts(
    jobs: &Arc<RwLock<HashMap<String, Arc<JobHandle>>>>,
    order: &Arc<Mutex<VecDeque<String>>>,
    running: &Arc<Mutex<Option<String>>>,
) {
    let order = order.lock().await;
    let running_offset = if running.lock().await.is_some() { 1 } else { 0 };
    let jobs = jobs.read().await;
    for (i, id) in order.iter().enumerate() {
        if let Some(handle) = jobs.get(id) {
            let event = CrawlEvent::Queue {
                ahead_count: i + running_offset,
            };
            *handle.latest.lock().await = event.clone();
            let _ = handle.events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::SourceCredentials;
    use crate::persistence::sqlite::Database;
    use engine::EngineConfig;

    async fn test_queue() -> CrawlQueue {
        let db = Database::new_in_memory().await.unwrap();
        let store = Arc::new(QuizStore::new(db.pool().clone()));
        let driver = Arc::new(EngineDriver::new(EngineConfig::unconfigured()));
        CrawlQueue::new(store, driver, "https://example.invalid".to_string())
    }

    fn payload(storage_key: &str) -> CrawlPayload {
        CrawlPayload {
            storage_key: storage_key.to_string(),
            credentials: SourceCredentials {
                username: storage_key.to_string(),
                password: "secret".to_string(),
            },
            days: 7,
        }
    }

    #[tokio::test]
    async fn first_job_has_zero_ahead_count() {
        let queue = test_queue().await;
        let (_, ahead) = queue.enqueue(payload("gary")).await;
        assert_eq!(ahead, 0);
    }

    #[tokio::test]
    async fn attach_replays_current_state_synchronously() {
        let queue = test_queue().await;
        let (id, _) = queue.enqueue(payload("gary")).await;
        let (state, _rx) = queue.attach(&id).await.expect("job should exist");
        assert!(matches!(state, CrawlEvent::Queue { .. } | CrawlEvent::Done { .. } | CrawlEvent::Error { .. }));
    }

    #[tokio::test]
    async fn unknown_job_id_has_no_status() {
        let queue = test_queue().await;
        assert!(queue.status("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn job_eventually_reaches_a_terminal_state() {
        let queue = test_queue().await;
        let (id, _) = queue.enqueue(payload("gary")).await;
        let (_, mut rx) = queue.attach(&id).await.unwrap();
        loop {
            let event = rx.recv().await.expect("queue task should not drop without a terminal event");
            if event.is_terminal() {
                break;
            }
        }
    }
}
