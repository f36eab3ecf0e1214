use crate::config::Config;
use crate::error::EngineError;
use crate::exec::{Executor, Stage};
use crate::job::{ExecutionRequest, ExecutionResult};
use crate::lang::{LanguageProfile, LanguageRegistry};

use kodo_protocol::external::{ExecuteRequest, ExecuteResponse};
use kodo_sandbox::Isolator;
use kodo_utils::queue::{PushError, Queue};

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::{self, JoinHandle};
use tokio::time;
use tracing::{debug, error, info, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Compiling,
    Running,
    Completed,
    Aborted,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Aborted)
    }
}

impl From<Stage> for JobState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Compiling => JobState::Compiling,
            Stage::Running => JobState::Running,
        }
    }
}

/// Jobs per state. Terminal states are running totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counter {
    pub queued: u64,
    pub compiling: u64,
    pub running: u64,
    pub completed: u64,
    pub aborted: u64,
}

impl Counter {
    fn slot(&mut self, state: JobState) -> &mut u64 {
        match state {
            JobState::Queued => &mut self.queued,
            JobState::Compiling => &mut self.compiling,
            JobState::Running => &mut self.running,
            JobState::Completed => &mut self.completed,
            JobState::Aborted => &mut self.aborted,
        }
    }
}

struct Job {
    request: ExecutionRequest,
    profile: Arc<LanguageProfile>,
    queued_at: Instant,
    /// Set by whoever takes the job out of the queue first: a worker
    /// starting it, or the handle expiring it.
    claimed: Arc<AtomicBool>,
    reply: oneshot::Sender<ExecutionResult>,
}

struct Shared {
    executor: Executor,
    queue: Queue<Job>,
    queue_depth: usize,
    queue_timeout: Duration,
    states: DashMap<String, JobState>,
    counter: Mutex<Counter>,
}

/// Bounded FIFO queue in front of a fixed pool of workers.
///
/// Admission never blocks: a full queue rejects the request at once.
/// Dropping the [`JobHandle`] cancels the job, whether it is still queued
/// or already running.
pub struct Scheduler {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

pub struct JobHandle {
    request_id: String,
    rx: oneshot::Receiver<ExecutionResult>,
    queued_at: Instant,
    claimed: Arc<AtomicBool>,
    shared: Arc<Shared>,
}

impl JobHandle {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Waits for the result. A job that no worker picked up within the
    /// queue timeout is aborted at the deadline.
    pub async fn wait(mut self) -> ExecutionResult {
        let deadline = time::Instant::from_std(self.queued_at + self.shared.queue_timeout);
        let early = tokio::select! {
            res = &mut self.rx => Some(res),
            _ = time::sleep_until(deadline) => None,
        };
        if let Some(res) = early {
            return self.received(res);
        }

        if !self.claimed.swap(true, Ordering::AcqRel) {
            let err = EngineError::QueueTimeout {
                waited: self.queued_at.elapsed(),
                limit: self.shared.queue_timeout,
            };
            warn!(request_id = %self.request_id, %err, "job expired in the queue");
            self.shared.transition(&self.request_id, JobState::Aborted);
            return ExecutionResult::rejected(&self.request_id, &err);
        }

        // a worker has it, the run is bounded by its own limits
        let res = (&mut self.rx).await;
        self.received(res)
    }

    fn received(&self, res: Result<ExecutionResult, oneshot::error::RecvError>) -> ExecutionResult {
        match res {
            Ok(result) => result,
            Err(_) => {
                let err = EngineError::Internal(anyhow::anyhow!("job was dropped by its worker"));
                ExecutionResult::rejected(&self.request_id, &err)
            }
        }
    }
}

impl Scheduler {
    /// Must be called within a tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        let isolator = kodo_sandbox::build(&config.executor.isolator);
        Self::with_isolator(config, isolator)
    }

    pub fn with_isolator(config: Config, isolator: Arc<dyn Isolator>) -> Result<Self> {
        let registry = Arc::new(LanguageRegistry::from_config(&config)?);
        let workers = config.scheduler.workers;
        let queue_depth = config.scheduler.queue_depth;
        let queue_timeout = Duration::from_millis(config.scheduler.queue_timeout);

        let executor = Executor::new(Arc::new(config), registry, isolator)?;

        let shared = Arc::new(Shared {
            executor,
            queue: Queue::bounded(queue_depth),
            queue_depth,
            queue_timeout,
            states: DashMap::new(),
            counter: Mutex::new(Counter::default()),
        });

        let handles = (0..workers)
            .map(|worker_id| {
                let shared = shared.clone();
                task::spawn(async move { shared.worker_loop(worker_id).await })
            })
            .collect();

        info!(workers, queue_depth, ?queue_timeout, "scheduler is ready");

        Ok(Self {
            shared,
            workers: Mutex::new(handles),
        })
    }

    pub fn registry(&self) -> &LanguageRegistry {
        self.shared.executor.registry()
    }

    /// Validates and enqueues a request.
    pub fn submit(&self, request: ExecutionRequest) -> Result<JobHandle, EngineError> {
        let profile = self.shared.executor.validate(&request)?;
        let request_id = request.request_id.clone();

        match self.shared.states.entry(request_id.clone()) {
            Entry::Occupied(_) => return Err(EngineError::DuplicateRequest(request_id)),
            Entry::Vacant(entry) => {
                entry.insert(JobState::Queued);
            }
        }
        self.shared.count(|c| c.queued += 1);

        let (tx, rx) = oneshot::channel();
        let queued_at = Instant::now();
        let claimed = Arc::new(AtomicBool::new(false));
        let job = Job {
            request,
            profile,
            queued_at,
            claimed: claimed.clone(),
            reply: tx,
        };

        match self.shared.queue.try_push(job) {
            Ok(()) => {
                debug!(request_id = %request_id, "job queued");
                Ok(JobHandle {
                    request_id,
                    rx,
                    queued_at,
                    claimed,
                    shared: self.shared.clone(),
                })
            }
            Err(err) => {
                self.shared.states.remove(&request_id);
                self.shared.count(|c| c.queued -= 1);
                match err {
                    PushError::Full(_) => Err(EngineError::CapacityExceeded {
                        depth: self.shared.queue_depth,
                    }),
                    PushError::Closed(_) => Err(EngineError::ShuttingDown),
                }
            }
        }
    }

    /// Submits and waits. Rejections come back as results too.
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let request_id = request.request_id.clone();
        match self.submit(request) {
            Ok(handle) => handle.wait().await,
            Err(err) => {
                warn!(request_id = %request_id, %err, "request rejected");
                ExecutionResult::rejected(&request_id, &err)
            }
        }
    }

    /// Entry point for an untyped request body.
    pub async fn handle(&self, body: &Value) -> ExecuteResponse {
        match ExecuteRequest::from_value(body) {
            Ok(req) => self.execute(req.into()).await.to_response(),
            Err(err) => {
                let request_id = body.get("requestId").and_then(Value::as_str).unwrap_or("");
                let err = EngineError::InvalidInput(err.to_string());
                ExecutionResult::rejected(request_id, &err).to_response()
            }
        }
    }

    /// State of an in-flight job. Finished jobs are forgotten.
    pub fn state(&self, request_id: &str) -> Option<JobState> {
        self.shared.states.get(request_id).map(|s| *s)
    }

    pub fn stats(&self) -> Counter {
        self.shared.count(|c| c.clone())
    }

    /// Stops admission, lets the workers drain the queue, and waits for them.
    pub async fn shutdown(&self) {
        self.shared.queue.close();
        let handles = {
            let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            mem::take(&mut *workers)
        };
        info!(workers = handles.len(), "scheduler is shutting down");
        for joined in join_all(handles).await {
            if let Err(err) = joined {
                error!(%err, "worker panicked");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shared.queue.close();
    }
}

impl Shared {
    fn count<T>(&self, f: impl FnOnce(&mut Counter) -> T) -> T {
        let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *counter)
    }

    fn transition(&self, request_id: &str, next: JobState) {
        let prev = match self.states.get_mut(request_id) {
            Some(mut state) => mem::replace(&mut *state, next),
            None => return,
        };
        if next.is_terminal() {
            self.states.remove(request_id);
        }
        self.count(|c| {
            let slot = c.slot(prev);
            *slot = slot.saturating_sub(1);
            *c.slot(next) += 1;
        });
        debug!(request_id, ?prev, ?next, "job state changed");
    }

    async fn worker_loop(&self, worker_id: usize) {
        debug!(worker_id, "worker started");
        while let Some(job) = self.queue.pop().await {
            let span = tracing::info_span!(
                "job",
                request_id = %job.request.request_id,
                lang = %job.profile.id,
                worker_id,
            );
            self.process(job).instrument(span).await;
        }
        debug!(worker_id, "worker stopped");
    }

    async fn process(&self, mut job: Job) {
        let request_id = job.request.request_id.clone();

        if job.claimed.swap(true, Ordering::AcqRel) {
            debug!("job was expired by its handle, skipped");
            return;
        }

        if job.reply.is_closed() {
            warn!("caller went away while the job was queued");
            self.transition(&request_id, JobState::Aborted);
            return;
        }

        let waited = job.queued_at.elapsed();
        if waited > self.queue_timeout {
            let err = EngineError::QueueTimeout {
                waited,
                limit: self.queue_timeout,
            };
            warn!(?waited, "job expired in the queue");
            self.transition(&request_id, JobState::Aborted);
            let _ = job.reply.send(ExecutionResult::rejected(&request_id, &err));
            return;
        }

        let on_stage = |stage: Stage| self.transition(&request_id, stage.into());
        let t0 = Instant::now();

        let executed = tokio::select! {
            res = self.executor.exec(&job.request, &job.profile, &on_stage) => Some(res),
            _ = job.reply.closed() => None,
        };

        match executed {
            None => {
                warn!(elapsed = ?t0.elapsed(), "caller went away, job aborted");
                self.transition(&request_id, JobState::Aborted);
            }
            Some(Ok(result)) => {
                info!(status = ?result.status, elapsed = ?t0.elapsed(), "job finished");
                self.transition(&request_id, JobState::Completed);
                let _ = job.reply.send(result);
            }
            Some(Err(err)) => {
                error!(?err, "job failed");
                self.transition(&request_id, JobState::Aborted);
                let err = EngineError::Internal(err);
                let _ = job.reply.send(ExecutionResult::rejected(&request_id, &err));
            }
        }
    }
}
