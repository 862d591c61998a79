//! Generation job orchestration
//!
//! The orchestrator owns at most one `GenerationJob`. Starting a job invokes
//! the engine and hands back a `JobRun`; whoever drives its event stream
//! (the iced runtime, or a test) feeds each `JobEvent` back through
//! `GenerationOrchestrator::apply`. Events are tagged with the job id and
//! only the currently subscribed job may change state.

use futures::channel::mpsc;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::data::TemplateId;
use crate::error::{EngineError, GenerationError, InputField, ValidationError};

/// Identity of one started job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

/// Lifecycle of a generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Idle,
    Requested,
    Generating,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, JobStatus::Requested | JobStatus::Generating)
    }
}

/// A job as seen by the UI
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    pub id: JobId,
    pub template_id: TemplateId,
    pub source_folder: PathBuf,
    pub progress: u8,
    pub status: JobStatus,
    pub archive_path: Option<PathBuf>,
    pub error: Option<EngineError>,
}

/// Messages delivered on a job's event stream
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Progress { job: JobId, percent: i64 },
    Finished {
        job: JobId,
        result: Result<PathBuf, EngineError>,
    },
}

impl JobEvent {
    pub fn job(&self) -> JobId {
        match self {
            JobEvent::Progress { job, .. } | JobEvent::Finished { job, .. } => *job,
        }
    }
}

/// Cooperative cancellation shared between the orchestrator and the engine
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What the engine is asked to do
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub template_id: TemplateId,
    pub source_folder: PathBuf,
    pub cancel: CancelFlag,
}

/// Sending half of a job's progress channel
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    job: JobId,
    tx: mpsc::UnboundedSender<JobEvent>,
}

impl ProgressReporter {
    /// Push a percentage. Never blocks; silently dropped once nobody listens.
    pub fn report(&self, percent: i64) {
        let _ = self.tx.unbounded_send(JobEvent::Progress {
            job: self.job,
            percent,
        });
    }
}

/// The batch image generator the orchestrator drives
pub trait GenerationEngine: Send + Sync {
    /// Start a job. Resolves to the path of the produced archive.
    fn generate(
        &self,
        request: GenerationRequest,
        progress: ProgressReporter,
    ) -> BoxFuture<'static, Result<PathBuf, EngineError>>;
}

/// A started job, ready to be driven
pub struct JobRun {
    pub id: JobId,
    work: BoxFuture<'static, Result<PathBuf, EngineError>>,
    events: mpsc::UnboundedReceiver<JobEvent>,
    finished: mpsc::UnboundedSender<JobEvent>,
}

impl JobRun {
    /// Drive the engine and yield its progress followed by one `Finished` event.
    ///
    /// The result travels through the same channel as progress, so every
    /// progress update sent before the engine resolved is delivered first.
    pub fn into_stream(self) -> BoxStream<'static, JobEvent> {
        let JobRun {
            id,
            work,
            events,
            finished,
        } = self;

        let driver = stream::once(async move {
            let result = work.await;
            let _ = finished.unbounded_send(JobEvent::Finished { job: id, result });
        })
        .filter_map(|()| futures::future::ready(None::<JobEvent>));

        stream::select(driver, events).boxed()
    }
}

impl std::fmt::Debug for JobRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRun").field("id", &self.id).finish()
    }
}

struct Subscription {
    job: JobId,
    cancel: CancelFlag,
}

/// Owns the generate screen's job and its progress subscription
pub struct GenerationOrchestrator {
    engine: Arc<dyn GenerationEngine>,
    job: Option<GenerationJob>,
    subscription: Option<Subscription>,
    next_id: u64,
}

impl GenerationOrchestrator {
    pub fn new(engine: Arc<dyn GenerationEngine>) -> Self {
        Self {
            engine,
            job: None,
            subscription: None,
            next_id: 1,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.job.as_ref().map_or(JobStatus::Idle, |job| job.status)
    }

    pub fn job(&self) -> Option<&GenerationJob> {
        self.job.as_ref()
    }

    pub fn progress(&self) -> u8 {
        self.job.as_ref().map_or(0, |job| job.progress)
    }

    pub fn is_in_flight(&self) -> bool {
        self.status().is_in_flight()
    }

    /// Validate the selection, start the engine, and subscribe to the new job.
    pub fn start(
        &mut self,
        template_id: Option<TemplateId>,
        folder: &str,
    ) -> Result<JobRun, GenerationError> {
        if self.is_in_flight() {
            return Err(GenerationError::JobInProgress);
        }
        let template_id =
            template_id.ok_or(ValidationError::MissingInput(InputField::Template))?;
        let folder = folder.trim();
        if folder.is_empty() {
            return Err(ValidationError::MissingInput(InputField::Folder).into());
        }

        // A finished job from earlier is replaced, never observed again
        self.teardown();

        let id = JobId(self.next_id);
        self.next_id += 1;
        let source_folder = PathBuf::from(folder);
        self.job = Some(GenerationJob {
            id,
            template_id,
            source_folder: source_folder.clone(),
            progress: 0,
            status: JobStatus::Requested,
            archive_path: None,
            error: None,
        });

        let (tx, events) = mpsc::unbounded();
        let cancel = CancelFlag::default();
        let request = GenerationRequest {
            template_id,
            source_folder,
            cancel: cancel.clone(),
        };
        let work = self.engine.generate(
            request,
            ProgressReporter {
                job: id,
                tx: tx.clone(),
            },
        );

        if let Some(job) = self.job.as_mut() {
            job.status = JobStatus::Generating;
        }
        self.subscription = Some(Subscription { job: id, cancel });

        log::info!(
            "🚀 Started generation job {:?} for template {} from {}",
            id,
            template_id,
            folder
        );

        Ok(JobRun {
            id,
            work,
            events,
            finished: tx,
        })
    }

    /// Apply one event from a job stream. Returns whether anything changed.
    pub fn apply(&mut self, event: JobEvent) -> bool {
        let subscribed = self.subscription.as_ref().map(|s| s.job);
        if subscribed != Some(event.job()) {
            log::debug!("Dropping event for unsubscribed job {:?}", event.job());
            return false;
        }
        let Some(job) = self.job.as_mut() else {
            return false;
        };
        if job.status != JobStatus::Generating {
            log::debug!("Dropping event for job {:?} in state {:?}", job.id, job.status);
            return false;
        }

        match event {
            JobEvent::Progress { percent, .. } => {
                job.progress = percent.clamp(0, 100) as u8;
            }
            JobEvent::Finished { result: Ok(path), .. } => {
                log::info!("✅ Job {:?} finished: {}", job.id, path.display());
                job.status = JobStatus::Succeeded;
                job.archive_path = Some(path);
            }
            JobEvent::Finished { result: Err(e), .. } => {
                log::error!("❌ Job {:?} failed: {}", job.id, e);
                job.status = JobStatus::Failed;
                job.error = Some(e);
            }
        }
        true
    }

    /// Unsubscribe and discard the current job.
    ///
    /// A job still running is asked to stop; anything it sends afterwards is dropped.
    pub fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            if self.is_in_flight() {
                log::info!("Cancelling generation job {:?}", subscription.job);
                subscription.cancel.cancel();
            }
        }
        self.job = None;
    }
}

impl std::fmt::Debug for GenerationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationOrchestrator")
            .field("job", &self.job)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Engine that replays a fixed script of progress values and a result
    pub(crate) struct ScriptedEngine {
        pub progress: Vec<i64>,
        pub result: Result<PathBuf, EngineError>,
        pub calls: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedEngine {
        pub(crate) fn new(progress: Vec<i64>, result: Result<PathBuf, EngineError>) -> Arc<Self> {
            Arc::new(Self {
                progress,
                result,
                calls: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl GenerationEngine for ScriptedEngine {
        fn generate(
            &self,
            request: GenerationRequest,
            progress: ProgressReporter,
        ) -> BoxFuture<'static, Result<PathBuf, EngineError>> {
            self.calls.lock().unwrap().push(request);
            let script = self.progress.clone();
            let result = self.result.clone();
            Box::pin(async move {
                for percent in script {
                    progress.report(percent);
                    tokio::task::yield_now().await;
                }
                result
            })
        }
    }

    async fn drive(orchestrator: &mut GenerationOrchestrator, run: JobRun) -> Vec<JobEvent> {
        let events: Vec<JobEvent> = run.into_stream().collect().await;
        for event in events.clone() {
            orchestrator.apply(event);
        }
        events
    }

    #[test]
    fn test_start_requires_template_and_folder() {
        let engine = ScriptedEngine::new(vec![], Ok(PathBuf::from("/out/a.zip")));
        let mut orchestrator = GenerationOrchestrator::new(engine.clone());

        assert_eq!(
            orchestrator.start(None, "/photos").unwrap_err(),
            GenerationError::InputValidation(ValidationError::MissingInput(InputField::Template))
        );
        assert_eq!(
            orchestrator.start(Some(1), "").unwrap_err(),
            GenerationError::InputValidation(ValidationError::MissingInput(InputField::Folder))
        );
        assert_eq!(
            orchestrator.start(Some(1), "   ").unwrap_err(),
            GenerationError::InputValidation(ValidationError::MissingInput(InputField::Folder))
        );

        assert_eq!(engine.call_count(), 0);
        assert_eq!(orchestrator.status(), JobStatus::Idle);
    }

    #[test]
    fn test_start_moves_to_generating_with_zero_progress() {
        let engine = ScriptedEngine::new(vec![], Ok(PathBuf::from("/out/a.zip")));
        let mut orchestrator = GenerationOrchestrator::new(engine.clone());

        let run = orchestrator.start(Some(4), " /photos ").unwrap();
        let job = orchestrator.job().unwrap();
        assert_eq!(job.id, run.id);
        assert_eq!(job.status, JobStatus::Generating);
        assert_eq!(job.progress, 0);
        assert_eq!(job.source_folder, PathBuf::from("/photos"));

        let calls = engine.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].template_id, 4);
    }

    #[test]
    fn test_start_rejected_while_in_flight() {
        let engine = ScriptedEngine::new(vec![], Ok(PathBuf::from("/out/a.zip")));
        let mut orchestrator = GenerationOrchestrator::new(engine.clone());

        let _run = orchestrator.start(Some(1), "/photos").unwrap();
        assert_eq!(
            orchestrator.start(Some(1), "/photos").unwrap_err(),
            GenerationError::JobInProgress
        );
        // In-flight check wins over input validation
        assert_eq!(
            orchestrator.start(None, "").unwrap_err(),
            GenerationError::JobInProgress
        );
        assert_eq!(engine.call_count(), 1);
    }

    #[test]
    fn test_progress_is_clamped() {
        let engine = ScriptedEngine::new(vec![], Ok(PathBuf::from("/out/a.zip")));
        let mut orchestrator = GenerationOrchestrator::new(engine);
        let run = orchestrator.start(Some(1), "/photos").unwrap();

        assert!(orchestrator.apply(JobEvent::Progress { job: run.id, percent: 140 }));
        assert_eq!(orchestrator.progress(), 100);
        assert!(orchestrator.apply(JobEvent::Progress { job: run.id, percent: -5 }));
        assert_eq!(orchestrator.progress(), 0);
        // Decreases are accepted as they come
        orchestrator.apply(JobEvent::Progress { job: run.id, percent: 60 });
        orchestrator.apply(JobEvent::Progress { job: run.id, percent: 30 });
        assert_eq!(orchestrator.progress(), 30);
    }

    #[test]
    fn test_events_after_resolution_are_dropped() {
        let engine = ScriptedEngine::new(vec![], Ok(PathBuf::from("/out/a.zip")));
        let mut orchestrator = GenerationOrchestrator::new(engine);
        let run = orchestrator.start(Some(1), "/photos").unwrap();

        orchestrator.apply(JobEvent::Progress { job: run.id, percent: 40 });
        orchestrator.apply(JobEvent::Finished {
            job: run.id,
            result: Err(EngineError::NoImages(PathBuf::from("/photos"))),
        });
        assert_eq!(orchestrator.status(), JobStatus::Failed);

        assert!(!orchestrator.apply(JobEvent::Progress { job: run.id, percent: 90 }));
        assert!(!orchestrator.apply(JobEvent::Finished {
            job: run.id,
            result: Ok(PathBuf::from("/out/late.zip")),
        }));

        let job = orchestrator.job().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 40);
        assert_eq!(job.archive_path, None);
        assert_eq!(job.error, Some(EngineError::NoImages(PathBuf::from("/photos"))));
    }

    #[test]
    fn test_events_from_stale_job_are_dropped() {
        let engine = ScriptedEngine::new(vec![], Ok(PathBuf::from("/out/a.zip")));
        let mut orchestrator = GenerationOrchestrator::new(engine);

        let first = orchestrator.start(Some(1), "/photos").unwrap();
        orchestrator.apply(JobEvent::Finished {
            job: first.id,
            result: Ok(PathBuf::from("/out/a.zip")),
        });
        let second = orchestrator.start(Some(2), "/more").unwrap();
        assert_ne!(first.id, second.id);

        assert!(!orchestrator.apply(JobEvent::Progress { job: first.id, percent: 77 }));
        assert_eq!(orchestrator.progress(), 0);
        assert_eq!(orchestrator.status(), JobStatus::Generating);
    }

    #[test]
    fn test_teardown_cancels_running_job_and_ignores_late_events() {
        let engine = ScriptedEngine::new(vec![], Ok(PathBuf::from("/out/a.zip")));
        let mut orchestrator = GenerationOrchestrator::new(engine.clone());
        let run = orchestrator.start(Some(1), "/photos").unwrap();

        orchestrator.teardown();
        assert_eq!(orchestrator.status(), JobStatus::Idle);
        assert!(orchestrator.job().is_none());
        assert!(engine.calls.lock().unwrap()[0].cancel.is_cancelled());

        assert!(!orchestrator.apply(JobEvent::Progress { job: run.id, percent: 50 }));
        assert_eq!(orchestrator.status(), JobStatus::Idle);
    }

    #[tokio::test]
    async fn test_stream_delivers_progress_before_result() {
        let engine = ScriptedEngine::new(vec![0, 25, 60, 100], Ok(PathBuf::from("/out/archive.zip")));
        let mut orchestrator = GenerationOrchestrator::new(engine);
        let run = orchestrator.start(Some(1), "/photos").unwrap();
        let id = run.id;

        let events = drive(&mut orchestrator, run).await;
        assert_eq!(
            events,
            vec![
                JobEvent::Progress { job: id, percent: 0 },
                JobEvent::Progress { job: id, percent: 25 },
                JobEvent::Progress { job: id, percent: 60 },
                JobEvent::Progress { job: id, percent: 100 },
                JobEvent::Finished {
                    job: id,
                    result: Ok(PathBuf::from("/out/archive.zip")),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_end_to_end_success() {
        let engine = ScriptedEngine::new(vec![0, 25, 60, 100], Ok(PathBuf::from("/out/archive.zip")));
        let mut orchestrator = GenerationOrchestrator::new(engine);

        let run = orchestrator.start(Some(1), "/photos").unwrap();
        drive(&mut orchestrator, run).await;

        let job = orchestrator.job().unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.progress, 100);
        assert_eq!(job.archive_path, Some(PathBuf::from("/out/archive.zip")));
        assert_eq!(job.error, None);
    }

    #[tokio::test]
    async fn test_failure_preserves_last_progress() {
        let engine = ScriptedEngine::new(vec![10, 35], Err(EngineError::Cancelled));
        let mut orchestrator = GenerationOrchestrator::new(engine);

        let run = orchestrator.start(Some(1), "/photos").unwrap();
        drive(&mut orchestrator, run).await;

        let job = orchestrator.job().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 35);
        assert_eq!(job.error, Some(EngineError::Cancelled));
    }

    #[tokio::test]
    async fn test_new_job_after_success_starts_from_zero() {
        let engine = ScriptedEngine::new(vec![100], Ok(PathBuf::from("/out/archive.zip")));
        let mut orchestrator = GenerationOrchestrator::new(engine);

        let run = orchestrator.start(Some(1), "/photos").unwrap();
        drive(&mut orchestrator, run).await;
        assert_eq!(orchestrator.progress(), 100);

        let _run = orchestrator.start(Some(1), "/photos").unwrap();
        assert_eq!(orchestrator.progress(), 0);
        assert_eq!(orchestrator.job().unwrap().archive_path, None);
    }
}
