// Platform store: owns the binding lifecycle and the state every adapter
// shares. The binding arrives asynchronously, so the store starts unready,
// polls a BindingSource until the platform object shows up, then flips a
// watch channel that gates all platform-dependent work.

pub mod ai;
pub mod auth;
pub mod fs;
pub mod kv;

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{FeedbackBackend, StoreConfig};
use crate::platform::http::HttpPlatform;
use crate::platform::{BindingSource, LateBinding, Platform};
use crate::resume::workflow::{AnalyzePhase, Progress};
use crate::store::ai::{Ai, CannedFeedback, FeedbackGenerator};
use crate::store::auth::{Auth, AuthSlot};
use crate::store::fs::Fs;
use crate::store::kv::Kv;

/// Default poll interval while waiting for the platform binding.
const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// Construction tunables. `Default` matches the deployed configuration:
/// 100ms probe and the canned feedback backend.
#[derive(Clone)]
pub struct StoreOptions {
    /// Poll period for the binding probe. Sub-millisecond values, zero
    /// included, are raised to 1ms.
    pub probe_interval: Duration,
    /// Feedback backend override. `None` routes generation through the
    /// platform binding once it is ready.
    pub generator: Option<Arc<dyn FeedbackGenerator>>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            probe_interval: DEFAULT_PROBE_INTERVAL,
            generator: Some(Arc::new(CannedFeedback)),
        }
    }
}

pub(crate) struct StoreInner {
    source: Arc<dyn BindingSource>,
    binding: RwLock<Option<Arc<dyn Platform>>>,
    ready_tx: watch::Sender<bool>,
    /// Handle of the running probe task. One probe at most; cleared when the
    /// binding is adopted or on reset.
    probe: Mutex<Option<JoinHandle<()>>>,
    probe_interval: Duration,
    pub(crate) auth: RwLock<AuthSlot>,
    pub(crate) generator: Option<Arc<dyn FeedbackGenerator>>,
    progress_tx: watch::Sender<Progress>,
}

impl StoreInner {
    /// Current binding, if the probe has resolved one.
    pub(crate) fn platform(&self) -> Option<Arc<dyn Platform>> {
        self.binding.read().expect("binding slot poisoned").clone()
    }
}

/// Client-side coordinator for the platform. Cheap to clone; all clones
/// share one binding, one auth slot and one progress channel.
#[derive(Clone)]
pub struct PlatformStore {
    inner: Arc<StoreInner>,
}

impl PlatformStore {
    pub fn new(source: Arc<dyn BindingSource>) -> Self {
        Self::with_options(source, StoreOptions::default())
    }

    pub fn with_options(source: Arc<dyn BindingSource>, options: StoreOptions) -> Self {
        let (ready_tx, _) = watch::channel(false);
        let (progress_tx, _) = watch::channel(Progress::idle());
        PlatformStore {
            inner: Arc::new(StoreInner {
                source,
                binding: RwLock::new(None),
                ready_tx,
                probe: Mutex::new(None),
                // interval() panics on a zero period; floor at 1ms.
                probe_interval: options.probe_interval.max(Duration::from_millis(1)),
                auth: RwLock::new(AuthSlot::default()),
                generator: options.generator,
                progress_tx,
            }),
        }
    }

    /// Store wired to the configured HTTP platform. The binding is installed
    /// up front, so `init` resolves on the first probe tick.
    pub fn from_config(config: &StoreConfig) -> Self {
        let platform: Arc<dyn Platform> = Arc::new(HttpPlatform::from_config(config));
        let generator: Option<Arc<dyn FeedbackGenerator>> = match config.feedback_backend {
            FeedbackBackend::Canned => Some(Arc::new(CannedFeedback)),
            FeedbackBackend::Platform => None,
        };
        Self::with_options(
            LateBinding::installed(platform),
            StoreOptions {
                probe_interval: config.probe_interval,
                generator,
            },
        )
    }

    /// Starts the readiness probe. Idempotent: while a probe is running or
    /// the store is already ready, further calls do nothing. There is no
    /// timeout; an absent binding keeps the store unready forever.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn init(&self) {
        let mut probe = self.inner.probe.lock().expect("probe handle poisoned");
        if self.ready() {
            return;
        }
        if let Some(handle) = probe.as_ref() {
            if !handle.is_finished() {
                debug!("init: probe already running");
                return;
            }
        }

        let inner = Arc::clone(&self.inner);
        *probe = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval(inner.probe_interval);
            loop {
                ticks.tick().await;
                let Some(platform) = inner.source.acquire() else {
                    continue;
                };
                {
                    let mut probe = inner.probe.lock().expect("probe handle poisoned");
                    if probe.is_none() {
                        // reset() raced us; stand down without adopting
                        break;
                    }
                    *inner.binding.write().expect("binding slot poisoned") = Some(platform);
                    inner.ready_tx.send_replace(true);
                    probe.take();
                }
                info!("platform binding acquired; store is ready");
                // Readiness kicks off a session refresh so consumers see the
                // restored sign-in state without asking for it.
                if let Err(error) = auth::check_status(&inner).await {
                    warn!("auth refresh after binding adoption failed: {error}");
                }
                break;
            }
        }));
    }

    /// Whether the platform binding has been adopted.
    pub fn ready(&self) -> bool {
        *self.inner.ready_tx.borrow()
    }

    /// Resolves once the store is ready. Returns immediately if it already
    /// is; otherwise waits for the probe, with no timeout.
    pub async fn await_ready(&self) {
        let mut ready = self.inner.ready_tx.subscribe();
        while !*ready.borrow_and_update() {
            if ready.changed().await.is_err() {
                return;
            }
        }
    }

    /// Stops any running probe and returns the store to its pre-init state.
    /// The auth slot and progress indicator are cleared too; `init` may be
    /// called again afterwards.
    pub fn reset(&self) {
        let mut probe = self.inner.probe.lock().expect("probe handle poisoned");
        if let Some(handle) = probe.take() {
            handle.abort();
        }
        *self.inner.binding.write().expect("binding slot poisoned") = None;
        self.inner.ready_tx.send_replace(false);
        *self.inner.auth.write().expect("auth slot poisoned") = AuthSlot::default();
        self.inner.progress_tx.send_replace(Progress::idle());
        info!("store reset; binding dropped and probe stopped");
    }

    pub fn auth(&self) -> Auth {
        Auth {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn fs(&self) -> Fs {
        Fs {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn kv(&self) -> Kv {
        Kv {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn ai(&self) -> Ai {
        Ai {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Latest workflow progress snapshot.
    pub fn progress(&self) -> Progress {
        self.inner.progress_tx.borrow().clone()
    }

    /// Watch channel carrying workflow progress. Only the latest value is
    /// retained; slow readers skip intermediate phases.
    pub fn subscribe_progress(&self) -> watch::Receiver<Progress> {
        self.inner.progress_tx.subscribe()
    }

    pub(crate) fn report(&self, phase: AnalyzePhase, message: impl Into<String>) {
        let message = message.into();
        debug!(?phase, "progress: {message}");
        self.inner.progress_tx.send_replace(Progress { phase, message });
    }
}
