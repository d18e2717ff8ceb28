//! Single-flight package cache cell
//!
//! A cell fetches one release asset, parses its control block and keeps
//! the result for every later request. Loading is generation-counted:
//!
//! | State | Meaning |
//! |-------|---------|
//! | NotLoaded | Nothing fetched in this generation |
//! | Loading | One fetch in flight, callers wait on it |
//! | Loaded | Package ready for serialization |
//! | Failed | Error returned to every caller of this generation |
//!
//! Transport failures schedule a reset to `NotLoaded` after the retry
//! delay, which starts the next generation. Parse and validation failures
//! stay until the cell is dropped.

use crate::error::{LoadError, LoadResult};
use crate::package::artifact::ArtifactRef;
use crate::package::control::{self, Descriptor, PackageIdentity};
use crate::package::source::ArchiveSource;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// Delay before a transport failure is retried
pub const RETRY_DELAY: Duration = Duration::from_secs(30);

/// Root of every `Filename` path in the index
const DOWNLOAD_ROOT: &str = "download";

/// A successfully loaded package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Asset the package was fetched from, with the size resolved
    pub artifact: ArtifactRef,

    /// Control block exactly as found in the archive
    pub control: String,

    /// Parsed control block
    pub descriptor: Descriptor,

    /// Hex MD5 of the archive
    pub md5sum: String,
}

impl Package {
    pub fn identity(&self) -> PackageIdentity {
        self.descriptor.identity()
    }

    /// Path of the package relative to the repository root
    ///
    /// Organization-wide indexes include the repository name so assets of
    /// different repositories cannot collide.
    pub fn filename(&self, organization_wide: bool) -> String {
        let a = &self.artifact;
        if organization_wide {
            format!("{}/{}/{}/{}", DOWNLOAD_ROOT, a.repo_name, a.tag_name, a.file_name)
        } else {
            format!("{}/{}/{}", DOWNLOAD_ROOT, a.tag_name, a.file_name)
        }
    }

    /// Write the package as one index entry
    pub fn write<W: Write + ?Sized>(&self, w: &mut W, organization_wide: bool) -> io::Result<()> {
        w.write_all(self.control.as_bytes())?;
        if !self.control.is_empty() && !self.control.ends_with('\n') {
            writeln!(w)?;
        }
        writeln!(w, "Filename: {}", self.filename(organization_wide))?;
        writeln!(w, "Size: {}", self.artifact.size)?;
        writeln!(w, "MD5Sum: {}", self.md5sum)?;
        writeln!(w)
    }
}

type Outcome = LoadResult<Arc<Package>>;

/// A failed load, with the descriptor if parsing got that far
struct Failure {
    error: LoadError,
    descriptor: Option<Descriptor>,
}

impl From<LoadError> for Failure {
    fn from(error: LoadError) -> Self {
        Self {
            error,
            descriptor: None,
        }
    }
}

enum Slot {
    NotLoaded,
    Loading(watch::Receiver<Option<Outcome>>),
    Loaded(Arc<Package>),
    Failed {
        error: LoadError,
        descriptor: Option<Descriptor>,
    },
}

struct CellState {
    generation: u64,
    slot: Slot,
    /// Pending reset timer, at most one per generation
    reset: Option<AbortHandle>,
}

struct Shared {
    state: Mutex<CellState>,
    source: Arc<dyn ArchiveSource>,
    retry_delay: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, CellState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store the result of the load for `generation`
    ///
    /// Ignored if the cell has moved on to another generation or already
    /// holds a result.
    fn commit(self: &Arc<Self>, generation: u64, url: &str, result: Result<Package, Failure>) -> Outcome {
        let mut state = self.lock();
        let current = state.generation == generation && matches!(state.slot, Slot::Loading(_));

        match result {
            Ok(package) => {
                let package = Arc::new(package);
                if current {
                    info!("Loaded {} from {}", package.identity(), url);
                    state.slot = Slot::Loaded(Arc::clone(&package));
                }
                Ok(package)
            }
            Err(Failure { error, descriptor }) => {
                if current {
                    warn!("Failed to load {}: {}", url, error);
                    if error.is_retryable() && state.reset.is_none() {
                        info!("Retrying {} in {:?}", url, self.retry_delay);
                        state.reset = Some(self.schedule_reset(generation));
                    }
                    state.slot = Slot::Failed {
                        error: error.clone(),
                        descriptor,
                    };
                }
                Err(error)
            }
        }
    }

    fn schedule_reset(self: &Arc<Self>, generation: u64) -> AbortHandle {
        let cell = Arc::downgrade(self);
        let delay = self.retry_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = cell.upgrade() {
                shared.reset(generation);
            }
        })
        .abort_handle()
    }

    /// Start a new generation if `generation` ended in failure
    fn reset(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation || !matches!(state.slot, Slot::Failed { .. }) {
            return;
        }
        state.generation += 1;
        state.slot = Slot::NotLoaded;
        state.reset = None;
        debug!("Cell reset to generation {}", state.generation);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(reset) = state.reset.take() {
            reset.abort();
        }
    }
}

/// Memoized, self-healing cache entry for one package
///
/// Clones share the same state.
#[derive(Clone)]
pub struct PackageCell {
    shared: Arc<Shared>,
}

impl PackageCell {
    /// Create an empty cell using the default retry delay
    pub fn new(source: Arc<dyn ArchiveSource>) -> Self {
        Self::with_retry_delay(source, RETRY_DELAY)
    }

    pub fn with_retry_delay(source: Arc<dyn ArchiveSource>, retry_delay: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(CellState {
                    generation: 0,
                    slot: Slot::NotLoaded,
                    reset: None,
                }),
                source,
                retry_delay,
            }),
        }
    }

    /// Load the package unless this generation already has a result
    ///
    /// Concurrent callers share a single fetch and all see its outcome.
    /// The fetch runs on its own task, so dropping the returned future
    /// does not cancel it.
    pub async fn ensure(&self, artifact: &ArtifactRef) -> LoadResult<()> {
        let (generation, mut rx) = {
            let mut state = self.shared.lock();
            let generation = state.generation;
            let in_flight = match &state.slot {
                Slot::Loaded(_) => return Ok(()),
                Slot::Failed { error, .. } => return Err(error.clone()),
                Slot::Loading(rx) => Some(rx.clone()),
                Slot::NotLoaded => None,
            };

            match in_flight {
                Some(rx) => {
                    debug!("Waiting for in-flight load of {}", artifact.download_url);
                    (generation, rx)
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    state.slot = Slot::Loading(rx.clone());
                    self.spawn_load(generation, artifact.clone(), tx);
                    (generation, rx)
                }
            }
        };

        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };

        match outcome {
            Some(outcome) => outcome.map(|_| ()),
            // The load task died before reporting; fail this generation
            // like a transport error so it gets retried.
            None => {
                let error =
                    LoadError::transport(artifact.download_url.as_str(), "load ended without a result");
                self.shared
                    .commit(generation, &artifact.download_url, Err(error.into()))
                    .map(|_| ())
            }
        }
    }

    fn spawn_load(&self, generation: u64, artifact: ArtifactRef, tx: watch::Sender<Option<Outcome>>) {
        let cell = Arc::downgrade(&self.shared);
        let source = Arc::clone(&self.shared.source);

        tokio::spawn(async move {
            let result = load(&*source, artifact.clone()).await;
            let outcome = match Weak::upgrade(&cell) {
                Some(shared) => shared.commit(generation, &artifact.download_url, result),
                None => result.map(Arc::new).map_err(|f| f.error),
            };
            tx.send_replace(Some(outcome));
        });
    }

    /// Write the entry for index output
    ///
    /// Only meaningful after `ensure` succeeded; an unloaded cell writes
    /// nothing.
    pub fn write<W: Write + ?Sized>(&self, w: &mut W, organization_wide: bool) -> io::Result<()> {
        match self.package() {
            Some(package) => package.write(w, organization_wide),
            None => {
                warn!("Skipping write of a cell that is not loaded");
                Ok(())
            }
        }
    }

    /// The loaded package, if the current generation succeeded
    pub fn package(&self) -> Option<Arc<Package>> {
        match &self.shared.lock().slot {
            Slot::Loaded(package) => Some(Arc::clone(package)),
            _ => None,
        }
    }

    /// The parsed control block
    ///
    /// Also kept after a validation failure, to help diagnose it.
    pub fn descriptor(&self) -> Option<Descriptor> {
        match &self.shared.lock().slot {
            Slot::Loaded(package) => Some(package.descriptor.clone()),
            Slot::Failed { descriptor, .. } => descriptor.clone(),
            _ => None,
        }
    }

    /// The stored error, if the current generation failed
    pub fn error(&self) -> Option<LoadError> {
        match &self.shared.lock().slot {
            Slot::Failed { error, .. } => Some(error.clone()),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<String> {
        self.descriptor().and_then(|d| d.name().map(str::to_string))
    }

    pub fn version(&self) -> Option<String> {
        self.descriptor().and_then(|d| d.version().map(str::to_string))
    }

    pub fn architecture(&self) -> Option<String> {
        self.descriptor().and_then(|d| d.architecture().map(str::to_string))
    }

    /// Identity of the parsed package
    pub fn key(&self) -> Option<PackageIdentity> {
        self.descriptor().map(|d| d.identity())
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.shared.lock().slot, Slot::Loaded(_))
    }

    /// Number of completed resets
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }
}

/// Fetch, parse and validate one package
async fn load(source: &dyn ArchiveSource, mut artifact: ArtifactRef) -> Result<Package, Failure> {
    let fetched = source.fetch(&artifact.download_url).await?;
    let text = control::decode_control(fetched.control)?;
    let descriptor = control::parse_descriptor(&text)?;

    if let Err(error) = control::validate(&descriptor, &fetched.md5sum) {
        return Err(Failure {
            error,
            descriptor: Some(descriptor),
        });
    }

    if artifact.size == 0 {
        artifact.size = fetched.size;
    }

    Ok(Package {
        artifact,
        control: text,
        descriptor,
        md5sum: fetched.md5sum,
    })
}
