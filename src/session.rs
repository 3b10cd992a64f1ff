//! Document sessions: load through a parse worker, own the graph, save.
//!
//! Parsing a project document is a potentially slow, blocking operation, so
//! it runs on a dedicated worker thread that reports back with exactly one
//! completion message: the parsed document or an error. The session owns the
//! resulting graph for its lifetime, runs every mutation synchronously on the
//! caller's thread once ready, and hands the re-derived wire shape to the
//! writer collaborator on save.
//!
//! State machine: `Loading` -> `Ready` | `Failed`. A reader that never
//! returns leaves the session in `Loading`; `wait_ready_timeout` lets callers
//! bound the wait without giving up on the parse, and `cancel` abandons it.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::file::{AddFileOptions, PbxFile};
use crate::graph::{ObjectGraph, WireError};
use crate::mutate::MutateError;

// ============================================================================
// Collaborator Traits
// ============================================================================

/// The grammar reader collaborator.
///
/// Given a document path, produces the wire shape
/// `{"project": {"objects": {...}, ...}}` or a parse failure. Called once per
/// load, on the worker thread; may block.
pub trait ProjectReader: Send {
    fn read_project(&self, path: &Path) -> Result<Value, ParseFailure>;
}

/// The grammar writer collaborator.
///
/// Receives the current wire shape, unchanged in structure from what the
/// reader produced apart from committed mutations, and serializes it to the
/// document's on-disk form.
pub trait ProjectWriter {
    fn write_project(&self, document: &Value) -> Result<(), WriteFailure>;
}

/// Error descriptor surfaced verbatim from the reader collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseFailure {
    pub message: String,
    /// Exit or error code reported by the parser, when it has one.
    pub code: Option<i32>,
}

impl ParseFailure {
    pub fn new(message: impl Into<String>) -> Self {
        ParseFailure {
            message: message.into(),
            code: None,
        }
    }
}

/// Error descriptor surfaced verbatim from the writer collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WriteFailure {
    pub message: String,
}

impl WriteFailure {
    pub fn new(message: impl Into<String>) -> Self {
        WriteFailure {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Why a load ended without a usable document. Kept cloneable so a failed
/// session can report the same error on every subsequent call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The reader collaborator rejected the document.
    #[error("parse failed: {0}")]
    Parse(ParseFailure),

    /// The caller cancelled the parse.
    #[error("parse was cancelled")]
    Cancelled,

    /// The worker thread went away without sending its completion message.
    #[error("parse worker disappeared without a result")]
    WorkerDied,
}

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The document is still loading; mutations must wait for `Ready`.
    #[error("document is still loading")]
    NotReady,

    /// The load ended in failure; the session is terminally `Failed`.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The wait elapsed before the worker's completion message arrived. The
    /// session stays in `Loading`.
    #[error("parse did not complete within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The writer collaborator rejected the document.
    #[error("write failed: {0}")]
    Write(#[from] WriteFailure),

    /// A mutation against the owned graph failed.
    #[error(transparent)]
    Mutate(#[from] MutateError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

// ============================================================================
// Document
// ============================================================================

/// One loaded project document: the typed object graph plus the envelope
/// fields the crate does not interpret (`archiveVersion`, `rootObject`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The wire root with `project.objects` hollowed out; everything else is
    /// preserved for the writer.
    envelope: Value,
    pub graph: ObjectGraph,
}

impl Document {
    /// Split the wire root into envelope and graph.
    pub fn from_wire(mut root: Value) -> Result<Document, WireError> {
        let objects = root
            .get_mut("project")
            .and_then(Value::as_object_mut)
            .and_then(|project| project.get_mut("objects"))
            .map(Value::take)
            .ok_or_else(|| WireError::NotAnObject {
                path: "project.objects".to_string(),
            })?;
        let graph = ObjectGraph::from_wire(objects)?;
        Ok(Document {
            envelope: root,
            graph,
        })
    }

    /// Reassemble the wire root, splicing the graph back into the envelope at
    /// its original position.
    pub fn to_wire(&self) -> Value {
        let mut root = self.envelope.clone();
        if let Some(slot) = root
            .get_mut("project")
            .and_then(Value::as_object_mut)
            .and_then(|project| project.get_mut("objects"))
        {
            *slot = self.graph.to_wire();
        }
        root
    }
}

// ============================================================================
// Parse Job
// ============================================================================

/// Handle to one in-flight parse: a worker thread that sends exactly one
/// completion message and terminates.
pub struct ParseJob {
    rx: Receiver<Result<Document, ParseFailure>>,
}

impl ParseJob {
    /// Spawn the worker and start parsing `path` with `reader`.
    pub fn spawn<R>(path: PathBuf, reader: R) -> ParseJob
    where
        R: ProjectReader + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let outcome = reader.read_project(&path).and_then(|root| {
                Document::from_wire(root).map_err(|err| ParseFailure::new(err.to_string()))
            });
            // The receiver may have been dropped by a cancel; nothing to do.
            let _ = tx.send(outcome);
        });
        ParseJob { rx }
    }

    /// Block until the worker's single completion message arrives.
    pub fn wait(&self) -> Result<Document, LoadError> {
        match self.rx.recv() {
            Ok(Ok(document)) => Ok(document),
            Ok(Err(failure)) => Err(LoadError::Parse(failure)),
            Err(_) => Err(LoadError::WorkerDied),
        }
    }

    /// Like [`ParseJob::wait`], but gives up after `timeout`. `None` means
    /// the worker is still running and the job remains usable.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Document, LoadError>> {
        match self.rx.recv_timeout(timeout) {
            Ok(Ok(document)) => Some(Ok(document)),
            Ok(Err(failure)) => Some(Err(LoadError::Parse(failure))),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(LoadError::WorkerDied)),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

enum SessionState {
    Loading(ParseJob),
    Ready(Document),
    Failed(LoadError),
}

/// Owns one project document from load to save.
///
/// All mutation runs synchronously on the owning thread; distinct sessions
/// are fully independent.
pub struct ProjectSession {
    filepath: PathBuf,
    state: SessionState,
}

impl ProjectSession {
    /// Start loading `path` through `reader` on a worker thread.
    pub fn load<R>(path: impl Into<PathBuf>, reader: R) -> ProjectSession
    where
        R: ProjectReader + 'static,
    {
        let filepath = path.into();
        info!("loading project {}", filepath.display());
        let job = ParseJob::spawn(filepath.clone(), reader);
        ProjectSession {
            filepath,
            state: SessionState::Loading(job),
        }
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    /// Block until the parse completes, then report the session state.
    pub fn wait_ready(&mut self) -> SessionResult<()> {
        if let SessionState::Loading(job) = &self.state {
            let outcome = job.wait();
            self.state = self.settle(outcome);
        }
        self.report()
    }

    /// Like [`ProjectSession::wait_ready`], bounded by `timeout`. On timeout
    /// the parse keeps running and the session stays in `Loading`.
    pub fn wait_ready_timeout(&mut self, timeout: Duration) -> SessionResult<()> {
        if let SessionState::Loading(job) = &self.state {
            match job.wait_timeout(timeout) {
                Some(outcome) => self.state = self.settle(outcome),
                None => {
                    return Err(SessionError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    })
                }
            }
        }
        self.report()
    }

    /// Abandon an in-flight parse. The worker's eventual message is
    /// discarded; the session becomes terminally `Failed`.
    pub fn cancel(&mut self) {
        if matches!(self.state, SessionState::Loading(_)) {
            warn!("cancelled parse of {}", self.filepath.display());
            self.state = SessionState::Failed(LoadError::Cancelled);
        }
    }

    fn settle(&self, outcome: Result<Document, LoadError>) -> SessionState {
        match outcome {
            Ok(document) => {
                info!("project {} ready", self.filepath.display());
                SessionState::Ready(document)
            }
            Err(err) => {
                warn!("project {} failed to load: {}", self.filepath.display(), err);
                SessionState::Failed(err)
            }
        }
    }

    fn report(&self) -> SessionResult<()> {
        match &self.state {
            SessionState::Ready(_) => Ok(()),
            SessionState::Failed(err) => Err(SessionError::Load(err.clone())),
            SessionState::Loading(_) => Err(SessionError::NotReady),
        }
    }

    /// The loaded document. Errors while `Loading` or `Failed`.
    pub fn document(&self) -> SessionResult<&Document> {
        match &self.state {
            SessionState::Ready(document) => Ok(document),
            SessionState::Failed(err) => Err(SessionError::Load(err.clone())),
            SessionState::Loading(_) => Err(SessionError::NotReady),
        }
    }

    /// The owned graph, for read access.
    pub fn graph(&self) -> SessionResult<&ObjectGraph> {
        self.document().map(|document| &document.graph)
    }

    /// The owned graph, for mutation.
    pub fn graph_mut(&mut self) -> SessionResult<&mut ObjectGraph> {
        match &mut self.state {
            SessionState::Ready(document) => Ok(&mut document.graph),
            SessionState::Failed(err) => Err(SessionError::Load(err.clone())),
            SessionState::Loading(_) => Err(SessionError::NotReady),
        }
    }

    /// Add a source file to the owned graph. See
    /// [`ObjectGraph::add_source_file`].
    pub fn add_source_file(
        &mut self,
        path: &str,
        options: &AddFileOptions,
    ) -> SessionResult<PbxFile> {
        Ok(self.graph_mut()?.add_source_file(path, options)?)
    }

    /// Add a header file to the owned graph. See
    /// [`ObjectGraph::add_header_file`].
    pub fn add_header_file(
        &mut self,
        path: &str,
        options: &AddFileOptions,
    ) -> SessionResult<PbxFile> {
        Ok(self.graph_mut()?.add_header_file(path, options)?)
    }

    /// Add a resource file to the owned graph. See
    /// [`ObjectGraph::add_resource_file`].
    pub fn add_resource_file(
        &mut self,
        path: &str,
        options: &AddFileOptions,
    ) -> SessionResult<PbxFile> {
        Ok(self.graph_mut()?.add_resource_file(path, options)?)
    }

    /// Hand the current wire shape to the writer collaborator.
    pub fn save(&self, writer: &dyn ProjectWriter) -> SessionResult<()> {
        let document = self.document()?;
        writer.write_project(&document.to_wire())?;
        debug!("saved project {}", self.filepath.display());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
