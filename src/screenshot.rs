//! Asynchronous screenshot acquisition.
//!
//! The platform's screen-capture API is callback-based: a capture is
//! triggered and the frame arrives later on a platform-controlled thread.
//! `ScreenshotBridge` converts that into one awaitable result per request,
//! running all completion bookkeeping on a dedicated worker task so that a
//! slow capture never stalls event delivery or active-window tracking.

use crate::types::CaptureFailure;
use image::DynamicImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Result of one capture attempt
pub type CaptureResult = Result<DynamicImage, CaptureFailure>;

/// Completion callback handed to the platform capture API.
///
/// The source must invoke it at most once, from any thread.
pub type CompletionFn = Box<dyn FnOnce(CaptureResult) + Send + 'static>;

/// The platform screen-capture API, reduced to its callback shape.
///
/// Production code plugs in the real projection-backed source at the
/// lifecycle seam; tests inject fakes whose completions they control.
pub trait CaptureSource: Send + Sync + 'static {
    /// Begin one asynchronous capture
    fn capture(&self, on_complete: CompletionFn);
}

/// Correlates one capture trigger with its eventual completion
type Token = u64;

enum Command {
    Capture {
        token: Token,
        reply: oneshot::Sender<CaptureResult>,
    },
    Shutdown,
}

struct Pending {
    token: Token,
    reply: oneshot::Sender<CaptureResult>,
}

/// Bridge from the callback-based capture API to awaitable captures.
///
/// At most one capture is outstanding at a time: a newer request supersedes
/// an older one, resolving the older future with `Cancelled` and
/// disregarding its late platform completion. Single-use per pipeline
/// generation; once torn down it only ever reports `Cancelled`.
pub struct ScreenshotBridge {
    cmd_tx: mpsc::Sender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
    next_token: AtomicU64,
    capture_timeout: Duration,
}

impl ScreenshotBridge {
    /// Spawn the capture worker on the given runtime handle
    pub fn new(
        source: Arc<dyn CaptureSource>,
        capture_timeout: Duration,
        command_depth: usize,
        handle: &Handle,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(command_depth.max(1));
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let worker = handle.spawn(run_worker(source, cmd_rx, done_tx, done_rx));

        Self {
            cmd_tx,
            worker: Mutex::new(Some(worker)),
            next_token: AtomicU64::new(1),
            capture_timeout,
        }
    }

    /// Trigger one capture and await its frame.
    ///
    /// Issues exactly one platform capture call. Resolves `Timeout` when no
    /// completion arrives within the configured bound and `Cancelled` when
    /// the bridge is torn down or this request is superseded by a newer one.
    pub async fn request_capture(&self) -> CaptureResult {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();

        if self
            .cmd_tx
            .send(Command::Capture {
                token,
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            // Worker already stopped: this bridge generation is over.
            return Err(CaptureFailure::Cancelled);
        }

        match tokio::time::timeout(self.capture_timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            // Reply sender dropped without resolving: teardown raced us.
            Ok(Err(_)) => Err(CaptureFailure::Cancelled),
            Err(_) => {
                debug!("capture token {} timed out", token);
                Err(CaptureFailure::Timeout)
            }
        }
    }

    /// Stop the worker and resolve any outstanding capture with `Cancelled`.
    ///
    /// Waits for the worker task to exit, so no worker from this generation
    /// survives the call. Idempotent.
    pub async fn teardown(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown).await;
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
            debug!("screenshot worker stopped");
        }
    }
}

async fn run_worker(
    source: Arc<dyn CaptureSource>,
    mut cmd_rx: mpsc::Receiver<Command>,
    done_tx: mpsc::UnboundedSender<(Token, CaptureResult)>,
    mut done_rx: mpsc::UnboundedReceiver<(Token, CaptureResult)>,
) {
    let mut pending: Option<Pending> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Capture { token, reply }) => {
                    if let Some(prev) = pending.take() {
                        debug!("capture token {} superseded by {}", prev.token, token);
                        let _ = prev.reply.send(Err(CaptureFailure::Cancelled));
                    }
                    pending = Some(Pending { token, reply });

                    let done = done_tx.clone();
                    source.capture(Box::new(move |result| {
                        // The worker may already be gone; the completion is
                        // then simply disregarded.
                        let _ = done.send((token, result));
                    }));
                    trace!("capture token {} issued", token);
                }
                Some(Command::Shutdown) | None => break,
            },
            Some((token, result)) = done_rx.recv() => {
                match pending.take() {
                    Some(p) if p.token == token => {
                        trace!("capture token {} completed", token);
                        let _ = p.reply.send(result);
                    }
                    Some(p) => {
                        trace!("disregarding completion for superseded token {}", token);
                        pending = Some(p);
                    }
                    None => {
                        trace!("disregarding completion for settled token {}", token);
                    }
                }
            }
        }
    }

    if let Some(p) = pending.take() {
        let _ = p.reply.send(Err(CaptureFailure::Cancelled));
    }
}
