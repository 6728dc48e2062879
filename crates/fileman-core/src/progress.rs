/// Cancellable progress streaming — one channel abstraction shared by the
/// index, scan, and dedupe paths.
///
/// A long-running task runs on a background thread and emits
/// [`ProgressEvent`]s through a bounded crossbeam channel. The consumer
/// holds a [`TaskHandle`]: it drains events and may request cancellation at
/// any point. Cancellation is cooperative — the worker checks the flag
/// between work units — and once observed, no further events are emitted;
/// the channel simply disconnects.
///
/// Exactly one `Complete` or `Error` terminates a stream that runs to the
/// end.
use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::warn;

/// Maximum number of progress messages that may queue up in the channel.
///
/// Progress messages are lossy (see [`TaskContext::progress`]), so this
/// bound caps memory without ever blocking the worker.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 1_024;

/// Emit a progress event roughly every this many processed units rather
/// than per-file, so very large trees do not overwhelm the consumer.
pub(crate) const PROGRESS_EVERY: u64 = 64;

/// Phase labels carried in `Progress` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    Scanning,
    Hashing,
    Indexing,
}

/// Events produced by a streaming task, terminated by exactly one
/// `Complete` or `Error`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent<R> {
    Progress {
        current: u64,
        /// Zero while the total is not yet known (e.g. during the walk).
        total: u64,
        phase: ProgressPhase,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_file: Option<String>,
    },
    Complete {
        result: R,
    },
    Error {
        message: String,
    },
}

/// Handle to a running or completed background task.
pub struct TaskHandle<R> {
    /// Receiver for the event stream. Disconnects after the terminal event
    /// or once a cancellation has been observed by the worker.
    pub events: Receiver<ProgressEvent<R>>,
    cancel_flag: Arc<AtomicBool>,
    _thread: Option<thread::JoinHandle<()>>,
}

impl<R> TaskHandle<R> {
    /// Request the task to stop as soon as possible.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }
}

/// Worker-side view of a task: emit events, observe cancellation.
pub(crate) struct TaskContext<R> {
    tx: Sender<ProgressEvent<R>>,
    cancel: Arc<AtomicBool>,
}

impl<R> TaskContext<R> {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Emit a progress event. Lossy: if the consumer has fallen behind and
    /// the channel is full, the update is dropped rather than stalling the
    /// worker — the next one carries fresher numbers anyway.
    pub(crate) fn progress(
        &self,
        current: u64,
        total: u64,
        phase: ProgressPhase,
        current_file: Option<&Path>,
    ) {
        let event = ProgressEvent::Progress {
            current,
            total,
            phase,
            current_file: current_file.map(|p| p.to_string_lossy().into_owned()),
        };
        if let Err(TrySendError::Disconnected(_)) = self.tx.try_send(event) {
            // Consumer dropped the handle; nothing left to report to.
        }
    }

    /// Emit the terminal `Complete` event. Blocking: the result must not be
    /// dropped just because the consumer is momentarily slow.
    pub(crate) fn complete(self, result: R) {
        let _ = self.tx.send(ProgressEvent::Complete { result });
    }

    /// Emit the terminal `Error` event.
    pub(crate) fn error(self, message: String) {
        warn!("background task failed: {message}");
        let _ = self.tx.send(ProgressEvent::Error { message });
    }
}

/// Spawn a named background task wired to a fresh event channel.
///
/// The closure receives a [`TaskContext`] and is responsible for emitting
/// exactly one terminal event — unless it observes cancellation, in which
/// case it returns without emitting anything further.
pub(crate) fn spawn_task<R, F>(name: &str, work: F) -> TaskHandle<R>
where
    R: Send + 'static,
    F: FnOnce(TaskContext<R>) + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded::<ProgressEvent<R>>(PROGRESS_CHANNEL_CAPACITY);
    let cancel_flag = Arc::new(AtomicBool::new(false));

    let ctx = TaskContext {
        tx,
        cancel: cancel_flag.clone(),
    };

    let thread = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || work(ctx))
        .expect("failed to spawn task thread");

    TaskHandle {
        events: rx,
        cancel_flag,
        _thread: Some(thread),
    }
}

/// Whether unit `n` of `total` should produce a progress event.
/// Always emits the final unit so consumers see `current == total`.
pub(crate) fn should_emit(n: u64, total: u64) -> bool {
    n % PROGRESS_EVERY == 0 || n == total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_task_delivers_terminal_complete() {
        let handle = spawn_task::<u32, _>("fileman-test-task", |ctx| {
            ctx.progress(1, 2, ProgressPhase::Scanning, None);
            ctx.complete(42);
        });

        let mut result = None;
        for event in handle.events.iter() {
            if let ProgressEvent::Complete { result: r } = event {
                result = Some(r);
            }
        }
        assert_eq!(result, Some(42));
    }

    #[test]
    fn cancelled_task_emits_nothing_further() {
        let handle = spawn_task::<u32, _>("fileman-test-cancel", |ctx| {
            // Busy-wait until the consumer cancels, then stop silently.
            while !ctx.is_cancelled() {
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
        });

        handle.cancel();
        // The stream must end (disconnect) without a terminal event.
        let events: Vec<_> = handle.events.iter().collect();
        assert!(
            events.is_empty(),
            "no events expected after cancellation, got {}",
            events.len()
        );
    }

    #[test]
    fn emission_is_batched_not_per_file() {
        assert!(should_emit(0, 1_000));
        assert!(should_emit(PROGRESS_EVERY, 1_000));
        assert!(!should_emit(PROGRESS_EVERY + 1, 1_000));
        // The final unit always emits.
        assert!(should_emit(999, 999));
    }
}
