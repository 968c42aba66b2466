//! Async drivers that pull byte chunks from a [`Stream`] into an
//! [`ExecutionTracker`].

use std::fmt::Display;

use futures::{Stream, StreamExt};
use tracing::warn;

use vigil_core::config::StreamConfig;
use vigil_core::error::{Result, TransportError, VigilError};
use vigil_core::event::ExecutionEvent;
use vigil_core::execution::Execution;

use crate::dispatch::ExecutionHooks;
use crate::tracker::{ExecutionTracker, StreamOutcome};

/// One reduced event together with the snapshot it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionUpdate {
    pub event: ExecutionEvent,
    pub execution: Execution,
    /// Set on the single update that finished the execution.
    pub finished: bool,
}

/// Feed `chunks` into `tracker` until the source ends, then flush it.
///
/// A chunk error surfaces as [`TransportError::Interrupted`], unless the
/// execution had already finished, in which case the finished snapshot is
/// returned.
pub async fn drive<S, B, E, H>(
    tracker: &mut ExecutionTracker,
    chunks: S,
    hooks: &mut H,
) -> Result<StreamOutcome>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
    H: ExecutionHooks + ?Sized,
{
    let mut chunks = Box::pin(chunks);
    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(bytes) => tracker.push(bytes.as_ref(), &mut *hooks)?,
            Err(e) => {
                let config = tracker.config();
                let (run_id, tags) = (config.run_id, &config.tags);
                if let (true, Some(execution)) = (tracker.is_finished(), tracker.snapshot()) {
                    warn!(%run_id, ?tags, error = %e, "Transport failed after execution finished");
                    return Ok(StreamOutcome::Finished(execution.clone()));
                }
                warn!(%run_id, ?tags, error = %e, "Transport failed mid-stream");
                return Err(TransportError::Interrupted(e.to_string()).into());
            }
        }
    }
    Ok(tracker.finish(hooks)?)
}

/// Follow a whole byte stream with a fresh tracker.
pub async fn follow<S, B, E, H>(chunks: S, config: StreamConfig, mut hooks: H) -> Result<StreamOutcome>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
    H: ExecutionHooks,
{
    let mut tracker = ExecutionTracker::new(config);
    drive(&mut tracker, chunks, &mut hooks).await
}

#[derive(Default)]
struct UpdateCollector {
    pending: Vec<ExecutionUpdate>,
}

impl ExecutionHooks for UpdateCollector {
    fn on_event(&mut self, event: &ExecutionEvent, execution: Option<&Execution>) {
        if let Some(execution) = execution {
            self.pending.push(ExecutionUpdate {
                event: event.clone(),
                execution: execution.clone(),
                finished: false,
            });
        }
    }

    fn on_finish(&mut self, _execution: &Execution) {
        if let Some(last) = self.pending.last_mut() {
            last.finished = true;
        }
    }
}

/// Turn a byte stream into a stream of [`ExecutionUpdate`]s.
///
/// Each update owns a copy of the snapshot. The stream ends after the
/// first error, which is yielded as the last item.
pub fn execution_updates<S, B, E>(
    chunks: S,
    config: StreamConfig,
) -> impl Stream<Item = Result<ExecutionUpdate>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    async_stream::stream! {
        let mut tracker = ExecutionTracker::new(config);
        let mut collector = UpdateCollector::default();
        let mut chunks = Box::pin(chunks);
        let mut failure: Option<VigilError> = None;
        let mut flush = true;

        while let Some(chunk) = chunks.next().await {
            let pushed: Result<()> = match chunk {
                Ok(bytes) => tracker.push(bytes.as_ref(), &mut collector).map_err(VigilError::from),
                Err(e) if tracker.is_finished() => {
                    let config = tracker.config();
                    warn!(run_id = %config.run_id, tags = ?config.tags, error = %e, "Transport failed after execution finished");
                    flush = false;
                    break;
                }
                Err(e) => Err(TransportError::Interrupted(e.to_string()).into()),
            };
            for update in collector.pending.drain(..) {
                yield Ok(update);
            }
            if let Err(e) = pushed {
                failure = Some(e);
                break;
            }
        }

        match failure {
            Some(e) => yield Err(e),
            None if !flush => {}
            None => {
                let flushed = tracker.finish(&mut collector);
                for update in collector.pending.drain(..) {
                    yield Ok(update);
                }
                if let Err(e) = flushed {
                    yield Err(VigilError::from(e));
                }
            }
        }
    }
}
