use tracing::{debug, info, warn};

use vigil_core::config::StreamConfig;
use vigil_core::error::StreamError;
use vigil_core::event::ExecutionEvent;
use vigil_core::execution::Execution;

use crate::decoder::decode_event;
use crate::dispatch::{dispatch, ExecutionHooks, TerminalDetector};
use crate::reassembler::LineReassembler;
use crate::reducer::reduce;

/// How a stream ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    /// A terminal status update was observed; carries the final snapshot.
    Finished(Execution),
    /// The byte source ended first. Carries whatever was reconstructed.
    Incomplete(Option<Execution>),
}

impl StreamOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }

    pub fn execution(&self) -> Option<&Execution> {
        match self {
            Self::Finished(execution) => Some(execution),
            Self::Incomplete(execution) => execution.as_ref(),
        }
    }

    pub fn into_execution(self) -> Option<Execution> {
        match self {
            Self::Finished(execution) => Some(execution),
            Self::Incomplete(execution) => execution,
        }
    }
}

/// Reconstructs one execution from its raw event stream.
///
/// Feed bytes with [`push`](Self::push) as they arrive and call
/// [`finish`](Self::finish) when the source ends. The first error poisons
/// the tracker; the snapshot from before the failing line stays readable.
#[derive(Debug)]
pub struct ExecutionTracker {
    config: StreamConfig,
    lines: LineReassembler,
    snapshot: Option<Execution>,
    detector: TerminalDetector,
    poisoned: bool,
    events_applied: usize,
}

impl Default for ExecutionTracker {
    fn default() -> Self {
        Self::new(StreamConfig::default())
    }
}

impl ExecutionTracker {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            lines: LineReassembler::new(config.max_line_bytes),
            config,
            snapshot: None,
            detector: TerminalDetector::new(),
            poisoned: false,
            events_applied: 0,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The latest successfully reduced snapshot.
    pub fn snapshot(&self) -> Option<&Execution> {
        self.snapshot.as_ref()
    }

    /// Whether the finish hook has fired.
    pub fn is_finished(&self) -> bool {
        self.detector.has_fired()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn events_applied(&self) -> usize {
        self.events_applied
    }

    /// Buffer a chunk and process every event line it completes.
    pub fn push<H>(&mut self, chunk: &[u8], hooks: &mut H) -> Result<(), StreamError>
    where
        H: ExecutionHooks + ?Sized,
    {
        self.ensure_healthy()?;
        self.lines.push(chunk);
        while let Some(line) = self.lines.next_line() {
            let result = line
                .map_err(StreamError::from)
                .and_then(|line| self.process_line(&line, &mut *hooks));
            if let Err(e) = result {
                return Err(self.poison(e));
            }
        }
        Ok(())
    }

    /// Flush the trailing unterminated line, if any, and report the outcome.
    pub fn finish<H>(&mut self, hooks: &mut H) -> Result<StreamOutcome, StreamError>
    where
        H: ExecutionHooks + ?Sized,
    {
        self.ensure_healthy()?;
        let result = self
            .lines
            .finalize()
            .map_err(StreamError::from)
            .and_then(|tail| match tail {
                Some(line) => self.process_line(&line, &mut *hooks),
                None => Ok(()),
            });
        if let Err(e) = result {
            return Err(self.poison(e));
        }

        if self.detector.has_fired() {
            if let Some(execution) = &self.snapshot {
                return Ok(StreamOutcome::Finished(execution.clone()));
            }
        }
        warn!(
            run_id = %self.config.run_id,
            tags = ?self.config.tags,
            events = self.events_applied,
            "Stream ended without a terminal status"
        );
        Ok(StreamOutcome::Incomplete(self.snapshot.clone()))
    }

    fn process_line<H>(&mut self, line: &str, hooks: &mut H) -> Result<(), StreamError>
    where
        H: ExecutionHooks + ?Sized,
    {
        let event = decode_event(line)?;
        debug!(
            run_id = %self.config.run_id,
            op = event.op(),
            created_at = %event.created_at(),
            "Event decoded"
        );

        // A reduction only fails when there is no snapshot yet, so nothing
        // is lost by taking it.
        let execution = reduce(self.snapshot.take(), &event)?;
        if let ExecutionEvent::Init(_) = &event {
            info!(
                run_id = %self.config.run_id,
                tags = ?self.config.tags,
                id = %execution.id,
                status = ?execution.status,
                "Execution initialized"
            );
        }
        self.events_applied += 1;
        let snapshot = &*self.snapshot.insert(execution);

        if dispatch(hooks, &mut self.detector, &event, Some(snapshot)) {
            info!(
                run_id = %self.config.run_id,
                tags = ?self.config.tags,
                id = %snapshot.id,
                status = ?snapshot.status,
                events = self.events_applied,
                "Execution finished"
            );
        }
        Ok(())
    }

    fn ensure_healthy(&self) -> Result<(), StreamError> {
        if self.poisoned {
            Err(StreamError::Poisoned)
        } else {
            Ok(())
        }
    }

    fn poison(&mut self, error: StreamError) -> StreamError {
        warn!(
            run_id = %self.config.run_id,
            tags = ?self.config.tags,
            line = self.lines.line_number(),
            error = %error,
            "Event stream failed"
        );
        self.poisoned = true;
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::FnHooks;
    use std::io;
    use std::sync::{Arc, Mutex};
    use vigil_core::execution::ExecutionStatus;

    const INIT: &str = r#"{"op":"init","createdAt":"2024-05-01T10:00:00Z","execution":{"_id":"exec-1","status":"pending","updatedAt":"2024-05-01T10:00:00Z"}}"#;
    const RUNNING: &str = r#"{"op":"updateStatus","createdAt":"2024-05-01T10:00:01Z","status":"running"}"#;
    const FINISHED: &str = r#"{"op":"updateStatus","createdAt":"2024-05-01T10:00:04Z","status":"finished"}"#;

    fn lines(parts: &[&str]) -> Vec<u8> {
        let mut out = String::new();
        for part in parts {
            out.push_str(part);
            out.push('\n');
        }
        out.into_bytes()
    }

    #[test]
    fn finished_stream_reports_final_snapshot() {
        let mut tracker = ExecutionTracker::default();
        tracker.push(&lines(&[INIT, RUNNING, FINISHED]), &mut ()).unwrap();
        assert!(tracker.is_finished());
        assert_eq!(tracker.events_applied(), 3);

        let outcome = tracker.finish(&mut ()).unwrap();
        assert!(outcome.is_finished());
        let execution = outcome.into_execution().unwrap();
        assert_eq!(execution.status, ExecutionStatus::Finished);
        assert_eq!(execution.finished_at, Some("2024-05-01T10:00:04Z".parse().unwrap()));
    }

    #[test]
    fn unterminated_last_line_is_flushed_on_finish() {
        let mut tracker = ExecutionTracker::default();
        let mut bytes = lines(&[INIT, RUNNING]);
        bytes.extend_from_slice(FINISHED.as_bytes());
        tracker.push(&bytes, &mut ()).unwrap();
        assert!(!tracker.is_finished());

        let outcome = tracker.finish(&mut ()).unwrap();
        assert!(outcome.is_finished());
    }

    #[test]
    fn stream_ending_early_is_incomplete() {
        let mut tracker = ExecutionTracker::default();
        tracker.push(&lines(&[INIT, RUNNING]), &mut ()).unwrap();
        match tracker.finish(&mut ()).unwrap() {
            StreamOutcome::Incomplete(Some(execution)) => {
                assert_eq!(execution.status, ExecutionStatus::Running)
            }
            other => panic!("Expected Incomplete, got {other:?}"),
        }
    }

    #[test]
    fn empty_stream_is_incomplete_without_snapshot() {
        let mut tracker = ExecutionTracker::default();
        assert_eq!(tracker.finish(&mut ()).unwrap(), StreamOutcome::Incomplete(None));
    }

    #[test]
    fn error_poisons_tracker_and_keeps_snapshot() {
        let mut tracker = ExecutionTracker::default();
        tracker.push(&lines(&[INIT, RUNNING]), &mut ()).unwrap();
        let before = tracker.snapshot().cloned();

        let err = tracker.push(b"{not json}\n", &mut ()).unwrap_err();
        assert!(err.is_decode());
        assert!(tracker.is_poisoned());
        assert_eq!(tracker.snapshot().cloned(), before);

        assert!(matches!(
            tracker.push(FINISHED.as_bytes(), &mut ()),
            Err(StreamError::Poisoned)
        ));
        assert!(matches!(tracker.finish(&mut ()), Err(StreamError::Poisoned)));
    }

    #[test]
    fn event_before_init_is_sequence_error() {
        let mut tracker = ExecutionTracker::default();
        let err = tracker.push(&lines(&[RUNNING]), &mut ()).unwrap_err();
        assert!(matches!(err, StreamError::Sequence { .. }));
        assert!(tracker.snapshot().is_none());
    }

    #[test]
    fn hooks_see_post_reduction_snapshots() {
        let mut statuses = Vec::new();
        let mut finishes = 0;
        {
            let mut hooks = FnHooks::new(
                |_: &ExecutionEvent, execution: Option<&Execution>| {
                    statuses.push(execution.map(|e| e.status))
                },
                |_: &Execution| finishes += 1,
            );
            let mut tracker = ExecutionTracker::default();
            tracker
                .push(&lines(&[INIT, RUNNING, FINISHED, FINISHED]), &mut hooks)
                .unwrap();
        }
        assert_eq!(
            statuses,
            vec![
                Some(ExecutionStatus::Pending),
                Some(ExecutionStatus::Running),
                Some(ExecutionStatus::Finished),
                Some(ExecutionStatus::Finished),
            ]
        );
        assert_eq!(finishes, 1);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn log_records_carry_config_tags() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let config = StreamConfig::new().with_tag("replay").with_tag("nightly");
            let mut tracker = ExecutionTracker::new(config);
            tracker.push(&lines(&[INIT, FINISHED]), &mut ()).unwrap();
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let records: Vec<&str> = output.lines().collect();
        assert_eq!(records.len(), 2, "{output}");
        assert!(records[0].contains("Execution initialized"));
        assert!(records[1].contains("Execution finished"));
        for record in records {
            assert!(record.contains(r#"tags=["replay", "nightly"]"#), "{record}");
        }
    }

    #[test]
    fn line_limit_comes_from_config() {
        let config = StreamConfig::new().with_max_line_bytes(16);
        let mut tracker = ExecutionTracker::new(config);
        let err = tracker.push(&lines(&[INIT]), &mut ()).unwrap_err();
        assert!(matches!(
            err,
            StreamError::Decode(vigil_core::error::DecodeError::LineTooLong { limit: 16 })
        ));
    }
}
