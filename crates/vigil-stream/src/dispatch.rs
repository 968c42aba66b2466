use vigil_core::event::ExecutionEvent;
use vigil_core::execution::Execution;

/// Caller-supplied observers for one execution stream.
///
/// Both methods default to no-ops, so implementors override only what they
/// need. `()` is the empty hook set.
pub trait ExecutionHooks {
    /// Called after each decoded event has been reduced, with the resulting
    /// snapshot.
    fn on_event(&mut self, _event: &ExecutionEvent, _execution: Option<&Execution>) {}

    /// Called once, the first time an execution-level status update leaves
    /// the snapshot in a terminal status.
    fn on_finish(&mut self, _execution: &Execution) {}
}

impl ExecutionHooks for () {}

impl<H: ExecutionHooks + ?Sized> ExecutionHooks for &mut H {
    fn on_event(&mut self, event: &ExecutionEvent, execution: Option<&Execution>) {
        (**self).on_event(event, execution);
    }

    fn on_finish(&mut self, execution: &Execution) {
        (**self).on_finish(execution);
    }
}

impl<H: ExecutionHooks + ?Sized> ExecutionHooks for Box<H> {
    fn on_event(&mut self, event: &ExecutionEvent, execution: Option<&Execution>) {
        (**self).on_event(event, execution);
    }

    fn on_finish(&mut self, execution: &Execution) {
        (**self).on_finish(execution);
    }
}

/// Adapts a pair of closures into [`ExecutionHooks`].
pub struct FnHooks<E, F> {
    on_event: E,
    on_finish: F,
}

impl<E, F> FnHooks<E, F>
where
    E: FnMut(&ExecutionEvent, Option<&Execution>),
    F: FnMut(&Execution),
{
    pub fn new(on_event: E, on_finish: F) -> Self {
        Self {
            on_event,
            on_finish,
        }
    }
}

impl<E, F> ExecutionHooks for FnHooks<E, F>
where
    E: FnMut(&ExecutionEvent, Option<&Execution>),
    F: FnMut(&Execution),
{
    fn on_event(&mut self, event: &ExecutionEvent, execution: Option<&Execution>) {
        (self.on_event)(event, execution);
    }

    fn on_finish(&mut self, execution: &Execution) {
        (self.on_finish)(execution);
    }
}

/// Remembers whether the finish hook has already fired for a stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalDetector {
    fired: bool,
}

impl TerminalDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once: for the first status update that leaves
    /// `execution` terminal.
    pub fn observe(&mut self, event: &ExecutionEvent, execution: &Execution) -> bool {
        if self.fired || !event.is_status_update() || !execution.status.is_terminal() {
            return false;
        }
        self.fired = true;
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

/// Invoke the hooks for one reduced event. Returns `true` if this call
/// fired the finish hook.
pub fn dispatch<H: ExecutionHooks + ?Sized>(
    hooks: &mut H,
    detector: &mut TerminalDetector,
    event: &ExecutionEvent,
    execution: Option<&Execution>,
) -> bool {
    hooks.on_event(event, execution);
    match execution {
        Some(execution) if detector.observe(event, execution) => {
            hooks.on_finish(execution);
            true
        }
        _ => false,
    }
}
