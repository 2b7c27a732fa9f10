use std::fmt;

/// Request-scoped logger for pipeline steps.
///
/// Every message carries the request id and the step name as structured
/// `tracing` fields, so a fault can be traced back to the request that
/// triggered it without logging any request data.
///
/// Emits through the `tracing` facade only; installing a subscriber is the
/// application's job.
#[derive(Debug, Clone, Copy)]
pub struct StepLog<'a> {
    request_id: &'a str,
    step: &'static str,
}

impl<'a> StepLog<'a> {
    /// Creates a logger for one step of one request.
    pub fn new(request_id: &'a str, step: &'static str) -> Self {
        Self { request_id, step }
    }

    /// Returns the request id attached to every message.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Returns the step name attached to every message.
    pub fn step(&self) -> &'static str {
        self.step
    }

    /// Logs a debug-level message.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, step = self.step, "{}", args);
    }

    /// Logs a warning-level message.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, step = self.step, "{}", args);
    }

    /// Logs an error-level message.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %self.request_id, step = self.step, "{}", args);
    }
}
