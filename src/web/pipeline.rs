use std::fmt;
use std::sync::Arc;

use crate::error::{Rejection, StepError};
use crate::logging::StepLog;
use crate::SanitizePolicy;

use super::guard::{ShapeValidator, SizeGuard};
use super::steps::ComprehensiveSanitizer;
use super::IncomingRequest;

/// One stage of request processing.
///
/// Implementations must leave `request` untouched when they return an error:
/// compute every replacement first, then assign.
pub trait RequestStep: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Inspects or rewrites the request.
    ///
    /// # Errors
    ///
    /// `StepError::Rejected` stops the pipeline with a client response;
    /// `StepError::Fault` is logged and the request continues unmodified.
    fn apply(&self, request: &mut IncomingRequest) -> Result<(), StepError>;
}

/// What the framework should do after the pipeline ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Hand the (sanitized) request to the route handler.
    Continue,
    /// Answer the client with this rejection instead.
    Respond(Rejection),
}

impl Flow {
    /// Returns `true` if the request should reach the handler.
    pub fn is_continue(&self) -> bool {
        matches!(self, Flow::Continue)
    }
}

/// Runs one step with fail-open semantics for internal faults.
///
/// A rejection is logged at warn level and returned as [`Flow::Respond`]. A
/// fault is logged at error level and swallowed; since steps never modify a
/// request they fail on, the handler sees the request as it was before the step.
pub fn run_step(step: &dyn RequestStep, request: &mut IncomingRequest) -> Flow {
    let request_id = request.request_id().to_string();
    let log = StepLog::new(&request_id, step.name());

    match step.apply(request) {
        Ok(()) => {
            log.debug(format_args!("step completed"));
            Flow::Continue
        }
        Err(StepError::Rejected(rejection)) => {
            log.warn(format_args!("request rejected: {}", rejection));
            Flow::Respond(rejection)
        }
        Err(StepError::Fault(fault)) => {
            log.error(format_args!("sanitization fault, request forwarded unmodified: {}", fault));
            Flow::Continue
        }
    }
}

/// An ordered list of request steps.
///
/// A pipeline is immutable once built and can be shared between threads.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sanitize_core::web::{Flow, IncomingRequest, Pipeline};
/// use sanitize_core::{SanitizableValue, SanitizePolicy};
/// use serde_json::json;
///
/// let pipeline = Pipeline::standard(Arc::new(SanitizePolicy::default()));
/// let mut request = IncomingRequest::new("req-1")
///     .with_body(SanitizableValue::from(json!({"name": "<script>x</script>Ada"})));
///
/// assert_eq!(pipeline.run(&mut request), Flow::Continue);
/// assert_eq!(request.body().get("name").and_then(|v| v.as_str()), Some("Ada"));
/// ```
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn RequestStep>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Size guard, then comprehensive sanitization, then shape validation.
    pub fn standard(policy: Arc<SanitizePolicy>) -> Self {
        Self::new()
            .step(SizeGuard::from_policy(&policy))
            .step(ComprehensiveSanitizer::new(policy))
            .step(ShapeValidator)
    }

    /// Appends a step.
    pub fn step(mut self, step: impl RequestStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if the pipeline has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs every step in order, stopping at the first rejection.
    pub fn run(&self, request: &mut IncomingRequest) -> Flow {
        for step in &self.steps {
            if let Flow::Respond(rejection) = run_step(step.as_ref(), request) {
                return Flow::Respond(rejection);
            }
        }
        Flow::Continue
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.step_names())
            .finish()
    }
}
