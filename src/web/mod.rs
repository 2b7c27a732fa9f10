//! Web framework integration surface.
//!
//! This module is the boundary between HTTP frameworks and the sanitizers.
//! It provides:
//! - [`IncomingRequest`]: an owned, framework-agnostic view of the request
//! - [`RequestStep`]: one stage of request processing
//! - [`Pipeline`]: an ordered list of steps with fail-open fault handling
//!
//! # Design Principles
//!
//! 1. **No Framework Dependencies**: nothing here knows about a particular
//!    framework. Integrations copy their request into an `IncomingRequest`
//!    and copy the sanitized parts back.
//!
//! 2. **Fail open on faults, closed on rejections**: a sanitizing step that
//!    fails internally is logged and skipped, leaving the request as it was.
//!    The size guard and shape validator stop the pipeline and answer the
//!    client.
//!
//! 3. **Shared, immutable policy**: every step holds an
//!    `Arc<SanitizePolicy>` and never mutates it, so one pipeline can serve
//!    any number of concurrent requests.
//!
//! # Integration Flow
//!
//! ```text
//! HTTP Request
//!   ↓
//! Framework code builds IncomingRequest
//!   ↓
//! Pipeline::run()
//!   ↓
//! Flow::Continue           Flow::Respond(rejection)
//!   ↓                        ↓
//! copy parts back,         status_code() + body()
//! call route handler       as the JSON response
//! ```
//!
//! # Example Flow
//!
//! ```
//! use std::sync::Arc;
//! use sanitize_core::web::{Flow, IncomingRequest, Pipeline};
//! use sanitize_core::{SanitizableValue, SanitizePolicy};
//! use serde_json::json;
//!
//! let policy = Arc::new(SanitizePolicy::default());
//! let pipeline = Pipeline::standard(policy);
//!
//! let mut request = IncomingRequest::new("req-42").with_body(SanitizableValue::from(json!({
//!     "email": "not-an-email"
//! })));
//!
//! match pipeline.run(&mut request) {
//!     Flow::Continue => unreachable!(),
//!     Flow::Respond(rejection) => {
//!         assert_eq!(rejection.status_code(), 400);
//!         let body = serde_json::to_value(rejection.body()).unwrap();
//!         assert_eq!(body, json!({"status": "error", "message": "Invalid email format"}));
//!     }
//! }
//! ```

mod guard;
mod pipeline;
mod request;
mod steps;

pub use guard::{ShapeValidator, SizeGuard};
pub use pipeline::{run_step, Flow, Pipeline, RequestStep};
pub use request::{HeaderValue, IncomingRequest, RequestParts, UploadedFile, UploadedFiles};
pub use steps::{
    ComprehensiveSanitizer, SanitizeFields, SanitizeFileNames, SanitizeHeaders, SanitizePart,
};
