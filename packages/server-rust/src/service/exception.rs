//! Exception handling strategies attached to every service factory.
//!
//! A factory's configure step picks the handler from two property keys:
//!
//! | key | values | effect |
//! |---|---|---|
//! | `service-exception-handler` | registered class name | overrides the default handler |
//! | `enable-exception-logging` | `"true"` / `"false"` / absent | picks the handler's boolean constructor; absent or unrecognized uses its no-argument form |

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use remoting_core::{Properties, RemotingRequest};
use serde::Serialize;
use tracing::{debug, error};

use super::error::ServiceResolutionError;
use super::registry::ComponentRegistry;

/// Property naming the exception handler class.
pub const EXCEPTION_HANDLER_KEY: &str = "service-exception-handler";
/// Property toggling exception logging inside the handler.
pub const ENABLE_LOGGING_KEY: &str = "enable-exception-logging";
/// Fault code reported for failed service calls.
pub const CALL_FAILED_CODE: &str = "Server.Call.Failed";

// ---------------------------------------------------------------------------
// ServiceFault
// ---------------------------------------------------------------------------

/// Fault returned to the caller when a service call fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceFault {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// ---------------------------------------------------------------------------
// ExceptionHandler trait
// ---------------------------------------------------------------------------

/// Converts a failed service call into a [`ServiceFault`].
pub trait ExceptionHandler: Any + Send + Sync + fmt::Debug {
    /// Whether failures are logged before being converted.
    fn logging_enabled(&self) -> bool;

    /// Converts `error`, raised while serving `request`, into a fault.
    fn handle(&self, request: &RemotingRequest, error: &anyhow::Error) -> ServiceFault;

    /// Enables downcasting to the concrete handler type.
    fn as_any(&self) -> &dyn Any;
}

fn log_failure(request: &RemotingRequest, error: &anyhow::Error) {
    error!(
        destination = %request.destination,
        operation = %request.operation,
        "Could not process remoting message: {error:#}"
    );
}

/// Default handler: fault message only. Logging is on unless disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultExceptionHandler {
    log: bool,
}

impl DefaultExceptionHandler {
    pub const CLASS_NAME: &'static str = "remoting.DefaultExceptionHandler";

    #[must_use]
    pub fn new(log: bool) -> Self {
        Self { log }
    }
}

impl Default for DefaultExceptionHandler {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ExceptionHandler for DefaultExceptionHandler {
    fn logging_enabled(&self) -> bool {
        self.log
    }

    fn handle(&self, request: &RemotingRequest, error: &anyhow::Error) -> ServiceFault {
        if self.log {
            log_failure(request, error);
        }
        ServiceFault {
            code: CALL_FAILED_CODE.to_string(),
            message: error.to_string(),
            details: None,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Like [`DefaultExceptionHandler`], but reports the cause chain in
/// [`ServiceFault::details`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedExceptionHandler {
    log: bool,
}

impl ExtendedExceptionHandler {
    pub const CLASS_NAME: &'static str = "remoting.ExtendedExceptionHandler";

    #[must_use]
    pub fn new(log: bool) -> Self {
        Self { log }
    }
}

impl Default for ExtendedExceptionHandler {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ExceptionHandler for ExtendedExceptionHandler {
    fn logging_enabled(&self) -> bool {
        self.log
    }

    fn handle(&self, request: &RemotingRequest, error: &anyhow::Error) -> ServiceFault {
        if self.log {
            log_failure(request, error);
        }
        let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
        ServiceFault {
            code: CALL_FAILED_CODE.to_string(),
            message: error.to_string(),
            details: (!causes.is_empty()).then(|| causes.join("\ncaused by: ")),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Reads the logging flag. Only the exact literals `"true"` and `"false"`
/// are recognized.
#[must_use]
pub fn parse_logging_flag(value: Option<&str>) -> Option<bool> {
    match value {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

/// Picks and constructs the exception handler described by `properties`.
///
/// # Errors
///
/// Returns [`ServiceResolutionError::ExceptionHandlerInstantiation`] if the
/// named class is not registered or lacks the constructor form required by
/// the logging flag.
pub fn select_exception_handler(
    properties: &Properties,
    registry: &ComponentRegistry,
) -> Result<Arc<dyn ExceptionHandler>, ServiceResolutionError> {
    let logging = parse_logging_flag(properties.get(ENABLE_LOGGING_KEY));

    let Some(class_name) = properties.get(EXCEPTION_HANDLER_KEY).map(str::trim) else {
        let handler: Arc<dyn ExceptionHandler> = match logging {
            Some(log) => Arc::new(DefaultExceptionHandler::new(log)),
            None => Arc::new(DefaultExceptionHandler::default()),
        };
        return Ok(handler);
    };

    debug!("Instantiating service exception handler: {class_name} (logging: {logging:?})");

    let constructor = registry.exception_handler(class_name).ok_or_else(|| {
        ServiceResolutionError::ExceptionHandlerInstantiation {
            class_name: class_name.to_string(),
            reason: "class not registered".to_string(),
        }
    })?;

    constructor
        .instantiate(logging)
        .map_err(|reason| ServiceResolutionError::ExceptionHandlerInstantiation {
            class_name: class_name.to_string(),
            reason: reason.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
