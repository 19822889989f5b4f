use remoting_core::SignatureError;

/// Fatal errors raised while resolving a service factory or building the
/// artifacts it depends on. None of these are retried at this layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceResolutionError {
    #[error("destination not found: {destination_id} (message type {message_type})")]
    DestinationNotFound {
        message_type: String,
        destination_id: String,
    },
    #[error("missing signature in remove-method declaration of {class}")]
    MissingSignature { class: String },
    #[error("could not find method: {class}.{signature}")]
    MethodNotFound {
        class: String,
        signature: String,
        #[source]
        parse_error: Option<SignatureError>,
    },
    #[error("could not instantiate factory: {class_name}")]
    FactoryInstantiation {
        class_name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("could not instantiate service exception handler: {class_name}: {reason}")]
    ExceptionHandlerInstantiation { class_name: String, reason: String },
    #[error("destination {destination_id} has no source class")]
    MissingSource { destination_id: String },
    #[error("service class not registered: {class_name} (destination {destination_id})")]
    ServiceClassNotFound {
        destination_id: String,
        class_name: String,
    },
}
