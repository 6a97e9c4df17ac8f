use thiserror::Error;

/// Reply shown to the widget when a request fails in a way nobody planned for.
pub const APOLOGY_MESSAGE: &str =
    "Sorry, I'm having trouble right now. Please contact us directly at hello@querystream.co.uk";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClientInputError {
    #[error("Message is required and must be a string")]
    MissingMessage,
    #[error("Message must not be empty or only whitespace")]
    BlankMessage,
    #[error("Message too long. Please keep it under {limit} characters.")]
    MessageTooLong { limit: usize, actual: usize },
    #[error("invalid request body: {0}")]
    MalformedBody(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    ClientInput(#[from] ClientInputError),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("external call failure: {0}")]
    ExternalCall(String),
    #[error("unhandled failure: {0}")]
    Unhandled(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    /// Text safe to hand back to the widget. Client errors describe the problem,
    /// everything else collapses into the contact-us apology.
    pub fn user_message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. } => message,
            Self::Internal { .. } => APOLOGY_MESSAGE,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. } | Self::Internal { correlation_id, .. } => {
                correlation_id
            }
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::ClientInput(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Configuration(message)
            | ApplicationError::ExternalCall(message)
            | ApplicationError::Unhandled(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
