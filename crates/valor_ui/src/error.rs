use core::fmt;
use std::error::Error;

/// Errors surfaced by mounting, reconciling and updating component trees.
///
/// Every variant is fatal to the call that triggered it; nothing is retried.
#[derive(Debug)]
pub enum UiError {
    /// The render target is not an addressable container node.
    InvalidTarget(String),
    /// A ref was attached from an instance that did not render the element.
    RefOwnershipViolation(String),
    /// Props were transferred onto an element rendered by another owner.
    OwnershipViolation(String),
    /// The operation would unmount a document-level node.
    UnmountForbidden(String),
    /// Client markup does not match the checksum embedded by the server.
    ChecksumMismatch { expected: u32, actual: u32 },
    /// A document target was rendered into without server markup present.
    MissingServerMarkup,
    /// A document target's root element is not `html > head, body`.
    InvalidDocumentRoot(String),
    /// `set_props` was called on an instance that is not a root.
    SetPropsOnChild(String),
    /// The instance has been unmounted.
    StaleInstance,
    /// The host document rejected an update.
    Host(anyhow::Error),
}

impl fmt::Display for UiError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTarget(msg) => write!(formatter, "Invalid render target: {msg}"),
            Self::RefOwnershipViolation(msg) => write!(
                formatter,
                "Only a component's owner can store a ref to it: {msg}"
            ),
            Self::OwnershipViolation(msg) => write!(
                formatter,
                "You can't transfer props to a component that you don't own: {msg}"
            ),
            Self::UnmountForbidden(msg) => write!(
                formatter,
                "Cannot reliably unmount document-level nodes across environments: {msg}"
            ),
            Self::ChecksumMismatch { expected, actual } => write!(
                formatter,
                "Markup checksum mismatch: server rendered {expected}, client rendered {actual}; \
                 render output must not depend on the environment"
            ),
            Self::MissingServerMarkup => write!(
                formatter,
                "Rendering into the document requires server-rendered markup"
            ),
            Self::InvalidDocumentRoot(msg) => write!(
                formatter,
                "Document root must be <html> with <head> and <body>: {msg}"
            ),
            Self::SetPropsOnChild(msg) => write!(
                formatter,
                "set_props is only valid on a root instance: {msg}"
            ),
            Self::StaleInstance => write!(formatter, "Instance is no longer mounted"),
            Self::Host(err) => write!(formatter, "Host document error: {err}"),
        }
    }
}

impl Error for UiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Host(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for UiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Host(err)
    }
}
