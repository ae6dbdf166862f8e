//! Provider error type

use thiserror::Error;

/// Failure of a provider operation
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Remote call failed (after retries, for transient kinds)
    #[error(transparent)]
    Api(#[from] crmkit::Error),

    /// A search found an existing object that disagrees with the declaration
    /// on a field that cannot be changed in place
    #[error(
        "{kind} {name}: existing object has {field} = {found}, declaration says {declared}; \
         rename one of them or remove the existing object"
    )]
    Mismatch {
        kind: &'static str,
        name: String,
        field: &'static str,
        declared: String,
        found: String,
    },

    /// The operation is not part of this kind's contract
    #[error("{kind} does not support {operation}")]
    Unsupported {
        kind: &'static str,
        operation: &'static str,
    },

    /// Declared properties do not decode or are inconsistent
    #[error("invalid {kind} declaration: {message}")]
    InvalidDeclaration { kind: &'static str, message: String },

    /// Recorded output does not decode
    #[error("invalid {kind} output: {message}")]
    InvalidOutput { kind: &'static str, message: String },
}

impl ProviderError {
    /// Short machine-readable tag
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Api(e) => e.kind().tag(),
            Self::Mismatch { .. } => "mismatch",
            Self::Unsupported { .. } => "unsupported",
            Self::InvalidDeclaration { .. } => "invalid_declaration",
            Self::InvalidOutput { .. } => "invalid_output",
        }
    }

    /// Actionable advice for the user
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Api(e) => e.kind().advice(),
            Self::Mismatch { .. } => {
                "The remote object was not adopted. Change the declaration or the remote object"
            }
            Self::Unsupported {
                operation: "replace",
                ..
            } => {
                "The existing object cannot be deleted through the API. Revert the fields that \
                 force a replacement, or declare the object under a new api_slug"
            }
            Self::Unsupported { .. } => "This is a bug: the operation should never be planned",
            Self::InvalidDeclaration { .. } => "Fix the resource properties in the stack file",
            Self::InvalidOutput { .. } => {
                "The state file is damaged; run `crmform refresh` or remove the entry"
            }
        }
    }

    /// Whether the remote API reported the object missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_not_found())
    }

    pub(crate) fn declaration(kind: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            kind,
            message: message.into(),
        }
    }
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;
