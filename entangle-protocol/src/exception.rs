//! Remote exception taxonomy.
//!
//! Exceptions travel as a `(namespace, name, description)` triple. Errors in
//! the reserved [`PROTOCOL_NAMESPACE`] are the fixed set the protocol itself
//! can raise and map to dedicated variants. Everything else, including every
//! application-defined error, is kept verbatim in [`RemoteError::Unknown`].

use thiserror::Error;

/// Namespace reserved for errors raised by the protocol itself.
pub const PROTOCOL_NAMESPACE: &str = "entangle";

/// An error raised by the remote peer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("entangle.BadMessage: {message}")]
    BadMessage { message: String },

    #[error("entangle.InternalServerError: {message}")]
    InternalServerError { message: String },

    #[error("entangle.UnknownMethod: {message}")]
    UnknownMethod { message: String },

    #[error("entangle.InvalidArgument: {message}")]
    InvalidArgument { message: String },

    #[error("{namespace}.{name}: {message}")]
    Unknown {
        namespace: String,
        name: String,
        message: String,
    },
}

impl RemoteError {
    pub fn namespace(&self) -> &str {
        match self {
            RemoteError::Unknown { namespace, .. } => namespace,
            _ => PROTOCOL_NAMESPACE,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RemoteError::BadMessage { .. } => "BadMessage",
            RemoteError::InternalServerError { .. } => "InternalServerError",
            RemoteError::UnknownMethod { .. } => "UnknownMethod",
            RemoteError::InvalidArgument { .. } => "InvalidArgument",
            RemoteError::Unknown { name, .. } => name,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RemoteError::BadMessage { message }
            | RemoteError::InternalServerError { message }
            | RemoteError::UnknownMethod { message }
            | RemoteError::InvalidArgument { message }
            | RemoteError::Unknown { message, .. } => message,
        }
    }

    /// Returns whether this error belongs to the fixed protocol registry.
    pub fn is_protocol_error(&self) -> bool {
        !matches!(self, RemoteError::Unknown { .. })
    }
}

/// Maps a wire exception to a local error.
pub fn parse_exception(namespace: &str, name: &str, message: impl Into<String>) -> RemoteError {
    let message = message.into();

    if namespace == PROTOCOL_NAMESPACE {
        match name {
            "BadMessage" => return RemoteError::BadMessage { message },
            "InternalServerError" => return RemoteError::InternalServerError { message },
            "UnknownMethod" => return RemoteError::UnknownMethod { message },
            "InvalidArgument" => return RemoteError::InvalidArgument { message },
            _ => {}
        }
    }

    RemoteError::Unknown {
        namespace: namespace.to_string(),
        name: name.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exception() {
        for (namespace, name, protocol) in [
            ("entangle", "BadMessage", true),
            ("entangle", "InternalServerError", true),
            ("entangle", "UnknownMethod", true),
            ("entangle", "InvalidArgument", true),
            ("entangle", "Horse", false),
            ("horse", "Horse", false),
            ("horse", "InvalidArgument", false),
        ] {
            let err = parse_exception(namespace, name, "Message");
            assert_eq!(err.is_protocol_error(), protocol, "{}.{}", namespace, name);
            assert_eq!(err.namespace(), namespace);
            assert_eq!(err.name(), name);
            assert_eq!(err.message(), "Message");
        }
    }

    #[test]
    fn test_invalid_argument_kind() {
        let err = parse_exception("entangle", "InvalidArgument", "bad input");
        assert_eq!(
            err,
            RemoteError::InvalidArgument {
                message: "bad input".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_passthrough() {
        let err = parse_exception("custom", "Whatever", "msg");
        assert_eq!(
            err,
            RemoteError::Unknown {
                namespace: "custom".to_string(),
                name: "Whatever".to_string(),
                message: "msg".to_string(),
            }
        );
        assert_eq!(err.to_string(), "custom.Whatever: msg");
    }

    #[test]
    fn test_display_carries_wire_identity() {
        let err = parse_exception("entangle", "UnknownMethod", "frob");
        assert_eq!(err.to_string(), "entangle.UnknownMethod: frob");
    }
}
