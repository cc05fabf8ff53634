use crate::response::ObjectOutcome;

/// All errors that can be returned while talking to the Icinga 2 API or
/// navigating the results it returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The API answered with a non-success status. Per-object outcomes are
    /// carried along when the server reported them.
    #[error("request failed with status {status}: {message}")]
    RequestFailed {
        status: u16,
        message: String,
        outcomes: Vec<ObjectOutcome>,
    },

    /// A dot-path segment was absent. A present `null` is not an error.
    #[error("key not found: {path}")]
    KeyNotFound { path: String },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: isize, len: usize },

    /// A caller-supplied argument is unusable (zero slice step, empty name).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The type name is not known, even after fetching the remote schema.
    #[error("unknown type: {name}")]
    UnknownType { name: String },

    /// The remote type schema is inconsistent (inheritance cycle, malformed entry).
    #[error("schema error: {0}")]
    SchemaError(String),

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Connection, TLS or decoding failure below the API level.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("field '{field}' is not viewable")]
    NoUserView { field: String },

    #[error("field '{field}' is not modifiable: {reason}")]
    NoUserModify { field: String, reason: String },

    /// The resolved type lacks the capability required by the operation.
    #[error("{operation} is not supported for type {type_name}")]
    Unsupported {
        operation: String,
        type_name: String,
    },
}

impl ApiError {
    /// Shorthand for a `KeyNotFound` on the given path.
    pub fn key_not_found(path: impl Into<String>) -> Self {
        ApiError::KeyNotFound { path: path.into() }
    }

    /// Per-object outcomes of a failed request, empty for every other kind.
    pub fn outcomes(&self) -> &[ObjectOutcome] {
        match self {
            ApiError::RequestFailed { outcomes, .. } => outcomes,
            _ => &[],
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = ApiError::key_not_found("attrs.state");
        assert_eq!(e.to_string(), "key not found: attrs.state");

        let e = ApiError::IndexOutOfRange { index: -3, len: 2 };
        assert_eq!(e.to_string(), "index -3 out of range for length 2");

        let e = ApiError::RequestFailed {
            status: 404,
            message: "No objects found.".into(),
            outcomes: vec![],
        };
        assert_eq!(
            e.to_string(),
            "request failed with status 404: No objects found."
        );
    }

    #[test]
    fn outcomes_only_for_request_failures() {
        let outcome = ObjectOutcome {
            code: 500,
            status: "Attribute could not be set.".into(),
            name: Some("h1".into()),
            type_name: Some("Host".into()),
            errors: vec![],
        };
        let e = ApiError::RequestFailed {
            status: 500,
            message: "x".into(),
            outcomes: vec![outcome.clone()],
        };
        assert_eq!(e.outcomes(), &[outcome]);
        assert!(ApiError::Transport("x".into()).outcomes().is_empty());
    }
}
