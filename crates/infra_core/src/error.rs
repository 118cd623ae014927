use std::path::PathBuf;

/// Errors raised while declaring or synthesizing stacks.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("stack '{stack}' already declares a resource with logical id '{logical_id}'")]
    DuplicateLogicalId { stack: String, logical_id: String },

    #[error("stack '{stack}' already declares an output named '{name}'")]
    DuplicateOutput { stack: String, name: String },

    #[error("app already contains a stack named '{stack}'")]
    DuplicateStack { stack: String },

    #[error("stack '{stack}': '{from}' references undeclared logical id '{target}'")]
    DanglingReference {
        stack: String,
        from: String,
        target: String,
    },

    #[error("stack '{stack}' declares no resources")]
    EmptyStack { stack: String },

    #[error("invalid stack name '{name}': {reason}")]
    InvalidStackName { name: String, reason: String },

    #[error("invalid logical id '{logical_id}': must be non-empty and alphanumeric")]
    InvalidLogicalId { logical_id: String },

    #[error("invalid {kind} '{value}': {reason}")]
    InvalidValue {
        kind: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SynthError {
    pub fn invalid_value(
        kind: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            kind,
            value: value.into(),
            reason: reason.into(),
        }
    }
}
