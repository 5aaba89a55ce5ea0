use crate::safety::PolicyViolation;

#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("unregistered capability: {name}")]
    Unregistered { name: String },
    #[error("capability `{name}` is already registered")]
    DuplicateCapability { name: String },
    #[error("invalid capability name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },
    #[error("missing required argument `{arg}`")]
    MissingArgument { arg: String },
    #[error("invalid type for argument `{arg}`; expected {expected}")]
    InvalidArgumentType { arg: String, expected: String },
    #[error("invalid value for argument `{arg}`: {reason}")]
    InvalidArgumentValue { arg: String, reason: String },
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub fn io_error(path: &std::path::Path, source: std::io::Error) -> CapabilityError {
    CapabilityError::Io {
        path: path.display().to_string(),
        source,
    }
}
