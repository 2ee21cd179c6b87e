use std::fmt;

/// Errors returned by store, simulator and scheduler operations
#[derive(Debug, Clone, PartialEq)]
pub enum HubError {
    /// Device or task id is absent
    NotFound { kind: &'static str, id: String },
    /// Duplicate id on add
    Conflict { kind: &'static str, id: String },
    UnknownAction(String),
    UnknownSchedule(String),
    UnknownScenario(String),
    /// Out-of-range or mistyped property value
    ValidationError(String),
}

impl HubError {
    pub fn device_not_found(id: &str) -> Self {
        HubError::NotFound {
            kind: "device",
            id: id.to_string(),
        }
    }

    pub fn task_not_found(id: &str) -> Self {
        HubError::NotFound {
            kind: "task",
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        HubError::ValidationError(msg.into())
    }

    /// Stable error kind name for transport layers
    pub fn kind(&self) -> &'static str {
        match self {
            HubError::NotFound { .. } => "NotFound",
            HubError::Conflict { .. } => "Conflict",
            HubError::UnknownAction(_) => "UnknownAction",
            HubError::UnknownSchedule(_) => "UnknownSchedule",
            HubError::UnknownScenario(_) => "UnknownScenario",
            HubError::ValidationError(_) => "ValidationError",
        }
    }
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HubError::NotFound { kind, id } => write!(f, "{} with ID {} not found", kind, id),
            HubError::Conflict { kind, id } => {
                write!(f, "{} with ID {} already exists", kind, id)
            }
            HubError::UnknownAction(a) => write!(f, "unknown task action '{}'", a),
            HubError::UnknownSchedule(s) => write!(f, "unknown schedule '{}'", s),
            HubError::UnknownScenario(s) => write!(f, "unknown automation scenario '{}'", s),
            HubError::ValidationError(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for HubError {}

pub type HubResult<T> = Result<T, HubError>;
