#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    MissingCredentials,
    Timeout,
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableReason::MissingCredentials => write!(f, "no planner api key configured"),
            UnavailableReason::Timeout => write!(f, "planner request timed out"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("planner unavailable: {reason}")]
    Unavailable { reason: UnavailableReason },
    #[error("planner call failed: {0}")]
    Failed(String),
    #[error("planner output could not be parsed: {0}")]
    InvalidOutput(String),
}

impl PlannerError {
    pub fn unavailable(reason: UnavailableReason) -> Self {
        Self::Unavailable { reason }
    }
}
