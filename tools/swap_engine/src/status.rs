use serde::{Deserialize, Serialize};

/// User-visible outcome of a swap session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Ongoing,
    CompletedSuccess,
    CompletedRefund,
    CompletedAbort,
}

impl Status {
    pub fn is_ongoing(&self) -> bool {
        matches!(self, Status::Ongoing)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_ongoing()
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Status::Ongoing => "ongoing",
            Status::CompletedSuccess => "completed: success",
            Status::CompletedRefund => "completed: refund",
            Status::CompletedAbort => "completed: abort",
        };
        f.write_str(label)
    }
}
