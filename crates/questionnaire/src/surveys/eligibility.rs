use chrono::{DateTime, Utc};

use super::domain::QuestionSet;

/// How the edges of a question set's window are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoundaryPolicy {
    /// Open from `start_date` through `end_date`, both included.
    #[default]
    Inclusive,
    /// Open strictly after `start_date` and strictly before `end_date`.
    Exclusive,
}

/// Decides whether a question set currently accepts interviews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EligibilityChecker {
    policy: BoundaryPolicy,
}

impl EligibilityChecker {
    pub const fn new(policy: BoundaryPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> BoundaryPolicy {
        self.policy
    }

    pub fn is_open(&self, question_set: &QuestionSet, at: DateTime<Utc>) -> bool {
        match self.policy {
            BoundaryPolicy::Inclusive => {
                question_set.start_date <= at && question_set.end_date.map_or(true, |end| end >= at)
            }
            BoundaryPolicy::Exclusive => {
                question_set.start_date < at && question_set.end_date.map_or(true, |end| end > at)
            }
        }
    }
}
