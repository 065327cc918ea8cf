use super::repository::RepositoryError;

/// Domain rule violations reported back to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("inactive question set")]
    InactiveQuestionSet,
    #[error("question not in interview's question set")]
    QuestionOutOfScope,
    #[error("exactly one answer required")]
    ExactlyOneAnswerRequired,
    #[error("answer not in allowed variants")]
    UnknownVariant { answer: String },
    #[error("start date cannot be changed after creation")]
    StartDateChanged,
    #[error("end date must not precede start date")]
    EndBeforeStart,
    #[error("{field} must not be blank")]
    Blank { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

/// Error raised by the questionnaire services.
#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    #[error("authentication required")]
    Unauthorized,
    #[error("not permitted: {0}")]
    Forbidden(&'static str),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SurveyError {
    pub fn not_found(entity: &'static str, id: impl Into<u64>) -> Self {
        SurveyError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
