use super::domain::{
    Answer, AnswerVariant, Identity, Interview, InterviewDraft, InterviewId, Question,
    QuestionDraft, QuestionId, QuestionSet, QuestionSetDraft, QuestionSetId,
};
use super::error::ValidationError;

/// An entity managed through the generic repository interface.
pub trait Record: Clone + Send + Sync {
    type Id: Copy + Ord + std::fmt::Display + Into<u64> + Send + Sync;
    type Draft: Send;

    /// Name used in log fields and error messages.
    const ENTITY: &'static str;

    fn id(&self) -> Self::Id;
}

impl Record for QuestionSet {
    type Id = QuestionSetId;
    type Draft = QuestionSetDraft;
    const ENTITY: &'static str = "question set";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Record for Question {
    type Id = QuestionId;
    type Draft = QuestionDraft;
    const ENTITY: &'static str = "question";

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Check run by [`SurveyStore::replace_answers`] against the interview, the question, and its
/// variants as they stand while the replacement holds the store.
pub type AnswerCheck<'a> =
    dyn Fn(&Interview, &Question, &[AnswerVariant]) -> Result<(), ValidationError> + 'a;

/// Plain CRUD over one entity type.
pub trait Repository<T: Record>: Send + Sync {
    fn list(&self) -> Result<Vec<T>, RepositoryError>;
    fn get(&self, id: T::Id) -> Result<Option<T>, RepositoryError>;
    fn create(&self, draft: T::Draft) -> Result<T, RepositoryError>;
    fn update(&self, record: T) -> Result<T, RepositoryError>;
    /// Removes the record and everything it owns.
    fn delete(&self, id: T::Id) -> Result<(), RepositoryError>;
}

/// Storage abstraction for the questionnaire services.
///
/// Every method is one transaction: it either applies completely or leaves the store untouched.
pub trait SurveyStore: Repository<QuestionSet> + Repository<Question> {
    fn questions_in_set(&self, question_set: QuestionSetId)
        -> Result<Vec<Question>, RepositoryError>;

    fn variants(&self, question: QuestionId) -> Result<Vec<AnswerVariant>, RepositoryError>;

    /// Writes a new question together with its variant set.
    fn create_question(
        &self,
        draft: QuestionDraft,
        variants: Vec<String>,
    ) -> Result<(Question, Vec<AnswerVariant>), RepositoryError>;

    /// Writes an existing question. `None` keeps the current variants, `Some` replaces them.
    ///
    /// Moving the question to another set or changing its answer type discards every answer
    /// stored for it.
    fn update_question(
        &self,
        question: Question,
        variants: Option<Vec<String>>,
    ) -> Result<(Question, Vec<AnswerVariant>), RepositoryError>;

    fn insert_interview(&self, draft: InterviewDraft) -> Result<Interview, RepositoryError>;

    fn interview(&self, id: InterviewId) -> Result<Option<Interview>, RepositoryError>;

    fn interviews_for(&self, identity: Identity) -> Result<Vec<Interview>, RepositoryError>;

    fn answers(
        &self,
        interview: InterviewId,
        question: QuestionId,
    ) -> Result<Vec<Answer>, RepositoryError>;

    /// Swaps the whole answer set of one (interview, question) pair.
    ///
    /// `check` runs first, with catalog writes held off until the swap completes. Concurrent
    /// calls for the same pair serialize; readers observe either the old or the new set, never
    /// a partially written one.
    fn replace_answers(
        &self,
        interview: InterviewId,
        question: QuestionId,
        texts: Vec<String>,
        check: &AnswerCheck<'_>,
    ) -> Result<Vec<Answer>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("referenced {0} does not exist")]
    MissingReference(&'static str),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Rejected(#[from] ValidationError),
}
