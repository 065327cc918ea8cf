//! Question sets, interviews, and the answer registration engine.
//!
//! Storage goes through [`SurveyStore`], so every service here runs against the in-memory store
//! as well as any other backend that honours its transaction contract.

pub mod answers;
pub mod catalog;
pub mod domain;
pub mod eligibility;
pub mod error;
pub mod queries;
pub mod repository;
pub mod router;
pub mod service;
pub mod sessions;
pub mod store;

#[cfg(test)]
mod tests;

pub use answers::AnswerRegistrationEngine;
pub use catalog::{AccessPolicy, QuestionCatalog, QuestionPatch, QuestionSetPatch, QuestionView};
pub use domain::{
    Answer, AnswerId, AnswerType, AnswerVariant, AnswerVariantId, Caller, Identity, Interview,
    InterviewDraft, InterviewId, IntervieweeId, Question, QuestionDraft, QuestionId, QuestionSet,
    QuestionSetDraft, QuestionSetId, UserId,
};
pub use eligibility::{BoundaryPolicy, EligibilityChecker};
pub use error::{SurveyError, ValidationError};
pub use queries::{
    AnsweredQuestionSetView, AnsweredQuestionView, InterviewHistoryView, InterviewQueryService,
    InterviewView, QuestionSetView,
};
pub use repository::{Record, Repository, RepositoryError, SurveyStore};
pub use router::{survey_router, USER_HEADER};
pub use service::{Clock, FixedClock, SurveyService, SystemClock};
pub use sessions::{InterviewSessionManager, CALLER_SENTINEL};
pub use store::InMemorySurveyStore;
