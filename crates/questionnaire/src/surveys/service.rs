use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::answers::AnswerRegistrationEngine;
use super::catalog::{AccessPolicy, QuestionCatalog};
use super::domain::{Answer, Caller, Interview, InterviewId, QuestionId, QuestionSetId, UserId};
use super::eligibility::EligibilityChecker;
use super::error::SurveyError;
use super::queries::InterviewQueryService;
use super::repository::SurveyStore;
use super::sessions::InterviewSessionManager;
use crate::config::SurveyConfig;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for demos and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Service composing the session manager, answer engine, catalog, and read side.
pub struct SurveyService<S> {
    sessions: InterviewSessionManager<S>,
    answers: AnswerRegistrationEngine<S>,
    catalog: QuestionCatalog<S>,
    queries: InterviewQueryService<S>,
    access: AccessPolicy,
    clock: Arc<dyn Clock>,
}

impl<S> SurveyService<S>
where
    S: SurveyStore + 'static,
{
    pub fn new(store: Arc<S>, config: &SurveyConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, config: &SurveyConfig, clock: Arc<dyn Clock>) -> Self {
        let eligibility = EligibilityChecker::new(config.boundary);
        Self {
            sessions: InterviewSessionManager::new(store.clone(), eligibility),
            answers: AnswerRegistrationEngine::new(store.clone()),
            catalog: QuestionCatalog::new(store.clone()),
            queries: InterviewQueryService::new(store, eligibility),
            access: AccessPolicy::new(config.admin_users.clone()),
            clock,
        }
    }

    pub fn caller(&self, user: Option<UserId>) -> Caller {
        self.access.caller(user)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn start_interview(
        &self,
        question_set_id: QuestionSetId,
        interviewee_id: u64,
        caller: &Caller,
    ) -> Result<Interview, SurveyError> {
        self.sessions
            .start_interview(question_set_id, interviewee_id, caller, self.now())
    }

    pub fn register_answers(
        &self,
        interview_id: InterviewId,
        question_id: QuestionId,
        answers: Vec<String>,
        caller: &Caller,
    ) -> Result<Vec<Answer>, SurveyError> {
        self.answers
            .register_answers(interview_id, question_id, answers, caller)
    }

    pub fn catalog(&self) -> &QuestionCatalog<S> {
        &self.catalog
    }

    pub fn queries(&self) -> &InterviewQueryService<S> {
        &self.queries
    }
}
