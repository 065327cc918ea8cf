use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{
    Caller, Identity, IntervieweeId, Interview, InterviewDraft, QuestionSet, QuestionSetId,
};
use super::eligibility::EligibilityChecker;
use super::error::{SurveyError, ValidationError};
use super::repository::{Record, Repository, SurveyStore};

/// Interviewee id that stands for "the authenticated caller".
pub const CALLER_SENTINEL: u64 = 0;

/// Opens interviews against question sets that are currently accepting them.
pub struct InterviewSessionManager<S> {
    store: Arc<S>,
    eligibility: EligibilityChecker,
}

impl<S> InterviewSessionManager<S>
where
    S: SurveyStore + 'static,
{
    pub fn new(store: Arc<S>, eligibility: EligibilityChecker) -> Self {
        Self { store, eligibility }
    }

    pub fn start_interview(
        &self,
        question_set_id: QuestionSetId,
        interviewee_id: u64,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<Interview, SurveyError> {
        let identity = resolve_identity(interviewee_id, caller)?;

        let question_set = Repository::<QuestionSet>::get(self.store.as_ref(), question_set_id)?
            .ok_or_else(|| SurveyError::not_found(QuestionSet::ENTITY, question_set_id))?;

        if !self.eligibility.is_open(&question_set, now) {
            warn!(%question_set_id, "interview rejected for inactive question set");
            return Err(ValidationError::InactiveQuestionSet.into());
        }

        let interview = self.store.insert_interview(InterviewDraft {
            question_set_id,
            identity,
            start_date: now,
        })?;

        info!(
            interview_id = %interview.id,
            %question_set_id,
            anonymous = identity.interviewee_id().is_some(),
            "interview started"
        );
        Ok(interview)
    }
}

/// Maps the interviewee id supplied by a client to the identity an interview is stored under.
pub fn resolve_identity(interviewee_id: u64, caller: &Caller) -> Result<Identity, SurveyError> {
    if interviewee_id != CALLER_SENTINEL {
        return Ok(Identity::Anonymous(IntervieweeId(interviewee_id)));
    }

    caller
        .user_id()
        .map(Identity::Authenticated)
        .ok_or(SurveyError::Unauthorized)
}
