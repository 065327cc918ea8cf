use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::catalog::QuestionView;
use super::domain::{
    AnswerType, Caller, Interview, InterviewId, IntervieweeId, QuestionId, QuestionSet,
    QuestionSetId, UserId,
};
use super::eligibility::EligibilityChecker;
use super::error::SurveyError;
use super::repository::{Record, Repository, SurveyStore};
use super::sessions::resolve_identity;

/// Public projection of a question set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSetView {
    pub id: QuestionSetId,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl From<QuestionSet> for QuestionSetView {
    fn from(set: QuestionSet) -> Self {
        Self {
            id: set.id,
            title: set.title,
            description: set.description,
            start_date: set.start_date,
            end_date: set.end_date,
        }
    }
}

/// Interview as returned to the client that started it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterviewView {
    pub id: InterviewId,
    pub interviewee_id: Option<IntervieweeId>,
    pub loggedin_user: Option<UserId>,
    pub start_date: DateTime<Utc>,
    pub question_set: QuestionSetId,
}

impl From<Interview> for InterviewView {
    fn from(interview: Interview) -> Self {
        Self {
            id: interview.id,
            interviewee_id: interview.identity.interviewee_id(),
            loggedin_user: interview.identity.loggedin_user(),
            start_date: interview.start_date,
            question_set: interview.question_set_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerTextView {
    pub answer_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnsweredQuestionView {
    pub id: QuestionId,
    pub question_text: String,
    pub answer_type: AnswerType,
    pub answers: Vec<AnswerTextView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnsweredQuestionSetView {
    #[serde(flatten)]
    pub question_set: QuestionSetView,
    pub questions: Vec<AnsweredQuestionView>,
}

/// An interview with its question set and the answers given in that interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterviewHistoryView {
    pub id: InterviewId,
    pub start_date: DateTime<Utc>,
    pub question_set: AnsweredQuestionSetView,
}

/// Read side of the questionnaire.
pub struct InterviewQueryService<S> {
    store: Arc<S>,
    eligibility: EligibilityChecker,
}

impl<S> InterviewQueryService<S>
where
    S: SurveyStore + 'static,
{
    pub fn new(store: Arc<S>, eligibility: EligibilityChecker) -> Self {
        Self { store, eligibility }
    }

    pub fn active_question_sets(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<QuestionSetView>, SurveyError> {
        let sets = Repository::<QuestionSet>::list(self.store.as_ref())?;
        Ok(sets
            .into_iter()
            .filter(|set| self.eligibility.is_open(set, now))
            .map(QuestionSetView::from)
            .collect())
    }

    pub fn interview_questions(
        &self,
        interview_id: InterviewId,
        caller: &Caller,
    ) -> Result<Vec<QuestionView>, SurveyError> {
        let interview = self
            .store
            .interview(interview_id)?
            .ok_or_else(|| SurveyError::not_found("interview", interview_id))?;
        if !interview.accessible_by(caller) {
            return Err(SurveyError::Forbidden("interview belongs to another user"));
        }

        self.store
            .questions_in_set(interview.question_set_id)?
            .into_iter()
            .map(|question| -> Result<QuestionView, SurveyError> {
                let variants = self.store.variants(question.id)?;
                Ok(QuestionView::new(question, variants))
            })
            .collect()
    }

    /// Interviews of the identity behind `interviewee_id` (`0` meaning the caller).
    pub fn user_interviews(
        &self,
        interviewee_id: u64,
        caller: &Caller,
    ) -> Result<Vec<InterviewHistoryView>, SurveyError> {
        let identity = resolve_identity(interviewee_id, caller)?;
        self.store
            .interviews_for(identity)?
            .into_iter()
            .map(|interview| self.history(interview))
            .collect()
    }

    fn history(&self, interview: Interview) -> Result<InterviewHistoryView, SurveyError> {
        let set_id = interview.question_set_id;
        let question_set = Repository::<QuestionSet>::get(self.store.as_ref(), set_id)?
            .ok_or_else(|| SurveyError::not_found(QuestionSet::ENTITY, set_id))?;

        let questions = self
            .store
            .questions_in_set(question_set.id)?
            .into_iter()
            .map(|question| -> Result<AnsweredQuestionView, SurveyError> {
                let answers = self
                    .store
                    .answers(interview.id, question.id)?
                    .into_iter()
                    .map(|answer| AnswerTextView {
                        answer_text: answer.answer_text,
                    })
                    .collect();
                Ok(AnsweredQuestionView {
                    id: question.id,
                    question_text: question.question_text,
                    answer_type: question.answer_type,
                    answers,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InterviewHistoryView {
            id: interview.id,
            start_date: interview.start_date,
            question_set: AnsweredQuestionSetView {
                question_set: question_set.into(),
                questions,
            },
        })
    }
}
