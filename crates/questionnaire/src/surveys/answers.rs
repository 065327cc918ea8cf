use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use super::domain::{
    limits, Answer, AnswerVariant, Caller, Interview, InterviewId, Question, QuestionId,
};
use super::error::{SurveyError, ValidationError};
use super::repository::{Record, RepositoryError, SurveyStore};

/// Validates answer batches against a question's contract and stores them as a unit.
pub struct AnswerRegistrationEngine<S> {
    store: Arc<S>,
}

impl<S> AnswerRegistrationEngine<S>
where
    S: SurveyStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Replaces the caller's answers to one question of an interview.
    ///
    /// Scope and value checks run inside the store call that performs the replacement, so a
    /// concurrent catalog edit cannot slip between the check and the write.
    pub fn register_answers(
        &self,
        interview_id: InterviewId,
        question_id: QuestionId,
        answers: Vec<String>,
        caller: &Caller,
    ) -> Result<Vec<Answer>, SurveyError> {
        let interview = self
            .store
            .interview(interview_id)?
            .ok_or_else(|| SurveyError::not_found("interview", interview_id))?;

        if !interview.accessible_by(caller) {
            return Err(SurveyError::Forbidden("interview belongs to another user"));
        }

        let unique = dedup_preserving_order(answers.clone());
        debug!(
            %interview_id,
            %question_id,
            count = unique.len(),
            "replacing answer set"
        );

        let stored = self
            .store
            .replace_answers(
                interview_id,
                question_id,
                unique,
                &|interview: &Interview, question: &Question, variants: &[AnswerVariant]| {
                    check_submission(interview, question, variants, &answers)
                },
            )
            .map_err(|err| match err {
                RepositoryError::Rejected(violation) => SurveyError::Validation(violation),
                RepositoryError::MissingReference(entity) if entity == Question::ENTITY => {
                    ValidationError::QuestionOutOfScope.into()
                }
                RepositoryError::MissingReference("interview") => {
                    SurveyError::not_found("interview", interview_id)
                }
                other => other.into(),
            })?;

        info!(
            %interview_id,
            %question_id,
            stored = stored.len(),
            "answers registered"
        );
        Ok(stored)
    }
}

/// Checks a raw submission against the question it answers.
///
/// Order: scope, cardinality, then values.
fn check_submission(
    interview: &Interview,
    question: &Question,
    variants: &[AnswerVariant],
    answers: &[String],
) -> Result<(), ValidationError> {
    if question.question_set_id != interview.question_set_id {
        return Err(ValidationError::QuestionOutOfScope);
    }

    if question.answer_type.is_single() && answers.len() != 1 {
        return Err(ValidationError::ExactlyOneAnswerRequired);
    }

    if question.answer_type.uses_variants() {
        let allowed: HashSet<&str> = variants
            .iter()
            .map(|variant| variant.answer_text.as_str())
            .collect();
        if let Some(answer) = answers
            .iter()
            .find(|answer| !allowed.contains(answer.as_str()))
        {
            return Err(ValidationError::UnknownVariant {
                answer: answer.clone(),
            });
        }
    } else if answers
        .iter()
        .any(|answer| answer.chars().count() > limits::ANSWER_TEXT)
    {
        return Err(ValidationError::TooLong {
            field: "answer",
            max: limits::ANSWER_TEXT,
        });
    }
    Ok(())
}

/// Drops repeated values, keeping the first occurrence of each.
pub fn dedup_preserving_order(answers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(answers.len());
    answers
        .into_iter()
        .filter(|answer| seen.insert(answer.clone()))
        .collect()
}
