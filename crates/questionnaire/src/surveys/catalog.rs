//! Administrative management of question sets and their questions.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{
    limits, AnswerType, AnswerVariant, Caller, Question, QuestionDraft, QuestionId, QuestionSet,
    QuestionSetDraft, QuestionSetId, UserId,
};
use super::error::{SurveyError, ValidationError};
use super::repository::{Record, Repository, SurveyStore};

/// Users allowed to manage the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    admins: BTreeSet<UserId>,
}

impl AccessPolicy {
    pub fn new(admins: BTreeSet<UserId>) -> Self {
        Self { admins }
    }

    /// Turns the raw user id supplied by the transport into a caller.
    pub fn caller(&self, user: Option<UserId>) -> Caller {
        match user {
            Some(id) if self.admins.contains(&id) => Caller::admin(id),
            Some(id) => Caller::user(id),
            None => Caller::Anonymous,
        }
    }

    fn require_admin(caller: &Caller) -> Result<(), SurveyError> {
        match caller {
            Caller::Anonymous => Err(SurveyError::Unauthorized),
            Caller::User { admin: true, .. } => Ok(()),
            Caller::User { .. } => Err(SurveyError::Forbidden("administrator access required")),
        }
    }
}

/// Partial update of a question set; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QuestionSetPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub end_date: Option<Option<DateTime<Utc>>>,
}

/// Partial update of a question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QuestionPatch {
    #[serde(rename = "question_set")]
    pub question_set_id: Option<QuestionSetId>,
    pub question_text: Option<String>,
    pub answer_type: Option<AnswerType>,
    pub answer_variants: Option<Vec<String>>,
}

/// A question with the texts of its answer variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub question_set: QuestionSetId,
    pub question_text: String,
    pub answer_type: AnswerType,
    pub answer_variants: Vec<String>,
}

impl QuestionView {
    pub fn new(question: Question, variants: Vec<AnswerVariant>) -> Self {
        Self {
            id: question.id,
            question_set: question.question_set_id,
            question_text: question.question_text,
            answer_type: question.answer_type,
            answer_variants: variants
                .into_iter()
                .map(|variant| variant.answer_text)
                .collect(),
        }
    }
}

/// Admin CRUD for question sets and questions.
pub struct QuestionCatalog<S> {
    store: Arc<S>,
}

impl<S> QuestionCatalog<S>
where
    S: SurveyStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn list_question_sets(&self, caller: &Caller) -> Result<Vec<QuestionSet>, SurveyError> {
        AccessPolicy::require_admin(caller)?;
        Ok(Repository::<QuestionSet>::list(self.store.as_ref())?)
    }

    pub fn question_set(
        &self,
        id: QuestionSetId,
        caller: &Caller,
    ) -> Result<QuestionSet, SurveyError> {
        AccessPolicy::require_admin(caller)?;
        self.load_question_set(id)
    }

    pub fn create_question_set(
        &self,
        draft: QuestionSetDraft,
        caller: &Caller,
    ) -> Result<QuestionSet, SurveyError> {
        AccessPolicy::require_admin(caller)?;
        validate_question_set(&draft.title, &draft.description, draft.start_date, draft.end_date)?;

        let created = Repository::<QuestionSet>::create(self.store.as_ref(), draft)?;
        info!(question_set_id = %created.id(), "question set created");
        Ok(created)
    }

    /// Full update: every field is replaced, `start_date` must match the stored one.
    pub fn update_question_set(
        &self,
        id: QuestionSetId,
        draft: QuestionSetDraft,
        caller: &Caller,
    ) -> Result<QuestionSet, SurveyError> {
        let patch = QuestionSetPatch {
            title: Some(draft.title),
            description: Some(draft.description),
            start_date: Some(draft.start_date),
            end_date: Some(draft.end_date),
        };
        self.patch_question_set(id, patch, caller)
    }

    pub fn patch_question_set(
        &self,
        id: QuestionSetId,
        patch: QuestionSetPatch,
        caller: &Caller,
    ) -> Result<QuestionSet, SurveyError> {
        AccessPolicy::require_admin(caller)?;
        let mut record = self.load_question_set(id)?;

        if let Some(start_date) = patch.start_date {
            if start_date != record.start_date {
                return Err(ValidationError::StartDateChanged.into());
            }
        }
        if let Some(title) = patch.title {
            record.title = title;
        }
        if let Some(description) = patch.description {
            record.description = description;
        }
        if let Some(end_date) = patch.end_date {
            record.end_date = end_date;
        }
        validate_question_set(
            &record.title,
            &record.description,
            record.start_date,
            record.end_date,
        )?;

        let updated = Repository::<QuestionSet>::update(self.store.as_ref(), record)?;
        info!(question_set_id = %id, "question set updated");
        Ok(updated)
    }

    pub fn delete_question_set(&self, id: QuestionSetId, caller: &Caller) -> Result<(), SurveyError> {
        AccessPolicy::require_admin(caller)?;
        self.load_question_set(id)?;
        Repository::<QuestionSet>::delete(self.store.as_ref(), id)?;
        info!(question_set_id = %id, "question set deleted");
        Ok(())
    }

    pub fn list_questions(
        &self,
        question_set: Option<QuestionSetId>,
        caller: &Caller,
    ) -> Result<Vec<QuestionView>, SurveyError> {
        AccessPolicy::require_admin(caller)?;
        let questions = match question_set {
            Some(id) => self.store.questions_in_set(id)?,
            None => Repository::<Question>::list(self.store.as_ref())?,
        };
        self.with_variants(questions)
    }

    pub fn question(&self, id: QuestionId, caller: &Caller) -> Result<QuestionView, SurveyError> {
        AccessPolicy::require_admin(caller)?;
        let question = self.load_question(id)?;
        let variants = self.store.variants(id)?;
        Ok(QuestionView::new(question, variants))
    }

    /// Writes the question and its variant set in one transaction.
    pub fn create_question(
        &self,
        draft: QuestionDraft,
        answer_variants: Option<Vec<String>>,
        caller: &Caller,
    ) -> Result<QuestionView, SurveyError> {
        AccessPolicy::require_admin(caller)?;
        self.load_question_set(draft.question_set_id)?;
        validate_question_text(&draft.question_text)?;
        let variants = answer_variants.unwrap_or_default();
        validate_variants(&variants)?;

        let (question, variants) = self.store.create_question(draft, variants)?;
        info!(
            question_id = %question.id,
            question_set_id = %question.question_set_id,
            variants = variants.len(),
            "question created"
        );
        Ok(QuestionView::new(question, variants))
    }

    pub fn update_question(
        &self,
        id: QuestionId,
        draft: QuestionDraft,
        answer_variants: Option<Vec<String>>,
        caller: &Caller,
    ) -> Result<QuestionView, SurveyError> {
        let patch = QuestionPatch {
            question_set_id: Some(draft.question_set_id),
            question_text: Some(draft.question_text),
            answer_type: Some(draft.answer_type),
            answer_variants,
        };
        self.patch_question(id, patch, caller)
    }

    /// Applies a partial update; variants are only replaced when the patch carries them.
    pub fn patch_question(
        &self,
        id: QuestionId,
        patch: QuestionPatch,
        caller: &Caller,
    ) -> Result<QuestionView, SurveyError> {
        AccessPolicy::require_admin(caller)?;
        let mut question = self.load_question(id)?;

        if let Some(question_set_id) = patch.question_set_id {
            self.load_question_set(question_set_id)?;
            question.question_set_id = question_set_id;
        }
        if let Some(text) = patch.question_text {
            question.question_text = text;
        }
        if let Some(answer_type) = patch.answer_type {
            question.answer_type = answer_type;
        }
        validate_question_text(&question.question_text)?;
        if let Some(variants) = &patch.answer_variants {
            validate_variants(variants)?;
        }

        let (question, variants) = self
            .store
            .update_question(question, patch.answer_variants)?;
        info!(question_id = %id, variants = variants.len(), "question updated");
        Ok(QuestionView::new(question, variants))
    }

    pub fn delete_question(&self, id: QuestionId, caller: &Caller) -> Result<(), SurveyError> {
        AccessPolicy::require_admin(caller)?;
        self.load_question(id)?;
        Repository::<Question>::delete(self.store.as_ref(), id)?;
        info!(question_id = %id, "question deleted");
        Ok(())
    }

    fn load<T>(&self, id: T::Id) -> Result<T, SurveyError>
    where
        T: Record,
        S: Repository<T>,
    {
        Repository::<T>::get(self.store.as_ref(), id)?
            .ok_or_else(|| SurveyError::not_found(T::ENTITY, id))
    }

    fn load_question_set(&self, id: QuestionSetId) -> Result<QuestionSet, SurveyError> {
        self.load(id)
    }

    fn load_question(&self, id: QuestionId) -> Result<Question, SurveyError> {
        self.load(id)
    }

    fn with_variants(&self, questions: Vec<Question>) -> Result<Vec<QuestionView>, SurveyError> {
        questions
            .into_iter()
            .map(|question| -> Result<QuestionView, SurveyError> {
                let variants = self.store.variants(question.id)?;
                Ok(QuestionView::new(question, variants))
            })
            .collect()
    }
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

fn validate_question_set(
    title: &str,
    description: &str,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::Blank { field: "title" });
    }
    check_length("title", title, limits::TITLE)?;
    check_length("description", description, limits::DESCRIPTION)?;
    if end_date.is_some_and(|end| end < start_date) {
        return Err(ValidationError::EndBeforeStart);
    }
    Ok(())
}

fn validate_question_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::Blank {
            field: "question_text",
        });
    }
    check_length("question_text", text, limits::QUESTION_TEXT)
}

fn validate_variants(variants: &[String]) -> Result<(), ValidationError> {
    for variant in variants {
        if variant.trim().is_empty() {
            return Err(ValidationError::Blank {
                field: "answer_variants",
            });
        }
        check_length("answer_variants", variant, limits::VARIANT_TEXT)?;
    }
    Ok(())
}

/// Distinguishes an absent `end_date` from an explicit `null` in PATCH bodies.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
