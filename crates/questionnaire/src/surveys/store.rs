use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::domain::{
    Answer, AnswerId, AnswerVariant, AnswerVariantId, Identity, Interview, InterviewDraft,
    InterviewId, Question, QuestionDraft, QuestionId, QuestionSet, QuestionSetDraft,
    QuestionSetId,
};
use super::repository::{AnswerCheck, Record, Repository, RepositoryError, SurveyStore};

type AnswerKey = (InterviewId, QuestionId);
type AnswerSlot = Arc<Mutex<Vec<Answer>>>;

#[derive(Default)]
struct Tables {
    question_sets: BTreeMap<QuestionSetId, QuestionSet>,
    questions: BTreeMap<QuestionId, Question>,
    variants: BTreeMap<AnswerVariantId, AnswerVariant>,
    interviews: BTreeMap<InterviewId, Interview>,
}

impl Tables {
    fn variants_of(&self, question: QuestionId) -> Vec<AnswerVariant> {
        self.variants
            .values()
            .filter(|variant| variant.question_id == question)
            .cloned()
            .collect()
    }

    fn drop_variants_of(&mut self, question: QuestionId) {
        self.variants
            .retain(|_, variant| variant.question_id != question);
    }
}

/// Process-local entity store.
///
/// Entity tables share one read/write lock. Answer sets live in per-(interview, question) slots
/// so replacements for different pairs never wait on each other; a replacement holds the
/// tables read lock while it runs so a cascading delete cannot interleave with it.
#[derive(Default)]
pub struct InMemorySurveyStore {
    tables: RwLock<Tables>,
    answers: RwLock<HashMap<AnswerKey, AnswerSlot>>,
    sequence: AtomicU64,
}

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Unavailable("store lock poisoned".to_string())
}

impl InMemorySurveyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, RepositoryError> {
        self.tables.read().map_err(poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, RepositoryError> {
        self.tables.write().map_err(poisoned)
    }

    fn slot(&self, key: AnswerKey) -> Result<AnswerSlot, RepositoryError> {
        if let Some(slot) = self.answers.read().map_err(poisoned)?.get(&key) {
            return Ok(slot.clone());
        }
        let mut slots = self.answers.write().map_err(poisoned)?;
        Ok(slots.entry(key).or_default().clone())
    }

    fn lock_slot(slot: &AnswerSlot) -> Result<MutexGuard<'_, Vec<Answer>>, RepositoryError> {
        slot.lock().map_err(poisoned)
    }

    fn drop_slots(&self, keep: impl Fn(&AnswerKey) -> bool) -> Result<(), RepositoryError> {
        self.answers
            .write()
            .map_err(poisoned)?
            .retain(|key, _| keep(key));
        Ok(())
    }

    fn build_variants(&self, question: QuestionId, texts: Vec<String>) -> Vec<AnswerVariant> {
        texts
            .into_iter()
            .map(|answer_text| AnswerVariant {
                id: AnswerVariantId(self.next_id()),
                question_id: question,
                answer_text,
            })
            .collect()
    }
}

impl Repository<QuestionSet> for InMemorySurveyStore {
    fn list(&self) -> Result<Vec<QuestionSet>, RepositoryError> {
        Ok(self.read()?.question_sets.values().cloned().collect())
    }

    fn get(&self, id: QuestionSetId) -> Result<Option<QuestionSet>, RepositoryError> {
        Ok(self.read()?.question_sets.get(&id).cloned())
    }

    fn create(&self, draft: QuestionSetDraft) -> Result<QuestionSet, RepositoryError> {
        let mut tables = self.write()?;
        let record = draft.into_record(QuestionSetId(self.next_id()));
        tables.question_sets.insert(record.id(), record.clone());
        Ok(record)
    }

    fn update(&self, record: QuestionSet) -> Result<QuestionSet, RepositoryError> {
        let mut tables = self.write()?;
        let slot = tables
            .question_sets
            .get_mut(&record.id())
            .ok_or(RepositoryError::NotFound)?;
        *slot = record.clone();
        Ok(record)
    }

    fn delete(&self, id: QuestionSetId) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        if tables.question_sets.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }

        let questions: Vec<QuestionId> = tables
            .questions
            .values()
            .filter(|question| question.question_set_id == id)
            .map(|question| question.id)
            .collect();
        let interviews: Vec<InterviewId> = tables
            .interviews
            .values()
            .filter(|interview| interview.question_set_id == id)
            .map(|interview| interview.id)
            .collect();

        for question in &questions {
            tables.questions.remove(question);
            tables.drop_variants_of(*question);
        }
        for interview in &interviews {
            tables.interviews.remove(interview);
        }

        self.drop_slots(|(interview, question)| {
            !interviews.contains(interview) && !questions.contains(question)
        })
    }
}

impl Repository<Question> for InMemorySurveyStore {
    fn list(&self) -> Result<Vec<Question>, RepositoryError> {
        Ok(self.read()?.questions.values().cloned().collect())
    }

    fn get(&self, id: QuestionId) -> Result<Option<Question>, RepositoryError> {
        Ok(self.read()?.questions.get(&id).cloned())
    }

    fn create(&self, draft: QuestionDraft) -> Result<Question, RepositoryError> {
        self.create_question(draft, Vec::new())
            .map(|(question, _)| question)
    }

    fn update(&self, record: Question) -> Result<Question, RepositoryError> {
        self.update_question(record, None)
            .map(|(question, _)| question)
    }

    fn delete(&self, id: QuestionId) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        if tables.questions.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        tables.drop_variants_of(id);
        self.drop_slots(|(_, question)| *question != id)
    }
}

impl SurveyStore for InMemorySurveyStore {
    fn questions_in_set(
        &self,
        question_set: QuestionSetId,
    ) -> Result<Vec<Question>, RepositoryError> {
        Ok(self
            .read()?
            .questions
            .values()
            .filter(|question| question.question_set_id == question_set)
            .cloned()
            .collect())
    }

    fn variants(&self, question: QuestionId) -> Result<Vec<AnswerVariant>, RepositoryError> {
        Ok(self.read()?.variants_of(question))
    }

    fn create_question(
        &self,
        draft: QuestionDraft,
        variants: Vec<String>,
    ) -> Result<(Question, Vec<AnswerVariant>), RepositoryError> {
        let mut tables = self.write()?;
        if !tables.question_sets.contains_key(&draft.question_set_id) {
            return Err(RepositoryError::MissingReference(QuestionSet::ENTITY));
        }

        let question = draft.into_record(QuestionId(self.next_id()));
        let variants = self.build_variants(question.id, variants);

        tables.questions.insert(question.id, question.clone());
        for variant in &variants {
            tables.variants.insert(variant.id, variant.clone());
        }
        Ok((question, variants))
    }

    fn update_question(
        &self,
        question: Question,
        variants: Option<Vec<String>>,
    ) -> Result<(Question, Vec<AnswerVariant>), RepositoryError> {
        let mut tables = self.write()?;
        let Some(previous) = tables.questions.get(&question.id()) else {
            return Err(RepositoryError::NotFound);
        };
        if !tables.question_sets.contains_key(&question.question_set_id) {
            return Err(RepositoryError::MissingReference(QuestionSet::ENTITY));
        }
        let contract_changed = previous.question_set_id != question.question_set_id
            || previous.answer_type != question.answer_type;

        tables.questions.insert(question.id(), question.clone());
        if let Some(texts) = variants {
            tables.drop_variants_of(question.id);
            for variant in self.build_variants(question.id, texts) {
                tables.variants.insert(variant.id, variant);
            }
        }
        if contract_changed {
            self.drop_slots(|(_, answered)| *answered != question.id)?;
        }
        let current = tables.variants_of(question.id);
        Ok((question, current))
    }

    fn insert_interview(&self, draft: InterviewDraft) -> Result<Interview, RepositoryError> {
        let mut tables = self.write()?;
        if !tables.question_sets.contains_key(&draft.question_set_id) {
            return Err(RepositoryError::MissingReference(QuestionSet::ENTITY));
        }

        let interview = Interview {
            id: InterviewId(self.next_id()),
            question_set_id: draft.question_set_id,
            identity: draft.identity,
            start_date: draft.start_date,
        };
        tables.interviews.insert(interview.id, interview.clone());
        Ok(interview)
    }

    fn interview(&self, id: InterviewId) -> Result<Option<Interview>, RepositoryError> {
        Ok(self.read()?.interviews.get(&id).cloned())
    }

    fn interviews_for(&self, identity: Identity) -> Result<Vec<Interview>, RepositoryError> {
        Ok(self
            .read()?
            .interviews
            .values()
            .filter(|interview| interview.identity == identity)
            .cloned()
            .collect())
    }

    fn answers(
        &self,
        interview: InterviewId,
        question: QuestionId,
    ) -> Result<Vec<Answer>, RepositoryError> {
        let slot = self
            .answers
            .read()
            .map_err(poisoned)?
            .get(&(interview, question))
            .cloned();
        match slot {
            Some(slot) => Ok(Self::lock_slot(&slot)?.clone()),
            None => Ok(Vec::new()),
        }
    }

    fn replace_answers(
        &self,
        interview: InterviewId,
        question: QuestionId,
        texts: Vec<String>,
        check: &AnswerCheck<'_>,
    ) -> Result<Vec<Answer>, RepositoryError> {
        let tables = self.read()?;
        let Some(interview_record) = tables.interviews.get(&interview) else {
            return Err(RepositoryError::MissingReference("interview"));
        };
        let Some(question_record) = tables.questions.get(&question) else {
            return Err(RepositoryError::MissingReference(Question::ENTITY));
        };
        check(
            interview_record,
            question_record,
            &tables.variants_of(question),
        )?;

        let replacement: Vec<Answer> = texts
            .into_iter()
            .map(|answer_text| Answer {
                id: AnswerId(self.next_id()),
                interview_id: interview,
                question_id: question,
                answer_text,
            })
            .collect();

        let slot = self.slot((interview, question))?;
        let mut current = Self::lock_slot(&slot)?;
        *current = replacement.clone();
        drop(current);
        drop(tables);

        Ok(replacement)
    }
}
