use std::collections::BTreeSet;
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::config::SurveyConfig;
use crate::surveys::domain::{
    AnswerType, Caller, Interview, InterviewDraft, Identity, IntervieweeId, Question,
    QuestionDraft, QuestionId, QuestionSet, QuestionSetDraft, QuestionSetId, UserId,
};
use crate::surveys::repository::{AnswerCheck, Repository, RepositoryError, SurveyStore};
use crate::surveys::{
    survey_router, Answer, AnswerVariant, BoundaryPolicy, FixedClock, InMemorySurveyStore,
    InterviewId, SurveyService,
};

pub(super) const ADMIN: UserId = UserId(1);
pub(super) const RESPONDENT: UserId = UserId(42);

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 24, 10, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn survey_config() -> SurveyConfig {
    SurveyConfig {
        boundary: BoundaryPolicy::Inclusive,
        admin_users: BTreeSet::from([ADMIN]),
    }
}

pub(super) fn admin() -> Caller {
    Caller::admin(ADMIN)
}

pub(super) fn respondent() -> Caller {
    Caller::user(RESPONDENT)
}

/// Store seeded with an open question set holding one question of each answer type.
pub(super) struct Fixture {
    pub(super) store: Arc<InMemorySurveyStore>,
    pub(super) service: Arc<SurveyService<InMemorySurveyStore>>,
    pub(super) open_set: QuestionSet,
    pub(super) text: Question,
    pub(super) single: Question,
    pub(super) multi: Question,
}

impl Fixture {
    pub(super) fn new() -> Self {
        Self::with_store(Arc::new(InMemorySurveyStore::new()))
    }

    pub(super) fn with_store(store: Arc<InMemorySurveyStore>) -> Self {
        let service = Arc::new(SurveyService::with_clock(
            store.clone(),
            &survey_config(),
            Arc::new(FixedClock(now())),
        ));

        let open_set = insert_set(
            &store,
            "Customer satisfaction",
            now() - Duration::days(1),
            Some(now() + Duration::days(1)),
        );
        let text = insert_question(&store, open_set.id, "Anything else?", AnswerType::Text, &[]);
        let single = insert_question(
            &store,
            open_set.id,
            "Would you recommend us?",
            AnswerType::OneVariant,
            &["Yes", "No"],
        );
        let multi = insert_question(
            &store,
            open_set.id,
            "Which channels do you use?",
            AnswerType::MultiVariant,
            &["a", "b", "c"],
        );

        Self {
            store,
            service,
            open_set,
            text,
            single,
            multi,
        }
    }

    pub(super) fn anonymous_interview(&self, interviewee: u64) -> Interview {
        self.store
            .insert_interview(InterviewDraft {
                question_set_id: self.open_set.id,
                identity: Identity::Anonymous(IntervieweeId(interviewee)),
                start_date: now(),
            })
            .expect("interview stored")
    }

    pub(super) fn owned_interview(&self, owner: UserId) -> Interview {
        self.store
            .insert_interview(InterviewDraft {
                question_set_id: self.open_set.id,
                identity: Identity::Authenticated(owner),
                start_date: now(),
            })
            .expect("interview stored")
    }

    pub(super) fn stored_texts(&self, interview: InterviewId, question: QuestionId) -> Vec<String> {
        self.store
            .answers(interview, question)
            .expect("answers readable")
            .into_iter()
            .map(|answer| answer.answer_text)
            .collect()
    }

    pub(super) fn router(&self) -> axum::Router {
        survey_router(self.service.clone())
    }
}

pub(super) fn insert_set(
    store: &InMemorySurveyStore,
    title: &str,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
) -> QuestionSet {
    Repository::<QuestionSet>::create(
        store,
        QuestionSetDraft {
            title: title.to_string(),
            description: format!("{title} survey"),
            start_date,
            end_date,
        },
    )
    .expect("question set stored")
}

pub(super) fn insert_question(
    store: &InMemorySurveyStore,
    question_set_id: QuestionSetId,
    text: &str,
    answer_type: AnswerType,
    variants: &[&str],
) -> Question {
    let (question, _) = store
        .create_question(
            QuestionDraft {
                question_set_id,
                question_text: text.to_string(),
                answer_type,
            },
            variants.iter().map(|variant| variant.to_string()).collect(),
        )
        .expect("question stored");
    question
}

pub(super) fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Store whose every call fails, to exercise the storage error path.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl Repository<QuestionSet> for UnavailableStore {
    fn list(&self) -> Result<Vec<QuestionSet>, RepositoryError> {
        offline()
    }
    fn get(&self, _id: QuestionSetId) -> Result<Option<QuestionSet>, RepositoryError> {
        offline()
    }
    fn create(&self, _draft: QuestionSetDraft) -> Result<QuestionSet, RepositoryError> {
        offline()
    }
    fn update(&self, _record: QuestionSet) -> Result<QuestionSet, RepositoryError> {
        offline()
    }
    fn delete(&self, _id: QuestionSetId) -> Result<(), RepositoryError> {
        offline()
    }
}

impl Repository<Question> for UnavailableStore {
    fn list(&self) -> Result<Vec<Question>, RepositoryError> {
        offline()
    }
    fn get(&self, _id: QuestionId) -> Result<Option<Question>, RepositoryError> {
        offline()
    }
    fn create(&self, _draft: QuestionDraft) -> Result<Question, RepositoryError> {
        offline()
    }
    fn update(&self, _record: Question) -> Result<Question, RepositoryError> {
        offline()
    }
    fn delete(&self, _id: QuestionId) -> Result<(), RepositoryError> {
        offline()
    }
}

impl SurveyStore for UnavailableStore {
    fn questions_in_set(&self, _set: QuestionSetId) -> Result<Vec<Question>, RepositoryError> {
        offline()
    }
    fn variants(&self, _question: QuestionId) -> Result<Vec<AnswerVariant>, RepositoryError> {
        offline()
    }
    fn create_question(
        &self,
        _draft: QuestionDraft,
        _variants: Vec<String>,
    ) -> Result<(Question, Vec<AnswerVariant>), RepositoryError> {
        offline()
    }
    fn update_question(
        &self,
        _question: Question,
        _variants: Option<Vec<String>>,
    ) -> Result<(Question, Vec<AnswerVariant>), RepositoryError> {
        offline()
    }
    fn insert_interview(&self, _draft: InterviewDraft) -> Result<Interview, RepositoryError> {
        offline()
    }
    fn interview(&self, _id: InterviewId) -> Result<Option<Interview>, RepositoryError> {
        offline()
    }
    fn interviews_for(&self, _identity: Identity) -> Result<Vec<Interview>, RepositoryError> {
        offline()
    }
    fn answers(
        &self,
        _interview: InterviewId,
        _question: QuestionId,
    ) -> Result<Vec<Answer>, RepositoryError> {
        offline()
    }
    fn replace_answers(
        &self,
        _interview: InterviewId,
        _question: QuestionId,
        _texts: Vec<String>,
        _check: &AnswerCheck<'_>,
    ) -> Result<Vec<Answer>, RepositoryError> {
        offline()
    }
}

pub(super) fn unavailable_service() -> Arc<SurveyService<UnavailableStore>> {
    Arc::new(SurveyService::with_clock(
        Arc::new(UnavailableStore),
        &survey_config(),
        Arc::new(FixedClock(now())),
    ))
}
