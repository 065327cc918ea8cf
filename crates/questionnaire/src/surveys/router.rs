use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::catalog::{QuestionPatch, QuestionSetPatch, QuestionView};
use super::domain::{
    AnswerType, Caller, InterviewId, QuestionDraft, QuestionId, QuestionSet, QuestionSetDraft,
    QuestionSetId, UserId,
};
use super::error::{SurveyError, ValidationError};
use super::queries::{InterviewHistoryView, InterviewView, QuestionSetView};
use super::repository::SurveyStore;
use super::service::SurveyService;

/// Header carrying the authenticated user id. Requests without it are anonymous.
pub const USER_HEADER: &str = "x-user-id";

type SharedService<S> = Arc<SurveyService<S>>;

/// JSON body extractor whose rejections are reported like any other validation failure.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(SurveyError))]
pub(crate) struct SurveyJson<T>(pub(crate) T);

impl From<JsonRejection> for SurveyError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::MalformedBody(rejection.body_text()).into()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartInterviewRequest {
    pub(crate) question_set_id: QuestionSetId,
    pub(crate) interviewee_id: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterAnswerRequest {
    pub(crate) question_id: QuestionId,
    pub(crate) interview_id: InterviewId,
    pub(crate) answers: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionRequest {
    pub(crate) question_set: QuestionSetId,
    pub(crate) question_text: String,
    #[serde(default)]
    pub(crate) answer_type: AnswerType,
    #[serde(default)]
    pub(crate) answer_variants: Option<Vec<String>>,
}

impl QuestionRequest {
    fn into_parts(self) -> (QuestionDraft, Option<Vec<String>>) {
        let draft = QuestionDraft {
            question_set_id: self.question_set,
            question_text: self.question_text,
            answer_type: self.answer_type,
        };
        (draft, self.answer_variants)
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QuestionFilter {
    pub(crate) question_set: Option<QuestionSetId>,
}

/// Router builder exposing the interview endpoints and the admin catalog.
pub fn survey_router<S>(service: SharedService<S>) -> Router
where
    S: SurveyStore + 'static,
{
    Router::new()
        .route("/active_question_sets/", get(active_question_sets_handler::<S>))
        .route("/start_interview/", post(start_interview_handler::<S>))
        .route(
            "/interview_questions/:interview_id/",
            get(interview_questions_handler::<S>),
        )
        .route("/register_answer/", post(register_answer_handler::<S>))
        .route(
            "/user_interviews/:interviewee_id/",
            get(user_interviews_handler::<S>),
        )
        .route(
            "/question_set/",
            get(list_question_sets_handler::<S>).post(create_question_set_handler::<S>),
        )
        .route(
            "/question_set/:id/",
            get(get_question_set_handler::<S>)
                .put(update_question_set_handler::<S>)
                .patch(patch_question_set_handler::<S>)
                .delete(delete_question_set_handler::<S>),
        )
        .route(
            "/question/",
            get(list_questions_handler::<S>).post(create_question_handler::<S>),
        )
        .route(
            "/question/:id/",
            get(get_question_handler::<S>)
                .put(update_question_handler::<S>)
                .patch(patch_question_handler::<S>)
                .delete(delete_question_handler::<S>),
        )
        .with_state(service)
}

/// Resolves the caller from [`USER_HEADER`]; a present but unreadable id is rejected.
pub(crate) fn resolve_caller<S>(
    service: &SurveyService<S>,
    headers: &HeaderMap,
) -> Result<Caller, SurveyError>
where
    S: SurveyStore + 'static,
{
    let Some(raw) = headers.get(USER_HEADER) else {
        return Ok(service.caller(None));
    };

    raw.to_str()
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|id| service.caller(Some(UserId(id))))
        .ok_or(SurveyError::Unauthorized)
}

pub(crate) async fn active_question_sets_handler<S>(
    State(service): State<SharedService<S>>,
) -> Result<Json<Vec<QuestionSetView>>, SurveyError>
where
    S: SurveyStore + 'static,
{
    let sets = service.queries().active_question_sets(service.now())?;
    Ok(Json(sets))
}

pub(crate) async fn start_interview_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    SurveyJson(request): SurveyJson<StartInterviewRequest>,
) -> Result<(StatusCode, Json<InterviewView>), SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    let interview =
        service.start_interview(request.question_set_id, request.interviewee_id, &caller)?;
    Ok((StatusCode::CREATED, Json(interview.into())))
}

pub(crate) async fn interview_questions_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(interview_id): Path<u64>,
) -> Result<Json<Vec<QuestionView>>, SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    let questions = service
        .queries()
        .interview_questions(InterviewId(interview_id), &caller)?;
    Ok(Json(questions))
}

pub(crate) async fn register_answer_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    SurveyJson(request): SurveyJson<RegisterAnswerRequest>,
) -> Result<Json<serde_json::Value>, SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    service.register_answers(
        request.interview_id,
        request.question_id,
        request.answers,
        &caller,
    )?;
    Ok(Json(json!({ "answer": "ready" })))
}

pub(crate) async fn user_interviews_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(interviewee_id): Path<u64>,
) -> Result<Json<Vec<InterviewHistoryView>>, SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    let interviews = service.queries().user_interviews(interviewee_id, &caller)?;
    Ok(Json(interviews))
}

pub(crate) async fn list_question_sets_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
) -> Result<Json<Vec<QuestionSet>>, SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    Ok(Json(service.catalog().list_question_sets(&caller)?))
}

pub(crate) async fn create_question_set_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    SurveyJson(draft): SurveyJson<QuestionSetDraft>,
) -> Result<(StatusCode, Json<QuestionSet>), SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    let created = service.catalog().create_question_set(draft, &caller)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(crate) async fn get_question_set_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<QuestionSet>, SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    Ok(Json(
        service.catalog().question_set(QuestionSetId(id), &caller)?,
    ))
}

pub(crate) async fn update_question_set_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    SurveyJson(draft): SurveyJson<QuestionSetDraft>,
) -> Result<Json<QuestionSet>, SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    let updated = service
        .catalog()
        .update_question_set(QuestionSetId(id), draft, &caller)?;
    Ok(Json(updated))
}

pub(crate) async fn patch_question_set_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    SurveyJson(patch): SurveyJson<QuestionSetPatch>,
) -> Result<Json<QuestionSet>, SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    let updated = service
        .catalog()
        .patch_question_set(QuestionSetId(id), patch, &caller)?;
    Ok(Json(updated))
}

pub(crate) async fn delete_question_set_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<StatusCode, SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    service
        .catalog()
        .delete_question_set(QuestionSetId(id), &caller)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn list_questions_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Query(filter): Query<QuestionFilter>,
) -> Result<Json<Vec<QuestionView>>, SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    let questions = service
        .catalog()
        .list_questions(filter.question_set, &caller)?;
    Ok(Json(questions))
}

pub(crate) async fn create_question_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    SurveyJson(request): SurveyJson<QuestionRequest>,
) -> Result<(StatusCode, Json<QuestionView>), SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    let (draft, variants) = request.into_parts();
    let created = service
        .catalog()
        .create_question(draft, variants, &caller)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(crate) async fn get_question_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<QuestionView>, SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    Ok(Json(service.catalog().question(QuestionId(id), &caller)?))
}

pub(crate) async fn update_question_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    SurveyJson(request): SurveyJson<QuestionRequest>,
) -> Result<Json<QuestionView>, SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    let (draft, variants) = request.into_parts();
    let updated = service
        .catalog()
        .update_question(QuestionId(id), draft, variants, &caller)?;
    Ok(Json(updated))
}

pub(crate) async fn patch_question_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    SurveyJson(patch): SurveyJson<QuestionPatch>,
) -> Result<Json<QuestionView>, SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    let updated = service
        .catalog()
        .patch_question(QuestionId(id), patch, &caller)?;
    Ok(Json(updated))
}

pub(crate) async fn delete_question_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<StatusCode, SurveyError>
where
    S: SurveyStore + 'static,
{
    let caller = resolve_caller(&service, &headers)?;
    service.catalog().delete_question(QuestionId(id), &caller)?;
    Ok(StatusCode::NO_CONTENT)
}

impl SurveyError {
    pub fn status(&self) -> StatusCode {
        match self {
            SurveyError::Unauthorized => StatusCode::UNAUTHORIZED,
            SurveyError::Forbidden(_) => StatusCode::FORBIDDEN,
            SurveyError::NotFound { .. } => StatusCode::NOT_FOUND,
            SurveyError::Validation(_) => StatusCode::BAD_REQUEST,
            SurveyError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SurveyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "questionnaire storage failure");
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
