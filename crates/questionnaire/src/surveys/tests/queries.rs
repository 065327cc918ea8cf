use super::common::*;
use crate::surveys::domain::{Caller, InterviewId, UserId};
use crate::surveys::error::SurveyError;
use chrono::Duration;

#[test]
fn active_question_sets_excludes_closed_and_future_sets() {
    let fixture = Fixture::new();
    insert_set(
        &fixture.store,
        "Archived",
        now() - Duration::days(10),
        Some(now() - Duration::days(5)),
    );
    insert_set(&fixture.store, "Upcoming", now() + Duration::days(2), None);
    let open_ended = insert_set(&fixture.store, "Always on", now() - Duration::days(2), None);

    let active = fixture
        .service
        .queries()
        .active_question_sets(now())
        .expect("listed");

    let ids: Vec<_> = active.iter().map(|set| set.id).collect();
    assert_eq!(ids, vec![fixture.open_set.id, open_ended.id]);
}

#[test]
fn interview_questions_include_variant_texts() {
    let fixture = Fixture::new();
    let interview = fixture.anonymous_interview(5);

    let questions = fixture
        .service
        .queries()
        .interview_questions(interview.id, &Caller::Anonymous)
        .expect("listed");

    assert_eq!(questions.len(), 3);
    assert!(questions[0].answer_variants.is_empty());
    assert_eq!(questions[1].answer_variants, vec!["Yes", "No"]);
    assert_eq!(questions[2].answer_variants, vec!["a", "b", "c"]);
    assert!(questions
        .iter()
        .all(|question| question.question_set == fixture.open_set.id));
}

#[test]
fn interview_questions_respect_ownership() {
    let fixture = Fixture::new();
    let interview = fixture.owned_interview(RESPONDENT);

    assert!(matches!(
        fixture
            .service
            .queries()
            .interview_questions(interview.id, &Caller::user(UserId(3))),
        Err(SurveyError::Forbidden(_))
    ));
    assert!(matches!(
        fixture
            .service
            .queries()
            .interview_questions(InterviewId(404), &respondent()),
        Err(SurveyError::NotFound { .. })
    ));
    assert!(fixture
        .service
        .queries()
        .interview_questions(interview.id, &respondent())
        .is_ok());
}

#[test]
fn user_interviews_nest_only_that_interviews_answers() {
    let fixture = Fixture::new();
    let first = fixture.owned_interview(RESPONDENT);
    let second = fixture.owned_interview(RESPONDENT);
    let stranger = fixture.owned_interview(UserId(3));

    fixture
        .service
        .register_answers(first.id, fixture.single.id, strings(&["Yes"]), &respondent())
        .expect("answered");
    fixture
        .service
        .register_answers(second.id, fixture.single.id, strings(&["No"]), &respondent())
        .expect("answered");

    let history = fixture
        .service
        .queries()
        .user_interviews(0, &respondent())
        .expect("listed");

    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|entry| entry.id != stranger.id));

    let answers_of = |index: usize| -> Vec<String> {
        history[index]
            .question_set
            .questions
            .iter()
            .find(|question| question.id == fixture.single.id)
            .expect("question present")
            .answers
            .iter()
            .map(|answer| answer.answer_text.clone())
            .collect()
    };
    assert_eq!(answers_of(0), vec!["Yes"]);
    assert_eq!(answers_of(1), vec!["No"]);
    assert_eq!(history[0].question_set.question_set.id, fixture.open_set.id);
}

#[test]
fn user_interviews_by_interviewee_id_lists_anonymous_interviews() {
    let fixture = Fixture::new();
    let mine = fixture.anonymous_interview(5);
    fixture.anonymous_interview(6);
    fixture.owned_interview(RESPONDENT);

    let history = fixture
        .service
        .queries()
        .user_interviews(5, &Caller::Anonymous)
        .expect("listed");

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, mine.id);
}

#[test]
fn user_interviews_sentinel_requires_authentication() {
    let fixture = Fixture::new();

    assert!(matches!(
        fixture
            .service
            .queries()
            .user_interviews(0, &Caller::Anonymous),
        Err(SurveyError::Unauthorized)
    ));
}
