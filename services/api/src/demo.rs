use chrono::Duration;
use clap::Args;
use questionnaire::config::SurveyConfig;
use questionnaire::error::AppError;
use questionnaire::surveys::{
    AnswerType, Caller, InMemorySurveyStore, InterviewHistoryView, QuestionDraft,
    QuestionSetDraft, SurveyService, UserId,
};
use std::collections::BTreeSet;
use std::sync::Arc;

const DEMO_ADMIN: UserId = UserId(1);
const DEMO_USER: UserId = UserId(2);

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Interviewee id for the anonymous interview. Use 0 to answer as the demo user instead.
    #[arg(long, default_value_t = 7)]
    pub(crate) interviewee: u64,
    /// Answer to the single-choice question (Yes or No)
    #[arg(long, default_value = "Yes")]
    pub(crate) rating: String,
    /// Answer to the multi-choice question; repeat the flag to pick several
    #[arg(long = "channel")]
    pub(crate) channel: Vec<String>,
    /// Free-text comment
    #[arg(long, default_value = "Quick and friendly support")]
    pub(crate) comment: String,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            interviewee: 7,
            rating: "Yes".to_string(),
            channel: Vec::new(),
            comment: "Quick and friendly support".to_string(),
        }
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Questionnaire demo");
    let history = run_interview(args)?;
    render_history(&history);
    Ok(())
}

/// Seeds an in-memory survey, answers every question once, and returns the caller's history.
fn run_interview(args: DemoArgs) -> Result<Vec<InterviewHistoryView>, AppError> {
    let config = SurveyConfig {
        admin_users: BTreeSet::from([DEMO_ADMIN]),
        ..SurveyConfig::default()
    };
    let service = SurveyService::new(Arc::new(InMemorySurveyStore::new()), &config);
    let admin = service.caller(Some(DEMO_ADMIN));
    let catalog = service.catalog();

    let set = catalog.create_question_set(
        QuestionSetDraft {
            title: "Support follow-up".to_string(),
            description: "How did we do on your last ticket?".to_string(),
            start_date: service.now() - Duration::hours(1),
            end_date: Some(service.now() + Duration::days(14)),
        },
        &admin,
    )?;
    let comment = catalog.create_question(
        QuestionDraft {
            question_set_id: set.id,
            question_text: "Anything we should know?".to_string(),
            answer_type: AnswerType::Text,
        },
        None,
        &admin,
    )?;
    let rating = catalog.create_question(
        QuestionDraft {
            question_set_id: set.id,
            question_text: "Was your issue resolved?".to_string(),
            answer_type: AnswerType::OneVariant,
        },
        Some(vec!["Yes".to_string(), "No".to_string()]),
        &admin,
    )?;
    let channels = catalog.create_question(
        QuestionDraft {
            question_set_id: set.id,
            question_text: "Which channels did you use?".to_string(),
            answer_type: AnswerType::MultiVariant,
        },
        Some(vec![
            "Email".to_string(),
            "Phone".to_string(),
            "Chat".to_string(),
        ]),
        &admin,
    )?;

    let respondent = if args.interviewee == 0 {
        service.caller(Some(DEMO_USER))
    } else {
        Caller::Anonymous
    };

    let interview = service.start_interview(set.id, args.interviewee, &respondent)?;
    println!(
        "- started interview {} on '{}' at {}",
        interview.id,
        set.title,
        interview.start_date.to_rfc3339()
    );

    service.register_answers(interview.id, comment.id, vec![args.comment], &respondent)?;
    service.register_answers(interview.id, rating.id, vec![args.rating], &respondent)?;
    service.register_answers(interview.id, channels.id, args.channel, &respondent)?;

    let history = service
        .queries()
        .user_interviews(args.interviewee, &respondent)?;
    Ok(history)
}

fn render_history(history: &[InterviewHistoryView]) {
    for interview in history {
        println!(
            "\nInterview {} ({})",
            interview.id, interview.question_set.question_set.title
        );
        for question in &interview.question_set.questions {
            let answers = if question.answers.is_empty() {
                "<no answer>".to_string()
            } else {
                question
                    .answers
                    .iter()
                    .map(|answer| answer.answer_text.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!(
                "  - [{}] {}: {}",
                question.answer_type.label(),
                question.question_text,
                answers
            );
        }
    }
}
