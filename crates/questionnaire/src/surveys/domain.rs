use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

record_id!(
    /// Identifier of a questionnaire.
    QuestionSetId
);
record_id!(QuestionId);
record_id!(AnswerVariantId);
record_id!(InterviewId);
record_id!(AnswerId);
record_id!(
    /// Account identifier of an authenticated user.
    UserId
);
record_id!(
    /// Externally supplied identifier of an anonymous interviewee. Never zero.
    IntervieweeId
);

/// A named, time-windowed questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub id: QuestionSetId,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Fields supplied when a question set is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSetDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl QuestionSetDraft {
    pub fn into_record(self, id: QuestionSetId) -> QuestionSet {
        QuestionSet {
            id,
            title: self.title,
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Answer contract of a question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnswerType {
    #[default]
    Text,
    #[serde(rename = "ONEVARIANT")]
    OneVariant,
    #[serde(rename = "MULTIVARIANT")]
    MultiVariant,
}

impl AnswerType {
    pub const fn label(self) -> &'static str {
        match self {
            AnswerType::Text => "TEXT",
            AnswerType::OneVariant => "ONEVARIANT",
            AnswerType::MultiVariant => "MULTIVARIANT",
        }
    }

    /// Whether answers must come from the question's closed variant set.
    pub const fn uses_variants(self) -> bool {
        matches!(self, AnswerType::OneVariant | AnswerType::MultiVariant)
    }

    /// Whether exactly one answer is accepted per submission.
    pub const fn is_single(self) -> bool {
        matches!(self, AnswerType::Text | AnswerType::OneVariant)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub question_set_id: QuestionSetId,
    pub question_text: String,
    pub answer_type: AnswerType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub question_set_id: QuestionSetId,
    pub question_text: String,
    #[serde(default)]
    pub answer_type: AnswerType,
}

impl QuestionDraft {
    pub fn into_record(self, id: QuestionId) -> Question {
        Question {
            id,
            question_set_id: self.question_set_id,
            question_text: self.question_text,
            answer_type: self.answer_type,
        }
    }
}

/// A predefined acceptable answer for a closed-ended question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerVariant {
    pub id: AnswerVariantId,
    pub question_id: QuestionId,
    pub answer_text: String,
}

/// Who an interview belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    Anonymous(IntervieweeId),
    Authenticated(UserId),
}

impl Identity {
    pub const fn interviewee_id(&self) -> Option<IntervieweeId> {
        match self {
            Identity::Anonymous(id) => Some(*id),
            Identity::Authenticated(_) => None,
        }
    }

    pub const fn loggedin_user(&self) -> Option<UserId> {
        match self {
            Identity::Anonymous(_) => None,
            Identity::Authenticated(user) => Some(*user),
        }
    }
}

/// One instance of an identity answering a question set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interview {
    pub id: InterviewId,
    pub question_set_id: QuestionSetId,
    pub identity: Identity,
    pub start_date: DateTime<Utc>,
}

impl Interview {
    /// Authenticated interviews belong to their user; anonymous ones are open to any caller.
    pub fn accessible_by(&self, caller: &Caller) -> bool {
        match self.identity {
            Identity::Anonymous(_) => true,
            Identity::Authenticated(owner) => caller.user_id() == Some(owner),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewDraft {
    pub question_set_id: QuestionSetId,
    pub identity: Identity,
    pub start_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub interview_id: InterviewId,
    pub question_id: QuestionId,
    pub answer_text: String,
}

/// The party issuing a request, as resolved by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User { id: UserId, admin: bool },
}

impl Caller {
    pub const fn user(id: UserId) -> Self {
        Caller::User { id, admin: false }
    }

    pub const fn admin(id: UserId) -> Self {
        Caller::User { id, admin: true }
    }

    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Caller::Anonymous => None,
            Caller::User { id, .. } => Some(*id),
        }
    }
}

/// Field limits carried over from the persisted schema.
pub mod limits {
    pub const TITLE: usize = 100;
    pub const DESCRIPTION: usize = 500;
    pub const QUESTION_TEXT: usize = 250;
    pub const VARIANT_TEXT: usize = 50;
    pub const ANSWER_TEXT: usize = 50;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn answer_type_uses_wire_labels() {
        assert_eq!(
            serde_json::to_value(AnswerType::OneVariant).unwrap(),
            json!("ONEVARIANT")
        );
        let parsed: AnswerType = serde_json::from_value(json!("MULTIVARIANT")).unwrap();
        assert_eq!(parsed, AnswerType::MultiVariant);
        let parsed: AnswerType = serde_json::from_value(json!("TEXT")).unwrap();
        assert_eq!(parsed.label(), "TEXT");
    }

    #[test]
    fn identity_exposes_exactly_one_owner_field() {
        let anonymous = Identity::Anonymous(IntervieweeId(5));
        assert_eq!(anonymous.interviewee_id(), Some(IntervieweeId(5)));
        assert_eq!(anonymous.loggedin_user(), None);

        let authenticated = Identity::Authenticated(UserId(9));
        assert_eq!(authenticated.interviewee_id(), None);
        assert_eq!(authenticated.loggedin_user(), Some(UserId(9)));
    }

    #[test]
    fn only_owner_reaches_authenticated_interviews() {
        let interview = |identity| Interview {
            id: InterviewId(1),
            question_set_id: QuestionSetId(1),
            identity,
            start_date: Utc::now(),
        };

        let owned = interview(Identity::Authenticated(UserId(9)));
        assert!(owned.accessible_by(&Caller::user(UserId(9))));
        assert!(!owned.accessible_by(&Caller::admin(UserId(1))));
        assert!(!owned.accessible_by(&Caller::Anonymous));

        let anonymous = interview(Identity::Anonymous(IntervieweeId(5)));
        assert!(anonymous.accessible_by(&Caller::Anonymous));
        assert!(anonymous.accessible_by(&Caller::user(UserId(2))));
    }
}
