use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// Who answered the survey, matching the `survey_respondent_role` database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "survey_respondent_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SurveyRespondentRole {
    Student,
    Teacher,
    Parent,
    Other,
}

impl SurveyRespondentRole {
    /// Every role, in the order the form lists them
    pub const ALL: [SurveyRespondentRole; 4] = [
        SurveyRespondentRole::Student,
        SurveyRespondentRole::Teacher,
        SurveyRespondentRole::Parent,
        SurveyRespondentRole::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SurveyRespondentRole::Student => "student",
            SurveyRespondentRole::Teacher => "teacher",
            SurveyRespondentRole::Parent => "parent",
            SurveyRespondentRole::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SurveyRespondentRole::Student => "Student",
            SurveyRespondentRole::Teacher => "Teacher",
            SurveyRespondentRole::Parent => "Parent or guardian",
            SurveyRespondentRole::Other => "Other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == value.trim())
    }
}

/// Database model for a survey response
#[derive(Debug, Clone, FromRow)]
pub struct SurveyResponse {
    pub id: Uuid,
    pub respondent_name: Option<String>,
    pub respondent_email: Option<String>,
    pub role: SurveyRespondentRole,
    pub satisfaction: i16,
    pub most_useful_resource: Option<String>,
    pub feedback: String,
    pub wants_follow_up: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_matches_wire_names() {
        for role in SurveyRespondentRole::ALL {
            assert_eq!(SurveyRespondentRole::parse(role.as_str()), Some(role));
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
        assert_eq!(SurveyRespondentRole::parse("principal"), None);
        assert_eq!(SurveyRespondentRole::parse(""), None);
    }
}
