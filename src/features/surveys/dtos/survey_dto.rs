use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::features::surveys::models::{SurveyRespondentRole, SurveyResponse};
use crate::shared::types::{
    default_page, default_page_size, deserialize_blank_as_none, PaginationQuery, SortDirection,
};

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Feedback must not be blank".into()));
    }
    Ok(())
}

fn validate_follow_up(dto: &CreateSurveyResponseDto) -> Result<(), ValidationError> {
    let has_email = dto
        .respondent_email
        .as_deref()
        .is_some_and(|email| !email.trim().is_empty());
    if dto.wants_follow_up && !has_email {
        return Err(ValidationError::new("follow_up_email")
            .with_message("An email address is required to receive a follow-up".into()));
    }
    Ok(())
}

/// Request DTO for submitting a survey response
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_follow_up"))]
pub struct CreateSurveyResponseDto {
    /// Optional name of the respondent
    #[serde(default, deserialize_with = "deserialize_blank_as_none")]
    #[validate(length(max = 255, message = "Name must not exceed 255 characters"))]
    pub respondent_name: Option<String>,

    /// Optional email, required when `wants_follow_up` is set
    #[serde(default, deserialize_with = "deserialize_blank_as_none")]
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must not exceed 255 characters")
    )]
    pub respondent_email: Option<String>,

    pub role: SurveyRespondentRole,

    /// Satisfaction score from 1 (poor) to 5 (excellent)
    #[validate(range(min = 1, max = 5, message = "Satisfaction must be between 1 and 5"))]
    #[schema(minimum = 1, maximum = 5, example = 4)]
    pub satisfaction: i16,

    /// Resource the respondent found most useful
    #[serde(default, deserialize_with = "deserialize_blank_as_none")]
    #[validate(length(max = 500, message = "Most useful resource must not exceed 500 characters"))]
    pub most_useful_resource: Option<String>,

    #[validate(
        length(min = 1, max = 5000, message = "Feedback must be 1-5000 characters"),
        custom(function = "validate_not_blank")
    )]
    pub feedback: String,

    #[serde(default)]
    pub wants_follow_up: bool,
}

/// Raw fields of the HTML survey form.
///
/// Everything is kept as submitted so an invalid form can be shown again as typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyFormInput {
    pub respondent_name: Option<String>,
    pub respondent_email: Option<String>,
    pub role: Option<String>,
    pub satisfaction: Option<String>,
    pub most_useful_resource: Option<String>,
    pub feedback: Option<String>,
    /// Checkbox value, "on" when ticked
    pub wants_follow_up: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl SurveyFormInput {
    /// Parse and validate the form, collecting every problem as a readable message
    pub fn to_dto(&self) -> Result<CreateSurveyResponseDto, Vec<String>> {
        let mut errors = Vec::new();

        let role = match non_blank(&self.role) {
            Some(raw) => SurveyRespondentRole::parse(&raw).or_else(|| {
                errors.push("Please choose a valid role".to_string());
                None
            }),
            None => {
                errors.push("Please tell us who you are".to_string());
                None
            }
        };

        let satisfaction = match non_blank(&self.satisfaction) {
            Some(raw) => raw.parse::<i16>().ok().or_else(|| {
                errors.push("Satisfaction must be a number between 1 and 5".to_string());
                None
            }),
            None => {
                errors.push("Please rate your satisfaction".to_string());
                None
            }
        };

        // Placeholders only stand in when an error has already been recorded
        let dto = self.build(
            role.unwrap_or(SurveyRespondentRole::Other),
            satisfaction.unwrap_or(3),
        );
        if let Err(e) = dto.validate() {
            errors.extend(validation_messages(&e));
        }

        if errors.is_empty() {
            Ok(dto)
        } else {
            Err(errors)
        }
    }

    fn build(&self, role: SurveyRespondentRole, satisfaction: i16) -> CreateSurveyResponseDto {
        CreateSurveyResponseDto {
            respondent_name: non_blank(&self.respondent_name),
            respondent_email: non_blank(&self.respondent_email),
            role,
            satisfaction,
            most_useful_resource: non_blank(&self.most_useful_resource),
            feedback: self.feedback.clone().unwrap_or_default(),
            wants_follow_up: self
                .wants_follow_up
                .as_deref()
                .is_some_and(|v| matches!(v, "on" | "true" | "1")),
        }
    }
}

/// Flatten validator errors into messages, sorted for stable output
fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();
    messages.sort();
    messages.dedup();
    messages
}

/// A role choice shown on the form
#[derive(Debug, Clone, Serialize)]
pub struct RoleOption {
    pub value: &'static str,
    pub label: &'static str,
}

impl RoleOption {
    pub fn all() -> Vec<RoleOption> {
        SurveyRespondentRole::ALL
            .iter()
            .map(|role| RoleOption {
                value: role.as_str(),
                label: role.label(),
            })
            .collect()
    }
}

/// Query params for listing survey responses
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SurveyQueryParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,

    /// Items per page
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,

    /// Filter by respondent role
    pub role: Option<SurveyRespondentRole>,

    /// Sort direction on submission time (default: desc)
    #[serde(default)]
    pub sort: SortDirection,
}

impl SurveyQueryParams {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Response DTO for a stored survey response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SurveyResponseDto {
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

impl From<SurveyResponse> for SurveyResponseDto {
    fn from(r: SurveyResponse) -> Self {
        Self {
            id: r.id,
            respondent_name: r.respondent_name,
            respondent_email: r.respondent_email,
            role: r.role,
            satisfaction: r.satisfaction,
            most_useful_resource: r.most_useful_resource,
            feedback: r.feedback,
            wants_follow_up: r.wants_follow_up,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleCountDto {
    pub role: SurveyRespondentRole,
    pub count: i64,
}

/// Aggregate view of all survey responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SurveySummaryDto {
    pub total_responses: i64,
    /// `null` when there are no responses yet
    pub average_satisfaction: Option<f64>,
    /// One entry per role, including roles without responses
    pub by_role: Vec<RoleCountDto>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::lorem::en::Sentence;
    use fake::faker::name::en::Name;
    use fake::Fake;
    use serde_json::json;

    fn filled_form() -> SurveyFormInput {
        SurveyFormInput {
            respondent_name: Some(Name().fake()),
            respondent_email: Some(SafeEmail().fake()),
            role: Some("teacher".to_string()),
            satisfaction: Some("4".to_string()),
            most_useful_resource: Some("Fractions worksheet".to_string()),
            feedback: Some(Sentence(3..8).fake()),
            wants_follow_up: Some("on".to_string()),
        }
    }

    #[test]
    fn test_form_converts_to_dto() {
        let dto = filled_form().to_dto().unwrap();
        assert_eq!(dto.role, SurveyRespondentRole::Teacher);
        assert_eq!(dto.satisfaction, 4);
        assert!(dto.wants_follow_up);
    }

    #[test]
    fn test_form_blank_optional_fields_become_none() {
        let form = SurveyFormInput {
            respondent_name: Some("  ".to_string()),
            respondent_email: Some(String::new()),
            most_useful_resource: None,
            wants_follow_up: None,
            ..filled_form()
        };
        let dto = form.to_dto().unwrap();
        assert_eq!(dto.respondent_name, None);
        assert_eq!(dto.respondent_email, None);
        assert!(!dto.wants_follow_up);
    }

    #[test]
    fn test_form_collects_all_errors() {
        let form = SurveyFormInput {
            role: None,
            satisfaction: Some("9".to_string()),
            feedback: Some(String::new()),
            ..filled_form()
        };
        let errors = form.to_dto().unwrap_err();
        assert!(errors.contains(&"Please tell us who you are".to_string()));
        assert!(errors.iter().any(|e| e.starts_with("Feedback")));

        let form = SurveyFormInput {
            satisfaction: Some("9".to_string()),
            ..filled_form()
        };
        let errors = form.to_dto().unwrap_err();
        assert_eq!(errors, vec!["Satisfaction must be between 1 and 5".to_string()]);

        let form = SurveyFormInput {
            satisfaction: Some("great".to_string()),
            ..filled_form()
        };
        assert!(form.to_dto().is_err());
    }

    #[test]
    fn test_follow_up_requires_email() {
        let form = SurveyFormInput {
            respondent_email: None,
            ..filled_form()
        };
        let errors = form.to_dto().unwrap_err();
        assert_eq!(
            errors,
            vec!["An email address is required to receive a follow-up".to_string()]
        );
    }

    #[test]
    fn test_json_dto_validation() {
        let dto: CreateSurveyResponseDto = serde_json::from_value(json!({
            "role": "parent",
            "satisfaction": 5,
            "feedback": "Very helpful"
        }))
        .unwrap();
        assert!(dto.validate().is_ok());
        assert!(!dto.wants_follow_up);

        let zero = CreateSurveyResponseDto {
            satisfaction: 0,
            ..dto.clone()
        };
        assert!(zero.validate().is_err());

        let bad_email = CreateSurveyResponseDto {
            respondent_email: Some("not-an-email".to_string()),
            ..dto
        };
        assert!(bad_email.validate().is_err());

        assert!(serde_json::from_value::<CreateSurveyResponseDto>(json!({
            "role": "principal",
            "satisfaction": 3,
            "feedback": "x"
        }))
        .is_err());
    }

    #[test]
    fn test_json_blank_optionals_match_form() {
        let dto: CreateSurveyResponseDto = serde_json::from_value(json!({
            "respondent_name": " ",
            "respondent_email": "",
            "most_useful_resource": "",
            "role": "student",
            "satisfaction": 4,
            "feedback": "Clear instructions"
        }))
        .unwrap();
        assert_eq!(dto.respondent_email, None);
        assert_eq!(dto.respondent_name, None);
        assert_eq!(dto.most_useful_resource, None);
        assert!(dto.validate().is_ok());

        let form = SurveyFormInput {
            respondent_email: Some(String::new()),
            wants_follow_up: None,
            ..filled_form()
        };
        assert_eq!(form.to_dto().unwrap().respondent_email, dto.respondent_email);

        let follow_up: CreateSurveyResponseDto = serde_json::from_value(json!({
            "respondent_email": "  ",
            "role": "student",
            "satisfaction": 4,
            "feedback": "Clear instructions",
            "wants_follow_up": true
        }))
        .unwrap();
        assert!(follow_up.validate().is_err());
    }

    #[test]
    fn test_role_options_cover_all_roles() {
        let options = RoleOption::all();
        assert_eq!(options.len(), 4);
        assert_eq!(options[0].value, "student");
    }
}
