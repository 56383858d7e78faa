mod survey_response;

pub use survey_response::{SurveyRespondentRole, SurveyResponse};
