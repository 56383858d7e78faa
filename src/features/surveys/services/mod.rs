mod survey_service;

pub use survey_service::SurveyService;
