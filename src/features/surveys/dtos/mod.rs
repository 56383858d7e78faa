mod survey_dto;

pub use survey_dto::{
    CreateSurveyResponseDto, RoleCountDto, RoleOption, SurveyFormInput, SurveyQueryParams,
    SurveyResponseDto, SurveySummaryDto,
};
