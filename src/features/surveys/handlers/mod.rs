mod survey_handler;
mod survey_page_handler;

pub use survey_handler::*;
pub use survey_page_handler::{submit_survey_form, survey_page};
