pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use routes::{admin_routes, page_routes, public_routes};
pub use services::SurveyService;
