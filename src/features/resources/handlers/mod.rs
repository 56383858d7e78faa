mod resource_handler;
mod resource_page_handler;

pub use resource_handler::*;
pub use resource_page_handler::resources_page;
