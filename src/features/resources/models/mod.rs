mod resource;

pub use resource::{Resource, ResourceRow, ResourceSource, ResourceType, StoredFile};
