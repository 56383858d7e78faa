/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Global admin - can do everything
pub const ROLE_SUPER_ADMIN: &str = "super_admin";

/// Content manager - curates resources and reads survey results
pub const ROLE_CONTENT_MANAGER: &str = "content_manager";
