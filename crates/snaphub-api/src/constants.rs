//! API constants

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

pub const API_VERSION: &str = "v1";

/// Versioned prefix every API route is nested under
pub const API_PREFIX: &str = "/api/v1";

/// Multipart field carrying the submitter's token secret
pub const FIELD_TOKEN: &str = "token";
pub const FIELD_CATEGORY: &str = "category_id";
pub const FIELD_NOTE: &str = "note";
pub const FIELD_NOTIFY: &str = "notify";
/// Repeated multipart field, one part per file
pub const FIELD_FILES: &str = "files";
