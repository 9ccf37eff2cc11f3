/// Router Module Index
///
/// Routing is split into security-segregated modules so access control is
/// applied explicitly at the module level rather than per-handler by accident.

/// Routes accessible to any client: catalog reads, enquiry submission, the
/// published video feed, and the credential endpoints.
pub mod public;

/// Routes requiring a valid session. Protected by the auth middleware layer;
/// handlers additionally take `AuthUser` for identity and ownership checks.
pub mod authenticated;

/// Console routes nested under `/admin`. Each handler carries an `AdminUser`
/// or `StaffUser` extractor that enforces the role gate, which is what lets
/// the unauthenticated `/admin/login` endpoint live in the same module.
pub mod admin;
