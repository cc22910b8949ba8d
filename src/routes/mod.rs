/// Router Module Index
///
/// Routes are split by access level so the session check is applied once per
/// router (via an Axum layer) rather than per handler.

/// Routes reachable without a session.
pub mod public;

/// Routes behind the `AuthUser` extractor middleware.
pub mod authenticated;
