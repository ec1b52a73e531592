/// Router Module Index
///
/// Splits the route table by access level. The split is organizational: the
/// admin module's handlers each carry the `AdminUser` guard, so merging the
/// two routers cannot accidentally expose a protected endpoint.

/// Routes accessible without a token.
pub mod public;

/// Routes restricted to users with the `admin` role.
pub mod admin;
