/// Router Module Index
///
/// Splits the HTTP surface by access level. Access control is attached to a whole
/// router with a layer, never per handler, so a new admin endpoint cannot be exposed
/// by forgetting a check.

/// Anonymous routes: public reads, CV intake, contact form, renderer partials.
pub mod public;

/// Mutating and administrative routes, wrapped by the bearer-token middleware.
pub mod admin;
