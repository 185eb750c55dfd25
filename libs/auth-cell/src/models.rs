use serde::Deserialize;

use shared_models::UserRole;

/// Where the caller's session stands, in resolution order. Clients sit in
/// `Loading` until their session check returns; the server-side resolver
/// only ever produces the other three.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    Unauthenticated,
    /// Valid session, but no profile row has been fetched yet.
    MissingProfile,
    Ready(UserRole),
}

/// Outcome of the route guard for one requested path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Keep the blocking state up until the session resolves.
    Wait,
    Redirect(String),
    Allow,
}

#[derive(Debug, Deserialize)]
pub struct RouteDecisionQuery {
    pub path: String,
    /// Comma-separated roles permitted on the path. Missing or empty means
    /// any role may enter.
    pub allow: Option<String>,
}
