pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{GuardState, RouteDecision, RouteDecisionQuery};
pub use router::auth_routes;
pub use services::guard::{decide, parse_allow_list, GuardService};
