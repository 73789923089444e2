//! Token lifecycle and request authentication.
//!
//! Two token types: short-lived access tokens (stateless, sent as
//! `Authorization: Bearer`) and longer-lived refresh tokens that are only
//! honoured while whitelisted in the database. Every refresh is a rotation.

mod cookie;
mod errors;
mod extractors;
mod gate;
mod ip;
mod service;
mod types;

pub use cookie::{REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie};
pub use errors::{AuthError, AuthResultExt};
pub use extractors::{AdminOnly, AnyRole, Auth, RoleConstraint};
pub use gate::{authenticate, parse_bearer};
pub use ip::extract_client_ip;
pub use service::TokenService;
pub use types::Principal;
