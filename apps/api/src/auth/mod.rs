//! Admin authentication: Google sign-in backed by server-side sessions,
//! plus a static bearer token for scripted access.

pub mod extractors;
pub mod google;
pub mod handlers;
pub mod session;
pub mod users;

pub use extractors::{AdminAccess, CurrentUser};
