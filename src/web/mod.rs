//! HTTP surface of StudyOlle.
//!
//! Page handlers answer with [`View`] documents or `303` redirects; the
//! tag and zone endpoints take JSON bodies. The logged-in member travels in
//! a signed `SESSION` cookie.

pub mod error;
pub mod flash;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;
pub mod session;
pub mod view;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
pub use session::{CurrentUser, OptionalUser, SessionKeys};
pub use view::View;
