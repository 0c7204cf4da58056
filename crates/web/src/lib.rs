//! `indica-web`: screen composition on top of the auth gate.
//!
//! [`AuthContext`] is the one owned composition root: it wires the session store, the
//! role resolver and the gate, and answers every navigation with an
//! [`AccessDecision`](indica_auth::AccessDecision).

pub mod context;
pub mod navigation;
pub mod routes;

pub use context::AuthContext;
pub use navigation::{NavLink, NavigationPresenter};
pub use routes::{RouteMatch, RouteTable, Screen};
