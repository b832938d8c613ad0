//! Authentication module for the link page server
//!
//! Password hashing, bearer token issuance/validation and the access gate
//! middleware that turns a request's `Authorization` header into an identity.

pub mod gate;
pub mod password;
mod token;

pub use gate::{AccessGate, AuthenticatedUser, GateMode, Identity, ANONYMOUS};
pub use token::{Claims, TokenService};
