//! Security token service
//!
//! Request parsing, issuance, the exchange pipeline and revocation.

pub mod exchange;
pub mod issue;
pub mod request;
pub mod revoke;

pub use exchange::TokenService;
pub use issue::{IssuedToken, Issuer};
pub use request::TokenRequest;
