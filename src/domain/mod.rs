//! Domain types and rules of the approval flow: amounts, requests, validation,
//! the session state machine and the ports the engine is wired through.

pub mod amount;
pub mod dedup;
pub mod idempotency;
pub mod message;
pub mod ports;
pub mod request;
pub mod session;
pub mod validator;
