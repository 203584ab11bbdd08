//! Application services.
//!
//! Entitlement checks, ticket minting and progress rollups. Handlers call
//! these instead of touching the decision logic themselves.

pub mod entitlement;
pub mod progress;
pub mod signing;
pub mod tickets;
