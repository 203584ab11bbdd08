pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod paths;
pub mod router;
pub mod services;
pub mod session;
pub mod state;

#[cfg(test)]
pub mod testing;
