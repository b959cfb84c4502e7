//! Deployment secret management

pub mod store;
pub mod words;
