//! Site storage

pub mod env_file;
pub mod layout;
