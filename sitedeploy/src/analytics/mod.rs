//! Analytics events

pub mod client;
