//! Deployment of uploaded site archives

pub mod archive;
pub mod disc_space;
pub mod pipeline;
