//! Desktop client for tagging people on a photo-sharing server.

pub mod api;
pub mod app;
pub mod context;
pub mod session;
pub mod tags;
pub mod worker;
