//! Realtime collaboration session layer.
//!
//! Authenticates live WebSocket connections against documents, tracks who
//! is present on each document, relays edits between the members of a
//! document room and persists the latest edit on a best-effort basis.

pub mod clients;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod websocket;
pub mod ws;

pub use routes::build_router;
pub use state::AppState;
