pub mod outbox;
pub mod persistence;
pub mod registry;
pub mod relay;
pub mod session;
