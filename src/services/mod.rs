pub mod auth_service;
pub mod doc_store_service;
pub mod user_service;
