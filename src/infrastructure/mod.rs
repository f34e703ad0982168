// Infrastructure layer - External dependencies and adapters
pub mod chunked_json;
pub mod config;
pub mod firestore_repository;
pub mod fixtures;
pub mod http_response;
pub mod memory_repository;
