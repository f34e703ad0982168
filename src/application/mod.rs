// Application layer - Use cases and live data plumbing
pub mod alarm_service;
pub mod dashboard_service;
pub mod data_hub;
pub mod fixture_service;
pub mod history_service;
pub mod live_chart;
pub mod series_board;
pub mod streaming_service;
pub mod subscriber;
pub mod telemetry_repository;
