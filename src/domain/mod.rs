// Domain layer - Pure telemetry types and calculations
pub mod alarm;
pub mod axis;
pub mod dashboard;
pub mod history;
pub mod metrics;
pub mod phase;
pub mod series;
pub mod telemetry;
pub mod timestamp;
