pub mod aggregator;
pub mod calculator;
pub mod service;
pub mod types;
