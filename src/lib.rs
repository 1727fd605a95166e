pub mod arguments;
pub mod cache;
pub mod config;
pub mod constants;
pub mod errors;
pub mod jar;
pub mod logger;
pub mod sources;
pub mod webserver;
