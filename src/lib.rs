pub mod adaptive;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod scenario;
pub mod store;
