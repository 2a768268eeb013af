pub mod config;
pub mod error;
pub mod services;

pub use config::AppConfig;
pub use error::DispatchError;
pub use services::Services;
