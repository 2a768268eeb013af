pub mod dispatch;
pub mod models;
pub mod report;
pub use dispatch::*;
pub use models::*;
pub use report::*;
