pub mod app_config;
pub mod resolver;

pub use app_config::{ClientOptions, DepSettings};
pub use resolver::{resolve, resolve_from_environment};
