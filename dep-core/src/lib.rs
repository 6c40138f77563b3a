pub mod environment;
pub mod error;

pub use environment::{DepEnvironment, EnvironmentProfile};
pub use error::{CoreError, CoreResult, ErrorKind};
