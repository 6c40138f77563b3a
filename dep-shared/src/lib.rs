pub mod pii;
pub mod wire_time;

pub use pii::Masked;
