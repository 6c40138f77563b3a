pub mod models;
pub mod envelope;

pub use models::{Delivery, Device, Order, OrderType};
pub use envelope::{assemble, generate_transaction_id, EnrollmentEnvelope};
