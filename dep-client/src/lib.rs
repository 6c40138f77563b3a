//! Client for the DEP enrollment service.
//!
//! ```ignore
//! use dep_client::DepClient;
//!
//! let settings = dep_config::DepSettings::load()?;
//! let profile = dep_config::resolve(&settings)?;
//! let client = DepClient::new(settings.client_options());
//!
//! let result = client.enroll("TXN_001122", order, &profile).await?;
//! for device in result.rejected_devices() {
//!     println!("{}: {:?}", device.serial_number, device.status);
//! }
//! ```

pub mod client;
pub mod response;
pub mod submission;
pub mod transport;

pub use client::{DepClient, RequestContext};
pub use dep_config::ClientOptions;
pub use response::{interpret, interpret_str, ApiFault, EnrollmentResult, EntityStatus, Outcome};
pub use submission::{Submission, SubmissionState};
pub use transport::{EnrollmentTransport, RemoteResponse};
