use async_trait::async_trait;
use serde_json::Value;

use dep_core::{CoreResult, EnvironmentProfile};
use dep_order::EnrollmentEnvelope;

/// A successful (2xx) reply whose body parsed as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: Value,
}

/// The single I/O seam of the SDK: deliver one envelope, exactly once.
#[async_trait]
pub trait EnrollmentTransport: Send + Sync {
    async fn submit(
        &self,
        envelope: &EnrollmentEnvelope,
        profile: &EnvironmentProfile,
    ) -> CoreResult<RemoteResponse>;
}
