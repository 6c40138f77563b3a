//! Reading the enrollment service's reply.
//!
//! Key names are the vendor's and are matched as-is. A reply that rejects some
//! devices is a normal [`EnrollmentResult`]; only a reply whose shape cannot be
//! understood at all is an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use dep_core::{CoreError, CoreResult};

const ACCEPTED_CODES: &[&str] = &["SUCCESS", "COMPLETE", "ACCEPTED", "POSTED"];
const ALREADY_ENROLLED_CODES: &[&str] = &["ALREADY_ENROLLED"];
const PARTIAL_CODES: &[&str] = &["COMPLETE_WITH_ERRORS"];

/// Status the service assigned to one order, delivery or device
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    Accepted,
    Rejected(String),
    AlreadyEnrolled,
}

impl EntityStatus {
    pub fn from_code(code: &str, message: Option<&str>) -> Self {
        let normalized = code.trim().to_ascii_uppercase();
        if ACCEPTED_CODES.contains(&normalized.as_str()) {
            EntityStatus::Accepted
        } else if ALREADY_ENROLLED_CODES.contains(&normalized.as_str()) {
            EntityStatus::AlreadyEnrolled
        } else {
            let reason = match message.map(str::trim) {
                Some(m) if !m.is_empty() => m.to_string(),
                _ => code.trim().to_string(),
            };
            EntityStatus::Rejected(reason)
        }
    }

    /// Accepted, or already where it needs to be
    pub fn is_enrolled(&self) -> bool {
        !matches!(self, EntityStatus::Rejected(_))
    }
}

/// Overall verdict for one submission
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Accepted,
    PartiallyAccepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApiFault {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeviceOutcome {
    pub serial_number: String,
    pub status: Option<EntityStatus>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub delivery_number: String,
    pub status: Option<EntityStatus>,
    pub devices: Vec<DeviceOutcome>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OrderOutcome {
    pub order_number: String,
    pub status: Option<EntityStatus>,
    pub deliveries: Vec<DeliveryOutcome>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EnrollmentResult {
    /// Service-assigned `deviceEnrollmentTransactionId`, when returned
    pub transaction_id: Option<String>,
    pub status_code: Option<String>,
    pub status_message: Option<String>,
    pub outcome: Outcome,
    pub orders: Vec<OrderOutcome>,
    pub faults: Vec<ApiFault>,
}

impl EnrollmentResult {
    pub fn devices(&self) -> impl Iterator<Item = &DeviceOutcome> {
        self.orders
            .iter()
            .flat_map(|o| o.deliveries.iter())
            .flat_map(|d| d.devices.iter())
    }

    pub fn accepted_devices(&self) -> impl Iterator<Item = &DeviceOutcome> {
        self.devices()
            .filter(|d| matches!(d.status, Some(EntityStatus::Accepted)))
    }

    pub fn rejected_devices(&self) -> impl Iterator<Item = &DeviceOutcome> {
        self.devices()
            .filter(|d| matches!(d.status, Some(EntityStatus::Rejected(_))))
    }

    pub fn device(&self, serial_number: &str) -> Option<&DeviceOutcome> {
        self.devices().find(|d| d.serial_number == serial_number)
    }
}

/// Parse a raw response string.
pub fn interpret_str(raw: &str) -> CoreResult<EnrollmentResult> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| CoreError::MalformedResponseError(format!("response is not JSON: {}", e)))?;
    interpret(&value)
}

/// Turn a parsed response envelope into an [`EnrollmentResult`].
pub fn interpret(raw: &Value) -> CoreResult<EnrollmentResult> {
    if !raw.is_object() {
        return Err(CoreError::MalformedResponseError(
            "response envelope is not a JSON object".to_string(),
        ));
    }

    let envelope = RawEnvelope::deserialize(raw).map_err(|e| {
        CoreError::MalformedResponseError(format!("unexpected response envelope: {}", e))
    })?;

    let (status_code, status_message) = match (&envelope.status_code, &envelope.enroll_devices_response) {
        (Some(code), _) => (Some(code.clone()), envelope.status_message.clone()),
        (None, Some(inner)) => (inner.status_code.clone(), inner.status_message.clone()),
        (None, None) => (None, None),
    };

    let faults = envelope.faults();
    let orders: Vec<OrderOutcome> = envelope
        .orders
        .clone()
        .unwrap_or_default()
        .into_iter()
        .map(RawOrder::into_outcome)
        .collect();

    if status_code.is_none() && envelope.orders.is_none() && faults.is_empty() {
        return Err(CoreError::MalformedResponseError(
            "response carries no status, orders or errors".to_string(),
        ));
    }

    let outcome = decide(status_code.as_deref(), &orders, &faults);

    tracing::debug!(
        "Interpreted DEP response: outcome={:?}, status={:?}, orders={}, faults={}",
        outcome,
        status_code,
        orders.len(),
        faults.len()
    );

    Ok(EnrollmentResult {
        transaction_id: envelope.device_enrollment_transaction_id,
        status_code,
        status_message,
        outcome,
        orders,
        faults,
    })
}

/// Most specific evidence wins: devices, then deliveries, then orders, then
/// the overall status code.
fn decide(status_code: Option<&str>, orders: &[OrderOutcome], faults: &[ApiFault]) -> Outcome {
    let devices: Vec<bool> = orders
        .iter()
        .flat_map(|o| o.deliveries.iter())
        .flat_map(|d| d.devices.iter())
        .filter_map(|d| d.status.as_ref().map(EntityStatus::is_enrolled))
        .collect();
    let deliveries: Vec<bool> = orders
        .iter()
        .flat_map(|o| o.deliveries.iter())
        .filter_map(|d| d.status.as_ref().map(EntityStatus::is_enrolled))
        .collect();
    let order_level: Vec<bool> = orders
        .iter()
        .filter_map(|o| o.status.as_ref().map(EntityStatus::is_enrolled))
        .collect();

    let evidence = if !devices.is_empty() {
        devices
    } else if !deliveries.is_empty() {
        deliveries
    } else if !order_level.is_empty() {
        order_level
    } else {
        match status_code.map(|c| c.trim().to_ascii_uppercase()) {
            Some(code) if PARTIAL_CODES.contains(&code.as_str()) => return Outcome::PartiallyAccepted,
            Some(code) => vec![EntityStatus::from_code(&code, None).is_enrolled()],
            None => Vec::new(),
        }
    };

    let any = evidence.iter().any(|ok| *ok);
    let all = !evidence.is_empty() && evidence.iter().all(|ok| *ok);

    if all && faults.is_empty() {
        Outcome::Accepted
    } else if any {
        Outcome::PartiallyAccepted
    } else {
        Outcome::Rejected
    }
}

// Vendor wire shapes

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    #[serde(alias = "deviceEnrollmentTransactionID")]
    device_enrollment_transaction_id: Option<String>,
    status_code: Option<String>,
    status_message: Option<String>,
    enroll_devices_response: Option<RawStatus>,
    orders: Option<Vec<RawOrder>>,
    error_code: Option<String>,
    error_message: Option<String>,
    enroll_device_error_response: Option<OneOrMany<RawFault>>,
    check_transaction_error_response: Option<OneOrMany<RawFault>>,
    show_order_error_response: Option<OneOrMany<RawFault>>,
}

impl RawEnvelope {
    fn faults(&self) -> Vec<ApiFault> {
        let mut faults = Vec::new();
        if let Some(code) = &self.error_code {
            faults.push(ApiFault {
                code: code.clone(),
                message: self.error_message.clone().unwrap_or_default(),
            });
        }
        for group in [
            &self.enroll_device_error_response,
            &self.check_transaction_error_response,
            &self.show_order_error_response,
        ]
        .into_iter()
        .flatten()
        {
            faults.extend(group.items().into_iter().map(|f| ApiFault {
                code: f.error_code.clone(),
                message: f.error_message.clone().unwrap_or_default(),
            }));
        }
        faults
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    status_code: Option<String>,
    status_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFault {
    error_code: String,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
    Nested(Vec<Vec<T>>),
}

impl<T: Clone> OneOrMany<T> {
    fn items(&self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item.clone()],
            OneOrMany::Many(items) => items.clone(),
            OneOrMany::Nested(groups) => groups.iter().flatten().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrder {
    #[serde(default)]
    order_number: String,
    order_post_status: Option<String>,
    order_post_status_message: Option<String>,
    show_order_status_code: Option<String>,
    show_order_status_message: Option<String>,
    #[serde(default)]
    deliveries: Vec<RawDelivery>,
}

impl RawOrder {
    fn into_outcome(self) -> OrderOutcome {
        let status = match (&self.order_post_status, &self.show_order_status_code) {
            (Some(code), _) => Some(EntityStatus::from_code(code, self.order_post_status_message.as_deref())),
            (None, Some(code)) => Some(EntityStatus::from_code(code, self.show_order_status_message.as_deref())),
            (None, None) => None,
        };
        OrderOutcome {
            order_number: self.order_number,
            status,
            deliveries: self.deliveries.into_iter().map(RawDelivery::into_outcome).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDelivery {
    #[serde(default)]
    delivery_number: String,
    delivery_post_status: Option<String>,
    delivery_post_status_message: Option<String>,
    #[serde(default)]
    devices: Vec<RawDevice>,
}

impl RawDelivery {
    fn into_outcome(self) -> DeliveryOutcome {
        DeliveryOutcome {
            status: self
                .delivery_post_status
                .as_deref()
                .map(|code| EntityStatus::from_code(code, self.delivery_post_status_message.as_deref())),
            delivery_number: self.delivery_number,
            devices: self.devices.into_iter().map(RawDevice::into_outcome).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDevice {
    #[serde(default)]
    device_id: String,
    device_post_status: Option<String>,
    device_post_status_message: Option<String>,
}

impl RawDevice {
    fn into_outcome(self) -> DeviceOutcome {
        DeviceOutcome {
            status: self
                .device_post_status
                .as_deref()
                .map(|code| EntityStatus::from_code(code, self.device_post_status_message.as_deref())),
            serial_number: self.device_id,
        }
    }
}
