use serde_json::{json, Value};
use uuid::Uuid;

use dep_core::{CoreError, CoreResult};

use crate::models::Order;

/// The request body for a bulk enrollment: one transaction id, one order.
///
/// Built per submission and never reused. The client does not enforce
/// uniqueness of the transaction id; duplicate handling belongs to the
/// enrollment service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentEnvelope {
    transaction_id: String,
    order: Order,
}

/// Pair a transaction id with an already-validated order.
pub fn assemble(transaction_id: impl Into<String>, order: Order) -> CoreResult<EnrollmentEnvelope> {
    let transaction_id = transaction_id.into();
    if transaction_id.trim().is_empty() {
        return Err(CoreError::validation("transactionId", "must not be empty"));
    }
    Ok(EnrollmentEnvelope { transaction_id, order })
}

/// A fresh `TXN_<uuid>` id for callers that do not track their own.
pub fn generate_transaction_id() -> String {
    format!("TXN_{}", Uuid::new_v4().simple())
}

impl EnrollmentEnvelope {
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn into_order(self) -> Order {
        self.order
    }

    pub fn to_document(&self) -> Value {
        json!({
            "transactionId": self.transaction_id,
            "order": self.order.to_document(),
        })
    }

    /// Serialized request body
    pub fn to_json(&self) -> String {
        self.to_document().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Delivery, Device, OrderType};
    use chrono::{TimeZone, Utc};

    fn sample_order() -> Order {
        let devices = vec![
            Device::with_asset_tag("33645004YAM", "A123456").unwrap(),
            Device::with_asset_tag("33645006YAM", "A123456").unwrap(),
        ];
        let delivery = Delivery::new(
            "D1.2",
            Utc.with_ymd_and_hms(2014, 10, 10, 5, 10, 0).unwrap(),
            devices,
        )
        .unwrap();

        Order::new(
            "ORDER_900123",
            Utc.with_ymd_and_hms(2014, 10, 10, 5, 10, 0).unwrap(),
            "OR".parse::<OrderType>().unwrap(),
            "19827",
            Some("PO_12345".to_string()),
            vec![delivery],
        )
        .unwrap()
    }

    #[test]
    fn test_assemble_fixed_sample() {
        let envelope = assemble("TXN_001122", sample_order()).unwrap();

        let expected = json!({
            "transactionId": "TXN_001122",
            "order": {
                "orderNumber": "ORDER_900123",
                "orderDate": "2014-10-10T05:10:00Z",
                "orderType": "OR",
                "customerId": "19827",
                "poNumber": "PO_12345",
                "deliveries": [
                    {
                        "id": "D1.2",
                        "deliveryDate": "2014-10-10T05:10:00Z",
                        "devices": [
                            {"serialNumber": "33645004YAM", "assetTag": "A123456"},
                            {"serialNumber": "33645006YAM", "assetTag": "A123456"}
                        ]
                    }
                ]
            }
        });

        assert_eq!(envelope.to_document(), expected);
    }

    #[test]
    fn test_body_is_deterministic() {
        let envelope = assemble("TXN_001122", sample_order()).unwrap();
        assert_eq!(envelope.to_json(), envelope.to_json());
        assert_eq!(
            envelope.to_json(),
            assemble("TXN_001122", sample_order()).unwrap().to_json()
        );
    }

    #[test]
    fn test_empty_transaction_id() {
        let err = assemble("", sample_order()).unwrap_err();
        assert_eq!(err.field(), Some("transactionId"));
        assert!(assemble("  ", sample_order()).is_err());
    }

    #[test]
    fn test_generated_transaction_ids() {
        let a = generate_transaction_id();
        let b = generate_transaction_id();
        assert!(a.starts_with("TXN_"));
        assert_eq!(a.len(), 36);
        assert_ne!(a, b);
    }
}
