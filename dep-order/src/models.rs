use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use dep_core::{CoreError, CoreResult};
use dep_shared::wire_time;

pub const MAX_ASSET_TAG_LEN: usize = 128;
pub const MAX_DELIVERY_ID_LEN: usize = 32;
pub const MAX_ORDER_NUMBER_LEN: usize = 32;
pub const MAX_CUSTOMER_ID_LEN: usize = 32;
pub const MAX_PO_NUMBER_LEN: usize = 100;

/// Order type codes accepted by the enrollment service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrderType {
    /// Normal purchase
    #[serde(rename = "OR")]
    Normal,
    #[serde(rename = "RE")]
    Return,
    #[serde(rename = "VD")]
    Void,
    #[serde(rename = "OV")]
    Override,
}

impl OrderType {
    pub fn code(&self) -> &'static str {
        match self {
            OrderType::Normal => "OR",
            OrderType::Return => "RE",
            OrderType::Void => "VD",
            OrderType::Override => "OV",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OrderType {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "OR" => Ok(OrderType::Normal),
            "RE" => Ok(OrderType::Return),
            "VD" => Ok(OrderType::Void),
            "OV" => Ok(OrderType::Override),
            other => Err(CoreError::validation(
                "orderType",
                format!("`{}` is not one of OR, RE, VD, OV", other),
            )),
        }
    }
}

/// A device to be enrolled. Identity is the serial number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    serial_number: String,
    asset_tag: Option<String>,
}

impl Device {
    pub fn new(serial_number: impl Into<String>) -> CoreResult<Self> {
        Self::build(serial_number.into(), None)
    }

    pub fn with_asset_tag(serial_number: impl Into<String>, asset_tag: impl Into<String>) -> CoreResult<Self> {
        Self::build(serial_number.into(), Some(asset_tag.into()))
    }

    fn build(serial_number: String, asset_tag: Option<String>) -> CoreResult<Self> {
        not_blank("serialNumber", &serial_number)?;
        if let Some(tag) = &asset_tag {
            not_blank("assetTag", tag)?;
            max_len("assetTag", tag, MAX_ASSET_TAG_LEN)?;
        }
        Ok(Self { serial_number, asset_tag })
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn asset_tag(&self) -> Option<&str> {
        self.asset_tag.as_deref()
    }

    pub fn to_document(&self) -> Value {
        json!({
            "serialNumber": self.serial_number,
            "assetTag": self.asset_tag,
        })
    }

    pub fn from_document(document: &Value) -> CoreResult<Self> {
        let raw = DeviceDocument::deserialize(document).map_err(|e| malformed("device", e))?;
        Self::build(raw.serial_number, raw.asset_tag)
    }
}

/// One physical shipment and the devices that were on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    id: String,
    delivery_date: DateTime<Utc>,
    devices: Vec<Device>,
}

impl Delivery {
    pub fn new(id: impl Into<String>, delivery_date: DateTime<Utc>, devices: Vec<Device>) -> CoreResult<Self> {
        let id = id.into();
        not_blank("id", &id)?;
        max_len("id", &id, MAX_DELIVERY_ID_LEN)?;
        if devices.is_empty() {
            return Err(CoreError::validation(
                "devices",
                format!("delivery `{}` must contain at least one device", id),
            ));
        }

        Ok(Self {
            id,
            delivery_date: wire_time::truncate(delivery_date),
            devices,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn delivery_date(&self) -> DateTime<Utc> {
        self.delivery_date
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn to_document(&self) -> Value {
        json!({
            "id": self.id,
            "deliveryDate": wire_time::format(&self.delivery_date),
            "devices": self.devices.iter().map(Device::to_document).collect::<Vec<_>>(),
        })
    }

    pub fn from_document(document: &Value) -> CoreResult<Self> {
        let raw = DeliveryDocument::deserialize(document).map_err(|e| malformed("delivery", e))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: DeliveryDocument) -> CoreResult<Self> {
        let devices = raw
            .devices
            .into_iter()
            .map(|d| Device::build(d.serial_number, d.asset_tag))
            .collect::<CoreResult<Vec<_>>>()?;
        Self::new(raw.id, raw.delivery_date, devices)
    }
}

/// A reseller order; owns its deliveries and, through them, the devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    order_number: String,
    order_date: DateTime<Utc>,
    order_type: OrderType,
    customer_id: String,
    po_number: Option<String>,
    deliveries: Vec<Delivery>,
}

impl Order {
    pub fn new(
        order_number: impl Into<String>,
        order_date: DateTime<Utc>,
        order_type: OrderType,
        customer_id: impl Into<String>,
        po_number: Option<String>,
        deliveries: Vec<Delivery>,
    ) -> CoreResult<Self> {
        let order_number = order_number.into();
        let customer_id = customer_id.into();

        not_blank("orderNumber", &order_number)?;
        max_len("orderNumber", &order_number, MAX_ORDER_NUMBER_LEN)?;
        not_blank("customerId", &customer_id)?;
        max_len("customerId", &customer_id, MAX_CUSTOMER_ID_LEN)?;
        if let Some(po) = &po_number {
            not_blank("poNumber", po)?;
            max_len("poNumber", po, MAX_PO_NUMBER_LEN)?;
        }

        if deliveries.is_empty() {
            return Err(CoreError::validation(
                "deliveries",
                format!("order `{}` must contain at least one delivery", order_number),
            ));
        }
        {
            let mut seen = HashSet::new();
            for delivery in &deliveries {
                if !seen.insert(delivery.id()) {
                    return Err(CoreError::validation(
                        "deliveries",
                        format!("duplicate delivery id `{}` in order `{}`", delivery.id(), order_number),
                    ));
                }
            }
        }

        Ok(Self {
            order_number,
            order_date: wire_time::truncate(order_date),
            order_type,
            customer_id,
            po_number,
            deliveries,
        })
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn po_number(&self) -> Option<&str> {
        self.po_number.as_deref()
    }

    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    /// Total devices across all deliveries
    pub fn device_count(&self) -> usize {
        self.deliveries.iter().map(|d| d.devices().len()).sum()
    }

    pub fn to_document(&self) -> Value {
        json!({
            "orderNumber": self.order_number,
            "orderDate": wire_time::format(&self.order_date),
            "orderType": self.order_type.code(),
            "customerId": self.customer_id,
            "poNumber": self.po_number,
            "deliveries": self.deliveries.iter().map(Delivery::to_document).collect::<Vec<_>>(),
        })
    }

    pub fn from_document(document: &Value) -> CoreResult<Self> {
        let raw = OrderDocument::deserialize(document).map_err(|e| malformed("order", e))?;
        let order_type: OrderType = raw.order_type.parse()?;
        let deliveries = raw
            .deliveries
            .into_iter()
            .map(Delivery::from_raw)
            .collect::<CoreResult<Vec<_>>>()?;

        Self::new(
            raw.order_number,
            raw.order_date,
            order_type,
            raw.customer_id,
            raw.po_number,
            deliveries,
        )
    }
}

// Wire shapes used only to read documents back in

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceDocument {
    serial_number: String,
    #[serde(default)]
    asset_tag: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryDocument {
    id: String,
    #[serde(with = "dep_shared::wire_time")]
    delivery_date: DateTime<Utc>,
    #[serde(default)]
    devices: Vec<DeviceDocument>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderDocument {
    order_number: String,
    #[serde(with = "dep_shared::wire_time")]
    order_date: DateTime<Utc>,
    order_type: String,
    customer_id: String,
    #[serde(default)]
    po_number: Option<String>,
    #[serde(default)]
    deliveries: Vec<DeliveryDocument>,
}

fn not_blank(field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn max_len(field: &str, value: &str, max: usize) -> CoreResult<()> {
    let len = value.chars().count();
    if len > max {
        return Err(CoreError::validation(
            field,
            format!("is {} characters long, the limit is {}", len, max),
        ));
    }
    Ok(())
}

fn malformed(entity: &str, err: serde_json::Error) -> CoreError {
    CoreError::validation(entity, format!("document does not match the {} shape: {}", entity, err))
}
