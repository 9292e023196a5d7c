use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::dto::order_dto::deserialize_id_flexible;
use crate::error::{Error, Result};

/// Public tracking page of the logistics backend, used when an event carries
/// no tracking URL of its own.
pub const TRACKING_BASE_URL: &str = "https://recibelo.cl/track";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PackageCreated,
    ShipmentCompleted,
    Unrecognized,
}

/// One canonical event regardless of which wire shape delivered it. Nothing
/// downstream of [`normalize`] branches on the wire shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRelayEvent {
    pub kind: EventKind,
    pub package_id: i64,
    pub shopify_order_id: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
}

fn deserialize_int_flexible<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        String(String),
    }

    match Option::<IntOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntOrString::Int(i)) => Ok(Some(i)),
        Some(IntOrString::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("Invalid integer string: {}", s))),
    }
}

/// Current wire shape: a package snapshot whose status determines the event.
#[derive(Debug, Clone, Deserialize)]
struct StatusShapeBody {
    #[serde(default, deserialize_with = "deserialize_int_flexible")]
    id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_int_flexible")]
    package_status_id: Option<i64>,
    package_status: Option<PackageStatus>,
    #[serde(default, deserialize_with = "deserialize_id_flexible")]
    imported_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_id_flexible")]
    shopify_order_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_id_flexible")]
    internal_id: Option<String>,
    tracking_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PackageStatus {
    #[serde(default, deserialize_with = "deserialize_int_flexible")]
    id: Option<i64>,
    code: Option<String>,
    name: Option<String>,
}

/// Legacy wire shape with an explicit event discriminant.
#[derive(Debug, Clone, Deserialize)]
struct LegacyShapeBody {
    event: Option<String>,
    #[serde(default, deserialize_with = "deserialize_int_flexible")]
    paquete_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_int_flexible")]
    id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_id_flexible")]
    shopify_order_id: Option<String>,
    tracking_number: Option<String>,
    tracking_url: Option<String>,
}

const STATUS_ID_CREATED: i64 = 2;
const STATUS_ID_COMPLETED: i64 = 8;

fn classify_status(id: Option<i64>, code: Option<&str>, name: Option<&str>) -> EventKind {
    if id == Some(STATUS_ID_CREATED) || code == Some("created") || name == Some("Creado") {
        EventKind::PackageCreated
    } else if id == Some(STATUS_ID_COMPLETED)
        || matches!(code, Some("completed") | Some("delivered"))
        || matches!(name, Some("Completado") | Some("Entregado"))
    {
        EventKind::ShipmentCompleted
    } else {
        EventKind::Unrecognized
    }
}

/// Parse a logistics-backend webhook body in either wire shape into one
/// canonical event. The package id is the only required field.
pub fn normalize(body: &JsonValue) -> Result<CanonicalRelayEvent> {
    let has_status_shape =
        body.get("package_status").is_some() || body.get("package_status_id").is_some();

    if has_status_shape {
        let shape: StatusShapeBody = serde_json::from_value(body.clone())?;
        let package_id = shape
            .id
            .ok_or_else(|| Error::BadRequest("Missing required field: id".to_string()))?;

        let status_id = shape
            .package_status_id
            .or_else(|| shape.package_status.as_ref().and_then(|s| s.id));
        let code = shape.package_status.as_ref().and_then(|s| s.code.as_deref());
        let name = shape.package_status.as_ref().and_then(|s| s.name.as_deref());
        let kind = classify_status(status_id, code, name);

        let (tracking_number, tracking_url) = if kind == EventKind::ShipmentCompleted {
            let number = shape
                .internal_id
                .clone()
                .unwrap_or_else(|| package_id.to_string());
            let url = shape
                .tracking_url
                .clone()
                .unwrap_or_else(|| format!("{}/{}", TRACKING_BASE_URL, number));
            (Some(number), Some(url))
        } else {
            (None, None)
        };

        Ok(CanonicalRelayEvent {
            kind,
            package_id,
            shopify_order_id: shape.imported_id.or(shape.shopify_order_id),
            tracking_number,
            tracking_url,
        })
    } else {
        let shape: LegacyShapeBody = serde_json::from_value(body.clone())?;
        let package_id = shape.paquete_id.or(shape.id).ok_or_else(|| {
            Error::BadRequest("Missing required field: paquete_id (id)".to_string())
        })?;

        let kind = match shape.event.as_deref() {
            Some("paquete_creado") | Some("package_created") => EventKind::PackageCreated,
            Some("envio_completado") | Some("shipment_completed") => EventKind::ShipmentCompleted,
            _ => EventKind::Unrecognized,
        };

        Ok(CanonicalRelayEvent {
            kind,
            package_id,
            shopify_order_id: shape.shopify_order_id,
            tracking_number: shape.tracking_number,
            tracking_url: shape.tracking_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_completed_by_status_id() {
        let event = normalize(&json!({
            "package_status_id": 8,
            "id": 42,
            "imported_id": "900",
            "internal_id": "TRK1"
        }))
        .unwrap();
        assert_eq!(event.kind, EventKind::ShipmentCompleted);
        assert_eq!(event.package_id, 42);
        assert_eq!(event.shopify_order_id.as_deref(), Some("900"));
        assert_eq!(event.tracking_number.as_deref(), Some("TRK1"));
        assert_eq!(
            event.tracking_url.as_deref(),
            Some("https://recibelo.cl/track/TRK1")
        );
    }

    #[test]
    fn classifies_created_by_code_and_name() {
        for body in [
            json!({"package_status_id": 2, "id": 7}),
            json!({"package_status": {"code": "created"}, "id": 7}),
            json!({"package_status": {"name": "Creado"}, "id": 7}),
        ] {
            let event = normalize(&body).unwrap();
            assert_eq!(event.kind, EventKind::PackageCreated);
            assert_eq!(event.tracking_number, None);
        }
    }

    #[test]
    fn unknown_status_is_unrecognized() {
        let event = normalize(&json!({"package_status_id": 99, "id": 42})).unwrap();
        assert_eq!(event.kind, EventKind::Unrecognized);
        assert_eq!(event.package_id, 42);
    }

    #[test]
    fn completed_without_internal_id_falls_back_to_package_id() {
        let event = normalize(&json!({
            "package_status": {"code": "delivered"},
            "id": 42,
            "imported_id": 900
        }))
        .unwrap();
        assert_eq!(event.shopify_order_id.as_deref(), Some("900"));
        assert_eq!(event.tracking_number.as_deref(), Some("42"));
        assert_eq!(
            event.tracking_url.as_deref(),
            Some("https://recibelo.cl/track/42")
        );
    }

    #[test]
    fn legacy_shape_maps_event_verbatim() {
        let event = normalize(&json!({
            "event": "envio_completado",
            "shopify_order_id": "555",
            "paquete_id": 31,
            "tracking_number": "ABC123"
        }))
        .unwrap();
        assert_eq!(event.kind, EventKind::ShipmentCompleted);
        assert_eq!(event.package_id, 31);
        assert_eq!(event.shopify_order_id.as_deref(), Some("555"));
        assert_eq!(event.tracking_number.as_deref(), Some("ABC123"));
        assert_eq!(event.tracking_url, None);
    }

    #[test]
    fn legacy_shape_falls_back_to_id_field() {
        let event = normalize(&json!({"event": "paquete_creado", "id": 12})).unwrap();
        assert_eq!(event.kind, EventKind::PackageCreated);
        assert_eq!(event.package_id, 12);
    }

    #[test]
    fn legacy_unknown_event_is_unrecognized() {
        let event = normalize(&json!({"event": "paquete_devuelto", "id": 12})).unwrap();
        assert_eq!(event.kind, EventKind::Unrecognized);
    }

    #[test]
    fn missing_package_id_is_rejected_in_both_shapes() {
        assert!(normalize(&json!({"package_status_id": 2})).is_err());
        assert!(normalize(&json!({"event": "paquete_creado"})).is_err());
    }
}
