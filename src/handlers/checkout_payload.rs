//! Request-boundary decoding for checkout submissions.
//!
//! The create-order operation accepts two transports: plain JSON, and
//! multipart/form-data when a proof file travels with the structured fields.
//! Some client paths serialize `items` as a JSON string rather than an array.
//! Both transports and both `items` encodings funnel through one typed decode
//! step producing a `CheckoutRequest`; nothing downstream sees a partially
//! decoded payload.

use crate::{
    errors::{ApiError, FieldErrors},
    services::orders::{CheckoutItem, CheckoutRequest, ProofUpload},
};
use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Extractor wrapping the decoded checkout request.
#[derive(Debug)]
pub struct CheckoutPayload(pub CheckoutRequest);

#[async_trait]
impl<S> FromRequest<S> for CheckoutPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            Self::from_multipart(multipart).await
        } else {
            let Json(value): Json<Value> = Json::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            let fields = match value {
                Value::Object(map) => map,
                _ => return Err(ApiError::BadRequest("Expected a JSON object".into())),
            };
            Self::from_fields(fields, None)
        }
    }
}

impl CheckoutPayload {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut fields = Map::new();
        let mut proof = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == "proof" {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                proof = Some(ProofUpload {
                    filename,
                    content_type,
                    bytes,
                });
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                fields.insert(name, Value::String(text));
            }
        }

        Self::from_fields(fields, proof)
    }

    /// Builds the request from loosely typed fields, collecting every field
    /// failure so the caller gets the complete picture in one response.
    fn from_fields(fields: Map<String, Value>, proof: Option<ProofUpload>) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();

        let items = decode_items(fields.get("items"), &mut errors);
        let total_qty: Option<i64> = int_field(&fields, "total_qty", true, &mut errors);
        let total_price: Option<i64> = int_field(&fields, "total_price", true, &mut errors);
        let bank_id = uuid_field(&fields, "bank_id", true, &mut errors);
        let payment_date = date_field(&fields, "payment_date", &mut errors);
        let cart_id = uuid_field(&fields, "cart_id", false, &mut errors);

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        // All required fields decoded; the unwraps below cannot fail.
        Ok(CheckoutPayload(CheckoutRequest {
            items: items.unwrap_or_default(),
            total_qty: total_qty.unwrap_or_default() as i32,
            total_price: total_price.unwrap_or_default(),
            bank_id: bank_id.unwrap_or_default(),
            payment_date: payment_date.unwrap_or_default(),
            cart_id,
            proof,
        }))
    }
}

fn decode_items(value: Option<&Value>, errors: &mut FieldErrors) -> Option<Vec<CheckoutItem>> {
    let decoded = match value {
        None | Some(Value::Null) => {
            errors.insert("items".into(), "The items field is required".into());
            return None;
        }
        // Some call paths submit the array pre-serialized as a string.
        Some(Value::String(raw)) => serde_json::from_str::<Vec<CheckoutItem>>(raw),
        Some(other) => serde_json::from_value::<Vec<CheckoutItem>>(other.clone()),
    };

    match decoded {
        Ok(items) => Some(items),
        Err(e) => {
            errors.insert("items".into(), format!("The items field is malformed: {}", e));
            None
        }
    }
}

fn int_field(
    fields: &Map<String, Value>,
    name: &str,
    required: bool,
    errors: &mut FieldErrors,
) -> Option<i64> {
    match fields.get(name) {
        None | Some(Value::Null) => {
            if required {
                errors.insert(name.into(), format!("The {} field is required", name));
            }
            None
        }
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v) => Some(v),
            None => {
                errors.insert(name.into(), format!("The {} field must be an integer", name));
                None
            }
        },
        Some(Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(v) => Some(v),
            Err(_) => {
                errors.insert(name.into(), format!("The {} field must be an integer", name));
                None
            }
        },
        Some(_) => {
            errors.insert(name.into(), format!("The {} field must be an integer", name));
            None
        }
    }
}

fn uuid_field(
    fields: &Map<String, Value>,
    name: &str,
    required: bool,
    errors: &mut FieldErrors,
) -> Option<Uuid> {
    match fields.get(name) {
        None | Some(Value::Null) => {
            if required {
                errors.insert(name.into(), format!("The {} field is required", name));
            }
            None
        }
        Some(Value::String(s)) => match Uuid::parse_str(s.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                errors.insert(name.into(), format!("The {} field must be a valid id", name));
                None
            }
        },
        Some(_) => {
            errors.insert(name.into(), format!("The {} field must be a valid id", name));
            None
        }
    }
}

fn date_field(fields: &Map<String, Value>, name: &str, errors: &mut FieldErrors) -> Option<NaiveDate> {
    match fields.get(name) {
        None | Some(Value::Null) => {
            errors.insert(name.into(), format!("The {} field is required", name));
            None
        }
        Some(Value::String(s)) => match s.trim().parse::<NaiveDate>() {
            Ok(v) => Some(v),
            Err(_) => {
                errors.insert(
                    name.into(),
                    format!("The {} field must be a date (YYYY-MM-DD)", name),
                );
                None
            }
        },
        Some(_) => {
            errors.insert(
                name.into(),
                format!("The {} field must be a date (YYYY-MM-DD)", name),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_fields() -> Map<String, Value> {
        let value = json!({
            "items": [{
                "product_id": "550e8400-e29b-41d4-a716-446655440000",
                "product_name": "Mechanical Keyboard",
                "price": 1000,
                "qty": 2
            }],
            "total_qty": 2,
            "total_price": 2000,
            "bank_id": "7f9c24e5-2f8a-4b1e-9d3c-111111111111",
            "payment_date": "2025-01-10"
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn decodes_json_object_payload() {
        let CheckoutPayload(request) = CheckoutPayload::from_fields(valid_fields(), None).unwrap();
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.total_price, 2000);
        assert_eq!(request.payment_date.to_string(), "2025-01-10");
        assert!(request.cart_id.is_none());
        assert!(request.proof.is_none());
    }

    #[test]
    fn items_as_json_string_decodes_identically() {
        let mut fields = valid_fields();
        let serialized = serde_json::to_string(fields.get("items").unwrap()).unwrap();
        fields.insert("items".into(), Value::String(serialized));

        let CheckoutPayload(request) = CheckoutPayload::from_fields(fields, None).unwrap();
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].product_name, "Mechanical Keyboard");
    }

    #[test]
    fn stringly_typed_numbers_decode_like_multipart_fields() {
        let mut fields = valid_fields();
        fields.insert("total_qty".into(), Value::String("2".into()));
        fields.insert("total_price".into(), Value::String("2000".into()));

        let CheckoutPayload(request) = CheckoutPayload::from_fields(fields, None).unwrap();
        assert_eq!(request.total_qty, 2);
        assert_eq!(request.total_price, 2000);
    }

    #[test]
    fn missing_required_fields_report_every_field() {
        let err = CheckoutPayload::from_fields(Map::new(), None).unwrap_err();
        match err {
            ApiError::Validation(fields) => {
                for key in ["items", "total_qty", "total_price", "bank_id", "payment_date"] {
                    assert!(fields.contains_key(key), "missing error for {key}");
                }
                assert!(!fields.contains_key("cart_id"), "cart_id is optional");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_items_and_date_are_reported() {
        let mut fields = valid_fields();
        fields.insert("items".into(), Value::String("not json".into()));
        fields.insert("payment_date".into(), Value::String("January 10".into()));

        let err = CheckoutPayload::from_fields(fields, None).unwrap_err();
        match err {
            ApiError::Validation(fields) => {
                assert!(fields["items"].contains("malformed"));
                assert!(fields["payment_date"].contains("date"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_bank_uuid_is_reported() {
        let mut fields = valid_fields();
        fields.insert("bank_id".into(), Value::String("b-1".into()));

        let err = CheckoutPayload::from_fields(fields, None).unwrap_err();
        match err {
            ApiError::Validation(fields) => {
                assert!(fields["bank_id"].contains("valid id"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
