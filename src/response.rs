use serde::Serialize;
use serde_json::Value;

use crate::pagination::PageMeta;

/// Uniform response envelope. Absent members are omitted from the payload.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Value>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: None,
            filters: None,
        }
    }

    pub fn with_message(data: T, message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::data(data)
        }
    }

    pub fn page(data: T, pagination: PageMeta, filters: Value) -> Self {
        Self {
            pagination: Some(pagination),
            filters: Some(filters),
            ..Self::data(data)
        }
    }
}

pub fn message_only(message: &str) -> ApiResponse<Value> {
    ApiResponse {
        success: true,
        data: None,
        message: Some(message.to_string()),
        pagination: None,
        filters: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_members_are_omitted() {
        let body = serde_json::to_value(message_only("ok")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"success": true, "message": "ok"})
        );
    }

    #[test]
    fn page_envelope_carries_pagination_and_filters() {
        let body = serde_json::to_value(ApiResponse::page(
            vec![1, 2],
            PageMeta::new(1, 15, 2, 2),
            serde_json::json!({"search": "phone"}),
        ))
        .unwrap();
        assert_eq!(body["pagination"]["total"], 2);
        assert_eq!(body["filters"]["search"], "phone");
    }
}
