use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

pub const APPROVED_BODY: &str = r#"{"paymentApproved":true}"#;
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Response shape an Application Load Balancer expects from a Lambda target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlbTargetResponse {
    #[serde(rename = "isBase64Encoded")]
    pub is_base64_encoded: bool,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(rename = "statusDescription")]
    pub status_description: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl AlbTargetResponse {
    pub fn approved() -> Self {
        Self {
            is_base64_encoded: false,
            status_code: 200,
            status_description: "200 OK".to_string(),
            headers: BTreeMap::from([("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string())]),
            body: APPROVED_BODY.to_string(),
        }
    }
}

/// The parts of the invocation context worth logging.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct InvocationContext {
    pub request_id: String,
    pub invoked_function_arn: String,
    /// Milliseconds since the epoch at which the invocation times out.
    pub deadline_ms: u64,
}

/// Approves every payment. The event is logged and otherwise ignored.
pub fn handle_payment_event(event: &Value, context: &InvocationContext) -> AlbTargetResponse {
    info!(
        event = %event,
        request_id = context.request_id.as_str(),
        invoked_function_arn = context.invoked_function_arn.as_str(),
        deadline_ms = context.deadline_ms,
        "received event"
    );
    AlbTargetResponse::approved()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_with_load_balancer_field_names() {
        let response = handle_payment_event(&json!({}), &InvocationContext::default());
        assert_eq!(
            serde_json::to_value(&response).expect("serializable"),
            json!({
                "isBase64Encoded": false,
                "statusCode": 200,
                "statusDescription": "200 OK",
                "headers": {"Content-Type": "application/json"},
                "body": "{\"paymentApproved\":true}"
            })
        );
    }

    #[test]
    fn ignores_the_request_body() {
        let event = json!({
            "httpMethod": "POST",
            "path": "/",
            "body": "{\"amount\": -1}",
            "isBase64Encoded": false
        });
        assert_eq!(
            handle_payment_event(&event, &InvocationContext::default()),
            AlbTargetResponse::approved()
        );
    }
}
