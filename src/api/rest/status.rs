//! Status endpoint

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::api::types::Json;
use crate::api::web::GREETINGS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub greetings: String,
    pub now: String,
}

/// GET /api/status
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        greetings: GREETINGS.to_string(),
        now: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_payload() {
        let Json(body) = status().await;
        assert_eq!(body.greetings, "Reporting! Hello there!");
        assert_eq!(body.now.len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn test_status_serialization() {
        let body = StatusResponse {
            greetings: GREETINGS.to_string(),
            now: "2024-03-01 10:00:00".to_string(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(
            json,
            r#"{"greetings":"Reporting! Hello there!","now":"2024-03-01 10:00:00"}"#
        );
    }
}
