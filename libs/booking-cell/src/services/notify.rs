// libs/booking-cell/src/services/notify.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

/// A notification to a single recipient about a booking event.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
}

/// One way of getting a notification row created. Strategies are tried in
/// order; each one is a full standalone delivery path.
#[async_trait]
pub trait NotificationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(
        &self,
        supabase: &SupabaseClient,
        notification: &NotificationRequest,
        auth_token: &str,
    ) -> Result<()>;
}

fn notification_payload(notification: &NotificationRequest) -> Value {
    json!({
        "user_id": notification.user_id,
        "title": notification.title,
        "message": notification.message,
        "read": false,
        "created_at": Utc::now().to_rfc3339(),
    })
}

/// Insert the row and read it back through `Prefer: return=representation`.
struct InsertReturning;

#[async_trait]
impl NotificationStrategy for InsertReturning {
    fn name(&self) -> &'static str {
        "insert_returning"
    }

    async fn deliver(
        &self,
        supabase: &SupabaseClient,
        notification: &NotificationRequest,
        auth_token: &str,
    ) -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let rows: Vec<Value> = supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/notifications",
                Some(auth_token),
                Some(notification_payload(notification)),
                Some(headers),
            )
            .await?;

        if rows.is_empty() {
            anyhow::bail!("insert returned no rows");
        }
        Ok(())
    }
}

/// Plain insert without reading the row back.
struct InsertMinimal;

#[async_trait]
impl NotificationStrategy for InsertMinimal {
    fn name(&self) -> &'static str {
        "insert_minimal"
    }

    async fn deliver(
        &self,
        supabase: &SupabaseClient,
        notification: &NotificationRequest,
        auth_token: &str,
    ) -> Result<()> {
        supabase
            .request_no_content(
                Method::POST,
                "/rest/v1/notifications",
                Some(auth_token),
                Some(notification_payload(notification)),
                None,
            )
            .await
    }
}

/// Last resort: the `create_notification` stored procedure, which inserts
/// under its own definer rights when direct table writes are refused.
struct RpcFallback;

#[async_trait]
impl NotificationStrategy for RpcFallback {
    fn name(&self) -> &'static str {
        "rpc_fallback"
    }

    async fn deliver(
        &self,
        supabase: &SupabaseClient,
        notification: &NotificationRequest,
        auth_token: &str,
    ) -> Result<()> {
        supabase
            .request_no_content(
                Method::POST,
                "/rest/v1/rpc/create_notification",
                Some(auth_token),
                Some(json!({
                    "user_id": notification.user_id,
                    "title": notification.title,
                    "message": notification.message,
                })),
                None,
            )
            .await
    }
}

pub struct NotificationService {
    supabase: Arc<SupabaseClient>,
    strategies: Vec<Box<dyn NotificationStrategy>>,
}

impl NotificationService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            supabase,
            strategies: vec![
                Box::new(InsertReturning),
                Box::new(InsertMinimal),
                Box::new(RpcFallback),
            ],
        }
    }

    /// Try each delivery strategy in order until one succeeds. Failures are
    /// logged and swallowed; a missed notification never unwinds or blocks
    /// the booking that triggered it.
    pub async fn send(&self, notification: NotificationRequest, auth_token: &str) {
        for strategy in &self.strategies {
            match strategy
                .deliver(&self.supabase, &notification, auth_token)
                .await
            {
                Ok(()) => {
                    debug!(
                        "Notification delivered to {} via {}",
                        notification.user_id,
                        strategy.name()
                    );
                    return;
                }
                Err(e) => {
                    warn!(
                        "Notification strategy {} failed for user {}: {}",
                        strategy.name(),
                        notification.user_id,
                        e
                    );
                }
            }
        }

        warn!(
            "All notification strategies failed for user {}",
            notification.user_id
        );
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::TestConfig;

    #[test]
    fn strategies_run_in_fallback_order() {
        let config = TestConfig::default().to_app_config();
        let service = NotificationService::new(Arc::new(SupabaseClient::new(&config)));
        assert_eq!(
            service.strategy_names(),
            vec!["insert_returning", "insert_minimal", "rpc_fallback"]
        );
    }

    #[test]
    fn payload_rows_start_unread() {
        let notification = NotificationRequest {
            user_id: Uuid::new_v4(),
            title: "Booking received".to_string(),
            message: "Your session is pending confirmation".to_string(),
        };
        let payload = notification_payload(&notification);
        assert_eq!(payload["read"], false);
        assert_eq!(payload["title"], "Booking received");
    }
}
