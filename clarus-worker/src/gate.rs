//! Subscription gate - "may this user submit uploads?"
//!
//! Subscriptions are owned by the billing service; this only reads them.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;

#[async_trait]
pub trait SubscriptionGate: Send + Sync {
    async fn is_active(&self, user_id: Uuid) -> Result<bool, StoreError>;
}

/// Active = a subscription row with status `active` that has not ended
#[derive(Debug, Clone)]
pub struct PgSubscriptionGate {
    pool: PgPool,
}

impl PgSubscriptionGate {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionGate for PgSubscriptionGate {
    async fn is_active(&self, user_id: Uuid) -> Result<bool, StoreError> {
        let active: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM subscriptions
                WHERE user_id = $1 AND status = 'active' AND end_at > NOW()
            )
            "#
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(active)
    }
}

/// Fixed answer, for local submits and tests
#[derive(Debug, Clone, Copy)]
pub struct StaticGate(pub bool);

#[async_trait]
impl SubscriptionGate for StaticGate {
    async fn is_active(&self, _user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.0)
    }
}
