use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

#[derive(Debug, Clone)]
pub struct OrderMapRow {
    pub woo_order_id: i64,
    pub odoo_sale_order_id: Option<i64>,
    pub woo_status: Option<String>,
    pub odoo_status: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Order correlation store. Dispatch handlers only know this seam; tests
/// substitute an in-memory impl.
#[async_trait::async_trait]
pub trait OrderMapStore: Send + Sync {
    /// Correlates an upstream order with its downstream sale order.
    async fn upsert_created(
        &self,
        woo_order_id: i64,
        odoo_sale_order_id: i64,
        woo_status: &str,
    ) -> Result<()>;

    async fn update_woo_status(&self, woo_order_id: i64, woo_status: &str) -> Result<()>;

    async fn find(&self, woo_order_id: i64) -> Result<Option<OrderMapRow>>;
}

#[derive(Clone)]
pub struct OrderMapRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl OrderMapStore for OrderMapRepo {
    /// The database-level upsert is the only concurrency control; no
    /// external locking.
    async fn upsert_created(
        &self,
        woo_order_id: i64,
        odoo_sale_order_id: i64,
        woo_status: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_map (woo_order_id, odoo_sale_order_id, woo_status, last_sync_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (woo_order_id) DO UPDATE
            SET odoo_sale_order_id = EXCLUDED.odoo_sale_order_id,
                woo_status = EXCLUDED.woo_status,
                last_sync_at = now(),
                updated_at = now()
            "#,
        )
        .bind(woo_order_id)
        .bind(odoo_sale_order_id)
        .bind(woo_status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_woo_status(&self, woo_order_id: i64, woo_status: &str) -> Result<()> {
        sqlx::query(
            "UPDATE order_map SET woo_status=$2, last_sync_at=now(), updated_at=now() WHERE woo_order_id=$1",
        )
        .bind(woo_order_id)
        .bind(woo_status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, woo_order_id: i64) -> Result<Option<OrderMapRow>> {
        let row = sqlx::query(
            r#"
            SELECT woo_order_id, odoo_sale_order_id, woo_status, odoo_status, last_sync_at
            FROM order_map
            WHERE woo_order_id = $1
            "#,
        )
        .bind(woo_order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| OrderMapRow {
            woo_order_id: r.get("woo_order_id"),
            odoo_sale_order_id: r.get("odoo_sale_order_id"),
            woo_status: r.get("woo_status"),
            odoo_status: r.get("odoo_status"),
            last_sync_at: r.get("last_sync_at"),
        }))
    }
}
