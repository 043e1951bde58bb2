use crate::domain::envelope::LineItem;
use anyhow::Result;

pub mod jsonrpc;

#[derive(Debug, Clone)]
pub struct Partner {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Downstream system of record. The pipeline only knows this seam; the
/// JSON-RPC wiring lives in `jsonrpc` and tests substitute their own impl.
#[async_trait::async_trait]
pub trait SalesBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn find_partner_by_email(&self, email: &str) -> Result<Option<Partner>>;

    /// Creates a sale order with its lines, returns the downstream order id.
    async fn create_sale_order(&self, partner_id: i64, lines: &[LineItem], origin: &str) -> Result<i64>;

    async fn confirm_sale_order(&self, sale_order_id: i64) -> Result<()>;
}
