use crate::domain::envelope::LineItem;
use crate::odoo::{Partner, SalesBackend};
use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value};
use tokio::sync::Mutex;

pub struct OdooJsonRpcClient {
    pub base_url: String,
    pub db: String,
    pub username: String,
    pub password: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
    cached_uid: Mutex<Option<i64>>,
}

impl OdooJsonRpcClient {
    pub fn new(base_url: String, db: String, username: String, password: String) -> Self {
        Self {
            base_url,
            db,
            username,
            password,
            timeout_ms: 30_000,
            client: reqwest::Client::new(),
            cached_uid: Mutex::new(None),
        }
    }

    async fn rpc(&self, params: Value, id: i64) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": params,
            "id": id,
        });

        let resp: Value = self
            .client
            .post(format!("{}/jsonrpc", self.base_url))
            .json(&body)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = resp.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("odoo api error");
            bail!("odoo api error: {message}");
        }

        Ok(resp.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn login(&self) -> Result<i64> {
        let mut cached = self.cached_uid.lock().await;
        if let Some(uid) = *cached {
            return Ok(uid);
        }

        let result = self
            .rpc(
                json!({
                    "service": "common",
                    "method": "login",
                    "args": [self.db, self.username, self.password],
                }),
                1,
            )
            .await?;

        let uid = result.as_i64().ok_or_else(|| anyhow!("odoo login failed"))?;
        tracing::info!(uid, "odoo login successful");
        *cached = Some(uid);
        Ok(uid)
    }

    async fn execute_kw(&self, model: &str, method: &str, args: Value) -> Result<Value> {
        let uid = self.login().await?;
        self.rpc(
            json!({
                "service": "object",
                "method": "execute_kw",
                "args": [self.db, uid, self.password, model, method, args, {}],
            }),
            2,
        )
        .await
    }
}

#[async_trait::async_trait]
impl SalesBackend for OdooJsonRpcClient {
    fn name(&self) -> &'static str {
        "odoo"
    }

    async fn find_partner_by_email(&self, email: &str) -> Result<Option<Partner>> {
        let ids = self
            .execute_kw("res.partner", "search", json!([[["email", "=", email]]]))
            .await?;
        let Some(first_id) = ids.as_array().and_then(|a| a.first()).and_then(Value::as_i64) else {
            return Ok(None);
        };

        let partners = self
            .execute_kw("res.partner", "read", json!([[first_id], ["name", "email"]]))
            .await?;
        let partner = partners.as_array().and_then(|a| a.first());

        Ok(partner.map(|p| Partner {
            id: first_id,
            name: p.get("name").and_then(Value::as_str).map(ToString::to_string),
            email: p.get("email").and_then(Value::as_str).map(ToString::to_string),
        }))
    }

    async fn create_sale_order(&self, partner_id: i64, lines: &[LineItem], origin: &str) -> Result<i64> {
        let order = self
            .execute_kw(
                "sale.order",
                "create",
                json!([{ "partner_id": partner_id, "origin": origin }]),
            )
            .await?;
        let order_id = order
            .as_i64()
            .ok_or_else(|| anyhow!("sale.order create returned no id"))?;

        for line in lines {
            self.execute_kw(
                "sale.order.line",
                "create",
                json!([{
                    "order_id": order_id,
                    "product_id": line.product_id,
                    "name": line.name,
                    "product_uom_qty": line.quantity,
                    "price_unit": line.price,
                }]),
            )
            .await?;
        }

        Ok(order_id)
    }

    async fn confirm_sale_order(&self, sale_order_id: i64) -> Result<()> {
        self.execute_kw("sale.order", "action_confirm", json!([[sale_order_id]]))
            .await?;
        Ok(())
    }
}
