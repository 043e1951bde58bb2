use crate::domain::envelope::{EventEnvelope, EventKind, OrderPayload};
use crate::odoo::SalesBackend;
use crate::repo::order_map_repo::OrderMapStore;
use anyhow::{anyhow, Result};
use std::sync::Arc;

/// Fallback partner when the billing email matches nobody downstream.
const DEFAULT_PARTNER_ID: i64 = 1;

/// Routes a dequeued envelope to its handler. Holds only the downstream
/// seams so handler behavior is testable without live stores.
#[derive(Clone)]
pub struct EventDispatcher {
    pub backend: Arc<dyn SalesBackend>,
    pub order_map: Arc<dyn OrderMapStore>,
}

impl EventDispatcher {
    pub async fn dispatch(&self, envelope: &EventEnvelope) -> Result<()> {
        match EventKind::from_envelope(envelope)? {
            EventKind::OrderCreated(order) => self.handle_order_created(&order).await,
            EventKind::OrderPaid(order) => self.handle_order_paid(&order).await,
            EventKind::Unknown { event_type } => {
                // Tolerate upstream topic additions: accept and no-op.
                tracing::warn!(%event_type, "no handler registered for event type, skipping");
                Ok(())
            }
        }
    }

    async fn handle_order_created(&self, order: &OrderPayload) -> Result<()> {
        let email = order
            .billing
            .as_ref()
            .and_then(|b| b.email.clone())
            .ok_or_else(|| anyhow!("no billing email in order"))?;

        let partner_id = match self.backend.find_partner_by_email(&email).await? {
            Some(partner) => partner.id,
            None => DEFAULT_PARTNER_ID,
        };

        let origin = format!("WOO:{}", order.id);
        let sale_order_id = self
            .backend
            .create_sale_order(partner_id, &order.line_items, &origin)
            .await?;

        self.order_map
            .upsert_created(order.id, sale_order_id, &order.status)
            .await?;

        tracing::info!(
            woo_order_id = order.id,
            odoo_order_id = sale_order_id,
            "order created downstream"
        );
        Ok(())
    }

    async fn handle_order_paid(&self, order: &OrderPayload) -> Result<()> {
        self.order_map.update_woo_status(order.id, &order.status).await?;

        // A paid event can arrive before the created event; without a
        // mapping there is nothing to confirm yet and that is not an error.
        match self.order_map.find(order.id).await? {
            Some(row) => {
                if let Some(sale_order_id) = row.odoo_sale_order_id {
                    self.backend.confirm_sale_order(sale_order_id).await?;
                }
            }
            None => {
                tracing::debug!(woo_order_id = order.id, "no downstream mapping yet, skipping confirmation");
            }
        }
        Ok(())
    }
}
