use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use integration_service::domain::envelope::{EventEnvelope, LineItem};
use integration_service::odoo::{Partner, SalesBackend};
use integration_service::repo::order_map_repo::{OrderMapRow, OrderMapStore};
use integration_service::service::dispatcher::EventDispatcher;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const SALE_ORDER_ID: i64 = 501;

#[derive(Default)]
struct RecordingBackend {
    partners: HashMap<String, i64>,
    created: Mutex<Vec<(i64, String)>>,
    confirmed: Mutex<Vec<i64>>,
}

#[async_trait]
impl SalesBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn find_partner_by_email(&self, email: &str) -> Result<Option<Partner>> {
        Ok(self.partners.get(email).map(|id| Partner {
            id: *id,
            name: None,
            email: Some(email.to_string()),
        }))
    }

    async fn create_sale_order(&self, partner_id: i64, _lines: &[LineItem], origin: &str) -> Result<i64> {
        self.created.lock().unwrap().push((partner_id, origin.to_string()));
        Ok(SALE_ORDER_ID)
    }

    async fn confirm_sale_order(&self, sale_order_id: i64) -> Result<()> {
        self.confirmed.lock().unwrap().push(sale_order_id);
        Ok(())
    }
}

#[derive(Default)]
struct MemoryOrderMap {
    rows: Mutex<HashMap<i64, OrderMapRow>>,
}

#[async_trait]
impl OrderMapStore for MemoryOrderMap {
    async fn upsert_created(&self, woo_order_id: i64, odoo_sale_order_id: i64, woo_status: &str) -> Result<()> {
        self.rows.lock().unwrap().insert(
            woo_order_id,
            OrderMapRow {
                woo_order_id,
                odoo_sale_order_id: Some(odoo_sale_order_id),
                woo_status: Some(woo_status.to_string()),
                odoo_status: None,
                last_sync_at: Some(Utc::now()),
            },
        );
        Ok(())
    }

    async fn update_woo_status(&self, woo_order_id: i64, woo_status: &str) -> Result<()> {
        if let Some(row) = self.rows.lock().unwrap().get_mut(&woo_order_id) {
            row.woo_status = Some(woo_status.to_string());
            row.last_sync_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn find(&self, woo_order_id: i64) -> Result<Option<OrderMapRow>> {
        Ok(self.rows.lock().unwrap().get(&woo_order_id).cloned())
    }
}

fn dispatcher(backend: Arc<RecordingBackend>, order_map: Arc<MemoryOrderMap>) -> EventDispatcher {
    EventDispatcher {
        backend,
        order_map,
    }
}

fn envelope(topic: &str, body: serde_json::Value) -> EventEnvelope {
    EventEnvelope::from_webhook(topic, body, Utc::now()).unwrap()
}

#[tokio::test]
async fn created_order_reaches_backend_and_mapping() {
    let backend = Arc::new(RecordingBackend {
        partners: HashMap::from([("buyer@example.com".to_string(), 7)]),
        ..Default::default()
    });
    let order_map = Arc::new(MemoryOrderMap::default());
    let dispatcher = dispatcher(backend.clone(), order_map.clone());

    let body = json!({
        "id": 42,
        "status": "pending",
        "billing": {"email": "buyer@example.com"},
        "line_items": [{"product_id": 5, "name": "Widget", "quantity": 2.0, "price": 9.5}]
    });
    dispatcher.dispatch(&envelope("order.created", body)).await.unwrap();

    assert_eq!(*backend.created.lock().unwrap(), vec![(7, "WOO:42".to_string())]);
    let row = order_map.find(42).await.unwrap().unwrap();
    assert_eq!(row.odoo_sale_order_id, Some(SALE_ORDER_ID));
    assert_eq!(row.woo_status.as_deref(), Some("pending"));
}

#[tokio::test]
async fn unmatched_email_falls_back_to_default_partner() {
    let backend = Arc::new(RecordingBackend::default());
    let dispatcher = dispatcher(backend.clone(), Arc::new(MemoryOrderMap::default()));

    let body = json!({"id": 42, "status": "pending", "billing": {"email": "stranger@example.com"}});
    dispatcher.dispatch(&envelope("order.created", body)).await.unwrap();

    assert_eq!(backend.created.lock().unwrap()[0].0, 1);
}

#[tokio::test]
async fn created_order_without_billing_email_fails() {
    let backend = Arc::new(RecordingBackend::default());
    let dispatcher = dispatcher(backend.clone(), Arc::new(MemoryOrderMap::default()));

    let result = dispatcher
        .dispatch(&envelope("order.created", json!({"id": 42, "status": "pending"})))
        .await;

    assert!(result.is_err());
    assert!(backend.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn paid_before_created_completes_without_confirmation() {
    let backend = Arc::new(RecordingBackend::default());
    let dispatcher = dispatcher(backend.clone(), Arc::new(MemoryOrderMap::default()));

    let body = json!({"id": 42, "status": "paid"});
    dispatcher.dispatch(&envelope("order.paid", body)).await.unwrap();

    assert!(backend.confirmed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn paid_with_mapping_confirms_downstream_order() {
    let backend = Arc::new(RecordingBackend::default());
    let order_map = Arc::new(MemoryOrderMap::default());
    order_map.upsert_created(42, SALE_ORDER_ID, "pending").await.unwrap();
    let dispatcher = dispatcher(backend.clone(), order_map.clone());

    let body = json!({"id": 42, "status": "paid"});
    dispatcher.dispatch(&envelope("order.paid", body)).await.unwrap();

    assert_eq!(*backend.confirmed.lock().unwrap(), vec![SALE_ORDER_ID]);
    let row = order_map.find(42).await.unwrap().unwrap();
    assert_eq!(row.woo_status.as_deref(), Some("paid"));
}

#[tokio::test]
async fn unrecognized_topic_is_a_successful_noop() {
    let backend = Arc::new(RecordingBackend::default());
    let dispatcher = dispatcher(backend.clone(), Arc::new(MemoryOrderMap::default()));

    dispatcher
        .dispatch(&envelope("order.refunded", json!({"id": 42})))
        .await
        .unwrap();

    assert!(backend.created.lock().unwrap().is_empty());
    assert!(backend.confirmed.lock().unwrap().is_empty());
}
