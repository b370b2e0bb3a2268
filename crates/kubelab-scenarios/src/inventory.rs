//! NetworkPolicy scenario, backend side.
//!
//! An inventory service the order frontend reserves stock from. A
//! default-deny NetworkPolicy without a matching allow rule cuts the
//! frontend off.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use kubelab_common::types::PodName;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ScenarioError;
use crate::server::iso_timestamp;

/// A stocked product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Display name.
    pub name: String,
    /// Units in stock.
    pub stock: u32,
    /// Unit price.
    pub price: f64,
}

/// Products keyed by lower-case item key.
pub type Inventory = BTreeMap<String, Item>;

/// The catalog the service starts with.
#[must_use]
pub fn seed_inventory() -> Inventory {
    [
        ("laptop", "Laptop", 50, 999.99),
        ("mouse", "Wireless Mouse", 200, 29.99),
        ("keyboard", "Mechanical Keyboard", 75, 149.99),
        ("monitor", "4K Monitor", 30, 399.99),
        ("headphones", "Noise-Canceling Headphones", 100, 299.99),
    ]
    .into_iter()
    .map(|(key, name, stock, price)| {
        (
            key.to_string(),
            Item {
                name: name.to_string(),
                stock,
                price,
            },
        )
    })
    .collect()
}

/// Outcome of a reservation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Reservation {
    /// Stock was decremented; carries what is left.
    Reserved {
        /// Stock left after the reservation.
        remaining: u32,
    },
    /// Not enough stock; nothing changed.
    Insufficient {
        /// Stock currently available.
        available: u32,
    },
    /// No such item.
    UnknownItem,
}

/// Shared state of the inventory service.
#[derive(Debug, Clone)]
pub struct InventoryState {
    items: Arc<Mutex<Inventory>>,
    pod: PodName,
}

impl InventoryState {
    /// Creates the service state over `items`.
    #[must_use]
    pub fn new(items: Inventory, pod: PodName) -> Self {
        Self {
            items: Arc::new(Mutex::new(items)),
            pod,
        }
    }

    /// Returns a copy of the current inventory.
    ///
    /// # Errors
    ///
    /// Returns an error if the inventory lock is poisoned.
    pub fn snapshot(&self) -> Result<Inventory, ScenarioError> {
        Ok(self.lock()?.clone())
    }

    /// Reserves `quantity` units of `item` if enough are in stock.
    ///
    /// # Errors
    ///
    /// Returns an error if the inventory lock is poisoned.
    pub fn reserve(&self, item: &str, quantity: u32) -> Result<Reservation, ScenarioError> {
        let mut items = self.lock()?;
        let Some(entry) = items.get_mut(item) else {
            return Ok(Reservation::UnknownItem);
        };
        if entry.stock >= quantity {
            entry.stock -= quantity;
            Ok(Reservation::Reserved {
                remaining: entry.stock,
            })
        } else {
            Ok(Reservation::Insufficient {
                available: entry.stock,
            })
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inventory>, ScenarioError> {
        self.items
            .lock()
            .map_err(|_| ScenarioError::Internal("inventory lock poisoned".into()))
    }
}

/// Body of `POST /reserve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveRequest {
    /// Item key, matched case-insensitively.
    #[serde(default)]
    pub item: String,
    /// Units to reserve.
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

/// Builds the inventory service router.
pub fn router(state: InventoryState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/inventory", get(inventory))
        .route("/check/{item}", get(check))
        .route("/reserve", post(reserve))
        .route("/health", get(health))
        .with_state(state)
}

async fn index(State(state): State<InventoryState>) -> Json<Value> {
    Json(json!({
        "service": "Inventory Service",
        "status": "running",
        "pod": state.pod,
        "endpoints": ["/inventory", "/check/<item>", "/reserve"],
    }))
}

async fn inventory(State(state): State<InventoryState>) -> Result<Json<Value>, ScenarioError> {
    let items = state.snapshot()?;
    Ok(Json(json!({
        "timestamp": iso_timestamp(),
        "total_items": items.len(),
        "inventory": items,
    })))
}

async fn check(
    State(state): State<InventoryState>,
    Path(item): Path<String>,
) -> Result<(StatusCode, Json<Value>), ScenarioError> {
    let item = item.to_lowercase();
    let items = state.snapshot()?;
    Ok(match items.get(&item) {
        Some(entry) => (
            StatusCode::OK,
            Json(json!({
                "item": item,
                "available": true,
                "stock": entry.stock,
                "price": entry.price,
            })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "item": item, "available": false, "message": "Item not found" })),
        ),
    })
}

async fn reserve(
    State(state): State<InventoryState>,
    Json(request): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<Value>), ScenarioError> {
    let item = request.item.to_lowercase();
    let outcome = state.reserve(&item, request.quantity)?;
    tracing::info!(item = %item, quantity = request.quantity, ?outcome, "reservation");

    Ok(match outcome {
        Reservation::Reserved { remaining } => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "item": item,
                "reserved": request.quantity,
                "remaining_stock": remaining,
            })),
        ),
        Reservation::Insufficient { available } => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": "Insufficient stock",
                "available": available,
            })),
        ),
        Reservation::UnknownItem => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Item not found" })),
        ),
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;

    fn state() -> InventoryState {
        InventoryState::new(seed_inventory(), PodName::new("inventory-1"))
    }

    async fn call(state: &InventoryState, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn reserve_request(body: &str) -> Request<Body> {
        Request::post("/reserve")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn seed_has_five_products() {
        let items = seed_inventory();
        assert_eq!(items.len(), 5);
        assert_eq!(items["laptop"].stock, 50);
        assert_eq!(items["headphones"].name, "Noise-Canceling Headphones");
    }

    #[test]
    fn reserve_decrements_stock() {
        let state = state();
        assert_eq!(
            state.reserve("monitor", 5).expect("reserve"),
            Reservation::Reserved { remaining: 25 }
        );
    }

    #[test]
    fn insufficient_stock_leaves_stock_untouched() {
        let state = state();
        assert_eq!(
            state.reserve("monitor", 31).expect("reserve"),
            Reservation::Insufficient { available: 30 }
        );
        assert_eq!(state.snapshot().expect("snapshot")["monitor"].stock, 30);
    }

    #[tokio::test]
    async fn check_is_case_insensitive() {
        let (status, body) = call(&state(), Request::get("/check/LAPTOP").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item"], "laptop");
        assert_eq!(body["stock"], 50);
    }

    #[tokio::test]
    async fn check_unknown_item_is_404() {
        let (status, body) = call(&state(), Request::get("/check/toaster").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["available"], false);
    }

    #[tokio::test]
    async fn reserve_endpoint_defaults_quantity_to_one() {
        let state = state();
        let (status, body) = call(&state, reserve_request(r#"{"item": "Mouse"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reserved"], 1);
        assert_eq!(body["remaining_stock"], 199);
    }

    #[tokio::test]
    async fn reserve_endpoint_rejects_insufficient_stock_with_400() {
        let (status, body) = call(&state(), reserve_request(r#"{"item": "laptop", "quantity": 51}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Insufficient stock");
        assert_eq!(body["available"], 50);
    }

    #[tokio::test]
    async fn reserve_endpoint_unknown_item_is_404() {
        let (status, body) = call(&state(), reserve_request(r#"{"quantity": 1}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Item not found");
    }

    #[tokio::test]
    async fn inventory_lists_all_items() {
        let (status, body) = call(&state(), Request::get("/inventory").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_items"], 5);
        assert_eq!(body["inventory"]["keyboard"]["price"], 149.99);
    }
}
