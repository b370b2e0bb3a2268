//! NetworkPolicy scenario, frontend side.
//!
//! An order page that reads the catalog from the inventory service and
//! reserves stock through it. When a NetworkPolicy blocks the traffic the
//! page explains what went wrong instead of failing blindly.

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use kubelab_common::types::PodName;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ScenarioError;
use crate::html::{escape, header, page};
use crate::inventory::{Inventory, ReserveRequest};

/// Timeout applied to every call to the inventory service.
pub const INVENTORY_TIMEOUT: Duration = Duration::from_secs(3);

/// Base URL of the inventory service for a given service host.
#[must_use]
pub fn inventory_url(service: &str) -> String {
    format!("http://{service}:80")
}

/// Shared state of the order frontend.
#[derive(Debug, Clone)]
pub struct OrdersState {
    http: reqwest::Client,
    inventory_url: String,
    pod: PodName,
}

impl OrdersState {
    /// Creates the frontend state talking to `inventory_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(inventory_url: impl Into<String>, pod: PodName) -> Result<Self, ScenarioError> {
        Self::with_timeout(inventory_url, pod, INVENTORY_TIMEOUT)
    }

    /// Same as [`OrdersState::new`] with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_timeout(
        inventory_url: impl Into<String>,
        pod: PodName,
        timeout: Duration,
    ) -> Result<Self, ScenarioError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScenarioError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            inventory_url: inventory_url.into().trim_end_matches('/').to_string(),
            pod,
        })
    }

    /// Inventory service base URL.
    #[must_use]
    pub fn inventory_url(&self) -> &str {
        &self.inventory_url
    }

    /// Fetches the catalog from the inventory service.
    ///
    /// # Errors
    ///
    /// Returns a user-facing explanation of why the catalog is unavailable.
    pub async fn fetch_inventory(&self) -> Result<Inventory, String> {
        #[derive(Deserialize)]
        struct InventoryResponse {
            #[serde(default)]
            inventory: Inventory,
        }

        let response = self
            .http
            .get(format!("{}/inventory", self.inventory_url))
            .send()
            .await
            .map_err(|e| describe_transport_error(&e))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(format!("HTTP {}", response.status().as_u16()));
        }

        response
            .json::<InventoryResponse>()
            .await
            .map(|body| body.inventory)
            .map_err(|e| e.to_string())
    }
}

/// Explains a failed call to the inventory service.
#[must_use]
pub fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "Request timeout".to_string()
    } else if err.is_connect() {
        "Connection refused - NetworkPolicy may be blocking traffic".to_string()
    } else {
        err.to_string()
    }
}

/// Body of `POST /order`.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    /// Item key to order.
    #[serde(default)]
    pub item: String,
    /// Units to order.
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

/// Builds the order frontend router.
pub fn router(state: OrdersState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/order", post(place_order))
        .route("/health", get(health))
        .with_state(state)
}

async fn index(State(state): State<OrdersState>) -> Html<String> {
    let content = match state.fetch_inventory().await {
        Ok(items) => {
            let cards: String = items
                .iter()
                .map(|(key, item)| {
                    format!(
                        r#"<div class="card product">
    <h3>{name}</h3>
    <p>Price: <strong>${price:.2}</strong> &middot; In stock: <strong>{stock}</strong></p>
    <input type="number" id="qty-{key}" value="1" min="1">
    <button onclick="order('{key}')">Order</button>
</div>"#,
                        name = escape(&item.name),
                        price = item.price,
                        stock = item.stock,
                        key = escape(key),
                    )
                })
                .collect();
            format!(
                r#"<div class="ok"><strong>Connected to inventory service</strong> at {}</div>
<div class="products">{cards}</div>"#,
                escape(&state.inventory_url)
            )
        }
        Err(error) => format!(
            r#"<div class="error">
    <h2>Cannot reach inventory service</h2>
    <p><strong>Error:</strong> {}</p>
    <p><strong>Inventory URL:</strong> {}</p>
    <h3>Troubleshooting</h3>
    <ul>
        <li>Check NetworkPolicies: <code>kubectl get networkpolicy</code></li>
        <li>Make sure an ingress rule on the inventory pods allows traffic from this pod's labels</li>
        <li>Make sure egress from this pod allows DNS and the inventory service</li>
    </ul>
</div>"#,
            escape(&error),
            escape(&state.inventory_url)
        ),
    };

    let body = format!(
        r#"{}
{content}
<p id="result"></p>
<script>
function order(item) {{
    const quantity = parseInt(document.getElementById('qty-' + item).value, 10) || 1;
    fetch('/order', {{method: 'POST', headers: {{'Content-Type': 'application/json'}}, body: JSON.stringify({{item: item, quantity: quantity}})}})
        .then(r => r.json())
        .then(d => {{ document.getElementById('result').textContent = d.success ? ('Reserved ' + d.reserved + ' x ' + d.item) : (d.message || d.error); setTimeout(() => location.reload(), 1000); }})
        .catch(e => {{ document.getElementById('result').textContent = 'Order failed: ' + e; }});
}}
</script>"#,
        header("Order Service", "Place orders against the inventory service", state.pod.as_str())
    );
    page(
        "Order Service",
        ".products { display: grid; grid-template-columns: repeat(auto-fill, minmax(250px, 1fr)); gap: 15px; } .product input { width: 60px; padding: 5px; }",
        &body,
    )
}

async fn place_order(State(state): State<OrdersState>, Json(request): Json<OrderRequest>) -> Response {
    match forward_reservation(&state, request).await {
        Ok((status, body)) => (status, Json(body)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "order failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn forward_reservation(
    state: &OrdersState,
    request: OrderRequest,
) -> Result<(StatusCode, Value), ScenarioError> {
    let reservation = ReserveRequest {
        item: request.item,
        quantity: request.quantity,
    };
    let response = state
        .http
        .post(format!("{}/reserve", state.inventory_url))
        .json(&reservation)
        .send()
        .await
        .map_err(|e| ScenarioError::Unavailable(describe_transport_error(&e)))?;

    let status = StatusCode::from_u16(response.status().as_u16())
        .map_err(|e| ScenarioError::Internal(e.to_string()))?;
    let body: Value = response
        .json()
        .await
        .map_err(|e| ScenarioError::Internal(format!("invalid response from inventory: {e}")))?;
    tracing::info!(item = %reservation.item, quantity = reservation.quantity, %status, "order forwarded");
    Ok((status, body))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
