//! Routes for the product catalog.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::{Json, Router, routing::post};
use serde::Deserialize;
use serde_json::value::RawValue;
use storefront_catalog::application::command_handlers;
use storefront_catalog::domain::commands;
use storefront_catalog::domain::product::Product;
use storefront_core::error::DomainError;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /api/v1/products.
///
/// Both fields are optional here so that a missing field is reported as a
/// validation error alongside any others.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    /// Display name.
    pub name: Option<String>,
    /// Unit price, e.g. `18.99`. Kept as the raw JSON token so the decimal
    /// text is validated exactly as sent.
    pub price: Option<Box<RawValue>>,
}

/// POST /api/v1/products
#[instrument(skip(state, payload))]
async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let Json(request) = payload.map_err(|rejection| DomainError::Validation(rejection.body_text()))?;

    let command = commands::CreateProduct {
        correlation_id: Uuid::new_v4(),
        name: request.name,
        price: request.price.map(|price| price.get().to_owned()),
    };

    info!(correlation_id = %command.correlation_id, "handling create_product command");

    let product = command_handlers::handle_create_product(
        &command,
        state.clock.as_ref(),
        state.store.as_ref(),
        &state.outbox_writer,
    )
    .await?;

    Ok(Json(product))
}

/// Returns the router for the product catalog.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_product))
}
