//! Request and response bodies for the REST API.

use serde::{Deserialize, Serialize};

use buildmart_core::{ProductId, RemoteCartLine};

/// `GET /cart`
#[derive(Debug, Deserialize)]
pub struct CartResponse {
    #[serde(default)]
    pub items: Vec<RemoteCartLine>,
}

/// `POST /cart/items`
#[derive(Debug, Serialize)]
pub struct AddLineBody {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// `PATCH /cart/items/{product_id}`
#[derive(Debug, Serialize)]
pub struct UpdateLineBody {
    pub quantity: u32,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
