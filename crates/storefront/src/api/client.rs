//! REST client for the Buildmart cart and order API.
//!
//! Plain JSON over HTTP using `reqwest`. Every request carries the bearer
//! token from the [`AuthProvider`] when one is available.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use buildmart_core::{
    AuthProvider, Order, OrderId, OrderPatch, OrderRequest, ProductId, RemoteCartLine,
    RemoteCartService, RemoteOrderService, ServiceError,
};

use super::types::{AddLineBody, CartResponse, ErrorBody, UpdateLineBody};

/// Longest slice of a response body kept in an error message.
const MAX_ERROR_BODY: usize = 200;

/// Client for the remote cart and order services.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    auth: Arc<dyn AuthProvider>,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: &Url, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: with_trailing_slash(base_url),
                auth,
            }),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ServiceError> {
        let url = self
            .inner
            .base_url
            .join(path)
            .map_err(|e| ServiceError::Network(format!("invalid URL for {path}: {e}")))?;

        let builder = self.inner.client.request(method, url);
        Ok(match self.inner.auth.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Send a request and map transport and status failures.
    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, ServiceError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, body = %truncate(&body, MAX_ERROR_BODY), "API returned non-success status");
        Err(status_error(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = self.send(builder).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RemoteCartService for ApiClient {
    #[instrument(skip(self))]
    async fn get_cart(&self) -> Result<Vec<RemoteCartLine>, ServiceError> {
        let builder = self.request(Method::GET, "cart")?;
        let cart: CartResponse = self.send_json(builder).await?;
        Ok(cart
            .items
            .into_iter()
            .map(|mut line| {
                line.product = line.product.with_detected_bucket();
                line
            })
            .collect())
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_line(&self, product_id: ProductId, quantity: u32) -> Result<(), ServiceError> {
        let builder = self
            .request(Method::POST, "cart/items")?
            .json(&AddLineBody {
                product_id,
                quantity,
            });
        self.send(builder).await.map(drop)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn update_line(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), ServiceError> {
        let builder = self
            .request(Method::PATCH, &format!("cart/items/{product_id}"))?
            .json(&UpdateLineBody { quantity });
        self.send(builder).await.map(drop)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn remove_line(&self, product_id: ProductId) -> Result<(), ServiceError> {
        let builder = self.request(Method::DELETE, &format!("cart/items/{product_id}"))?;
        self.send(builder).await.map(drop)
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), ServiceError> {
        let builder = self.request(Method::DELETE, "cart")?;
        self.send(builder).await.map(drop)
    }
}

#[async_trait]
impl RemoteOrderService for ApiClient {
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    async fn create_order(&self, request: &OrderRequest) -> Result<Order, ServiceError> {
        let builder = self.request(Method::POST, "orders")?.json(request);
        self.send_json(builder).await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn get_order(&self, id: OrderId) -> Result<Order, ServiceError> {
        let builder = self.request(Method::GET, &format!("orders/{id}"))?;
        self.send_json(builder).await
    }

    #[instrument(skip(self, patch), fields(order_id = %id))]
    async fn update_order(&self, id: OrderId, patch: &OrderPatch) -> Result<Order, ServiceError> {
        let builder = self
            .request(Method::PATCH, &format!("orders/{id}"))?
            .json(patch);
        self.send_json(builder).await
    }
}

fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Map a non-success status and its body to a `ServiceError`.
fn status_error(status: StatusCode, body: &str) -> ServiceError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| truncate(body, MAX_ERROR_BODY));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Unauthorized,
        StatusCode::NOT_FOUND => ServiceError::NotFound(message),
        _ => ServiceError::Server {
            status: status.as_u16(),
            message,
        },
    }
}
