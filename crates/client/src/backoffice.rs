//! Backoffice side: operator session and the order lifecycle client.

use deskly_core::{
    ApiError, BackofficeUser, ErrorClass, LoginRequest, Order, OrderId, OrderStatus, Page,
    PageRequest, StatusChange, StatusUpdate,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

use crate::api::BackofficeApi;
use crate::config::ClientConfig;
use crate::http::JsonClient;

// =============================================================================
// HTTP implementation
// =============================================================================

/// Backoffice API over HTTP.
#[derive(Clone)]
pub struct HttpBackoffice {
    http: JsonClient,
}

impl HttpBackoffice {
    /// # Errors
    ///
    /// Returns a `Network` error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self {
            http: JsonClient::new(&config.admin_url, config.request_timeout)?,
        })
    }
}

impl BackofficeApi for HttpBackoffice {
    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &SecretString) -> Result<BackofficeUser, ApiError> {
        let body = LoginRequest {
            email: email.to_owned(),
            password: password.expose_secret().to_owned(),
        };
        self.http.post("/api/auth/login", &body).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.http.post_empty("/api/auth/logout").await
    }

    async fn list_orders_paged(&self, page: PageRequest) -> Result<Page<Order>, ApiError> {
        let page = page.clamped();
        self.http
            .get(&format!("/api/orders?page={}&size={}", page.page, page.size))
            .await
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.http.get(&format!("/api/orders/{id}")).await
    }

    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, ApiError> {
        self.http
            .patch(&format!("/api/orders/{id}/status"), &StatusUpdate { status })
            .await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn reapprove(&self, id: OrderId) -> Result<Order, ApiError> {
        self.http.post_unit(&format!("/api/orders/{id}/reapprove")).await
    }

    async fn order_history(&self, id: OrderId) -> Result<Vec<StatusChange>, ApiError> {
        self.http.get(&format!("/api/orders/{id}/history")).await
    }
}

// =============================================================================
// Session
// =============================================================================

/// An operator's backoffice session.
pub struct BackofficeSession<B> {
    api: B,
    user: Option<BackofficeUser>,
}

impl<B: BackofficeApi> BackofficeSession<B> {
    #[must_use]
    pub const fn new(api: B) -> Self {
        Self { api, user: None }
    }

    /// # Errors
    ///
    /// Returns an `Auth` error for bad credentials, or the request failure.
    #[instrument(skip(self, password))]
    pub async fn login(
        &mut self,
        email: &str,
        password: &SecretString,
    ) -> Result<&BackofficeUser, ApiError> {
        let user = self.api.login(email, password).await?;
        info!(user_id = %user.id, role = %user.role, "Operator logged in");
        Ok(self.user.insert(user))
    }

    /// # Errors
    ///
    /// Returns the request failure. The local login is dropped regardless.
    pub async fn logout(&mut self) -> Result<(), ApiError> {
        let result = self.api.logout().await;
        self.user = None;
        result
    }

    #[must_use]
    pub const fn user(&self) -> Option<&BackofficeUser> {
        self.user.as_ref()
    }

    /// Order operations for the logged-in operator.
    ///
    /// # Errors
    ///
    /// Returns an `Auth` error when logged out.
    pub fn orders(&mut self) -> Result<OrderLifecycleClient<'_, B>, ApiError> {
        if self.user.is_none() {
            return Err(ApiError::new(ErrorClass::Auth, "login required"));
        }
        Ok(OrderLifecycleClient { session: self })
    }

    fn guard<T>(&mut self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(err) = &result
            && err.class == ErrorClass::Auth
        {
            self.user = None;
        }
        result
    }
}

/// Order Lifecycle operations, bound to a logged-in [`BackofficeSession`].
///
/// Every status change returns the full updated order. An `Auth` failure
/// logs the session out.
pub struct OrderLifecycleClient<'s, B> {
    session: &'s mut BackofficeSession<B>,
}

impl<B: BackofficeApi> OrderLifecycleClient<'_, B> {
    /// # Errors
    ///
    /// Returns the request failure.
    pub async fn list_paged(&mut self, page: PageRequest) -> Result<Page<Order>, ApiError> {
        let result = self.session.api.list_orders_paged(page).await;
        self.session.guard(result)
    }

    /// # Errors
    ///
    /// Returns the request failure.
    pub async fn get(&mut self, id: OrderId) -> Result<Order, ApiError> {
        let result = self.session.api.get_order(id).await;
        self.session.guard(result)
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// `Forbidden` for a read-only operator, `Conflict` when the server's
    /// transition policy refuses the move, or the request failure.
    pub async fn update_status(&mut self, id: OrderId, status: OrderStatus) -> Result<Order, ApiError> {
        let result = self.session.api.update_order_status(id, status).await;
        self.session.guard(result)
    }

    /// Move a rejected order to PAGAMENTO_APROVADO.
    ///
    /// # Errors
    ///
    /// `Conflict` unless the order is PAGAMENTO_REJEITADO, or the request failure.
    pub async fn reapprove(&mut self, id: OrderId) -> Result<Order, ApiError> {
        let result = self.session.api.reapprove(id).await;
        self.session.guard(result)
    }

    /// # Errors
    ///
    /// Returns the request failure.
    pub async fn history(&mut self, id: OrderId) -> Result<Vec<StatusChange>, ApiError> {
        let result = self.session.api.order_history(id).await;
        self.session.guard(result)
    }
}
