//! Type-safe capability extractors
//!
//! Usage in handlers:
//! ```ignore
//! use crate::middleware::permissions::{Authorized, RequestsDeliver};
//!
//! async fn deliver(
//!     State(state): State<AppState>,
//!     auth: Authorized<RequestsDeliver>,
//! ) -> Result<Json<DeliveredRequest>> {
//!     // capability already verified; the user is auth.0
//! }
//! ```

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::models::user;

/// Trait for capability marker types
pub trait Permission: Send + Sync + 'static {
    const NAME: &'static str;
}

/// Creates zero-sized marker types that implement `Permission`
macro_rules! define_permissions {
    ($($(#[$meta:meta])* $name:ident => $perm:expr),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy)]
            pub struct $name;

            impl Permission for $name {
                const NAME: &'static str = $perm;
            }
        )*
    };
}

define_permissions! {
    // Requests
    /// Open a new loan request
    RequestsCreate => user::REQUESTS_CREATE,
    /// Approve or reject requests
    RequestsReview => user::REQUESTS_REVIEW,
    /// Hand over approved requests
    RequestsDeliver => user::REQUESTS_DELIVER,

    // Materials
    MaterialsView => user::MATERIALS_VIEW,
    MaterialsManage => user::MATERIALS_MANAGE,
    /// Absolute and bulk stock corrections
    StockAdjust => user::STOCK_ADJUST,

    // Debts
    /// Record returned material
    DebtsSettle => user::DEBTS_SETTLE,

    // Users
    UsersView => user::USERS_VIEW,
    UsersManage => user::USERS_MANAGE,

    // Audit
    AuditView => user::AUDIT_VIEW,
    /// Clear old audit entries
    AuditManage => user::AUDIT_MANAGE,
}

/// Extractor that requires a specific capability, 403 otherwise
#[derive(Debug, Clone)]
pub struct Authorized<P: Permission>(pub AuthenticatedUser, PhantomData<P>);

impl<P: Permission> Authorized<P> {
    pub fn user(&self) -> &user::Model {
        &self.0.user
    }

    pub fn user_id(&self) -> i64 {
        self.0.user.id
    }
}

impl<S, P> FromRequestParts<S> for Authorized<P>
where
    S: Send + Sync,
    P: Permission,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Unauthorized("Sesión requerida".to_string()))?;

        if !auth_user.has_permission(P::NAME) {
            return Err(AppError::Forbidden(format!(
                "Permiso denegado: se requiere {}",
                P::NAME
            )));
        }

        Ok(Authorized(auth_user.clone(), PhantomData))
    }
}

/// Extractor for any authenticated user
#[derive(Debug, Clone)]
pub struct Authenticated(pub AuthenticatedUser);

impl Authenticated {
    pub fn user(&self) -> &user::Model {
        &self.0.user
    }

    pub fn user_id(&self) -> i64 {
        self.0.user.id
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Unauthorized("Sesión requerida".to_string()))?;

        Ok(Authenticated(auth_user.clone()))
    }
}
