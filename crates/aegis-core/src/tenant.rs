//! Tenant-aware database router contract (spec §6.4).
//!
//! This is a marker trait, not an implementation. A real deployment wires
//! a concrete router (to Postgres schemas, separate databases, whatever
//! multi-tenancy scheme the application uses) behind this trait; aegis
//! itself only needs to know the shape so cache/queue/security call sites
//! that are tenant-scoped can accept `&dyn TenantRouter` without pulling in
//! an ORM.

use crate::error::Error;
use async_trait::async_trait;

/// An opaque handle to a tenant's connection/session, returned by a
/// [`TenantRouter`]. Concrete routers downcast or wrap their own connection
/// type inside this handle; aegis never inspects it.
pub struct TenantHandle {
    tenant_id: String,
    inner: Box<dyn std::any::Any + Send + Sync>,
}

impl TenantHandle {
    /// Wraps a caller-supplied connection/session value for a tenant.
    pub fn new(tenant_id: impl Into<String>, inner: Box<dyn std::any::Any + Send + Sync>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            inner,
        }
    }

    /// The tenant id this handle was resolved for.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Attempts to downcast the wrapped connection/session back to its
    /// concrete type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

/// Resolves a tenant identifier (and optional organization scope) to a
/// connection/session handle. Implemented by the consuming application,
/// not by this workspace — see spec §6.4 for the full contract this
/// mirrors.
#[async_trait]
pub trait TenantRouter: Send + Sync {
    /// Resolves a single tenant by id.
    async fn get(&self, tenant_id: &str) -> Result<TenantHandle, Error>;

    /// Lists the tenant ids visible to the caller.
    async fn get_tenants(&self) -> Result<Vec<String>, Error>;

    /// Resolves a handle scoped to an organization rather than a single
    /// tenant, for routers that group tenants under organizations.
    async fn org(&self, org_id: &str) -> Result<TenantHandle, Error>;
}
