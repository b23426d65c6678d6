//! Fire-and-forget audit notifications. Persistence is an external
//! collaborator's concern; the default sink writes structured logs.

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: &'static str,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub app_id: Option<String>,
    pub resource: Option<String>,
    pub success: bool,
    pub details: Option<Value>,
}

impl AuditEvent {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            tenant_id: None,
            user_id: None,
            app_id: None,
            resource: None,
            success: true,
            details: None,
        }
    }

    pub fn tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn app(mut self, app_id: Option<String>) -> Self {
        self.app_id = app_id;
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Must not fail the surrounding operation.
    async fn record(&self, event: AuditEvent);
}

pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        tracing::info!(
            action = event.action,
            tenant_id = event.tenant_id.as_deref(),
            user_id = event.user_id.as_deref(),
            app_id = event.app_id.as_deref(),
            resource = event.resource.as_deref(),
            success = event.success,
            details = %event.details.unwrap_or(serde_json::Value::Null),
            "audit"
        );
    }
}
