// ============================================================================
// Audit Logging - Device Mutations
// ============================================================================
//
// Every mutating request records who acted, on which device, and how it
// ended. Events go to the `audit` tracing target as structured fields plus
// a JSON rendering for log shippers.
//
// ============================================================================

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthInfo;

/// Audit event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    DeviceAdded,
    DeviceUpdated,
    DeviceDeleted,
    /// Input failed validation before storage was touched
    MutationRejected,
    /// Storage failed and the unit of work was rolled back
    MutationFailed,
    AccessDenied,
}

/// Mutation the event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Update,
    Delete,
    Access,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,

    /// Event timestamp (RFC 3339)
    pub timestamp: String,

    pub event_type: AuditEventType,

    /// Acting username
    pub actor: String,

    /// Acting user's display name
    pub actor_name: String,

    pub operation: Operation,

    /// Affected device, if the event concerns one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AuditEvent {
    pub fn new(
        event_type: AuditEventType,
        actor: &AuthInfo,
        operation: Operation,
        mac: Option<&str>,
        success: bool,
        details: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now().to_rfc3339(),
            event_type,
            actor: actor.username.clone(),
            actor_name: actor.name.clone(),
            operation,
            mac: mac.map(str::to_string),
            success,
            details,
        }
    }

    /// Serializes audit event to JSON for logging
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

pub struct AuditLogger;

impl AuditLogger {
    pub fn log_device_added(actor: &AuthInfo, mac: &str, vlan: &str) {
        Self::log_event(&AuditEvent::new(
            AuditEventType::DeviceAdded,
            actor,
            Operation::Add,
            Some(mac),
            true,
            Some(format!("vlan={}", vlan)),
        ));
    }

    pub fn log_device_updated(actor: &AuthInfo, mac: &str, vlan: &str, matched: bool) {
        let details = if matched {
            format!("vlan={}", vlan)
        } else {
            "no such device".to_string()
        };
        Self::log_event(&AuditEvent::new(
            AuditEventType::DeviceUpdated,
            actor,
            Operation::Update,
            Some(mac),
            true,
            Some(details),
        ));
    }

    pub fn log_device_deleted(actor: &AuthInfo, mac: &str, existed: bool) {
        Self::log_event(&AuditEvent::new(
            AuditEventType::DeviceDeleted,
            actor,
            Operation::Delete,
            Some(mac),
            true,
            (!existed).then(|| "no such device".to_string()),
        ));
    }

    pub fn log_mutation_rejected(actor: &AuthInfo, operation: Operation, mac: &str, reason: &str) {
        Self::log_event(&AuditEvent::new(
            AuditEventType::MutationRejected,
            actor,
            operation,
            Some(mac),
            false,
            Some(reason.to_string()),
        ));
    }

    pub fn log_mutation_failed(actor: &AuthInfo, operation: Operation, mac: &str, reason: &str) {
        Self::log_event(&AuditEvent::new(
            AuditEventType::MutationFailed,
            actor,
            operation,
            Some(mac),
            false,
            Some(reason.to_string()),
        ));
    }

    pub fn log_access_denied(actor: &AuthInfo, method: &str, path: &str) {
        Self::log_event(&AuditEvent::new(
            AuditEventType::AccessDenied,
            actor,
            Operation::Access,
            None,
            false,
            Some(format!("{} {}", method, path)),
        ));
    }

    fn log_event(event: &AuditEvent) {
        let json = event.to_json();

        tracing::info!(
            target: "audit",
            event_type = ?event.event_type,
            actor = %event.actor,
            actor_name = %event.actor_name,
            operation = ?event.operation,
            mac = event.mac.as_deref(),
            success = event.success,
            details = event.details.as_deref(),
            timestamp = %event.timestamp,
            json = %json,
            "AUDIT: Device event logged"
        );
    }
}
