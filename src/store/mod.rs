// ============================================================================
// Device store - transactional provisioning of RADIUS records
// ============================================================================
//
// A device is three rows sharing the MAC as username:
//   users         identity (description)
//   radusergroup  group membership (VLAN)
//   radcheck      credential
//
// Every mutation runs inside one unit of work. A unit of work that is dropped
// without `commit()` rolls back, so an early return through `?` (or a request
// future dropped on disconnect) never leaves a partial device behind.
//
// ============================================================================

mod memory;
mod postgres;

pub use memory::{MemoryDeviceBackend, RecordPresence};
pub use postgres::PgDeviceBackend;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use radman_error::AppError;
use thiserror::Error;

use crate::device::{Device, NewDevice, ValidationError, Vlan};

/// Individual storage step, used to report where a unit of work failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Begin,
    List,
    Get,
    ReadCredential,
    InsertIdentity,
    InsertMembership,
    InsertCredential,
    UpdateIdentity,
    UpdateMembership,
    DeleteIdentity,
    DeleteMembership,
    DeleteCredential,
    Commit,
    Ping,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Step::Begin => "beginning transaction",
            Step::List => "listing devices",
            Step::Get => "reading device",
            Step::ReadCredential => "reading credential record",
            Step::InsertIdentity => "inserting identity record",
            Step::InsertMembership => "inserting group membership record",
            Step::InsertCredential => "inserting credential record",
            Step::UpdateIdentity => "updating identity record",
            Step::UpdateMembership => "updating group membership record",
            Step::DeleteIdentity => "deleting identity record",
            Step::DeleteMembership => "deleting group membership record",
            Step::DeleteCredential => "deleting credential record",
            Step::Commit => "committing transaction",
            Step::Ping => "pinging database",
        };
        f.write_str(what)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid MAC address: {0}")]
    InvalidMac(String),

    #[error("Invalid VLAN: {0}")]
    InvalidVlan(String),

    /// The identifier already exists
    #[error("Device already exists: {0}")]
    Conflict(String),

    #[error("Storage failure while {step}: {source:#}")]
    Backend {
        step: Step,
        #[source]
        source: anyhow::Error,
    },
}

impl StoreError {
    pub fn backend(step: Step, source: impl Into<anyhow::Error>) -> Self {
        StoreError::Backend {
            step,
            source: source.into(),
        }
    }

    /// Client faults are rejected before any storage access
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::InvalidMac(_) | StoreError::InvalidVlan(_))
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidMac(mac) => StoreError::InvalidMac(mac),
            ValidationError::InvalidVlan(vlan) => StoreError::InvalidVlan(vlan),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidMac(_) | StoreError::InvalidVlan(_) => {
                AppError::Validation(err.to_string())
            }
            // A uniqueness violation aborts the unit of work like any other insert failure
            StoreError::Conflict(_) => AppError::Storage(err.to_string()),
            StoreError::Backend { step, source } => {
                tracing::error!(step = %step, error = %format!("{:#}", source), "Storage failure");
                AppError::Storage(format!("Error {}", step))
            }
        }
    }
}

/// Result of an update; `Missing` means no identity record matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    Missing,
}

/// Result of a delete; `Absent` means no record existed for the identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Absent,
}

/// Storage engine behind the device store
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    /// Open an atomic unit of work
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    /// All devices ordered by MAC ascending
    async fn list(&self) -> Result<Vec<Device>, StoreError>;

    async fn get(&self, mac: &str) -> Result<Option<Device>, StoreError>;

    /// Value of the device's credential record
    async fn credential(&self, mac: &str) -> Result<Option<String>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// One atomic sequence of record writes.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] discards
/// every write made through it.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn insert_identity(&mut self, mac: &str, description: &str) -> Result<(), StoreError>;
    async fn insert_membership(&mut self, mac: &str, vlan: Vlan) -> Result<(), StoreError>;
    async fn insert_credential(&mut self, mac: &str, value: &str) -> Result<(), StoreError>;

    /// Returns the number of rows changed
    async fn update_identity(&mut self, mac: &str, description: &str) -> Result<u64, StoreError>;
    /// Returns the number of rows changed
    async fn update_membership(&mut self, mac: &str, vlan: Vlan) -> Result<u64, StoreError>;

    async fn delete_identity(&mut self, mac: &str) -> Result<u64, StoreError>;
    async fn delete_membership(&mut self, mac: &str) -> Result<u64, StoreError>;
    async fn delete_credential(&mut self, mac: &str) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// The only component that mutates device records
#[derive(Clone)]
pub struct DeviceStore {
    backend: Arc<dyn DeviceBackend>,
}

impl DeviceStore {
    pub fn new(backend: Arc<dyn DeviceBackend>) -> Self {
        Self { backend }
    }

    pub async fn list(&self) -> Result<Vec<Device>, StoreError> {
        self.backend.list().await
    }

    /// `Ok(None)` when the device does not exist
    pub async fn get(&self, mac: &str) -> Result<Option<Device>, StoreError> {
        self.backend.get(mac).await
    }

    pub async fn credential(&self, mac: &str) -> Result<Option<String>, StoreError> {
        self.backend.credential(mac).await
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.backend.ping().await
    }

    /// Provision a device: identity, then membership, then credential.
    ///
    /// Input is validated before a unit of work is opened.
    pub async fn add(&self, input: &NewDevice) -> Result<Device, StoreError> {
        let device = input.validate()?;

        let mut uow = self.backend.begin().await?;
        uow.insert_identity(&device.mac, &device.description).await?;
        uow.insert_membership(&device.mac, device.vlan).await?;
        // The credential value is the MAC itself; RADIUS MAC auth expects it.
        uow.insert_credential(&device.mac, &device.mac).await?;
        uow.commit().await?;

        Ok(device)
    }

    /// Change description and VLAN. The credential record is never touched.
    ///
    /// A device whose membership record has gone missing gets a new one.
    pub async fn update(
        &self,
        mac: &str,
        description: &str,
        vlan: &str,
    ) -> Result<UpdateOutcome, StoreError> {
        let vlan = vlan.parse::<Vlan>()?;

        let mut uow = self.backend.begin().await?;
        if uow.update_identity(mac, description).await? == 0 {
            return Ok(UpdateOutcome::Missing);
        }
        if uow.update_membership(mac, vlan).await? == 0 {
            tracing::warn!(mac = %mac, "Group membership record missing, recreating it");
            uow.insert_membership(mac, vlan).await?;
        }
        uow.commit().await?;

        Ok(UpdateOutcome::Updated)
    }

    /// Remove all three records. Each delete is attempted even when an
    /// earlier one matched nothing.
    pub async fn delete(&self, mac: &str) -> Result<DeleteOutcome, StoreError> {
        let mut uow = self.backend.begin().await?;
        let removed = uow.delete_identity(mac).await?
            + uow.delete_membership(mac).await?
            + uow.delete_credential(mac).await?;
        uow.commit().await?;

        Ok(if removed > 0 {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::Absent
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn store() -> (DeviceStore, MemoryDeviceBackend) {
        let backend = MemoryDeviceBackend::new();
        (DeviceStore::new(Arc::new(backend.clone())), backend)
    }

    fn printer() -> NewDevice {
        NewDevice {
            mac: "aabbccddeeff".into(),
            description: "Printer".into(),
            vlan: "trusted".into(),
        }
    }

    #[tokio::test]
    async fn test_add_then_list_contains_device_once() {
        let (store, _) = store();
        store.add(&printer()).await.unwrap();

        let devices = store.list().await.unwrap();
        assert_eq!(
            devices,
            vec![Device {
                mac: "aabbccddeeff".into(),
                description: "Printer".into(),
                vlan: Vlan::Trusted,
            }]
        );
        assert_eq!(
            store.credential("aabbccddeeff").await.unwrap().as_deref(),
            Some("aabbccddeeff")
        );
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_mac() {
        let (store, _) = store();
        for mac in ["cccccccccccc", "aaaaaaaaaaaa", "bbbbbbbbbbbb"] {
            let input = NewDevice {
                mac: mac.into(),
                description: String::new(),
                vlan: "guest".into(),
            };
            store.add(&input).await.unwrap();
        }

        let macs: Vec<String> = store.list().await.unwrap().into_iter().map(|d| d.mac).collect();
        assert_eq!(macs, vec!["aaaaaaaaaaaa", "bbbbbbbbbbbb", "cccccccccccc"]);
    }

    #[tokio::test]
    async fn test_invalid_input_never_touches_storage() {
        let (store, backend) = store();
        // Any storage access would fail loudly.
        backend.fail_on(Step::Begin);

        for (mac, vlan) in [("bad", "trusted"), ("AABBCCDDEEFF", "iot"), ("aabbccddeeff", "vip")] {
            let input = NewDevice {
                mac: mac.into(),
                description: "x".into(),
                vlan: vlan.into(),
            };
            let err = store.add(&input).await.unwrap_err();
            assert!(err.is_validation(), "{mac}/{vlan}: {err}");
            assert_eq!(backend.records(mac).await, RecordPresence::default());
        }
    }

    #[tokio::test]
    async fn test_credential_failure_rolls_back_identity_and_membership() {
        let (store, backend) = store();
        backend.fail_on(Step::InsertCredential);

        let err = store.add(&printer()).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Backend {
                step: Step::InsertCredential,
                ..
            }
        ));
        assert_eq!(backend.records("aabbccddeeff").await, RecordPresence::default());
    }

    #[tokio::test]
    async fn test_commit_failure_rolls_back() {
        let (store, backend) = store();
        backend.fail_on(Step::Commit);

        assert!(store.add(&printer()).await.is_err());
        assert_eq!(backend.records("aabbccddeeff").await, RecordPresence::default());
    }

    #[tokio::test]
    async fn test_duplicate_add_is_a_conflict() {
        let (store, backend) = store();
        store.add(&printer()).await.unwrap();

        let second = NewDevice {
            description: "Other".into(),
            vlan: "guest".into(),
            ..printer()
        };
        let err = store.add(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let device = store.get("aabbccddeeff").await.unwrap().unwrap();
        assert_eq!(device.description, "Printer");
        assert_eq!(device.vlan, Vlan::Trusted);
        assert_eq!(backend.records("aabbccddeeff").await, RecordPresence::all());
    }

    #[tokio::test]
    async fn test_concurrent_adds_have_one_winner() {
        let (store, _) = store();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let input = NewDevice {
                        description: format!("writer {i}"),
                        ..printer()
                    };
                    store.add(&input).await
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(err) => assert!(matches!(err, StoreError::Conflict(_))),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_credential() {
        let (store, _) = store();
        store.add(&printer()).await.unwrap();

        let outcome = store.update("aabbccddeeff", "Lobby printer", "iot").await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Updated);

        let device = store.get("aabbccddeeff").await.unwrap().unwrap();
        assert_eq!(device.description, "Lobby printer");
        assert_eq!(device.vlan, Vlan::Iot);
        assert_eq!(
            store.credential("aabbccddeeff").await.unwrap().as_deref(),
            Some("aabbccddeeff")
        );
    }

    #[tokio::test]
    async fn test_update_missing_device_is_distinguishable() {
        let (store, backend) = store();
        let outcome = store.update("001122334455", "ghost", "guest").await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Missing);
        assert_eq!(backend.records("001122334455").await, RecordPresence::default());
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_vlan_without_mutation() {
        let (store, backend) = store();
        store.add(&printer()).await.unwrap();
        backend.fail_on(Step::Begin);

        let err = store.update("aabbccddeeff", "changed", "Guest").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidVlan(_)));

        backend.clear_failures();
        let device = store.get("aabbccddeeff").await.unwrap().unwrap();
        assert_eq!(device.description, "Printer");
        assert_eq!(device.vlan, Vlan::Trusted);
    }

    #[tokio::test]
    async fn test_update_failure_rolls_back_description() {
        let (store, backend) = store();
        store.add(&printer()).await.unwrap();
        backend.fail_on(Step::UpdateMembership);

        assert!(store.update("aabbccddeeff", "changed", "guest").await.is_err());

        backend.clear_failures();
        let device = store.get("aabbccddeeff").await.unwrap().unwrap();
        assert_eq!(device.description, "Printer");
    }

    #[tokio::test]
    async fn test_update_recreates_missing_membership() {
        let (store, backend) = store();
        store.add(&printer()).await.unwrap();
        backend.detach_membership("aabbccddeeff").await;
        assert!(store.get("aabbccddeeff").await.unwrap().is_none());

        let outcome = store.update("aabbccddeeff", "Printer", "guest").await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Updated);

        let device = store.get("aabbccddeeff").await.unwrap().unwrap();
        assert_eq!(device.vlan, Vlan::Guest);
    }

    #[tokio::test]
    async fn test_get_failure_is_not_not_found() {
        let (store, backend) = store();
        store.add(&printer()).await.unwrap();
        backend.fail_on(Step::Get);

        let err = store.get("aabbccddeeff").await.unwrap_err();
        assert!(matches!(err, StoreError::Backend { step: Step::Get, .. }));

        backend.clear_failures();
        assert!(store.get("001122334455").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (store, backend) = store();
        store.add(&printer()).await.unwrap();

        assert_eq!(store.delete("aabbccddeeff").await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(backend.records("aabbccddeeff").await, RecordPresence::default());

        assert_eq!(store.delete("aabbccddeeff").await.unwrap(), DeleteOutcome::Absent);
        assert_eq!(backend.records("aabbccddeeff").await, RecordPresence::default());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_all_records() {
        let (store, backend) = store();
        store.add(&printer()).await.unwrap();
        backend.fail_on(Step::DeleteCredential);

        assert!(store.delete("aabbccddeeff").await.is_err());
        assert_eq!(backend.records("aabbccddeeff").await, RecordPresence::all());
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_rolls_back() {
        let (store, backend) = store();
        {
            let mut uow = backend.begin().await.unwrap();
            uow.insert_identity("aabbccddeeff", "half").await.unwrap();
            uow.insert_membership("aabbccddeeff", Vlan::Iot).await.unwrap();
        }
        assert_eq!(backend.records("aabbccddeeff").await, RecordPresence::default());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_store_error_http_mapping() {
        let err: AppError = StoreError::InvalidMac("bad".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: AppError = StoreError::Conflict("aabbccddeeff".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Device already exists: aabbccddeeff");

        let err: AppError =
            StoreError::backend(Step::InsertCredential, anyhow::anyhow!("connection reset")).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Error inserting credential record");
    }
}
