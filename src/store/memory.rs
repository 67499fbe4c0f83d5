//! In-process device backend.
//!
//! A unit of work takes the table lock for its whole lifetime and writes to
//! a staged copy; commit swaps the copy in, drop discards it. Units of work
//! are therefore fully serialised, which gives the same one-winner outcome
//! for racing inserts as a unique index does in Postgres.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{DeviceBackend, StoreError, Step, UnitOfWork};
use crate::device::{Device, Vlan};

#[derive(Debug, Clone, Default)]
struct Tables {
    /// username -> description
    identity: BTreeMap<String, String>,
    /// username -> groupname
    membership: BTreeMap<String, String>,
    /// username -> credential value
    credential: BTreeMap<String, String>,
}

impl Tables {
    fn device(&self, mac: &str) -> Result<Option<Device>, StoreError> {
        let (Some(description), Some(group)) = (self.identity.get(mac), self.membership.get(mac))
        else {
            return Ok(None);
        };
        Ok(Some(Device {
            mac: mac.to_string(),
            description: description.clone(),
            vlan: parse_group(group, Step::Get)?,
        }))
    }
}

fn parse_group(group: &str, step: Step) -> Result<Vlan, StoreError> {
    group
        .parse::<Vlan>()
        .map_err(|e| StoreError::backend(step, anyhow::anyhow!("stored group is invalid: {e}")))
}

/// Which of a device's three records exist
#[doc(hidden)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordPresence {
    pub identity: bool,
    pub membership: bool,
    pub credential: bool,
}

impl RecordPresence {
    pub fn all() -> Self {
        Self {
            identity: true,
            membership: true,
            credential: true,
        }
    }
}

/// Hooks marked `#[doc(hidden)]` exist for the test suite: failure injection
/// per [`Step`] and direct inspection of committed rows.
#[derive(Clone, Default)]
pub struct MemoryDeviceBackend {
    tables: Arc<Mutex<Tables>>,
    failpoints: Arc<StdMutex<HashSet<Step>>>,
}

impl MemoryDeviceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[doc(hidden)]
    /// Make every subsequent execution of `step` fail
    pub fn fail_on(&self, step: Step) {
        self.failpoints
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(step);
    }

    #[doc(hidden)]
    pub fn clear_failures(&self) {
        self.failpoints
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    #[doc(hidden)]
    /// Inspect committed state without going through the store
    pub async fn records(&self, mac: &str) -> RecordPresence {
        let tables = self.tables.lock().await;
        RecordPresence {
            identity: tables.identity.contains_key(mac),
            membership: tables.membership.contains_key(mac),
            credential: tables.credential.contains_key(mac),
        }
    }

    #[doc(hidden)]
    /// Remove only the membership record, leaving a half-provisioned device
    pub async fn detach_membership(&self, mac: &str) {
        self.tables.lock().await.membership.remove(mac);
    }

    fn check(&self, step: Step) -> Result<(), StoreError> {
        check_failpoint(&self.failpoints, step)
    }
}

fn check_failpoint(failpoints: &StdMutex<HashSet<Step>>, step: Step) -> Result<(), StoreError> {
    let armed = failpoints
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .contains(&step);
    if armed {
        Err(StoreError::backend(step, anyhow::anyhow!("injected failure")))
    } else {
        Ok(())
    }
}

#[async_trait]
impl DeviceBackend for MemoryDeviceBackend {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        self.check(Step::Begin)?;
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            staged,
            failpoints: self.failpoints.clone(),
        }))
    }

    async fn list(&self) -> Result<Vec<Device>, StoreError> {
        self.check(Step::List)?;
        let tables = self.tables.lock().await;
        tables
            .identity
            .iter()
            .filter_map(|(mac, description)| {
                tables.membership.get(mac).map(|group| {
                    parse_group(group, Step::List).map(|vlan| Device {
                        mac: mac.clone(),
                        description: description.clone(),
                        vlan,
                    })
                })
            })
            .collect()
    }

    async fn get(&self, mac: &str) -> Result<Option<Device>, StoreError> {
        self.check(Step::Get)?;
        self.tables.lock().await.device(mac)
    }

    async fn credential(&self, mac: &str) -> Result<Option<String>, StoreError> {
        self.check(Step::ReadCredential)?;
        Ok(self.tables.lock().await.credential.get(mac).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check(Step::Ping)
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
    failpoints: Arc<StdMutex<HashSet<Step>>>,
}

impl MemoryUnitOfWork {
    fn check(&self, step: Step) -> Result<(), StoreError> {
        check_failpoint(&self.failpoints, step)
    }
}

fn insert_unique(
    table: &mut BTreeMap<String, String>,
    mac: &str,
    value: String,
    step: Step,
) -> Result<(), StoreError> {
    if table.contains_key(mac) {
        return Err(StoreError::backend(
            step,
            anyhow::anyhow!("duplicate key {mac}"),
        ));
    }
    table.insert(mac.to_string(), value);
    Ok(())
}

fn remove(table: &mut BTreeMap<String, String>, mac: &str) -> u64 {
    u64::from(table.remove(mac).is_some())
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn insert_identity(&mut self, mac: &str, description: &str) -> Result<(), StoreError> {
        self.check(Step::InsertIdentity)?;
        if self.staged.identity.contains_key(mac) {
            return Err(StoreError::Conflict(mac.to_string()));
        }
        self.staged
            .identity
            .insert(mac.to_string(), description.to_string());
        Ok(())
    }

    async fn insert_membership(&mut self, mac: &str, vlan: Vlan) -> Result<(), StoreError> {
        self.check(Step::InsertMembership)?;
        insert_unique(
            &mut self.staged.membership,
            mac,
            vlan.as_str().to_string(),
            Step::InsertMembership,
        )
    }

    async fn insert_credential(&mut self, mac: &str, value: &str) -> Result<(), StoreError> {
        self.check(Step::InsertCredential)?;
        insert_unique(
            &mut self.staged.credential,
            mac,
            value.to_string(),
            Step::InsertCredential,
        )
    }

    async fn update_identity(&mut self, mac: &str, description: &str) -> Result<u64, StoreError> {
        self.check(Step::UpdateIdentity)?;
        Ok(match self.staged.identity.get_mut(mac) {
            Some(current) => {
                *current = description.to_string();
                1
            }
            None => 0,
        })
    }

    async fn update_membership(&mut self, mac: &str, vlan: Vlan) -> Result<u64, StoreError> {
        self.check(Step::UpdateMembership)?;
        Ok(match self.staged.membership.get_mut(mac) {
            Some(current) => {
                *current = vlan.as_str().to_string();
                1
            }
            None => 0,
        })
    }

    async fn delete_identity(&mut self, mac: &str) -> Result<u64, StoreError> {
        self.check(Step::DeleteIdentity)?;
        Ok(remove(&mut self.staged.identity, mac))
    }

    async fn delete_membership(&mut self, mac: &str) -> Result<u64, StoreError> {
        self.check(Step::DeleteMembership)?;
        Ok(remove(&mut self.staged.membership, mac))
    }

    async fn delete_credential(&mut self, mac: &str) -> Result<u64, StoreError> {
        self.check(Step::DeleteCredential)?;
        Ok(remove(&mut self.staged.credential, mac))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.check(Step::Commit)?;
        let MemoryUnitOfWork {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }
}
