//! Postgres device backend over the RADIUS tables.
//!
//! A unit of work owns a `sqlx::Transaction`; dropping it uncommitted issues
//! a rollback when the connection returns to the pool.

use async_trait::async_trait;
use radman_db::{radius, DbPool};
use sqlx::{Postgres, Transaction};

use super::{DeviceBackend, StoreError, Step, UnitOfWork};
use crate::device::{Device, Vlan};

#[derive(Clone)]
pub struct PgDeviceBackend {
    pool: DbPool,
}

impl PgDeviceBackend {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_device(row: radius::DeviceRow, step: Step) -> Result<Device, StoreError> {
    let vlan = row.groupname.parse::<Vlan>().map_err(|e| {
        StoreError::backend(step, anyhow::anyhow!("stored group is invalid: {e}"))
    })?;
    Ok(Device {
        mac: row.username,
        description: row.description,
        vlan,
    })
}

fn failed(step: Step) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| StoreError::backend(step, err)
}

#[async_trait]
impl DeviceBackend for PgDeviceBackend {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await.map_err(failed(Step::Begin))?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn list(&self) -> Result<Vec<Device>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(failed(Step::List))?;
        let rows = radius::list_devices(&mut conn)
            .await
            .map_err(failed(Step::List))?;
        rows.into_iter().map(|row| to_device(row, Step::List)).collect()
    }

    async fn get(&self, mac: &str) -> Result<Option<Device>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(failed(Step::Get))?;
        radius::find_device(&mut conn, mac)
            .await
            .map_err(failed(Step::Get))?
            .map(|row| to_device(row, Step::Get))
            .transpose()
    }

    async fn credential(&self, mac: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(failed(Step::ReadCredential))?;
        radius::find_credential(&mut conn, mac)
            .await
            .map_err(failed(Step::ReadCredential))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        radman_db::ping(&self.pool).await.map_err(failed(Step::Ping))
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn insert_identity(&mut self, mac: &str, description: &str) -> Result<(), StoreError> {
        radius::insert_identity(&mut self.tx, mac, description)
            .await
            .map_err(|err| {
                if radman_db::is_unique_violation(&err) {
                    StoreError::Conflict(mac.to_string())
                } else {
                    StoreError::backend(Step::InsertIdentity, err)
                }
            })
    }

    async fn insert_membership(&mut self, mac: &str, vlan: Vlan) -> Result<(), StoreError> {
        radius::insert_membership(&mut self.tx, mac, vlan.as_str())
            .await
            .map_err(failed(Step::InsertMembership))
    }

    async fn insert_credential(&mut self, mac: &str, value: &str) -> Result<(), StoreError> {
        radius::insert_credential(&mut self.tx, mac, value)
            .await
            .map_err(failed(Step::InsertCredential))
    }

    async fn update_identity(&mut self, mac: &str, description: &str) -> Result<u64, StoreError> {
        radius::update_identity(&mut self.tx, mac, description)
            .await
            .map_err(failed(Step::UpdateIdentity))
    }

    async fn update_membership(&mut self, mac: &str, vlan: Vlan) -> Result<u64, StoreError> {
        radius::update_membership(&mut self.tx, mac, vlan.as_str())
            .await
            .map_err(failed(Step::UpdateMembership))
    }

    async fn delete_identity(&mut self, mac: &str) -> Result<u64, StoreError> {
        radius::delete_identity(&mut self.tx, mac)
            .await
            .map_err(failed(Step::DeleteIdentity))
    }

    async fn delete_membership(&mut self, mac: &str) -> Result<u64, StoreError> {
        radius::delete_membership(&mut self.tx, mac)
            .await
            .map_err(failed(Step::DeleteMembership))
    }

    async fn delete_credential(&mut self, mac: &str) -> Result<u64, StoreError> {
        radius::delete_credential(&mut self.tx, mac)
            .await
            .map_err(failed(Step::DeleteCredential))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(failed(Step::Commit))
    }
}
