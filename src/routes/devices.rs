// ============================================================================
// Device Routes
// ============================================================================
//
// Endpoints (intern application):
// - GET  /devices                 - list
// - GET  /devices/add             - add form
// - POST /devices/add             - create (mac, description, vlan)
// - GET  /devices/edit/:mac       - edit form
// - POST /devices/edit/:mac       - update (description, vlan)
// - POST /devices/delete/:mac     - delete
//
// Mutations answer 303 See Other to /devices so a reload never resubmits.
//
// ============================================================================

use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    Form,
};
use radman_error::AppError;
use std::sync::Arc;

use crate::audit::{AuditLogger, Operation};
use crate::auth::AuthInfo;
use crate::context::AppContext;
use crate::device::{DeviceChanges, NewDevice};
use crate::routes::extractors::Caller;
use crate::store::{DeleteOutcome, StoreError, UpdateOutcome};
use crate::views;

const DEVICES_PATH: &str = "/devices";

/// Audit and convert a failed mutation
fn mutation_error(caller: &AuthInfo, operation: Operation, mac: &str, err: StoreError) -> AppError {
    if err.is_validation() {
        tracing::warn!(
            actor = %caller.username,
            mac = %mac,
            operation = ?operation,
            error = %err,
            "Device mutation rejected"
        );
        AuditLogger::log_mutation_rejected(caller, operation, mac, &err.to_string());
    } else {
        tracing::error!(
            actor = %caller.username,
            mac = %mac,
            operation = ?operation,
            error = %err,
            "Device mutation failed"
        );
        AuditLogger::log_mutation_failed(caller, operation, mac, &err.to_string());
    }
    err.into()
}

/// GET /devices
pub async fn list_devices(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Html<String>, AppError> {
    let devices = ctx.store.list().await?;
    Ok(Html(views::device_list(&devices)))
}

/// GET /devices/add
pub async fn show_add_form() -> Html<String> {
    Html(views::add_form())
}

/// POST /devices/add
pub async fn add_device(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    Form(input): Form<NewDevice>,
) -> Result<Redirect, AppError> {
    let device = ctx
        .store
        .add(&input)
        .await
        .map_err(|e| mutation_error(&caller, Operation::Add, &input.mac, e))?;

    tracing::info!(
        actor = %caller.username,
        actor_name = %caller.name,
        mac = %device.mac,
        vlan = %device.vlan,
        "Device added"
    );
    AuditLogger::log_device_added(&caller, &device.mac, device.vlan.as_str());

    Ok(Redirect::to(DEVICES_PATH))
}

/// GET /devices/edit/:mac
pub async fn show_edit_form(
    State(ctx): State<Arc<AppContext>>,
    Path(mac): Path<String>,
) -> Result<Html<String>, AppError> {
    match ctx.store.get(&mac).await? {
        Some(device) => Ok(Html(views::edit_form(&device))),
        None => Err(AppError::not_found(format!("Device not found: {}", mac))),
    }
}

/// POST /devices/edit/:mac
pub async fn update_device(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    Path(mac): Path<String>,
    Form(changes): Form<DeviceChanges>,
) -> Result<Redirect, AppError> {
    let outcome = ctx
        .store
        .update(&mac, &changes.description, &changes.vlan)
        .await
        .map_err(|e| mutation_error(&caller, Operation::Update, &mac, e))?;

    match outcome {
        UpdateOutcome::Updated => tracing::info!(
            actor = %caller.username,
            actor_name = %caller.name,
            mac = %mac,
            vlan = %changes.vlan,
            "Device updated"
        ),
        UpdateOutcome::Missing => tracing::warn!(
            actor = %caller.username,
            mac = %mac,
            "Update matched no device"
        ),
    }
    AuditLogger::log_device_updated(
        &caller,
        &mac,
        &changes.vlan,
        outcome == UpdateOutcome::Updated,
    );

    Ok(Redirect::to(DEVICES_PATH))
}

/// POST /devices/delete/:mac
pub async fn delete_device(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    Path(mac): Path<String>,
) -> Result<Redirect, AppError> {
    let outcome = ctx
        .store
        .delete(&mac)
        .await
        .map_err(|e| mutation_error(&caller, Operation::Delete, &mac, e))?;

    tracing::info!(
        actor = %caller.username,
        actor_name = %caller.name,
        mac = %mac,
        existed = outcome == DeleteOutcome::Deleted,
        "Device deleted"
    );
    AuditLogger::log_device_deleted(&caller, &mac, outcome == DeleteOutcome::Deleted);

    Ok(Redirect::to(DEVICES_PATH))
}
