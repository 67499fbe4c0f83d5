//! Queries against the RADIUS tables.
//!
//! Every function takes a `&mut PgConnection` so callers decide whether it
//! runs on a pooled connection or inside a transaction (`&mut *tx`).

use sqlx::PgConnection;

/// Attribute FreeRADIUS checks for MAC authentication
pub const CLEARTEXT_PASSWORD_ATTRIBUTE: &str = "Cleartext-Password";
/// Assignment operator stored in `radcheck.op`
pub const ASSIGN_OP: &str = ":=";
/// Priority given to new group memberships
pub const DEFAULT_GROUP_PRIORITY: i32 = 0;

/// A device as the join of `users` and `radusergroup`
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DeviceRow {
    pub username: String,
    pub description: String,
    pub groupname: String,
}

pub async fn list_devices(conn: &mut PgConnection) -> Result<Vec<DeviceRow>, sqlx::Error> {
    sqlx::query_as::<_, DeviceRow>(
        r#"
        SELECT u.username, COALESCE(u.description, '') AS description, r.groupname
        FROM users u
        JOIN radusergroup r ON u.username = r.username
        ORDER BY u.username
        "#,
    )
    .fetch_all(conn)
    .await
}

pub async fn find_device(
    conn: &mut PgConnection,
    username: &str,
) -> Result<Option<DeviceRow>, sqlx::Error> {
    sqlx::query_as::<_, DeviceRow>(
        r#"
        SELECT u.username, COALESCE(u.description, '') AS description, r.groupname
        FROM users u
        JOIN radusergroup r ON u.username = r.username
        WHERE u.username = $1
        ORDER BY r.priority, r.groupname
        LIMIT 1
        "#,
    )
    .bind(username)
    .fetch_optional(conn)
    .await
}

/// Value of the cleartext-password check attribute, if one exists
pub async fn find_credential(
    conn: &mut PgConnection,
    username: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT value FROM radcheck
        WHERE username = $1 AND attribute = $2
        LIMIT 1
        "#,
    )
    .bind(username)
    .bind(CLEARTEXT_PASSWORD_ATTRIBUTE)
    .fetch_optional(conn)
    .await
}

pub async fn insert_identity(
    conn: &mut PgConnection,
    username: &str,
    description: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO users (username, description) VALUES ($1, $2)")
        .bind(username)
        .bind(description)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_membership(
    conn: &mut PgConnection,
    username: &str,
    groupname: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO radusergroup (username, groupname, priority) VALUES ($1, $2, $3)")
        .bind(username)
        .bind(groupname)
        .bind(DEFAULT_GROUP_PRIORITY)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_credential(
    conn: &mut PgConnection,
    username: &str,
    value: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO radcheck (username, attribute, op, value) VALUES ($1, $2, $3, $4)")
        .bind(username)
        .bind(CLEARTEXT_PASSWORD_ATTRIBUTE)
        .bind(ASSIGN_OP)
        .bind(value)
        .execute(conn)
        .await?;
    Ok(())
}

/// Returns the number of identity rows changed
pub async fn update_identity(
    conn: &mut PgConnection,
    username: &str,
    description: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET description = $1 WHERE username = $2")
        .bind(description)
        .bind(username)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Returns the number of membership rows changed
pub async fn update_membership(
    conn: &mut PgConnection,
    username: &str,
    groupname: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE radusergroup SET groupname = $1 WHERE username = $2")
        .bind(groupname)
        .bind(username)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_identity(conn: &mut PgConnection, username: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE username = $1")
        .bind(username)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_membership(
    conn: &mut PgConnection,
    username: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM radusergroup WHERE username = $1")
        .bind(username)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Removes every check attribute for the username, not only the password
pub async fn delete_credential(
    conn: &mut PgConnection,
    username: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM radcheck WHERE username = $1")
        .bind(username)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
