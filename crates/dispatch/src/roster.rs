//! Roster service — directory snapshot loads and admin lookups.
//!
//! Raw employee CRUD lives outside this core; the dispatch pipeline only
//! needs read access to the directory and the admin collection, plus an
//! error-log sink.

use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{Admin, Employee};

pub struct RosterService;

impl RosterService {
    /// Load the full directory snapshot the authorization filter runs over.
    ///
    /// Deliberately unfiltered: inactive employees stay in the snapshot so
    /// supervisor chains passing through them still resolve.
    pub async fn all_employees(pool: &PgPool) -> Result<Vec<Employee>, AppError> {
        let employees: Vec<Employee> =
            sqlx::query_as("SELECT * FROM employees ORDER BY last_name, first_name")
                .fetch_all(pool)
                .await?;
        Ok(employees)
    }

    /// Resolve an acting admin by id. `None` means no access anywhere.
    pub async fn find_admin(pool: &PgPool, admin_id: Uuid) -> Result<Option<Admin>, AppError> {
        let admin: Option<Admin> = sqlx::query_as("SELECT * FROM admins WHERE id = $1")
            .bind(admin_id)
            .fetch_optional(pool)
            .await?;
        Ok(admin)
    }

    /// Resolve an admin by login email, for credential authentication.
    pub async fn find_admin_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<Admin>, AppError> {
        let admin: Option<Admin> = sqlx::query_as("SELECT * FROM admins WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(admin)
    }

    /// Resolve an admin by API key, for header-based authentication.
    pub async fn find_admin_by_api_key(
        pool: &PgPool,
        api_key: &str,
    ) -> Result<Option<Admin>, AppError> {
        let admin: Option<Admin> = sqlx::query_as("SELECT * FROM admins WHERE api_key = $1")
            .bind(api_key)
            .fetch_optional(pool)
            .await?;
        Ok(admin)
    }

    /// Append a row to the error log. Failures here are logged and swallowed;
    /// the error log must never mask the error being recorded.
    pub async fn log_error(pool: &PgPool, context: &str, detail: &str) {
        let result = sqlx::query(
            "INSERT INTO error_logs (id, context, detail, created_at) VALUES ($1, $2, $3, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(context)
        .bind(detail)
        .execute(pool)
        .await;

        if let Err(e) = result {
            tracing::error!(context, error = %e, "Failed to write error log entry");
        }
    }
}
