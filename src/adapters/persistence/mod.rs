use async_trait::async_trait;
use sqlx::PgPool;

use crate::{app_error::AppError, ports::health_probe::HealthProbe};

pub mod coupon;
pub mod payment;
pub mod plan;
pub mod user;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }
}

#[async_trait]
impl HealthProbe for PostgresPersistence {
    async fn store_reachable(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Health check query failed");
                false
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                // PostgreSQL unique violation: a provider id already belongs to another payment
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    tracing::error!(error = ?err, "Unique constraint violated");
                    AppError::Internal("Provider identifier already linked to another payment".into())
                } else {
                    tracing::error!(error = ?err, "Database error");
                    AppError::Database("Database operation failed".into())
                }
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
