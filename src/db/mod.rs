use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::error::{AppError, AppResult};

pub async fn connect(database_url: &str) -> AppResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options.sqlx_logging(false);

    Database::connect(options)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to connect to database: {}", e)))
}
