use sqlx::error::DatabaseError;

use crate::application::repos::RepoError;

/// Translate a sqlx failure into the repository error taxonomy.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => classify_database_error(db.as_ref()),
        other => RepoError::from_persistence(other),
    }
}

fn classify_database_error(db: &dyn DatabaseError) -> RepoError {
    let message = db.message();
    if message.contains("duplicate key") {
        return RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        };
    }
    if message.contains("violates foreign key constraint")
        || message.contains("invalid input syntax")
    {
        return RepoError::InvalidInput {
            message: message.to_string(),
        };
    }
    if message.contains("canceling statement due to user request") {
        return RepoError::Timeout;
    }
    if message.contains("violates") {
        return RepoError::Integrity {
            message: message.to_string(),
        };
    }
    RepoError::Persistence(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
    }

    #[test]
    fn pool_timeout_maps_to_timeout() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepoError::Timeout
        ));
    }
}
