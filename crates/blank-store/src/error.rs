use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    InvalidData(String),
    NotFound(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            StoreError::NotFound(what) => write!(f, "not found: {what}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

/// Missing rows keep their meaning; every other store failure is an outage
/// from the pipeline's point of view.
impl From<StoreError> for blank_core::Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => blank_core::Error::NotFound(what),
            other => {
                tracing::error!("store failure: {other}");
                blank_core::Error::StoreUnavailable(other.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err: blank_core::Error = StoreError::NotFound("entry 42".into()).into();
        assert_eq!(err, blank_core::Error::NotFound("entry 42".into()));
    }

    #[test]
    fn test_sqlite_maps_to_unavailable() {
        let err: blank_core::Error =
            StoreError::Sqlite(rusqlite::Error::InvalidQuery).into();
        assert!(matches!(err, blank_core::Error::StoreUnavailable(_)));
    }
}
