use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB deployment `{database}` does not support transactions (standalone server)")]
    TransactionsUnsupported { database: String },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB operation `{operation}` on `{collection}` failed")]
    Operation {
        collection: &'static str,
        operation: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("closure transaction for season `{season_id}` failed")]
    Transaction {
        season_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("invalid `{field}` value `{value}` in collection `{collection}`")]
    InvalidField {
        collection: &'static str,
        field: &'static str,
        value: String,
    },
}

impl MongoDaoError {
    /// Wrap a driver error raised by `operation` on `collection`.
    pub fn operation(collection: &'static str, operation: &'static str) -> impl FnOnce(MongoError) -> Self {
        move |source| MongoDaoError::Operation {
            collection,
            operation,
            source,
        }
    }
}

/// Whether the driver error is a unique index violation.
pub fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}
