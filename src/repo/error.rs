use mongodb::bson;
use mongodb::error::{ErrorKind, WriteFailure};

/// Server error code reported when a write violates a unique index.
pub const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("duplicate entry :: {0}")]
    Duplicate(String),
    #[error("invalid object ID `{0}`")]
    InvalidObjectId(String),
    #[error("item not found")]
    NotFound,
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("no records to save")]
    EmptyBatch,
    #[error("store disconnected")]
    Disconnected,
    #[error("driver error :: {0}")]
    Driver(#[source] mongodb::error::Error),
    #[error("document serialization error :: {0}")]
    Serialization(#[from] bson::ser::Error),
    #[error("document deserialization error :: {0}")]
    Deserialization(#[from] bson::de::Error),
    #[error("query error :: {0}")]
    QueryError(#[from] crate::query::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

impl From<mongodb::error::Error> for Error {
    fn from(value: mongodb::error::Error) -> Self {
        if is_duplicate_key(&value) {
            return Self::Duplicate(value.to_string());
        }
        Self::Driver(value)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
        ErrorKind::InsertMany(e) => e
            .write_errors
            .as_ref()
            .is_some_and(|errs| errs.iter().any(|e| e.code == DUPLICATE_KEY_CODE)),
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;
    use mongodb::error::{CommandError, WriteError};

    fn write_error(code: i32) -> mongodb::error::Error {
        let failure: WriteError = bson::from_document(doc! {
            "code": code,
            "codeName": "DuplicateKey",
            "errmsg": "E11000 duplicate key error collection: db.users index: _id_",
        })
        .unwrap();
        mongodb::error::Error::from(ErrorKind::Write(WriteFailure::WriteError(failure)))
    }

    #[test]
    fn duplicate_key_write_is_classified() {
        let err = Error::from(write_error(DUPLICATE_KEY_CODE));
        assert!(err.is_duplicate(), "unexpected error: {err}");
    }

    #[test]
    fn other_write_errors_stay_driver_errors() {
        let err = Error::from(write_error(121));
        assert!(matches!(err, Error::Driver(_)), "unexpected error: {err}");
    }

    #[test]
    fn duplicate_key_command_is_classified() {
        let failure: CommandError = bson::from_document(doc! {
            "code": DUPLICATE_KEY_CODE,
            "codeName": "DuplicateKey",
            "errmsg": "E11000 duplicate key error",
        })
        .unwrap();
        let err = Error::from(mongodb::error::Error::from(ErrorKind::Command(failure)));
        assert!(err.is_duplicate());
    }
}
