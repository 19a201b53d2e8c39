use std::fmt;

/// Failures surfaced by the asset contract to the ledger runtime.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractError {
    #[error("the asset {0} already exists")]
    AlreadyExists(String),
    #[error("the asset {0} does not exist")]
    NotFound(String),
    #[error("failed to read from world state: {0}")]
    StateRead(String),
    #[error("failed to write to world state: {0}")]
    StateWrite(String),
    #[error("failed to get history for asset {key}: {reason}")]
    HistoryIteration { key: String, reason: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to encode result: {0}")]
    Encode(String),
    #[error("failed to decode stored asset: {0}")]
    Decode(String),
    #[error("function {0} not found in contract")]
    UnknownFunction(String),
}

/// Discriminant of [`ContractError`], for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    StateRead,
    StateWrite,
    HistoryIteration,
    InvalidArgument,
    Encode,
    Decode,
    UnknownFunction,
}

impl ContractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContractError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            ContractError::NotFound(_) => ErrorKind::NotFound,
            ContractError::StateRead(_) => ErrorKind::StateRead,
            ContractError::StateWrite(_) => ErrorKind::StateWrite,
            ContractError::HistoryIteration { .. } => ErrorKind::HistoryIteration,
            ContractError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ContractError::Encode(_) => ErrorKind::Encode,
            ContractError::Decode(_) => ErrorKind::Decode,
            ContractError::UnknownFunction(_) => ErrorKind::UnknownFunction,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::StateRead => "StateReadError",
            ErrorKind::StateWrite => "StateWriteError",
            ErrorKind::HistoryIteration => "HistoryIterationError",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::Encode => "EncodeError",
            ErrorKind::Decode => "DecodeError",
            ErrorKind::UnknownFunction => "UnknownFunction",
        };
        f.write_str(name)
    }
}
