//! Client side of the asset ledger: an in-process ledger runtime, the gateway
//! that endorses and commits contract calls against it, and the REST façade.

pub mod api;
pub mod config;
pub mod dto;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod ledger;
pub mod logging;

pub use api::router;
pub use config::{ApiConfig, LogFormat, Timeouts};
pub use error::ApiError;
pub use gateway::{Gateway, GatewayError, LocalGateway, Phase};
pub use identity::Identity;
pub use ledger::{InMemoryLedger, ReadWriteSet, TxValidationCode};
