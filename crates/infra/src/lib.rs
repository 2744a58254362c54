//! Infrastructure layer: stock ledger backends, repositories, services, config.

pub mod config;
pub mod ledger;
pub mod repository;
pub mod services;

mod integration_tests;

pub use config::{AppConfig, ConfigError, DatabaseConfig, LogFormat, StorageBackend};
pub use ledger::{
    InMemoryStockLedger, LedgerError, MovementFilter, PostgresStockLedger, PublishingStockLedger,
    StockLedger,
};
pub use repository::{InMemoryRepository, Repository};
pub use services::{Repositories, ServiceError, ServiceResult, Services};
