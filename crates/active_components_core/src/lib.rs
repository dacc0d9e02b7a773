//! Active record data-access core.
//! Models, validation rules, storage backends and the service container.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod validation;

pub use config::{default_log_level, LoggingConfig, StorageConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult, Migration};
pub use logging::{init_logging, logging_status};
pub use model::criteria::{Criteria, JoinKind, SubSelect, WhereClause, COUNT_ALIAS};
pub use model::errors::{ErrorKind, ErrorLog, Translator, ValidationError};
pub use model::form::{FormModel, FormSource};
pub use model::record::{ActiveRecord, Found};
pub use model::template::{template, TemplateCache};
pub use model::value::{attribute_map, AttributeMap, AttributeValue};
pub use model::{Lifecycle, Model, ModelError, ModelResult, ModelState, Scenario};
pub use repo::sqlite_storage::SqliteStorage;
pub use repo::storage::{Storage, StorageError, StorageResult};
pub use service::container::{as_shared, Container, ContainerError, ContainerResult};
pub use validation::rule::{CustomValidators, Rule, RuleKind, RuleParams};
pub use validation::session::ValidationSession;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
