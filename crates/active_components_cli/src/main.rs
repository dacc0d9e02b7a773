//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `active_components_core` linkage.
//! - Run one validate/insert/update cycle against in-memory SQLite.

use active_components_core::{
    attribute_map, init_logging, open_db_in_memory, ActiveRecord, LoggingConfig, Migration, Model,
    ModelState, Rule, SqliteStorage, StorageConfig,
};
use log::info;
use std::error::Error;

const USERS_SCHEMA: Migration = Migration::new(
    1,
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL
    );",
);

#[derive(Default)]
struct User {
    state: ModelState,
}

impl Model for User {
    const ATTRIBUTES: &'static [&'static str] = &["id", "name", "email"];

    fn state(&self) -> &ModelState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModelState {
        &mut self.state
    }

    fn rules() -> Vec<Rule<Self>> {
        vec![Rule::required("name, email"), Rule::email("email")]
    }
}

impl ActiveRecord for User {
    const TABLE: &'static str = "users";
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("active_components_core ping={}", active_components_core::ping());
    println!(
        "active_components_core version={}",
        active_components_core::core_version()
    );

    let log_dir = std::env::temp_dir().join("active_components_cli");
    if let Err(err) = init_logging(&LoggingConfig::new(log_dir)) {
        eprintln!("logging disabled: {err}");
    }

    let conn = open_db_in_memory(&StorageConfig::default().with_migrations(&[USERS_SCHEMA]))?;
    let storage = SqliteStorage::new(&conn);

    let mut user = User::default();
    user.set_attributes(attribute_map([("name", "Al"), ("email", "al@example.com")]), false)?;
    let inserted = user.save(&storage);
    println!(
        "insert ok={} id={}",
        inserted,
        user.primary_key_value().to_text()
    );

    user.set_attribute("email", "not-an-email");
    let rejected = user.save(&storage);
    for (attribute, message) in user.error_log().messages() {
        println!("error {attribute}: {message}");
    }
    info!(
        "event=cli_demo module=cli status=ok inserted={} rejected_update={}",
        inserted, !rejected
    );
    Ok(())
}
