#![allow(dead_code)]

use active_components_core::{
    attribute_map, open_db_in_memory, ActiveRecord, AttributeMap, AttributeValue, Criteria,
    CustomValidators, Migration, Model, ModelState, Rule, RuleParams, Storage, StorageError,
    StorageResult, StorageConfig,
};
use rusqlite::Connection;
use std::cell::RefCell;

pub const SCHEMA: Migration = Migration::new(
    1,
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT,
        site TEXT,
        status TEXT NOT NULL DEFAULT 'active'
    );
    CREATE TABLE posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        title TEXT NOT NULL
    );",
);

pub fn open_test_db() -> Connection {
    open_db_in_memory(&StorageConfig::default().with_migrations(&[SCHEMA])).unwrap()
}

#[derive(Debug, Default)]
pub struct User {
    state: ModelState,
}

impl Model for User {
    const ATTRIBUTES: &'static [&'static str] = &["id", "name", "email", "site", "status"];

    fn state(&self) -> &ModelState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModelState {
        &mut self.state
    }

    fn rules() -> Vec<Rule<Self>> {
        vec![Rule::required("name"), Rule::email("email")]
    }

    fn defaults() -> AttributeMap {
        attribute_map([("status", "active")])
    }

    fn custom_validators() -> CustomValidators<Self> {
        CustomValidators::new()
            .with("not_reserved", not_reserved)
            .with("always_reject", always_reject)
    }
}

impl ActiveRecord for User {
    const TABLE: &'static str = "users";
}

impl User {
    pub fn with(pairs: &[(&str, &str)]) -> Self {
        let mut user = Self::default();
        user.set_attributes(attribute_map(pairs.iter().copied()), false)
            .unwrap();
        user
    }
}

/// Records an error when the value equals the `reserved` parameter
/// (`admin` by default).
pub fn not_reserved(user: &mut User, attribute: &str, params: &RuleParams) -> bool {
    let reserved = params
        .get("reserved")
        .map(AttributeValue::to_text)
        .unwrap_or_else(|| "admin".to_string());
    if user.attribute(attribute).to_text() == reserved {
        user.add_error(attribute, "Field %s is reserved!");
    }
    true
}

pub fn always_reject(_user: &mut User, _attribute: &str, _params: &RuleParams) -> bool {
    false
}

#[derive(Debug, Default)]
pub struct Post {
    state: ModelState,
}

impl Model for Post {
    const ATTRIBUTES: &'static [&'static str] = &["id", "user_id", "title"];

    fn state(&self) -> &ModelState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModelState {
        &mut self.state
    }

    fn rules() -> Vec<Rule<Self>> {
        vec![Rule::required("user_id, title")]
    }
}

impl ActiveRecord for Post {
    const TABLE: &'static str = "posts";
}

/// Storage double that records calls and answers with fixed outcomes.
#[derive(Default)]
pub struct ScriptedStorage {
    pub fail_with_error: bool,
    pub writes_nothing: bool,
    pub next_id: i64,
    pub inserts: RefCell<Vec<AttributeMap>>,
    pub updates: RefCell<Vec<(AttributeMap, AttributeMap)>>,
}

impl ScriptedStorage {
    pub fn failing() -> Self {
        Self {
            fail_with_error: true,
            ..Self::default()
        }
    }

    pub fn rejecting() -> Self {
        Self {
            writes_nothing: true,
            ..Self::default()
        }
    }

    fn outcome(&self) -> StorageResult<bool> {
        if self.fail_with_error {
            return Err(StorageError::InvalidData("backend offline".to_string()));
        }
        Ok(!self.writes_nothing)
    }
}

impl Storage for ScriptedStorage {
    fn insert(&self, _table: &str, attributes: &AttributeMap) -> StorageResult<bool> {
        self.inserts.borrow_mut().push(attributes.clone());
        self.outcome()
    }

    fn update(
        &self,
        _table: &str,
        attributes: &AttributeMap,
        snapshot: &AttributeMap,
    ) -> StorageResult<bool> {
        self.updates
            .borrow_mut()
            .push((attributes.clone(), snapshot.clone()));
        self.outcome()
    }

    fn select(&self, _table: &str, _criteria: &Criteria) -> StorageResult<Vec<AttributeMap>> {
        Ok(Vec::new())
    }

    fn last_insert_id(&self) -> StorageResult<AttributeValue> {
        Ok(AttributeValue::Integer(self.next_id))
    }
}
