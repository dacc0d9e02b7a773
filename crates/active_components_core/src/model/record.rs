//! Active record lifecycle over a storage backend.
//!
//! # Responsibility
//! - Decide insert vs update and persist through a `Storage` backend.
//! - Derive query criteria from non-null attributes and run finders.
//!
//! # Invariants
//! - Persistence never runs for a model that failed validation in `save`.
//! - The snapshot is refreshed only after the backend reports success.
//! - A failed insert/update appends exactly one `Persistence` error keyed by
//!   the current primary-key value.

use crate::model::base::{Lifecycle, Model, ModelResult, Scenario};
use crate::model::criteria::{Criteria, SubSelect, COUNT_ALIAS};
use crate::model::errors::ErrorKind;
use crate::model::value::{AttributeMap, AttributeValue};
use crate::repo::storage::{Storage, StorageError};
use log::{error, info, warn};
use std::time::Instant;

/// Outcome of a finder call.
#[derive(Debug, Clone, PartialEq)]
pub enum Found {
    /// Exactly one row matched and was loaded into the record.
    Hydrated,
    /// Exactly one row matched while `as_array` is set.
    Row(AttributeMap),
    /// Zero or several rows matched.
    Rows(Vec<AttributeMap>),
}

/// Table-bound model with insert/update persistence and finders.
pub trait ActiveRecord: Model {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";

    fn primary_key_value(&self) -> &AttributeValue {
        self.attribute(Self::PRIMARY_KEY)
    }

    /// Forces the persistence branch used by the next `write`.
    fn set_scenario(&mut self, scenario: Scenario) {
        self.state_mut().scenario = Some(scenario);
    }

    /// Returns the explicit scenario, or infers it from the primary key.
    fn scenario(&self) -> Scenario {
        match self.state().scenario {
            Some(scenario) => scenario,
            None if self.primary_key_value().is_null() => Scenario::Insert,
            None => Scenario::Update,
        }
    }

    /// Infers the scenario from the persisted snapshot alone.
    fn scenario_by_snapshot(&self) -> Scenario {
        if self.state().attributes.snapshot_is_empty() {
            Scenario::Insert
        } else {
            Scenario::Update
        }
    }

    /// Makes single-row finders return the row instead of hydrating.
    fn set_as_array(&mut self, as_array: bool) {
        self.state_mut().as_array = as_array;
    }

    /// Validates, then writes when validation passed.
    ///
    /// Without persistence, returns `!has_errors()`: a `before_validate`
    /// veto that recorded nothing reads as success.
    fn save(&mut self, storage: &dyn Storage) -> bool {
        if self.validate(&[]) {
            return self.write(storage);
        }
        !self.has_errors()
    }

    /// Persists the record according to `scenario()`.
    fn write(&mut self, storage: &dyn Storage) -> bool {
        let scenario = self.scenario();
        self.state_mut().lifecycle = Lifecycle::Persisting;
        match scenario {
            Scenario::Insert => insert_record(self, storage),
            Scenario::Update => update_record(self, storage),
        }
    }

    /// Returns the criteria, deriving `where` clauses from non-null
    /// attributes when none are set.
    fn criteria(&mut self) -> &Criteria {
        if self.state().criteria.is_empty() {
            let derived = attribute_criteria(self);
            self.state_mut().criteria = derived;
        }
        &self.state().criteria
    }

    /// Merges into or replaces the current criteria.
    fn set_criteria(&mut self, criteria: Criteria, merge: bool) {
        if merge {
            let mut merged = self.criteria().clone();
            merged.merge(criteria);
            self.state_mut().criteria = merged;
        } else {
            self.state_mut().criteria = criteria;
        }
    }

    /// Returns the current criteria as a nested select over this table,
    /// for use in another record's `with_where_in`.
    fn sub_select(&mut self) -> SubSelect {
        SubSelect::new(Self::TABLE, self.criteria().clone())
    }

    /// Replaces the projection of the current criteria with a row count.
    fn set_count_criteria(&mut self) {
        let mut criteria = self.criteria().clone();
        criteria.count_only();
        self.set_criteria(criteria, false);
    }

    /// Counts rows matching the current criteria.
    fn count(&mut self, storage: &dyn Storage) -> ModelResult<i64> {
        self.set_count_criteria();
        let rows = run_select(storage, Self::TABLE, &self.state().criteria)?;
        let count = rows
            .last()
            .and_then(|row| row.get(COUNT_ALIAS))
            .and_then(AttributeValue::as_i64)
            .ok_or_else(|| {
                StorageError::InvalidData(format!("missing `{COUNT_ALIAS}` in count result"))
            })?;
        Ok(count)
    }

    fn find_all(&mut self, storage: &dyn Storage) -> ModelResult<Found> {
        let rows = run_select(storage, Self::TABLE, &Criteria::new())?;
        Ok(resolve_found(self, rows))
    }

    fn find_by_pk(
        &mut self,
        storage: &dyn Storage,
        value: impl Into<AttributeValue>,
    ) -> ModelResult<Found> {
        let criteria = Criteria::new().with_where(Self::PRIMARY_KEY, value);
        let rows = run_select(storage, Self::TABLE, &criteria)?;
        Ok(resolve_found(self, rows))
    }

    fn find_by_attributes(
        &mut self,
        storage: &dyn Storage,
        attributes: &AttributeMap,
    ) -> ModelResult<Found> {
        let criteria = attributes
            .iter()
            .fold(Criteria::new(), |criteria, (name, value)| {
                criteria.with_where(name.as_str(), value.clone())
            });
        let rows = run_select(storage, Self::TABLE, &criteria)?;
        Ok(resolve_found(self, rows))
    }

    fn find_by_criteria(&mut self, storage: &dyn Storage) -> ModelResult<Found> {
        let criteria = self.criteria().clone();
        let rows = run_select(storage, Self::TABLE, &criteria)?;
        Ok(resolve_found(self, rows))
    }
}

fn attribute_criteria<R: ActiveRecord>(record: &R) -> Criteria {
    R::ATTRIBUTES
        .iter()
        .filter(|name| !record.attribute(name).is_null())
        .fold(Criteria::new(), |criteria, name| {
            criteria.with_where(
                format!("{}.{}", R::TABLE, name),
                record.attribute(name).clone(),
            )
        })
}

fn run_select(
    storage: &dyn Storage,
    table: &str,
    criteria: &Criteria,
) -> Result<Vec<AttributeMap>, StorageError> {
    let started_at = Instant::now();
    match storage.select(table, criteria) {
        Ok(rows) => {
            info!(
                "event=record_find module=model status=ok table={} rows={} duration_ms={}",
                table,
                rows.len(),
                started_at.elapsed().as_millis()
            );
            Ok(rows)
        }
        Err(err) => {
            error!(
                "event=record_find module=model status=error table={} duration_ms={} error={}",
                table,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn resolve_found<R: ActiveRecord>(record: &mut R, mut rows: Vec<AttributeMap>) -> Found {
    if rows.len() != 1 {
        return Found::Rows(rows);
    }
    let row = rows.remove(0);
    if record.state().as_array {
        return Found::Row(row);
    }

    let state = record.state_mut();
    state.attributes.replace_from_storage(row);
    state.scenario = Some(Scenario::Update);
    Found::Hydrated
}

fn insert_record<R: ActiveRecord>(record: &mut R, storage: &dyn Storage) -> bool {
    let started_at = Instant::now();
    let payload = record.attributes();
    let key_was_null = record.primary_key_value().is_null();

    match storage.insert(R::TABLE, &payload) {
        Ok(true) => {
            if key_was_null {
                match storage.last_insert_id() {
                    Ok(id) if is_generated_id(&id) => {
                        record.state_mut().attributes.set(R::PRIMARY_KEY, id);
                    }
                    Ok(_) => {}
                    Err(err) => warn!(
                        "event=record_write module=model status=warn table={} error_code=last_insert_id_failed error={}",
                        R::TABLE,
                        err
                    ),
                }
            }

            let state = record.state_mut();
            state.attributes.refresh_snapshot();
            state.scenario = Some(Scenario::Update);
            state.lifecycle = Lifecycle::PersistedInsert;
            info!(
                "event=record_write module=model status=ok table={} scenario=insert columns={} duration_ms={}",
                R::TABLE,
                payload.len(),
                started_at.elapsed().as_millis()
            );
            !record.has_errors()
        }
        Ok(false) => record_failure(record, Scenario::Insert, None, started_at),
        Err(err) => record_failure(record, Scenario::Insert, Some(err), started_at),
    }
}

fn update_record<R: ActiveRecord>(record: &mut R, storage: &dyn Storage) -> bool {
    let started_at = Instant::now();
    let payload = record.attributes();
    let snapshot = record.state().attributes.snapshot().clone();

    match storage.update(R::TABLE, &payload, &snapshot) {
        Ok(true) => {
            let state = record.state_mut();
            state.attributes.refresh_snapshot();
            state.lifecycle = Lifecycle::PersistedUpdate;
            info!(
                "event=record_write module=model status=ok table={} scenario=update columns={} duration_ms={}",
                R::TABLE,
                payload.len(),
                started_at.elapsed().as_millis()
            );
            !record.has_errors()
        }
        Ok(false) => record_failure(record, Scenario::Update, None, started_at),
        Err(err) => record_failure(record, Scenario::Update, Some(err), started_at),
    }
}

fn record_failure<R: ActiveRecord>(
    record: &mut R,
    scenario: Scenario,
    cause: Option<StorageError>,
    started_at: Instant,
) -> bool {
    let action = match scenario {
        Scenario::Insert => "created",
        Scenario::Update => "updated",
    };
    let key = record.primary_key_value().to_text();

    let state = record.state_mut();
    state
        .errors
        .add_error(key, format!("Record not {action}!"), ErrorKind::Persistence);
    state.lifecycle = Lifecycle::Failed;

    match cause {
        Some(err) => error!(
            "event=record_write module=model status=error table={} scenario={} duration_ms={} error_code=storage_error error={}",
            R::TABLE,
            scenario.as_str(),
            started_at.elapsed().as_millis(),
            err
        ),
        None => error!(
            "event=record_write module=model status=error table={} scenario={} duration_ms={} error_code=no_rows_affected",
            R::TABLE,
            scenario.as_str(),
            started_at.elapsed().as_millis()
        ),
    }
    false
}

/// A generated key is a positive integer (or its decimal text).
fn is_generated_id(id: &AttributeValue) -> bool {
    match id {
        AttributeValue::Integer(value) => *value > 0,
        AttributeValue::Text(value) => {
            value.bytes().all(|b| b.is_ascii_digit()) && !value.trim_start_matches('0').is_empty()
        }
        _ => false,
    }
}
