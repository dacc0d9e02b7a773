//! SQLite implementation of the storage contract.
//!
//! # Responsibility
//! - Translate attribute payloads and criteria into parameterized SQL.
//! - Map result rows back into attribute maps.
//!
//! # Invariants
//! - Identifiers are always quoted; values are always bound, never inlined.
//!   Raw predicates and `ORDER BY`/`GROUP BY` terms are caller-written SQL.
//! - `update` only sets columns that differ from the snapshot and only
//!   targets the row matching every non-null snapshot column.

use crate::model::attributes::changed_against;
use crate::model::criteria::{Column, Criteria, JoinKind, WhereClause};
use crate::model::value::{AttributeMap, AttributeValue};
use crate::repo::storage::{Storage, StorageError, StorageResult};
use log::{debug, error, info};
use rusqlite::{params_from_iter, Connection};
use std::time::Instant;

/// SQLite-backed storage over a borrowed connection.
pub struct SqliteStorage<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStorage<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Renders the select for `criteria` as SQL text plus bound values.
    pub fn select_sql(table: &str, criteria: &Criteria) -> (String, Vec<AttributeValue>) {
        let mut bind_values = Vec::new();
        let sql = render_select(table, criteria, &mut bind_values);
        (sql, bind_values)
    }
}

/// Renders the select for `criteria`, pushing its values onto `bind_values`
/// in placeholder order.
fn render_select(
    table: &str,
    criteria: &Criteria,
    bind_values: &mut Vec<AttributeValue>,
) -> String {
    let columns = if criteria.columns.is_empty() {
        format!("{}.*", quote_ident(table))
    } else {
        criteria
            .columns
            .iter()
            .map(|column| match column {
                Column::Name(name) => quote_ident(name),
                Column::Count { alias } => format!("COUNT(*) AS {}", quote_ident(alias)),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut sql = format!("SELECT {columns} FROM {}", quote_ident(table));

    for join in &criteria.joins {
        let keyword = match join.kind {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        };
        sql.push_str(&format!(" {keyword} {} ON {}", quote_ident(&join.table), join.on));
    }

    if !criteria.wheres.is_empty() {
        let mut conditions = Vec::with_capacity(criteria.wheres.len());
        for clause in &criteria.wheres {
            let condition = match clause {
                WhereClause::Equals { column, value } if value.is_null() => {
                    format!("{} IS NULL", quote_ident(column))
                }
                WhereClause::Equals { column, value } => {
                    bind_values.push(value.clone());
                    format!("{} = ?", quote_ident(column))
                }
                WhereClause::Raw { sql, params } => {
                    bind_values.extend(params.iter().cloned());
                    format!("({sql})")
                }
                WhereClause::In { column, select } => format!(
                    "{} IN ({})",
                    quote_ident(column),
                    render_select(&select.table, &select.criteria, bind_values)
                ),
            };
            conditions.push(condition);
        }
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    if !criteria.group.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&criteria.group.join(", "));
    }

    if !criteria.order.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&criteria.order.join(", "));
    }

    if let Some(limit) = criteria.limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(AttributeValue::Integer(i64::from(limit)));
        if let Some(offset) = criteria.offset {
            sql.push_str(" OFFSET ?");
            bind_values.push(AttributeValue::Integer(i64::from(offset)));
        }
    } else if let Some(offset) = criteria.offset {
        sql.push_str(" LIMIT -1 OFFSET ?");
        bind_values.push(AttributeValue::Integer(i64::from(offset)));
    }

    sql
}

impl Storage for SqliteStorage<'_> {
    fn insert(&self, table: &str, attributes: &AttributeMap) -> StorageResult<bool> {
        let started_at = Instant::now();
        let sql = if attributes.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES;", quote_ident(table))
        } else {
            let columns = attributes
                .keys()
                .map(|name| quote_ident(name))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = vec!["?"; attributes.len()].join(", ");
            format!(
                "INSERT INTO {} ({columns}) VALUES ({placeholders});",
                quote_ident(table)
            )
        };

        let changed = self
            .conn
            .execute(&sql, params_from_iter(attributes.values()))
            .map_err(|err| log_failure("storage_insert", table, started_at, err))?;

        info!(
            "event=storage_insert module=repo status=ok table={} rows={} duration_ms={}",
            table,
            changed,
            started_at.elapsed().as_millis()
        );
        Ok(changed > 0)
    }

    fn update(
        &self,
        table: &str,
        attributes: &AttributeMap,
        snapshot: &AttributeMap,
    ) -> StorageResult<bool> {
        let started_at = Instant::now();
        let delta = changed_against(attributes, snapshot);
        if delta.is_empty() {
            debug!(
                "event=storage_update module=repo status=ok table={} rows=0 reason=no_changes",
                table
            );
            return Ok(true);
        }

        let matching: Vec<(&String, &AttributeValue)> = snapshot
            .iter()
            .filter(|(_, value)| !value.is_null())
            .collect();
        if matching.is_empty() {
            return Err(StorageError::InvalidData(format!(
                "update of `{table}` requires a persisted snapshot"
            )));
        }

        let assignments = delta
            .keys()
            .map(|name| format!("{} = ?", quote_ident(name)))
            .collect::<Vec<_>>()
            .join(", ");
        let conditions = matching
            .iter()
            .map(|(name, _)| format!("{} = ?", quote_ident(name)))
            .collect::<Vec<_>>()
            .join(" AND ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE {conditions};",
            quote_ident(table)
        );

        let bind_values = delta
            .values()
            .chain(matching.iter().map(|(_, value)| *value));
        let changed = self
            .conn
            .execute(&sql, params_from_iter(bind_values))
            .map_err(|err| log_failure("storage_update", table, started_at, err))?;

        info!(
            "event=storage_update module=repo status=ok table={} columns={} rows={} duration_ms={}",
            table,
            delta.len(),
            changed,
            started_at.elapsed().as_millis()
        );
        Ok(changed > 0)
    }

    fn select(&self, table: &str, criteria: &Criteria) -> StorageResult<Vec<AttributeMap>> {
        let started_at = Instant::now();
        let (sql, bind_values) = Self::select_sql(table, criteria);

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|err| log_failure("storage_select", table, started_at, err))?;
        let column_names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = AttributeMap::new();
            for (index, name) in column_names.iter().enumerate() {
                let value = AttributeValue::try_from(row.get_ref(index)?).map_err(|message| {
                    StorageError::InvalidData(format!("{table}.{name}: {message}"))
                })?;
                record.insert(name.clone(), value);
            }
            records.push(record);
        }

        debug!(
            "event=storage_select module=repo status=ok table={} rows={} duration_ms={}",
            table,
            records.len(),
            started_at.elapsed().as_millis()
        );
        Ok(records)
    }

    fn last_insert_id(&self) -> StorageResult<AttributeValue> {
        Ok(AttributeValue::Integer(self.conn.last_insert_rowid()))
    }
}

fn log_failure(
    event: &str,
    table: &str,
    started_at: Instant,
    err: rusqlite::Error,
) -> StorageError {
    error!(
        "event={} module=repo status=error table={} duration_ms={} error={}",
        event,
        table,
        started_at.elapsed().as_millis(),
        err
    );
    err.into()
}

/// Quotes an identifier, keeping `table.column` qualification.
fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}
