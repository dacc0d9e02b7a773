//! Query criteria carried by active records.
//!
//! # Responsibility
//! - Describe filter/projection clauses independently of SQL dialect.
//! - Support merge (append) and replace semantics.
//! - Nest one table's criteria inside another's as a sub-select.
//!
//! # Invariants
//! - Merging appends clause lists in order; scalar clauses are overridden
//!   only when the incoming criteria sets them.

use crate::model::value::AttributeValue;

/// Alias used for row counts produced by `Column::Count`.
pub const COUNT_ALIAS: &str = "count_records";

/// One `WHERE` predicate; predicates are joined with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereClause {
    /// `column = value`, or `column IS NULL` when `value` is `Null`.
    ///
    /// `column` may be table-qualified (`users.name`).
    Equals {
        column: String,
        value: AttributeValue,
    },
    /// Predicate text with `?` placeholders bound to `params` in order.
    Raw {
        sql: String,
        params: Vec<AttributeValue>,
    },
    /// `column IN (SELECT ...)`.
    In {
        column: String,
        select: Box<SubSelect>,
    },
}

impl WhereClause {
    /// Filtered column, when the predicate names one.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Equals { column, .. } | Self::In { column, .. } => Some(column.as_str()),
            Self::Raw { .. } => None,
        }
    }
}

/// Select over `table` nested inside another query.
#[derive(Debug, Clone, PartialEq)]
pub struct SubSelect {
    pub table: String,
    pub criteria: Criteria,
}

impl SubSelect {
    pub fn new(table: impl Into<String>, criteria: Criteria) -> Self {
        Self {
            table: table.into(),
            criteria,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// Join against another table with a raw `ON` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    pub table: String,
    pub on: String,
    pub kind: JoinKind,
}

/// Selected column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Name(String),
    Count { alias: String },
}

/// Filter, join and projection clauses for one select.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub wheres: Vec<WhereClause>,
    pub joins: Vec<JoinClause>,
    pub columns: Vec<Column>,
    pub group: Vec<String>,
    pub order: Vec<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.wheres.is_empty()
            && self.joins.is_empty()
            && self.columns.is_empty()
            && self.group.is_empty()
            && self.order.is_empty()
            && self.limit.is_none()
            && self.offset.is_none()
    }

    pub fn with_where(
        mut self,
        column: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.wheres.push(WhereClause::Equals {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a raw predicate such as `users.id > ?`.
    pub fn with_where_raw<I, V>(mut self, sql: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        self.wheres.push(WhereClause::Raw {
            sql: sql.into(),
            params: params.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Adds `column IN (SELECT ...)`.
    pub fn with_where_in(mut self, column: impl Into<String>, select: SubSelect) -> Self {
        self.wheres.push(WhereClause::In {
            column: column.into(),
            select: Box::new(select),
        });
        self
    }

    pub fn with_join(
        mut self,
        table: impl Into<String>,
        on: impl Into<String>,
        kind: JoinKind,
    ) -> Self {
        self.joins.push(JoinClause {
            table: table.into(),
            on: on.into(),
            kind,
        });
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(Column::Name(column.into()));
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group.push(group.into());
        self
    }

    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order.push(order.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Appends `other`'s clauses to this criteria.
    pub fn merge(&mut self, other: Criteria) {
        self.wheres.extend(other.wheres);
        self.joins.extend(other.joins);
        self.columns.extend(other.columns);
        self.group.extend(other.group);
        self.order.extend(other.order);
        if other.limit.is_some() {
            self.limit = other.limit;
        }
        if other.offset.is_some() {
            self.offset = other.offset;
        }
    }

    /// Replaces the projection with a single `COUNT(*)` column.
    pub fn count_only(&mut self) {
        self.columns = vec![Column::Count {
            alias: COUNT_ALIAS.to_string(),
        }];
    }
}

#[cfg(test)]
mod tests {
    use super::{Column, Criteria, JoinKind, SubSelect, WhereClause, COUNT_ALIAS};
    use crate::model::value::AttributeValue;

    #[test]
    fn default_criteria_is_empty() {
        assert!(Criteria::new().is_empty());
        assert!(!Criteria::new().with_limit(1).is_empty());
    }

    #[test]
    fn merge_appends_lists_and_overrides_scalars() {
        let mut base = Criteria::new()
            .with_where("users.name", "Al")
            .with_limit(10);
        base.merge(
            Criteria::new()
                .with_where("users.email", "a@b.com")
                .with_join("posts", "posts.user_id = users.id", JoinKind::Left)
                .with_offset(5),
        );

        assert_eq!(base.wheres.len(), 2);
        assert_eq!(base.wheres[1].column(), Some("users.email"));
        assert_eq!(base.joins.len(), 1);
        assert_eq!(base.limit, Some(10));
        assert_eq!(base.offset, Some(5));
    }

    #[test]
    fn raw_and_nested_predicates_keep_their_params() {
        let criteria = Criteria::new()
            .with_where_raw("users.id > ?", [1])
            .with_where_in(
                "users.id",
                SubSelect::new("posts", Criteria::new().with_column("user_id")),
            )
            .with_group("users.status");

        assert_eq!(
            criteria.wheres[0],
            WhereClause::Raw {
                sql: "users.id > ?".to_string(),
                params: vec![AttributeValue::Integer(1)],
            }
        );
        assert_eq!(criteria.wheres[0].column(), None);
        assert_eq!(criteria.wheres[1].column(), Some("users.id"));
        assert_eq!(criteria.group, vec!["users.status"]);
        assert!(!Criteria::new().with_group("status").is_empty());
    }

    #[test]
    fn count_only_replaces_projection() {
        let mut criteria = Criteria::new().with_column("name").with_where("id", 1);
        criteria.count_only();
        assert_eq!(
            criteria.columns,
            vec![Column::Count {
                alias: COUNT_ALIAS.to_string()
            }]
        );
        assert_eq!(criteria.wheres.len(), 1);
    }
}
