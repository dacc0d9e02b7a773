//! Model contract shared by active records and form models.
//!
//! # Responsibility
//! - Bind declared attribute names, rules and defaults to a concrete type.
//! - Provide the attribute setter path, error log access and rule-driven
//!   validation on top of a per-instance `ModelState`.
//!
//! # Invariants
//! - The non-storage setter path accepts declared names only and rejects an
//!   explicit `Null` before applying anything.
//! - Validation merges each rule's session failures into the model log and
//!   evaluates every rule regardless of earlier failures.

use crate::model::attributes::AttributeStore;
use crate::model::criteria::Criteria;
use crate::model::errors::{ErrorKind, ErrorLog, ValidationError};
use crate::model::value::{AttributeMap, AttributeValue};
use crate::repo::storage::StorageError;
use crate::validation::rule::{CustomValidators, Rule, RuleParams};
use crate::validation::session::ValidationSession;
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type ModelResult<T> = Result<T, ModelError>;

/// Hard failures of model operations.
///
/// Rule failures are not errors; they are collected in the model's
/// `ErrorLog`.
#[derive(Debug)]
pub enum ModelError {
    /// An explicit `Null` was passed to the non-storage setter path.
    NullAttribute {
        model: &'static str,
        attribute: String,
    },
    /// A rule tag names no built-in check and no registered custom validator.
    UnknownValidator { name: String },
    Storage(StorageError),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NullAttribute { model, attribute } => {
                write!(f, "attribute `{attribute}` in model `{model}` is null")
            }
            Self::UnknownValidator { name } => write!(f, "unknown validator `{name}`"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::NullAttribute { .. } | Self::UnknownValidator { .. } => None,
        }
    }
}

impl From<StorageError> for ModelError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Persistence branch chosen by `write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Insert,
    Update,
}

impl Scenario {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
        }
    }
}

/// Where a model instance is in its validate/persist cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Fresh,
    Validating,
    Persisting,
    PersistedInsert,
    PersistedUpdate,
    Failed,
}

/// Per-instance state embedded in every model type.
#[derive(Debug, Clone, Default)]
pub struct ModelState {
    pub(crate) attributes: AttributeStore,
    pub(crate) errors: ErrorLog,
    pub(crate) criteria: Criteria,
    pub(crate) scenario: Option<Scenario>,
    pub(crate) as_array: bool,
    pub(crate) lifecycle: Lifecycle,
}

impl ModelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.errors
    }
}

/// Attribute, rule and validation contract of one model type.
///
/// Implementors embed a `ModelState` and declare their attribute names and
/// rules; everything else is provided.
pub trait Model: Sized {
    /// Declared attribute names.
    const ATTRIBUTES: &'static [&'static str];

    fn state(&self) -> &ModelState;

    fn state_mut(&mut self) -> &mut ModelState;

    /// Rules evaluated by `validate` when no override is given, in order.
    fn rules() -> Vec<Rule<Self>>;

    /// Values applied over the all-null template.
    fn defaults() -> AttributeMap {
        AttributeMap::new()
    }

    /// Custom validators addressable by name from `rule_from_tag`.
    fn custom_validators() -> CustomValidators<Self> {
        CustomValidators::new()
    }

    /// Pre-validation hook; returning `false` aborts validation.
    fn before_validate(&mut self, _rules: &[Rule<Self>]) -> bool {
        true
    }

    fn model_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    fn is_declared(name: &str) -> bool {
        Self::ATTRIBUTES.contains(&name)
    }

    /// Builds a rule from a string tag against this type's custom validators.
    fn rule_from_tag(attributes: &str, tag: &str, params: RuleParams) -> ModelResult<Rule<Self>> {
        Rule::from_tag(attributes, tag, params, &Self::custom_validators())
    }

    /// Declared rules that target any of `names`, narrowed to those names.
    ///
    /// Feeds `validate` when only part of a model should be checked.
    fn attribute_rules(names: &[&str]) -> Vec<Rule<Self>> {
        Self::rules()
            .iter()
            .filter_map(|rule| rule.restricted_to(names))
            .collect()
    }

    /// Returns one attribute value, `Null` when unset.
    fn attribute(&self, name: &str) -> &AttributeValue {
        self.state().attributes.get(name)
    }

    /// Sets one declared attribute; undeclared names are ignored.
    ///
    /// Returns whether the value was applied.
    fn set_attribute(&mut self, name: &str, value: impl Into<AttributeValue>) -> bool {
        if !Self::is_declared(name) {
            return false;
        }
        self.state_mut().attributes.set(name, value);
        true
    }

    /// Bulk attribute assignment.
    ///
    /// With `from_storage`, `data` replaces both the values and the snapshot
    /// as-is. Otherwise undeclared names are skipped and an explicit `Null`
    /// for a declared name fails with `ModelError::NullAttribute` before any
    /// value is applied.
    fn set_attributes(&mut self, data: AttributeMap, from_storage: bool) -> ModelResult<()> {
        if from_storage {
            self.state_mut().attributes.replace_from_storage(data);
            return Ok(());
        }

        let accepted: Vec<(String, AttributeValue)> = data
            .into_iter()
            .filter(|(name, _)| Self::is_declared(name))
            .collect();
        if let Some((name, _)) = accepted.iter().find(|(_, value)| value.is_null()) {
            return Err(ModelError::NullAttribute {
                model: Self::model_name(),
                attribute: name.clone(),
            });
        }

        let attributes = &mut self.state_mut().attributes;
        for (name, value) in accepted {
            attributes.set(name, value);
        }
        Ok(())
    }

    /// Returns the persistence payload (non-null attributes).
    fn attributes(&self) -> AttributeMap {
        self.state().attributes.non_null()
    }

    fn errors(&self) -> &[ValidationError] {
        self.state().errors.errors()
    }

    fn error_log(&self) -> &ErrorLog {
        &self.state().errors
    }

    /// Appends `errors` to the model log.
    fn set_errors(&mut self, errors: Vec<ValidationError>) {
        self.state_mut().errors.set_errors(errors);
    }

    /// Records one failure; intended for custom validators.
    fn add_error(&mut self, attribute: &str, message: &str) {
        self.state_mut()
            .errors
            .add_error(attribute, message, ErrorKind::Custom);
    }

    fn has_errors(&self) -> bool {
        self.state().errors.has_errors()
    }

    fn lifecycle(&self) -> Lifecycle {
        self.state().lifecycle
    }

    /// Runs `before_validate`, then every rule (the override when non-empty,
    /// `rules()` otherwise).
    ///
    /// Returns `true` iff the model log is empty afterwards.
    fn validate(&mut self, rules: &[Rule<Self>]) -> bool {
        let started_at = Instant::now();
        let previous = self.state().lifecycle;
        self.state_mut().lifecycle = Lifecycle::Validating;

        if !self.before_validate(rules) {
            self.state_mut().lifecycle = Lifecycle::Failed;
            debug!(
                "event=record_validate module=model status=rejected model={}",
                Self::model_name()
            );
            return false;
        }

        let declared;
        let rules = if rules.is_empty() {
            declared = Self::rules();
            declared.as_slice()
        } else {
            rules
        };

        for rule in rules {
            let session = ValidationSession::run(self, rule);
            if session.has_errors() {
                self.set_errors(session.into_errors());
            }
        }

        let valid = !self.has_errors();
        self.state_mut().lifecycle = if valid { previous } else { Lifecycle::Failed };
        debug!(
            "event=record_validate module=model status={} model={} rules={} errors={} duration_ms={}",
            if valid { "ok" } else { "invalid" },
            Self::model_name(),
            rules.len(),
            self.errors().len(),
            started_at.elapsed().as_millis()
        );
        valid
    }

    /// Resets this instance to the empty template.
    ///
    /// Clears errors, criteria, scenario and snapshot; sets every declared
    /// attribute to `Null`, applies `defaults()`, then applies declared
    /// entries of `options` directly.
    fn reset_to_template(&mut self, options: &AttributeMap) {
        let mut values: AttributeMap = Self::ATTRIBUTES
            .iter()
            .map(|name| ((*name).to_string(), AttributeValue::Null))
            .collect();
        values.extend(Self::defaults());
        for (name, value) in options {
            if Self::is_declared(name) {
                values.insert(name.clone(), value.clone().trimmed());
            }
        }

        let state = self.state_mut();
        state.attributes.reset(values);
        state.errors.clear();
        state.criteria = Criteria::new();
        state.scenario = None;
        state.as_array = false;
        state.lifecycle = Lifecycle::Fresh;
    }
}
