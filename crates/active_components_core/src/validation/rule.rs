//! Declarative validation rules.
//!
//! # Responsibility
//! - Describe which attributes a rule targets, which check runs, and with
//!   which parameters.
//! - Resolve custom rule names to functions once, when rules are built.
//!
//! # Invariants
//! - Custom rule names are resolved against the model type's registry; an
//!   unknown name is an error at build time, never a silent no-op.

use crate::model::value::AttributeValue;
use crate::model::ModelError;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};

pub const TAG_MATCH: &str = "match";
pub const TAG_REQUIRED: &str = "required";
pub const TAG_EMAIL: &str = "email";
pub const TAG_URL: &str = "url";

/// Custom check implemented by a model type.
///
/// Receives the model, the attribute name and the rule parameters. Returning
/// `false` is an explicit rejection; returning `true` defers the verdict to
/// whether the model's own error log is empty afterwards.
pub type CustomValidator<M> = fn(&mut M, &str, &RuleParams) -> bool;

/// Rule parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleParams {
    /// Pattern for `match` rules; `/body/flags` or a bare expression.
    pub pattern: Option<String>,
    /// Message template overriding the rule's default.
    pub message: Option<String>,
    /// Empty values pass `match`, `email` and `url` rules.
    pub allow_empty: bool,
    /// Free-form parameters for custom validators.
    pub extra: BTreeMap<String, AttributeValue>,
}

impl RuleParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.extra.get(name)
    }
}

/// Check performed by a rule.
pub enum RuleKind<M> {
    Match,
    Required,
    Email,
    Url,
    Custom {
        name: String,
        check: CustomValidator<M>,
    },
}

impl<M> RuleKind<M> {
    pub fn tag(&self) -> &str {
        match self {
            Self::Match => TAG_MATCH,
            Self::Required => TAG_REQUIRED,
            Self::Email => TAG_EMAIL,
            Self::Url => TAG_URL,
            Self::Custom { name, .. } => name.as_str(),
        }
    }
}

impl<M> Clone for RuleKind<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Match => Self::Match,
            Self::Required => Self::Required,
            Self::Email => Self::Email,
            Self::Url => Self::Url,
            Self::Custom { name, check } => Self::Custom {
                name: name.clone(),
                check: *check,
            },
        }
    }
}

impl<M> Debug for RuleKind<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RuleKind({})", self.tag())
    }
}

/// Custom validators of one model type, keyed by rule name.
pub struct CustomValidators<M> {
    entries: BTreeMap<String, CustomValidator<M>>,
}

impl<M> CustomValidators<M> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, check: CustomValidator<M>) -> Self {
        self.entries.insert(name.into(), check);
        self
    }

    pub fn get(&self, name: &str) -> Option<CustomValidator<M>> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<M> Default for CustomValidators<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// One validation rule: targets, check and parameters.
pub struct Rule<M> {
    attributes: String,
    kind: RuleKind<M>,
    params: RuleParams,
}

impl<M> Rule<M> {
    /// Creates a rule over a comma-separated attribute list.
    pub fn new(attributes: impl Into<String>, kind: RuleKind<M>, params: RuleParams) -> Self {
        Self {
            attributes: attributes.into(),
            kind,
            params,
        }
    }

    pub fn required(attributes: impl Into<String>) -> Self {
        Self::new(attributes, RuleKind::Required, RuleParams::new())
    }

    pub fn matches(attributes: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(attributes, RuleKind::Match, RuleParams::new().pattern(pattern))
    }

    pub fn email(attributes: impl Into<String>) -> Self {
        Self::new(attributes, RuleKind::Email, RuleParams::new())
    }

    pub fn url(attributes: impl Into<String>) -> Self {
        Self::new(attributes, RuleKind::Url, RuleParams::new())
    }

    pub fn custom(
        attributes: impl Into<String>,
        name: impl Into<String>,
        check: CustomValidator<M>,
    ) -> Self {
        Self::new(
            attributes,
            RuleKind::Custom {
                name: name.into(),
                check,
            },
            RuleParams::new(),
        )
    }

    /// Builds a rule from a string tag, resolving custom names in `validators`.
    pub fn from_tag(
        attributes: impl Into<String>,
        tag: &str,
        params: RuleParams,
        validators: &CustomValidators<M>,
    ) -> Result<Self, ModelError> {
        let kind = match tag.trim() {
            TAG_MATCH => RuleKind::Match,
            TAG_REQUIRED => RuleKind::Required,
            TAG_EMAIL => RuleKind::Email,
            TAG_URL => RuleKind::Url,
            name => {
                let check = validators.get(name).ok_or_else(|| ModelError::UnknownValidator {
                    name: name.to_string(),
                })?;
                RuleKind::Custom {
                    name: name.to_string(),
                    check,
                }
            }
        };
        Ok(Self::new(attributes, kind, params))
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.params.message = Some(message.into());
        self
    }

    pub fn allow_empty(mut self) -> Self {
        self.params.allow_empty = true;
        self
    }

    pub fn with_params(mut self, params: RuleParams) -> Self {
        self.params = params;
        self
    }

    /// Returns target attribute names with whitespace removed.
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes
            .split(',')
            .map(|name| name.chars().filter(|c| !c.is_whitespace()).collect::<String>())
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// Returns a copy narrowed to the targets listed in `names`, or `None`
    /// when the rule targets none of them.
    pub fn restricted_to(&self, names: &[&str]) -> Option<Self> {
        let targets: Vec<String> = self
            .attribute_names()
            .into_iter()
            .filter(|target| names.contains(&target.as_str()))
            .collect();
        if targets.is_empty() {
            return None;
        }
        Some(Self {
            attributes: targets.join(","),
            kind: self.kind.clone(),
            params: self.params.clone(),
        })
    }

    pub fn kind(&self) -> &RuleKind<M> {
        &self.kind
    }

    pub fn params(&self) -> &RuleParams {
        &self.params
    }
}

impl<M> Clone for Rule<M> {
    fn clone(&self) -> Self {
        Self {
            attributes: self.attributes.clone(),
            kind: self.kind.clone(),
            params: self.params.clone(),
        }
    }
}

impl<M> Debug for Rule<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("attributes", &self.attributes)
            .field("kind", &self.kind)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{CustomValidators, Rule, RuleKind, RuleParams};
    use crate::model::ModelError;

    struct Sample;

    fn always_ok(_sample: &mut Sample, _attribute: &str, _params: &RuleParams) -> bool {
        true
    }

    #[test]
    fn attribute_list_is_split_and_stripped() {
        let rule = Rule::<Sample>::required(" name ,email,, last name");
        assert_eq!(rule.attribute_names(), vec!["name", "email", "lastname"]);
    }

    #[test]
    fn restricted_to_keeps_only_listed_targets() {
        let rule = Rule::<Sample>::matches("name, email, site", "/x/").allow_empty();

        let narrowed = rule.restricted_to(&["site", "name", "age"]).unwrap();
        assert_eq!(narrowed.attribute_names(), vec!["name", "site"]);
        assert_eq!(narrowed.params(), rule.params());
        assert!(rule.restricted_to(&["age"]).is_none());
    }

    #[test]
    fn from_tag_resolves_builtin_and_custom_kinds() {
        let validators = CustomValidators::<Sample>::new().with("always_ok", always_ok);

        let builtin = Rule::from_tag("email", "email", RuleParams::new(), &validators).unwrap();
        assert!(matches!(builtin.kind(), RuleKind::Email));

        let custom = Rule::from_tag("age", "always_ok", RuleParams::new(), &validators).unwrap();
        assert_eq!(custom.kind().tag(), "always_ok");
    }

    #[test]
    fn from_tag_rejects_unknown_custom_name() {
        let validators = CustomValidators::<Sample>::new();
        let err = Rule::from_tag("age", "adult", RuleParams::new(), &validators).unwrap_err();
        assert!(matches!(err, ModelError::UnknownValidator { name } if name == "adult"));
    }
}
