//! Rule evaluation against one model instance.
//!
//! # Responsibility
//! - Evaluate one rule over each of its target attributes.
//! - Collect failures in a transient buffer owned by the session.
//!
//! # Invariants
//! - The buffer is cleared at the start of every `validate` call.
//! - Built-in checks never write to the model's error log; only custom
//!   validators do, through the model's own `add_error`.
//! - Every target attribute is evaluated even after an earlier failure.

use crate::model::errors::{ErrorKind, ErrorLog, ValidationError};
use crate::model::Model;
use crate::validation::patterns::{is_non_blank, is_valid_email, is_valid_url, matches_pattern};
use crate::validation::rule::{Rule, RuleKind, RuleParams};
use log::{debug, warn};

pub const REQUIRED_MESSAGE: &str = "Field %s is required!";
pub const INVALID_MESSAGE: &str = "Field %s is invalid!";
pub const EMAIL_MESSAGE: &str = "Field %s is not a valid email address!";
pub const URL_MESSAGE: &str = "Field %s is not a valid url!";

/// Short-lived validator holding the failures of the last evaluated rule.
#[derive(Debug, Default)]
pub struct ValidationSession {
    errors: ErrorLog,
}

impl ValidationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates `rule` in a fresh session and returns it.
    pub fn run<M: Model>(model: &mut M, rule: &Rule<M>) -> Self {
        let mut session = Self::new();
        session.validate(model, rule);
        session
    }

    /// Clears the buffer, then evaluates `rule` for each target attribute.
    pub fn validate<M: Model>(&mut self, model: &mut M, rule: &Rule<M>) -> &mut Self {
        self.errors.clear();

        let attributes = rule.attribute_names();
        for attribute in &attributes {
            self.check_attribute(model, attribute, rule);
        }

        debug!(
            "event=rule_eval module=validation rule={} attributes={} failures={}",
            rule.kind().tag(),
            attributes.len(),
            self.errors.len()
        );
        self
    }

    pub fn errors(&self) -> &[ValidationError] {
        self.errors.errors()
    }

    pub fn has_errors(&self) -> bool {
        self.errors.has_errors()
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors.into_errors()
    }

    fn check_attribute<M: Model>(&mut self, model: &mut M, attribute: &str, rule: &Rule<M>) {
        let params = rule.params();
        match rule.kind() {
            RuleKind::Required => {
                if !is_non_blank(&model.attribute(attribute).to_text()) {
                    self.fail(attribute, params, REQUIRED_MESSAGE, ErrorKind::Required);
                }
            }
            RuleKind::Match => {
                let value = model.attribute(attribute);
                if params.allow_empty && value.is_empty() {
                    return;
                }
                let matched = match params.pattern.as_deref() {
                    Some(pattern) => matches_pattern(&value.to_text(), pattern),
                    None => {
                        warn!(
                            "event=rule_eval module=validation status=error rule=match error_code=missing_pattern"
                        );
                        false
                    }
                };
                if !matched {
                    self.fail(attribute, params, INVALID_MESSAGE, ErrorKind::Pattern);
                }
            }
            RuleKind::Email => {
                let value = model.attribute(attribute);
                if params.allow_empty && value.is_empty() {
                    return;
                }
                if !is_valid_email(&value.to_text()) {
                    self.fail(attribute, params, EMAIL_MESSAGE, ErrorKind::Format);
                }
            }
            RuleKind::Url => {
                let value = model.attribute(attribute);
                if params.allow_empty && value.is_empty() {
                    return;
                }
                if !is_valid_url(&value.to_text()) {
                    self.fail(attribute, params, URL_MESSAGE, ErrorKind::Format);
                }
            }
            RuleKind::Custom { check, .. } => {
                let recorded_before = model.errors().len();
                let accepted = check(&mut *model, attribute, params);
                if !accepted && model.errors().len() == recorded_before {
                    self.fail(attribute, params, INVALID_MESSAGE, ErrorKind::Custom);
                }
            }
        }
    }

    fn fail(
        &mut self,
        attribute: &str,
        params: &RuleParams,
        default_message: &str,
        kind: ErrorKind,
    ) {
        let message = params.message.as_deref().unwrap_or(default_message);
        self.errors.add_error(attribute, message, kind);
    }
}

#[cfg(test)]
mod tests {
    use super::{ValidationSession, REQUIRED_MESSAGE};
    use crate::model::errors::ErrorKind;
    use crate::model::{Model, ModelState};
    use crate::validation::rule::{Rule, RuleParams};

    #[derive(Default)]
    struct Sample {
        state: ModelState,
    }

    impl Model for Sample {
        const ATTRIBUTES: &'static [&'static str] = &["name", "code", "site"];

        fn state(&self) -> &ModelState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut ModelState {
            &mut self.state
        }

        fn rules() -> Vec<Rule<Self>> {
            Vec::new()
        }
    }

    fn reject_silently(_sample: &mut Sample, _attribute: &str, _params: &RuleParams) -> bool {
        false
    }

    fn reject_with_own_error(sample: &mut Sample, attribute: &str, _params: &RuleParams) -> bool {
        sample.add_error(attribute, "Field %s is taken!");
        false
    }

    #[test]
    fn required_fails_for_blank_and_null_values() {
        let mut sample = Sample::default();
        sample.set_attribute("name", "   ");

        let session = ValidationSession::run(&mut sample, &Rule::required("name, code"));
        let errors = session.errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].attribute, "name");
        assert_eq!(errors[0].message, REQUIRED_MESSAGE);
        assert_eq!(errors[1].attribute, "code");
        assert_eq!(errors[1].kind, ErrorKind::Required);
    }

    #[test]
    fn buffer_is_cleared_between_rules() {
        let mut sample = Sample::default();
        let mut session = ValidationSession::new();

        session.validate(&mut sample, &Rule::required("name"));
        assert!(session.has_errors());

        sample.set_attribute("name", "ok");
        session.validate(&mut sample, &Rule::required("name"));
        assert!(!session.has_errors());
    }

    #[test]
    fn explicit_message_overrides_default() {
        let mut sample = Sample::default();
        let rule = Rule::matches("code", r"/^\d+$/").message("Code %s must be numeric");
        sample.set_attribute("code", "4a");

        let session = ValidationSession::run(&mut sample, &rule);
        assert_eq!(session.errors()[0].message, "Code %s must be numeric");
        assert_eq!(session.errors()[0].render(), "Code code must be numeric");
    }

    #[test]
    fn silent_custom_rejection_is_recorded_on_session() {
        let mut sample = Sample::default();
        let rule = Rule::custom("name", "reject_silently", reject_silently);

        let session = ValidationSession::run(&mut sample, &rule);
        assert_eq!(session.errors().len(), 1);
        assert_eq!(session.errors()[0].kind, ErrorKind::Custom);
        assert!(!sample.has_errors());
    }

    #[test]
    fn custom_errors_go_to_the_model_only() {
        let mut sample = Sample::default();
        let rule = Rule::custom("name", "reject_with_own_error", reject_with_own_error);

        let session = ValidationSession::run(&mut sample, &rule);
        assert!(!session.has_errors());
        assert_eq!(sample.errors().len(), 1);
        assert_eq!(sample.errors()[0].render(), "Field name is taken!");
    }

    #[test]
    fn url_rule_honors_allow_empty() {
        let mut sample = Sample::default();

        let strict = ValidationSession::run(&mut sample, &Rule::url("site"));
        assert_eq!(strict.errors()[0].kind, ErrorKind::Format);

        let lenient = ValidationSession::run(&mut sample, &Rule::url("site").allow_empty());
        assert!(!lenient.has_errors());
    }
}
