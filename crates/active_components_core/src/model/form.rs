//! Form-backed models.
//!
//! A form model validates like a record but hands the accepted values to
//! `on_submit` instead of a storage backend.

use crate::model::base::{Model, ModelResult};
use crate::model::value::AttributeMap;
use log::debug;

/// Request/form collaborator feeding submitted data into a form model.
pub trait FormSource {
    fn is_submitted(&self) -> bool;

    /// Submitted field values keyed by attribute name.
    fn data(&self) -> AttributeMap;
}

/// Model whose successful validation ends in a caller-defined action.
pub trait FormModel: Model {
    /// Runs after validation passed; returns whether the action succeeded.
    fn on_submit(&mut self) -> bool;

    /// Validates, then calls `on_submit` when validation passed.
    ///
    /// Without submitting, returns `!has_errors()`.
    fn submit(&mut self) -> bool {
        if self.validate(&[]) {
            return self.on_submit();
        }
        !self.has_errors()
    }

    /// Copies submitted data into the model.
    ///
    /// Returns `Ok(false)` and leaves the model untouched when `source` was
    /// not submitted.
    fn bind(&mut self, source: &dyn FormSource) -> ModelResult<bool> {
        if !source.is_submitted() {
            return Ok(false);
        }
        let data = source.data();
        debug!(
            "event=form_bind module=model status=ok model={} fields={}",
            Self::model_name(),
            data.len()
        );
        self.set_attributes(data, false)?;
        Ok(true)
    }

    /// Returns every attribute, `Null` entries included.
    fn array_copy(&self) -> AttributeMap {
        self.state().attributes.all().clone()
    }
}
