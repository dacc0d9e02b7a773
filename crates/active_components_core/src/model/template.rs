//! Empty-template instances of model types.
//!
//! # Responsibility
//! - Build fresh "empty" instances: every declared attribute `Null`,
//!   type defaults applied, caller options applied on top.
//! - Offer a mutex-guarded per-type shared instance for callers that rely on
//!   identity across calls.
//!
//! # Invariants
//! - Every `TemplateCache::model` call resets the shared instance, cached or
//!   not, before returning it.
//! - Access to a shared instance is serialized through its `Mutex`.

use crate::model::base::Model;
use crate::model::value::AttributeMap;
use log::debug;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Returns a fresh empty template of `M` with `options` applied.
pub fn template<M: Model + Default>(options: &AttributeMap) -> M {
    let mut model = M::default();
    model.reset_to_template(options);
    model
}

static GLOBAL_CACHE: Lazy<TemplateCache> = Lazy::new(TemplateCache::new);

/// Per-type shared template instances.
#[derive(Default)]
pub struct TemplateCache {
    entries: Mutex<HashMap<TypeId, Box<dyn Any + Send>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache.
    pub fn global() -> &'static TemplateCache {
        &GLOBAL_CACHE
    }

    /// Returns the shared instance of `M`, reset to its empty template with
    /// `options` applied.
    pub fn model<M>(&self, options: &AttributeMap) -> Arc<Mutex<M>>
    where
        M: Model + Default + Send + 'static,
    {
        let shared = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            let entry = entries
                .entry(TypeId::of::<M>())
                .or_insert_with(|| Box::new(Arc::new(Mutex::new(M::default()))));
            match entry.downcast_ref::<Arc<Mutex<M>>>() {
                Some(shared) => Arc::clone(shared),
                None => {
                    let shared = Arc::new(Mutex::new(M::default()));
                    *entry = Box::new(Arc::clone(&shared));
                    shared
                }
            }
        };

        shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset_to_template(options);
        debug!(
            "event=template_reset module=model status=ok model={} options={}",
            M::model_name(),
            options.len()
        );
        shared
    }

    /// Number of model types with a cached instance.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
