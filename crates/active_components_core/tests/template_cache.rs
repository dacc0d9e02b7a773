mod common;

use active_components_core::{
    attribute_map, template, ActiveRecord, AttributeMap, AttributeValue, Criteria, Lifecycle,
    Model, Scenario, TemplateCache,
};
use common::{Post, User};
use std::sync::Arc;
use std::thread;

#[test]
fn template_nulls_declared_attributes_and_applies_defaults() {
    let user = template::<User>(&AttributeMap::new());

    let all = user.state().attributes().all();
    assert_eq!(all.len(), User::ATTRIBUTES.len());
    assert!(all["name"].is_null());
    assert_eq!(all["status"], AttributeValue::from("active"));
    assert_eq!(user.attributes(), attribute_map([("status", "active")]));
    assert_eq!(user.lifecycle(), Lifecycle::Fresh);
}

#[test]
fn template_options_override_defaults_and_skip_unknown_names() {
    let options = attribute_map([("status", " banned "), ("nickname", "al")]);
    let user = template::<User>(&options);

    assert_eq!(user.attribute("status"), &AttributeValue::from("banned"));
    assert!(!user.state().attributes().all().contains_key("nickname"));
}

#[test]
fn cached_template_keeps_identity_and_resets_on_every_call() {
    let cache = TemplateCache::new();
    let first = cache.model::<User>(&AttributeMap::new());
    {
        let mut user = first.lock().unwrap();
        user.set_attribute("name", "Al");
        user.add_error("name", "Field %s is taken!");
        user.set_scenario(Scenario::Update);
        user.set_criteria(Criteria::new().with_limit(3), false);
    }

    let second = cache.model::<User>(&attribute_map([("name", "Bo")]));
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);

    let mut user = second.lock().unwrap();
    assert_eq!(user.attribute("name"), &AttributeValue::from("Bo"));
    assert_eq!(user.attribute("status"), &AttributeValue::from("active"));
    assert!(!user.has_errors());
    assert_eq!(user.scenario(), Scenario::Insert);
    assert_eq!(user.criteria().limit, None);
}

#[test]
fn cache_holds_one_instance_per_type() {
    let cache = TemplateCache::new();
    assert!(cache.is_empty());

    let _user = cache.model::<User>(&AttributeMap::new());
    let _post = cache.model::<Post>(&AttributeMap::new());
    let _again = cache.model::<User>(&AttributeMap::new());
    assert_eq!(cache.len(), 2);
}

#[test]
fn global_cache_is_shared_across_threads() {
    let handles: Vec<_> = (0..4)
        .map(|_| thread::spawn(|| TemplateCache::global().model::<Post>(&AttributeMap::new())))
        .collect();
    let instances: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert!(instances
        .windows(2)
        .all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}
