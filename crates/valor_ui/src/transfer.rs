//! Prop merging used by `transfer_props_to` and [`clone_with_props`].
//!
//! Explicit props on the target element win. `className` values are joined
//! with a space and `style` maps are merged. `children`, `key` and `ref` are
//! never transferred.

use log::warn;

use crate::element::Element;
use crate::value::{Value, ValueMap};

const NEVER_TRANSFERRED: &[&str] = &["children", "key", "ref"];

/// Merge `incoming` under `explicit`.
pub fn merge_props(explicit: &ValueMap, incoming: &ValueMap) -> ValueMap {
    let mut merged = explicit.clone();
    for (name, value) in incoming {
        if NEVER_TRANSFERRED.contains(&name.as_str()) {
            continue;
        }
        let combined = match (name.as_str(), merged.get(name)) {
            (_, None) => value.clone(),
            ("className", Some(existing)) => join_classes(existing, value),
            ("style", Some(Value::Map(existing))) => match value {
                Value::Map(transferred) => {
                    let mut style = transferred.clone();
                    for (key, explicit_value) in existing {
                        style.insert(key.clone(), explicit_value.clone());
                    }
                    Value::Map(style)
                }
                _ => Value::Map(existing.clone()),
            },
            (_, Some(existing)) => existing.clone(),
        };
        merged.insert(name.clone(), combined);
    }
    merged
}

fn join_classes(first: &Value, second: &Value) -> Value {
    match (first.to_text(), second.to_text()) {
        (Some(first), Some(second)) if !first.is_empty() && !second.is_empty() => {
            Value::Text(format!("{first} {second}"))
        }
        (Some(first), _) if !first.is_empty() => Value::Text(first),
        (_, Some(second)) => Value::Text(second),
        (Some(first), None) => Value::Text(first),
        (None, None) => Value::Null,
    }
}

/// `element` with `props` transferred onto it. The result keeps the
/// element's key, ref and owner stamp.
pub(crate) fn transfer_props(props: &ValueMap, element: &Element) -> Element {
    element.rebuild(
        merge_props(element.props(), props),
        element.key().map(str::to_owned),
        element.ref_name().map(str::to_owned),
    )
}

/// A copy of `element` with `props` merged in.
///
/// A `key` entry in `props` becomes the copy's key. The copy is a new,
/// unclaimed element: whoever renders it owns it. A ref on the source is kept
/// but will attach to that new owner, so a warning is logged.
pub fn clone_with_props(element: &Element, props: &ValueMap) -> Element {
    if let Some(ref_name) = element.ref_name() {
        warn!(
            target: "valor_ui::reconcile",
            "cloning {} which has ref \"{ref_name}\"; the clone's ref attaches to whoever renders it",
            element.display_name()
        );
    }
    let key = props
        .get("key")
        .and_then(Value::to_text)
        .or_else(|| element.key().map(str::to_owned));
    element.clone_unclaimed(
        merge_props(element.props(), props),
        key,
        element.ref_name().map(str::to_owned),
    )
}
