//! Field selection and text rendering for token costing.

use std::collections::BTreeMap;

use explore_core::config::FieldSelection;
use serde_json::{Map, Value};

/// Apply include, exclude, conditional and rename rules to a record.
///
/// A field listed as conditional is emitted only when its `when` filter holds,
/// whether or not `include` names it.
pub fn select_fields(
    fields: &Map<String, Value>,
    selection: Option<&FieldSelection>,
    context: &BTreeMap<String, Value>,
) -> Map<String, Value> {
    let Some(selection) = selection else {
        return fields.clone();
    };

    let is_conditional = |name: &str| selection.conditional.iter().any(|c| c.field == name);
    let mut selected = Map::new();
    for (name, value) in fields {
        let included = selection.include.is_empty() || selection.include.contains(name);
        if included && !selection.exclude.contains(name) && !is_conditional(name) {
            selected.insert(name.clone(), value.clone());
        }
    }
    for conditional in &selection.conditional {
        if selection.exclude.contains(&conditional.field) {
            continue;
        }
        if let Some(value) = fields.get(&conditional.field) {
            if conditional.when.matches(fields, context) {
                selected.insert(conditional.field.clone(), value.clone());
            }
        }
    }

    if selection.rename.is_empty() {
        return selected;
    }
    selected
        .into_iter()
        .map(|(name, value)| match selection.rename.get(&name) {
            Some(renamed) => (renamed.clone(), value),
            None => (name, value),
        })
        .collect()
}

/// `name: value` lines in key order; strings are written bare.
pub fn render_text(fields: &Map<String, Value>) -> String {
    let mut ordered: Vec<(&String, &Value)> = fields.iter().collect();
    ordered.sort_by(|a, b| a.0.cmp(b.0));
    ordered
        .into_iter()
        .map(|(name, value)| match value {
            Value::String(s) => format!("{name}: {s}"),
            other => format!("{name}: {other}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
