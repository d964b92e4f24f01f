//! Purpose: JSON serializers for manifest summaries and dataset references.
//! Exports: `summary_json`, `source_json`, `shape_json`.
//! Role: Keep CLI output envelopes consistent across commands.
//! Invariants: Stable key names; unset slots and baselines are emitted as `null`.

use serde_json::{Map, Value, json};
use tpd::api::{ManifestSummary, Shape, SourceRef, SplitSummary};

pub(crate) fn shape_json(shape: &Shape) -> Value {
    json!(shape.dims())
}

pub(crate) fn source_json(source: &SourceRef) -> Value {
    json!({
        "path": source.path.display().to_string(),
        "key": source.key,
    })
}

pub(crate) fn summary_json(summary: &ManifestSummary) -> Value {
    let mut splits = Map::new();
    for split in &summary.splits {
        splits.insert(split.split.as_str().to_string(), split_json(split));
    }
    json!({
        "manifest": summary.path.display().to_string(),
        "splits": Value::Object(splits),
    })
}

fn split_json(split: &SplitSummary) -> Value {
    let mut map = Map::new();
    map.insert(
        "baseline".to_string(),
        split.baseline.as_ref().map(shape_json).unwrap_or(Value::Null),
    );
    for (slot, source) in &split.slots {
        map.insert(
            slot.as_str().to_string(),
            source.as_ref().map(source_json).unwrap_or(Value::Null),
        );
    }
    map.insert(
        "features".to_string(),
        Value::Array(split.features.iter().map(source_json).collect()),
    );
    Value::Object(map)
}
