//! Purpose: Hold top-level CLI command dispatch for `tpd`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Each command performs its registry operations and emits exactly one JSON document.
//! Invariants: Registry errors propagate unchanged so exit codes follow their kind.

use super::*;
use array_json::{array_from_json, array_json};
use summary_json::{shape_json, source_json, summary_json};
use tpd::api::Entry;

pub(super) fn dispatch_command(
    command: Command,
    options: ManifestOptions,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "tpd", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Init { manifest } => {
            let manifest = open_manifest(&manifest, &options)?;
            emit_json(json!({
                "manifest": manifest.path().display().to_string(),
                "path_mode": path_mode_label(&options),
            }));
            Ok(RunOutcome::ok())
        }
        Command::Set {
            manifest,
            split,
            slot,
            file,
            key,
        } => {
            let manifest = open_manifest(&manifest, &options)?;
            let key = resolve_key(manifest.store(), &manifest.resolver().absolute(&file), key)?;
            manifest.set_slot(split, slot, &file, &key)?;
            let source = manifest.slot(split, slot)?;
            let baseline = manifest.baseline(split)?;
            let mut value = source_json(&source);
            value["split"] = json!(split.as_str());
            value["slot"] = json!(slot.as_str());
            value["baseline"] = baseline.as_ref().map(shape_json).unwrap_or(Value::Null);
            emit_json(value);
            Ok(RunOutcome::ok())
        }
        Command::Get {
            manifest,
            split,
            slot,
            data,
        } => {
            let manifest = open_manifest(&manifest, &options)?;
            let source = manifest.slot(split, slot)?;
            let mut value = source_json(&source);
            value["split"] = json!(split.as_str());
            value["slot"] = json!(slot.as_str());
            if data {
                let array = manifest.slot_data(split, slot)?;
                value["shape"] = json!(array.shape());
                value["data"] = array_json(array.view());
            }
            emit_json(value);
            Ok(RunOutcome::ok())
        }
        Command::Feature { command } => dispatch_feature(command, &options),
        Command::Show { manifest } => {
            let manifest = open_manifest(&manifest, &options)?;
            emit_json(summary_json(&manifest.summary()?));
            Ok(RunOutcome::ok())
        }
        Command::Keys { file } => {
            let store = FileStore::new();
            let mut entries = Vec::new();
            for key in store.list_entries(&file)? {
                let shape = store.read_shape(&file, &key)?;
                entries.push(json!({ "key": key, "shape": shape_json(&shape) }));
            }
            emit_json(json!({
                "path": file.display().to_string(),
                "entries": entries,
            }));
            Ok(RunOutcome::ok())
        }
        Command::Put {
            file,
            key,
            json,
            from_file,
        } => {
            let text = match (json, from_file) {
                (Some(text), None) => text,
                (None, Some(path)) => std::fs::read_to_string(&path).map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to read JSON input")
                        .with_path(&path)
                        .with_source(err)
                })?,
                _ => {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("put requires inline JSON or --from-file")
                        .with_hint("Use `tpd put <file> <key> '[1,2,3]'` or `-f values.json`."));
                }
            };
            let parsed: Value = serde_json::from_str(&text).map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message("input is not valid JSON")
                    .with_source(err)
            })?;
            let array = array_from_json(&parsed)?;
            let shape = array.shape().to_vec();
            FileStore::new().write_entry(&file, &key, Entry::from_array(&array))?;
            emit_json(json!({
                "path": file.display().to_string(),
                "key": key,
                "shape": shape,
            }));
            Ok(RunOutcome::ok())
        }
    }
}

fn dispatch_feature(command: FeatureCommand, options: &ManifestOptions) -> Result<RunOutcome, Error> {
    match command {
        FeatureCommand::Add {
            manifest,
            split,
            file,
            key,
        } => {
            let manifest = open_manifest(&manifest, options)?;
            let key = resolve_key(manifest.store(), &manifest.resolver().absolute(&file), key)?;
            let added = manifest.add_feature(split, &file, &key)?;
            emit_json(json!({
                "split": split.as_str(),
                "path": file.display().to_string(),
                "key": key,
                "added": added,
                "count": manifest.feature_count(split)?,
            }));
            Ok(RunOutcome::ok())
        }
        FeatureCommand::List { manifest, split } => {
            let manifest = open_manifest(&manifest, options)?;
            let features = manifest
                .features(split)?
                .iter()
                .enumerate()
                .map(|(index, source)| {
                    let mut value = source_json(source);
                    value["index"] = json!(index);
                    value
                })
                .collect::<Vec<_>>();
            emit_json(json!({ "split": split.as_str(), "features": features }));
            Ok(RunOutcome::ok())
        }
        FeatureCommand::Clear { manifest, split } => {
            let manifest = open_manifest(&manifest, options)?;
            manifest.clear_features(split)?;
            emit_json(json!({ "split": split.as_str(), "cleared": true }));
            Ok(RunOutcome::ok())
        }
        FeatureCommand::Matrix {
            manifest,
            split,
            out,
            out_key,
            data,
        } => {
            let manifest = open_manifest(&manifest, options)?;
            if let Some(out) = out {
                let key = out_key.unwrap_or_else(|| format!("{split}_features"));
                let shape = manifest.write_feature_matrix(split, &out, &key)?;
                emit_json(json!({
                    "split": split.as_str(),
                    "path": out.display().to_string(),
                    "key": key,
                    "shape": shape_json(&shape),
                }));
                return Ok(RunOutcome::ok());
            }
            let matrix = manifest.feature_matrix(split)?;
            let mut value = json!({ "split": split.as_str(), "shape": matrix.shape() });
            if data {
                value["data"] = array_json(matrix.into_dyn().view());
            }
            emit_json(value);
            Ok(RunOutcome::ok())
        }
    }
}

fn path_mode_label(options: &ManifestOptions) -> &'static str {
    match options.path_mode() {
        tpd::api::PathMode::Relative => "relative",
        tpd::api::PathMode::Absolute => "absolute",
    }
}
