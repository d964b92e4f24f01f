//! Purpose: `tpd` CLI entry point: build and inspect train/predict dataset manifests.
//! Role: Binary crate root; parses args, runs one registry operation, emits JSON on stdout.
//! Invariants: Commands emit one JSON document on stdout on success.
//! Invariants: Errors are emitted as JSON on stderr when stderr is not a terminal.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Logs go to stderr through `tracing`, filtered by `RUST_LOG` (default `warn`).
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::{
    CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod array_json;
mod command_dispatch;
mod summary_json;

use tpd::api::{
    DatasetStore, Error, ErrorKind, FileStore, Manifest, ManifestOptions, Slot, Split,
    to_exit_code,
};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome { exit_code });
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `tpd --help`."));
            }
        },
    };

    let options = ManifestOptions::new().absolute_paths(cli.absolute_paths);
    command_dispatch::dispatch_command(cli.command, options)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let replacement = arg.to_str().and_then(|value| match value {
                "---help" => Some("--help"),
                "---version" => Some("--version"),
                _ => None,
            });
            replacement.map(OsString::from).unwrap_or(arg)
        })
        .collect()
}

#[derive(Parser)]
#[command(
    name = "tpd",
    version,
    about = "Train/predict dataset manifests",
    long_about = None,
    before_help = r#"A manifest maps the raw, ground-truth, and prediction data of the train and
test splits, plus ordered feature sources, to (file, key) references. Every
dataset of a split must describe the same number of instances."#,
    after_help = r#"EXAMPLES
  $ tpd put vol.json vol '[[1,2],[3,4]]'
  $ tpd set project.tpd train raw vol.json --key vol
  $ tpd feature add project.tpd train feats.json
  $ tpd feature matrix project.tpd train --out matrix.json --out-key train
  $ tpd show project.tpd

NOTES
  - Paths are stored relative to the manifest unless --absolute-paths is given
  - --key may be omitted when the file holds exactly one entry
  - Set RUST_LOG=debug to trace manifest transactions on stderr"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Store absolute dataset paths instead of manifest-relative ones"
    )]
    absolute_paths: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Create a manifest (or check that an existing one opens)")]
    Init {
        #[arg(help = "Manifest file", value_hint = ValueHint::FilePath)]
        manifest: PathBuf,
    },
    #[command(
        about = "Assign a dataset to a slot of a split",
        after_help = r#"EXAMPLES
  $ tpd set project.tpd train raw vol.json --key vol
  $ tpd set project.tpd test gt labels.json

NOTES
  - The first slot assigned to a split fixes its instance count
  - Slots: raw, ground_truth (gt), prediction (pred)"#
    )]
    Set {
        #[arg(help = "Manifest file", value_hint = ValueHint::FilePath)]
        manifest: PathBuf,
        #[arg(help = "Split: train|test")]
        split: Split,
        #[arg(help = "Slot: raw|ground_truth|prediction")]
        slot: Slot,
        #[arg(help = "Dataset file", value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(long, help = "Entry key inside the dataset file")]
        key: Option<String>,
    },
    #[command(about = "Show the dataset assigned to a slot")]
    Get {
        #[arg(help = "Manifest file", value_hint = ValueHint::FilePath)]
        manifest: PathBuf,
        #[arg(help = "Split: train|test")]
        split: Split,
        #[arg(help = "Slot: raw|ground_truth|prediction")]
        slot: Slot,
        #[arg(long, help = "Include the array values")]
        data: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "Manage the ordered feature sources of a split"
    )]
    Feature {
        #[command(subcommand)]
        command: FeatureCommand,
    },
    #[command(about = "Summarize every split of a manifest")]
    Show {
        #[arg(help = "Manifest file", value_hint = ValueHint::FilePath)]
        manifest: PathBuf,
    },
    #[command(about = "List the entries of a dataset file")]
    Keys {
        #[arg(help = "Dataset file", value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    #[command(
        about = "Write a numeric JSON array into a dataset file",
        after_help = r#"EXAMPLES
  $ tpd put vol.json vol '[[1,2],[3,4]]'
  $ tpd put feats.json x -f values.json"#
    )]
    Put {
        #[arg(help = "Dataset file (created if missing)", value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(help = "Entry key")]
        key: String,
        #[arg(help = "Inline JSON array")]
        json: Option<String>,
        #[arg(
            short = 'f',
            long = "from-file",
            help = "Read the JSON array from a file",
            conflicts_with = "json",
            value_hint = ValueHint::FilePath
        )]
        from_file: Option<PathBuf>,
    },
    #[command(about = "Generate shell completion scripts")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum FeatureCommand {
    #[command(about = "Append a feature source (no-op if already listed)")]
    Add {
        #[arg(help = "Manifest file", value_hint = ValueHint::FilePath)]
        manifest: PathBuf,
        #[arg(help = "Split: train|test")]
        split: Split,
        #[arg(help = "Dataset file", value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(long, help = "Entry key inside the dataset file")]
        key: Option<String>,
    },
    #[command(about = "List feature sources in column order")]
    List {
        #[arg(help = "Manifest file", value_hint = ValueHint::FilePath)]
        manifest: PathBuf,
        #[arg(help = "Split: train|test")]
        split: Split,
    },
    #[command(about = "Remove every feature source of a split")]
    Clear {
        #[arg(help = "Manifest file", value_hint = ValueHint::FilePath)]
        manifest: PathBuf,
        #[arg(help = "Split: train|test")]
        split: Split,
    },
    #[command(about = "Aggregate feature sources into one (instances, columns) matrix")]
    Matrix {
        #[arg(help = "Manifest file", value_hint = ValueHint::FilePath)]
        manifest: PathBuf,
        #[arg(help = "Split: train|test")]
        split: Split,
        #[arg(long, help = "Write the matrix into this dataset file", value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        #[arg(long, requires = "out", help = "Entry key for --out (default: <split>_features)")]
        out_key: Option<String>,
        #[arg(long, conflicts_with = "out", help = "Include the matrix values")]
        data: bool,
    },
}

fn open_manifest(path: &Path, options: &ManifestOptions) -> Result<Manifest, Error> {
    Manifest::open(path, options.clone())
}

/// Uses `key` when given, else the file's only entry.
fn resolve_key(store: &FileStore, file: &Path, key: Option<String>) -> Result<String, Error> {
    if let Some(key) = key {
        return Ok(key);
    }
    let keys = store.list_entries(file)?;
    if keys.len() == 1 {
        if let Some(key) = keys.first().cloned() {
            return Ok(key);
        }
    }
    let listed = keys.iter().cloned().collect::<Vec<_>>().join(", ");
    Err(Error::new(ErrorKind::Usage)
        .with_message(format!(
            "dataset file holds {} entries; choose one with --key",
            keys.len()
        ))
        .with_path(file)
        .with_hint(if listed.is_empty() {
            "The file has no entries. Write one with `tpd put`.".to_string()
        } else {
            format!("Available keys: {listed}")
        }))
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::OutOfRange => "index out of range".to_string(),
        ErrorKind::ShapeMismatch => "shape mismatch".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Corrupt => "corrupt data".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(key) = err.key() {
        inner.insert("key".to_string(), json!(key));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(path) = err.path() {
        lines.push(format!("path: {}", path.display()));
    }
    if let Some(key) = err.key() {
        lines.push(format!("key: {key}"));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Cli, error_json, error_text, resolve_key};
    use clap::CommandFactory;
    use tpd::api::{DatasetStore, Entry, Error, ErrorKind, FileStore};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn error_json_carries_kind_hint_path_and_key() {
        let err = Error::new(ErrorKind::ShapeMismatch)
            .with_message("bad shape")
            .with_hint("fix it")
            .with_path("a.json")
            .with_key("vol");
        let value = error_json(&err);
        let inner = value.get("error").expect("error object");
        assert_eq!(inner["kind"], "ShapeMismatch");
        assert_eq!(inner["message"], "bad shape");
        assert_eq!(inner["hint"], "fix it");
        assert_eq!(inner["path"], "a.json");
        assert_eq!(inner["key"], "vol");
    }

    #[test]
    fn error_text_lists_context_lines() {
        let err = Error::new(ErrorKind::NotFound).with_path("x.json");
        let text = error_text(&err);
        assert!(text.starts_with("error: not found"));
        assert!(text.contains("path: x.json"));
    }

    #[test]
    fn resolve_key_picks_single_entry_and_rejects_ambiguity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.json");
        let store = FileStore::new();
        store.write_entry(&path, "only", Entry::text("x")).expect("write");
        assert_eq!(resolve_key(&store, &path, None).expect("key"), "only");
        assert_eq!(
            resolve_key(&store, &path, Some("given".to_string())).expect("key"),
            "given"
        );

        store.write_entry(&path, "second", Entry::text("y")).expect("write");
        let err = resolve_key(&store, &path, None).expect_err("ambiguous");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.hint().unwrap_or_default().contains("only, second"));
    }
}
