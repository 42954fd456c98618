use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use cligui::spec::{ActionKind, ArgSpec, Coercion};

/// Schema with one argument of every widget-backed kind.
#[allow(dead_code)]
pub const RESIZE_SCHEMA: &str = r#"{
    "program": "resize",
    "description": "Resize an image",
    "arguments": [
        {"dest": "input", "required": true, "type": "path", "help": "Source image"},
        {"dest": "width", "flags": ["--width", "-w"], "type": "int", "default": 640},
        {"dest": "keep_ratio", "flags": ["--keep-ratio"], "action": "store_true"},
        {"dest": "help", "flags": ["--help", "-h"], "action": "help", "help": "Show help"}
    ]
}"#;

/// Writes `body` to `path`, creating parent directories.
#[allow(dead_code)]
pub fn write_file(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|error| panic!("failed to create {}: {error}", parent.display()));
    }
    fs::write(path, body)
        .unwrap_or_else(|error| panic!("failed to write {}: {error}", path.display()));
}

/// Writes a schema file named `name` under `dir`.
#[allow(dead_code)]
pub fn write_schema(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    write_file(&path, body);
    path
}

/// Specs for a small greeting form: positional, typed option, flag, help.
#[allow(dead_code)]
pub fn greeting_specs() -> Vec<Arc<ArgSpec>> {
    vec![
        Arc::new(
            ArgSpec::new("name", ActionKind::Store)
                .required(true)
                .help("Who to greet"),
        ),
        Arc::new(
            ArgSpec::new("times", ActionKind::Store)
                .flag("--times")
                .coercion(Coercion::integer())
                .default_value("5"),
        ),
        Arc::new(ArgSpec::new("loud", ActionKind::StoreTrue).flag("--loud")),
        Arc::new(ArgSpec::new("help", ActionKind::Help).flag("--help")),
    ]
}
