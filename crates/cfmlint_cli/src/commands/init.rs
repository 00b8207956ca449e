//! Init command implementation.

use std::fs;
use std::path::Path;

use miette::{IntoDiagnostic, Result, miette};
use tracing::info;

const CONFIG_FILE: &str = ".cfmlint.jsonc";

const CONFIG_TEMPLATE: &str = r#"{
  // Error tolerance: "strict" (batch, fail-fast), "lenient", or "fragment".
  "parsing_mode": "lenient",

  // Per-file deadline and the consecutive-timeout circuit breaker.
  "file_timeout_secs": 30,
  "max_consecutive_timeouts": 10,

  // External engine; file paths are appended after "args".
  "engine": {
    "program": "/usr/local/bin/cflint",
    "args": []
  },

  // Discovery filters (globs).
  "exclude": ["**/node_modules/**"]
}
"#;

pub fn run(force: bool) -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() && !force {
        return Err(miette!(
            "{} already exists; use --force to overwrite",
            CONFIG_FILE
        ));
    }

    fs::write(path, CONFIG_TEMPLATE).into_diagnostic()?;
    info!(config = CONFIG_FILE, "wrote configuration file");
    println!("Created {}", CONFIG_FILE);
    Ok(())
}
