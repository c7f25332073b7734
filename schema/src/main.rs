use std::{env, fs, path::PathBuf};

use aligner::AlignConfig;
use anyhow::Result;
use schemars::schema_for;

/// 默认输出目录
const VSCODE_DIR: &str = ".vscode";

fn main() -> Result<()> {
    let output_dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(VSCODE_DIR));
    fs::create_dir_all(&output_dir)?;

    let config_schema = serde_json::to_string_pretty(&schema_for!(AlignConfig))?;
    fs::write(output_dir.join("align_config.schema.json"), config_schema)?;
    Ok(())
}
