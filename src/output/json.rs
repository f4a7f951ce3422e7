use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::info;

use super::create_file;
use crate::error::OutputError;
use crate::table::Table;

/// JSON 输出配置，`indent` 为 `None` 时输出紧凑格式
#[derive(Debug, Clone, Default)]
pub struct JsonOptions {
    pub indent: Option<String>,
}

impl JsonOptions {
    pub fn pretty() -> Self {
        Self {
            indent: Some("  ".to_string()),
        }
    }
}

pub fn to_json(table: &Table, options: &JsonOptions) -> Result<String, OutputError> {
    let bytes = match &options.indent {
        None => serde_json::to_vec(table)?,
        Some(indent) => {
            let mut bytes = Vec::new();
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
            table.serialize(&mut serializer)?;
            bytes
        }
    };
    // serde_json 只会输出合法的 UTF-8
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn write_json_file<P: AsRef<Path>>(
    table: &Table,
    path: P,
    options: &JsonOptions,
) -> Result<(), OutputError> {
    let path = path.as_ref();
    let json = to_json(table, options)?;
    let mut writer = create_file(path)?;
    writer.write_all(json.as_bytes())?;
    writer.flush()?;
    info!("已生成 {}", path.display());
    Ok(())
}
