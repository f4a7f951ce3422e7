//! 行政区表的输出：JSON、CSV、SQL 和 Excel
//!
//! 所有输出都只遍历 [`Table`](crate::table::Table) 的有序序列。

mod csv;
mod json;
mod sql;
mod xlsx;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::OutputError;

pub use self::csv::{to_csv_string, write_csv, write_csv_file, CsvOptions};
pub use self::json::{to_json, write_json_file, JsonOptions};
pub use self::sql::{
    is_valid_table_name, render_sql, write_sql_file, SqlOptions, DEFAULT_TABLE_NAME,
};
pub use self::xlsx::{
    column_name, sort_by_pinyin, write_xlsx_file, DefinedName, SheetColumn, SheetLayout,
    PROVINCE_TITLE,
};

fn create_file(path: &Path) -> Result<BufWriter<File>, OutputError> {
    let file = File::create(path)?;
    Ok(BufWriter::new(file))
}
