use std::io::Write;
use std::path::Path;

use tracing::info;

use super::create_file;
use crate::error::OutputError;
use crate::table::Table;

/// CSV 输出配置
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// 分隔符，必须是 ASCII 字符
    pub delimiter: char,
    /// 首列输出行政区代码
    pub with_code: bool,
    /// 只输出叶子节点（区县，以及没有下级的市级节点）
    pub leaves_only: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            with_code: false,
            leaves_only: false,
        }
    }
}

/// 每个节点一行：`[代码,]省[,市[,县]]`
pub fn write_csv<W: Write>(table: &Table, writer: W, options: &CsvOptions) -> Result<(), OutputError> {
    let delimiter = u8::try_from(options.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(OutputError::Delimiter(options.delimiter))?;
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_writer(writer);

    let mut write_row = |code: u32, names: &[&str]| -> Result<(), csv::Error> {
        let code = code.to_string();
        let mut record: Vec<&str> = Vec::with_capacity(names.len() + 1);
        if options.with_code {
            record.push(&code);
        }
        record.extend_from_slice(names);
        csv_writer.write_record(&record)
    };

    for province in table.provinces() {
        if !options.leaves_only || province.city_count() == 0 {
            write_row(province.code(), &[province.name()])?;
        }
        for city in province.cities() {
            if !options.leaves_only || city.county_count() == 0 {
                write_row(city.code(), &[province.name(), city.name()])?;
            }
            for county in city.counties() {
                write_row(county.code, &[province.name(), city.name(), county.name.as_str()])?;
            }
        }
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_string(table: &Table, options: &CsvOptions) -> Result<String, OutputError> {
    let mut bytes = Vec::new();
    write_csv(table, &mut bytes, options)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn write_csv_file<P: AsRef<Path>>(
    table: &Table,
    path: P,
    options: &CsvOptions,
) -> Result<(), OutputError> {
    let path = path.as_ref();
    let mut writer = create_file(path)?;
    write_csv(table, &mut writer, options)?;
    writer.flush()?;
    info!("已生成 {}", path.display());
    Ok(())
}
