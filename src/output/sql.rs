use std::io::Write;
use std::path::Path;

use tracing::info;

use super::create_file;
use crate::error::OutputError;
use crate::table::Table;

pub const DEFAULT_TABLE_NAME: &str = "t_dict_district";

/// SQL 输出配置
#[derive(Debug, Clone)]
pub struct SqlOptions {
    pub table_name: String,
    /// 使用 `INSERT IGNORE`
    pub ignore: bool,
}

impl Default for SqlOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            ignore: false,
        }
    }
}

const DDL: &str = "\
/*
DROP TABLE t_dict_district;
CREATE TABLE t_dict_district (
  f_province_code INT UNSIGNED NOT NULL,
  f_city_code INT UNSIGNED NOT NULL,
  f_county_code INT UNSIGNED NOT NULL,
  f_level TINYINT UNSIGNED NOT NULL,
  f_province_name VARCHAR(20) NOT NULL,
  f_city_name VARCHAR(20) NOT NULL,
  f_county_name VARCHAR(20) NOT NULL,
  PRIMARY KEY (f_province_code,f_city_code,f_county_code),
  KEY (f_province_name),
  KEY (f_city_name),
  KEY (f_county_name)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
*/
";

/// 表名只允许 ASCII 字母、数字和下划线，且不以数字开头
pub fn is_valid_table_name(table_name: &str) -> bool {
    table_name
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && table_name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// 生成单条多行 INSERT 语句，每个节点一行
pub fn render_sql(table: &Table, options: &SqlOptions) -> Result<String, OutputError> {
    if !is_valid_table_name(&options.table_name) {
        return Err(OutputError::InvalidTableName(options.table_name.clone()));
    }
    let mut sql = String::from(DDL);
    let records = table.records();
    if records.is_empty() {
        return Ok(sql);
    }

    let verb = if options.ignore { "INSERT IGNORE INTO" } else { "INSERT INTO" };
    sql.push_str(&format!("{} {} VALUES \n", verb, options.table_name));
    let rows: Vec<String> = records
        .iter()
        .map(|record| {
            format!(
                "({},{},{},{},{},{},{})",
                record.province_code,
                record.city_code,
                record.county_code,
                record.level,
                quote(&record.province_name),
                quote(&record.city_name),
                quote(&record.county_name)
            )
        })
        .collect();
    sql.push_str(&rows.join(",\n"));
    sql.push(';');
    Ok(sql)
}

pub fn write_sql_file<P: AsRef<Path>>(
    table: &Table,
    path: P,
    options: &SqlOptions,
) -> Result<(), OutputError> {
    let path = path.as_ref();
    let sql = render_sql(table, options)?;
    let mut writer = create_file(path)?;
    writer.write_all(sql.as_bytes())?;
    writer.flush()?;
    info!("已生成 {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_str;

    #[test]
    fn one_row_per_node_with_zeroed_lower_codes() {
        let table = load_str("440000,广东省\n440400,珠海市\n440402,香洲区\n").unwrap();
        let sql = render_sql(&table, &SqlOptions::default()).unwrap();
        let body = sql.split("*/\n").nth(1).unwrap();
        assert_eq!(
            body,
            "INSERT INTO t_dict_district VALUES \n\
             (440000,0,0,1,'广东省','',''),\n\
             (440000,440400,0,2,'广东省','珠海市',''),\n\
             (440000,440400,440402,3,'广东省','珠海市','香洲区');"
        );
    }

    #[test]
    fn ignore_variant_and_custom_table() {
        let table = load_str("110000,北京市\n110108,海淀区\n").unwrap();
        let options = SqlOptions {
            table_name: "district".to_string(),
            ignore: true,
        };
        let sql = render_sql(&table, &options).unwrap();
        assert!(sql.contains("INSERT IGNORE INTO district VALUES \n"));
        assert!(sql.contains("(110000,110108,0,2,'北京市','海淀区','')"));
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(quote("O'Neil"), "'O''Neil'");
    }

    #[test]
    fn empty_table_has_no_insert() {
        let table = load_str("").unwrap();
        assert!(!render_sql(&table, &SqlOptions::default()).unwrap().contains("INSERT"));
    }

    #[test]
    fn table_name_is_checked_before_rendering() {
        let table = load_str("440000,广东省\n").unwrap();
        for bad in ["", "1t", "t; DROP TABLE x", "t d"] {
            let options = SqlOptions {
                table_name: bad.to_string(),
                ignore: false,
            };
            assert!(matches!(
                render_sql(&table, &options),
                Err(OutputError::InvalidTableName(_))
            ));
        }
        assert!(is_valid_table_name("_t_dict_district2"));
    }
}
