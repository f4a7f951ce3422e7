//! 行政区字典表的后端存储

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::{Code, Name};
use crate::error::StoreError;
use crate::output::is_valid_table_name;
use crate::table::{DictDistrict, Table};

/// 查询缓存所依赖的最小存储接口，三个字段都需精确匹配
pub trait DistrictStore {
    fn find_code(&self, name: &Name) -> Result<Option<Code>, StoreError>;

    fn find_name(&self, code: &Code) -> Result<Option<Name>, StoreError>;

    /// 省、市名称都匹配的行数
    fn count_counties(&self, province_name: &str, city_name: &str) -> Result<u64, StoreError>;

    /// 全表扫描，用于预热缓存
    fn records(&self) -> Result<Vec<DictDistrict>, StoreError>;
}

/// SQLite 实现，表结构同 SQL 输出中的 t_dict_district
pub struct SqliteDistrictStore {
    conn: Mutex<Connection>,
    table_name: String,
}

fn validate_table_name(table_name: &str) -> Result<(), StoreError> {
    if is_valid_table_name(table_name) {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(table_name.to_string()))
    }
}

impl SqliteDistrictStore {
    pub fn open<P: AsRef<Path>>(path: P, table_name: &str) -> Result<Self, StoreError> {
        validate_table_name(table_name)?;
        info!("打开 SQLite 数据库: {}", path.as_ref().display());
        let conn = Connection::open(path)?;
        Ok(Self::with_connection(conn, table_name))
    }

    pub fn open_in_memory(table_name: &str) -> Result<Self, StoreError> {
        validate_table_name(table_name)?;
        let conn = Connection::open_in_memory()?;
        Ok(Self::with_connection(conn, table_name))
    }

    fn with_connection(conn: Connection, table_name: &str) -> Self {
        Self {
            conn: Mutex::new(conn),
            table_name: table_name.to_string(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn create_table(&self) -> Result<(), StoreError> {
        let t = &self.table_name;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {t} (
                f_province_code INTEGER NOT NULL,
                f_city_code INTEGER NOT NULL,
                f_county_code INTEGER NOT NULL,
                f_level INTEGER NOT NULL,
                f_province_name TEXT NOT NULL,
                f_city_name TEXT NOT NULL,
                f_county_name TEXT NOT NULL,
                PRIMARY KEY (f_province_code, f_city_code, f_county_code)
            );
            CREATE INDEX IF NOT EXISTS idx_{t}_province_name ON {t} (f_province_name);
            CREATE INDEX IF NOT EXISTS idx_{t}_city_name ON {t} (f_city_name);
            CREATE INDEX IF NOT EXISTS idx_{t}_county_name ON {t} (f_county_name);"
        );
        self.conn.lock().execute_batch(&ddl)?;
        Ok(())
    }

    /// 导入整张行政区表，已存在的行保持不变，返回新插入的行数
    pub fn import_table(&self, table: &Table) -> Result<usize, StoreError> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} (f_province_code, f_city_code, f_county_code, f_level,
                f_province_name, f_city_name, f_county_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            self.table_name
        );

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in table.records() {
                inserted += stmt.execute(params![
                    record.province_code,
                    record.city_code,
                    record.county_code,
                    record.level,
                    record.province_name,
                    record.city_name,
                    record.county_name,
                ])?;
            }
        }
        tx.commit()?;
        info!("导入 {} 行到 {}", inserted, self.table_name);
        Ok(inserted)
    }
}

impl DistrictStore for SqliteDistrictStore {
    fn find_code(&self, name: &Name) -> Result<Option<Code>, StoreError> {
        let sql = format!(
            "SELECT f_province_code, f_city_code, f_county_code FROM {}
             WHERE f_province_name = ?1 AND f_city_name = ?2 AND f_county_name = ?3
             LIMIT 1",
            self.table_name
        );
        let code = self
            .conn
            .lock()
            .query_row(
                &sql,
                params![name.province_name, name.city_name, name.county_name],
                |row| {
                    Ok(Code {
                        province_code: row.get(0)?,
                        city_code: row.get(1)?,
                        county_code: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(code)
    }

    fn find_name(&self, code: &Code) -> Result<Option<Name>, StoreError> {
        let sql = format!(
            "SELECT f_province_name, f_city_name, f_county_name FROM {}
             WHERE f_province_code = ?1 AND f_city_code = ?2 AND f_county_code = ?3
             LIMIT 1",
            self.table_name
        );
        let name = self
            .conn
            .lock()
            .query_row(
                &sql,
                params![code.province_code, code.city_code, code.county_code],
                |row| {
                    Ok(Name {
                        province_name: row.get(0)?,
                        city_name: row.get(1)?,
                        county_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(name)
    }

    fn count_counties(&self, province_name: &str, city_name: &str) -> Result<u64, StoreError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}
             WHERE f_province_name = ?1 AND f_city_name = ?2",
            self.table_name
        );
        let count: i64 = self
            .conn
            .lock()
            .query_row(&sql, params![province_name, city_name], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn records(&self) -> Result<Vec<DictDistrict>, StoreError> {
        let sql = format!(
            "SELECT f_province_code, f_city_code, f_county_code, f_level,
                f_province_name, f_city_name, f_county_name
             FROM {}
             ORDER BY f_province_code, f_city_code, f_county_code",
            self.table_name
        );
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(DictDistrict {
                province_code: row.get(0)?,
                city_code: row.get(1)?,
                county_code: row.get(2)?,
                level: row.get(3)?,
                province_name: row.get(4)?,
                city_name: row.get(5)?,
                county_name: row.get(6)?,
            })
        })?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_str;
    use crate::output::DEFAULT_TABLE_NAME;

    fn store() -> SqliteDistrictStore {
        let store = SqliteDistrictStore::open_in_memory(DEFAULT_TABLE_NAME).unwrap();
        store.create_table().unwrap();
        let table = load_str(
            "440000,广东省\n440400,珠海市\n440402,香洲区\n440403,斗门区\n441900,东莞市\n",
        )
        .unwrap();
        assert_eq!(store.import_table(&table).unwrap(), 5);
        store
    }

    #[test]
    fn exact_triple_lookups() {
        let store = store();
        let code = store
            .find_code(&Name::new("广东省", "珠海市", "香洲区"))
            .unwrap()
            .unwrap();
        assert_eq!(code, Code::new(440000, 440400, 440402));

        let city = store.find_code(&Name::new("广东省", "珠海市", "")).unwrap();
        assert_eq!(city, Some(Code::new(440000, 440400, 0)));

        let name = store.find_name(&Code::new(440000, 440400, 440403)).unwrap();
        assert_eq!(name, Some(Name::new("广东省", "珠海市", "斗门区")));

        assert_eq!(store.find_code(&Name::new("广东省", "珠海", "")).unwrap(), None);
        assert_eq!(store.find_name(&Code::new(440000, 440400, 4404020)).unwrap(), None);
    }

    #[test]
    fn county_counts_match_the_name_pair() {
        let store = store();
        assert_eq!(store.count_counties("广东省", "珠海市").unwrap(), 3);
        assert_eq!(store.count_counties("广东省", "东莞市").unwrap(), 1);
        assert_eq!(store.count_counties("广东省", "深圳市").unwrap(), 0);
    }

    #[test]
    fn reimport_inserts_nothing() {
        let store = store();
        let table = load_str("440000,广东省\n").unwrap();
        assert_eq!(store.import_table(&table).unwrap(), 0);
        assert_eq!(store.records().unwrap().len(), 5);
    }

    #[test]
    fn missing_table_is_an_error() {
        let store = SqliteDistrictStore::open_in_memory("t_missing").unwrap();
        assert!(matches!(
            store.find_code(&Name::new("广东省", "", "")),
            Err(StoreError::Sqlite(_))
        ));
    }

    #[test]
    fn table_names_are_validated() {
        assert!(SqliteDistrictStore::open_in_memory("t_dict_district2").is_ok());
        for bad in ["", "1table", "t; DROP TABLE x", "t-d"] {
            assert!(matches!(
                SqliteDistrictStore::open_in_memory(bad),
                Err(StoreError::InvalidTableName(_))
            ));
        }
    }
}
