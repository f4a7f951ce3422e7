//! 错误类型

use thiserror::Error;

/// 加载行政区数据文件时的错误，任何一种都会使整个加载失败
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 字段数不是 2 个
    #[error("invalid row format: ({line}) {content}, expected format: DistrictCode,DistrictName")]
    Format { line: usize, content: String },

    /// 行政区代码不是无符号整数
    #[error("invalid district code: ({line}) {field} ({content})")]
    InvalidCode {
        line: usize,
        field: String,
        content: String,
    },

    /// 市级或县级行出现在所属省级行之前
    #[error("province {province} of district {code} not loaded before line {line}")]
    MissingProvince { line: usize, code: u32, province: u32 },
}

/// 后端存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid table name: {0}")]
    InvalidTableName(String),
}

/// 查询错误，不存在不属于错误
#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cache json error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 生成 JSON/CSV/SQL/XLSX 时的错误
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("invalid csv delimiter: {0:?}")]
    Delimiter(char),

    #[error("invalid table name: {0}")]
    InvalidTableName(String),
}
