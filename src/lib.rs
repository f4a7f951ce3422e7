//! 中国行政区划代码表
//!
//! 从 `代码,名称` 格式的文本文件构建省/市/区县三级树，输出 JSON、CSV、SQL、Excel，
//! 并提供带缓存的代码与名称互查和基于 jieba 分词的名称搜索。

pub mod code;
pub mod error;
pub mod loader;
pub mod lookup;
pub mod names;
pub mod output;
pub mod search;
pub mod table;

pub use code::Level;
pub use error::{LoadError, LookupError, OutputError, StoreError};
pub use loader::{load_file, load_str, Division, TableBuilder};
pub use lookup::{Code, DistrictQuery, Name, QueryConfig};
pub use search::{AddressIndex, SearchHit, SearchWeights};
pub use table::{CityDistrict, DictDistrict, District, ProvinceDistrict, Table};
