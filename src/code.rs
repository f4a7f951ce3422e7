//! 行政区划代码分类
//!
//! 6 位行政区划代码按位置编码层级：1-2 位为省级，3-4 位为市级，5-6 位为县级。

use serde::{Deserialize, Serialize};

/// 北京市
pub const BEIJING: u32 = 110000;
/// 天津市
pub const TIANJIN: u32 = 120000;
/// 上海市
pub const SHANGHAI: u32 = 310000;
/// 重庆市
pub const CHONGQING: u32 = 500000;

const MUNICIPALITIES: [u32; 4] = [BEIJING, TIANJIN, SHANGHAI, CHONGQING];

/// 行政区级别（1 省/自治区/直辖市，2 市/州/盟，3 县/县级市/旗）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum Level {
    Province = 1,
    City = 2,
    County = 3,
}

impl Level {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// 上一级，省级没有上一级
    pub fn up(self) -> Option<Level> {
        match self {
            Level::Province => None,
            Level::City => Some(Level::Province),
            Level::County => Some(Level::City),
        }
    }
}

impl From<Level> for u32 {
    fn from(level: Level) -> Self {
        level.as_u32()
    }
}

impl TryFrom<u32> for Level {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Level::Province),
            2 => Ok(Level::City),
            3 => Ok(Level::County),
            other => Err(format!("invalid district level: {other}")),
        }
    }
}

pub fn is_province_code(code: u32) -> bool {
    code % 10000 == 0
}

pub fn is_city_code(code: u32) -> bool {
    code % 10000 != 0 && code % 100 == 0
}

pub fn is_county_code(code: u32) -> bool {
    code % 10000 != 0 && code % 100 != 0
}

/// 按代码末位判定级别，任何代码都恰好落入三者之一
pub fn level_of(code: u32) -> Level {
    if is_province_code(code) {
        Level::Province
    } else if is_city_code(code) {
        Level::City
    } else {
        Level::County
    }
}

/// 所属省级代码（末 4 位清零）
pub fn province_code_of(code: u32) -> u32 {
    code - code % 10000
}

/// 所属市级代码（末 2 位清零）
pub fn city_code_of(code: u32) -> u32 {
    code - code % 100
}

/// 返回 (父代码, 祖父代码)
pub fn ancestor_codes(code: u32) -> (u32, u32) {
    (city_code_of(code), province_code_of(code))
}

/// 是否属于直辖市（北京、天津、上海、重庆）
pub fn is_municipality_code(code: u32) -> bool {
    MUNICIPALITIES.contains(&province_code_of(code))
}
