//! 行政区数据文件加载
//!
//! 文件每行一条记录：`行政区代码,行政区名称`。行按文件顺序逐条插入，
//! 省级行必须出现在其下级行之前，否则加载失败。

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::code::{
    ancestor_codes, city_code_of, is_municipality_code, level_of, province_code_of, Level,
};
use crate::error::LoadError;
use crate::table::{CityDistrict, District, ProvinceDistrict, Table};

/// 按级别分好类的一行数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Division {
    Province(District),
    City(District),
    County(District),
}

impl Division {
    pub fn district(&self) -> &District {
        match self {
            Division::Province(district) | Division::City(district) | Division::County(district) => {
                district
            }
        }
    }
}

impl From<District> for Division {
    fn from(district: District) -> Self {
        match district.level {
            Level::Province => Division::Province(district),
            Level::City => Division::City(district),
            Level::County => Division::County(district),
        }
    }
}

/// 解析一行，`line_no` 从 1 开始
///
/// 返回 `Ok(None)` 表示该行被跳过：空行、首行表头，以及代码字段为空的行。
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<District>, LoadError> {
    let mut line = line.trim();
    if line_no == 1 {
        line = line.trim_start_matches('\u{feff}').trim();
    }
    if line.is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split(',').collect();
    let code_field = fields[0].trim();
    let skippable = line_no == 1 || code_field.is_empty();

    if fields.len() != 2 {
        if skippable {
            debug!("跳过第 {} 行: {}", line_no, line);
            return Ok(None);
        }
        return Err(LoadError::Format {
            line: line_no,
            content: line.to_string(),
        });
    }

    // 只接受纯数字，`+440000` 这类写法也按非法代码处理
    let parsed = code_field
        .bytes()
        .all(|b| b.is_ascii_digit())
        .then(|| code_field.parse::<u32>().ok())
        .flatten();
    let code = match parsed {
        Some(code) => code,
        None if skippable => {
            debug!("跳过第 {} 行: {}", line_no, line);
            return Ok(None);
        }
        None => {
            return Err(LoadError::InvalidCode {
                line: line_no,
                field: code_field.to_string(),
                content: line.to_string(),
            })
        }
    };

    let (parent, grandparent) = ancestor_codes(code);
    Ok(Some(District {
        code,
        name: fields[1].trim().to_string(),
        level: level_of(code),
        parent,
        grandparent,
    }))
}

/// 逐行构建行政区表
#[derive(Debug, Default)]
pub struct TableBuilder {
    table: Table,
    rows: usize,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析并插入一行
    pub fn push_line(&mut self, line_no: usize, line: &str) -> Result<(), LoadError> {
        match parse_line(line_no, line)? {
            Some(district) => self.push(line_no, Division::from(district)),
            None => Ok(()),
        }
    }

    /// 插入一个已分类的行政区
    pub fn push(&mut self, line_no: usize, division: Division) -> Result<(), LoadError> {
        self.rows += 1;
        match division {
            Division::Province(district) => {
                if self.table.province(district.code).is_some() {
                    warn!("第 {} 行重复的省级行政区 {}，覆盖已有数据", line_no, district.code);
                }
                let municipality = is_municipality_code(district.code);
                self.table.insert_province(ProvinceDistrict::new(
                    district.code,
                    district.name,
                    municipality,
                ));
            }
            Division::City(district) => {
                let province = self.owning_province(line_no, district.code)?;
                province.insert_city(CityDistrict::new(
                    city_code_of(district.code),
                    district.name,
                    district.level,
                    false,
                ));
            }
            Division::County(district) if is_municipality_code(district.code) => {
                // 直辖市的区县占据市级的位置
                let province = self.owning_province(line_no, district.code)?;
                let level = district.level.up().unwrap_or(district.level);
                province.insert_city(CityDistrict::new(district.code, district.name, level, false));
            }
            Division::County(district) => {
                let province = self.owning_province(line_no, district.code)?;
                match province.city_mut(city_code_of(district.code)) {
                    Some(city) => city.insert_county(district),
                    None => {
                        // 省直辖县级市（济源市、五指山市等）
                        province.insert_city(CityDistrict::new(
                            district.code,
                            district.name,
                            district.level,
                            true,
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// 生成有序序列并返回只读的行政区表
    pub fn finish(mut self) -> Table {
        self.table.perfect();
        info!(
            "行政区加载完成: {} 行, {} 个省级, {} 个市级, {} 个县级",
            self.rows,
            self.table.province_count(),
            self.table.city_count(),
            self.table.county_count()
        );
        self.table
    }

    fn owning_province(
        &mut self,
        line_no: usize,
        code: u32,
    ) -> Result<&mut ProvinceDistrict, LoadError> {
        let province = province_code_of(code);
        self.table
            .province_mut(province)
            .ok_or(LoadError::MissingProvince {
                line: line_no,
                code,
                province,
            })
    }
}

/// 从行序列加载，行号从 1 开始
pub fn load_lines<I, S>(lines: I) -> Result<Table, LoadError>
where
    I: IntoIterator<Item = io::Result<S>>,
    S: AsRef<str>,
{
    let mut builder = TableBuilder::new();
    for (index, line) in lines.into_iter().enumerate() {
        let line = line?;
        builder.push_line(index + 1, line.as_ref())?;
    }
    Ok(builder.finish())
}

pub fn load_str(text: &str) -> Result<Table, LoadError> {
    load_lines(text.lines().map(Ok::<_, io::Error>))
}

pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Table, LoadError> {
    let path = path.as_ref();
    info!("正在加载行政区数据: {}", path.display());
    let file = File::open(path)?;
    load_lines(BufReader::new(file).lines())
}
