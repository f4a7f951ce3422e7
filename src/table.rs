//! 三级行政区树
//!
//! 每一级节点都由上一级的 `HashMap` 独占持有，按代码取出即可原地修改。
//! 有序序列只保存排好序的代码，由 [`Table::perfect`] 从映射重新生成，
//! 所有输出都只经由有序序列遍历，保证结果与哈希表的遍历顺序无关。

use std::collections::HashMap;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::code::Level;

/// 县/县级市/旗/区
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    pub code: u32,
    pub name: String,
    pub level: Level,
    /// 父行政区代码
    pub parent: u32,
    /// 父父行政区代码
    pub grandparent: u32,
}

/// 市/州/盟；直辖市下的区县和省直辖县级市也挂在这一层
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityDistrict {
    code: u32,
    name: String,
    level: Level,
    county_city: bool,
    county_table: HashMap<u32, District>,
    counties: Vec<u32>,
}

/// 省/自治区/直辖市
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvinceDistrict {
    code: u32,
    name: String,
    municipality: bool,
    city_table: HashMap<u32, CityDistrict>,
    cities: Vec<u32>,
}

/// 行政区表，只能由 [`crate::loader`] 构建，构建完成后只读
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    province_table: HashMap<u32, ProvinceDistrict>,
    provinces: Vec<u32>,
}

/// 按有序代码遍历映射中的节点
struct Ordered<'a, V> {
    order: &'a [u32],
    table: &'a HashMap<u32, V>,
}

impl<'a, V> Ordered<'a, V> {
    fn iter(&self) -> impl Iterator<Item = &'a V> + 'a {
        let table = self.table;
        self.order.iter().filter_map(move |code| table.get(code))
    }
}

impl<V: Serialize> Serialize for Ordered<'_, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

fn sorted_keys<V>(table: &HashMap<u32, V>) -> Vec<u32> {
    let mut keys: Vec<u32> = table.keys().copied().collect();
    keys.sort_unstable();
    keys
}

impl CityDistrict {
    pub(crate) fn new(code: u32, name: String, level: Level, county_city: bool) -> Self {
        Self {
            code,
            name,
            level,
            county_city,
            county_table: HashMap::new(),
            counties: Vec::new(),
        }
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// 是否省直辖县级市（如济源市），这种节点没有下级
    pub fn is_county_level_city(&self) -> bool {
        self.county_city
    }

    /// 按代码升序遍历区县
    pub fn counties(&self) -> impl Iterator<Item = &District> + '_ {
        self.ordered_counties().iter()
    }

    pub fn county(&self, code: u32) -> Option<&District> {
        self.county_table.get(&code)
    }

    pub fn county_count(&self) -> usize {
        self.county_table.len()
    }

    pub(crate) fn insert_county(&mut self, district: District) {
        self.county_table.insert(district.code, district);
    }

    fn ordered_counties(&self) -> Ordered<'_, District> {
        Ordered {
            order: &self.counties,
            table: &self.county_table,
        }
    }

    fn perfect(&mut self) {
        self.counties = sorted_keys(&self.county_table);
    }
}

impl ProvinceDistrict {
    pub(crate) fn new(code: u32, name: String, municipality: bool) -> Self {
        Self {
            code,
            name,
            municipality,
            city_table: HashMap::new(),
            cities: Vec::new(),
        }
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        Level::Province
    }

    /// 是否直辖市
    pub fn is_municipality(&self) -> bool {
        self.municipality
    }

    /// 按代码升序遍历市级节点
    pub fn cities(&self) -> impl Iterator<Item = &CityDistrict> + '_ {
        self.ordered_cities().iter()
    }

    pub fn city(&self, code: u32) -> Option<&CityDistrict> {
        self.city_table.get(&code)
    }

    pub fn city_count(&self) -> usize {
        self.city_table.len()
    }

    pub(crate) fn city_mut(&mut self, code: u32) -> Option<&mut CityDistrict> {
        self.city_table.get_mut(&code)
    }

    pub(crate) fn insert_city(&mut self, city: CityDistrict) {
        self.city_table.insert(city.code, city);
    }

    fn ordered_cities(&self) -> Ordered<'_, CityDistrict> {
        Ordered {
            order: &self.cities,
            table: &self.city_table,
        }
    }

    fn perfect(&mut self) {
        for city in self.city_table.values_mut() {
            city.perfect();
        }
        self.cities = sorted_keys(&self.city_table);
    }
}

impl Table {
    /// 按代码升序遍历省级节点
    pub fn provinces(&self) -> impl Iterator<Item = &ProvinceDistrict> + '_ {
        self.ordered_provinces().iter()
    }

    pub fn province(&self, code: u32) -> Option<&ProvinceDistrict> {
        self.province_table.get(&code)
    }

    pub fn province_count(&self) -> usize {
        self.province_table.len()
    }

    pub fn city_count(&self) -> usize {
        self.province_table.values().map(ProvinceDistrict::city_count).sum()
    }

    pub fn county_count(&self) -> usize {
        self.province_table
            .values()
            .flat_map(|province| province.city_table.values())
            .map(CityDistrict::county_count)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.province_table.is_empty()
    }

    /// 每个节点一行的扁平记录，顺序同有序序列
    pub fn records(&self) -> Vec<DictDistrict> {
        let mut records = Vec::new();
        for province in self.provinces() {
            records.push(DictDistrict {
                province_code: province.code,
                city_code: 0,
                county_code: 0,
                level: province.level().as_u32(),
                province_name: province.name.clone(),
                city_name: String::new(),
                county_name: String::new(),
            });
            for city in province.cities() {
                records.push(DictDistrict {
                    province_code: province.code,
                    city_code: city.code,
                    county_code: 0,
                    level: city.level.as_u32(),
                    province_name: province.name.clone(),
                    city_name: city.name.clone(),
                    county_name: String::new(),
                });
                for county in city.counties() {
                    records.push(DictDistrict {
                        province_code: province.code,
                        city_code: city.code,
                        county_code: county.code,
                        level: county.level.as_u32(),
                        province_name: province.name.clone(),
                        city_name: city.name.clone(),
                        county_name: county.name.clone(),
                    });
                }
            }
        }
        records
    }

    pub(crate) fn province_mut(&mut self, code: u32) -> Option<&mut ProvinceDistrict> {
        self.province_table.get_mut(&code)
    }

    /// 同一代码的省级行后出现者覆盖先出现者
    pub(crate) fn insert_province(&mut self, province: ProvinceDistrict) {
        self.province_table.insert(province.code, province);
    }

    /// 由映射重新生成各级有序序列，可重复调用
    pub(crate) fn perfect(&mut self) {
        for province in self.province_table.values_mut() {
            province.perfect();
        }
        self.provinces = sorted_keys(&self.province_table);
    }

    fn ordered_provinces(&self) -> Ordered<'_, ProvinceDistrict> {
        Ordered {
            order: &self.provinces,
            table: &self.province_table,
        }
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Table", 1)?;
        if self.provinces.is_empty() {
            state.skip_field("provinces")?;
        } else {
            state.serialize_field("provinces", &self.ordered_provinces())?;
        }
        state.end()
    }
}

impl Serialize for ProvinceDistrict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ProvinceDistrict", 5)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("level", &self.level())?;
        state.serialize_field("municipality", &self.municipality)?;
        if self.cities.is_empty() {
            state.skip_field("cities")?;
        } else {
            state.serialize_field("cities", &self.ordered_cities())?;
        }
        state.end()
    }
}

impl Serialize for CityDistrict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CityDistrict", 5)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("level", &self.level)?;
        state.serialize_field("county_city", &self.county_city)?;
        if self.counties.is_empty() {
            state.skip_field("counties")?;
        } else {
            state.serialize_field("counties", &self.ordered_counties())?;
        }
        state.end()
    }
}

/// 行政区字典表的一行（f_province_code,f_city_code,f_county_code,f_level,
/// f_province_name,f_city_name,f_county_name）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictDistrict {
    pub province_code: u32,
    pub city_code: u32,
    pub county_code: u32,
    pub level: u32,
    pub province_name: String,
    pub city_name: String,
    pub county_name: String,
}
