use std::collections::HashSet;
use std::path::Path;

use pinyin::ToPinyin;
use rust_xlsxwriter::{DataValidation, DocProperties, Formula, Workbook, Worksheet};
use tracing::{info, warn};

use crate::error::OutputError;
use crate::table::Table;

/// 省份列的标题，同时也是省份列的公式名称
pub const PROVINCE_TITLE: &str = "省份";
const DATA_SHEET: &str = "district-data";
const FORM_SHEET: &str = "Sheet1";
const APPLICATION: &str = "district-table";

/// 一列：首行为标题，其后为按拼音排序的下级名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetColumn {
    pub index: u16,
    pub header: String,
    pub values: Vec<String>,
}

/// 公式名称，用于下拉框的 INDIRECT 联动
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedName {
    pub name: String,
    pub refers_to: String,
}

/// 数据表的布局：省份列、各省的市级列、各市的区县列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetLayout {
    pub columns: Vec<SheetColumn>,
    pub defined_names: Vec<DefinedName>,
}

/// 0 起始的列号转换为列名：0 -> A，26 -> AA
pub fn column_name(index: u16) -> String {
    let mut n = u32::from(index) + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    name.iter().rev().collect()
}

fn pinyin_key(name: &str) -> String {
    name.chars()
        .map(|ch| match ch.to_pinyin() {
            Some(pinyin) => pinyin.plain().to_string(),
            None => ch.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// 中文拼音字母序排序
pub fn sort_by_pinyin(names: &mut [String]) {
    names.sort_by_cached_key(|name| (pinyin_key(name), name.clone()));
}

impl SheetLayout {
    pub fn from_table(table: &Table) -> Self {
        let mut layout = SheetLayout::default();
        let mut index: u16 = 0;

        let provinces = table.provinces().map(|p| p.name().to_string()).collect();
        layout.push_column(index, PROVINCE_TITLE.to_string(), provinces);

        // 空一列
        index += 2;
        for province in table.provinces() {
            let cities = province.cities().map(|c| c.name().to_string()).collect();
            layout.push_column(index, province.name().to_string(), cities);
            index += 1;
        }

        index += 1;
        for province in table.provinces() {
            let start = index;
            for city in province.cities().filter(|city| city.county_count() > 0) {
                let counties = city.counties().map(|c| c.name.clone()).collect();
                layout.push_column(index, city.name().to_string(), counties);
                index += 1;
            }
            // 省级行政区间空一列
            if index > start {
                index += 1;
            }
        }
        layout
    }

    fn push_column(&mut self, index: u16, header: String, mut values: Vec<String>) {
        sort_by_pinyin(&mut values);
        if !values.is_empty() {
            let column = column_name(index);
            self.defined_names.push(DefinedName {
                name: header.clone(),
                refers_to: format!(
                    "='{}'!${}${}:${}${}",
                    DATA_SHEET,
                    column,
                    2,
                    column,
                    values.len() + 1
                ),
            });
        }
        self.columns.push(SheetColumn {
            index,
            header,
            values,
        });
    }
}

fn write_form(sheet: &mut Worksheet) -> Result<(), OutputError> {
    sheet.set_name(FORM_SHEET)?;
    sheet.write_string(0, 0, PROVINCE_TITLE)?;
    sheet.write_string(0, 1, "城市")?;
    sheet.write_string(0, 2, "区县")?;
    for col in 0..3 {
        sheet.set_column_width(col, 20)?;
    }

    let provinces = DataValidation::new().allow_list_formula(Formula::new(PROVINCE_TITLE));
    sheet.add_data_validation(1, 0, 1, 0, &provinces)?;
    let cities = DataValidation::new().allow_list_formula(Formula::new("INDIRECT(A2)"));
    sheet.add_data_validation(1, 1, 1, 1, &cities)?;
    let counties = DataValidation::new().allow_list_formula(Formula::new("INDIRECT(B2)"));
    sheet.add_data_validation(1, 2, 1, 2, &counties)?;
    Ok(())
}

fn write_data(sheet: &mut Worksheet, layout: &SheetLayout) -> Result<(), OutputError> {
    sheet.set_name(DATA_SHEET)?;
    for column in &layout.columns {
        sheet.write_string(0, column.index, column.header.as_str())?;
        for (row, value) in (1u32..).zip(&column.values) {
            sheet.write_string(row, column.index, value.as_str())?;
        }
    }
    Ok(())
}

/// 生成带省/市/区县三级联动下拉框的 Excel 文件
pub fn write_xlsx_file<P: AsRef<Path>>(table: &Table, path: P) -> Result<(), OutputError> {
    let path = path.as_ref();
    let layout = SheetLayout::from_table(table);

    let mut workbook = Workbook::new();
    let properties = DocProperties::new()
        .set_title(APPLICATION)
        .set_subject(APPLICATION)
        .set_author(APPLICATION)
        .set_company(APPLICATION);
    workbook.set_properties(&properties);

    write_form(workbook.add_worksheet())?;
    write_data(workbook.add_worksheet(), &layout)?;

    let mut seen = HashSet::new();
    for defined in &layout.defined_names {
        if !seen.insert(defined.name.as_str()) {
            warn!("公式名称 {} 重复，跳过", defined.name);
            continue;
        }
        workbook.define_name(defined.name.as_str(), &defined.refers_to)?;
    }

    workbook.save(path)?;
    info!("已生成 {}", path.display());
    Ok(())
}
