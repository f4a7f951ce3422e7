use std::fs;

use district_table::output::{
    write_csv_file, write_json_file, write_sql_file, CsvOptions, JsonOptions, SqlOptions,
};
use district_table::{load_file, LoadError, Level};

const DATA: &str = "\
\u{feff}行政区划代码,名称
110000,北京市

110101,东城区
110108,海淀区
410000,河南省
410100,郑州市
410102,中原区
419001,济源市
440000,广东省
440400,珠海市
440402,香洲区
440403,斗门区
441900,东莞市
";

fn fixture(text: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("district.csv");
    fs::write(&path, text).unwrap();
    (dir, path)
}

#[test]
fn loads_a_complete_file() {
    let (_dir, path) = fixture(DATA);
    let table = load_file(&path).unwrap();

    assert_eq!(table.province_count(), 3);
    let codes: Vec<u32> = table.provinces().map(|p| p.code()).collect();
    assert_eq!(codes, vec![110000, 410000, 440000]);

    let beijing = table.province(110000).unwrap();
    assert!(beijing.is_municipality());
    let districts: Vec<u32> = beijing.cities().map(|c| c.code()).collect();
    assert_eq!(districts, vec![110101, 110108]);
    assert!(beijing.cities().all(|c| c.level() == Level::City));

    let henan = table.province(410000).unwrap();
    let jiyuan = henan.city(419001).unwrap();
    assert!(jiyuan.is_county_level_city());
    assert_eq!(jiyuan.level(), Level::County);
    assert_eq!(jiyuan.county_count(), 0);

    let zhuhai = table.province(440000).unwrap().city(440400).unwrap();
    let counties: Vec<&str> = zhuhai.counties().map(|c| c.name.as_str()).collect();
    assert_eq!(counties, vec!["香洲区", "斗门区"]);
    let xiangzhou = zhuhai.county(440402).unwrap();
    assert_eq!((xiangzhou.parent, xiangzhou.grandparent), (440400, 440000));
}

#[test]
fn child_before_parent_aborts_the_load() {
    let (_dir, path) = fixture("440400,珠海市\n440000,广东省\n");
    let err = load_file(&path).unwrap_err();
    assert!(matches!(
        err,
        LoadError::MissingProvince {
            line: 1,
            code: 440400,
            province: 440000
        }
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_file(dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}

#[test]
fn writes_every_projection() {
    let (dir, path) = fixture(DATA);
    let table = load_file(&path).unwrap();

    let json_path = dir.path().join("district.json");
    write_json_file(&table, &json_path, &JsonOptions::pretty()).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["provinces"][0]["name"], "北京市");
    assert_eq!(json["provinces"][0]["municipality"], true);
    assert_eq!(json["provinces"][1]["cities"][1]["county_city"], true);
    assert_eq!(json["provinces"][2]["cities"][0]["counties"][0]["code"], 440402);

    let csv_path = dir.path().join("district.csv.out");
    let options = CsvOptions {
        leaves_only: true,
        ..CsvOptions::default()
    };
    write_csv_file(&table, &csv_path, &options).unwrap();
    let csv = fs::read_to_string(&csv_path).unwrap();
    assert!(csv.contains("河南省,济源市\n"));
    assert!(csv.contains("广东省,东莞市\n"));
    assert!(!csv.contains("广东省,珠海市\n"));

    let sql_path = dir.path().join("district.sql");
    write_sql_file(&table, &sql_path, &SqlOptions::default()).unwrap();
    let sql = fs::read_to_string(&sql_path).unwrap();
    assert_eq!(sql.matches("),\n(").count() + 1, table.records().len());
    assert!(sql.contains("(410000,419001,0,3,'河南省','济源市','')"));
    assert!(sql.ends_with(';'));
}
