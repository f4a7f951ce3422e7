use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use district_table::lookup::{DistrictCache, SqliteDistrictStore, DEFAULT_CAPACITY};
use district_table::output::{
    write_csv_file, write_json_file, write_sql_file, write_xlsx_file, CsvOptions, JsonOptions,
    SqlOptions, DEFAULT_TABLE_NAME,
};
use district_table::{
    load_file, AddressIndex, Code, DistrictQuery, Name, QueryConfig, SearchWeights, Table,
};

/// 行政区划代码表生成与查询工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 行政区数据文件，每行 `代码,名称`
    #[arg(short, long)]
    file: PathBuf,

    #[arg(long)]
    with_json: bool,

    #[arg(long, default_value = "district.json")]
    json_file: PathBuf,

    /// 缩进字符串，不设置时输出紧凑格式
    #[arg(long)]
    json_indent: Option<String>,

    #[arg(long)]
    with_csv: bool,

    #[arg(long, default_value = "district.csv")]
    csv_file: PathBuf,

    #[arg(long, default_value_t = ',')]
    csv_delimiter: char,

    /// 首列输出行政区代码
    #[arg(long)]
    csv_with_code: bool,

    /// 只输出叶子节点
    #[arg(long)]
    csv_leaves_only: bool,

    #[arg(long)]
    with_sql: bool,

    #[arg(long, default_value = "district.sql")]
    sql_file: PathBuf,

    #[arg(long, default_value = DEFAULT_TABLE_NAME)]
    sql_table: String,

    /// 使用 INSERT IGNORE
    #[arg(long)]
    sql_ignore: bool,

    #[arg(long)]
    with_xlsx: bool,

    #[arg(long, default_value = "district.xlsx")]
    xlsx_file: PathBuf,

    /// 按名称全文搜索
    #[arg(long)]
    search: Option<String>,

    /// 导入到 SQLite 数据库文件；查询时不设置则使用内存数据库
    #[arg(long)]
    sqlite: Option<PathBuf>,

    /// 按名称查代码，格式 `省,市,县`
    #[arg(long)]
    lookup_name: Option<String>,

    /// 按代码查名称，格式 `省,市,县`
    #[arg(long)]
    lookup_code: Option<String>,

    /// 查询市下辖区县数量，格式 `省,市`
    #[arg(long)]
    county_count: Option<String>,

    #[arg(long, default_value_t = QueryConfig::default().expire_seconds)]
    expire_seconds: u64,

    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    cache_capacity: usize,

    /// 查询结束后输出缓存度量
    #[arg(long)]
    metrics: bool,
}

impl Args {
    fn wants_lookup(&self) -> bool {
        self.lookup_name.is_some() || self.lookup_code.is_some() || self.county_count.is_some()
    }

    fn has_action(&self) -> bool {
        self.with_json
            || self.with_csv
            || self.with_sql
            || self.with_xlsx
            || self.search.is_some()
            || self.sqlite.is_some()
            || self.wants_lookup()
    }
}

fn parse_name(text: &str) -> Name {
    let mut parts = text.splitn(3, ',').map(str::trim);
    let province = parts.next().unwrap_or("");
    let city = parts.next().unwrap_or("");
    let county = parts.next().unwrap_or("");
    Name::new(province, city, county).normalized()
}

fn parse_code(text: &str) -> anyhow::Result<Code> {
    let mut codes = [0u32; 3];
    for (slot, field) in codes.iter_mut().zip(text.splitn(3, ',')) {
        let field = field.trim();
        if !field.is_empty() {
            *slot = field
                .parse()
                .with_context(|| format!("invalid district code: {field}"))?;
        }
    }
    Ok(Code::new(codes[0], codes[1], codes[2]))
}

fn generate(table: &Table, args: &Args) -> anyhow::Result<()> {
    if args.with_json {
        let options = JsonOptions {
            indent: args.json_indent.clone(),
        };
        write_json_file(table, &args.json_file, &options).context("generate json")?;
    }
    if args.with_csv {
        let options = CsvOptions {
            delimiter: args.csv_delimiter,
            with_code: args.csv_with_code,
            leaves_only: args.csv_leaves_only,
        };
        write_csv_file(table, &args.csv_file, &options).context("generate csv")?;
    }
    if args.with_sql {
        let options = SqlOptions {
            table_name: args.sql_table.clone(),
            ignore: args.sql_ignore,
        };
        write_sql_file(table, &args.sql_file, &options).context("generate sql")?;
    }
    if args.with_xlsx {
        write_xlsx_file(table, &args.xlsx_file).context("generate xlsx")?;
    }
    Ok(())
}

fn search(table: &Table, text: &str) -> anyhow::Result<()> {
    let index = AddressIndex::build(table, SearchWeights::default())?;
    let hits = index.search(text, 10)?;
    println!("找到 {} 条结果:", hits.len());
    for hit in &hits {
        println!("{} ({:.3})", hit, hit.score);
    }
    Ok(())
}

fn lookup(table: &Table, args: &Args) -> anyhow::Result<()> {
    let store = match &args.sqlite {
        Some(path) => SqliteDistrictStore::open(path, &args.sql_table)?,
        None => SqliteDistrictStore::open_in_memory(&args.sql_table)?,
    };
    store.create_table()?;
    store.import_table(table)?;

    if !args.wants_lookup() {
        return Ok(());
    }

    let cache = Arc::new(DistrictCache::new(args.cache_capacity));
    let config = QueryConfig {
        expire_seconds: args.expire_seconds,
    };
    let query = DistrictQuery::new(store, cache, config);

    if let Some(text) = &args.lookup_name {
        let name = parse_name(text);
        match query.get_district_code(&name)? {
            Some(code) => println!("{}", serde_json::to_string(&code)?),
            None => println!("未找到: {}", text),
        }
    }
    if let Some(text) = &args.lookup_code {
        let code = parse_code(text)?;
        match query.get_district_name(&code)? {
            Some(name) => println!("{}", serde_json::to_string(&name)?),
            None => println!("未找到: {}", text),
        }
    }
    if let Some(text) = &args.county_count {
        let name = parse_name(text);
        let count = query.get_county_count(&name.province_name, &name.city_name)?;
        println!("{}", count);
    }
    if args.metrics {
        println!("{}", query.metrics());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if !args.has_action() {
        bail!("do nothing");
    }

    let table = load_file(&args.file)
        .with_context(|| format!("load district from {}", args.file.display()))?;
    info!(
        "已加载 {} 个省级、{} 个市级、{} 个县级行政区",
        table.province_count(),
        table.city_count(),
        table.county_count()
    );

    generate(&table, &args)?;
    if let Some(text) = &args.search {
        search(&table, text)?;
    }
    if args.sqlite.is_some() || args.wants_lookup() {
        lookup(&table, &args)?;
    }
    Ok(())
}
