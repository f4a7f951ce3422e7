use std::fmt;

use anyhow::Context;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, TermQuery};
use tantivy::schema::*;
use tantivy::tokenizer::{TokenStream, Tokenizer};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tantivy_jieba::JiebaTokenizer;
use tracing::{debug, info};

use crate::table::Table;

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// 字段权重配置，下级字段命中时得分更高
#[derive(Debug, Clone)]
pub struct SearchWeights {
    pub province: f32,
    pub city: f32,
    pub county: f32,
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            province: 1.0,
            city: 2.0,
            county: 4.0,
        }
    }
}

/// 搜索结果，名称为空表示该级不存在
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub code: u32,
    pub province: String,
    pub city: String,
    pub county: String,
    pub score: f32,
}

impl fmt::Display for SearchHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "编码: {} | 省: {} | 市: {} | 县: {}",
            self.code, self.province, self.city, self.county
        )
    }
}

/// 行政区名称的全文索引，每个节点一个文档
pub struct AddressIndex {
    reader: IndexReader,
    province: Field,
    city: Field,
    county: Field,
    address_code: Field,
    weights: SearchWeights,
}

impl AddressIndex {
    /// 在内存中为整张表建立索引
    pub fn build(table: &Table, weights: SearchWeights) -> anyhow::Result<Self> {
        let mut schema_builder = Schema::builder();

        // 中文按 jieba 分词，保留词频和位置
        let text_indexing = TextFieldIndexing::default()
            .set_tokenizer("jieba")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let text_options = TextOptions::default()
            .set_indexing_options(text_indexing)
            .set_stored();

        let province = schema_builder.add_text_field("province", text_options.clone());
        let city = schema_builder.add_text_field("city", text_options.clone());
        let county = schema_builder.add_text_field("county", text_options);
        let address_code = schema_builder.add_text_field("address_code", STRING | STORED);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        index.tokenizers().register("jieba", JiebaTokenizer {});

        let mut writer: IndexWriter = index.writer(WRITER_HEAP_BYTES)?;
        let mut documents = 0usize;
        for p in table.provinces() {
            writer.add_document(doc!(
                province => p.name(),
                city => "",
                county => "",
                address_code => p.code().to_string()
            ))?;
            documents += 1;
            for c in p.cities() {
                writer.add_document(doc!(
                    province => p.name(),
                    city => c.name(),
                    county => "",
                    address_code => c.code().to_string()
                ))?;
                documents += 1;
                for k in c.counties() {
                    writer.add_document(doc!(
                        province => p.name(),
                        city => c.name(),
                        county => k.name.as_str(),
                        address_code => k.code.to_string()
                    ))?;
                    documents += 1;
                }
            }
        }
        writer.commit()?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        reader.reload()?;
        info!("索引建立完成，共 {} 个文档", documents);

        Ok(Self {
            reader,
            province,
            city,
            county,
            address_code,
            weights,
        })
    }

    pub fn weights(&self) -> &SearchWeights {
        &self.weights
    }

    /// 查询文本先按 jieba 分词，每个词在三个字段上各成一个加权子句，任一命中即可
    fn build_query(&self, query_str: &str) -> BooleanQuery {
        let mut words: Vec<String> = Vec::new();
        let mut tokenizer = JiebaTokenizer {};
        let mut stream = tokenizer.token_stream(query_str);
        while let Some(token) = stream.next() {
            let word = token.text.trim();
            if word.chars().any(char::is_alphanumeric) && !words.iter().any(|w| w == word) {
                words.push(word.to_string());
            }
        }

        let fields = [
            (self.province, self.weights.province),
            (self.city, self.weights.city),
            (self.county, self.weights.county),
        ];
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for word in &words {
            for (field, boost) in fields {
                let term = TermQuery::new(
                    Term::from_field_text(field, word),
                    IndexRecordOption::WithFreqs,
                );
                let clause: Box<dyn Query> = Box::new(BoostQuery::new(Box::new(term), boost));
                clauses.push((Occur::Should, clause));
            }
        }
        BooleanQuery::new(clauses)
    }

    fn text(&self, doc: &TantivyDocument, field: Field) -> String {
        doc.get_first(field)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    }

    /// 按得分从高到低返回至多 `limit` 个结果
    pub fn search(&self, query_str: &str, limit: usize) -> anyhow::Result<Vec<SearchHit>> {
        let searcher = self.reader.searcher();
        let query = self.build_query(query_str);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit.max(1)))?;
        debug!("{} 命中 {} 个文档", query_str, top_docs.len());

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let retrieved: TantivyDocument = searcher.doc(doc_address)?;
            let code = self.text(&retrieved, self.address_code);
            hits.push(SearchHit {
                code: code
                    .parse()
                    .with_context(|| format!("invalid address code in index: {code}"))?,
                province: self.text(&retrieved, self.province),
                city: self.text(&retrieved, self.city),
                county: self.text(&retrieved, self.county),
                score,
            });
        }
        Ok(hits)
    }

    /// 得分最高的结果
    pub fn search_first(&self, query_str: &str) -> anyhow::Result<Option<SearchHit>> {
        Ok(self.search(query_str, 1)?.into_iter().next())
    }
}
