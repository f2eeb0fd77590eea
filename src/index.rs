//! Local full-text search over article metadata.
//!
//! [`ArticleIndex`] keeps one tantivy sub-index per named schema, built
//! from the `(field, type, stored)` triples an [`ArticleKind`] publishes
//! (see [`ArticleKind::full_schema`]). Documents arrive as the flat string
//! maps produced by [`Article::index_document`]; numeric and boolean fields
//! parse their string form, and values that do not parse are skipped rather
//! than failing the write. Datetime fields index the raw timestamp string.
//!
//! [`Article::index_document`]: crate::Article::index_document
//!
//! # Example
//!
//! ```
//! use figlib::{ArticleIndex, ArticleKind};
//! use std::collections::BTreeMap;
//!
//! let index = ArticleIndex::in_memory();
//! index
//!     .create_schema("local_articles", &ArticleKind::StmTopography.full_schema())
//!     .unwrap();
//!
//! let mut doc = BTreeMap::new();
//! doc.insert("id".to_string(), "local_1".to_string());
//! doc.insert("title".to_string(), "corral.Z_flat".to_string());
//! doc.insert("sample".to_string(), "Cu(111) with CO adsorbates".to_string());
//! index.add_document("local_articles", &doc).unwrap();
//!
//! let hits = index.search("local_articles", "sample", "adsorbates", 10).unwrap();
//! assert_eq!(hits[0].fields["id"], "local_1");
//! ```

use crate::kind::{IndexFieldType, SchemaField};
use crate::{ArticleError, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{
    Field, IndexRecordOption, NumericOptions, Schema, SchemaBuilder, TextFieldIndexing, TextOptions,
    Value as _, FAST, INDEXED, STORED, STRING,
};
use tantivy::tokenizer::{
    LowerCaser, NgramTokenizer, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer,
};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// One search result: the match score plus every stored field.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub score: f32,
    pub fields: BTreeMap<String, String>,
}

struct SchemaHandle {
    index: Index,
    reader: IndexReader,
    schema: Schema,
    writer: Mutex<IndexWriter>,
    specs: Vec<(String, IndexFieldType, bool)>,
}

/// A named-schema search index over article metadata.
///
/// Lives either entirely in memory or under a root directory with one
/// sub-directory per schema.
pub struct ArticleIndex {
    root: Option<PathBuf>,
    schemas: RwLock<HashMap<String, Arc<SchemaHandle>>>,
}

impl ArticleIndex {
    /// An index that lives only for the session.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            root: None,
            schemas: RwLock::new(HashMap::new()),
        }
    }

    /// An index persisted under `root`, one sub-directory per schema.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root: Some(root),
            schemas: RwLock::new(HashMap::new()),
        })
    }

    /// Registers a schema and prepares its sub-index.
    pub fn create_schema(&self, name: &str, fields: &[SchemaField]) -> Result<()> {
        let mut builder = SchemaBuilder::new();
        for (field, ftype, stored) in fields {
            add_schema_field(&mut builder, field, *ftype, *stored);
        }
        let schema = builder.build();

        let index = match &self.root {
            None => Index::create_in_ram(schema.clone()),
            Some(root) => {
                let dir = root.join(name);
                if dir.join("meta.json").is_file() {
                    Index::open_in_dir(&dir)?
                } else {
                    std::fs::create_dir_all(&dir)?;
                    Index::create_in_dir(&dir, schema.clone())?
                }
            }
        };
        configure_tokenizers(&index);

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer = index.writer(WRITER_HEAP_BYTES)?;

        let handle = SchemaHandle {
            schema: index.schema(),
            index,
            reader,
            writer: Mutex::new(writer),
            specs: fields
                .iter()
                .map(|(field, ftype, stored)| (field.to_string(), *ftype, *stored))
                .collect(),
        };
        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::new(handle));
        Ok(())
    }

    /// Names of the registered schemas.
    pub fn schema_names(&self) -> Vec<String> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Field names of a schema, in registration order.
    pub fn fields_of(&self, schema: &str) -> Result<Vec<String>> {
        let handle = self.handle(schema)?;
        Ok(handle.specs.iter().map(|(name, _, _)| name.clone()).collect())
    }

    /// Adds one document from a flat string map.
    ///
    /// Keys outside the schema are ignored; numeric and boolean values that
    /// fail to parse are skipped.
    pub fn add_document(&self, schema: &str, document: &BTreeMap<String, String>) -> Result<()> {
        let handle = self.handle(schema)?;
        let doc = build_document(&handle, document);

        let mut writer = handle.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.add_document(doc)?;
        writer.commit()?;
        handle.reader.reload()?;
        Ok(())
    }

    /// Replaces the document whose `id` field matches the map's `id` value.
    pub fn update_document(&self, schema: &str, document: &BTreeMap<String, String>) -> Result<()> {
        let handle = self.handle(schema)?;
        let id = document.get("id").ok_or_else(|| {
            ArticleError::Index("update requires an id field in the document".into())
        })?;
        let id_field = handle
            .schema
            .get_field("id")
            .map_err(|_| ArticleError::Index(format!("schema {schema} has no id field")))?;
        let doc = build_document(&handle, document);

        let mut writer = handle.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.delete_term(Term::from_field_text(id_field, id));
        writer.add_document(doc)?;
        writer.commit()?;
        handle.reader.reload()?;
        Ok(())
    }

    /// Deletes the document with the given `id` field value.
    pub fn remove_document(&self, schema: &str, id: &str) -> Result<()> {
        let handle = self.handle(schema)?;
        let id_field = handle
            .schema
            .get_field("id")
            .map_err(|_| ArticleError::Index(format!("schema {schema} has no id field")))?;

        let mut writer = handle.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.delete_term(Term::from_field_text(id_field, id));
        writer.commit()?;
        handle.reader.reload()?;
        Ok(())
    }

    /// Searches one field, or every text-capable field when `field` is
    /// empty, returning stored fields ranked by score.
    pub fn search(
        &self,
        schema: &str,
        field: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let handle = self.handle(schema)?;
        let searcher = handle.reader.searcher();

        let default_fields: Vec<Field> = if field.is_empty() {
            handle
                .specs
                .iter()
                .filter(|(_, ftype, _)| {
                    matches!(
                        ftype,
                        IndexFieldType::Text | IndexFieldType::Keyword | IndexFieldType::Ngram
                    )
                })
                .filter_map(|(name, _, _)| handle.schema.get_field(name).ok())
                .collect()
        } else {
            vec![handle
                .schema
                .get_field(field)
                .map_err(|_| ArticleError::Query(format!("no such field: {field}")))?]
        };

        let parser = QueryParser::for_index(&handle.index, default_fields);
        let parsed = parser.parse_query(query)?;
        let top_docs = searcher.search(&*parsed, &TopDocs::with_limit(limit.max(1)))?;

        let mut hits = Vec::new();
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            let mut fields = BTreeMap::new();
            for (name, _, stored) in &handle.specs {
                if !*stored {
                    continue;
                }
                let Ok(schema_field) = handle.schema.get_field(name) else {
                    continue;
                };
                let Some(value) = doc.get_first(schema_field) else {
                    continue;
                };
                let text = if let Some(s) = value.as_str() {
                    s.to_string()
                } else if let Some(f) = value.as_f64() {
                    f.to_string()
                } else if let Some(b) = value.as_bool() {
                    b.to_string()
                } else {
                    continue;
                };
                fields.insert(name.clone(), text);
            }
            hits.push(SearchHit { score, fields });
        }
        Ok(hits)
    }

    fn handle(&self, schema: &str) -> Result<Arc<SchemaHandle>> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(schema)
            .cloned()
            .ok_or_else(|| ArticleError::Index(format!("no such schema: {schema}")))
    }
}

fn add_schema_field(builder: &mut SchemaBuilder, name: &str, ftype: IndexFieldType, stored: bool) {
    match ftype {
        IndexFieldType::Id | IndexFieldType::Datetime => {
            let options = if stored { STRING | STORED } else { STRING };
            builder.add_text_field(name, options);
        }
        IndexFieldType::Text => {
            let mut options = TextOptions::default().set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer("en_stem")
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            );
            if stored {
                options = options.set_stored();
            }
            builder.add_text_field(name, options);
        }
        IndexFieldType::Keyword => {
            let mut options = TextOptions::default().set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer("simple")
                    .set_index_option(IndexRecordOption::WithFreqs),
            );
            if stored {
                options = options.set_stored();
            }
            builder.add_text_field(name, options);
        }
        IndexFieldType::Ngram => {
            let mut options = TextOptions::default().set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer("ngram3")
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            );
            if stored {
                options = options.set_stored();
            }
            builder.add_text_field(name, options);
        }
        IndexFieldType::Numeric => {
            let options: NumericOptions = if stored {
                (INDEXED | FAST | STORED).into()
            } else {
                (INDEXED | FAST).into()
            };
            builder.add_f64_field(name, options);
        }
        IndexFieldType::Boolean => {
            let options: NumericOptions =
                if stored { (INDEXED | STORED).into() } else { INDEXED.into() };
            builder.add_bool_field(name, options);
        }
    }
}

fn configure_tokenizers(index: &Index) {
    let tokenizers = index.tokenizers();
    tokenizers.register(
        "simple",
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .build(),
    );
    tokenizers.register(
        "en_stem",
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(40))
            .filter(LowerCaser)
            .filter(Stemmer::new(tantivy::tokenizer::Language::English))
            .build(),
    );
    tokenizers.register(
        "ngram3",
        TextAnalyzer::builder(NgramTokenizer::new(2, 3, false).expect("valid ngram bounds"))
            .filter(LowerCaser)
            .build(),
    );
}

fn build_document(handle: &SchemaHandle, document: &BTreeMap<String, String>) -> TantivyDocument {
    let mut doc = TantivyDocument::new();
    for (name, ftype, _) in &handle.specs {
        let Some(raw) = document.get(name) else {
            continue;
        };
        let Ok(field) = handle.schema.get_field(name) else {
            continue;
        };
        match ftype {
            IndexFieldType::Numeric => match raw.parse::<f64>() {
                Ok(value) => doc.add_f64(field, value),
                Err(_) => debug!(field = %name, value = %raw, "skipping unparsable numeric value"),
            },
            IndexFieldType::Boolean => match raw.to_ascii_lowercase().parse::<bool>() {
                Ok(value) => doc.add_bool(field, value),
                Err(_) => debug!(field = %name, value = %raw, "skipping unparsable boolean value"),
            },
            _ => doc.add_text(field, raw),
        }
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ArticleKind;
    use pretty_assertions::assert_eq;

    fn topo_doc(id: &str, title: &str, sample: &str, vgap: &str) -> BTreeMap<String, String> {
        let mut doc = BTreeMap::new();
        doc.insert("id".to_string(), id.to_string());
        doc.insert("title".to_string(), title.to_string());
        doc.insert("status".to_string(), "local".to_string());
        doc.insert("sample".to_string(), sample.to_string());
        doc.insert("vgap".to_string(), vgap.to_string());
        doc
    }

    fn topo_index() -> ArticleIndex {
        let index = ArticleIndex::in_memory();
        index
            .create_schema("local_articles", &ArticleKind::StmTopography.full_schema())
            .unwrap();
        index
    }

    #[test]
    fn test_add_and_search_by_field() {
        let index = topo_index();
        index
            .add_document(
                "local_articles",
                &topo_doc("local_1", "corral.Z_flat", "Cu(111) corral", "0.5"),
            )
            .unwrap();
        index
            .add_document(
                "local_articles",
                &topo_doc("local_2", "chain.zad", "Au(788) chains", "1.2"),
            )
            .unwrap();

        let hits = index.search("local_articles", "sample", "corral", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fields["id"], "local_1");
        // Stored numeric fields come back in the hit.
        assert_eq!(hits[0].fields["vgap"], "0.5");
    }

    #[test]
    fn test_empty_field_searches_all_text_fields() {
        let index = topo_index();
        index
            .add_document(
                "local_articles",
                &topo_doc("local_1", "corral.Z_flat", "Cu(111) corral", "0.5"),
            )
            .unwrap();

        let hits = index.search("local_articles", "", "chains OR corral", 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_update_document_replaces_by_id() {
        let index = topo_index();
        index
            .add_document(
                "local_articles",
                &topo_doc("local_1", "corral.Z_flat", "Cu(111) corral", "0.5"),
            )
            .unwrap();
        index
            .update_document(
                "local_articles",
                &topo_doc("local_1", "corral.Z_flat", "Ag(111) terrace", "0.5"),
            )
            .unwrap();

        assert!(index.search("local_articles", "sample", "corral", 10).unwrap().is_empty());
        let hits = index.search("local_articles", "sample", "terrace", 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_remove_document() {
        let index = topo_index();
        index
            .add_document(
                "local_articles",
                &topo_doc("local_1", "corral.Z_flat", "Cu(111) corral", "0.5"),
            )
            .unwrap();
        index.remove_document("local_articles", "local_1").unwrap();

        assert!(index.search("local_articles", "sample", "corral", 10).unwrap().is_empty());
    }

    #[test]
    fn test_unparsable_numeric_values_are_skipped() {
        let index = topo_index();
        index
            .add_document(
                "local_articles",
                &topo_doc("local_1", "corral.Z_flat", "Cu(111)", "not-a-number"),
            )
            .unwrap();

        let hits = index.search("local_articles", "sample", "cu", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(!hits[0].fields.contains_key("vgap"));
    }

    #[test]
    fn test_unknown_schema_is_an_error() {
        let index = ArticleIndex::in_memory();
        let err = index.search("nowhere", "", "q", 5).unwrap_err();
        assert!(matches!(err, ArticleError::Index(_)));
    }

    #[test]
    fn test_on_disk_index_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let index = ArticleIndex::open(dir.path()).unwrap();
        index
            .create_schema("local_articles", &ArticleKind::StmTopography.full_schema())
            .unwrap();
        index
            .add_document(
                "local_articles",
                &topo_doc("local_1", "corral.Z_flat", "Cu(111) corral", "0.5"),
            )
            .unwrap();

        let hits = index.search("local_articles", "sample", "corral", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(index.schema_names(), vec!["local_articles".to_string()]);
        assert_eq!(index.fields_of("local_articles").unwrap().len(), 26);
    }
}
