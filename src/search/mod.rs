//! Tantivy-based search index module.
//!
//! Full-text search over evidence titles, descriptions, types, standards and tags.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::EvidenceRecord;

const BOOST_TITLE: f32 = 10.0;
const BOOST_TAGS: f32 = 6.0;
const BOOST_TYPE: f32 = 5.0;
const BOOST_STANDARD: f32 = 4.0;
const BOOST_DESCRIPTION: f32 = 3.0;

/// Search hit with relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub evidence_id: String,
    pub score: f32,
}

struct SearchFields {
    evidence_id: Field,
    title: Field,
    description: Field,
    evidence_type: Field,
    standard: Field,
    tags: Field,
}

/// Tantivy search index for evidence.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        let evidence_id = schema_builder.add_text_field("evidence_id", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT);
        let description = schema_builder.add_text_field("description", TEXT);
        let evidence_type = schema_builder.add_text_field("type", TEXT);
        let standard = schema_builder.add_text_field("standard", TEXT);
        let tags = schema_builder.add_text_field("tags", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            evidence_id,
            title,
            description,
            evidence_type,
            standard,
            tags,
        };

        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000)
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Replace the index contents with `records`.
    pub async fn rebuild(&self, records: &[EvidenceRecord]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for record in records {
            writer.add_document(self.create_document(record))?;
        }
        writer.commit()?;
        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} evidence records", records.len());
        Ok(())
    }

    /// Index a single record, replacing any earlier document with the same id.
    pub async fn index_evidence(&self, record: &EvidenceRecord) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        let term = tantivy::Term::from_field_text(self.fields.evidence_id, &record.id);
        writer.delete_term(term);
        writer.add_document(self.create_document(record))?;
        writer.commit()?;
        self.reader.reload()?;

        Ok(())
    }

    /// Search for evidence matching the query.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        if query_str.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        // Tantivy rejects an empty window and sizes its heap from the limit.
        let num_docs = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
        if offset >= num_docs {
            return Ok(Vec::new());
        }
        let window = limit.saturating_add(offset).min(num_docs);

        let field_boosts = [
            (self.fields.title, BOOST_TITLE),
            (self.fields.tags, BOOST_TAGS),
            (self.fields.evidence_type, BOOST_TYPE),
            (self.fields.standard, BOOST_STANDARD),
            (self.fields.description, BOOST_DESCRIPTION),
        ];

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();
        for (field, boost) in field_boosts {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        let query: Box<dyn tantivy::query::Query> = if subqueries.is_empty() {
            let all_fields = field_boosts.iter().map(|(field, _)| *field).collect();
            QueryParser::for_index(&self.index, all_fields)
                .parse_query(query_str)
                .map_err(|e| AppError::Search(format!("Invalid search query: {}", e)))?
        } else {
            Box::new(BooleanQuery::new(subqueries))
        };

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(window))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let evidence_id = doc.get_first(self.fields.evidence_id)?.as_str()?.to_string();
                Some(SearchResult { evidence_id, score })
            })
            .collect();

        Ok(results)
    }

    fn create_document(&self, record: &EvidenceRecord) -> TantivyDocument {
        doc!(
            self.fields.evidence_id => record.id.clone(),
            self.fields.title => record.title.clone(),
            self.fields.description => record.description.clone(),
            self.fields.evidence_type => record.evidence_type.clone(),
            self.fields.standard => record.standard_id.clone().unwrap_or_default(),
            self.fields.tags => record.tags.join(" ")
        )
    }
}
