//! Tantivy-based search index module.
//!
//! Holds the current tender set (manual and automatic) in an in-memory index with
//! field boosting. Each document stores the full tender as JSON.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{Tender, TenderOrigin};

/// Field boost values.
const BOOST_TITLE: f32 = 10.0;
const BOOST_KEYWORDS: f32 = 8.0;
const BOOST_ORGANIZATION: f32 = 6.0;
const BOOST_DESCRIPTION: f32 = 4.0;
const BOOST_COUNTRY: f32 = 2.0;

/// A search hit with its relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub tender: Tender,
    pub score: f32,
}

/// One page of hits plus the total match count.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    pub total: usize,
}

struct SearchFields {
    tender_id: Field,
    origin: Field,
    title: Field,
    organization: Field,
    description: Field,
    keywords: Field,
    country: Field,
    payload: Field,
}

/// Tantivy search index for tenders.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
    automatic_loaded: AtomicBool,
}

impl SearchIndex {
    /// Create an empty in-memory index.
    pub fn in_memory() -> Result<Self, AppError> {
        let mut schema_builder = Schema::builder();
        let tender_id = schema_builder.add_text_field("tender_id", STRING | STORED);
        let origin = schema_builder.add_text_field("origin", STRING);
        let title = schema_builder.add_text_field("title", TEXT);
        let organization = schema_builder.add_text_field("organization", TEXT);
        let description = schema_builder.add_text_field("description", TEXT);
        let keywords = schema_builder.add_text_field("keywords", TEXT);
        let country = schema_builder.add_text_field("country", TEXT);
        let payload = schema_builder.add_text_field("payload", STORED);
        let schema = schema_builder.build();

        let fields = SearchFields {
            tender_id,
            origin,
            title,
            organization,
            description,
            keywords,
            country,
            payload,
        };

        let index = Index::create_in_ram(schema);

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
            automatic_loaded: AtomicBool::new(false),
        })
    }

    /// Replace every automatic tender with `tenders`, keeping manual ones.
    pub async fn replace_automatic(&self, tenders: &[Tender]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(
            self.fields.origin,
            origin_label(TenderOrigin::Automatic),
        ));
        for tender in tenders.iter().filter(|t| t.origin == TenderOrigin::Automatic) {
            writer.delete_term(Term::from_field_text(self.fields.tender_id, &tender.id));
            writer.add_document(self.create_document(tender)?)?;
        }

        writer.commit()?;
        self.reader.reload()?;
        self.automatic_loaded.store(true, Ordering::Release);

        tracing::debug!("Search index holds {} automatic tenders", tenders.len());
        Ok(())
    }

    /// Index a batch of tenders in one commit.
    pub async fn index_tenders(&self, tenders: &[Tender]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        for tender in tenders {
            writer.delete_term(Term::from_field_text(self.fields.tender_id, &tender.id));
            writer.add_document(self.create_document(tender)?)?;
        }
        writer.commit()?;

        self.reader.reload()?;

        tracing::info!("Search index loaded {} tenders", tenders.len());
        Ok(())
    }

    /// Index or reindex a single tender.
    pub async fn index_tender(&self, tender: &Tender) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        let term = Term::from_field_text(self.fields.tender_id, &tender.id);
        writer.delete_term(term);
        writer.add_document(self.create_document(tender)?)?;
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Remove a tender from the index.
    pub async fn remove_tender(&self, tender_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        let term = Term::from_field_text(self.fields.tender_id, tender_id);
        writer.delete_term(term);
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Number of indexed tenders.
    pub fn len(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Whether automatic tenders have been loaded since startup.
    pub fn has_automatic(&self) -> bool {
        self.automatic_loaded.load(Ordering::Acquire)
    }

    /// Look a tender up by id.
    pub fn get_tender(&self, tender_id: &str) -> Result<Option<Tender>, AppError> {
        let searcher = self.reader.searcher();
        let query = TermQuery::new(
            Term::from_field_text(self.fields.tender_id, tender_id),
            IndexRecordOption::Basic,
        );

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(1))
            .map_err(|e| AppError::Search(format!("Lookup failed: {}", e)))?;

        let Some((_, doc_address)) = top_docs.into_iter().next() else {
            return Ok(None);
        };
        let doc: TantivyDocument = searcher.doc(doc_address)?;
        let payload = doc
            .get_first(self.fields.payload)
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::Search(format!("Tender {} has no payload", tender_id)))?;
        let tender = serde_json::from_str(payload)
            .map_err(|e| AppError::Search(format!("Corrupt tender payload: {}", e)))?;

        Ok(Some(tender))
    }

    /// Search tenders matching the query.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<SearchPage, AppError> {
        if query_str.trim().is_empty() {
            return Ok(SearchPage {
                results: Vec::new(),
                total: 0,
            });
        }

        let searcher = self.reader.searcher();

        let field_queries = [
            (self.fields.title, BOOST_TITLE),
            (self.fields.keywords, BOOST_KEYWORDS),
            (self.fields.organization, BOOST_ORGANIZATION),
            (self.fields.description, BOOST_DESCRIPTION),
            (self.fields.country, BOOST_COUNTRY),
        ];

        let mut query_parser = QueryParser::for_index(
            &self.index,
            field_queries.iter().map(|(field, _)| *field).collect(),
        );
        query_parser.set_conjunction_by_default();
        let base_query = query_parser
            .parse_query(query_str)
            .map_err(|e| AppError::Validation(format!("Invalid search query: {}", e)))?;

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();
        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                let boosted = BoostQuery::new(field_query, boost);
                subqueries.push((Occur::Should, Box::new(boosted)));
            }
        }

        // Every term must match somewhere; per-field boosts only rank.
        let combined_query = BooleanQuery::new(vec![
            (Occur::Must, base_query),
            (Occur::Should, Box::new(BooleanQuery::new(subqueries))),
        ]);

        let (top_docs, total) = searcher
            .search(
                &combined_query,
                &(TopDocs::with_limit((limit + offset).max(1)), Count),
            )
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let payload = doc.get_first(self.fields.payload)?.as_str()?;
                let tender = serde_json::from_str(payload).ok()?;
                Some(SearchResult { tender, score })
            })
            .collect();

        Ok(SearchPage { results, total })
    }

    fn create_document(&self, tender: &Tender) -> Result<TantivyDocument, AppError> {
        let payload = serde_json::to_string(tender)
            .map_err(|e| AppError::Internal(format!("Failed to encode tender: {}", e)))?;

        let keywords = tender
            .matched_keywords
            .iter()
            .chain(tender.cpv_codes.iter())
            .chain(std::iter::once(&tender.category))
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");

        Ok(doc!(
            self.fields.tender_id => tender.id.clone(),
            self.fields.origin => origin_label(tender.origin).to_string(),
            self.fields.title => tender.title.clone(),
            self.fields.organization => tender.organization.clone(),
            self.fields.description => tender.description.clone(),
            self.fields.keywords => keywords,
            self.fields.country => tender.country.clone(),
            self.fields.payload => payload
        ))
    }
}

fn origin_label(origin: TenderOrigin) -> &'static str {
    match origin {
        TenderOrigin::Manual => "manual",
        TenderOrigin::Automatic => "automatic",
    }
}
