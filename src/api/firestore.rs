//! Implements `RecordStore` against the Firestore REST API.

use super::wire::{self, Document, CREATED_AT, DATE};
use super::{http_client, parse_base_url, Filter, RecordStore, Session};
use crate::model::{Collection, NewRecord, Record, RecordPatch};
use crate::{Config, Result};
use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1/";

pub struct FirestoreStore {
    client: Client,
    base: Url,
    /// `projects/{project}/databases/(default)`
    database: String,
    id_token: String,
}

impl FirestoreStore {
    pub fn new(config: &Config, session: &Session) -> Result<Self> {
        let settings = config.store();
        let project = settings
            .project_id
            .as_deref()
            .context("The config file does not name a Firestore project")?;
        let base = parse_base_url(settings.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        Ok(Self {
            client: http_client(config)?,
            base,
            database: format!("projects/{project}/databases/(default)"),
            id_token: session.id_token().to_string(),
        })
    }

    fn documents_root(&self) -> String {
        format!("{}/documents", self.database)
    }

    fn document_name(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}/{id}", self.documents_root(), collection.name())
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Unable to build a Firestore URL for '{path}'"))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        trace!("{method} {url}");
        self.client
            .request(method, url)
            .bearer_auth(&self.id_token)
    }
}

#[async_trait]
impl RecordStore for FirestoreStore {
    async fn create(&self, record: NewRecord, user_id: &str) -> Result<String> {
        let collection = record.collection();
        let id = new_document_id();
        let fields = wire::new_record_fields(&record, user_id);
        let body = commit_body(&self.document_name(collection, &id), fields);

        let url = self.url(&format!("{}:commit", self.documents_root()))?;
        let response = self.request(Method::POST, url).json(&body).send().await;
        check(response)
            .await
            .with_context(|| format!("Failed to add a record to {collection}"))?;
        debug!("Created {collection}/{id}");
        Ok(id)
    }

    async fn query(&self, collection: Collection, filter: &Filter) -> Result<Vec<Record>> {
        let body = json!({ "structuredQuery": structured_query(collection, filter) });
        let url = self.url(&format!("{}:runQuery", self.documents_root()))?;
        let response = self.request(Method::POST, url).json(&body).send().await;
        let items: Vec<RunQueryItem> = check(response)
            .await
            .with_context(|| format!("Failed to query {collection}"))?
            .json()
            .await
            .with_context(|| format!("Unable to parse the {collection} query response"))?;

        items
            .iter()
            .filter_map(|item| item.document.as_ref())
            .map(|doc| {
                wire::record_from_document(collection, doc)
                    .with_context(|| format!("Unable to read document '{}'", doc.name))
            })
            .collect()
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<()> {
        let collection = patch.collection();
        let (fields, mask) = wire::patch_fields(&patch);
        if mask.is_empty() {
            bail!("There is nothing to update");
        }
        let mut url = self.url(&self.document_name(collection, id))?;
        {
            let mut pairs = url.query_pairs_mut();
            for path in &mask {
                pairs.append_pair("updateMask.fieldPaths", path);
            }
            pairs.append_pair("currentDocument.exists", "true");
        }
        let body = Document {
            fields,
            ..Document::default()
        };
        let response = self.request(Method::PATCH, url).json(&body).send().await;
        check(response)
            .await
            .with_context(|| format!("Failed to update {id} in {collection}"))?;
        debug!("Updated {collection}/{id} ({})", mask.join(", "));
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let mut url = self.url(&self.document_name(collection, id))?;
        url.query_pairs_mut()
            .append_pair("currentDocument.exists", "true");
        let response = self.request(Method::DELETE, url).send().await;
        check(response)
            .await
            .with_context(|| format!("Failed to delete {id} from {collection}"))?;
        debug!("Deleted {collection}/{id}");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

/// Turns a transport failure or a non-success status into an error that carries the server's
/// explanation.
async fn check(response: reqwest::Result<Response>) -> Result<Response> {
    let response = response.context("Unable to reach Firestore")?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody { error }) => bail!("{status} {}: {}", error.status, error.message),
        Err(_) => bail!("{status}: {body}"),
    }
}

/// Document ids are picked on the client, as Firestore's own client libraries do.
fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()[..20].to_string()
}

/// A commit that creates the document `name` with `fields`, has the server stamp `createdAt`, and
/// fails if the document already exists.
fn commit_body(name: &str, fields: wire::Fields) -> Value {
    json!({
        "writes": [{
            "update": { "name": name, "fields": fields },
            "updateTransforms": [{
                "fieldPath": CREATED_AT,
                "setToServerValue": "REQUEST_TIME",
            }],
            "currentDocument": { "exists": false },
        }]
    })
}

fn structured_query(collection: Collection, filter: &Filter) -> Value {
    let mut query = json!({
        "from": [{ "collectionId": collection.name() }],
        "orderBy": [{ "field": { "fieldPath": DATE }, "direction": "DESCENDING" }],
    });

    if let Some(range) = filter.range {
        // Dates are stored as local midnight, so the day after `end` bounds the range.
        let start = wire::local_midnight(range.start());
        let after_end = range
            .end()
            .succ_opt()
            .map(wire::local_midnight)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC);
        query["where"] = json!({
            "compositeFilter": {
                "op": "AND",
                "filters": [
                    date_filter("GREATER_THAN_OR_EQUAL", start),
                    date_filter("LESS_THAN", after_end),
                ],
            }
        });
    }
    if let Some(limit) = filter.limit {
        query["limit"] = json!(limit);
    }
    query
}

fn date_filter(op: &str, instant: chrono::DateTime<chrono::Utc>) -> Value {
    json!({
        "fieldFilter": {
            "field": { "fieldPath": DATE },
            "op": op,
            "value": wire::timestamp_value(instant),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DateRange;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_base_url() {
        let base = parse_base_url("http://localhost:8080/v1").unwrap();
        assert_eq!(base.as_str(), "http://localhost:8080/v1/");
        let url = base
            .join("projects/p/databases/(default)/documents:runQuery")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/v1/projects/p/databases/(default)/documents:runQuery"
        );
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_new_document_id() {
        let a = new_document_id();
        let b = new_document_id();
        assert_eq!(a.len(), 20);
        assert_ne!(a, b);
    }

    #[test]
    fn test_commit_body() {
        let body = commit_body("projects/p/databases/(default)/documents/tithe_records/x", {
            let mut fields = wire::Fields::new();
            fields.insert("memberName".to_string(), json!({"stringValue": "Paul"}));
            fields
        });
        let write = &body["writes"][0];
        assert_eq!(write["currentDocument"]["exists"], json!(false));
        assert_eq!(write["updateTransforms"][0]["fieldPath"], json!("createdAt"));
        assert_eq!(
            write["updateTransforms"][0]["setToServerValue"],
            json!("REQUEST_TIME")
        );
        assert_eq!(
            write["update"]["fields"]["memberName"]["stringValue"],
            json!("Paul")
        );
    }

    #[test]
    fn test_structured_query_all() {
        let query = structured_query(Collection::Expenses, &Filter::all());
        assert_eq!(query["from"][0]["collectionId"], json!("expense_records"));
        assert_eq!(query["orderBy"][0]["direction"], json!("DESCENDING"));
        assert!(query.get("where").is_none());
        assert!(query.get("limit").is_none());
    }

    #[test]
    fn test_structured_query_range_and_limit() {
        let range = DateRange::new(date("2024-01-01"), date("2024-01-31"));
        let query = structured_query(
            Collection::Income,
            &Filter::within(range).with_limit(Some(5)),
        );
        let filters = &query["where"]["compositeFilter"]["filters"];
        assert_eq!(filters[0]["fieldFilter"]["op"], json!("GREATER_THAN_OR_EQUAL"));
        assert_eq!(
            filters[0]["fieldFilter"]["value"],
            wire::timestamp_value(wire::local_midnight(date("2024-01-01")))
        );
        assert_eq!(filters[1]["fieldFilter"]["op"], json!("LESS_THAN"));
        assert_eq!(
            filters[1]["fieldFilter"]["value"],
            wire::timestamp_value(wire::local_midnight(date("2024-02-01")))
        );
        assert_eq!(query["limit"], json!(5));
    }

    #[test]
    fn test_parse_run_query_response() {
        let items: Vec<RunQueryItem> = serde_json::from_value(json!([
            { "readTime": "2024-06-01T00:00:00Z" }
        ]))
        .unwrap();
        assert!(items[0].document.is_none());
    }
}
