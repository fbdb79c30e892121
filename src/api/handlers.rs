//! # Request Handlers
//!
//! One dynamic dispatch for the whole surface: the collection and
//! identifier arrive as path segments or query parameters, the method
//! selects the operation. Input validation is ordered so client errors
//! never touch the store: name first, then method/parameter/body checks,
//! then storage access.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::Json;
use bson::{doc, Document};
use futures_util::{stream, StreamExt};
use mongodb::options::{
    FindOneAndReplaceOptions, FindOneAndUpdateOptions, FindOptions, ReturnDocument,
};
use mongodb::Database;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use super::errors::{BridgeError, BridgeResult};
use super::response::{ApiResponse, PageInfo};
use super::server::AppState;
use crate::locator::Located;
use crate::query::assemble;
use crate::resolver::{validate_name, CollectionHandle};
use crate::store::{bson_to_json, doc_to_json, json_to_document};

/// Concurrent sub-fetches during collection listing.
const LIST_FANOUT: usize = 8;

/// `GET/... /api` — collection/id via query parameters only.
pub async fn root_entry(
    State(state): State<Arc<AppState>>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> (StatusCode, Json<ApiResponse>) {
    dispatch(state, method, None, None, params, body).await
}

/// `GET/... /api/{collection}`
pub async fn collection_entry(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> (StatusCode, Json<ApiResponse>) {
    dispatch(state, method, Some(collection), None, params, body).await
}

/// `GET/... /api/{collection}/{id}`
pub async fn document_entry(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> (StatusCode, Json<ApiResponse>) {
    dispatch(state, method, Some(collection), Some(id), params, body).await
}

/// Outcome of a routed operation, before envelope assembly
struct Handled {
    status: StatusCode,
    data: Option<Value>,
    pagination: Option<PageInfo>,
}

impl Handled {
    fn ok(data: Value) -> Self {
        Self {
            status: StatusCode::OK,
            data: Some(data),
            pagination: None,
        }
    }

    fn created(data: Value) -> Self {
        Self {
            status: StatusCode::CREATED,
            data: Some(data),
            pagination: None,
        }
    }

    fn list(data: Value, pagination: PageInfo) -> Self {
        Self {
            status: StatusCode::OK,
            data: Some(data),
            pagination: Some(pagination),
        }
    }

    fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            data: None,
            pagination: None,
        }
    }
}

async fn dispatch(
    state: Arc<AppState>,
    method: Method,
    path_collection: Option<String>,
    path_id: Option<String>,
    params: HashMap<String, String>,
    body: Bytes,
) -> (StatusCode, Json<ApiResponse>) {
    let started = Instant::now();
    let request_id = Uuid::new_v4();

    // Path segments win over query parameters when both are present.
    let collection = path_collection.or_else(|| params.get("collection").cloned());
    let id = path_id.or_else(|| params.get("id").cloned());

    debug!(%method, collection = collection.as_deref(), id = id.as_deref(), "dispatching request");

    let outcome = route(
        &state,
        &method,
        collection.as_deref(),
        id.as_deref(),
        &params,
        &body,
    )
    .await;
    let elapsed = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(handled) => (
            handled.status,
            Json(ApiResponse::success(
                handled.data,
                handled.pagination,
                request_id,
                elapsed,
            )),
        ),
        Err(err) => {
            if err.status_code().is_server_error() {
                warn!(%request_id, error = %err, "request failed");
            }
            (
                err.status_code(),
                Json(ApiResponse::failure(&err, request_id, elapsed)),
            )
        }
    }
}

async fn route(
    state: &AppState,
    method: &Method,
    collection: Option<&str>,
    id: Option<&str>,
    params: &HashMap<String, String>,
    raw_body: &Bytes,
) -> BridgeResult<Handled> {
    if *method == Method::OPTIONS {
        return Ok(Handled::empty());
    }

    let body = parse_body(raw_body)?;

    if *method == Method::GET {
        handle_get(state, collection, id, params, &body).await
    } else if *method == Method::POST {
        handle_create(state, collection, body).await
    } else if *method == Method::PUT {
        handle_write(state, collection, id, params, body, WriteMode::Replace).await
    } else if *method == Method::PATCH {
        handle_write(state, collection, id, params, body, WriteMode::Merge).await
    } else if *method == Method::DELETE {
        handle_delete(state, collection, id, params).await
    } else {
        Err(BridgeError::MethodNotAllowed(method.to_string()))
    }
}

// =============================================================================
// GET: listing, queries, identity resolution, actions
// =============================================================================

async fn handle_get(
    state: &AppState,
    collection: Option<&str>,
    id: Option<&str>,
    params: &HashMap<String, String>,
    body: &Option<Value>,
) -> BridgeResult<Handled> {
    let Some(name) = collection else {
        return list_collections(state).await;
    };
    validate_name(name)?;

    if let Some(action) = params.get("action") {
        return handle_action(state, name, id, action, params, body).await;
    }

    let handle = state.resolver.resolve(name).await?;
    match id {
        Some(id_value) => match state.locator.locate(&handle, id_value).await? {
            Some(Located::Document(found)) => Ok(Handled::ok(doc_to_json(found))),
            Some(Located::Containers(containers)) => Ok(Handled::ok(Value::Array(
                containers.into_iter().map(doc_to_json).collect(),
            ))),
            None => Err(BridgeError::NotFound),
        },
        None => list_documents(state, &handle, params).await,
    }
}

/// Predicate-filtered, sorted, projected, paginated document list.
async fn list_documents(
    state: &AppState,
    handle: &CollectionHandle,
    params: &HashMap<String, String>,
) -> BridgeResult<Handled> {
    let query = assemble(params, state.limits);

    let total = handle
        .inner()
        .count_documents(query.filter.clone())
        .await?;

    let options = FindOptions::builder()
        .limit(query.window.limit)
        .skip(query.window.skip)
        .sort(query.sort.clone())
        .projection(query.projection.clone())
        .build();
    let mut cursor = handle
        .inner()
        .find(query.filter)
        .with_options(options)
        .await?;

    let mut documents = Vec::new();
    while let Some(next) = cursor.next().await {
        match next {
            Ok(found) => documents.push(doc_to_json(found)),
            Err(err) => debug!(collection = handle.name(), error = %err, "list read failed"),
        }
    }

    let pagination = PageInfo::new(total, query.window.limit, query.window.skip, documents.len());
    Ok(Handled::list(Value::Array(documents), pagination))
}

async fn handle_action(
    state: &AppState,
    name: &str,
    id: Option<&str>,
    action: &str,
    params: &HashMap<String, String>,
    body: &Option<Value>,
) -> BridgeResult<Handled> {
    let query = assemble(params, state.limits);

    match action {
        "count" => {
            let handle = state.resolver.resolve(name).await?;
            let count = handle.inner().count_documents(query.filter).await?;
            Ok(Handled::ok(json!({ "count": count })))
        }
        "distinct" => {
            let field = id
                .map(str::to_string)
                .or_else(|| params.get("field").cloned())
                .ok_or_else(|| {
                    BridgeError::Validation("distinct requires a field name".to_string())
                })?;
            let handle = state.resolver.resolve(name).await?;
            let values = handle.inner().distinct(&field, query.filter).await?;
            Ok(Handled::ok(Value::Array(
                values.into_iter().map(bson_to_json).collect(),
            )))
        }
        "aggregate" => {
            let pipeline = parse_pipeline(params, body)?;
            let handle = state.resolver.resolve(name).await?;
            let mut cursor = handle.inner().aggregate(pipeline).await?;
            let mut results = Vec::new();
            while let Some(next) = cursor.next().await {
                match next {
                    Ok(doc) => results.push(doc_to_json(doc)),
                    Err(err) => {
                        debug!(collection = handle.name(), error = %err, "aggregate read failed")
                    }
                }
            }
            Ok(Handled::ok(Value::Array(results)))
        }
        other => Err(BridgeError::Validation(format!("unknown action: {other}"))),
    }
}

// =============================================================================
// Collection listing with bounded fan-out
// =============================================================================

/// Per-collection listing entry; a failed sub-fetch reports inline
/// without failing the listing.
#[derive(Debug, Serialize)]
struct CollectionSummary {
    name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn list_collections(state: &AppState) -> BridgeResult<Handled> {
    let names = state.resolver.list_visible().await?;
    let db = state.store.database().await?;

    let mut summaries: Vec<CollectionSummary> = stream::iter(names)
        .map(|name| {
            let db = db.clone();
            async move { summarize(db, name).await }
        })
        .buffer_unordered(LIST_FANOUT)
        .collect()
        .await;

    // Fan-out completion order is arbitrary; keep listings stable.
    summaries.sort_by(|a, b| a.name.cmp(&b.name));

    let count = summaries.len();
    Ok(Handled::ok(json!({
        "collections": summaries,
        "count": count,
    })))
}

async fn summarize(db: Database, name: String) -> CollectionSummary {
    let collection = db.collection::<Document>(&name);
    match collection.estimated_document_count().await {
        Ok(count) => {
            let fields = match collection.find_one(doc! {}).await {
                Ok(Some(sample)) => Some(sample.keys().map(|k| k.to_string()).collect()),
                _ => None,
            };
            CollectionSummary {
                name,
                count: Some(count),
                fields,
                error: None,
            }
        }
        Err(err) => CollectionSummary {
            name,
            count: None,
            fields: None,
            error: Some(err.to_string()),
        },
    }
}

// =============================================================================
// POST: create one or many
// =============================================================================

async fn handle_create(
    state: &AppState,
    collection: Option<&str>,
    body: Option<Value>,
) -> BridgeResult<Handled> {
    let Some(name) = collection else {
        return Err(BridgeError::Validation("collection is required".to_string()));
    };
    validate_name(name)?;
    let body = body.ok_or(BridgeError::MissingBody)?;

    match body {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(BridgeError::Validation("batch body is empty".to_string()));
            }
            if items.len() > state.config.max_batch_insert {
                return Err(BridgeError::Validation(format!(
                    "batch exceeds {} documents",
                    state.config.max_batch_insert
                )));
            }
            let docs = items
                .iter()
                .map(json_to_document)
                .collect::<BridgeResult<Vec<Document>>>()?;

            let handle = state.resolver.resolve(name).await?;
            let result = handle.inner().insert_many(docs).await?;

            let inserted_ids: Vec<Value> = (0..items.len())
                .map(|index| {
                    result
                        .inserted_ids
                        .get(&index)
                        .cloned()
                        .map(bson_to_json)
                        .unwrap_or(Value::Null)
                })
                .collect();
            Ok(Handled::created(json!({
                "insertedCount": items.len(),
                "insertedIds": inserted_ids,
            })))
        }
        Value::Object(_) => {
            let mut document = json_to_document(&body)?;
            let handle = state.resolver.resolve(name).await?;
            let result = handle.inner().insert_one(document.clone()).await?;
            document.insert("_id", result.inserted_id);
            Ok(Handled::created(doc_to_json(document)))
        }
        _ => Err(BridgeError::Validation(
            "body must be a document or an array of documents".to_string(),
        )),
    }
}

// =============================================================================
// PUT/PATCH: replace or merge one document, or bulk update by predicate
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    /// PUT: the body becomes the document (primary key preserved)
    Replace,
    /// PATCH: body fields merge over the stored document
    Merge,
}

async fn handle_write(
    state: &AppState,
    collection: Option<&str>,
    id: Option<&str>,
    params: &HashMap<String, String>,
    body: Option<Value>,
    mode: WriteMode,
) -> BridgeResult<Handled> {
    let Some(name) = collection else {
        return Err(BridgeError::Validation("collection is required".to_string()));
    };
    validate_name(name)?;
    let body = body.ok_or(BridgeError::MissingBody)?;

    let mut update_doc = json_to_document(&body)?;
    // The primary key is immutable; silently dropping it matches merge
    // semantics and avoids a guaranteed store rejection on replace.
    update_doc.remove("_id");
    if update_doc.is_empty() {
        return Err(BridgeError::Validation("update body is empty".to_string()));
    }

    if is_bulk(params) {
        let query = assemble(params, state.limits);
        let handle = state.resolver.resolve(name).await?;
        let result = handle
            .inner()
            .update_many(query.filter, doc! { "$set": update_doc })
            .await?;
        return Ok(Handled::ok(json!({
            "matchedCount": result.matched_count,
            "modifiedCount": result.modified_count,
        })));
    }

    let id_value = id.ok_or(BridgeError::MissingId)?;
    let handle = state.resolver.resolve(name).await?;
    let target = state
        .locator
        .locate(&handle, id_value)
        .await?
        .and_then(Located::into_first)
        .ok_or(BridgeError::NotFound)?;
    let target_id = target
        .get("_id")
        .cloned()
        .ok_or_else(|| BridgeError::Internal("located document has no primary key".to_string()))?;

    let updated = match mode {
        WriteMode::Merge => {
            let options = FindOneAndUpdateOptions::builder()
                .return_document(ReturnDocument::After)
                .build();
            handle
                .inner()
                .find_one_and_update(doc! { "_id": target_id }, doc! { "$set": update_doc })
                .with_options(options)
                .await?
        }
        WriteMode::Replace => {
            let options = FindOneAndReplaceOptions::builder()
                .return_document(ReturnDocument::After)
                .build();
            handle
                .inner()
                .find_one_and_replace(doc! { "_id": target_id }, update_doc)
                .with_options(options)
                .await?
        }
    };

    updated
        .map(|post_image| Handled::ok(doc_to_json(post_image)))
        .ok_or(BridgeError::NotFound)
}

// =============================================================================
// DELETE: one located document, or bulk by predicate
// =============================================================================

async fn handle_delete(
    state: &AppState,
    collection: Option<&str>,
    id: Option<&str>,
    params: &HashMap<String, String>,
) -> BridgeResult<Handled> {
    let Some(name) = collection else {
        return Err(BridgeError::Validation("collection is required".to_string()));
    };
    validate_name(name)?;

    if is_bulk(params) {
        let query = assemble(params, state.limits);
        let handle = state.resolver.resolve(name).await?;
        let result = handle.inner().delete_many(query.filter).await?;
        return Ok(Handled::ok(
            json!({ "deletedCount": result.deleted_count }),
        ));
    }

    let id_value = id.ok_or(BridgeError::MissingId)?;
    let handle = state.resolver.resolve(name).await?;
    let target = state
        .locator
        .locate(&handle, id_value)
        .await?
        .and_then(Located::into_first)
        .ok_or(BridgeError::NotFound)?;
    let target_id = target
        .get("_id")
        .cloned()
        .ok_or_else(|| BridgeError::Internal("located document has no primary key".to_string()))?;

    let result = handle.inner().delete_one(doc! { "_id": target_id }).await?;
    Ok(Handled::ok(
        json!({ "deletedCount": result.deleted_count }),
    ))
}

// =============================================================================
// Shared helpers
// =============================================================================

fn parse_body(raw: &Bytes) -> BridgeResult<Option<Value>> {
    if raw.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(raw)
        .map(Some)
        .map_err(|e| BridgeError::Validation(format!("invalid JSON body: {e}")))
}

fn is_bulk(params: &HashMap<String, String>) -> bool {
    params
        .get("bulk")
        .map(|value| value == "true" || value == "1")
        .unwrap_or(false)
}

fn parse_pipeline(
    params: &HashMap<String, String>,
    body: &Option<Value>,
) -> BridgeResult<Vec<Document>> {
    let stages: Vec<Value> = if let Some(raw) = params.get("pipeline") {
        serde_json::from_str(raw)
            .map_err(|e| BridgeError::Validation(format!("invalid pipeline: {e}")))?
    } else if let Some(Value::Array(items)) = body {
        items.clone()
    } else {
        return Err(BridgeError::Validation(
            "aggregate requires a pipeline".to_string(),
        ));
    };

    stages
        .iter()
        .map(json_to_document)
        .collect::<BridgeResult<Vec<Document>>>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_absent_and_invalid() {
        assert!(parse_body(&Bytes::new()).unwrap().is_none());
        assert!(parse_body(&Bytes::from_static(b"{not json")).is_err());
        let parsed = parse_body(&Bytes::from_static(b"{\"a\":1}")).unwrap().unwrap();
        assert_eq!(parsed["a"], 1);
    }

    #[test]
    fn test_bulk_flag_spellings() {
        let mut params = HashMap::new();
        assert!(!is_bulk(&params));
        params.insert("bulk".to_string(), "true".to_string());
        assert!(is_bulk(&params));
        params.insert("bulk".to_string(), "yes".to_string());
        assert!(!is_bulk(&params));
    }

    #[test]
    fn test_parse_pipeline_from_param() {
        let mut params = HashMap::new();
        params.insert(
            "pipeline".to_string(),
            r#"[{"$match": {"a": 1}}, {"$count": "n"}]"#.to_string(),
        );
        let pipeline = parse_pipeline(&params, &None).unwrap();
        assert_eq!(pipeline.len(), 2);
        assert!(pipeline[0].contains_key("$match"));
    }

    #[test]
    fn test_parse_pipeline_requires_stages() {
        let params = HashMap::new();
        assert!(parse_pipeline(&params, &None).is_err());
        assert!(parse_pipeline(&params, &Some(serde_json::json!({"$match": {}}))).is_err());
        let from_body =
            parse_pipeline(&params, &Some(serde_json::json!([{"$limit": 5}]))).unwrap();
        assert_eq!(from_body.len(), 1);
    }
}
