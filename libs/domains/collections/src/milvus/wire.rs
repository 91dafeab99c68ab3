//! Request bodies and response envelopes for the Milvus RESTful v2 API.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::connection::{ID_FIELD, VECTOR_FIELD};
use crate::models::{CollectionDescriptor, MAX_ID_LENGTH, SearchHit, SearchRequest};

pub const HAS_COLLECTION: &str = "/v2/vectordb/collections/has";
pub const DESCRIBE_COLLECTION: &str = "/v2/vectordb/collections/describe";
pub const CREATE_COLLECTION: &str = "/v2/vectordb/collections/create";
pub const LOAD_COLLECTION: &str = "/v2/vectordb/collections/load";
pub const GET_LOAD_STATE: &str = "/v2/vectordb/collections/get_load_state";
pub const DROP_COLLECTION: &str = "/v2/vectordb/collections/drop";
pub const CREATE_INDEX: &str = "/v2/vectordb/indexes/create";
pub const LIST_INDEXES: &str = "/v2/vectordb/indexes/list";
pub const INSERT: &str = "/v2/vectordb/entities/insert";
pub const UPSERT: &str = "/v2/vectordb/entities/upsert";
pub const SEARCH: &str = "/v2/vectordb/entities/search";

/// Service code for a collection without the requested index
pub const INDEX_NOT_FOUND: i64 = 700;

/// Every response: `code == 0` on success, otherwise `message` explains
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct HasData {
    pub has: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertData {
    #[serde(default)]
    pub insert_count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertData {
    #[serde(default)]
    pub upsert_count: u64,
}

/// Progress of an asynchronous load job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotExist,
    NotLoad,
    Loading,
    Loaded,
}

pub fn collection_name(name: &str) -> Value {
    json!({ "collectionName": name })
}

/// Indexes built over the vector field
pub fn list_indexes(name: &str) -> Value {
    json!({ "collectionName": name, "fieldName": VECTOR_FIELD })
}

pub fn create_collection(descriptor: &CollectionDescriptor, consistency_level: &str) -> Value {
    json!({
        "collectionName": descriptor.name,
        "schema": {
            "autoId": false,
            "enableDynamicField": false,
            "fields": [
                {
                    "fieldName": ID_FIELD,
                    "dataType": "VarChar",
                    "isPrimary": true,
                    "elementTypeParams": { "max_length": MAX_ID_LENGTH.to_string() }
                },
                {
                    "fieldName": VECTOR_FIELD,
                    "dataType": "FloatVector",
                    "elementTypeParams": { "dim": descriptor.dimension.to_string() }
                }
            ]
        },
        "params": { "consistencyLevel": consistency_level }
    })
}

pub fn create_index(descriptor: &CollectionDescriptor) -> Value {
    json!({
        "collectionName": descriptor.name,
        "indexParams": [
            {
                "fieldName": VECTOR_FIELD,
                "indexName": VECTOR_FIELD,
                "metricType": descriptor.metric.as_str(),
                "indexType": descriptor.index.kind.as_str(),
                "params": descriptor.index.params
            }
        ]
    })
}

pub fn entities(name: &str, ids: Vec<String>, vectors: Vec<Vec<f32>>) -> Value {
    let data: Vec<Value> = ids
        .into_iter()
        .zip(vectors)
        .map(|(id, vector)| {
            let mut row = Map::new();
            row.insert(ID_FIELD.to_string(), Value::String(id));
            row.insert(VECTOR_FIELD.to_string(), json!(vector));
            Value::Object(row)
        })
        .collect();

    json!({ "collectionName": name, "data": data })
}

pub fn search(name: &str, request: &SearchRequest) -> Value {
    let mut body = json!({
        "collectionName": name,
        "data": [request.vector],
        "annsField": VECTOR_FIELD,
        "limit": request.top_k,
        "outputFields": [ID_FIELD],
        "searchParams": {
            "metricType": request.metric.as_str(),
            "params": { "nprobe": request.params.nprobe }
        }
    });

    if let Some(filter) = &request.filter {
        body["filter"] = Value::String(filter.clone());
    }

    body
}

/// Search rows come back as `{"id": ..., "distance": ...}` objects
pub fn parse_hits(data: Value) -> Result<Vec<SearchHit>, String> {
    let Value::Array(rows) = data else {
        return Err(format!("expected an array of hits, got {}", data));
    };

    rows.into_iter()
        .map(|row| {
            let id = match row.get(ID_FIELD) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return Err(format!("hit without id: {}", row)),
            };
            let distance = row
                .get("distance")
                .and_then(Value::as_f64)
                .ok_or_else(|| format!("hit without distance: {}", row))?;
            Ok(SearchHit::new(id, distance as f32))
        })
        .collect()
}

/// Load state from a `get_load_state` payload, e.g. `{"loadState": "LoadStateLoaded"}`
pub fn parse_load_state(data: &Value) -> Option<LoadState> {
    match data.get("loadState")?.as_str()? {
        "LoadStateNotExist" => Some(LoadState::NotExist),
        "LoadStateNotLoad" => Some(LoadState::NotLoad),
        "LoadStateLoading" => Some(LoadState::Loading),
        "LoadStateLoaded" => Some(LoadState::Loaded),
        _ => None,
    }
}

/// `indexes/list` returns the index names as a plain array
pub fn parse_index_names(data: &Value) -> Vec<String> {
    data.as_array()
        .map(|names| {
            names
                .iter()
                .filter_map(|n| n.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Pull the vector dimension out of a describe-collection payload.
///
/// Field params arrive as `[{"key": "dim", "value": "768"}]`.
pub fn parse_dimension(data: &Value) -> Option<usize> {
    let fields = data.get("fields")?.as_array()?;

    let vector_field = fields
        .iter()
        .find(|f| f.get("name").and_then(Value::as_str) == Some(VECTOR_FIELD))
        .or_else(|| {
            fields
                .iter()
                .find(|f| f.get("type").and_then(Value::as_str) == Some("FloatVector"))
        })?;

    vector_field
        .get("params")?
        .as_array()?
        .iter()
        .find(|p| p.get("key").and_then(Value::as_str) == Some("dim"))
        .and_then(|p| match p.get("value")? {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_u64().map(|d| d as usize),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DistanceMetric, IndexSpec, SearchParams};

    fn descriptor() -> CollectionDescriptor {
        CollectionDescriptor {
            name: "raven-mvp".to_string(),
            dimension: 768,
            metric: DistanceMetric::L2,
            index: IndexSpec::default(),
        }
    }

    #[test]
    fn test_create_collection_body() {
        let body = create_collection(&descriptor(), "Strong");
        assert_eq!(body["collectionName"], "raven-mvp");
        assert_eq!(body["schema"]["autoId"], false);
        let fields = body["schema"]["fields"].as_array().unwrap();
        assert_eq!(fields[0]["fieldName"], "id");
        assert_eq!(fields[0]["isPrimary"], true);
        assert_eq!(fields[1]["fieldName"], "embedding");
        assert_eq!(fields[1]["dataType"], "FloatVector");
        assert_eq!(fields[1]["elementTypeParams"]["dim"], "768");
        assert_eq!(body["params"]["consistencyLevel"], "Strong");
    }

    #[test]
    fn test_create_index_body() {
        let body = create_index(&descriptor());
        let index = &body["indexParams"][0];
        assert_eq!(index["fieldName"], "embedding");
        assert_eq!(index["metricType"], "L2");
        assert_eq!(index["indexType"], "IVF_FLAT");
        assert_eq!(index["params"]["nlist"], 1024);
    }

    #[test]
    fn test_entities_body_pairs_ids_with_vectors() {
        let body = entities(
            "c",
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        );
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["id"], "b");
        assert_eq!(rows[1]["embedding"], json!([0.0, 1.0]));
    }

    #[test]
    fn test_search_body() {
        let request = SearchRequest {
            vector: vec![1.0, 0.0, 0.0],
            top_k: 5,
            filter: Some("id like \"doc%\"".to_string()),
            metric: DistanceMetric::L2,
            params: SearchParams::default(),
        };
        let body = search("c", &request);
        assert_eq!(body["data"], json!([[1.0, 0.0, 0.0]]));
        assert_eq!(body["limit"], 5);
        assert_eq!(body["annsField"], "embedding");
        assert_eq!(body["searchParams"]["params"]["nprobe"], 10);
        assert_eq!(body["filter"], "id like \"doc%\"");
    }

    #[test]
    fn test_search_body_omits_missing_filter() {
        let request = SearchRequest {
            vector: vec![0.5],
            top_k: 1,
            filter: None,
            metric: DistanceMetric::L2,
            params: SearchParams { nprobe: 4 },
        };
        let body = search("c", &request);
        assert!(body.get("filter").is_none());
        assert_eq!(body["searchParams"]["params"]["nprobe"], 4);
    }

    #[test]
    fn test_parse_hits() {
        let hits = parse_hits(json!([
            { "id": "a", "distance": 0.0 },
            { "id": 7, "distance": 1.5 }
        ]))
        .unwrap();
        assert_eq!(hits, vec![SearchHit::new("a", 0.0), SearchHit::new("7", 1.5)]);
    }

    #[test]
    fn test_parse_hits_rejects_missing_distance() {
        assert!(parse_hits(json!([{ "id": "a" }])).is_err());
        assert!(parse_hits(json!({ "id": "a" })).is_err());
    }

    #[test]
    fn test_parse_load_state() {
        assert_eq!(
            parse_load_state(&json!({ "loadState": "LoadStateLoaded", "loadProgress": 100 })),
            Some(LoadState::Loaded)
        );
        assert_eq!(
            parse_load_state(&json!({ "loadState": "LoadStateLoading", "loadProgress": 40 })),
            Some(LoadState::Loading)
        );
        assert_eq!(
            parse_load_state(&json!({ "loadState": "LoadStateNotExist" })),
            Some(LoadState::NotExist)
        );
        assert_eq!(parse_load_state(&json!({ "loadState": "Sideways" })), None);
        assert_eq!(parse_load_state(&json!({})), None);
    }

    #[test]
    fn test_parse_index_names() {
        assert_eq!(parse_index_names(&json!(["embedding"])), vec!["embedding"]);
        assert!(parse_index_names(&json!([])).is_empty());
        assert!(parse_index_names(&Value::Null).is_empty());
    }

    #[test]
    fn test_list_indexes_body_targets_vector_field() {
        let body = list_indexes("c");
        assert_eq!(body["collectionName"], "c");
        assert_eq!(body["fieldName"], "embedding");
    }

    #[test]
    fn test_parse_dimension() {
        let data = json!({
            "collectionName": "raven-mvp",
            "fields": [
                { "name": "id", "type": "VarChar", "primaryKey": true,
                  "params": [{ "key": "max_length", "value": "512" }] },
                { "name": "embedding", "type": "FloatVector",
                  "params": [{ "key": "dim", "value": "768" }] }
            ]
        });
        assert_eq!(parse_dimension(&data), Some(768));
    }

    #[test]
    fn test_parse_dimension_falls_back_to_any_float_vector() {
        let data = json!({
            "fields": [
                { "name": "vec", "type": "FloatVector", "params": [{ "key": "dim", "value": 3 }] }
            ]
        });
        assert_eq!(parse_dimension(&data), Some(3));
        assert_eq!(parse_dimension(&json!({})), None);
    }
}
