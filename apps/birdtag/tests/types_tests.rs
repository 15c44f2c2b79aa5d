//! Tests for API request/response types.
//!
//! Covers the request shapes existing clients send and the exact response
//! field names they read.

#![allow(clippy::unwrap_used, clippy::panic)]

use birdtag::api::{
    ACTIONS, ActionRequest, CountParam, DeleteResponse, ErrorResponse, HealthResponse,
    ImageQueryResponse, InsertResponse, LinksResponse, OperationParam, TagEditResponse,
    decode_image, search_constraints,
};
use birdtag_core::{BlobFailure, CatalogError, EditOperation, ImageQueryResult, TagValue};
use serde_json::json;
use std::collections::BTreeMap;

fn parse(value: serde_json::Value) -> ActionRequest {
    serde_json::from_value(value).unwrap()
}

// =============================================================================
// HEALTH
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

// =============================================================================
// ACTION REQUEST DECODING
// =============================================================================

#[test]
fn test_every_action_name_decodes() {
    for action in ACTIONS {
        let request = parse(json!({ "action": action }));
        assert_eq!(request.name(), action);
    }
}

#[test]
fn test_search_request() {
    match parse(json!({ "action": "search", "tags": { "crow": 2, "owl": "1" } })) {
        ActionRequest::Search { tags: Some(tags) } => {
            assert_eq!(tags.len(), 2);
            assert_eq!(tags["crow"].to_count().unwrap(), 2);
            assert_eq!(tags["owl"].to_count().unwrap(), 1);
        }
        other => panic!("Expected Search, got {:?}", other),
    }
}

#[test]
fn test_fuzzy_request() {
    match parse(json!({ "action": "fuzzy", "tags": ["crow", "owl"] })) {
        ActionRequest::Fuzzy { tags } => assert_eq!(tags.unwrap(), vec!["crow", "owl"]),
        other => panic!("Expected Fuzzy, got {:?}", other),
    }
}

#[test]
fn test_thumbnail_request() {
    match parse(json!({ "action": "thumbnail", "thumbnail": "u1" })) {
        ActionRequest::Thumbnail { thumbnail } => assert_eq!(thumbnail.as_deref(), Some("u1")),
        other => panic!("Expected Thumbnail, got {:?}", other),
    }
}

#[test]
fn test_tag_edit_request() {
    match parse(json!({
        "action": "tag_edit",
        "urls": ["u1", "u2"],
        "tags": ["crow,1"],
        "operation": 1
    })) {
        ActionRequest::TagEdit {
            urls,
            tags,
            operation,
        } => {
            assert_eq!(urls, vec!["u1", "u2"]);
            assert_eq!(tags, vec!["crow,1"]);
            assert_eq!(
                operation.unwrap().to_operation().unwrap(),
                EditOperation::Add
            );
        }
        other => panic!("Expected TagEdit, got {:?}", other),
    }
}

#[test]
fn test_tag_edit_request_without_operation() {
    match parse(json!({ "action": "tag_edit", "urls": ["u1"], "tags": [] })) {
        ActionRequest::TagEdit { operation, .. } => assert!(operation.is_none()),
        other => panic!("Expected TagEdit, got {:?}", other),
    }
}

#[test]
fn test_delete_request() {
    match parse(json!({ "action": "delete", "urls": ["u1"] })) {
        ActionRequest::Delete { urls } => assert_eq!(urls, vec!["u1"]),
        other => panic!("Expected Delete, got {:?}", other),
    }
}

#[test]
fn test_insert_request_flattens_record_fields() {
    match parse(json!({
        "action": "insert",
        "filename": "f1",
        "s3_url": "m1",
        "thumbnail_url": "u1",
        "tags": { "crow": 2 },
        "timestamp": "t",
        "uploader": "alice",
        "file_type": "image"
    })) {
        ActionRequest::Insert(new) => {
            assert_eq!(new.id.as_deref(), Some("f1"));
            assert_eq!(new.media_url.as_deref(), Some("m1"));
            assert_eq!(new.uploader.as_deref(), Some("alice"));
        }
        other => panic!("Expected Insert, got {:?}", other),
    }
}

#[test]
fn test_upload_query_request() {
    match parse(json!({ "action": "upload_query", "image": "aW1n" })) {
        ActionRequest::UploadQuery { image } => assert_eq!(image.as_deref(), Some("aW1n")),
        other => panic!("Expected UploadQuery, got {:?}", other),
    }
}

#[test]
fn test_unknown_action_rejected() {
    let result: Result<ActionRequest, _> = serde_json::from_value(json!({ "action": "explode" }));
    assert!(result.is_err());
}

// =============================================================================
// PARAMETER SHAPES
// =============================================================================

#[test]
fn test_count_param_shapes() {
    let typed: CountParam = serde_json::from_value(json!({ "N": "3" })).unwrap();
    assert_eq!(
        typed,
        CountParam::Typed {
            n: TagValue::Text("3".to_string())
        }
    );
    assert_eq!(typed.to_count().unwrap(), 3);

    let plain: CountParam = serde_json::from_value(json!(4)).unwrap();
    assert_eq!(plain.to_count().unwrap(), 4);

    let float: CountParam = serde_json::from_value(json!(5.0)).unwrap();
    assert_eq!(float.to_count().unwrap(), 5);

    let fractional: CountParam = serde_json::from_value(json!(1.5)).unwrap();
    assert!(fractional.to_count().is_err());

    let negative: CountParam = serde_json::from_value(json!(-2)).unwrap();
    assert!(negative.to_count().is_err());
}

#[test]
fn test_operation_param_shapes() {
    let cases = [
        (json!(1), EditOperation::Add),
        (json!(0), EditOperation::Remove),
        (json!("add"), EditOperation::Add),
        (json!("remove"), EditOperation::Remove),
    ];
    for (raw, expected) in cases {
        let param: OperationParam = serde_json::from_value(raw).unwrap();
        assert_eq!(param.to_operation().unwrap(), expected);
    }

    let bad: OperationParam = serde_json::from_value(json!(7)).unwrap();
    assert!(matches!(
        bad.to_operation(),
        Err(CatalogError::InvalidArgument(_))
    ));
    let bad: OperationParam = serde_json::from_value(json!("toggle")).unwrap();
    assert!(bad.to_operation().is_err());
}

#[test]
fn test_search_constraints_requires_tags() {
    assert!(matches!(
        search_constraints(None),
        Err(CatalogError::InvalidArgument(msg)) if msg == "Missing tags"
    ));
    assert!(search_constraints(Some(&BTreeMap::new())).is_err());

    let mut tags = BTreeMap::new();
    tags.insert(
        "crow".to_string(),
        CountParam::Plain(TagValue::Unsigned(2)),
    );
    let constraints = search_constraints(Some(&tags)).unwrap();
    assert_eq!(constraints.get("crow"), Some(&2));
}

#[test]
fn test_decode_image() {
    assert_eq!(decode_image(Some("aW1n")).unwrap(), b"img".to_vec());
    assert!(matches!(
        decode_image(None),
        Err(CatalogError::InvalidArgument(msg)) if msg == "Missing base64-encoded image"
    ));
    assert!(matches!(
        decode_image(Some("not base64!")),
        Err(CatalogError::InvalidArgument(msg)) if msg == "Base64 decode failed"
    ));
}

// =============================================================================
// RESPONSES
// =============================================================================

#[test]
fn test_links_response_field_name() {
    let body = serde_json::to_value(LinksResponse {
        links: vec!["m1".to_string()],
    })
    .unwrap();
    assert_eq!(body, json!({ "Links": ["m1"] }));
}

#[test]
fn test_image_query_response_from_result() {
    let body = serde_json::to_value(ImageQueryResponse::from(ImageQueryResult {
        inferred_tags: vec!["crow".to_string()],
        links: vec!["m1".to_string()],
    }))
    .unwrap();
    assert_eq!(body, json!({ "inferred_tags": ["crow"], "Links": ["m1"] }));
}

#[test]
fn test_delete_response_omits_empty_blob_failures() {
    let clean = serde_json::to_value(DeleteResponse {
        deleted: vec!["f1".to_string()],
        blob_failures: Vec::new(),
    })
    .unwrap();
    assert_eq!(clean, json!({ "deleted": ["f1"] }));

    let partial = DeleteResponse {
        deleted: vec!["f1".to_string()],
        blob_failures: vec![BlobFailure {
            record_id: "f1".to_string(),
            url: "u1".to_string(),
            error: "invalid blob URL: u1".to_string(),
        }],
    };
    let json = serde_json::to_string(&partial).unwrap();
    let back: DeleteResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(back, partial);
}

#[test]
fn test_success_messages() {
    assert_eq!(TagEditResponse::success(vec![]).message, "Tags updated");
    let insert = InsertResponse::success("f1".to_string());
    assert_eq!(insert.message, "Item inserted");
    assert_eq!(insert.filename, "f1");
    assert_eq!(ErrorResponse::new("boom").error, "boom");
}
