use std::collections::HashMap;
use std::sync::Arc;

use og_image::config::UpstreamConfig;
use og_image::pipeline::CACHE_CONTROL;
use og_image::{Config, HttpRecordSource, ImageResponse, Pipeline, Registry, StaticRecords};

fn fixture_records() -> StaticRecords {
    let body = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/attendees.json"
    ));
    StaticRecords::from_json(body).expect("fixture parses")
}

fn pipeline_with(records: impl og_image::RecordSource + 'static) -> Pipeline {
    Pipeline::new(
        Arc::new(Registry::builtin()),
        Arc::new(records),
        &Config::default(),
    )
}

fn unreachable_pipeline() -> Pipeline {
    let upstream = UpstreamConfig {
        api_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: Some(2),
        ..UpstreamConfig::default()
    };
    pipeline_with(HttpRecordSource::new(&upstream))
}

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn text(response: &ImageResponse) -> String {
    String::from_utf8(response.body.clone()).expect("utf-8 body")
}

#[test]
fn seeded_record_replaces_title_and_description() {
    let pipeline = pipeline_with(fixture_records());
    let response = pipeline.handle(query(&[("layoutName", "onion"), ("seed", "3")]));

    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, "image/svg+xml");
    assert_eq!(response.cache_control, Some(CACHE_CONTROL));
    let svg = text(&response);
    assert!(svg.contains(">Ada<"));
    assert!(svg.contains("ada@x.co"));
    assert!(svg.contains("Attendee #3"));
    assert!(!svg.contains("Web3 community"));
}

#[test]
fn missing_seed_binds_the_first_record() {
    let pipeline = pipeline_with(fixture_records());
    let svg = text(&pipeline.handle(query(&[("layoutName", "onion"), ("seed", " ")])));
    assert!(svg.contains("Grace Hopper"));
    assert!(svg.contains("Attendee #1"));
}

#[test]
fn empty_record_name_keeps_configured_title() {
    let pipeline = pipeline_with(fixture_records());
    let svg = text(&pipeline.handle(query(&[
        ("layoutName", "onion"),
        ("seed", "7"),
        ("Title", "Launch Week"),
    ])));
    assert!(svg.contains("Launch Week"));
    assert!(svg.contains("anon@example.com"));
}

#[test]
fn unmatched_seed_renders_configuration() {
    let pipeline = pipeline_with(fixture_records());
    for seed in ["42", "abc"] {
        let response = pipeline.handle(query(&[
            ("layoutName", "onion"),
            ("seed", seed),
            ("Title", "Hack Night"),
        ]));
        assert_eq!(response.status, 200);
        let svg = text(&response);
        assert!(svg.contains("Hack Night"));
        assert!(!svg.contains("Attendee #"));
    }
}

#[test]
fn unreachable_record_service_still_renders() {
    let pipeline = unreachable_pipeline();
    let response = pipeline.handle(query(&[
        ("layoutName", "onion"),
        ("seed", "3"),
        ("Title", "Hack Night"),
    ]));
    assert_eq!(response.status, 200);
    assert_eq!(response.cache_control, Some(CACHE_CONTROL));
    let svg = text(&response);
    assert!(svg.contains("Hack Night"));
    assert!(!svg.contains("Attendee #"));
}

#[test]
fn unknown_layout_is_a_sanitized_failure() {
    let pipeline = pipeline_with(StaticRecords::default());
    let response = pipeline.handle(query(&[("layoutName", "doesNotExist<script>")]));
    assert_eq!(response.status, 500);
    assert_eq!(response.content_type, "text/html");
    assert_eq!(response.cache_control, None);
    let body = text(&response);
    assert!(body.starts_with("<h1>Internal Error</h1>"));
    assert!(body.contains("doesNotExist&lt;script&gt;"));
    assert!(!body.contains("<script>"));
}

#[test]
fn missing_layout_name_fails_validation() {
    let pipeline = pipeline_with(StaticRecords::default());
    let response = pipeline.handle(query(&[("Title", "x")]));
    assert_eq!(response.status, 500);
    assert!(text(&response).contains("layoutName"));
}

#[test]
fn invalid_field_names_the_field() {
    let pipeline = pipeline_with(fixture_records());
    let response = pipeline.handle(query(&[
        ("layoutName", "onion"),
        ("TemplateImage", "not a url"),
    ]));
    assert_eq!(response.status, 500);
    assert_eq!(response.cache_control, None);
    assert!(text(&response).contains("TemplateImage"));
}

#[test]
fn blank_values_fall_back_to_defaults() {
    let pipeline = pipeline_with(StaticRecords::default());
    let svg = text(&pipeline.handle(query(&[
        ("layoutName", "ONION"),
        ("Title", ""),
        ("AuthorName", "Railway"),
    ])));
    assert!(svg.contains("OnionDAO"));
    assert!(svg.contains("Railway"));
}

#[test]
fn unknown_file_type_falls_back_to_svg() {
    let pipeline = pipeline_with(StaticRecords::default());
    let response = pipeline.handle(query(&[("layoutName", "simple"), ("fileType", "gif")]));
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, "image/svg+xml");
}

#[test]
fn identical_requests_produce_identical_bytes() {
    let pipeline = pipeline_with(fixture_records());
    let request = query(&[("layoutName", "onion"), ("seed", "3"), ("Category", "Meetup")]);
    let first = pipeline.handle(request.clone());
    let second = pipeline.handle(request);
    assert_eq!(first, second);
}

#[cfg(feature = "png")]
#[test]
fn png_output_is_deterministic() {
    let pipeline = pipeline_with(fixture_records());
    let request = query(&[("layoutName", "simple"), ("fileType", "png"), ("seed", "3")]);
    let first = pipeline.handle(request.clone());
    assert_eq!(first.status, 200, "{}", String::from_utf8_lossy(&first.body));
    assert_eq!(first.content_type, "image/png");
    assert!(first.body.starts_with(b"\x89PNG\r\n\x1a\n"));
    assert_eq!(first, pipeline.handle(request));
}

#[test]
fn control_characters_in_text_keep_the_svg_well_formed() {
    let pipeline = pipeline_with(StaticRecords::default());
    let response = pipeline.handle(query(&[("layoutName", "simple"), ("Title", "Hi\u{1}there")]));
    assert_eq!(response.status, 200);
    let svg = text(&response);
    assert!(!svg.contains('\u{1}'));
    assert!(svg.contains("Hi\u{FFFD}there"));

    #[cfg(feature = "png")]
    {
        let response = pipeline.handle(query(&[
            ("layoutName", "simple"),
            ("Title", "Hi\u{1}there"),
            ("fileType", "png"),
        ]));
        assert_eq!(response.status, 200, "{}", String::from_utf8_lossy(&response.body));
        assert_eq!(response.content_type, "image/png");
    }
}
