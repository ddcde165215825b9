use std::path::Path;

use mdschema_core::{MemoryStore, UnitLayout, Value};
use mdschema_db::{RegistryConfig, RegistryError, RegistrySource, SchemaRegistry};
use serde_json::json;

const BOOK: &str = include_str!("../../core/tests/fixtures/book-2.0.0-published.json");

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn source(name: &str, version: &str, status: &str) -> serde_json::Value {
    json!({
        "schema_name": name,
        "version": version,
        "status": status,
        "title": format!("{name} {version}"),
        "properties": {
            "title": {"type": "text", "required": true},
            "year": {"type": "integer", "minimum": 1450}
        }
    })
}

fn write_json(path: &Path, json: &serde_json::Value) {
    std::fs::write(path, serde_json::to_vec_pretty(json).unwrap()).unwrap();
}

// ---------------------------------------------------------------------------
// Directory loading
// ---------------------------------------------------------------------------

#[test]
fn test_directory_loading() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("book-2.0.0-published.json"), BOOK).unwrap();
    write_json(&dir.path().join("film.json"), &source("film", "1.0.0", "published"));
    write_json(&dir.path().join("map.json"), &source("map", "0.1.0", "draft"));

    let registry = SchemaRegistry::from_dir(dir.path()).unwrap();
    assert_eq!(registry.len(), 2);
    assert!(registry.contains("book"));
    assert!(registry.contains("film"));
    assert!(!registry.contains("map"));

    let book = registry.get("book").unwrap();
    assert_eq!(book.version(), "2.0.0");
    assert_eq!(book.fields().len(), 8);
    assert!(book.field("author.email").is_some());
}

#[test]
fn test_directory_with_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
    let err = SchemaRegistry::from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, RegistryError::Json(_)));
}

// ---------------------------------------------------------------------------
// Bundle loading
// ---------------------------------------------------------------------------

#[test]
fn test_bundle_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.json");
    write_json(
        &path,
        &json!([
            source("film", "1.0.0", "published"),
            source("film", "1.2.0", "published"),
            source("film", "1.1.0", "published"),
            source("song", "3.0.0", "archived"),
        ]),
    );

    let registry = SchemaRegistry::from_bundle(&path).unwrap();
    assert_eq!(registry.names(), ["film"]);
    assert_eq!(registry.get("film").unwrap().version(), "1.2.0");
    assert_eq!(registry.source(), &RegistrySource::Bundle(path));
}

// ---------------------------------------------------------------------------
// Builder fallback chain
// ---------------------------------------------------------------------------

#[test]
fn test_builder_merges_sources() {
    let dir = tempfile::tempdir().unwrap();
    let schemas = dir.path().join("schemas");
    std::fs::create_dir(&schemas).unwrap();
    write_json(&schemas.join("film.json"), &source("film", "1.0.0", "published"));

    let bundle = dir.path().join("bundle.json");
    write_json(
        &bundle,
        &json!([source("film", "2.0.0", "published"), source("song", "1.0.0", "published")]),
    );

    let registry = SchemaRegistry::builder()
        .from_dir(&schemas)
        .from_bundle(&bundle)
        .build()
        .unwrap();
    assert_eq!(registry.names(), ["film", "song"]);
    assert_eq!(registry.get("film").unwrap().version(), "2.0.0");
    assert!(matches!(registry.source(), RegistrySource::Multiple(s) if s.len() == 2));
}

#[test]
fn test_builder_skips_failing_source() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("bundle.json");
    write_json(&bundle, &json!([source("film", "1.0.0", "published")]));

    let registry = SchemaRegistry::builder()
        .from_dir("/nonexistent/dir/")
        .from_bundle(&bundle)
        .build()
        .unwrap();
    assert!(registry.contains("film"));
}

// ---------------------------------------------------------------------------
// Configuration workflow
// ---------------------------------------------------------------------------

#[test]
fn test_config_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let schemas = dir.path().join("schemas");
    std::fs::create_dir(&schemas).unwrap();
    std::fs::write(schemas.join("book.json"), BOOK).unwrap();

    let config = RegistryConfig {
        prefix: "md".into(),
        unit_layout: UnitLayout::CompositeLevels,
        schema_dirs: vec![schemas],
        ..RegistryConfig::default()
    };
    let config_path = dir.path().join("mdschema.yml");
    config.save(&config_path).unwrap();

    let loaded = RegistryConfig::load(&config_path).unwrap();
    assert_eq!(loaded, config);

    let registry = SchemaRegistry::from_config(&loaded).unwrap();
    assert_eq!(registry.options().prefix, "md");

    let book = registry.get("book").unwrap();
    assert_eq!(book.storage_prefix(), "md.book");
    assert_eq!(book.options().unit_layout, UnitLayout::CompositeLevels);

    let mut store = MemoryStore::new();
    let record = Value::from(json!({
        "title": "Dune",
        "author": [{"name": "Frank Herbert", "email": ["frank@example.org"]}],
    }));
    book.apply(&mut store, "/zone/dune.pdf", record).unwrap();
    let back = book.extract(&store, "/zone/dune.pdf").unwrap();
    assert_eq!(back.get("publisher"), Some(&Value::from("Penguin")));
    assert_eq!(back.get("title"), Some(&Value::from("Dune")));
}

#[test]
fn test_config_without_sources() {
    let err = SchemaRegistry::from_config(&RegistryConfig::default()).unwrap_err();
    assert!(matches!(err, RegistryError::NoSourcesAvailable));
}
