//! End-to-end set/get through the store bridge.

mod common;

use canopy::{Flags, InMemoryStore, ParseMode, Store, Translator};
use common::fixtures::load_test_schema;

#[test]
fn test_set_then_get_through_store() {
    let schema = load_test_schema();
    let translator = Translator::new(&schema);
    let mut store = InMemoryStore::new();

    // Write priority=1 through an XML edit.
    let edit = translator
        .from_xml(
            "<test><settings><priority>1</priority></settings></test>",
            Flags::empty(),
            ParseMode::Edit,
        )
        .unwrap();
    canopy::apply(&mut store, &edit.tree, &edit.ops).unwrap();
    assert_eq!(
        store.get("/test/settings/priority").as_deref(),
        Some("1")
    );

    // Read it back through a query.
    let query = canopy::parse_query(&schema, "/test/settings/priority", Flags::empty()).unwrap();
    let data = canopy::fetch(&store, &query);
    let xml = translator.to_xml(&data, Flags::empty()).unwrap();
    assert!(xml.contains("<priority>1</priority>"));

    // Writing null removes the node; the store ends up empty.
    let clear = translator
        .from_xml(
            "<test><settings><priority></priority></settings></test>",
            Flags::empty(),
            ParseMode::Edit,
        )
        .unwrap();
    canopy::apply(&mut store, &clear.tree, &clear.ops).unwrap();
    assert_eq!(store.get("/test/settings/priority"), None);
    assert!(store.is_empty());
}

#[test]
fn test_delete_operation_clears_subtree() {
    let schema = load_test_schema();
    let translator = Translator::new(&schema);
    let mut store = common::fixtures::populated_store();

    let edit = translator
        .from_xml(
            r#"<test><animals><animal operation="delete"><name>cat</name></animal></animals></test>"#,
            Flags::empty(),
            ParseMode::Edit,
        )
        .unwrap();
    assert_eq!(
        edit.ops.deletes,
        vec!["/test/animals/animal/cat".to_string()]
    );
    canopy::apply(&mut store, &edit.tree, &edit.ops).unwrap();
    assert_eq!(store.get("/test/animals/animal/cat/type"), None);
    // The delete then re-merge leaves only the key leaf behind.
    assert_eq!(
        store.get("/test/animals/animal/cat/name").as_deref(),
        Some("cat")
    );
    // Other entries are untouched.
    assert_eq!(
        store.get("/test/animals/animal/dog/name").as_deref(),
        Some("dog")
    );
}

#[test]
fn test_fetch_whole_subtree() {
    let schema = load_test_schema();
    let store = common::fixtures::populated_store();
    let query = canopy::parse_query(&schema, "/test/animals", Flags::empty()).unwrap();
    let data = canopy::fetch(&store, &query);
    let animal = data
        .find_child("animals")
        .and_then(|a| a.find_child("animal"))
        .unwrap();
    assert_eq!(animal.children().len(), 2);
    let cat = animal.find_child("cat").unwrap();
    assert_eq!(cat.find_child("type").unwrap().value(), Some("1"));
}
