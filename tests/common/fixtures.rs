//! The sample schema and store used across the integration tests.

use canopy::{InMemoryStore, SchemaTree, Store};

pub const TEST_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MODULE xmlns="https://canopy.dev/schema" model="test" organization="test-org" version="1">
  <NODE name="test" help="top level of the test module">
    <NODE name="settings">
      <NODE name="debug" mode="rw" default="0" help="debug level">
        <VALUE name="disable" value="0"/>
        <VALUE name="enable" value="1"/>
      </NODE>
      <NODE name="enable" mode="rw" default="false">
        <VALUE name="true" value="true"/>
        <VALUE name="false" value="false"/>
      </NODE>
      <NODE name="priority" mode="rw" range="-10..10"/>
      <NODE name="volume" mode="rw" range="1..100|200..300"/>
      <NODE name="hidden" mode="h" default="friend"/>
      <NODE name="readonly" mode="r" default="yes"/>
      <NODE name="empty"/>
    </NODE>
    <NODE name="state">
      <NODE name="counter" mode="r" range="0..4294967295"/>
    </NODE>
    <NODE name="animals">
      <NODE name="animal">
        <NODE name="*" help="one animal entry">
          <NODE name="name" mode="rw"/>
          <NODE name="type" mode="rw" default="1">
            <VALUE name="big" value="1"/>
            <VALUE name="little" value="2"/>
          </NODE>
          <NODE name="colour" mode="rw"/>
          <NODE name="food">
            <NODE name="*">
              <NODE name="name" mode="rw"/>
              <NODE name="type" mode="rw"/>
            </NODE>
          </NODE>
          <NODE name="toys">
            <NODE name="*" mode="rw" help="toy name"/>
          </NODE>
        </NODE>
      </NODE>
    </NODE>
  </NODE>
</MODULE>
"#;

/// Writes the sample schema into a fresh directory and loads it.
pub fn load_test_schema() -> SchemaTree {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("test.xml"), TEST_SCHEMA).unwrap();
    canopy::load(dir.path().to_str().unwrap()).unwrap()
}

/// A store holding the classic two-animal data set.
pub fn populated_store() -> InMemoryStore {
    let mut store = InMemoryStore::new();
    let entries = [
        ("/test/settings/debug", "1"),
        ("/test/settings/enable", "true"),
        ("/test/settings/priority", "1"),
        ("/test/animals/animal/cat/name", "cat"),
        ("/test/animals/animal/cat/type", "1"),
        ("/test/animals/animal/dog/name", "dog"),
        ("/test/animals/animal/dog/colour", "brown"),
        ("/test/animals/animal/cat/food/banana/name", "banana"),
        ("/test/animals/animal/cat/food/banana/type", "fruit"),
        ("/test/animals/animal/cat/food/nuts/name", "nuts"),
        ("/test/animals/animal/cat/food/nuts/type", "kibble"),
    ];
    for (path, value) in entries {
        store.set(path, Some(value)).unwrap();
    }
    store
}
