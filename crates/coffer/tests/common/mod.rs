//! Record fixtures shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]

use coffer::{Record, Schema, Store, StoreConfig};
use serde::{Deserialize, Serialize};

/// Signed integer ID, no auto-increment, single-field index on `Name`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
}

impl Record for Person {
    const NAME: &'static str = "fixture.Person";

    fn schema() -> Schema<Self> {
        Schema::new()
            .field("ID", "", |p: &Person| &p.id, |p: &mut Person| &mut p.id)
            .field("Name", "index", |p: &Person| &p.name, |p: &mut Person| &mut p.name)
    }
}

impl Person {
    pub fn new(id: i64, name: &str) -> Self {
        Self { id, name: name.to_string() }
    }
}

/// Multi-field index `multi` over (ID, Visible, Name) plus a single index on `Name`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub name: String,
    pub visible: bool,
    pub notes: Vec<String>,
}

impl Record for Listing {
    const NAME: &'static str = "fixture.Listing";

    fn schema() -> Schema<Self> {
        Schema::new()
            .field("ID", "index multi 0", |l: &Listing| &l.id, |l: &mut Listing| &mut l.id)
            .field("Name", "index, index multi 2", |l: &Listing| &l.name, |l: &mut Listing| {
                &mut l.name
            })
            .field("Visible", "index multi 1", |l: &Listing| &l.visible, |l: &mut Listing| {
                &mut l.visible
            })
            .opaque::<Vec<String>>("Notes", "")
    }
}

/// Auto-incremented `u8` ID, small enough to overflow in a test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    pub id: u8,
    pub label: String,
}

impl Record for Counter {
    const NAME: &'static str = "fixture.Counter";

    fn schema() -> Schema<Self> {
        Schema::new()
            .field("ID", "inc", |c: &Counter| &c.id, |c: &mut Counter| &mut c.id)
            .field("Label", "", |c: &Counter| &c.label, |c: &mut Counter| &mut c.label)
    }
}

/// String primary key, stored under a surrogate key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: i32,
}

impl Record for Setting {
    const NAME: &'static str = "fixture.Setting";

    fn schema() -> Schema<Self> {
        Schema::new()
            .field("Key", "id", |s: &Setting| &s.key, |s: &mut Setting| &mut s.key)
            .field("Value", "index", |s: &Setting| &s.value, |s: &mut Setting| &mut s.value)
    }
}

impl Setting {
    pub fn new(key: &str, value: i32) -> Self {
        Self { key: key.to_string(), value }
    }
}

/// Two string fields in one index; `Artist` is not the last field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: u32,
    pub artist: String,
    pub title: String,
}

impl Record for Track {
    const NAME: &'static str = "fixture.Track";

    fn schema() -> Schema<Self> {
        Schema::new()
            .field("ID", "inc", |t: &Track| &t.id, |t: &mut Track| &mut t.id)
            .field("Artist", "index by 0", |t: &Track| &t.artist, |t: &mut Track| &mut t.artist)
            .field("Title", "index by 1", |t: &Track| &t.title, |t: &mut Track| &mut t.title)
    }
}

impl Track {
    pub fn new(artist: &str, title: &str) -> Self {
        Self { id: 0, artist: artist.to_string(), title: title.to_string() }
    }
}

/// No field named `ID` and none tagged `id`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Orphan {
    pub name: String,
}

impl Record for Orphan {
    const NAME: &'static str = "fixture.Orphan";

    fn schema() -> Schema<Self> {
        Schema::new().field("Name", "", |o: &Orphan| &o.name, |o: &mut Orphan| &mut o.name)
    }
}

/// Claims the same name as [`Person`] with a different Rust type.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Impostor {
    pub id: u32,
}

impl Record for Impostor {
    const NAME: &'static str = "fixture.Person";

    fn schema() -> Schema<Self> {
        Schema::new().field("ID", "", |i: &Impostor| &i.id, |i: &mut Impostor| &mut i.id)
    }
}

/// An empty in-memory store.
pub fn store() -> Store {
    Store::open_in_memory(StoreConfig::default()).unwrap()
}

/// An in-memory store with every valid fixture registered.
pub fn registered_store() -> Store {
    let store = store();
    register_all(&store);
    store
}

pub fn register_all(store: &Store) {
    store.register::<Person>().unwrap();
    store.register::<Listing>().unwrap();
    store.register::<Counter>().unwrap();
    store.register::<Setting>().unwrap();
    store.register::<Track>().unwrap();
}
