//! Index mappings for the three search indexes.
//!
//! `dynamic: strict` keeps the loader honest: a document with an
//! unexpected field is rejected instead of silently widening the
//! schema.

use serde_json::{Value, json};

fn keyword_text() -> Value {
    json!({
        "type": "text",
        "fields": {
            "raw": { "type": "keyword" }
        }
    })
}

fn person_entries() -> Value {
    json!({
        "type": "nested",
        "dynamic": "strict",
        "properties": {
            "id": { "type": "keyword" },
            "name": keyword_text(),
        }
    })
}

pub fn movies() -> Value {
    json!({
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": { "type": "keyword" },
                "title": keyword_text(),
                "description": { "type": "text" },
                "imdb_rating": { "type": "float" },
                "genre": {
                    "type": "nested",
                    "dynamic": "strict",
                    "properties": {
                        "id": { "type": "keyword" },
                        "name": keyword_text(),
                    }
                },
                "actors": person_entries(),
                "writers": person_entries(),
                "directors": person_entries(),
                "actors_names": { "type": "text" },
                "writers_names": { "type": "text" },
                "directors_names": { "type": "text" },
            }
        }
    })
}

pub fn genres() -> Value {
    json!({
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": { "type": "keyword" },
                "name": keyword_text(),
                "description": { "type": "text" },
            }
        }
    })
}

pub fn persons() -> Value {
    json!({
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": { "type": "keyword" },
                "full_name": keyword_text(),
            }
        }
    })
}
