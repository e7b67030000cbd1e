//! Default-application coordinator
//!
//! Runs only on new (unpersisted) documents. Every hydrated path that
//! was not mutated after hydration gets its schema default: plain
//! values and synchronous generators are written back through the
//! casting accessor; asynchronous generators fan out together and the
//! coordinator joins on all of them. Embedded documents recurse, each
//! element independently, behind the same join barrier. Defaults do
//! not fail.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;

use crate::schema::types::{DefaultValue, PathKind};

use super::{Document, PathValue, SetOptions};

impl Document {
    /// Apply schema defaults to this document and its embedded
    /// documents. No-op unless the document is new.
    pub fn apply_defaults(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if !self.is_new {
                return;
            }

            let schema = Arc::clone(&self.schema);
            let pending: Vec<String> = self
                .state
                .hydrated()
                .filter(|path| !self.state.is_dirty(path))
                .cloned()
                .collect();

            let mut writes: Vec<(String, Value)> = Vec::new();
            let mut generated: FuturesUnordered<BoxFuture<'static, (String, Value)>> =
                FuturesUnordered::new();
            let mut nested: Vec<String> = Vec::new();

            for path in pending {
                let Some(descriptor) = schema.get(&path) else {
                    continue;
                };
                match &descriptor.kind {
                    PathKind::EmbeddedDocument(_) | PathKind::EmbeddedDocumentCollection(_) => {
                        nested.push(path);
                    }
                    PathKind::Scalar(_) => match &descriptor.default {
                        Some(DefaultValue::Static(value)) => {
                            writes.push((path, value.clone()));
                        }
                        Some(DefaultValue::Generator(generate)) => {
                            writes.push((path, generate()));
                        }
                        Some(DefaultValue::AsyncGenerator(generate)) => {
                            let pending_value = generate();
                            generated.push(Box::pin(async move { (path, pending_value.await) }));
                        }
                        None => {}
                    },
                }
            }

            // join barrier over all async generators, no ordering
            while let Some((path, value)) = generated.next().await {
                writes.push((path, value));
            }
            drop(generated);

            for (path, value) in writes {
                self.set_with(&path, value, SetOptions::default_write());
            }

            // recurse into embedded documents, all elements joined
            let mut recursions: FuturesUnordered<BoxFuture<'_, ()>> = FuturesUnordered::new();
            for (path, value) in self.values.iter_mut() {
                if !nested.contains(path) {
                    continue;
                }
                match value {
                    PathValue::Document(doc) => recursions.push(doc.apply_defaults()),
                    PathValue::Collection(docs) => {
                        for doc in docs.iter_mut() {
                            recursions.push(doc.apply_defaults());
                        }
                    }
                    PathValue::Scalar(_) => {}
                }
            }
            while recursions.next().await.is_some() {}
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::PathDescriptor;
    use crate::schema::Schema;
    use serde_json::json;

    fn hydrate_clean(doc: &mut Document, path: &str) {
        // hydrated but not dirty: the shape defaults apply to
        doc.set_with(
            path,
            Value::Null,
            SetOptions {
                transform: false,
                mark_dirty: false,
                is_init: false,
            },
        );
    }

    #[tokio::test]
    async fn test_static_default_applied() {
        let schema = Arc::new(
            Schema::new("users")
                .path("status", PathDescriptor::string().with_default(json!("pending"))),
        );
        let mut doc = Document::new(schema);
        hydrate_clean(&mut doc, "status");

        doc.apply_defaults().await;
        assert_eq!(doc.get_scalar("status"), Some(&json!("pending")));
        assert!(!doc.path_state().is_dirty("status"));
    }

    #[tokio::test]
    async fn test_generator_default_applied() {
        let schema = Arc::new(
            Schema::new("users")
                .path("retries", PathDescriptor::int().with_generated_default(|| json!(3))),
        );
        let mut doc = Document::new(schema);
        hydrate_clean(&mut doc, "retries");

        doc.apply_defaults().await;
        assert_eq!(doc.get_scalar("retries"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn test_async_generators_joined() {
        let schema = Arc::new(
            Schema::new("users")
                .path(
                    "a",
                    PathDescriptor::int().with_async_default(|| {
                        Box::pin(async {
                            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                            json!(1)
                        })
                    }),
                )
                .path(
                    "b",
                    PathDescriptor::int()
                        .with_async_default(|| Box::pin(async { json!(2) })),
                ),
        );
        let mut doc = Document::new(schema);
        hydrate_clean(&mut doc, "a");
        hydrate_clean(&mut doc, "b");

        doc.apply_defaults().await;
        assert_eq!(doc.get_scalar("a"), Some(&json!(1)));
        assert_eq!(doc.get_scalar("b"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_collection_elements_receive_defaults() {
        let items = Arc::new(Schema::new("items").path(
            "status",
            PathDescriptor::string().with_default(json!("pending")),
        ));
        let schema = Arc::new(
            Schema::new("orders").path("items", PathDescriptor::embedded_collection(items)),
        );
        let mut doc = Document::new(schema);
        // elements arrive with the path present but unresolved
        doc.set_with(
            "items",
            json!([{ "status": null }, { "status": null }]),
            SetOptions {
                transform: false,
                mark_dirty: false,
                is_init: false,
            },
        );

        doc.apply_defaults().await;
        let items = doc
            .get("items")
            .and_then(PathValue::as_collection)
            .unwrap();
        assert_eq!(items[0].get_scalar("status"), Some(&json!("pending")));
        assert_eq!(items[1].get_scalar("status"), Some(&json!("pending")));
    }

    #[tokio::test]
    async fn test_dirty_path_skipped() {
        let schema = Arc::new(
            Schema::new("users")
                .path("count", PathDescriptor::int().with_default(json!(99))),
        );
        let mut doc = Document::new(schema);
        doc.set("count", json!(1));

        doc.apply_defaults().await;
        assert_eq!(doc.get_scalar("count"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_noop_for_persisted_documents() {
        let schema = Arc::new(
            Schema::new("users")
                .path("status", PathDescriptor::string().with_default(json!("pending"))),
        );
        let mut raw = serde_json::Map::new();
        raw.insert("status".to_string(), Value::Null);
        let mut doc = Document::from_stored(schema, raw);

        doc.apply_defaults().await;
        assert_eq!(doc.get_scalar("status"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_unhydrated_path_gets_no_default() {
        let schema = Arc::new(
            Schema::new("users")
                .path("status", PathDescriptor::string().with_default(json!("pending"))),
        );
        let mut doc = Document::new(schema);

        doc.apply_defaults().await;
        assert!(doc.get("status").is_none());
    }
}
