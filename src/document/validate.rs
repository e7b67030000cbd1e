//! Validation coordinator
//!
//! Validates every hydrated path, recursing into embedded documents.
//! All per-path work fans out concurrently; the first failure aborts
//! the drain and the remaining futures are dropped, so the coordinator
//! completes exactly once.

use futures_util::future::{self, BoxFuture};
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;

use crate::schema::types::{PathKind, Validator};

use super::errors::{DocumentError, DocumentResult};
use super::{Document, PathValue};

impl Document {
    /// Validate every hydrated path. Succeeds immediately when nothing
    /// is hydrated; otherwise succeeds only once every path and every
    /// embedded document has passed. First failure wins.
    pub fn validate(&self) -> BoxFuture<'_, DocumentResult<()>> {
        Box::pin(async move {
            if self.state.is_empty() {
                return Ok(());
            }

            let mut pending: FuturesUnordered<BoxFuture<'_, DocumentResult<()>>> =
                FuturesUnordered::new();

            for path in self.state.hydrated() {
                let Some(descriptor) = self.schema.get(path) else {
                    continue;
                };
                match &descriptor.kind {
                    PathKind::EmbeddedDocument(_) | PathKind::EmbeddedDocumentCollection(_) => {
                        match self.values.get(path) {
                            Some(PathValue::Document(doc)) => pending.push(doc.validate()),
                            Some(PathValue::Collection(docs)) => {
                                for doc in docs {
                                    pending.push(doc.validate());
                                }
                            }
                            _ => {}
                        }
                    }
                    PathKind::Scalar(_) => {
                        pending.push(Box::pin(self.validate_path(path)));
                    }
                }
            }

            while let Some(result) = pending.next().await {
                // first error drops the remaining futures
                result?;
            }
            Ok(())
        })
    }

    /// Run every validator declared for one path, concurrently.
    ///
    /// Pattern validators test the string form of the value and fail
    /// with the configured message; predicate validators fail with the
    /// message they resolve to. First failure wins.
    pub(crate) async fn validate_path(&self, path: &str) -> DocumentResult<()> {
        let Some(descriptor) = self.schema.get(path) else {
            return Ok(());
        };
        if descriptor.validators.is_empty() {
            return Ok(());
        }

        let value = match self.values.get(path) {
            Some(PathValue::Scalar(value)) => value.clone(),
            _ => Value::Null,
        };

        let mut passed: FuturesUnordered<BoxFuture<'static, DocumentResult<()>>> =
            FuturesUnordered::new();

        for validator in &descriptor.validators {
            match validator {
                Validator::Pattern { regex, message } => {
                    let result = if regex.is_match(&scalar_text(&value)) {
                        Ok(())
                    } else {
                        Err(DocumentError::validator(path, message.clone()))
                    };
                    passed.push(Box::pin(future::ready(result)));
                }
                Validator::Func(test) => {
                    let pending = test(value.clone());
                    let path = path.to_string();
                    passed.push(Box::pin(async move {
                        match pending.await {
                            Some(message) => Err(DocumentError::validator(path, message)),
                            None => Ok(()),
                        }
                    }));
                }
            }
        }

        while let Some(result) = passed.next().await {
            result?;
        }
        Ok(())
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::PathDescriptor;
    use crate::schema::Schema;
    use regex::Regex;
    use serde_json::{json, Map};
    use std::sync::Arc;

    fn nonempty_name_schema() -> Arc<Schema> {
        Arc::new(Schema::new("users").path(
            "name",
            PathDescriptor::string()
                .with_pattern(Regex::new("^.+$").unwrap(), "name must not be empty"),
        ))
    }

    #[tokio::test]
    async fn test_empty_document_validates() {
        let doc = Document::new(nonempty_name_schema());
        assert!(doc.validate().await.is_ok());
    }

    #[tokio::test]
    async fn test_pattern_failure_carries_configured_message() {
        let mut doc = Document::new(nonempty_name_schema());
        doc.set("name", json!(""));

        let err = doc.validate().await.unwrap_err();
        assert_eq!(err, DocumentError::validator("name", "name must not be empty"));
    }

    #[tokio::test]
    async fn test_passing_pattern() {
        let mut doc = Document::new(nonempty_name_schema());
        doc.set("name", json!("alice"));
        assert!(doc.validate().await.is_ok());
    }

    #[tokio::test]
    async fn test_predicate_validator_rejects_with_message() {
        let schema = Arc::new(Schema::new("users").path(
            "age",
            PathDescriptor::int().with_validator(|value| {
                Box::pin(async move {
                    match value.as_i64() {
                        Some(age) if age >= 0 => None,
                        _ => Some("age must be non-negative".to_string()),
                    }
                })
            }),
        ));
        let mut doc = Document::new(schema);
        doc.set("age", json!(-3));

        let err = doc.validate().await.unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Validator { message, .. } if message == "age must be non-negative"
        ));
    }

    #[tokio::test]
    async fn test_first_failure_wins_over_slow_success() {
        let schema = Arc::new(Schema::new("users").path(
            "name",
            PathDescriptor::string()
                .with_pattern(Regex::new("^.+$").unwrap(), "required")
                .with_validator(|_| {
                    Box::pin(async {
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        None
                    })
                }),
        ));
        let mut doc = Document::new(schema);
        doc.set("name", json!(""));

        // the regex failure completes the coordinator once; the slow
        // success is dropped, never firing a second completion
        let err = doc.validate().await.unwrap_err();
        assert_eq!(err, DocumentError::validator("name", "required"));
    }

    #[tokio::test]
    async fn test_embedded_collection_failure_surfaces() {
        let items = Arc::new(Schema::new("items").path(
            "sku",
            PathDescriptor::string().with_pattern(Regex::new("^.+$").unwrap(), "sku required"),
        ));
        let schema = Arc::new(
            Schema::new("orders").path("items", PathDescriptor::embedded_collection(items)),
        );

        let mut raw = Map::new();
        raw.insert("items".to_string(), json!([{ "sku": "ok" }, { "sku": "" }]));
        let doc = Document::from_stored(schema, raw);

        let err = doc.validate().await.unwrap_err();
        assert_eq!(err, DocumentError::validator("sku", "sku required"));
    }

    #[tokio::test]
    async fn test_embedded_collection_all_valid() {
        let items = Arc::new(Schema::new("items").path(
            "sku",
            PathDescriptor::string().with_pattern(Regex::new("^.+$").unwrap(), "sku required"),
        ));
        let schema = Arc::new(
            Schema::new("orders").path("items", PathDescriptor::embedded_collection(items)),
        );

        let mut raw = Map::new();
        raw.insert("items".to_string(), json!([{ "sku": "a" }, { "sku": "b" }]));
        let doc = Document::from_stored(schema, raw);

        assert!(doc.validate().await.is_ok());
    }
}
