//! Document commands: ingest, reprocess, related.

use analyst_cluster::{Assignment, Document, DocumentId, Engine};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::util::{load_request, open_engine, output_result, require_input_file};
use crate::Cli;

/// One document in an ingest file.
///
/// ```yaml
/// - locator: https://example.com/rust-2024
///   title: What's new in Rust 2024
///   created_at: 2024-11-02T09:00:00Z
///   embedding: [0.12, -0.03, ...]
/// ```
#[derive(Debug, Deserialize)]
pub struct DocumentInput {
    pub locator: String,
    #[serde(default)]
    pub title: String,
    /// Defaults to the time of ingestion.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Documents without an embedding are registered but not clustered.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct DocumentOutcome {
    locator: String,
    id: DocumentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignment: Option<Assignment>,
}

#[derive(Args)]
pub struct IngestCommand {}

impl IngestCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let path = require_input_file(cli)?;
        let inputs: Vec<DocumentInput> = load_request(path)?;
        let engine = open_engine(cli)?;

        let mut outcomes = Vec::with_capacity(inputs.len());
        for input in inputs {
            outcomes.push(ingest(&engine, input)?);
        }

        let clustered = outcomes.iter().filter(|o| o.assignment.is_some()).count();
        info!(documents = outcomes.len(), clustered, "ingest finished");
        output_result(&outcomes, cli)
    }
}

fn ingest(engine: &Engine, input: DocumentInput) -> anyhow::Result<DocumentOutcome> {
    let created_at = input.created_at.unwrap_or_else(Utc::now);
    let doc = Document::new(input.locator.as_str(), input.title, created_at);
    engine.register(&doc)?;

    let assignment = match input.embedding {
        Some(embedding) => {
            engine.attach_embedding(&doc.id, embedding)?;
            Some(engine.on_article_embedded(&doc.id)?)
        }
        None => None,
    };

    Ok(DocumentOutcome {
        locator: input.locator,
        id: doc.id,
        assignment,
    })
}

#[derive(Args)]
pub struct ReprocessCommand {
    /// Source locator of the document
    pub locator: String,
}

impl ReprocessCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let engine = open_engine(cli)?;
        let id = DocumentId::from_locator(&self.locator);
        let assignment = engine.reprocess(&id)?;

        output_result(
            &DocumentOutcome {
                locator: self.locator.clone(),
                id,
                assignment: Some(assignment),
            },
            cli,
        )
    }
}

#[derive(Debug, Serialize)]
struct RelatedOutput {
    locator: String,
    title: String,
    similarity: f32,
}

#[derive(Args)]
pub struct RelatedCommand {
    /// Source locator of the document
    pub locator: String,
}

impl RelatedCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let engine = open_engine(cli)?;
        let id = DocumentId::from_locator(&self.locator);
        let doc = engine
            .document(&id)?
            .ok_or_else(|| anyhow::anyhow!("document '{}' not found", self.locator))?;

        let related: Vec<RelatedOutput> = engine
            .find_related(&doc)?
            .into_iter()
            .map(|m| RelatedOutput {
                locator: m.document.locator,
                title: m.document.title,
                similarity: m.similarity,
            })
            .collect();
        output_result(&related, cli)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use analyst_cluster::{AssignmentKind, Config, MemoryStore};

    use super::*;

    fn engine() -> Engine {
        let cfg = Config {
            dim: 2,
            ..Config::default()
        };
        Engine::new(cfg, Arc::new(MemoryStore::new())).unwrap()
    }

    fn parse(yaml: &str) -> Vec<DocumentInput> {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_ingest_is_idempotent() {
        let engine = engine();
        let yaml = "- locator: https://example.com/a\n  title: A\n  embedding: [1.0, 0.0]\n";

        let first = ingest(&engine, parse(yaml).remove(0)).unwrap();
        let again = ingest(&engine, parse(yaml).remove(0)).unwrap();

        let first = first.assignment.unwrap();
        let again = again.assignment.unwrap();
        assert_eq!(first.kind, AssignmentKind::Created);
        assert_eq!(again.kind, AssignmentKind::Unchanged);
        assert_eq!(first.cluster, again.cluster);
    }

    #[test]
    fn test_ingest_without_embedding_registers_only() {
        let engine = engine();
        let input = parse("- locator: https://example.com/pending\n").remove(0);

        let outcome = ingest(&engine, input).unwrap();
        assert!(outcome.assignment.is_none());

        let doc = engine.document(&outcome.id).unwrap().unwrap();
        assert_eq!(doc.locator, "https://example.com/pending");
        assert!(doc.embedding.is_none());
    }
}
