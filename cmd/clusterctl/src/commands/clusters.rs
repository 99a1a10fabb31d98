//! Cluster commands: merge, refresh, clusters, cleanup, history.

use analyst_cluster::{Cluster, ClusterId, DocumentId};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use super::util::{open_engine, output_result};
use crate::Cli;

/// Cluster fields shown to operators. The centroid is left out.
#[derive(Debug, Serialize)]
struct ClusterSummary {
    id: ClusterId,
    label: String,
    slug: String,
    member_count: usize,
    priority_score: f64,
    active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    representative: Option<DocumentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_membership_change: Option<DateTime<Utc>>,
}

impl From<Cluster> for ClusterSummary {
    fn from(c: Cluster) -> Self {
        Self {
            id: c.id,
            label: c.label,
            slug: c.slug,
            member_count: c.member_count,
            priority_score: c.priority_score,
            active: c.active,
            representative: c.representative,
            last_membership_change: c.last_membership_change,
        }
    }
}

#[derive(Debug, Serialize)]
struct Count {
    count: usize,
}

#[derive(Args)]
pub struct MergeCommand {
    /// Cluster whose members move
    pub source: u64,

    /// Cluster receiving the members
    pub target: u64,

    /// Reason recorded in the merge history
    #[arg(short, long, default_value = "manual")]
    pub reason: String,
}

impl MergeCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let engine = open_engine(cli)?;
        let record =
            engine.merge_clusters(ClusterId(self.source), ClusterId(self.target), &self.reason)?;
        output_result(&record, cli)
    }
}

#[derive(Args)]
pub struct RefreshCommand {
    /// Cluster to refresh (default: every active cluster)
    pub cluster: Option<u64>,
}

impl RefreshCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let engine = open_engine(cli)?;
        match self.cluster {
            Some(id) => {
                let cluster = engine.refresh_statistics(ClusterId(id))?;
                output_result(&ClusterSummary::from(cluster), cli)
            }
            None => {
                let count = engine.refresh_all_statistics()?;
                output_result(&Count { count }, cli)
            }
        }
    }
}

#[derive(Args)]
pub struct ClustersCommand {
    /// Maximum clusters to list
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,
}

impl ClustersCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let engine = open_engine(cli)?;
        let clusters: Vec<ClusterSummary> = engine
            .ranked_clusters(self.limit)?
            .into_iter()
            .map(ClusterSummary::from)
            .collect();
        output_result(&clusters, cli)
    }
}

#[derive(Args)]
pub struct CleanupCommand {}

impl CleanupCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let engine = open_engine(cli)?;
        let count = engine.deactivate_empty_clusters()?;
        output_result(&Count { count }, cli)
    }
}

#[derive(Args)]
pub struct HistoryCommand {}

impl HistoryCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let engine = open_engine(cli)?;
        output_result(&engine.merge_history()?, cli)
    }
}
