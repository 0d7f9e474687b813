use cachenet_console::{ConsoleSession, NodeWorkbench};
use cachenet_topology::{NodeId, StagedAddition, TopologyResult};

use super::report;
use crate::render::{self, OutputFormat};

pub async fn list(session: &ConsoleSession, format: OutputFormat) -> anyhow::Result<()> {
    let workbench = session.node_workbench().await;
    match format {
        OutputFormat::Json => {
            let records: Vec<_> = workbench.topology().records().collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Text => print!("{}", render::node_tree(&workbench)),
    }
    Ok(())
}

/// One `--add` or `--delete` flag of `nodes apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEdit {
    Add(StagedAddition),
    Delete(NodeId),
}

/// Stage `edits` in order; the first rejected edit stops the run.
pub fn stage(workbench: &mut NodeWorkbench, edits: Vec<NodeEdit>) -> TopologyResult<()> {
    for edit in edits {
        match edit {
            NodeEdit::Add(a) => workbench.add_node(a.parent_id, a.node_id, a.server.0)?,
            NodeEdit::Delete(node) => workbench.delete_subtree(node)?,
        }
    }
    Ok(())
}

pub async fn apply(
    session: &ConsoleSession,
    edits: Vec<NodeEdit>,
    dry_run: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut workbench = session.node_workbench().await;
    stage(&mut workbench, edits).map_err(|e| anyhow::anyhow!("staging rejected: {e}"))?;

    let diff = workbench.diff();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&diff)?),
        OutputFormat::Text => {
            print!("{}", render::node_tree(&workbench));
            println!();
            print!("{}", render::topology_diff(&diff));
        }
    }
    if dry_run {
        return Ok(());
    }

    let outcome = session.submit_nodes(&mut workbench).await.map_err(report)?;
    println!(
        "✓ submitted: {} removed, {} added",
        outcome.removed, outcome.added
    );
    Ok(())
}

pub async fn retry(session: &ConsoleSession, node: NodeId) -> anyhow::Result<()> {
    session.retry_node(node).await.map_err(report)?;
    println!("✓ node {node} queued for redeployment");
    Ok(())
}
