use cachenet_client::{LogLevel, LogQuery};
use cachenet_console::ConsoleSession;
use cachenet_topology::NodeId;

use super::report;
use crate::render::OutputFormat;

pub async fn dates(session: &ConsoleSession, format: OutputFormat) -> anyhow::Result<()> {
    let dates = session.log_dates().await.map_err(report)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&dates)?),
        OutputFormat::Text => {
            for node in &dates {
                println!("{}: {}", node.node_id, node.dates.join(", "));
            }
        }
    }
    Ok(())
}

pub async fn fetch(
    session: &ConsoleSession,
    node: NodeId,
    date: String,
    level: LogLevel,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let query = LogQuery {
        node_id: node,
        date,
        log_level: level,
    };
    let entries = session.fetch_logs(&query).await.map_err(report)?;
    match (format, entries.as_array()) {
        (OutputFormat::Text, Some(lines)) => {
            for line in lines {
                match line.as_str() {
                    Some(s) => println!("{s}"),
                    None => println!("{line}"),
                }
            }
        }
        _ => println!("{}", serde_json::to_string_pretty(&entries)?),
    }
    Ok(())
}
