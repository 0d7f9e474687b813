use anyhow::Context;

use cachenet_client::ApplicationForm;
use cachenet_console::ConsoleSession;
use cachenet_topology::NodeId;

use super::report;
use crate::AppArgs;
use crate::render::{self, OutputFormat};

pub async fn list(session: &ConsoleSession, format: OutputFormat) -> anyhow::Result<()> {
    let snapshot = session.data().snapshot().await;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot.applications)?),
        OutputFormat::Text => {
            for app in &snapshot.applications {
                let nodes = snapshot.installation(&app.name).statuses().count();
                println!("{} ({nodes} nodes)", app.name);
            }
        }
    }
    Ok(())
}

pub async fn create(session: &ConsoleSession, args: AppArgs) -> anyhow::Result<()> {
    let schema = std::fs::read(&args.schema)
        .with_context(|| format!("reading {}", args.schema.display()))?;
    let schema_file_name = args
        .schema
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "schema".to_string());
    let form = ApplicationForm {
        application_name: args.name,
        schema_file_name,
        schema,
        master_password: args.master_password,
        master_password_confirmation: args.confirm_password,
        client_lease_time: args.client_lease_time,
        server_additional_time: args.server_additional_time,
    };
    session.create_application(&form).await.map_err(report)?;
    println!("✓ application {} created", form.application_name);
    Ok(())
}

pub async fn remove(session: &ConsoleSession, name: &str) -> anyhow::Result<()> {
    session.remove_application(name).await.map_err(report)?;
    println!("✓ application {name} removed");
    Ok(())
}

pub async fn status(session: &ConsoleSession, app: &str, format: OutputFormat) -> anyhow::Result<()> {
    let mut workbench = session.application_workbench().await;
    workbench.select(app).map_err(report)?;
    match format {
        OutputFormat::Json => {
            let statuses: Vec<_> = workbench
                .view()
                .map(|v| v.statuses().collect())
                .unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&statuses)?);
        }
        OutputFormat::Text => print!("{}", render::installation_tree(&workbench)),
    }
    Ok(())
}

/// One `--install` or `--uninstall` flag of `apps apply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEdit {
    Install(NodeId),
    Uninstall(NodeId),
}

pub async fn apply(
    session: &ConsoleSession,
    app: &str,
    edits: Vec<AppEdit>,
    dry_run: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut workbench = session.application_workbench().await;
    workbench.select(app).map_err(report)?;
    for edit in edits {
        match edit {
            AppEdit::Install(node) => workbench
                .install(node)
                .map_err(|e| anyhow::anyhow!("--install {node}: {e}"))?,
            AppEdit::Uninstall(node) => workbench
                .uninstall(node)
                .map_err(|e| anyhow::anyhow!("--uninstall {node}: {e}"))?,
        }
    }

    let diff = workbench.diff();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&diff)?),
        OutputFormat::Text => {
            print!("{}", render::installation_tree(&workbench));
            println!();
            print!("{}", render::installation_diff(&diff));
        }
    }
    if dry_run {
        return Ok(());
    }

    let outcome = session
        .submit_applications(&mut workbench)
        .await
        .map_err(report)?;
    println!(
        "✓ submitted: {} removed, {} installed",
        outcome.removed, outcome.added
    );
    Ok(())
}
