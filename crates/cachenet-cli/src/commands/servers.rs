use cachenet_client::{ServerAuth, ServerForm};
use cachenet_console::ConsoleSession;
use cachenet_topology::ServerRef;

use super::report;
use crate::ServerArgs;
use crate::render::OutputFormat;

fn form(args: ServerArgs) -> anyhow::Result<ServerForm> {
    let auth = match (args.password, args.key_file) {
        (Some(password), _) => ServerAuth::Password(password),
        (None, Some(path)) => ServerAuth::PrivateKey {
            key: std::fs::read_to_string(&path)?,
            passphrase: args.passphrase,
        },
        (None, None) => anyhow::bail!("either --password or --key-file is required"),
    };
    Ok(ServerForm {
        name: args.name,
        ip: args.ip,
        username: args.username,
        ssh_port: args.ssh_port,
        grpc_port: args.grpc_port,
        auth,
    })
}

pub async fn list(session: &ConsoleSession, format: OutputFormat) -> anyhow::Result<()> {
    let snapshot = session.data().snapshot().await;
    let topology = snapshot.topology();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot.servers)?),
        OutputFormat::Text => {
            for s in &snapshot.servers {
                let used = if topology.server_in_use(&s.id) { " (in use)" } else { "" };
                println!(
                    "{} {} {}@{} ssh:{} grpc:{}{used}",
                    s.id, s.name, s.username, s.ip, s.ssh_port, s.grpc_port
                );
            }
        }
    }
    Ok(())
}

pub async fn create(session: &ConsoleSession, args: ServerArgs) -> anyhow::Result<()> {
    let form = form(args)?;
    session.create_server(&form).await.map_err(report)?;
    println!("✓ server {} created", form.name);
    Ok(())
}

pub async fn update(session: &ConsoleSession, server: &str, args: ServerArgs) -> anyhow::Result<()> {
    let form = form(args)?;
    session
        .update_server(&ServerRef::new(server), &form)
        .await
        .map_err(report)?;
    println!("✓ server {server} updated");
    Ok(())
}

pub async fn delete(session: &ConsoleSession, server: &str) -> anyhow::Result<()> {
    session
        .delete_server(&ServerRef::new(server))
        .await
        .map_err(report)?;
    println!("✓ server {server} deleted");
    Ok(())
}
