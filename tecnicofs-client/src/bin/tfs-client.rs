//! Command-line front end for [`tecnicofs_client::Client`]: mounts, issues
//! exactly one operation, unmounts.

use clap::{Parser, Subcommand};

use tecnicofs_client::Client;
use tecnicofs_core::InodeType;

#[derive(Parser, Debug)]
#[command(name = "tfs-client", about = "TecnicoFS command-line client")]
struct Cli {
    /// Path of the server's Unix datagram socket.
    #[arg(short, long)]
    socket: std::path::PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Create a file.
    CreateFile { path: String },
    /// Create a directory.
    CreateDir { path: String },
    /// Delete a file or empty directory.
    Delete { path: String },
    /// Look up a path and print its inumber.
    Lookup { path: String },
    /// Move an entry from one path to another.
    Move { from: String, to: String },
    /// Print the whole tree to a file on the server's filesystem.
    Print { out_path: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = Client::mount(&cli.socket)?;

    match cli.command {
        CliCommand::CreateFile { path } => client.create(&path, InodeType::File)?,
        CliCommand::CreateDir { path } => client.create(&path, InodeType::Directory)?,
        CliCommand::Delete { path } => client.delete(&path)?,
        CliCommand::Lookup { path } => match client.lookup(&path)? {
            Some(inumber) => println!("{inumber}"),
            None => println!("not found"),
        },
        CliCommand::Move { from, to } => client.move_(&from, &to)?,
        CliCommand::Print { out_path } => client.print(&out_path)?,
    }

    client.unmount()?;
    Ok(())
}
