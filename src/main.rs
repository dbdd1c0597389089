use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

use parrot::core::config;
use parrot::core::export::{export_chat, import_chat};
use parrot::core::history::{HistoryStore, JsonFileHistory};
use parrot::{mock, tui};

#[derive(Parser)]
#[command(name = "parrot", about = "Terminal chat client with a built-in mock completion server")]
struct Args {
    /// Run the mock OpenAI-compatible server instead of the chat UI
    #[arg(long)]
    serve: bool,

    /// Port for --serve (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Completion server URL (overrides config file and PARROT_SERVER_URL)
    #[arg(long)]
    url: Option<String>,

    /// Replace the saved conversation with one imported from a JSON file
    #[arg(long, value_name = "FILE")]
    import: Option<PathBuf>,

    /// Write the saved conversation to a JSON file and exit
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    // File logger; stdout belongs to the TUI
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = File::create("parrot.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(1);
        }
    };
    let resolved = config::resolve(&file_config, args.url.as_deref(), args.port);

    if args.serve {
        let addr = ("127.0.0.1", resolved.port);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("Mock server listening on {}:{}", addr.0, addr.1);
        println!("parrot mock server listening on http://{}:{}", addr.0, addr.1);
        return mock::serve(listener, resolved.mock).await;
    }

    if let Some(path) = args.export {
        let history = history_store();
        let messages = history.load();
        let json = export_chat(&messages)
            .map_err(|e| std::io::Error::other(format!("export failed: {e}")))?;
        std::fs::write(&path, json)?;
        println!("exported {} messages to {}", messages.len(), path.display());
        return Ok(());
    }

    if let Some(path) = args.import {
        let json = std::fs::read_to_string(&path)?;
        let messages = import_chat(&json)
            .map_err(|e| std::io::Error::other(format!("import failed: {e}")))?;
        let history = history_store();
        history.save(&messages);
        println!("imported {} messages from {}", messages.len(), path.display());
        return Ok(());
    }

    log::info!("Parrot starting, server url {}", resolved.server_url);
    tui::run(resolved)
}

fn history_store() -> JsonFileHistory {
    match JsonFileHistory::default_path() {
        Some(path) => JsonFileHistory::new(path),
        None => {
            eprintln!("could not determine home directory");
            std::process::exit(1);
        }
    }
}
