//! `diag-highlight` - run a language server headlessly and print the color highlights it yields.
//!
//! The files are opened in the client, the first one gets editor focus, and
//! `extension.toggleHighlight` runs once. The resulting decorations are printed as JSON on
//! stdout; logs go to stderr (`RUST_LOG` controls the filter).

use anyhow::{Context, Result, bail};
use clap::Parser;
use diag_highlight::{DecorationStyleId, Location, MemoryWindow, TOGGLE_HIGHLIGHT_COMMAND};
use diag_highlight_lsp::{Extension, ExtensionContext, HighlightConfig, LaunchMode, path_to_file_uri};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "diag-highlight")]
#[command(about = "Highlight diagnostics that carry Color:r,g,b related information")]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Directory relative server paths resolve against
    #[arg(long, default_value = ".")]
    extension_path: PathBuf,
    /// Workspace folder reported to the server
    #[arg(long)]
    workspace: Option<PathBuf>,
    /// Launch the server with its debug arguments (also enabled by DIAG_HIGHLIGHT_DEBUG)
    #[arg(long)]
    debug: bool,
    /// Language id the files are opened with
    #[arg(long, default_value = "plaintext")]
    language: String,
    /// How long to wait for each file's diagnostics, in milliseconds
    #[arg(long, default_value_t = 5000)]
    wait_ms: u64,
    /// Files to open; the first one is the focused editor
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Report {
    editor: String,
    documents: Vec<DocumentReport>,
    highlights: Vec<HighlightReport>,
    notices: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DocumentReport {
    uri: String,
    diagnostics: usize,
}

#[derive(Debug, Serialize)]
struct HighlightReport {
    style: DecorationStyleId,
    background: String,
    locations: Vec<Location>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => HighlightConfig::load(path)?,
        None => HighlightConfig::default(),
    };

    let mut context = ExtensionContext::new(&cli.extension_path);
    context.workspace_root = cli.workspace.clone();
    context.mode = if cli.debug {
        LaunchMode::Debug
    } else {
        LaunchMode::from_env()
    };

    let mut extension =
        Extension::activate(&config, &context).context("failed to start the language client")?;
    let report = run(&cli, &mut extension);

    if let Some(handle) = extension.deactivate()
        && let Err(err) = handle.wait()
    {
        tracing::warn!("Language client did not stop cleanly: {err}");
    }

    println!("{}", serde_json::to_string_pretty(&report?)?);
    Ok(())
}

fn run(cli: &Cli, extension: &mut Extension) -> Result<Report> {
    let mut uris = Vec::new();
    for file in &cli.files {
        let text =
            fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
        let uri = path_to_file_uri(file);
        if extension
            .client_mut()
            .open_document(&uri, &cli.language, 1, &text)?
        {
            uris.push(uri);
        } else {
            tracing::warn!(%uri, language = %cli.language, "Document not handled by the server");
        }
    }
    let Some(editor_uri) = uris.first().cloned() else {
        bail!("none of the files match the document selector");
    };

    let timeout = Duration::from_millis(cli.wait_ms);
    for uri in &uris {
        if !extension.client_mut().wait_for_diagnostics(uri, timeout) {
            tracing::warn!(%uri, "No diagnostics published before the timeout");
        }
    }

    let mut window = MemoryWindow::with_editor(editor_uri.clone());
    extension.poll(&mut window);
    extension.execute_command(TOGGLE_HIGHLIGHT_COMMAND, &mut window)?;

    let documents = uris
        .iter()
        .map(|uri| DocumentReport {
            uri: uri.clone(),
            diagnostics: extension
                .client()
                .diagnostics()
                .get(uri)
                .map_or(0, <[_]>::len),
        })
        .collect();

    let visible = window
        .editor()
        .map(|editor| editor.visible().clone())
        .unwrap_or_default();
    let highlights = window
        .allocated_styles()
        .iter()
        .filter_map(|style| {
            let locations = visible.get(&style.id)?;
            Some(HighlightReport {
                style: style.id,
                background: style.options.background_color.to_string(),
                locations: locations.clone(),
            })
        })
        .collect();

    Ok(Report {
        editor: editor_uri,
        documents,
        highlights,
        notices: window.notices().to_vec(),
    })
}
