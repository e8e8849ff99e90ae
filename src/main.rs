//! Mockwire CLI

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use mockwire::config::Config;
use mockwire::recording::MappingDocument;
use mockwire::replay::{MappingSet, StandInServer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Mockwire v{}", env!("CARGO_PKG_VERSION"));
        eprintln!();
        eprintln!("Usage: mockwire <command> [options]");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  serve <config.toml>     Serve recorded mappings, one server per service");
        eprintln!("  inspect <mock-data-dir> List recorded mappings per scenario and service");
        process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let command = &args[1];

    let result = match command.as_str() {
        "serve" => match args.get(2) {
            Some(path) => serve(&PathBuf::from(path)),
            None => usage("mockwire serve <config.toml>"),
        },
        "inspect" => match args.get(2) {
            Some(dir) => inspect(&PathBuf::from(dir)),
            None => usage("mockwire inspect <mock-data-dir>"),
        },
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!("Run 'mockwire' for usage information.");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn usage(line: &str) -> Result<()> {
    eprintln!("Usage: {line}");
    process::exit(1);
}

fn serve(config_path: &Path) -> Result<()> {
    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(async move {
        let mut servers = Vec::new();

        for service in &config.services {
            let mappings = Arc::new(MappingSet::new());
            if config.mock_data_dir.is_dir() {
                mappings
                    .load_dir(&config.mock_data_dir, &service.name)
                    .await
                    .with_context(|| format!("Failed to load mappings for {}", service.name))?;
            } else {
                warn!(
                    "Mock data directory {} not found, serving no mappings",
                    config.mock_data_dir.display()
                );
            }

            let server = StandInServer::start(mappings).await?;
            println!("{} -> {}", service.name, server.url());
            servers.push(server);
        }

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        info!("Received SIGINT, shutting down");

        for server in servers {
            let stats = server.mappings().stats().await;
            info!(
                "{}: {} mappings, {} hits, {} misses",
                server.url(),
                stats.mappings,
                stats.hits,
                stats.misses
            );
            server.shutdown().await;
        }

        Ok::<(), anyhow::Error>(())
    })
}

fn inspect(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Directory not found: {}", dir.display());
    }

    println!("Mock data directory: {}", dir.display());

    for scenario in sorted_dirs(dir)? {
        println!();
        println!("{}", file_name(&scenario));

        for service in sorted_dirs(&scenario)? {
            let mut files = Vec::new();
            collect_files(&service, &mut files)?;
            files.sort();

            println!("  {} ({} mappings)", file_name(&service), files.len());
            for file in files {
                let summary = std::fs::read_to_string(&file)
                    .ok()
                    .and_then(|text| MappingDocument::from_json(&text).ok())
                    .map_or_else(
                        || "unreadable".to_string(),
                        |doc| {
                            format!(
                                "{} {} -> {}",
                                doc.request.methods.join(","),
                                doc.request.path,
                                doc.response.status_code
                            )
                        },
                    );
                let shown = file.strip_prefix(&service).unwrap_or(&file);
                println!("    {:<40} {}", shown.display(), summary);
            }
        }
    }

    Ok(())
}

fn sorted_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Files under `dir`, including subdirectories
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
