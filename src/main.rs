use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use recipevault::cli::{Cli, Commands, PhotoCommand};
use recipevault::commands::Vault;
use recipevault::config::Config;
use recipevault::search::SearchResult;
use recipevault::storage::attachment::Upload;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("recipevault=warn"));

    // stdout carries command output (and the MCP protocol); logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn open_vault(root: Option<PathBuf>) -> anyhow::Result<Vault> {
    let mut config = Config::load()?;
    config.apply_root_override(root.map(|r| r.display().to_string()));
    Vault::open(&config)
        .with_context(|| format!("Cannot open recipe root {}", config.root().display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_results(query: &str, results: &[SearchResult], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&results);
    }
    if results.is_empty() {
        println!("No matches found for '{query}'");
        return Ok(());
    }
    for result in results {
        println!("{} ({})  {}", result.path, result.score, result.title);
        if let Some(preview) = &result.preview {
            println!("    {}", preview.replace('\n', " "));
        }
    }
    println!("{} result(s) found", results.len());
    Ok(())
}

fn read_input(file: Option<PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("Cannot read {}", path.display())),
        None => {
            let mut content = String::new();
            io::stdin().read_to_string(&mut content)?;
            Ok(content)
        }
    }
}

fn run_photo(vault: &Vault, action: PhotoCommand) -> anyhow::Result<()> {
    match action {
        PhotoCommand::Put {
            recipe,
            file,
            content_type,
        } => {
            let content =
                fs::read(&file).with_context(|| format!("Cannot read {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let photo = vault.put_attachment(
                &recipe,
                &content,
                Upload {
                    filename: &filename,
                    content_type: content_type.as_deref(),
                },
            )?;
            println!("Saved {photo}");
        }
        PhotoCommand::Get { recipe, output } => {
            let content = vault.get_attachment(&recipe)?;
            match output {
                Some(path) => fs::write(&path, content)
                    .with_context(|| format!("Cannot write {}", path.display()))?,
                None => io::stdout().write_all(&content)?,
            }
        }
        PhotoCommand::Delete { recipe } => {
            vault.delete_attachment(&recipe)?;
            println!("Deleted photo of {recipe}");
        }
        PhotoCommand::Exists { recipe } => {
            println!("{}", vault.attachment_exists(&recipe)?);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let Some(command) = cli.command else {
        Cli::parse_from(["recipevault", "--help"]);
        return Ok(());
    };

    let vault = open_vault(cli.root)?;

    match command {
        Commands::List {
            path,
            recursive,
            json,
        } => {
            if recursive {
                let mut listing = vault.list_recursive(&path)?;
                let entries: Vec<_> = listing.by_ref().collect();
                for skipped in listing.skipped() {
                    eprintln!("Skipped: {}", skipped.reason);
                }
                if json {
                    return print_json(&entries);
                }
                for entry in &entries {
                    println!("{}", entry.path);
                }
            } else {
                let entries = vault.list_directory(&path)?;
                if json {
                    return print_json(&entries);
                }
                for entry in &entries {
                    if entry.is_dir() {
                        println!("{}/", entry.path);
                    } else {
                        println!("{}", entry.path);
                    }
                }
            }
        }
        Commands::Read { path, json } => {
            let document = vault.read_document(&path)?;
            if json {
                return print_json(&document);
            }
            print!("{}", document.content);
        }
        Commands::Write {
            path,
            file,
            expected_version,
        } => {
            let content = read_input(file)?;
            let version = vault.write_document(&path, &content, expected_version)?;
            println!("Wrote {path} (version {version})");
        }
        Commands::New { path } => {
            let created = vault.create_recipe(&path)?;
            println!("Created {created}");
        }
        Commands::Delete { path } => {
            vault.delete_document(&path)?;
            println!("Deleted {path}");
        }
        Commands::Move { from, to } => {
            vault.move_document(&from, &to)?;
            println!("Moved {from} -> {to}");
        }
        Commands::Mkdir { path } => {
            vault.create_directory(&path)?;
            println!("Created directory {path}");
        }
        Commands::Rmdir { path } => {
            vault.delete_directory(&path)?;
            println!("Removed directory {path}");
        }
        Commands::Search { query, limit, json } => {
            print_results(&query, &vault.search_content(&query, limit), json)?;
        }
        Commands::Find { query, limit, json } => {
            print_results(&query, &vault.search_filenames(&query, limit), json)?;
        }
        Commands::Validate { path } => {
            let validation = vault.validate_recipe(&path)?;
            if !validation.valid {
                for error in &validation.errors {
                    println!("- {error}");
                }
                anyhow::bail!("{path} is not a valid recipe");
            }
            println!("{path} is valid");
        }
        Commands::Photo { action } => run_photo(&vault, action)?,
        #[cfg(feature = "mcp")]
        Commands::Serve => {
            tokio::runtime::Runtime::new()?.block_on(recipevault::mcp::serve(vault))?;
        }
    }

    Ok(())
}
