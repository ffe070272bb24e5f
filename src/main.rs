//! Command-line front end: list or extract archives from local paths or
//! HTTP URLs.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use lazyzip::{Cli, Entry, HttpRangeReader, LocalFileReader, ReadAt, ZipExtractor};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.is_http_url() {
        let reader = Arc::new(HttpRangeReader::new(cli.file.clone()).await?);
        process_zip(reader.clone(), &cli).await?;

        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {}",
                format_size(reader.transferred_bytes())
            );
        }
    } else {
        let reader = Arc::new(LocalFileReader::new(Path::new(&cli.file))?);
        process_zip(reader, &cli).await?;
    }

    Ok(())
}

async fn process_zip<R: ReadAt>(reader: Arc<R>, cli: &Cli) -> Result<()> {
    let extractor = ZipExtractor::with_options(reader, cli.reader_options());

    if cli.list || cli.verbose {
        return list_files(&extractor, cli.verbose).await;
    }

    let mut selected = Vec::new();
    for entry in extractor.zip().entries().await? {
        let entry = entry?;
        let name = entry.name()?;
        if !entry.is_directory() && is_selected(cli, &name) {
            selected.push((name, entry));
        }
    }

    let show_names = cli.pipe && selected.len() > 1;
    for (name, entry) in &selected {
        extract_file(&extractor, name, entry, cli, show_names)
            .await
            .with_context(|| format!("failed to extract {}", name))?;
    }

    Ok(())
}

/// Positional FILES narrow the selection (exact path, base name or glob);
/// `-x` patterns remove from it.
fn is_selected(cli: &Cli, name: &str) -> bool {
    let base = name.rsplit('/').next().unwrap_or(name);

    if !cli.files.is_empty() {
        let wanted = cli.files.iter().any(|f| {
            if has_glob_chars(f) {
                glob_match(f, name)
            } else {
                f == name || f == base
            }
        });
        if !wanted {
            return false;
        }
    }

    !cli
        .exclude
        .iter()
        .any(|x| name.contains(x.as_str()) || glob_match(x, name))
}

async fn list_files<R: ReadAt>(extractor: &ZipExtractor<R>, verbose: bool) -> Result<()> {
    if verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  {:>8}  Name",
            "Length", "Size", "Cmpr", "Date", "Time", "CRC-32"
        );
        println!("{}", "-".repeat(80));
    }

    let mut total_size = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in extractor.zip().entries().await? {
        let entry = entry?;
        let name = entry.name()?;

        if !verbose {
            println!("{}", name);
            continue;
        }

        let (year, month, day) = entry.mod_date();
        let (hour, minute, _) = entry.mod_time();
        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {:08x}  {}",
            entry.size(),
            entry.compressed_size(),
            ratio(entry.compressed_size(), entry.size()),
            year,
            month,
            day,
            hour,
            minute,
            entry.crc32(),
            name
        );

        if !entry.is_directory() {
            total_size += entry.size();
            total_compressed += entry.compressed_size();
            file_count += 1;
        }
    }

    if verbose {
        println!("{}", "-".repeat(80));
        println!(
            "{:>10}  {:>10}  {}  {:>31}  {} files",
            total_size,
            total_compressed,
            ratio(total_compressed, total_size),
            "",
            file_count
        );
    }

    Ok(())
}

/// Space saved, as a right-aligned percentage.
fn ratio(compressed: u64, size: u64) -> String {
    if size == 0 || compressed >= size {
        return "   0%".to_string();
    }
    format!("{:>4}%", 100 - compressed * 100 / size)
}

async fn extract_file<R: ReadAt>(
    extractor: &ZipExtractor<R>,
    name: &str,
    entry: &Entry<R>,
    cli: &Cli,
    show_name: bool,
) -> Result<()> {
    if cli.pipe {
        let mut stdout = tokio::io::stdout();
        if show_name {
            stdout
                .write_all(format!("--- {} ---\n", name).as_bytes())
                .await?;
        }
        extractor.extract_to_writer(entry, &mut stdout).await?;
        return Ok(());
    }

    let relative = if cli.junk_paths {
        name.rsplit('/').next().unwrap_or(name)
    } else {
        name
    };
    let relative = relative.trim_start_matches('/');
    if relative.split('/').any(|part| part == "..") {
        if !cli.is_very_quiet() {
            eprintln!("Skipping: {} (path escapes destination)", name);
        }
        return Ok(());
    }

    let output_path = match cli.extract_dir {
        Some(ref dir) => PathBuf::from(dir).join(relative),
        None => PathBuf::from(relative),
    };

    if output_path.exists() {
        if cli.never_overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (file exists)", name);
            }
            return Ok(());
        }
        if !cli.overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (use -o to overwrite)", name);
            }
            return Ok(());
        }
    }

    if !cli.is_quiet() {
        println!("  extracting: {}", name);
    }
    extractor.extract_to_file(entry, &output_path).await?;

    Ok(())
}

fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// `*` and `?` wildcard match over whole names.
///
/// Greedy scan with a single backtrack point at the last `*`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match size {
        s if s >= GB => format!("{:.2} GB", s as f64 / GB as f64),
        s if s >= MB => format!("{:.2} MB", s as f64 / MB as f64),
        s if s >= KB => format!("{:.2} KB", s as f64 / KB as f64),
        s => format!("{} bytes", s),
    }
}
