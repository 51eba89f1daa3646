//! MftScan CLI
//!
//! Command-line front end for the MFT parser: inspect single entries,
//! resolve paths, or walk a whole table into text or JSON records.

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use mftscan::ntfs::AttributeContent;
use mftscan::{format_size, Mft, MftConfig, MftEntry};
use serde::Serialize;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Instant;

/// MftScan - Forensic NTFS Master File Table parser
///
/// Works on standalone $MFT images; the volume itself is never touched.
#[derive(Parser)]
#[command(name = "mftscan")]
#[command(author = "MftScan Contributors")]
#[command(version)]
#[command(about = "Forensic NTFS MFT parser", long_about = None)]
struct Cli {
    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show table-level information (entry size, slot counts)
    Info {
        /// Path to the MFT image
        mft: PathBuf,

        /// Entry size in bytes (0 = auto-detect)
        #[arg(long, default_value = "0")]
        entry_size: u32,
    },

    /// Dump one entry: header, attributes, datastreams
    Entry {
        /// Path to the MFT image
        mft: PathBuf,

        /// Record number
        record: u64,

        /// Entry size in bytes (0 = auto-detect)
        #[arg(long, default_value = "0")]
        entry_size: u32,
    },

    /// Resolve the full path of an entry
    Path {
        /// Path to the MFT image
        mft: PathBuf,

        /// Record number
        record: u64,

        /// Entry size in bytes (0 = auto-detect)
        #[arg(long, default_value = "0")]
        entry_size: u32,
    },

    /// Walk every base entry of the table
    List {
        /// Path to the MFT image
        mft: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: String,

        /// Resolve full paths (slower on large tables)
        #[arg(long)]
        paths: bool,

        /// Entry size in bytes (0 = auto-detect)
        #[arg(long, default_value = "0")]
        entry_size: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Info { mft, entry_size } => cmd_info(&mft, entry_size),
        Commands::Entry {
            mft,
            record,
            entry_size,
        } => cmd_entry(&mft, record, entry_size),
        Commands::Path {
            mft,
            record,
            entry_size,
        } => cmd_path(&mft, record, entry_size),
        Commands::List {
            mft,
            output,
            paths,
            entry_size,
        } => cmd_list(&mft, &output, paths, entry_size),
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn open_mft(path: &PathBuf, entry_size: u32) -> mftscan::Result<Mft<Cursor<memmap2::Mmap>>> {
    let config = MftConfig {
        entry_size,
        ..MftConfig::default()
    };
    Mft::open(path, config)
}

/// Info command implementation
fn cmd_info(path: &PathBuf, entry_size: u32) -> mftscan::Result<()> {
    let start = Instant::now();
    let mft = open_mft(path, entry_size)?;

    println!(
        "{} {}",
        style("MFT image:").bold(),
        style(path.display()).yellow()
    );
    println!("  entry size:     {}", mft.entry_size());
    println!("  slots:          {}", mft.slot_count());
    if let Some(valid) = mft.valid_entry_count() {
        println!("  valid entries:  {}", valid);
    }
    println!("  empty slots:    {}", mft.empty_slot_count());
    println!(
        "{} Loaded in {}",
        style("✓").green().bold(),
        style(HumanDuration(start.elapsed())).cyan()
    );

    Ok(())
}

fn attribute_type_name(type_id: u32) -> &'static str {
    match type_id {
        0x10 => "$STANDARD_INFORMATION",
        0x20 => "$ATTRIBUTE_LIST",
        0x30 => "$FILE_NAME",
        0x40 => "$OBJECT_ID",
        0x50 => "$SECURITY_DESCRIPTOR",
        0x60 => "$VOLUME_NAME",
        0x70 => "$VOLUME_INFORMATION",
        0x80 => "$DATA",
        0x90 => "$INDEX_ROOT",
        0xA0 => "$INDEX_ALLOCATION",
        0xB0 => "$BITMAP",
        0xC0 => "$REPARSE_POINT",
        0xD0 => "$EA_INFORMATION",
        0xE0 => "$EA",
        0x100 => "$LOGGED_UTILITY_STREAM",
        _ => "(unknown)",
    }
}

/// Entry command implementation
fn cmd_entry(path: &PathBuf, record: u64, entry_size: u32) -> mftscan::Result<()> {
    let mut mft = open_mft(path, entry_size)?;
    let mut entry = mft.get(record)?;

    let header = &entry.header;
    println!("{} {}", style("Record").bold(), style(record).yellow());
    println!("  sequence:        {}", header.sequence_number);
    println!("  hard links:      {}", header.hard_link_count);
    println!("  in use:          {}", header.is_in_use());
    println!("  directory:       {}", header.is_directory());
    println!("  used/allocated:  {}/{}", header.used_size, header.allocated_size);
    println!("  log sequence:    {}", header.log_sequence_number);
    if !mft.extensions_of(record).is_empty() {
        println!("  extensions:      {:?}", mft.extensions_of(record));
    }

    println!("{}", style("Attributes:").bold());
    for (type_id, attributes) in entry.attribute_map() {
        for attribute in attributes {
            let form = if attribute.is_non_resident() {
                "non-resident"
            } else {
                "resident"
            };
            let name = attribute
                .header
                .name
                .as_deref()
                .map(|n| format!(" \"{}\"", n))
                .unwrap_or_default();
            println!(
                "  {:<24} id {:<3} {}{}",
                attribute_type_name(*type_id),
                attribute.header.id,
                form,
                name
            );
            if let Some(AttributeContent::FileName(file_name)) = &attribute.content {
                println!(
                    "      name: {:?} parent: {} type: {:?}",
                    file_name.name, file_name.parent, file_name.name_type
                );
            }
            if let Some(AttributeContent::StandardInformation(info)) = &attribute.content {
                println!(
                    "      created: {} modified: {}",
                    info.created.format("%Y-%m-%d %H:%M:%S"),
                    info.modified.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }

    println!("{}", style("Datastreams:").bold());
    if entry.data_streams().is_empty() {
        println!("  (none)");
    }
    for stream in entry.data_streams_mut() {
        let label = stream
            .name()
            .map(|name| format!("\"{}\"", name))
            .unwrap_or_else(|| "(default)".to_string());
        println!(
            "  {:<12} size {} ({}) alloc {} clusters {} {}",
            label,
            stream.size(),
            format_size(stream.size()),
            stream.alloc_size(),
            stream.cluster_count(),
            if stream.is_resident() {
                "resident".to_string()
            } else {
                format!("{} fragment(s)", stream.dataruns().len())
            }
        );
        for fragment in stream.dataruns() {
            for run in &fragment.runs {
                match run.lcn {
                    Some(lcn) => println!(
                        "      vcn {:>8}: {} cluster(s) at LCN {}",
                        fragment.start_vcn, run.cluster_count, lcn
                    ),
                    None => println!(
                        "      vcn {:>8}: {} sparse cluster(s)",
                        fragment.start_vcn, run.cluster_count
                    ),
                }
            }
        }
    }

    Ok(())
}

/// Path command implementation
fn cmd_path(path: &PathBuf, record: u64, entry_size: u32) -> mftscan::Result<()> {
    let mut mft = open_mft(path, entry_size)?;
    let (orphan, full_path) = mft.get_full_path(record)?;

    if orphan {
        println!(
            "{} {}",
            style("[orphan]").red().bold(),
            style(&full_path).yellow()
        );
    } else {
        println!("{}", style(&full_path).green());
    }

    Ok(())
}

/// One row of `list` output
#[derive(Serialize)]
struct EntryRecord {
    record: u64,
    name: Option<String>,
    path: Option<String>,
    orphan: Option<bool>,
    directory: bool,
    deleted: bool,
    size: u64,
    allocated: u64,
    hard_links: u16,
    ads: Vec<String>,
}

impl EntryRecord {
    fn from_entry(record: u64, entry: &MftEntry) -> Self {
        let default_stream = entry.get_datastream(None);
        Self {
            record,
            name: entry.main_file_name().ok().map(|name| name.name.clone()),
            path: None,
            orphan: None,
            directory: entry.is_directory(),
            deleted: entry.is_deleted(),
            size: default_stream.map(|stream| stream.size()).unwrap_or(0),
            allocated: default_stream.map(|stream| stream.alloc_size()).unwrap_or(0),
            hard_links: entry.header.hard_link_count,
            ads: entry
                .datastream_names()
                .into_iter()
                .flatten()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// List command implementation
fn cmd_list(path: &PathBuf, output: &str, paths: bool, entry_size: u32) -> mftscan::Result<()> {
    let start = Instant::now();
    let mut mft = open_mft(path, entry_size)?;
    let total = mft.slot_count();

    let progress = if output == "text" {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} slots")
                .expect("valid template"),
        );
        Some(bar)
    } else {
        None
    };

    // Collect first: path resolution needs the iterator's borrow back
    let mut rows: Vec<EntryRecord> = Vec::new();
    let mut records: Vec<(u64, MftEntry)> = Vec::new();
    for item in mft.iter_entries() {
        let (record, entry) = item?;
        if let Some(bar) = &progress {
            bar.set_position(record);
        }
        records.push((record, entry));
    }
    if let Some(bar) = &progress {
        bar.finish_and_clear();
    }

    for (record, entry) in &records {
        let mut row = EntryRecord::from_entry(*record, entry);
        if paths {
            if let Ok((orphan, full_path)) = mft.get_full_path(*record) {
                row.orphan = Some(orphan);
                row.path = Some(full_path);
            }
        }
        rows.push(row);
    }

    if output == "json" {
        println!("{}", serde_json::to_string_pretty(&rows).expect("serializable rows"));
    } else {
        for row in &rows {
            let marker = if row.deleted {
                style("D").red().to_string()
            } else if row.directory {
                style("d").cyan().to_string()
            } else {
                " ".to_string()
            };
            let shown = row
                .path
                .clone()
                .or_else(|| row.name.clone())
                .unwrap_or_else(|| "(no name)".to_string());
            let orphan_mark = match row.orphan {
                Some(true) => style(" [orphan]").red().to_string(),
                _ => String::new(),
            };
            println!(
                "{:>8} {} {:>12} {}{}",
                row.record,
                marker,
                format_size(row.size),
                shown,
                orphan_mark
            );
        }
        eprintln!(
            "{} {} entries in {}",
            style("✓").green().bold(),
            rows.len(),
            style(HumanDuration(start.elapsed())).cyan()
        );
    }

    Ok(())
}
