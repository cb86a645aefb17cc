use anyhow::{bail, Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use structer::formats::elf::{Core, Elf};
use structer::io::MappedFile;
use structer::logging::init_tracing;
use structer::StructerConfig;
use tracing::{debug, warn};

/// Check the build ids of the objects loaded in a core dump
#[derive(Parser)]
#[command(
    name = "build_ids",
    about = "List or verify the build ids of objects loaded in an ELF core dump",
    version
)]
struct Cli {
    /// Print every loaded object instead of verifying it
    #[arg(long)]
    list: bool,

    /// Directory prepended to object paths when looking for the files on disk
    #[arg(long, default_value = "")]
    prefix: String,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the core dump
    #[arg(required = true)]
    core: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => StructerConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => StructerConfig::default(),
    };

    let file = MappedFile::open(&cli.core, &config.io)
        .with_context(|| format!("mapping {}", cli.core.display()))?;
    let core = Core::with_limits(file.bytes(), config.limits.clone())
        .with_context(|| format!("parsing {}", cli.core.display()))?;
    if let Err(e) = core.check_complete() {
        warn!(error = %e, "Continuing with an incomplete core dump");
    }

    let objects = core.loaded_objects()?;
    debug!(count = objects.len(), "Found loaded objects");

    if cli.list {
        let mut names = HashMap::new();
        match core.link_map() {
            Ok(entries) => {
                for entry in entries {
                    let entry = entry?;
                    names.insert(entry.address, entry.name);
                }
            }
            Err(e) => warn!(error = %e, "No link map"),
        }
        for object in &objects {
            let linked = names.get(&object.address).map(|n| n.as_ref()).unwrap_or("");
            println!(
                "{:016x} {} {} ({})",
                object.address,
                object.build_id_hex().unwrap_or_else(|| "-".to_string()),
                object.name,
                linked
            );
        }
        return Ok(());
    }

    let mut failures = 0;
    for object in &objects {
        let Some(expected) = object.build_id_hex() else {
            continue;
        };
        let path = PathBuf::from(format!("{}{}", cli.prefix, object.name));
        let disk = match MappedFile::open(&path, &config.io) {
            Ok(disk) => disk,
            Err(e) => {
                println!("{}: missing ({})", path.display(), e);
                failures += 1;
                continue;
            }
        };
        let found = Elf::with_limits(disk.bytes(), config.limits.clone())
            .and_then(|elf| elf.build_id())
            .with_context(|| format!("reading {}", path.display()))?
            .map(hex::encode);
        match found {
            Some(found) if found == expected => {
                debug!(path = %path.display(), build_id = %found, "Build id matches")
            }
            found => {
                println!(
                    "{}: build id {} does not match {}",
                    path.display(),
                    found.as_deref().unwrap_or("-"),
                    expected
                );
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} objects did not match", failures, objects.len());
    }
    Ok(())
}
