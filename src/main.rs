use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use memmap2::Mmap;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use otsync::hash::{crc32, hash_file};
use otsync::patch::apply_ops;
use otsync::{diff, EditScript};

#[derive(Parser)]
#[command(name = "otsync", about = "Edit-script diff tool for collaborative file sync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the CRC32 content hash of each file
    Hash {
        /// Files to hash
        files: Vec<PathBuf>,
    },
    /// Diff two versions of a file into an edit script
    Diff {
        /// Path to the old (base) version
        #[arg(long)]
        old: PathBuf,
        /// Path to the new (edited) version
        #[arg(long)]
        new: PathBuf,
        /// Output path for the edit script
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Apply an edit script to a target file
    Apply {
        /// Path to the target file
        #[arg(long)]
        target: PathBuf,
        /// Path to the edit script
        #[arg(long, short)]
        script: PathBuf,
    },
}

/// Memory-map a file for read-only access.
///
/// # Safety
/// The mapping is read-only. Callers must not concurrently truncate or
/// replace the underlying file while the `Mmap` is live.
fn mmap_file(path: &Path) -> Result<Mmap> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    // SAFETY: We only read from this mapping; no concurrent modification of these files.
    unsafe {
        Mmap::map(&file).with_context(|| format!("Failed to memory-map file: {}", path.display()))
    }
}

async fn hash_command(files: Vec<PathBuf>) -> Result<()> {
    let results = tokio::task::spawn_blocking(move || -> Result<Vec<(PathBuf, u32)>> {
        files
            .par_iter()
            .map(|path| -> Result<(PathBuf, u32)> {
                let hash = hash_file(path)
                    .with_context(|| format!("Failed to hash file: {}", path.display()))?;
                Ok((path.clone(), hash))
            })
            .collect()
    })
    .await??;

    for (path, hash) in results {
        println!("{:08x}  {}", hash, path.display());
    }
    Ok(())
}

fn diff_command(old: &Path, new: &Path, output: &Path) -> Result<()> {
    let old_data = mmap_file(old)?;
    let new_data = mmap_file(new)?;

    let base_hash = crc32(&old_data);
    let ops: Vec<_> = diff::diff(&old_data, &new_data)
        .into_iter()
        .map(|op| op.with_base_hash(base_hash))
        .collect();

    let rel_path = new
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let script = EditScript::new(rel_path, base_hash, ops, &new_data);

    let encoded = script.encode()?;
    std::fs::write(output, &encoded)
        .with_context(|| format!("Failed to write edit script: {}", output.display()))?;

    println!("  Operations: {}", script.ops.len());
    println!("  Base hash: {:08x}", base_hash);
    println!("  Script size: {} bytes", encoded.len());
    Ok(())
}

fn apply_command(target: &Path, script_path: &Path) -> Result<()> {
    let raw = std::fs::read(script_path)
        .with_context(|| format!("Failed to read edit script: {}", script_path.display()))?;
    let script = EditScript::decode(&raw)?;

    // Scope the mmap so it is dropped before we write back to the same file.
    // On Windows, writing to a file with an open mapping is an error (os error 1224).
    let new_data = {
        let old_data = mmap_file(target)?;
        if crc32(&old_data) != script.base_hash {
            bail!(
                "Target {} has diverged from the script's base state; re-diff against the current content",
                target.display()
            );
        }
        apply_ops(&old_data, &script.ops)?
    };

    if !script.verifies(&new_data) {
        bail!("Hash mismatch after applying edit script to {}", target.display());
    }

    std::fs::write(target, &new_data)
        .with_context(|| format!("Failed to write patched file: {}", target.display()))?;

    println!("  Operations applied: {}", script.ops.len());
    println!("  New size: {} bytes", new_data.len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Hash { files } => {
            hash_command(files).await?;
        }
        Commands::Diff { old, new, output } => {
            println!("Diffing...");
            println!("  Old: {}", old.display());
            println!("  New: {}", new.display());

            let start = Instant::now();
            diff_command(&old, &new, &output)?;
            println!("  Time elapsed: {:.3}s", start.elapsed().as_secs_f64());
        }
        Commands::Apply { target, script } => {
            println!("Applying edit script...");
            println!("  Target: {}", target.display());

            let start = Instant::now();
            apply_command(&target, &script)?;
            println!("  Time elapsed: {:.3}s", start.elapsed().as_secs_f64());
        }
    }

    Ok(())
}
