//! Development tasks for kube-fzf-cache
//!
//! Usage: cargo xtask <command>

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use xshell::{cmd, Shell};

const BIN: &str = "kube-fzf-cache";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development tasks for kube-fzf-cache")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run unit and integration tests
    Test {
        /// Also run tests that need a reachable cluster
        #[arg(long)]
        live: bool,
    },
    /// Run the cache against the current kubeconfig context, writing under target/fzf-cache
    Dev {
        /// Resource types to track
        #[arg(long, default_value = "Pod,Deployment,Service,Node,Namespace")]
        resources: String,
        /// Extra arguments passed to the binary
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Print the snapshot files written by `dev`
    Show {
        /// Snapshot file name, e.g. pods
        file: Option<String>,
    },
    /// Build a release tarball
    Dist {
        /// Target triple (e.g., x86_64-unknown-linux-gnu)
        #[arg(long)]
        target: Option<String>,
    },
    /// Run CI checks (format, clippy, test)
    Ci,
    /// Format code
    Format {
        /// Check formatting without modifying files
        #[arg(long)]
        check: bool,
    },
    /// Run clippy
    Clippy,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;
    let root = project_root()?;
    sh.change_dir(&root);

    match cli.command {
        Commands::Test { live } => test(&sh, live),
        Commands::Dev { resources, args } => dev(&sh, &root, &resources, &args),
        Commands::Show { file } => show(&sh, &root, file.as_deref()),
        Commands::Dist { target } => dist(&sh, &root, target.as_deref()),
        Commands::Ci => ci(&sh),
        Commands::Format { check } => format(&sh, check),
        Commands::Clippy => clippy(&sh),
    }
}

fn test(sh: &Shell, live: bool) -> Result<()> {
    println!("Running tests...");
    cmd!(sh, "cargo test --workspace").run()?;
    if live {
        println!("Running cluster tests...");
        cmd!(sh, "cargo test --test resource_test -- --ignored").run()?;
    }
    Ok(())
}

fn dev_cache_dir(root: &Path) -> PathBuf {
    root.join("target").join("fzf-cache")
}

fn dev(sh: &Shell, root: &Path, resources: &str, args: &[String]) -> Result<()> {
    let dir = dev_cache_dir(root);
    sh.create_dir(&dir)?;
    println!("Writing snapshots to {}", dir.display());
    cmd!(
        sh,
        "cargo run --bin {BIN} -- --dir {dir} --resources {resources} -v {args...}"
    )
    .run()?;
    Ok(())
}

fn show(sh: &Shell, root: &Path, file: Option<&str>) -> Result<()> {
    let dir = dev_cache_dir(root);
    if !dir.exists() {
        bail!("{} does not exist, run `cargo xtask dev` first", dir.display());
    }

    let mut files: Vec<PathBuf> = match file {
        Some(name) => vec![dir.join(name)],
        None => sh.read_dir(&dir)?,
    };
    files.sort();
    for path in files {
        // Skip rewrite leftovers.
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(true, |n| n.starts_with('.'));
        if hidden {
            continue;
        }
        let content = sh
            .read_file(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let records = content.lines().count().saturating_sub(1);
        println!("==> {} ({} records)", path.display(), records);
        print!("{}", content);
    }
    Ok(())
}

fn dist(sh: &Shell, root: &Path, target: Option<&str>) -> Result<()> {
    let release_dir = match target {
        Some(triple) => {
            cmd!(sh, "cargo build --release --bin {BIN} --target {triple}").run()?;
            root.join("target").join(triple).join("release")
        }
        None => {
            cmd!(sh, "cargo build --release --bin {BIN}").run()?;
            root.join("target").join("release")
        }
    };

    let dist_dir = root.join("dist");
    sh.create_dir(&dist_dir)?;
    sh.copy_file(release_dir.join(BIN), dist_dir.join(BIN))?;

    let version = env!("CARGO_PKG_VERSION");
    let archive = format!("{}-{}.tar.gz", BIN, version);
    cmd!(sh, "tar -czf {archive} -C dist {BIN}")
        .run()
        .context("Failed to create tarball")?;

    println!("Created {}", archive);
    Ok(())
}

fn ci(sh: &Shell) -> Result<()> {
    format(sh, true)?;
    clippy(sh)?;
    test(sh, false)?;
    println!("All CI checks passed");
    Ok(())
}

fn format(sh: &Shell, check: bool) -> Result<()> {
    if check {
        cmd!(sh, "cargo fmt --all -- --check").run()?;
    } else {
        cmd!(sh, "cargo fmt --all").run()?;
    }
    Ok(())
}

fn clippy(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo clippy --workspace --all-targets -- -D warnings").run()?;
    Ok(())
}

fn project_root() -> Result<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask must live inside the workspace")
}
