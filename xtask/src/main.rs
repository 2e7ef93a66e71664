use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::Path;
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for mapwright")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fmt, clippy, tests and the CLI smoke run
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Drive mapwright-cli through new / set-defs / inspect / patch-grid
    Smoke,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests()?;
            run_smoke()?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => run_tests()?,
        Commands::Smoke => run_smoke()?,
    }

    Ok(())
}

fn cargo(step: &str, args: &[&str]) -> Result<()> {
    println!("==> {step}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{step} failed");
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo("cargo fmt --check", &["fmt", "--all", "--", "--check"])
}

fn run_clippy() -> Result<()> {
    cargo(
        "cargo clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
}

fn run_tests() -> Result<()> {
    cargo("cargo test", &["test", "--workspace"])
}

fn cli(args: &[&str]) -> Result<()> {
    let mut full = vec!["run", "--quiet", "-p", "mapwright-cli", "--"];
    full.extend_from_slice(args);
    cargo(&format!("mapwright-cli {}", args.join(" ")), &full)
}

fn run_smoke() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let map = dir.path().join("smoke.json");
    let map = path_str(&map)?;

    cli(&["new", map])?;
    cli(&["set-defs", map, "builtin:Quake.fgd"])?;
    cli(&["set-defs", map, "external:/tmp/custom.fgd", "--undo"])?;
    cli(&["inspect", map])?;
    cli(&["patch-grid", "--rows", "5", "--cols", "3", "--subdivisions", "2"])?;
    Ok(())
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow::anyhow!("non UTF-8 path: {}", path.display()))
}
