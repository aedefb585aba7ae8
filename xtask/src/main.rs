use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for procgfx")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fmt, clippy, tests and the headless smoke run
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
    /// Run the content generation benchmark
    Bench,
    /// Generate twice and run the headless renderer; fails if the digests differ
    Smoke {
        #[arg(long, default_value = "42")]
        seed: u64,
        #[arg(long, default_value = "120")]
        frames: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            cargo("fmt", &["fmt", "--all", "--", "--check"])?;
            clippy()?;
            cargo("test", &["test", "--workspace"])?;
            smoke(42, 60)?;
        }
        Commands::Fmt => cargo("fmt", &["fmt", "--all", "--", "--check"])?,
        Commands::Clippy => clippy()?,
        Commands::Test => cargo("test", &["test", "--workspace"])?,
        Commands::Doc => cargo("doc", &["doc", "--workspace", "--no-deps"])?,
        Commands::Build => cargo("build", &["build", "--workspace"])?,
        Commands::Bench => cargo("bench", &["bench", "-p", "procgfx-content"])?,
        Commands::Smoke { seed, frames } => smoke(seed, frames)?,
    }

    Ok(())
}

fn cargo(task: &str, args: &[&str]) -> Result<()> {
    println!("==> Running cargo {task}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {task} failed");
    }
    Ok(())
}

fn clippy() -> Result<()> {
    cargo(
        "clippy",
        &[
            "clippy",
            "--workspace",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ],
    )
}

/// Run the CLI and return its stdout.
fn procgfx_cli(args: &[&str]) -> Result<String> {
    let output = Command::new("cargo")
        .args(["run", "--quiet", "-p", "procgfx-cli", "--"])
        .args(args)
        .output()?;
    if !output.status.success() {
        anyhow::bail!(
            "procgfx-cli {} failed:\n{}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8(output.stdout)?)
}

fn digest_line(stdout: &str) -> Result<&str> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Digest: "))
        .context("no digest in procgfx-cli output")
}

fn smoke(seed: u64, frames: u64) -> Result<()> {
    println!("==> Smoke: seed={seed}, frames={frames}");
    let seed = seed.to_string();
    let frames = frames.to_string();

    let generate = ["generate", "--seed", &seed, "--steps", "10", "--incremental"];
    let first = procgfx_cli(&generate)?;
    let second = procgfx_cli(&generate)?;
    let (a, b) = (digest_line(&first)?, digest_line(&second)?);
    if a != b {
        anyhow::bail!("content is not deterministic: {a} != {b}");
    }
    println!("    generate digest {a}");

    let run = procgfx_cli(&["run", "--seed", &seed, "--frames", &frames, "--fail-acquire", "2"])?;
    print!("{run}");
    Ok(())
}
