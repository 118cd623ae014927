use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use clap::{Parser, Subcommand, ValueEnum};
use infra_stacks::config::{DEFAULT_CODE_BUCKET, DEFAULT_CODE_KEY, DEFAULT_OUT_DIR};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const LAMBDA_PACKAGE: &str = "payment_lambda";
const LAMBDA_BINARY: &str = "payment_handler";
const DIST_DIR: &str = "dist";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the infrastructure workspace",
    long_about = "A unified CLI for synthesizing the stacks, packaging and publishing\n\
                  the payment Lambda artifact, and running CI checks."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize both stacks into a cloud assembly
    Synth {
        /// Cloud assembly output directory
        #[arg(long, env = "CDK_OUTDIR", default_value = DEFAULT_OUT_DIR)]
        out_dir: String,
    },
    /// Build the payment handler and zip it as a Lambda `bootstrap`
    LambdaPackage {
        /// Compilation target triple for the Lambda binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
    /// Upload the packaged artifact to the bucket the payment stack reads from
    LambdaPublish {
        #[arg(long, env = "PAYMENT_CODE_BUCKET", default_value = DEFAULT_CODE_BUCKET)]
        bucket: String,
        #[arg(long, env = "PAYMENT_CODE_KEY", default_value = DEFAULT_CODE_KEY)]
        key: String,
        /// Artifact to upload
        #[arg(long, default_value_os_t = default_artifact_path())]
        path: PathBuf,
    },
    /// Run CI checks (fmt, clippy, tests, synth)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Synthesize the stacks into a scratch directory
    Synth,
    /// Run check + synth
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

fn default_artifact_path() -> PathBuf {
    Path::new(DIST_DIR).join(DEFAULT_CODE_KEY)
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn run_cargo(args: &[&str]) -> Result<()> {
    eprintln!("+ cargo {}", args.join(" "));
    let status = Command::new("cargo")
        .args(args)
        .status()
        .context("failed to execute cargo")?;
    if !status.success() {
        bail!("`cargo {}` exited with {status}", args.join(" "));
    }
    Ok(())
}

fn synth(out_dir: &str) -> Result<()> {
    step("Synthesize cloud assembly");
    run_cargo(&[
        "run",
        "-q",
        "-p",
        "infra_stacks",
        "--bin",
        "synth",
        "--",
        "--out-dir",
        out_dir,
    ])?;
    eprintln!("\nCloud assembly written to {out_dir}");
    Ok(())
}

fn package_lambda(target: &str, profile: BuildProfile) -> Result<PathBuf> {
    ensure_rust_target_installed(target)?;

    step("Build payment handler");
    let mut cargo_args = vec![
        "build",
        "-p",
        LAMBDA_PACKAGE,
        "--target",
        target,
        "--bin",
        LAMBDA_BINARY,
    ];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args)?;

    step("Package Lambda zip artifact");
    let binary = Path::new("target")
        .join(target)
        .join(profile.dir_name())
        .join(LAMBDA_BINARY);
    fs::create_dir_all(DIST_DIR)
        .with_context(|| format!("failed to create {DIST_DIR} directory"))?;
    let artifact = default_artifact_path();
    package_lambda_zip(&binary, &artifact)?;

    eprintln!("\nPackaged artifact:\n- {}", artifact.display());
    Ok(artifact)
}

fn ensure_rust_target_installed(target: &str) -> Result<()> {
    let output = match Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
    {
        Ok(value) => value,
        Err(error) => {
            eprintln!(
                "warning: failed to run `rustup target list --installed` ({error}); continuing without target preflight"
            );
            return Ok(());
        }
    };

    if !output.status.success() {
        bail!(
            "failed to list installed rust targets: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let installed = String::from_utf8_lossy(&output.stdout);
    if !installed.lines().any(|line| line.trim() == target) {
        bail!(
            "required rust target `{target}` is not installed. install it with `rustup target add {target}` and re-run `cargo run -p xtask -- lambda-package`"
        );
    }
    Ok(())
}

/// Lambda's custom runtimes execute a file named `bootstrap` at the archive
/// root.
fn package_lambda_zip(binary_path: &Path, zip_path: &Path) -> Result<()> {
    let binary = fs::read(binary_path)
        .with_context(|| format!("expected lambda binary at '{}'", binary_path.display()))?;
    let file = fs::File::create(zip_path)
        .with_context(|| format!("failed to create '{}'", zip_path.display()))?;

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .context("failed to start bootstrap entry in lambda zip")?;
    zip.write_all(&binary)
        .context("failed to write bootstrap entry")?;
    zip.finish().context("failed to finish lambda zip")?;
    Ok(())
}

fn publish_lambda(bucket: &str, key: &str, path: &Path) -> Result<()> {
    step("Publish Lambda artifact");
    let body = fs::read(path).with_context(|| {
        format!(
            "failed to read '{}'; run `cargo run -p xtask -- lambda-package` first",
            path.display()
        )
    })?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        aws_sdk_s3::Client::new(&config)
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("application/zip")
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("failed to upload artifact to s3://{bucket}/{key}"))
    })?;

    eprintln!("\nUploaded {} to s3://{bucket}/{key}", path.display());
    Ok(())
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() -> Result<()> {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"])?;

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ])?;

    step("Test infra_core");
    run_cargo(&["test", "-p", "infra_core"])?;

    step("Test infra_stacks");
    run_cargo(&["test", "-p", "infra_stacks"])?;

    step("Test payment_lambda");
    run_cargo(&["test", "-p", "payment_lambda"])?;

    step("Test xtask");
    run_cargo(&["test", "-p", "xtask"])
}

fn ci_synth() -> Result<()> {
    let out_dir = Path::new("target").join("ci-cdk.out");
    synth(&out_dir.to_string_lossy())
}

// ── main ───────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Synth { out_dir } => synth(&out_dir)?,
        Commands::LambdaPackage { target, profile } => {
            package_lambda(&target, profile)?;
        }
        Commands::LambdaPublish { bucket, key, path } => publish_lambda(&bucket, &key, &path)?,
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check()?,
                CiJob::Synth => ci_synth()?,
                CiJob::All => {
                    ci_check()?;
                    ci_synth()?;
                }
            }
            eprintln!("\nCI job passed.");
        }
    }
    Ok(())
}
