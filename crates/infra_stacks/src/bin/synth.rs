//! Synthesizes the static website and payment stacks into a cloud assembly.
//!
//! Settings follow the variables the CDK toolkit exports to the app process:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CDK_OUTDIR` | `cdk.out` | Cloud assembly output directory |
//! | `CDK_DEFAULT_ACCOUNT` | *(unset)* | Pins the stacks to an account |
//! | `CDK_DEFAULT_REGION` | *(unset)* | Pins the stacks to a region |
//! | `PAYMENT_EXECUTION_ROLE_ARN` | `LabRole` ARN | Pre-existing role for the payment function |
//! | `PAYMENT_CODE_BUCKET` | `task2-lambda-bucket-s3` | Bucket holding the function artifact |
//! | `PAYMENT_CODE_KEY` | `lambda-code.zip` | Key of the function artifact |
//! | `LOG_LEVEL` | `info` | Default tracing filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//!
//! Stacks are environment-agnostic unless both account and region are set.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use infra_core::StackEnv;
use infra_stacks::config::{
    AppConfig, DEFAULT_CODE_BUCKET, DEFAULT_CODE_KEY, DEFAULT_EXECUTION_ROLE_ARN, DEFAULT_OUT_DIR,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Synthesize the infrastructure stacks into a cloud assembly")]
struct Cli {
    #[arg(long, env = "CDK_OUTDIR", default_value = DEFAULT_OUT_DIR)]
    out_dir: PathBuf,

    #[arg(long, env = "CDK_DEFAULT_ACCOUNT")]
    account: Option<String>,

    #[arg(long, env = "CDK_DEFAULT_REGION")]
    region: Option<String>,

    #[arg(long, env = "PAYMENT_EXECUTION_ROLE_ARN", default_value = DEFAULT_EXECUTION_ROLE_ARN)]
    execution_role_arn: String,

    #[arg(long, env = "PAYMENT_CODE_BUCKET", default_value = DEFAULT_CODE_BUCKET)]
    code_bucket: String,

    #[arg(long, env = "PAYMENT_CODE_KEY", default_value = DEFAULT_CODE_KEY)]
    code_key: String,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn app_config(&self) -> AppConfig {
        let env = match (&self.account, &self.region) {
            (Some(account), Some(region)) => StackEnv::new(account.clone(), region.clone()),
            (None, None) => StackEnv::agnostic(),
            _ => {
                warn!("only one of account and region is set; synthesizing environment-agnostic stacks");
                StackEnv::agnostic()
            }
        };

        let mut config = AppConfig {
            env,
            ..AppConfig::default()
        };
        config.payment.execution_role_arn = self.execution_role_arn.clone();
        config.payment.code_bucket = self.code_bucket.clone();
        config.payment.code_key = self.code_key.clone();
        config
    }
}

/// Uses `RUST_LOG` if set, otherwise falls back to `--log-level`.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let config = cli.app_config();
    info!(env = %config.env.uri(), out_dir = %cli.out_dir.display(), "synthesizing");

    let assembly = infra_stacks::synth(&config).context("failed to synthesize stacks")?;
    assembly
        .write_to(&cli.out_dir)
        .with_context(|| format!("failed to write cloud assembly to {}", cli.out_dir.display()))?;

    info!(fingerprint = %assembly.fingerprint(), "done");
    Ok(())
}
