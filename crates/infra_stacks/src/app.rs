use infra_core::{App, CloudAssembly, Stack, SynthError};
use tracing::{info, warn};

use crate::audit::{audit_assembly, Finding};
use crate::config::{AppConfig, PAYMENT_STACK, STATIC_WEBSITE_STACK};
use crate::{payment, static_website};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Synth(#[from] SynthError),

    #[error("audit reported {} finding(s)", .findings.len())]
    Audit { findings: Vec<(String, Finding)> },
}

/// Registers both topologies, each in its own stack scope.
pub fn build_app(config: &AppConfig) -> Result<App, SynthError> {
    let mut app = App::new();

    let mut website = Stack::new(STATIC_WEBSITE_STACK, config.env.clone())?
        .with_description("Private S3 website served through a geo-restricted CloudFront distribution");
    static_website::declare(&mut website, &config.static_website)?;
    app.add_stack(website)?;

    let mut payment_stack = Stack::new(PAYMENT_STACK, config.env.clone())?
        .with_description("Payment Lambda behind an internet-facing Application Load Balancer");
    payment::declare(&mut payment_stack, &config.payment)?;
    app.add_stack(payment_stack)?;

    Ok(app)
}

/// Builds, synthesizes and audits the app. No assembly is returned when any
/// audit check fails.
pub fn synth(config: &AppConfig) -> Result<CloudAssembly, AppError> {
    let assembly = build_app(config)?.synth()?;

    let findings = audit_assembly(&assembly);
    if !findings.is_empty() {
        for (stack, finding) in &findings {
            warn!(stack = stack.as_str(), %finding, "audit finding");
        }
        return Err(AppError::Audit { findings });
    }

    info!(
        stacks = assembly.templates().len(),
        fingerprint = %assembly.fingerprint(),
        "synthesized cloud assembly"
    );
    Ok(assembly)
}
