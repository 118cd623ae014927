#![allow(dead_code)]

use infra_core::template::Template;
use infra_core::{CloudAssembly, StackEnv};
use infra_stacks::access::Resolver;
use infra_stacks::config::{AppConfig, PAYMENT_STACK, STATIC_WEBSITE_STACK};
use infra_stacks::static_website::{BUCKET_ID, DISTRIBUTION_ID};

pub const ACCOUNT: &str = "123456789012";
pub const REGION: &str = "us-east-1";
/// Id CloudFront would assign the declared distribution.
pub const DISTRIBUTION_PHYSICAL_ID: &str = "E2QWRUHEXAMPLE";

/// Default configuration pinned to the test account and region.
pub fn pinned_config() -> AppConfig {
    AppConfig {
        env: StackEnv::new(ACCOUNT, REGION),
        ..AppConfig::default()
    }
}

pub fn synthesized() -> CloudAssembly {
    infra_stacks::synth(&pinned_config()).expect("default configuration synthesizes")
}

pub fn website_template() -> Template {
    synthesized()
        .template(STATIC_WEBSITE_STACK)
        .cloned()
        .expect("website stack present")
}

pub fn payment_template() -> Template {
    synthesized()
        .template(PAYMENT_STACK)
        .cloned()
        .expect("payment stack present")
}

pub fn bucket_arn() -> String {
    format!("arn:aws:s3:::static-website-{REGION}-{ACCOUNT}")
}

pub fn distribution_arn() -> String {
    format!("arn:aws:cloudfront::{ACCOUNT}:distribution/{DISTRIBUTION_PHYSICAL_ID}")
}

/// Physical values the website stack would resolve to once deployed.
pub fn deployed_website() -> Resolver {
    Resolver::new(ACCOUNT, REGION)
        .with_ref(BUCKET_ID, format!("static-website-{REGION}-{ACCOUNT}"))
        .with_attribute(BUCKET_ID, "Arn", bucket_arn())
        .with_ref(DISTRIBUTION_ID, DISTRIBUTION_PHYSICAL_ID)
}
