use infra_core::resources::lambda::Runtime;
use infra_core::StackEnv;

pub const DEFAULT_OUT_DIR: &str = "cdk.out";
pub const STATIC_WEBSITE_STACK: &str = "StaticWebsiteStack";
pub const PAYMENT_STACK: &str = "PaymentStack";

/// Countries allowed to fetch website content.
pub const DEFAULT_ALLOWED_COUNTRIES: [&str; 10] =
    ["US", "JP", "DE", "FR", "IT", "ES", "GB", "NL", "SE", "CH"];

pub const DEFAULT_EXECUTION_ROLE_ARN: &str = "arn:aws:iam::528316341503:role/LabRole";
pub const DEFAULT_CODE_BUCKET: &str = "task2-lambda-bucket-s3";
pub const DEFAULT_CODE_KEY: &str = "lambda-code.zip";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub env: StackEnv,
    pub static_website: StaticWebsiteProps,
    pub payment: PaymentProps,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticWebsiteProps {
    /// Bucket name is `<prefix>-<region>-<account>`.
    pub bucket_name_prefix: String,
    pub allowed_countries: Vec<String>,
    pub default_root_object: String,
}

impl Default for StaticWebsiteProps {
    fn default() -> Self {
        Self {
            bucket_name_prefix: "static-website".to_string(),
            allowed_countries: DEFAULT_ALLOWED_COUNTRIES
                .iter()
                .map(|code| code.to_string())
                .collect(),
            default_root_object: "index.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentProps {
    pub vpc_cidr: String,
    pub max_azs: u32,
    pub subnet_prefix: u8,
    /// Pre-existing role the function runs as; never created here.
    pub execution_role_arn: String,
    pub code_bucket: String,
    pub code_key: String,
    pub runtime: Runtime,
    pub handler: String,
    pub timeout_secs: u32,
    pub listener_port: u16,
    pub healthy_http_codes: String,
    pub target_group_name: String,
}

impl Default for PaymentProps {
    fn default() -> Self {
        Self {
            vpc_cidr: "10.0.0.0/16".to_string(),
            max_azs: 2,
            subnet_prefix: 24,
            execution_role_arn: DEFAULT_EXECUTION_ROLE_ARN.to_string(),
            code_bucket: DEFAULT_CODE_BUCKET.to_string(),
            code_key: DEFAULT_CODE_KEY.to_string(),
            runtime: Runtime::ProvidedAl2023,
            handler: "bootstrap".to_string(),
            timeout_secs: 10,
            listener_port: 80,
            healthy_http_codes: "200".to_string(),
            target_group_name: "payment-lambda-targets".to_string(),
        }
    }
}
