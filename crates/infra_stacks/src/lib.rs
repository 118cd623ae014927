//! Declarations for the static website and payment endpoint topologies.
//!
//! Each topology builder receives its own [`infra_core::Stack`] scope:
//!
//! - [`static_website`]: private S3 bucket read only through CloudFront.
//! - [`payment`]: public-only VPC, ALB on port 80, Lambda target.
//!
//! [`app::synth`] registers both stacks, synthesizes them and runs the
//! [`audit`] checks. [`access`] evaluates requests against a synthesized
//! template so the access guarantees can be tested without deploying.

pub mod access;
pub mod app;
pub mod audit;
pub mod config;
pub mod network;
pub mod payment;
pub mod static_website;

pub use app::{build_app, synth, AppError};
pub use config::AppConfig;
