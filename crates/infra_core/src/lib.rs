//! Strongly-typed CloudFormation declaration primitives.
//!
//! This crate owns the resource model (intrinsic expressions, typed resource
//! properties), the per-stack declaration scope, and deterministic synthesis of
//! a cloud assembly. It intentionally excludes AWS SDK and Lambda runtime
//! concerns: nothing here talks to AWS.
//!
//! The usual flow is:
//!
//! 1. create a [`Stack`] per topology and [`Stack::add`] resources to it,
//!    keeping the returned [`Handle`]s to wire dependent resources;
//! 2. register the stacks in an [`App`];
//! 3. call [`App::synth`] and write the resulting [`CloudAssembly`].

pub mod assembly;
pub mod cidr;
pub mod error;
pub mod expr;
pub mod resources;
pub mod stack;
pub mod template;

pub use assembly::{App, CloudAssembly};
pub use error::SynthError;
pub use expr::{Expr, Pseudo};
pub use stack::{Handle, Stack, StackEnv};
