//! Lambda target behind the payment load balancer.
//!
//! The handler logic in [`handlers::payment`] is synchronous and has no AWS
//! dependencies; the `payment_handler` binary adapts it to `lambda_runtime`.

pub mod handlers;
pub mod logging;
