use lambda_runtime::{service_fn, Error, LambdaEvent};
use payment_lambda::handlers::payment::{handle_payment_event, AlbTargetResponse, InvocationContext};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<AlbTargetResponse, Error> {
    let context = InvocationContext {
        request_id: event.context.request_id.clone(),
        invoked_function_arn: event.context.invoked_function_arn.clone(),
        deadline_ms: event.context.deadline,
    };
    Ok(handle_payment_event(&event.payload, &context))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    payment_lambda::logging::init();
    lambda_runtime::run(service_fn(handle_request)).await
}
