use serde::Serialize;

use crate::error::SynthError;
use crate::expr::Expr;
use crate::resources::Resource;
use crate::stack::Handle;

pub const INVOKE_FUNCTION_ACTION: &str = "lambda:InvokeFunction";
pub const MAX_TIMEOUT_SECS: u32 = 900;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Function {
    pub code: Code,
    pub handler: String,
    pub role: Expr,
    pub runtime: Runtime,
    pub timeout: FunctionTimeout,
}

impl Resource for Function {
    const TYPE_NAME: &'static str = "AWS::Lambda::Function";
}

impl Handle<Function> {
    pub fn arn(&self) -> Expr {
        self.get_att("Arn")
    }
}

/// Deployment package stored in S3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Code {
    pub s3_bucket: String,
    pub s3_key: String,
}

impl Code {
    pub fn from_bucket(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            s3_bucket: bucket.into(),
            s3_key: key.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Runtime {
    /// Custom runtime: the package ships a `bootstrap` executable.
    #[serde(rename = "provided.al2023")]
    ProvidedAl2023,
    #[serde(rename = "python3.11")]
    Python311,
}

/// Execution budget in whole seconds, between 1 and 900.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FunctionTimeout(u32);

impl FunctionTimeout {
    pub fn from_secs(secs: u32) -> Result<Self, SynthError> {
        if secs == 0 || secs > MAX_TIMEOUT_SECS {
            return Err(SynthError::invalid_value(
                "function timeout",
                format!("{secs}s"),
                format!("must be between 1 and {MAX_TIMEOUT_SECS} seconds"),
            ));
        }
        Ok(Self(secs))
    }

    pub fn as_secs(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Permission {
    pub action: String,
    pub function_name: Expr,
    pub principal: String,
    pub source_arn: Expr,
}

impl Permission {
    /// Lets `principal` invoke `function`, but only on behalf of `source_arn`.
    pub fn invoke(function: &Handle<Function>, principal: &str, source_arn: Expr) -> Self {
        Self {
            action: INVOKE_FUNCTION_ACTION.to_string(),
            function_name: function.arn(),
            principal: principal.to_string(),
            source_arn,
        }
    }
}

impl Resource for Permission {
    const TYPE_NAME: &'static str = "AWS::Lambda::Permission";
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn timeout_is_bounded() {
        assert!(FunctionTimeout::from_secs(0).is_err());
        assert!(FunctionTimeout::from_secs(901).is_err());
        assert_eq!(FunctionTimeout::from_secs(10).expect("valid").as_secs(), 10);
    }

    #[test]
    fn function_properties() {
        let function = Function {
            code: Code::from_bucket("task2-lambda-bucket-s3", "lambda-code.zip"),
            handler: "bootstrap".to_string(),
            role: Expr::literal("arn:aws:iam::528316341503:role/LabRole"),
            runtime: Runtime::ProvidedAl2023,
            timeout: FunctionTimeout::from_secs(10).expect("valid"),
        };

        assert_eq!(
            serde_json::to_value(&function).expect("serialize"),
            json!({
                "Code": {"S3Bucket": "task2-lambda-bucket-s3", "S3Key": "lambda-code.zip"},
                "Handler": "bootstrap",
                "Role": "arn:aws:iam::528316341503:role/LabRole",
                "Runtime": "provided.al2023",
                "Timeout": 10
            })
        );
    }
}
