//! Typed CloudFormation resource properties, one module per AWS service.
//!
//! Property structs serialize with CloudFormation's PascalCase property names.
//! Fields are declared in alphabetical order so synthesized templates read the
//! same way the CloudFormation reference lists them.

use serde::Serialize;

pub mod cloudfront;
pub mod ec2;
pub mod elbv2;
pub mod iam;
pub mod lambda;
pub mod s3;

/// A resource kind that can be added to a [`crate::Stack`].
pub trait Resource: Serialize {
    /// CloudFormation resource type, e.g. `AWS::S3::Bucket`.
    const TYPE_NAME: &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn name(value: impl Into<String>) -> Self {
        Self {
            key: "Name".to_string(),
            value: value.into(),
        }
    }
}

/// A list that CloudFormation accepts either as a scalar or as an array.
///
/// Single values serialize as the bare scalar, matching how policy documents
/// are usually written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneOrMany<T>(pub Vec<T>);

impl<T> OneOrMany<T> {
    pub fn one(value: T) -> Self {
        Self(vec![value])
    }
}

impl<T: Serialize> Serialize for OneOrMany<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.as_slice() {
            [single] => single.serialize(serializer),
            many => many.serialize(serializer),
        }
    }
}
