use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::SynthError;
use crate::expr::Expr;
use crate::resources::OneOrMany;

pub const POLICY_LANGUAGE_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub statement: Vec<PolicyStatement>,
    pub version: &'static str,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            statement,
            version: POLICY_LANGUAGE_VERSION,
        }
    }
}

/// Condition block: operator (`StringEquals`, ...) to key to value.
pub type Conditions = BTreeMap<String, BTreeMap<String, Expr>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub action: OneOrMany<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub condition: Conditions,
    pub effect: Effect,
    pub principal: Principal,
    pub resource: OneOrMany<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
}

impl PolicyStatement {
    pub fn allow(principal: Principal, action: &str, resource: Expr) -> Self {
        Self {
            action: OneOrMany::one(action.to_string()),
            condition: Conditions::new(),
            effect: Effect::Allow,
            principal,
            resource: OneOrMany::one(resource),
            sid: None,
        }
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn with_condition(mut self, operator: &str, key: &str, value: Expr) -> Self {
        self.condition
            .entry(operator.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    Service(String),
    Aws(Expr),
}

impl Principal {
    pub fn service(name: impl Into<String>) -> Self {
        Self::Service(name.into())
    }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::Service(name) => map.serialize_entry("Service", name)?,
            Self::Aws(arn) => map.serialize_entry("AWS", arn)?,
        }
        map.end()
    }
}

/// An IAM role that exists outside this declaration and is only referenced
/// by ARN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedRole {
    arn: String,
    account: String,
    name: String,
}

impl ImportedRole {
    pub fn from_role_arn(arn: &str) -> Result<Self, SynthError> {
        let invalid = |reason: &str| SynthError::invalid_value("role arn", arn, reason);

        let parts: Vec<&str> = arn.splitn(6, ':').collect();
        let [prefix, partition, service, region, account, resource] = parts.as_slice() else {
            return Err(invalid("expected arn:<partition>:iam::<account>:role/<name>"));
        };
        if *prefix != "arn" || partition.is_empty() {
            return Err(invalid("must start with arn:<partition>"));
        }
        if *service != "iam" || !region.is_empty() {
            return Err(invalid("must be a global iam arn"));
        }
        if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("account id must be 12 digits"));
        }
        let Some(path_and_name) = resource.strip_prefix("role/") else {
            return Err(invalid("resource must be role/<name>"));
        };
        let name = path_and_name.rsplit('/').next().unwrap_or_default();
        if name.is_empty() {
            return Err(invalid("role name must not be empty"));
        }

        Ok(Self {
            arn: arn.to_string(),
            account: (*account).to_string(),
            name: name.to_string(),
        })
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arn_expr(&self) -> Expr {
        Expr::literal(self.arn.clone())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn statement_serializes_single_values_as_scalars() {
        let statement = PolicyStatement::allow(
            Principal::service("cloudfront.amazonaws.com"),
            "s3:GetObject",
            Expr::literal("arn:aws:s3:::bucket/*"),
        )
        .with_sid("AllowRead")
        .with_condition(
            "StringEquals",
            "AWS:SourceArn",
            Expr::literal("arn:aws:cloudfront::123456789012:distribution/E1"),
        );

        assert_eq!(
            serde_json::to_value(PolicyDocument::new(vec![statement])).expect("serialize"),
            json!({
                "Statement": [{
                    "Action": "s3:GetObject",
                    "Condition": {
                        "StringEquals": {
                            "AWS:SourceArn": "arn:aws:cloudfront::123456789012:distribution/E1"
                        }
                    },
                    "Effect": "Allow",
                    "Principal": {"Service": "cloudfront.amazonaws.com"},
                    "Resource": "arn:aws:s3:::bucket/*",
                    "Sid": "AllowRead"
                }],
                "Version": "2012-10-17"
            })
        );
    }

    #[test]
    fn imports_role_by_arn() {
        let role = ImportedRole::from_role_arn("arn:aws:iam::528316341503:role/LabRole")
            .expect("valid role arn");
        assert_eq!(role.account(), "528316341503");
        assert_eq!(role.name(), "LabRole");

        let role = ImportedRole::from_role_arn("arn:aws:iam::528316341503:role/service/Runner")
            .expect("role with path");
        assert_eq!(role.name(), "Runner");
    }

    #[rstest]
    #[case("arn:aws:iam::5283163415:role/LabRole")]
    #[case("arn:aws:s3:::bucket")]
    #[case("arn:aws:iam::528316341503:user/alice")]
    #[case("arn:aws:iam:us-east-1:528316341503:role/LabRole")]
    #[case("arn:aws:iam::528316341503:role/")]
    #[case("LabRole")]
    fn rejects_non_role_arns(#[case] arn: &str) {
        assert!(ImportedRole::from_role_arn(arn).is_err());
    }
}
