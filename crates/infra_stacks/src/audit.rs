//! Static checks over synthesized templates.
//!
//! Each finding names a declared resource that would weaken one of the access
//! guarantees once deployed. [`crate::app::synth`] refuses to emit an assembly
//! with findings.

use std::fmt;

use infra_core::template::{ResourceEntry, Template};
use infra_core::CloudAssembly;
use serde_json::Value;

use crate::access::as_list;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    PublicAccessNotBlocked { bucket: String },
    UnscopedBucketGrant { policy: String, sid: Option<String> },
    WildcardSourceArn { policy: String, sid: Option<String> },
    GeoRestrictionNotWhitelist { distribution: String },
    ViewerProtocolAllowsHttp { distribution: String },
    ListenerTargetCount { listener: String, targets: usize },
    UnscopedInvokePermission { permission: String },
    NatGatewayDeclared { logical_id: String },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublicAccessNotBlocked { bucket } => {
                write!(f, "bucket {bucket} does not block all public access")
            }
            Self::UnscopedBucketGrant { policy, sid } => write!(
                f,
                "bucket policy {policy} statement {} grants access without a source ARN condition",
                sid.as_deref().unwrap_or("<unnamed>")
            ),
            Self::WildcardSourceArn { policy, sid } => write!(
                f,
                "bucket policy {policy} statement {} matches source ARNs by wildcard",
                sid.as_deref().unwrap_or("<unnamed>")
            ),
            Self::GeoRestrictionNotWhitelist { distribution } => write!(
                f,
                "distribution {distribution} is not restricted to a non-empty country whitelist"
            ),
            Self::ViewerProtocolAllowsHttp { distribution } => {
                write!(f, "distribution {distribution} serves viewers over plain HTTP")
            }
            Self::ListenerTargetCount { listener, targets } => write!(
                f,
                "listener {listener} forwards to {targets} targets instead of exactly one"
            ),
            Self::UnscopedInvokePermission { permission } => {
                write!(f, "invoke permission {permission} has no source ARN")
            }
            Self::NatGatewayDeclared { logical_id } => {
                write!(f, "NAT gateway {logical_id} is declared")
            }
        }
    }
}

/// Findings for every template in `assembly`, tagged with the stack name.
pub fn audit_assembly(assembly: &CloudAssembly) -> Vec<(String, Finding)> {
    assembly
        .templates()
        .iter()
        .flat_map(|(stack, template)| {
            audit(template)
                .into_iter()
                .map(move |finding| (stack.clone(), finding))
        })
        .collect()
}

pub fn audit(template: &Template) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (logical_id, entry) in &template.resources {
        match entry.type_name.as_str() {
            "AWS::S3::Bucket" => check_bucket(logical_id, entry, &mut findings),
            "AWS::S3::BucketPolicy" => check_bucket_policy(logical_id, entry, &mut findings),
            "AWS::CloudFront::Distribution" => {
                check_distribution(logical_id, entry, &mut findings)
            }
            "AWS::ElasticLoadBalancingV2::Listener" => {
                check_listener(template, logical_id, entry, &mut findings)
            }
            "AWS::Lambda::Permission" => {
                if entry.properties.get("SourceArn").is_none() {
                    findings.push(Finding::UnscopedInvokePermission {
                        permission: logical_id.clone(),
                    });
                }
            }
            "AWS::EC2::NatGateway" => findings.push(Finding::NatGatewayDeclared {
                logical_id: logical_id.clone(),
            }),
            _ => {}
        }
    }
    findings
}

fn check_bucket(logical_id: &str, entry: &ResourceEntry, findings: &mut Vec<Finding>) {
    let block = &entry.properties["PublicAccessBlockConfiguration"];
    let all_blocked = [
        "BlockPublicAcls",
        "BlockPublicPolicy",
        "IgnorePublicAcls",
        "RestrictPublicBuckets",
    ]
    .iter()
    .all(|flag| block[*flag] == Value::Bool(true));
    if !all_blocked {
        findings.push(Finding::PublicAccessNotBlocked {
            bucket: logical_id.to_string(),
        });
    }
}

fn check_bucket_policy(logical_id: &str, entry: &ResourceEntry, findings: &mut Vec<Finding>) {
    for statement in as_list(&entry.properties["PolicyDocument"]["Statement"]) {
        if statement["Effect"].as_str() != Some("Allow") {
            continue;
        }
        let sid = statement["Sid"].as_str().map(str::to_string);
        let source_arns: Vec<&Value> = statement["Condition"]
            .as_object()
            .into_iter()
            .flat_map(|operators| operators.values())
            .filter_map(Value::as_object)
            .flat_map(|keys| {
                keys.iter()
                    .filter(|(key, _)| key.eq_ignore_ascii_case("aws:SourceArn"))
                    .map(|(_, value)| value)
            })
            .collect();

        if source_arns.is_empty() {
            findings.push(Finding::UnscopedBucketGrant {
                policy: logical_id.to_string(),
                sid,
            });
        } else if source_arns.iter().any(|value| contains_wildcard(value)) {
            findings.push(Finding::WildcardSourceArn {
                policy: logical_id.to_string(),
                sid,
            });
        }
    }
}

fn check_distribution(logical_id: &str, entry: &ResourceEntry, findings: &mut Vec<Finding>) {
    let config = &entry.properties["DistributionConfig"];
    let geo = &config["Restrictions"]["GeoRestriction"];
    let whitelisted = geo["RestrictionType"].as_str() == Some("whitelist")
        && geo["Locations"]
            .as_array()
            .is_some_and(|locations| !locations.is_empty());
    if !whitelisted {
        findings.push(Finding::GeoRestrictionNotWhitelist {
            distribution: logical_id.to_string(),
        });
    }
    if config["DefaultCacheBehavior"]["ViewerProtocolPolicy"].as_str() == Some("allow-all") {
        findings.push(Finding::ViewerProtocolAllowsHttp {
            distribution: logical_id.to_string(),
        });
    }
}

fn check_listener(
    template: &Template,
    logical_id: &str,
    entry: &ResourceEntry,
    findings: &mut Vec<Finding>,
) {
    let actions = entry.properties["DefaultActions"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();
    let targets: usize = actions
        .iter()
        .filter(|action| action["Type"].as_str() == Some("forward"))
        .filter_map(|action| action["TargetGroupArn"]["Ref"].as_str())
        .filter_map(|group| template.resources.get(group))
        .map(|group| {
            group.properties["Targets"]
                .as_array()
                .map_or(0, Vec::len)
        })
        .sum();
    if targets != 1 || actions.len() != 1 {
        findings.push(Finding::ListenerTargetCount {
            listener: logical_id.to_string(),
            targets,
        });
    }
}

fn contains_wildcard(value: &Value) -> bool {
    match value {
        Value::String(text) => text.contains('*') || text.contains('?'),
        Value::Array(items) => items.iter().any(contains_wildcard),
        Value::Object(map) => map.values().any(contains_wildcard),
        _ => false,
    }
}
