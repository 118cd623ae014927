//! Request evaluation against a synthesized template.
//!
//! CloudFront and S3 enforce these rules at runtime; evaluating them here
//! against the template lets the access guarantees be checked without a
//! deployment. Evaluation fails closed: an unknown condition operator or key
//! never grants access.

use std::collections::BTreeMap;

use infra_core::template::{ResourceEntry, Template};
use serde_json::Value;

const DISTRIBUTION_TYPE: &str = "AWS::CloudFront::Distribution";
const BUCKET_TYPE: &str = "AWS::S3::Bucket";
const BUCKET_POLICY_TYPE: &str = "AWS::S3::BucketPolicy";
const LISTENER_TYPE: &str = "AWS::ElasticLoadBalancingV2::Listener";
const TARGET_GROUP_TYPE: &str = "AWS::ElasticLoadBalancingV2::TargetGroup";

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("template has no {type_name} named '{logical_id}'")]
    MissingResource {
        logical_id: String,
        type_name: &'static str,
    },

    #[error("resource '{logical_id}' has a malformed '{property}' property")]
    MalformedProperty {
        logical_id: String,
        property: &'static str,
    },

    #[error("cannot resolve {expression}: {reason}")]
    Unresolvable { expression: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    GeoRestricted { country: String },
    MethodNotAllowed { method: String },
    PublicAccessBlocked,
    ExplicitDeny { sid: Option<String> },
    NoMatchingStatement,
}

/// A viewer request arriving at a CloudFront edge location.
#[derive(Debug, Clone, Copy)]
pub struct ViewerRequest<'a> {
    /// ISO 3166-1 alpha-2 code of the viewer's location.
    pub country: &'a str,
    pub method: &'a str,
}

pub fn evaluate_viewer_request(
    template: &Template,
    distribution_id: &str,
    request: &ViewerRequest<'_>,
) -> Result<AccessDecision, AccessError> {
    let entry = resource(template, distribution_id, DISTRIBUTION_TYPE)?;
    let config = &entry.properties["DistributionConfig"];
    let geo = &config["Restrictions"]["GeoRestriction"];

    let malformed = |property| AccessError::MalformedProperty {
        logical_id: distribution_id.to_string(),
        property,
    };
    let restriction_type = geo["RestrictionType"]
        .as_str()
        .ok_or_else(|| malformed("RestrictionType"))?;
    let listed = string_list(&geo["Locations"]).any(|code| code == request.country);
    let permitted = match restriction_type {
        "whitelist" => listed,
        "blacklist" => !listed,
        "none" => true,
        _ => return Err(malformed("RestrictionType")),
    };
    if !permitted {
        return Ok(AccessDecision::Denied(DenyReason::GeoRestricted {
            country: request.country.to_string(),
        }));
    }

    let method = request.method.to_ascii_uppercase();
    if !string_list(&config["DefaultCacheBehavior"]["AllowedMethods"]).any(|allowed| allowed == method)
    {
        return Ok(AccessDecision::Denied(DenyReason::MethodNotAllowed { method }));
    }

    Ok(AccessDecision::Allowed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Service(String),
    Account(String),
}

/// A request made directly against the S3 API.
#[derive(Debug, Clone)]
pub struct BucketRequest<'a> {
    pub caller: Caller,
    pub action: &'a str,
    pub key: &'a str,
    /// `aws:SourceArn` of the request, when a service signs on behalf of a
    /// resource.
    pub source_arn: Option<&'a str>,
}

pub fn evaluate_bucket_request(
    template: &Template,
    bucket_id: &str,
    request: &BucketRequest<'_>,
    resolver: &Resolver,
) -> Result<AccessDecision, AccessError> {
    let bucket = resource(template, bucket_id, BUCKET_TYPE)?;
    let block = &bucket.properties["PublicAccessBlockConfiguration"];
    let restricts_public = block["RestrictPublicBuckets"] == Value::Bool(true)
        && block["BlockPublicPolicy"] == Value::Bool(true);
    if request.caller == Caller::Anonymous && restricts_public {
        return Ok(AccessDecision::Denied(DenyReason::PublicAccessBlocked));
    }

    let bucket_arn = resolver.resolve(&bucket_attribute(bucket_id, "Arn"))?;
    let object_arn = format!("{bucket_arn}/{}", request.key);
    let bucket_ref = Value::Object(
        [("Ref".to_string(), Value::String(bucket_id.to_string()))]
            .into_iter()
            .collect(),
    );

    let mut allowed = false;
    for (_, policy) in template.resources_of_type(BUCKET_POLICY_TYPE) {
        if policy.properties["Bucket"] != bucket_ref {
            continue;
        }
        for statement in as_list(&policy.properties["PolicyDocument"]["Statement"]) {
            if !statement_matches(statement, request, &object_arn, resolver)? {
                continue;
            }
            if statement["Effect"].as_str() == Some("Deny") {
                return Ok(AccessDecision::Denied(DenyReason::ExplicitDeny {
                    sid: statement["Sid"].as_str().map(str::to_string),
                }));
            }
            allowed = true;
        }
    }

    if allowed {
        Ok(AccessDecision::Allowed)
    } else {
        Ok(AccessDecision::Denied(DenyReason::NoMatchingStatement))
    }
}

fn statement_matches(
    statement: &Value,
    request: &BucketRequest<'_>,
    object_arn: &str,
    resolver: &Resolver,
) -> Result<bool, AccessError> {
    if !principal_matches(&statement["Principal"], &request.caller, resolver)? {
        return Ok(false);
    }

    let action_matches = string_list(&statement["Action"])
        .any(|action| action == "*" || action == "s3:*" || action == request.action);
    if !action_matches {
        return Ok(false);
    }

    let mut resource_matches = false;
    for resource in as_list(&statement["Resource"]) {
        if wildcard_match(&resolver.resolve(resource)?, object_arn) {
            resource_matches = true;
            break;
        }
    }
    if !resource_matches {
        return Ok(false);
    }

    let Some(conditions) = statement.get("Condition") else {
        return Ok(true);
    };
    let Some(conditions) = conditions.as_object() else {
        return Ok(false);
    };
    for (operator, entries) in conditions {
        let Some(entries) = entries.as_object() else {
            return Ok(false);
        };
        for (key, expected) in entries {
            if !key.eq_ignore_ascii_case("aws:SourceArn") {
                return Ok(false);
            }
            let Some(actual) = request.source_arn else {
                return Ok(false);
            };
            let expected = resolver.resolve(expected)?;
            let satisfied = match operator.as_str() {
                "StringEquals" | "ArnEquals" => expected == actual,
                "StringLike" | "ArnLike" => wildcard_match(&expected, actual),
                _ => false,
            };
            if !satisfied {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn principal_matches(
    principal: &Value,
    caller: &Caller,
    resolver: &Resolver,
) -> Result<bool, AccessError> {
    if principal.as_str() == Some("*") {
        return Ok(true);
    }
    match caller {
        Caller::Anonymous => Ok(false),
        Caller::Service(name) => {
            Ok(string_list(&principal["Service"]).any(|service| service == name))
        }
        Caller::Account(account) => {
            for value in as_list(&principal["AWS"]) {
                let resolved = resolver.resolve(value)?;
                if resolved == "*"
                    || resolved == *account
                    || resolved == format!("arn:aws:iam::{account}:root")
                {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// How a listener routes its traffic.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerRoute {
    pub port: u64,
    pub protocol: String,
    pub target_groups: Vec<String>,
    /// Target ids across every forwarded target group, in declaration order.
    pub targets: Vec<Value>,
}

pub fn listener_route(template: &Template, listener_id: &str) -> Result<ListenerRoute, AccessError> {
    let listener = resource(template, listener_id, LISTENER_TYPE)?;
    let malformed = |property| AccessError::MalformedProperty {
        logical_id: listener_id.to_string(),
        property,
    };

    let port = listener.properties["Port"]
        .as_u64()
        .ok_or_else(|| malformed("Port"))?;
    let protocol = listener.properties["Protocol"]
        .as_str()
        .ok_or_else(|| malformed("Protocol"))?
        .to_string();

    let mut target_groups = Vec::new();
    let mut targets = Vec::new();
    for action in as_list(&listener.properties["DefaultActions"]) {
        if action["Type"].as_str() != Some("forward") {
            continue;
        }
        let group_id = action["TargetGroupArn"]["Ref"]
            .as_str()
            .ok_or_else(|| malformed("DefaultActions"))?;
        let group = resource(template, group_id, TARGET_GROUP_TYPE)?;
        for target in as_list(&group.properties["Targets"]) {
            targets.push(target["Id"].clone());
        }
        target_groups.push(group_id.to_string());
    }

    Ok(ListenerRoute {
        port,
        protocol,
        target_groups,
        targets,
    })
}

/// Resolves template expressions to the physical values of one deployment.
#[derive(Debug, Clone)]
pub struct Resolver {
    account: String,
    region: String,
    partition: String,
    refs: BTreeMap<String, String>,
    attributes: BTreeMap<(String, String), String>,
}

impl Resolver {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
            partition: "aws".to_string(),
            refs: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_ref(mut self, logical_id: &str, physical_id: impl Into<String>) -> Self {
        self.refs.insert(logical_id.to_string(), physical_id.into());
        self
    }

    pub fn with_attribute(
        mut self,
        logical_id: &str,
        attribute: &str,
        value: impl Into<String>,
    ) -> Self {
        self.attributes
            .insert((logical_id.to_string(), attribute.to_string()), value.into());
        self
    }

    pub fn resolve(&self, value: &Value) -> Result<String, AccessError> {
        let unresolvable = |reason: &str| AccessError::Unresolvable {
            expression: value.to_string(),
            reason: reason.to_string(),
        };

        match value {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) => Ok(number.to_string()),
            Value::Object(map) if map.len() == 1 => {
                if let Some(target) = map.get("Ref").and_then(Value::as_str) {
                    return match target {
                        "AWS::AccountId" => Ok(self.account.clone()),
                        "AWS::Region" => Ok(self.region.clone()),
                        "AWS::Partition" => Ok(self.partition.clone()),
                        "AWS::URLSuffix" => Ok("amazonaws.com".to_string()),
                        _ => self
                            .refs
                            .get(target)
                            .cloned()
                            .ok_or_else(|| unresolvable("no physical id bound")),
                    };
                }
                if let Some(args) = map.get("Fn::GetAtt").and_then(Value::as_array) {
                    let (Some(logical_id), Some(attribute)) = (
                        args.first().and_then(Value::as_str),
                        args.get(1).and_then(Value::as_str),
                    ) else {
                        return Err(unresolvable("malformed Fn::GetAtt"));
                    };
                    return self
                        .attributes
                        .get(&(logical_id.to_string(), attribute.to_string()))
                        .cloned()
                        .ok_or_else(|| unresolvable("no attribute value bound"));
                }
                if let Some(args) = map.get("Fn::Join").and_then(Value::as_array) {
                    let (Some(delimiter), Some(parts)) = (
                        args.first().and_then(Value::as_str),
                        args.get(1).and_then(Value::as_array),
                    ) else {
                        return Err(unresolvable("malformed Fn::Join"));
                    };
                    let resolved = parts
                        .iter()
                        .map(|part| self.resolve(part))
                        .collect::<Result<Vec<_>, _>>()?;
                    return Ok(resolved.join(delimiter));
                }
                Err(unresolvable("unsupported intrinsic"))
            }
            _ => Err(unresolvable("not a scalar or intrinsic")),
        }
    }
}

/// Matches `value` against an IAM-style pattern where `*` spans any run of
/// characters and `?` exactly one.
pub fn wildcard_match(pattern: &str, value: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();

    let (mut p, mut v) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;
    while v < value.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == value[v]) {
            p += 1;
            v += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, v));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            v = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

fn resource<'a>(
    template: &'a Template,
    logical_id: &str,
    type_name: &'static str,
) -> Result<&'a ResourceEntry, AccessError> {
    template
        .resources
        .get(logical_id)
        .filter(|entry| entry.type_name == type_name)
        .ok_or_else(|| AccessError::MissingResource {
            logical_id: logical_id.to_string(),
            type_name,
        })
}

fn bucket_attribute(bucket_id: &str, attribute: &str) -> Value {
    Value::Object(
        [(
            "Fn::GetAtt".to_string(),
            Value::Array(vec![
                Value::String(bucket_id.to_string()),
                Value::String(attribute.to_string()),
            ]),
        )]
        .into_iter()
        .collect(),
    )
}

/// Policy fields accept a scalar or a list.
pub(crate) fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn string_list(value: &Value) -> impl Iterator<Item = &str> {
    as_list(value).into_iter().filter_map(Value::as_str)
}
