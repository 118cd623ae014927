//! The synthesized CloudFormation template document.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::error::SynthError;
use crate::expr::{Expr, Pseudo};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemovalPolicy {
    Retain,
    Delete,
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceEntry {
    #[serde(rename = "Type")]
    pub type_name: String,
    pub properties: Value,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<RemovalPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<RemovalPolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: &'static str,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, ResourceEntry>,
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    /// Pretty-printed template JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String, SynthError> {
        let mut body = serde_json::to_string_pretty(self).map_err(|source| SynthError::Serialize {
            what: "template".to_string(),
            source,
        })?;
        body.push('\n');
        Ok(body)
    }

    pub fn resources_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a ResourceEntry)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, entry)| entry.type_name == type_name)
    }
}

/// Collects every logical id targeted by a `Ref` or `Fn::GetAtt` in `value`.
///
/// Pseudo parameters (`AWS::*`) are skipped.
pub fn referenced_logical_ids(value: &Value) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    collect_references(value, &mut found);
    found
}

fn collect_references(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    if !Pseudo::is_pseudo(target) {
                        found.insert(target.clone());
                    }
                    return;
                }
                if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                    if let Some(Value::String(target)) = args.first() {
                        found.insert(target.clone());
                    }
                    return;
                }
            }
            for nested in map.values() {
                collect_references(nested, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, found);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn finds_nested_references_and_skips_pseudo_parameters() {
        let value = json!({
            "Bucket": {"Ref": "WebsiteBucket"},
            "Condition": {
                "StringEquals": {
                    "AWS:SourceArn": {"Fn::Join": ["", [
                        "arn:aws:cloudfront::",
                        {"Ref": "AWS::AccountId"},
                        ":distribution/",
                        {"Ref": "CloudFrontDistribution"}
                    ]]}
                }
            },
            "Resource": [{"Fn::GetAtt": ["WebsiteBucket", "Arn"]}]
        });

        let ids = referenced_logical_ids(&value);
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec!["CloudFrontDistribution".to_string(), "WebsiteBucket".to_string()]
        );
    }
}
