//! CloudFormation intrinsic expressions.
//!
//! [`Expr`] is the value type used anywhere a property may either be a literal
//! or be resolved by CloudFormation at deploy time (`Ref`, `Fn::GetAtt`,
//! `Fn::Join`, ...). It serializes straight to the template JSON form.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Pseudo parameters resolved by CloudFormation for every stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    AccountId,
    Region,
    Partition,
    StackName,
    UrlSuffix,
}

impl Pseudo {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccountId => "AWS::AccountId",
            Self::Region => "AWS::Region",
            Self::Partition => "AWS::Partition",
            Self::StackName => "AWS::StackName",
            Self::UrlSuffix => "AWS::URLSuffix",
        }
    }

    pub fn is_pseudo(name: &str) -> bool {
        name.starts_with("AWS::")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(String),
    Ref(String),
    GetAtt {
        logical_id: String,
        attribute: String,
    },
    Join {
        delimiter: String,
        parts: Vec<Expr>,
    },
    Select {
        index: usize,
        list: Box<Expr>,
    },
    GetAzs(String),
}

impl Expr {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Self::Ref(logical_id.into())
    }

    pub fn pseudo(parameter: Pseudo) -> Self {
        Self::Ref(parameter.as_str().to_string())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::GetAtt {
            logical_id: logical_id.into(),
            attribute: attribute.into(),
        }
    }

    pub fn join(delimiter: impl Into<String>, parts: Vec<Expr>) -> Self {
        Self::Join {
            delimiter: delimiter.into(),
            parts,
        }
    }

    /// Concatenates `parts` with an empty delimiter.
    ///
    /// Adjacent literals are merged and a single remaining part is returned
    /// as-is, so fully-known values never reach the template as a `Fn::Join`.
    pub fn concat(parts: impl IntoIterator<Item = Expr>) -> Self {
        let mut merged: Vec<Expr> = Vec::new();
        for part in parts {
            if let Expr::Literal(next) = &part {
                if next.is_empty() {
                    continue;
                }
                if let Some(Expr::Literal(previous)) = merged.last_mut() {
                    previous.push_str(next);
                    continue;
                }
            }
            merged.push(part);
        }

        match merged.len() {
            0 => Expr::Literal(String::new()),
            1 => merged.remove(0),
            _ => Expr::join("", merged),
        }
    }

    pub fn select(index: usize, list: Expr) -> Self {
        Self::Select {
            index,
            list: Box::new(list),
        }
    }

    /// `Fn::GetAZs` for the stack's own region.
    pub fn availability_zones() -> Self {
        Self::GetAzs(String::new())
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Literal(value) => serializer.serialize_str(value),
            Self::Ref(logical_id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", logical_id)?;
                map.end()
            }
            Self::GetAtt {
                logical_id,
                attribute,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &(logical_id, attribute))?;
                map.end()
            }
            Self::Join { delimiter, parts } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &(delimiter, parts))?;
                map.end()
            }
            Self::Select { index, list } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Select", &(index, list))?;
                map.end()
            }
            Self::GetAzs(region) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAZs", region)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_intrinsics_in_template_form() {
        let expr = Expr::concat([
            Expr::literal("https://"),
            Expr::get_att("CloudFrontDistribution", "DomainName"),
        ]);

        assert_eq!(
            serde_json::to_value(&expr).expect("expr should serialize"),
            json!({"Fn::Join": ["", ["https://", {"Fn::GetAtt": ["CloudFrontDistribution", "DomainName"]}]]})
        );
    }

    #[test]
    fn concat_collapses_literals() {
        let expr = Expr::concat([
            Expr::literal("static-website-"),
            Expr::literal("eu-west-1"),
            Expr::literal(""),
            Expr::literal("-123456789012"),
        ]);
        assert_eq!(expr, Expr::literal("static-website-eu-west-1-123456789012"));
    }

    #[test]
    fn select_over_availability_zones() {
        let expr = Expr::select(1, Expr::availability_zones());
        assert_eq!(
            serde_json::to_value(&expr).expect("expr should serialize"),
            json!({"Fn::Select": [1, {"Fn::GetAZs": ""}]})
        );
    }

    #[test]
    fn pseudo_parameters_are_refs() {
        assert_eq!(
            serde_json::to_value(Expr::pseudo(Pseudo::AccountId)).expect("expr should serialize"),
            json!({"Ref": "AWS::AccountId"})
        );
        assert!(Pseudo::is_pseudo("AWS::Region"));
        assert!(!Pseudo::is_pseudo("WebsiteBucket"));
    }
}
