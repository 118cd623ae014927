use serde::Serialize;

use crate::expr::Expr;
use crate::resources::Resource;
use crate::stack::Handle;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoadBalancer {
    pub load_balancer_attributes: Vec<LoadBalancerAttribute>,
    pub scheme: Scheme,
    pub security_groups: Vec<Expr>,
    pub subnets: Vec<Expr>,
    #[serde(rename = "Type")]
    pub kind: LoadBalancerType,
}

impl Resource for LoadBalancer {
    const TYPE_NAME: &'static str = "AWS::ElasticLoadBalancingV2::LoadBalancer";
}

impl Handle<LoadBalancer> {
    pub fn arn(&self) -> Expr {
        self.reference()
    }

    pub fn dns_name(&self) -> Expr {
        self.get_att("DNSName")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoadBalancerAttribute {
    pub key: String,
    pub value: String,
}

impl LoadBalancerAttribute {
    pub fn deletion_protection(enabled: bool) -> Self {
        Self {
            key: "deletion_protection.enabled".to_string(),
            value: enabled.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    InternetFacing,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadBalancerType {
    Application,
    Network,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetGroup {
    pub health_check_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matcher: Option<Matcher>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub target_type: TargetType,
    pub targets: Vec<TargetDescription>,
}

impl Resource for TargetGroup {
    const TYPE_NAME: &'static str = "AWS::ElasticLoadBalancingV2::TargetGroup";
}

impl Handle<TargetGroup> {
    pub fn arn(&self) -> Expr {
        self.reference()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Matcher {
    /// Comma-separated codes or a range, e.g. `200` or `200-299`.
    pub http_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Instance,
    Ip,
    Lambda,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetDescription {
    pub id: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Listener {
    pub default_actions: Vec<ListenerAction>,
    pub load_balancer_arn: Expr,
    pub port: u16,
    pub protocol: ListenerProtocol,
}

impl Resource for Listener {
    const TYPE_NAME: &'static str = "AWS::ElasticLoadBalancingV2::Listener";
}

impl Handle<Listener> {
    pub fn arn(&self) -> Expr {
        self.reference()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListenerAction {
    pub target_group_arn: Expr,
    #[serde(rename = "Type")]
    pub kind: ListenerActionType,
}

impl ListenerAction {
    pub fn forward(target_group: &Handle<TargetGroup>) -> Self {
        Self {
            target_group_arn: target_group.arn(),
            kind: ListenerActionType::Forward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerActionType {
    Forward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListenerProtocol {
    Http,
    Https,
}
