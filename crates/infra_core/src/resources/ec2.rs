use serde::Serialize;

use crate::cidr::Ipv4Cidr;
use crate::expr::Expr;
use crate::resources::{Resource, Tag};
use crate::stack::Handle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vpc {
    pub cidr_block: Ipv4Cidr,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
    pub instance_tenancy: InstanceTenancy,
    pub tags: Vec<Tag>,
}

impl Resource for Vpc {
    const TYPE_NAME: &'static str = "AWS::EC2::VPC";
}

impl Handle<Vpc> {
    pub fn vpc_id(&self) -> Expr {
        self.reference()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceTenancy {
    Default,
    Dedicated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Subnet {
    pub availability_zone: Expr,
    pub cidr_block: Ipv4Cidr,
    pub map_public_ip_on_launch: bool,
    pub tags: Vec<Tag>,
    pub vpc_id: Expr,
}

impl Resource for Subnet {
    const TYPE_NAME: &'static str = "AWS::EC2::Subnet";
}

impl Handle<Subnet> {
    pub fn subnet_id(&self) -> Expr {
        self.reference()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteTable {
    pub tags: Vec<Tag>,
    pub vpc_id: Expr,
}

impl Resource for RouteTable {
    const TYPE_NAME: &'static str = "AWS::EC2::RouteTable";
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubnetRouteTableAssociation {
    pub route_table_id: Expr,
    pub subnet_id: Expr,
}

impl Resource for SubnetRouteTableAssociation {
    const TYPE_NAME: &'static str = "AWS::EC2::SubnetRouteTableAssociation";
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Route {
    pub destination_cidr_block: Ipv4Cidr,
    pub gateway_id: Expr,
    pub route_table_id: Expr,
}

impl Resource for Route {
    const TYPE_NAME: &'static str = "AWS::EC2::Route";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InternetGateway {
    pub tags: Vec<Tag>,
}

impl Resource for InternetGateway {
    const TYPE_NAME: &'static str = "AWS::EC2::InternetGateway";
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcGatewayAttachment {
    pub internet_gateway_id: Expr,
    pub vpc_id: Expr,
}

impl Resource for VpcGatewayAttachment {
    const TYPE_NAME: &'static str = "AWS::EC2::VPCGatewayAttachment";
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroup {
    pub group_description: String,
    pub security_group_egress: Vec<SecurityGroupRule>,
    pub security_group_ingress: Vec<SecurityGroupRule>,
    pub vpc_id: Expr,
}

impl Resource for SecurityGroup {
    const TYPE_NAME: &'static str = "AWS::EC2::SecurityGroup";
}

impl Handle<SecurityGroup> {
    pub fn group_id(&self) -> Expr {
        self.get_att("GroupId")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupRule {
    pub cidr_ip: Ipv4Cidr,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_port: Option<u16>,
    pub ip_protocol: IpProtocol,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_port: Option<u16>,
}

impl SecurityGroupRule {
    pub fn tcp(cidr_ip: Ipv4Cidr, port: u16, description: impl Into<String>) -> Self {
        Self {
            cidr_ip,
            description: description.into(),
            from_port: Some(port),
            ip_protocol: IpProtocol::Tcp,
            to_port: Some(port),
        }
    }

    pub fn all_traffic(cidr_ip: Ipv4Cidr, description: impl Into<String>) -> Self {
        Self {
            cidr_ip,
            description: description.into(),
            from_port: None,
            ip_protocol: IpProtocol::All,
            to_port: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IpProtocol {
    #[serde(rename = "tcp")]
    Tcp,
    #[serde(rename = "udp")]
    Udp,
    #[serde(rename = "-1")]
    All,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn security_group_rules_serialize_ports_only_when_set() {
        let anywhere: Ipv4Cidr = "0.0.0.0/0".parse().expect("valid cidr");
        let ingress = SecurityGroupRule::tcp(anywhere, 80, "Allow HTTP traffic from anywhere");
        let egress = SecurityGroupRule::all_traffic(anywhere, "Allow all outbound traffic by default");

        assert_eq!(
            serde_json::to_value(&ingress).expect("serialize"),
            json!({
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow HTTP traffic from anywhere",
                "FromPort": 80,
                "IpProtocol": "tcp",
                "ToPort": 80
            })
        );
        assert_eq!(
            serde_json::to_value(&egress).expect("serialize"),
            json!({
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": "-1"
            })
        );
    }
}
