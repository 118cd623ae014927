//! Public-only VPC: one public subnet per availability zone, an internet
//! gateway, and no NAT gateways or private subnets.

use infra_core::cidr::Ipv4Cidr;
use infra_core::resources::ec2::{
    InstanceTenancy, InternetGateway, Route, RouteTable, Subnet, SubnetRouteTableAssociation, Vpc,
    VpcGatewayAttachment,
};
use infra_core::resources::Tag;
use infra_core::{Expr, Handle, Stack, SynthError};

pub const MAX_AZS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicVpcProps {
    pub cidr: Ipv4Cidr,
    pub max_azs: u32,
    pub subnet_prefix: u8,
}

#[derive(Debug, Clone)]
pub struct PublicSubnet {
    pub cidr: Ipv4Cidr,
    pub subnet: Handle<Subnet>,
    pub route_table: Handle<RouteTable>,
    pub default_route: Handle<Route>,
}

#[derive(Debug, Clone)]
pub struct PublicVpc {
    pub vpc: Handle<Vpc>,
    pub internet_gateway: Handle<InternetGateway>,
    pub gateway_attachment: Handle<VpcGatewayAttachment>,
    pub subnets: Vec<PublicSubnet>,
}

impl PublicVpc {
    pub fn subnet_ids(&self) -> Vec<Expr> {
        self.subnets
            .iter()
            .map(|public| public.subnet.subnet_id())
            .collect()
    }
}

/// Declares the VPC under logical ids prefixed with `id`.
pub fn declare_public_vpc(
    stack: &mut Stack,
    id: &str,
    props: &PublicVpcProps,
) -> Result<PublicVpc, SynthError> {
    if props.max_azs == 0 || props.max_azs > MAX_AZS {
        return Err(SynthError::invalid_value(
            "availability zone count",
            props.max_azs.to_string(),
            format!("must be between 1 and {MAX_AZS}"),
        ));
    }

    let name = format!("{}/{id}", stack.name());
    let vpc = stack.add(
        id,
        Vpc {
            cidr_block: props.cidr,
            enable_dns_hostnames: true,
            enable_dns_support: true,
            instance_tenancy: InstanceTenancy::Default,
            tags: vec![Tag::name(name.clone())],
        },
    )?;

    let internet_gateway = stack.add(
        &format!("{id}IGW"),
        InternetGateway {
            tags: vec![Tag::name(name.clone())],
        },
    )?;
    let gateway_attachment = stack.add(
        &format!("{id}VPCGW"),
        VpcGatewayAttachment {
            internet_gateway_id: internet_gateway.reference(),
            vpc_id: vpc.vpc_id(),
        },
    )?;

    let anywhere: Ipv4Cidr = "0.0.0.0/0".parse()?;
    let mut subnets = Vec::with_capacity(props.max_azs as usize);
    for index in 0..props.max_azs {
        let prefix = format!("{id}PublicSubnet{}", index + 1);
        let subnet_name = format!("{name}/PublicSubnet{}", index + 1);
        let cidr = props.cidr.subnet(props.subnet_prefix, index)?;

        let subnet = stack.add(
            &format!("{prefix}Subnet"),
            Subnet {
                availability_zone: Expr::select(index as usize, Expr::availability_zones()),
                cidr_block: cidr,
                map_public_ip_on_launch: true,
                tags: vec![Tag::name(subnet_name.clone())],
                vpc_id: vpc.vpc_id(),
            },
        )?;
        let route_table = stack.add(
            &format!("{prefix}RouteTable"),
            RouteTable {
                tags: vec![Tag::name(subnet_name)],
                vpc_id: vpc.vpc_id(),
            },
        )?;
        stack.add(
            &format!("{prefix}RouteTableAssociation"),
            SubnetRouteTableAssociation {
                route_table_id: route_table.reference(),
                subnet_id: subnet.subnet_id(),
            },
        )?;
        let default_route = stack.add(
            &format!("{prefix}DefaultRoute"),
            Route {
                destination_cidr_block: anywhere,
                gateway_id: internet_gateway.reference(),
                route_table_id: route_table.reference(),
            },
        )?;
        stack.add_dependency(&default_route, &gateway_attachment)?;

        subnets.push(PublicSubnet {
            cidr,
            subnet,
            route_table,
            default_route,
        });
    }

    Ok(PublicVpc {
        vpc,
        internet_gateway,
        gateway_attachment,
        subnets,
    })
}

#[cfg(test)]
mod tests {
    use infra_core::StackEnv;
    use serde_json::json;

    use super::*;

    fn props(max_azs: u32) -> PublicVpcProps {
        PublicVpcProps {
            cidr: "10.0.0.0/16".parse().expect("valid cidr"),
            max_azs,
            subnet_prefix: 24,
        }
    }

    #[test]
    fn one_public_subnet_per_zone() {
        let mut stack = Stack::new("Net", StackEnv::agnostic()).expect("valid name");
        let vpc = declare_public_vpc(&mut stack, "Vpc", &props(2)).expect("declare");

        assert_eq!(vpc.subnets.len(), 2);
        assert_eq!(vpc.subnets[0].cidr.to_string(), "10.0.0.0/24");
        assert_eq!(vpc.subnets[1].cidr.to_string(), "10.0.1.0/24");

        let second = stack.resource("VpcPublicSubnet2Subnet").expect("subnet");
        assert_eq!(
            second.properties["AvailabilityZone"],
            json!({"Fn::Select": [1, {"Fn::GetAZs": ""}]})
        );
        assert_eq!(second.properties["MapPublicIpOnLaunch"], json!(true));

        let route = stack.resource("VpcPublicSubnet1DefaultRoute").expect("route");
        assert_eq!(route.properties["GatewayId"], json!({"Ref": "VpcIGW"}));
        assert!(route.depends_on.contains("VpcVPCGW"));

        stack.validate().expect("all references resolve");
    }

    #[test]
    fn rejects_zone_count_out_of_range() {
        let mut stack = Stack::new("Net", StackEnv::agnostic()).expect("valid name");
        assert!(declare_public_vpc(&mut stack, "Vpc", &props(0)).is_err());
        assert!(declare_public_vpc(&mut stack, "Vpc", &props(7)).is_err());
    }
}
