//! Internet-facing ALB forwarding port 80 to a single Lambda target.
//!
//! The function runs as a pre-existing role imported by ARN and its code is
//! read from an artifact bucket that this stack does not own. Two invoke
//! permissions are declared for the load balancer service: one scoped to the
//! named target group, which ALB needs before it can register the function,
//! and one scoped to the listener.

use infra_core::cidr::Ipv4Cidr;
use infra_core::expr::Pseudo;
use infra_core::resources::ec2::{SecurityGroup, SecurityGroupRule};
use infra_core::resources::elbv2::{
    Listener, ListenerAction, ListenerProtocol, LoadBalancer, LoadBalancerAttribute,
    LoadBalancerType, Matcher, Scheme, TargetDescription, TargetGroup, TargetType,
};
use infra_core::resources::iam::ImportedRole;
use infra_core::resources::lambda::{Code, Function, FunctionTimeout, Permission};
use infra_core::{Expr, Handle, Stack, SynthError};
use tracing::info;

use crate::config::PaymentProps;
use crate::network::{declare_public_vpc, PublicVpc, PublicVpcProps};

pub const VPC_ID: &str = "PaymentVpc";
pub const FUNCTION_ID: &str = "PaymentLambda";
pub const SECURITY_GROUP_ID: &str = "ALBSecurityGroup";
pub const LOAD_BALANCER_ID: &str = "PaymentALB";
pub const LISTENER_ID: &str = "PaymentALBListener";
pub const TARGET_GROUP_ID: &str = "PaymentALBListenerLambdaTargetGroup";
pub const TARGET_GROUP_PERMISSION_ID: &str = "PaymentLambdaAllowTargetGroupInvoke";
pub const LISTENER_PERMISSION_ID: &str = "PaymentLambdaAllowALBInvoke";

pub const LOAD_BALANCER_SERVICE_PRINCIPAL: &str = "elasticloadbalancing.amazonaws.com";
pub const ALB_URL_OUTPUT: &str = "ALBUrl";

const MAX_TARGET_GROUP_NAME_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct PaymentEndpoint {
    pub vpc: PublicVpc,
    pub role: ImportedRole,
    pub function: Handle<Function>,
    pub security_group: Handle<SecurityGroup>,
    pub load_balancer: Handle<LoadBalancer>,
    pub target_group_permission: Handle<Permission>,
    pub target_group: Handle<TargetGroup>,
    pub listener: Handle<Listener>,
    pub listener_permission: Handle<Permission>,
}

pub fn declare(stack: &mut Stack, props: &PaymentProps) -> Result<PaymentEndpoint, SynthError> {
    let role = ImportedRole::from_role_arn(&props.execution_role_arn)?;
    let timeout = FunctionTimeout::from_secs(props.timeout_secs)?;
    validate_target_group_name(&props.target_group_name)?;
    if props.code_bucket.is_empty() || props.code_key.is_empty() {
        return Err(SynthError::invalid_value(
            "code location",
            format!("s3://{}/{}", props.code_bucket, props.code_key),
            "bucket and key must both be set",
        ));
    }

    let vpc = declare_public_vpc(
        stack,
        VPC_ID,
        &PublicVpcProps {
            cidr: props.vpc_cidr.parse()?,
            max_azs: props.max_azs,
            subnet_prefix: props.subnet_prefix,
        },
    )?;

    let function = stack.add(
        FUNCTION_ID,
        Function {
            code: Code::from_bucket(props.code_bucket.clone(), props.code_key.clone()),
            handler: props.handler.clone(),
            role: role.arn_expr(),
            runtime: props.runtime,
            timeout,
        },
    )?;

    let anywhere: Ipv4Cidr = "0.0.0.0/0".parse()?;
    let security_group = stack.add(
        SECURITY_GROUP_ID,
        SecurityGroup {
            group_description: "Allow HTTP traffic".to_string(),
            security_group_egress: vec![SecurityGroupRule::all_traffic(
                anywhere,
                "Allow all outbound traffic by default",
            )],
            security_group_ingress: vec![SecurityGroupRule::tcp(
                anywhere,
                props.listener_port,
                "Allow HTTP traffic from anywhere",
            )],
            vpc_id: vpc.vpc.vpc_id(),
        },
    )?;

    let load_balancer = stack.add(
        LOAD_BALANCER_ID,
        LoadBalancer {
            load_balancer_attributes: vec![LoadBalancerAttribute::deletion_protection(false)],
            scheme: Scheme::InternetFacing,
            security_groups: vec![security_group.group_id()],
            subnets: vpc.subnet_ids(),
            kind: LoadBalancerType::Application,
        },
    )?;
    for public in &vpc.subnets {
        stack.add_dependency(&load_balancer, &public.default_route)?;
    }

    let target_group_permission = stack.add(
        TARGET_GROUP_PERMISSION_ID,
        Permission::invoke(
            &function,
            LOAD_BALANCER_SERVICE_PRINCIPAL,
            target_group_arn_pattern(stack, &props.target_group_name),
        ),
    )?;
    let target_group = stack.add(
        TARGET_GROUP_ID,
        TargetGroup {
            health_check_enabled: true,
            matcher: Some(Matcher {
                http_code: props.healthy_http_codes.clone(),
            }),
            name: Some(props.target_group_name.clone()),
            target_type: TargetType::Lambda,
            targets: vec![TargetDescription { id: function.arn() }],
        },
    )?;
    stack.add_dependency(&target_group, &target_group_permission)?;

    let listener = stack.add(
        LISTENER_ID,
        Listener {
            default_actions: vec![ListenerAction::forward(&target_group)],
            load_balancer_arn: load_balancer.arn(),
            port: props.listener_port,
            protocol: ListenerProtocol::Http,
        },
    )?;

    let listener_permission = stack.add(
        LISTENER_PERMISSION_ID,
        Permission::invoke(&function, LOAD_BALANCER_SERVICE_PRINCIPAL, listener.arn()),
    )?;

    stack.add_output(
        ALB_URL_OUTPUT,
        Some("Public URL to access the Lambda behind ALB"),
        Expr::concat([Expr::literal("http://"), load_balancer.dns_name()]),
    )?;

    info!(
        stack = stack.name(),
        role = role.name(),
        code = %format!("s3://{}/{}", props.code_bucket, props.code_key),
        port = props.listener_port,
        "declared payment topology"
    );

    Ok(PaymentEndpoint {
        vpc,
        role,
        function,
        security_group,
        load_balancer,
        target_group_permission,
        target_group,
        listener,
        listener_permission,
    })
}

/// ARN of the target group called `name`, whatever suffix ELB assigns it.
///
/// The target group cannot be referenced directly: it depends on this
/// permission existing first.
fn target_group_arn_pattern(stack: &Stack, name: &str) -> Expr {
    let env = stack.env();
    Expr::concat([
        Expr::literal("arn:"),
        Expr::pseudo(Pseudo::Partition),
        Expr::literal(":elasticloadbalancing:"),
        env.region(),
        Expr::literal(":"),
        env.account(),
        Expr::literal(format!(":targetgroup/{name}/*")),
    ])
}

fn validate_target_group_name(name: &str) -> Result<(), SynthError> {
    let invalid = |reason: &str| SynthError::invalid_value("target group name", name, reason);
    if name.is_empty() || name.len() > MAX_TARGET_GROUP_NAME_LEN {
        return Err(invalid("must be 1 to 32 characters"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid("may only contain letters, digits and hyphens"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must not begin or end with a hyphen"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use infra_core::StackEnv;
    use serde_json::json;

    use super::*;

    fn declared() -> (Stack, PaymentEndpoint) {
        let mut stack = Stack::new("PaymentStack", StackEnv::agnostic()).expect("valid name");
        let endpoint = declare(&mut stack, &PaymentProps::default()).expect("declare");
        (stack, endpoint)
    }

    #[test]
    fn function_uses_imported_role_and_bucket_artifact() {
        let (stack, endpoint) = declared();
        let function = stack.resource(FUNCTION_ID).expect("function");

        assert_eq!(endpoint.role.name(), "LabRole");
        assert_eq!(
            function.properties["Role"],
            json!("arn:aws:iam::528316341503:role/LabRole")
        );
        assert_eq!(
            function.properties["Code"],
            json!({"S3Bucket": "task2-lambda-bucket-s3", "S3Key": "lambda-code.zip"})
        );
        assert_eq!(function.properties["Timeout"], json!(10));
        let template = stack.to_template().expect("template");
        assert_eq!(template.resources_of_type("AWS::IAM::Role").count(), 0);
    }

    #[test]
    fn target_group_waits_for_its_invoke_permission() {
        let (stack, _) = declared();
        let target_group = stack.resource(TARGET_GROUP_ID).expect("target group");
        assert!(target_group.depends_on.contains(TARGET_GROUP_PERMISSION_ID));
        assert_eq!(target_group.properties["Matcher"], json!({"HttpCode": "200"}));
        assert_eq!(target_group.properties["HealthCheckEnabled"], json!(true));

        let permission = stack
            .resource(TARGET_GROUP_PERMISSION_ID)
            .expect("permission");
        assert_eq!(
            permission.properties["SourceArn"],
            json!({"Fn::Join": ["", [
                "arn:",
                {"Ref": "AWS::Partition"},
                ":elasticloadbalancing:",
                {"Ref": "AWS::Region"},
                ":",
                {"Ref": "AWS::AccountId"},
                ":targetgroup/payment-lambda-targets/*"
            ]]})
        );
    }

    #[test]
    fn listener_permission_is_scoped_to_the_listener() {
        let (stack, _) = declared();
        let permission = stack
            .resource(LISTENER_PERMISSION_ID)
            .expect("permission");
        assert_eq!(
            permission.properties,
            json!({
                "Action": "lambda:InvokeFunction",
                "FunctionName": {"Fn::GetAtt": ["PaymentLambda", "Arn"]},
                "Principal": "elasticloadbalancing.amazonaws.com",
                "SourceArn": {"Ref": "PaymentALBListener"}
            })
        );
    }

    #[test]
    fn rejects_invalid_inputs() {
        let mut stack = Stack::new("PaymentStack", StackEnv::agnostic()).expect("valid name");
        let cases = [
            PaymentProps {
                execution_role_arn: "LabRole".to_string(),
                ..PaymentProps::default()
            },
            PaymentProps {
                timeout_secs: 0,
                ..PaymentProps::default()
            },
            PaymentProps {
                vpc_cidr: "10.0.0.0/33".to_string(),
                ..PaymentProps::default()
            },
            PaymentProps {
                target_group_name: "-payments".to_string(),
                ..PaymentProps::default()
            },
            PaymentProps {
                code_key: String::new(),
                ..PaymentProps::default()
            },
        ];
        for props in cases {
            assert!(declare(&mut stack, &props).is_err(), "{props:?} should fail");
        }
    }
}
