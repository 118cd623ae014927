//! Private S3 bucket served only through a geo-restricted CloudFront
//! distribution.
//!
//! The bucket never allows direct reads: public access is fully blocked and
//! its only policy statement admits the CloudFront service principal when the
//! request is signed on behalf of this stack's distribution. The policy is
//! bound in a second phase, after the distribution handle exists, so the
//! condition can name the distribution's own ARN.

use infra_core::resources::cloudfront::{
    CountryCode, DefaultCacheBehavior, Distribution, DistributionConfig, ForwardedValues,
    GeoRestriction, HttpMethod, HttpVersion, Origin, OriginAccessControl,
    OriginAccessControlConfig, OriginAccessControlOriginType, PriceClass, Restrictions,
    S3OriginConfig, SigningBehavior, SigningProtocol, ViewerCertificate, ViewerProtocolPolicy,
};
use infra_core::resources::iam::{PolicyDocument, PolicyStatement, Principal};
use infra_core::resources::s3::{
    Bucket, BucketEncryption, BucketPolicy, PublicAccessBlockConfiguration,
    VersioningConfiguration,
};
use infra_core::template::RemovalPolicy;
use infra_core::{Expr, Handle, Stack, SynthError};
use tracing::info;

use crate::config::StaticWebsiteProps;

pub const BUCKET_ID: &str = "WebsiteBucket";
pub const ORIGIN_ACCESS_CONTROL_ID: &str = "WebsiteOAC";
pub const DISTRIBUTION_ID: &str = "CloudFrontDistribution";
pub const BUCKET_POLICY_ID: &str = "WebsiteBucketPolicy";
pub const ORIGIN_ID: &str = "S3Origin";

pub const CLOUDFRONT_SERVICE_PRINCIPAL: &str = "cloudfront.amazonaws.com";
pub const READ_STATEMENT_SID: &str = "AllowCloudFrontServicePrincipalReadOnly";
pub const SOURCE_ARN_CONDITION_KEY: &str = "AWS:SourceArn";
pub const GET_OBJECT_ACTION: &str = "s3:GetObject";

pub const WEBSITE_URL_OUTPUT: &str = "WebsiteURL";
pub const BUCKET_NAME_OUTPUT: &str = "S3BucketName";

/// Handles to everything [`declare`] adds to the stack.
#[derive(Debug, Clone)]
pub struct StaticWebsite {
    pub bucket: Handle<Bucket>,
    pub origin_access_control: Handle<OriginAccessControl>,
    pub distribution: Handle<Distribution>,
    pub bucket_policy: Handle<BucketPolicy>,
}

pub fn declare(stack: &mut Stack, props: &StaticWebsiteProps) -> Result<StaticWebsite, SynthError> {
    let env = stack.env().clone();
    let locations = props
        .allowed_countries
        .iter()
        .map(|code| CountryCode::parse(code))
        .collect::<Result<Vec<_>, _>>()?;
    let geo_restriction = GeoRestriction::allow_only(locations)?;

    let bucket = stack.add(
        BUCKET_ID,
        Bucket {
            bucket_encryption: Some(BucketEncryption::s3_managed()),
            bucket_name: Some(Expr::concat([
                Expr::literal(format!("{}-", props.bucket_name_prefix)),
                env.region(),
                Expr::literal("-"),
                env.account(),
            ])),
            public_access_block_configuration: Some(PublicAccessBlockConfiguration::block_all()),
            versioning_configuration: Some(VersioningConfiguration::enabled()),
        },
    )?;
    stack.set_removal_policy(&bucket, RemovalPolicy::Retain)?;

    let origin_access_control = stack.add(
        ORIGIN_ACCESS_CONTROL_ID,
        OriginAccessControl {
            origin_access_control_config: OriginAccessControlConfig {
                description: Some("OAC for private S3 website bucket".to_string()),
                name: ORIGIN_ACCESS_CONTROL_ID.to_string(),
                origin_access_control_origin_type: OriginAccessControlOriginType::S3,
                signing_behavior: SigningBehavior::Always,
                signing_protocol: SigningProtocol::Sigv4,
            },
        },
    )?;

    let read_methods = vec![HttpMethod::Get, HttpMethod::Head];
    let distribution = stack.add(
        DISTRIBUTION_ID,
        Distribution {
            distribution_config: DistributionConfig {
                default_cache_behavior: DefaultCacheBehavior {
                    allowed_methods: read_methods.clone(),
                    cached_methods: read_methods,
                    compress: true,
                    forwarded_values: ForwardedValues::none(),
                    target_origin_id: ORIGIN_ID.to_string(),
                    viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
                },
                default_root_object: Some(props.default_root_object.clone()),
                enabled: true,
                http_version: HttpVersion::Http2,
                origins: vec![Origin {
                    domain_name: bucket.regional_domain_name(),
                    id: ORIGIN_ID.to_string(),
                    origin_access_control_id: Some(origin_access_control.id()),
                    s3_origin_config: Some(S3OriginConfig {
                        origin_access_identity: String::new(),
                    }),
                }],
                price_class: PriceClass::PriceClass100,
                restrictions: Restrictions { geo_restriction },
                viewer_certificate: ViewerCertificate::cloudfront_default(),
            },
        },
    )?;

    let bucket_policy = bind_distribution_read_access(stack, &bucket, &distribution)?;

    stack.add_output(
        WEBSITE_URL_OUTPUT,
        Some("CloudFront Distribution URL"),
        Expr::concat([Expr::literal("https://"), distribution.domain_name()]),
    )?;
    stack.add_output(
        BUCKET_NAME_OUTPUT,
        Some("Private S3 Bucket Name"),
        bucket.bucket_name(),
    )?;

    info!(
        stack = stack.name(),
        allowed_countries = props.allowed_countries.len(),
        "declared static website topology"
    );

    Ok(StaticWebsite {
        bucket,
        origin_access_control,
        distribution,
        bucket_policy,
    })
}

/// Grants `distribution`, and nothing else, read access to `bucket`.
pub fn bind_distribution_read_access(
    stack: &mut Stack,
    bucket: &Handle<Bucket>,
    distribution: &Handle<Distribution>,
) -> Result<Handle<BucketPolicy>, SynthError> {
    let statement = distribution_read_statement(bucket, distribution, stack.env().account());
    stack.add(
        BUCKET_POLICY_ID,
        BucketPolicy {
            bucket: bucket.reference(),
            policy_document: PolicyDocument::new(vec![statement]),
        },
    )
}

pub fn distribution_read_statement(
    bucket: &Handle<Bucket>,
    distribution: &Handle<Distribution>,
    account: Expr,
) -> PolicyStatement {
    PolicyStatement::allow(
        Principal::service(CLOUDFRONT_SERVICE_PRINCIPAL),
        GET_OBJECT_ACTION,
        bucket.objects_arn(),
    )
    .with_sid(READ_STATEMENT_SID)
    .with_condition(
        "StringEquals",
        SOURCE_ARN_CONDITION_KEY,
        distribution.arn(account),
    )
}
