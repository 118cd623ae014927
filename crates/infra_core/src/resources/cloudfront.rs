use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::SynthError;
use crate::expr::Expr;
use crate::resources::Resource;
use crate::stack::Handle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OriginAccessControl {
    pub origin_access_control_config: OriginAccessControlConfig,
}

impl Resource for OriginAccessControl {
    const TYPE_NAME: &'static str = "AWS::CloudFront::OriginAccessControl";
}

impl Handle<OriginAccessControl> {
    pub fn id(&self) -> Expr {
        self.reference()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OriginAccessControlConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub name: String,
    pub origin_access_control_origin_type: OriginAccessControlOriginType,
    pub signing_behavior: SigningBehavior,
    pub signing_protocol: SigningProtocol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginAccessControlOriginType {
    S3,
    Mediastore,
    Lambda,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningBehavior {
    Always,
    Never,
    #[serde(rename = "no-override")]
    NoOverride,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningProtocol {
    Sigv4,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Distribution {
    pub distribution_config: DistributionConfig,
}

impl Resource for Distribution {
    const TYPE_NAME: &'static str = "AWS::CloudFront::Distribution";
}

impl Handle<Distribution> {
    /// The distribution id, e.g. `E2QWRUHAPOMQZL`.
    pub fn id(&self) -> Expr {
        self.reference()
    }

    pub fn domain_name(&self) -> Expr {
        self.get_att("DomainName")
    }

    /// `arn:aws:cloudfront::<account>:distribution/<id>`.
    ///
    /// CloudFront is a global service, so the ARN carries no region.
    pub fn arn(&self, account: Expr) -> Expr {
        Expr::concat([
            Expr::literal("arn:aws:cloudfront::"),
            account,
            Expr::literal(":distribution/"),
            self.id(),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DistributionConfig {
    pub default_cache_behavior: DefaultCacheBehavior,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_root_object: Option<String>,
    pub enabled: bool,
    pub http_version: HttpVersion,
    pub origins: Vec<Origin>,
    pub price_class: PriceClass,
    pub restrictions: Restrictions,
    pub viewer_certificate: ViewerCertificate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Origin {
    pub domain_name: Expr,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_access_control_id: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_origin_config: Option<S3OriginConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3OriginConfig {
    /// Left empty when the origin is read through an origin access control.
    pub origin_access_identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DefaultCacheBehavior {
    pub allowed_methods: Vec<HttpMethod>,
    pub cached_methods: Vec<HttpMethod>,
    pub compress: bool,
    pub forwarded_values: ForwardedValues,
    pub target_origin_id: String,
    pub viewer_protocol_policy: ViewerProtocolPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Options,
    Put,
    Post,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ForwardedValues {
    pub cookies: Cookies,
    pub query_string: bool,
}

impl ForwardedValues {
    pub fn none() -> Self {
        Self {
            cookies: Cookies {
                forward: CookieForwarding::None,
            },
            query_string: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Cookies {
    pub forward: CookieForwarding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieForwarding {
    None,
    All,
    Whitelist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerProtocolPolicy {
    AllowAll,
    RedirectToHttps,
    HttpsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpVersion {
    Http1,
    Http2,
    Http3,
    #[serde(rename = "http2and3")]
    Http2And3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceClass {
    /// North America, Europe and Israel edge locations.
    #[serde(rename = "PriceClass_100")]
    PriceClass100,
    #[serde(rename = "PriceClass_200")]
    PriceClass200,
    #[serde(rename = "PriceClass_All")]
    PriceClassAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Restrictions {
    pub geo_restriction: GeoRestriction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeoRestriction {
    pub locations: Vec<CountryCode>,
    pub restriction_type: RestrictionType,
}

impl GeoRestriction {
    pub fn allow_only(locations: Vec<CountryCode>) -> Result<Self, SynthError> {
        if locations.is_empty() {
            return Err(SynthError::invalid_value(
                "geo restriction",
                "[]",
                "a whitelist must name at least one country",
            ));
        }
        Ok(Self {
            locations,
            restriction_type: RestrictionType::Whitelist,
        })
    }

    /// Whether a viewer in `country` may fetch content.
    pub fn permits(&self, country: &str) -> bool {
        let listed = self.locations.iter().any(|code| code.as_str() == country);
        match self.restriction_type {
            RestrictionType::Whitelist => listed,
            RestrictionType::Blacklist => !listed,
            RestrictionType::None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RestrictionType {
    None,
    Whitelist,
    Blacklist,
}

/// ISO 3166-1 alpha-2 country code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn parse(code: &str) -> Result<Self, SynthError> {
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(SynthError::invalid_value(
                "country code",
                code,
                "expected two uppercase ASCII letters",
            ));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for CountryCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ViewerCertificate {
    pub cloud_front_default_certificate: bool,
}

impl ViewerCertificate {
    /// The `*.cloudfront.net` certificate.
    pub fn cloudfront_default() -> Self {
        Self {
            cloud_front_default_certificate: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn codes(raw: &[&str]) -> Vec<CountryCode> {
        raw.iter()
            .map(|code| CountryCode::parse(code).expect("valid code"))
            .collect()
    }

    #[test]
    fn whitelist_only_permits_listed_countries() {
        let geo = GeoRestriction::allow_only(codes(&["US", "JP"])).expect("non-empty");
        assert!(geo.permits("US"));
        assert!(geo.permits("JP"));
        assert!(!geo.permits("BR"));
        assert!(!geo.permits("us"));
    }

    #[test]
    fn empty_whitelist_is_rejected() {
        assert!(GeoRestriction::allow_only(Vec::new()).is_err());
    }

    #[rstest]
    #[case("us")]
    #[case("USA")]
    #[case("U")]
    #[case("U1")]
    fn rejects_malformed_country_codes(#[case] raw: &str) {
        assert!(CountryCode::parse(raw).is_err());
    }

    #[test]
    fn enumerations_use_cloudformation_spelling() {
        assert_eq!(
            serde_json::to_value(ViewerProtocolPolicy::RedirectToHttps).expect("serialize"),
            json!("redirect-to-https")
        );
        assert_eq!(
            serde_json::to_value(PriceClass::PriceClass100).expect("serialize"),
            json!("PriceClass_100")
        );
        assert_eq!(
            serde_json::to_value(SigningProtocol::Sigv4).expect("serialize"),
            json!("sigv4")
        );
        assert_eq!(
            serde_json::to_value(HttpVersion::Http2).expect("serialize"),
            json!("http2")
        );
        assert_eq!(
            serde_json::to_value(vec![HttpMethod::Get, HttpMethod::Head]).expect("serialize"),
            json!(["GET", "HEAD"])
        );
        assert_eq!(
            serde_json::to_value(ViewerCertificate::cloudfront_default()).expect("serialize"),
            json!({"CloudFrontDefaultCertificate": true})
        );
    }
}
