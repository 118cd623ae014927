mod support;

use infra_stacks::access::{
    evaluate_bucket_request, evaluate_viewer_request, AccessDecision, BucketRequest, Caller,
    DenyReason, ViewerRequest,
};
use infra_stacks::config::DEFAULT_ALLOWED_COUNTRIES;
use infra_stacks::static_website::{
    BUCKET_ID, BUCKET_POLICY_ID, CLOUDFRONT_SERVICE_PRINCIPAL, DISTRIBUTION_ID, GET_OBJECT_ACTION,
};
use proptest::prelude::*;
use rstest::rstest;
use serde_json::Value;

use support::{deployed_website, distribution_arn, website_template};

fn viewer(country: &str, method: &str) -> AccessDecision {
    evaluate_viewer_request(
        &website_template(),
        DISTRIBUTION_ID,
        &ViewerRequest { country, method },
    )
    .expect("distribution evaluates")
}

fn direct(caller: Caller, key: &str, source_arn: Option<&str>) -> AccessDecision {
    evaluate_bucket_request(
        &website_template(),
        BUCKET_ID,
        &BucketRequest {
            caller,
            action: GET_OBJECT_ACTION,
            key,
            source_arn,
        },
        &deployed_website(),
    )
    .expect("bucket evaluates")
}

#[test]
fn every_allowed_country_can_read() {
    for country in DEFAULT_ALLOWED_COUNTRIES {
        assert_eq!(viewer(country, "GET"), AccessDecision::Allowed, "{country}");
        assert_eq!(viewer(country, "HEAD"), AccessDecision::Allowed, "{country}");
    }
}

#[rstest]
#[case("POST")]
#[case("PUT")]
#[case("DELETE")]
#[case("PATCH")]
#[case("OPTIONS")]
fn write_methods_are_rejected_at_the_edge(#[case] method: &str) {
    assert_eq!(
        viewer("US", method),
        AccessDecision::Denied(DenyReason::MethodNotAllowed {
            method: method.to_string(),
        })
    );
}

#[test]
fn distribution_is_the_only_reader() {
    assert!(direct(
        Caller::Service(CLOUDFRONT_SERVICE_PRINCIPAL.to_string()),
        "index.html",
        Some(&distribution_arn()),
    )
    .is_allowed());
}

#[rstest]
#[case(None)]
#[case(Some("arn:aws:cloudfront::123456789012:distribution/EOTHERDIST"))]
#[case(Some("arn:aws:cloudfront::210987654321:distribution/E2QWRUHEXAMPLE"))]
fn cloudfront_acting_for_another_distribution_is_rejected(#[case] source_arn: Option<&str>) {
    assert_eq!(
        direct(
            Caller::Service(CLOUDFRONT_SERVICE_PRINCIPAL.to_string()),
            "index.html",
            source_arn,
        ),
        AccessDecision::Denied(DenyReason::NoMatchingStatement)
    );
}

#[test]
fn policy_condition_is_the_exact_distribution_arn() {
    let template = website_template();
    let policy = &template.resources[BUCKET_POLICY_ID];
    let statements = policy.properties["PolicyDocument"]["Statement"]
        .as_array()
        .expect("statement list");
    assert_eq!(statements.len(), 1);

    let condition = &statements[0]["Condition"]["StringEquals"]["AWS:SourceArn"];
    let resolved = deployed_website().resolve(condition).expect("resolvable");
    assert_eq!(resolved, distribution_arn());
    assert!(!resolved.contains('*'));
    assert!(matches!(condition, Value::Object(_)), "bound through the distribution handle");
}

proptest! {
    #[test]
    fn countries_outside_the_allow_list_are_rejected(country in "[A-Z]{2}") {
        prop_assume!(!DEFAULT_ALLOWED_COUNTRIES.contains(&country.as_str()));
        prop_assert_eq!(
            viewer(&country, "GET"),
            AccessDecision::Denied(DenyReason::GeoRestricted { country: country.clone() })
        );
    }

    #[test]
    fn direct_bucket_reads_are_rejected_for_any_path(key in "[a-zA-Z0-9/_.-]{0,64}") {
        prop_assert_eq!(
            direct(Caller::Anonymous, &key, None),
            AccessDecision::Denied(DenyReason::PublicAccessBlocked)
        );
        prop_assert_eq!(
            direct(Caller::Account("210987654321".to_string()), &key, None),
            AccessDecision::Denied(DenyReason::NoMatchingStatement)
        );
        prop_assert_eq!(
            direct(Caller::Service("s3.amazonaws.com".to_string()), &key, Some(&distribution_arn())),
            AccessDecision::Denied(DenyReason::NoMatchingStatement)
        );
    }
}
