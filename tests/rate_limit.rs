//! Integration tests for admission control at the router level.
//!
//! Exercises the full pipeline short of the socket: identifier extraction,
//! per-client and per-route budget isolation, and the error taxonomy for
//! denied and unattributable requests.

mod common;

use std::net::SocketAddr;

use common::*;
use hyper::{Method, Request, StatusCode};
use tollgate::GateError;

fn get(path: &str) -> Request<()> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(())
        .unwrap()
}

fn get_forwarded(path: &str, xff: &str) -> Request<()> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .header("x-forwarded-for", xff)
        .body(())
        .unwrap()
}

#[test]
fn burst_admits_then_rejects() {
    init_tracing();
    let (router, _, _) = test_router(profile(5.0, 10), profile(1.0, 2));

    // The strict route's burst of 2 admits exactly two immediate requests.
    for _ in 0..2 {
        let resp = router.handle(&get("/ping_strict"), test_addr()).unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let err = router
        .handle(&get("/ping_strict"), test_addr())
        .expect_err("third request exceeds the burst");
    assert!(matches!(err, GateError::RateLimited));
    assert_eq!(err.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
}

#[test]
fn budgets_are_per_client() {
    init_tracing();
    let (router, _, _) = test_router(profile(0.0, 1), profile(0.0, 1));

    let addr_a: SocketAddr = "10.0.0.1:12345".parse().unwrap();
    let addr_b: SocketAddr = "10.0.0.2:12345".parse().unwrap();

    // Exhaust client A's budget.
    assert!(router.handle(&get("/ping_normal"), addr_a).is_ok());
    assert!(router.handle(&get("/ping_normal"), addr_a).is_err());

    // Client B is unaffected.
    assert!(router.handle(&get("/ping_normal"), addr_b).is_ok());
}

#[test]
fn routes_keep_independent_budgets_for_one_client() {
    init_tracing();
    let (router, normal_registry, strict_registry) =
        test_router(profile(0.0, 1), profile(0.0, 1));

    assert!(router.handle(&get("/ping_strict"), test_addr()).is_ok());
    assert!(router.handle(&get("/ping_strict"), test_addr()).is_err());

    // The same client still has its full budget on the other route.
    assert!(router.handle(&get("/ping_normal"), test_addr()).is_ok());

    assert_eq!(normal_registry.len(), 1);
    assert_eq!(strict_registry.len(), 1);
}

#[test]
fn forwarded_clients_are_attributed_separately() {
    init_tracing();
    let (router, normal_registry, _) = test_router(profile(0.0, 1), profile(0.0, 1));

    // Two clients behind the same proxy peer each get their own bucket.
    assert!(
        router
            .handle(&get_forwarded("/ping_normal", "203.0.113.7"), test_addr())
            .is_ok()
    );
    assert!(
        router
            .handle(&get_forwarded("/ping_normal", "203.0.113.8"), test_addr())
            .is_ok()
    );
    assert!(
        router
            .handle(&get_forwarded("/ping_normal", "203.0.113.7"), test_addr())
            .is_err()
    );

    assert_eq!(normal_registry.len(), 2);
}

#[test]
fn malformed_forwarded_address_is_a_server_error() {
    init_tracing();
    let (router, normal_registry, _) = test_router(profile(0.0, 1), profile(0.0, 1));

    let err = router
        .handle(&get_forwarded("/ping_normal", "not-an-address"), test_addr())
        .expect_err("extraction must fail");
    assert!(matches!(err, GateError::ClientAddr(_)));
    assert_eq!(
        err.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );

    // Failed extraction never touches the registry.
    assert!(normal_registry.is_empty());
}

#[test]
fn denied_requests_still_refresh_the_entry() {
    init_tracing();
    let (router, normal_registry, _) = test_router(profile(0.0, 1), profile(0.0, 1));

    assert!(router.handle(&get("/ping_normal"), test_addr()).is_ok());
    assert!(router.handle(&get("/ping_normal"), test_addr()).is_err());

    // The denial touched last_seen, so a sweep keyed to a generous
    // threshold keeps the entry alive.
    assert_eq!(normal_registry.sweep(std::time::Duration::from_secs(60)), 0);
    assert_eq!(normal_registry.len(), 1);
}

#[test]
fn unknown_routes_are_not_rate_limited() {
    init_tracing();
    let (router, normal_registry, strict_registry) =
        test_router(profile(0.0, 1), profile(0.0, 1));

    let err = router
        .handle(&get("/nope"), test_addr())
        .expect_err("no such route");
    assert!(matches!(err, GateError::NotFound(_)));
    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

    // Routing failures never charge any bucket.
    assert!(normal_registry.is_empty());
    assert!(strict_registry.is_empty());
}
