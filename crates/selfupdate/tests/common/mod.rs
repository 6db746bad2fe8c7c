#![allow(dead_code)]

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LAST_MODIFIED: &str = "Tue, 14 Nov 2023 22:13:20 GMT";
pub const LAST_MODIFIED_UNIX: i64 = 1_700_000_000;

/// Serve `body` at `route` for both GET and HEAD, stamped with
/// [`LAST_MODIFIED`].
pub async fn serve_object(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(path(route))
        .respond_with(object(body).insert_header("last-modified", LAST_MODIFIED))
        .mount(server)
        .await;
}

/// Serve `body` at `route` without any modification timestamp.
pub async fn serve_unstamped(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(path(route))
        .respond_with(object(body))
        .mount(server)
        .await;
}

// HEAD answers carry the length a GET would return
fn object(body: Vec<u8>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-length", body.len().to_string().as_str())
        .set_body_bytes(body)
}

/// Answer GETs on `route` with `status`.
pub async fn serve_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
