//! Turns a descriptor into a concrete [`HttpRequest`].

use url::Url;

use crate::auth::Authorizer;
use crate::descriptor::RequestDescriptor;
use crate::http::HttpRequest;

/// Build the wire request for one attempt.
///
/// Header order is body encoder, then response decoder, then the descriptor's
/// own headers; duplicates are kept. The authorizer runs last. Pure apart from
/// reading encoder inputs such as multipart files.
pub fn build_request<D>(base: &Url, descriptor: &D, authorizer: Option<&dyn Authorizer>) -> HttpRequest
where
    D: RequestDescriptor + ?Sized,
{
    let endpoint = match descriptor.version_path() {
        Some(prefix) => descriptor.path().versioned(&prefix),
        None => descriptor.path(),
    };
    let mut request = HttpRequest::new(descriptor.method(), endpoint.resolve(base));

    let encoding = descriptor.encoding();
    if let Some(encoder) = &encoding {
        request.headers.extend(encoder.headers().iter().cloned());
    }
    request.headers.extend(descriptor.response().headers().iter().cloned());
    request.headers.extend(descriptor.headers());

    match (descriptor.parameters(), &encoding) {
        (Some(params), Some(encoder)) => request.body = encoder.encode(params),
        (Some(_), None) => {
            tracing::warn!(url = %request.url, "descriptor has body parameters but no encoder; sending no body");
        }
        _ => {}
    }

    if let Some(authorizer) = authorizer {
        authorizer.authorize(&mut request);
    }

    tracing::debug!(curl = %request.curl_command(), "built request");
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BearerTokenAuth;
    use crate::codec::{Decoder, Encoder};
    use crate::descriptor::Descriptor;
    use crate::endpoint::{Endpoint, Path};
    use crate::http::{Header, HttpMethod};
    use serde::Serialize;

    #[derive(Serialize)]
    struct NewItem {
        name: String,
    }

    fn base() -> Url {
        Url::parse("http://localhost:3000").unwrap()
    }

    #[test]
    fn get_without_body_carries_decoder_headers_only() {
        let descriptor = Descriptor::<(), serde_json::Value>::new(
            HttpMethod::Get,
            Endpoint::from_path("items").query("page", "2"),
            Decoder::json(),
        );
        let req = build_request(&base(), &descriptor, None);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url.as_str(), "http://localhost:3000/items?page=2");
        assert_eq!(req.headers, vec![Header::accept_json()]);
        assert!(req.body.is_none());
    }

    #[test]
    fn headers_are_a_union_in_order() {
        let descriptor = Descriptor::<(), serde_json::Value>::new(
            HttpMethod::Post,
            Endpoint::from_path("items"),
            Decoder::json(),
        )
        .header(Header::new("Accept", "application/vnd.items+json"))
        .body(
            NewItem {
                name: "lamp".to_string(),
            },
            Encoder::json(),
        );
        let req = build_request(&base(), &descriptor, None);
        assert_eq!(
            req.headers,
            vec![
                Header::json_content(),
                Header::accept_json(),
                Header::new("Accept", "application/vnd.items+json"),
            ]
        );
        let body: serde_json::Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["name"], "lamp");
    }

    #[test]
    fn version_prefix_is_prepended() {
        let descriptor = Descriptor::<(), String>::new(
            HttpMethod::Get,
            Endpoint::from_path("items"),
            Decoder::plain_text(),
        )
        .version(Path::new(["api", "v1"]));
        let req = build_request(&base(), &descriptor, None);
        assert_eq!(req.url.as_str(), "http://localhost:3000/api/v1/items");
    }

    #[test]
    fn authorizer_runs_last_and_overrides() {
        let descriptor = Descriptor::<(), ()>::new(HttpMethod::Get, Endpoint::from_path("me"), Decoder::none())
            .header(Header::new("Authorization", "Bearer stale"));
        let auth = BearerTokenAuth::new("fresh");
        let req = build_request(&base(), &descriptor, Some(&auth));
        assert_eq!(req.header("Authorization"), Some("Bearer fresh"));
        assert_eq!(req.headers.iter().filter(|h| h.field.eq_ignore_ascii_case("authorization")).count(), 1);
    }

    #[test]
    fn building_twice_is_deterministic() {
        let descriptor = Descriptor::<(), String>::new(
            HttpMethod::Delete,
            Endpoint::from_path("items/9"),
            Decoder::plain_text(),
        );
        assert_eq!(
            build_request(&base(), &descriptor, None),
            build_request(&base(), &descriptor, None)
        );
    }
}
