//! # Request router
//!
//! An ordered table of routes built once at startup. Matching runs in two
//! passes: literal patterns first, then wildcard patterns, each in
//! registration order. The first match wins.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use log::{debug, error, warn};

use crate::{
    exception::Exception,
    handler::{Handler, RouteParams},
    param::HttpRequestMethod,
    request::Request,
    response::Response,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    /// Matches exactly this path
    Exact(String),
    /// Matches any path that starts with this prefix; the rest is captured
    Prefix(String),
}

impl RoutePattern {
    /// `"/static/*path"` becomes `Prefix("/static/")`, anything without a `*`
    /// segment is `Exact`.
    pub fn parse(pattern: &str) -> Self {
        match pattern.rfind("/*") {
            Some(star) => Self::Prefix(pattern[..star + 1].to_string()),
            None => Self::Exact(pattern.to_string()),
        }
    }

    fn is_exact(&self) -> bool {
        matches!(self, Self::Exact(_))
    }

    fn capture(&self, path: &str) -> Option<RouteParams> {
        match self {
            Self::Exact(p) if p == path => Some(RouteParams::default()),
            Self::Exact(_) => None,
            Self::Prefix(prefix) => path.strip_prefix(prefix.as_str()).map(RouteParams::with_tail),
        }
    }
}

struct Route {
    method: HttpRequestMethod,
    pattern: RoutePattern,
    handler: Arc<dyn Handler>,
}

#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        method: HttpRequestMethod,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        let pattern = RoutePattern::parse(pattern);
        debug!("registered route {} {:?}", method, pattern);
        self.routes.push(Route {
            method,
            pattern,
            handler,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the route for `method` and `path`.
    fn find(&self, method: HttpRequestMethod, path: &str) -> Option<(&Route, RouteParams)> {
        let literal = self.routes.iter().filter(|r| r.pattern.is_exact());
        let wildcard = self.routes.iter().filter(|r| !r.pattern.is_exact());
        literal
            .chain(wildcard)
            .filter(|r| r.method == method)
            .find_map(|r| r.pattern.capture(path).map(|params| (r, params)))
    }

    /// Route the request and run its handler. Never fails: errors and panics
    /// become error responses.
    pub fn dispatch(&self, request: &Request) -> Response {
        let id = request.id();
        let method = request.method();
        let path = request.path();

        let (route, params, strip_body) = match self.find(method, path) {
            Some((route, params)) => (route, params, false),
            None if method == HttpRequestMethod::Head => {
                match self.find(HttpRequestMethod::Get, path) {
                    Some((route, params)) => (route, params, true),
                    None => return not_found(id, method, path),
                }
            }
            None => return not_found(id, method, path),
        };

        let handler = &route.handler;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(request, &params)));
        let mut response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("[ID{}]{} {} failed: {}", id, method, path, e);
                Response::from_status_code(e.status_code())
            }
            Err(_) => {
                error!("[ID{}]handler for {} {} panicked", id, method, path);
                Response::from_status_code(Exception::InternalError.status_code())
            }
        };
        if strip_body {
            response.strip_body();
        }
        response
    }
}

fn not_found(id: u128, method: HttpRequestMethod, path: &str) -> Response {
    debug!("[ID{}]no route for {} {}", id, method, path);
    Response::from_status_code(Exception::RouteNotFound.status_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::MockHandler;
    use proptest::prelude::*;

    /// A handler that answers with its own name.
    struct Named(&'static str);

    impl Handler for Named {
        fn handle(&self, _request: &Request, params: &RouteParams) -> Result<Response, Exception> {
            let body = match params.tail() {
                Some(tail) => format!("{}:{}", self.0, tail),
                None => self.0.to_string(),
            };
            Ok(Response::from_html(body))
        }
    }

    struct Panics;

    impl Handler for Panics {
        fn handle(&self, _request: &Request, _params: &RouteParams) -> Result<Response, Exception> {
            panic!("dinosaur escaped");
        }
    }

    fn body(response: &Response) -> String {
        String::from_utf8(response.content().unwrap().to_vec()).unwrap()
    }

    fn dino_router() -> Router {
        let mut router = Router::new();
        router
            .register(HttpRequestMethod::Get, "/", Arc::new(Named("home")))
            .register(HttpRequestMethod::Get, "/form", Arc::new(Named("form")))
            .register(HttpRequestMethod::Get, "/dino", Arc::new(Named("dino")))
            .register(HttpRequestMethod::Get, "/static/*path", Arc::new(Named("static")));
        router
    }

    #[test]
    fn test_pattern_parse() {
        assert_eq!(RoutePattern::parse("/form"), RoutePattern::Exact("/form".into()));
        assert_eq!(
            RoutePattern::parse("/static/*path"),
            RoutePattern::Prefix("/static/".into())
        );
    }

    #[test]
    fn test_literal_routes() {
        let router = dino_router();
        for (path, expected) in [("/", "home"), ("/form", "form"), ("/dino", "dino")] {
            let response = router.dispatch(&Request::new(HttpRequestMethod::Get, path));
            assert_eq!(response.status_code(), 200);
            assert_eq!(body(&response), expected);
        }
    }

    #[test]
    fn test_wildcard_captures_remainder() {
        let router = dino_router();
        let response = router.dispatch(&Request::new(
            HttpRequestMethod::Get,
            "/static/images/dinoOne.png",
        ));
        assert_eq!(body(&response), "static:images/dinoOne.png");
    }

    #[test]
    fn test_query_does_not_affect_matching() {
        let router = dino_router();
        let response = router.dispatch(&Request::new(HttpRequestMethod::Get, "/dino?age=7"));
        assert_eq!(body(&response), "dino");
    }

    #[test]
    fn test_literal_wins_over_wildcard() {
        let mut router = Router::new();
        router
            .register(HttpRequestMethod::Get, "/static/*path", Arc::new(Named("wild")))
            .register(HttpRequestMethod::Get, "/static/main.css", Arc::new(Named("literal")));
        let response = router.dispatch(&Request::new(HttpRequestMethod::Get, "/static/main.css"));
        assert_eq!(body(&response), "literal");
    }

    #[test]
    fn test_unknown_path_is_404() {
        let router = dino_router();
        for path in ["/dinos", "/form/", "/static", "/nope"] {
            let response = router.dispatch(&Request::new(HttpRequestMethod::Get, path));
            assert_eq!(response.status_code(), 404, "{}", path);
            assert_eq!(response.content_type(), Some("text/html;charset=utf-8"));
        }
    }

    #[test]
    fn test_unrouted_method_is_404() {
        let router = dino_router();
        let response = router.dispatch(&Request::new(HttpRequestMethod::Post, "/form"));
        assert_eq!(response.status_code(), 404);
    }

    #[test]
    fn test_head_uses_get_route_without_body() {
        let router = dino_router();
        let get = router.dispatch(&Request::new(HttpRequestMethod::Get, "/form"));
        let head = router.dispatch(&Request::new(HttpRequestMethod::Head, "/form"));
        assert_eq!(head.status_code(), 200);
        assert!(head.content().is_none());
        assert_eq!(head.content_length(), get.content_length());
        assert_eq!(head.content_type(), get.content_type());
    }

    #[test]
    fn test_handler_error_maps_to_status() {
        let mut mock = MockHandler::new();
        mock.expect_handle()
            .returning(|_, _| Err(Exception::AssetNotFound));
        let mut router = Router::new();
        router.register(HttpRequestMethod::Get, "/static/*path", Arc::new(mock));

        let response = router.dispatch(&Request::new(HttpRequestMethod::Get, "/static/x.png"));
        assert_eq!(response.status_code(), 404);
    }

    #[test]
    fn test_handler_panic_is_500() {
        let mut router = dino_router();
        router.register(HttpRequestMethod::Get, "/boom", Arc::new(Panics));

        let response = router.dispatch(&Request::new(HttpRequestMethod::Get, "/boom"));
        assert_eq!(response.status_code(), 500);

        // the router keeps working afterwards
        let response = router.dispatch(&Request::new(HttpRequestMethod::Get, "/"));
        assert_eq!(response.status_code(), 200);
    }

    #[test]
    fn test_dispatch_invokes_only_the_matched_handler() {
        let mut chosen = MockHandler::new();
        chosen
            .expect_handle()
            .withf(|request, params| request.path() == "/form" && params.tail().is_none())
            .times(1)
            .returning(|_, _| Ok(Response::from_html("form")));
        let mut other = MockHandler::new();
        other.expect_handle().times(0);

        let mut router = Router::new();
        router
            .register(HttpRequestMethod::Get, "/", Arc::new(other))
            .register(HttpRequestMethod::Get, "/form", Arc::new(chosen));

        let response = router.dispatch(&Request::new(HttpRequestMethod::Get, "/form"));
        assert_eq!(body(&response), "form");
    }

    #[test]
    fn test_first_registered_wildcard_wins() {
        let mut router = Router::new();
        router
            .register(HttpRequestMethod::Get, "/static/*path", Arc::new(Named("first")))
            .register(HttpRequestMethod::Get, "/static/images/*path", Arc::new(Named("second")));
        let response = router.dispatch(&Request::new(HttpRequestMethod::Get, "/static/images/a.png"));
        assert_eq!(body(&response), "first:images/a.png");
    }

    proptest! {
        #[test]
        fn prop_unregistered_paths_are_404(segment in "[a-z0-9]{1,12}") {
            prop_assume!(!["form", "dino", "static"].contains(&segment.as_str()));
            let router = dino_router();
            let response = router.dispatch(&Request::new(
                HttpRequestMethod::Get,
                &format!("/{}", segment),
            ));
            prop_assert_eq!(response.status_code(), 404);
        }

        #[test]
        fn prop_static_prefix_always_routes_to_static(tail in "[a-zA-Z0-9_./-]{0,32}") {
            let router = dino_router();
            let response = router.dispatch(&Request::new(
                HttpRequestMethod::Get,
                &format!("/static/{}", tail),
            ));
            prop_assert_eq!(body(&response), format!("static:{}", tail));
        }
    }
}
