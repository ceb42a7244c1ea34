//! Route table: an ordered list of (path pattern, accepted methods, view),
//! matched first-match-wins on the path alone, with a dedicated 501 when the
//! path matches but the request's method isn't one of the route's declared
//! methods (or the view itself declines it).
//!
//! Grounded on `webcc::Server::Route(url, view, methods)` and its `R(pattern)`
//! marker for "this path is a regex, not a literal" — the teacher's own
//! server never grew a router at all (dispatch was left to the embedding
//! application's state machine), so the shape here follows the original
//! C++ source directly rather than the Rust teacher.

use std::panic::{self, AssertUnwindSafe};

use regex::Regex;

use crate::error::Error;
use crate::request::{Method, Request};
use crate::response::{Response, Status};

/// A view: the one operation a server-side handler implements. Returning
/// `None` means "I don't handle this particular request", which the
/// dispatcher maps to `501 Not Implemented`, same as a method the route
/// itself didn't declare.
pub type Handler = Box<dyn Fn(&Request) -> Option<Response> + Send + Sync>;

/// A route's path matcher: either an exact literal or a regular expression
/// whose capture groups become the request's ordered `args`.
pub enum RoutePattern {
    Literal(String),
    Regex(Regex),
}

/// A literal path match, e.g. `/books`.
pub fn literal(path: impl Into<String>) -> RoutePattern {
    RoutePattern::Literal(path.into())
}

/// A regex path match, e.g. `/books/(\d+)`. The pattern is implicitly
/// anchored at both ends (matched the way `std::regex_match` would, not
/// `std::regex_search`) so a prefix match doesn't accidentally capture a
/// whole subtree of paths.
pub fn regex(pattern: &str) -> Result<RoutePattern, Error> {
    let anchored = format!("^(?:{pattern})$");
    Regex::new(&anchored)
        .map(RoutePattern::Regex)
        .map_err(|e| Error::Syntax(format!("invalid route pattern {pattern:?}: {e}")))
}

impl RoutePattern {
    fn matches(&self, path: &str) -> Option<Vec<String>> {
        match self {
            RoutePattern::Literal(p) => (p == path).then(Vec::new),
            RoutePattern::Regex(re) => {
                let caps = re.captures(path)?;
                Some(
                    caps.iter()
                        .skip(1)
                        .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                        .collect(),
                )
            }
        }
    }
}

/// Best-effort text for a caught panic payload, for the log line only.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

struct Route {
    pattern: RoutePattern,
    methods: Vec<Method>,
    handler: Handler,
}

/// An ordered route table, read-only once the server starts serving.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Router { routes: Vec::new() }
    }

    /// Registers `handler` for `pattern`, accepting only the methods in
    /// `methods`. Routes are tried in registration order; the first whose
    /// pattern matches the request path wins, regardless of whether a later
    /// route would also match and accept the method.
    pub fn route(&mut self, pattern: RoutePattern, methods: &[Method], handler: Handler) {
        self.routes.push(Route { pattern, methods: methods.to_vec(), handler });
    }

    /// Matches `request.url.path()` against the table, filling in
    /// `request.args` from the winning pattern's capture groups before
    /// invoking its view.
    pub fn dispatch(&self, request: &mut Request) -> Response {
        let path = request.url.path().to_string();
        for route in &self.routes {
            let Some(args) = route.pattern.matches(&path) else {
                continue;
            };
            if !route.methods.contains(&request.method) {
                return Response::new(Status::NOT_IMPLEMENTED);
            }
            request.args = args;
            let handler = &route.handler;
            return match panic::catch_unwind(AssertUnwindSafe(|| handler(request))) {
                Ok(Some(response)) => response,
                Ok(None) => Response::new(Status::NOT_IMPLEMENTED),
                Err(panic) => {
                    let err = Error::Server(panic_message(&panic).to_string());
                    log::error!("view for {path:?} panicked: {err}");
                    Response::new(Status(err.status_code()))
                }
            };
        }
        Response::new(Status::NOT_FOUND)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::url::Url;

    fn request(method: Method, path: &str) -> Request {
        Request::new(method, Url::parse(&format!("http://x{path}")).unwrap())
    }

    #[test]
    fn literal_route_matches() {
        let mut router = Router::new();
        router.route(literal("/hello"), &[Method::Get], Box::new(|_| Some(Response::new(Status::OK))));
        let resp = router.dispatch(&mut request(Method::Get, "/hello"));
        assert_eq!(resp.status, Status::OK);
    }

    #[test]
    fn unknown_path_is_404() {
        let router = Router::new();
        let resp = router.dispatch(&mut request(Method::Get, "/missing"));
        assert_eq!(resp.status, Status::NOT_FOUND);
    }

    #[test]
    fn known_path_wrong_method_is_501_without_calling_view() {
        let mut router = Router::new();
        router.route(
            literal("/hello"),
            &[Method::Get],
            Box::new(|_| panic!("view must not run for a method outside its route")),
        );
        let resp = router.dispatch(&mut request(Method::Post, "/hello"));
        assert_eq!(resp.status, Status::NOT_IMPLEMENTED);
    }

    #[test]
    fn view_returning_none_is_also_501() {
        let mut router = Router::new();
        router.route(literal("/hello"), &[Method::Get, Method::Post], Box::new(|req| {
            (req.method == Method::Get).then(|| Response::new(Status::OK))
        }));
        let resp = router.dispatch(&mut request(Method::Post, "/hello"));
        assert_eq!(resp.status, Status::NOT_IMPLEMENTED);
    }

    #[test]
    fn regex_route_captures_ordered_positional_args() {
        let mut router = Router::new();
        router.route(
            regex(r"/books/(\d+)").unwrap(),
            &[Method::Get, Method::Put, Method::Delete],
            Box::new(|req| {
                let mut resp = Response::new(Status::OK);
                resp.set_body(crate::body::Body::from_bytes(req.args[0].clone().into_bytes()), None);
                Some(resp)
            }),
        );
        let resp = router.dispatch(&mut request(Method::Get, "/books/42"));
        assert_eq!(resp.status, Status::OK);
        assert_eq!(resp.into_body_bytes().unwrap(), b"42");
    }

    #[test]
    fn regex_route_is_fully_anchored() {
        let mut router = Router::new();
        router.route(
            regex(r"/books/(\d+)").unwrap(),
            &[Method::Get],
            Box::new(|_| Some(Response::new(Status::OK))),
        );
        let resp = router.dispatch(&mut request(Method::Get, "/books/42/extra"));
        assert_eq!(resp.status, Status::NOT_FOUND);
    }

    #[test]
    fn panicking_view_yields_500_instead_of_killing_the_caller() {
        let mut router = Router::new();
        router.route(literal("/boom"), &[Method::Get], Box::new(|_| panic!("view blew up")));
        let resp = router.dispatch(&mut request(Method::Get, "/boom"));
        assert_eq!(resp.status, Status::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn first_matching_path_wins_over_a_later_route_for_the_same_method() {
        let mut router = Router::new();
        router.route(literal("/books"), &[Method::Get, Method::Post], Box::new(|_| Some(Response::new(Status::OK))));
        router.route(
            regex(r"/books/(\d+)").unwrap(),
            &[Method::Get, Method::Put, Method::Delete],
            Box::new(|_| Some(Response::new(Status::NOT_FOUND))),
        );

        // PATCH /books matches the first route's path but not its method set,
        // and must not fall through to try later routes.
        let resp = router.dispatch(&mut request(Method::Patch, "/books"));
        assert_eq!(resp.status, Status::NOT_IMPLEMENTED);
    }
}
