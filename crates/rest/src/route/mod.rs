//! The route table: compiled route definitions bound to handler descriptors.
//!
//! The table is built once from the candidate methods and is read-only
//! afterwards, so it can be shared by every concurrently handled request
//! without locking.
//!
//! Matching scans the routes in registration order; the first route whose verb
//! equals the request verb and whose template matches the whole path wins.
//! Each route owns a [`matchit`] router for its single template, so a lookup
//! is linear in the path length. Overlapping templates declared by different
//! methods (`/users/{id}` and `/users/me` under the same verb, for example)
//! are not ranked against each other.

pub mod pattern;

use crate::handler::{HandlerDescriptor, HandlerMethod};
use crate::request::PathParams;
use http::Method;
use pattern::PathPattern;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, warn};

/// The identity of a route: its verb and the shape of its path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteDefinition {
    verb: Method,
    shape: String,
    routable: bool,
}

impl RouteDefinition {
    pub fn new(verb: Method, template: &str) -> Self {
        Self::of(verb, &PathPattern::compile(template))
    }

    fn of(verb: Method, pattern: &PathPattern) -> Self {
        Self { verb, shape: pattern.shape().to_owned(), routable: !pattern.is_malformed() }
    }

    #[inline]
    pub fn verb(&self) -> &Method {
        &self.verb
    }

    #[inline]
    pub fn shape(&self) -> &str {
        &self.shape
    }
}

/// A live route table entry.
#[derive(Debug)]
pub struct Route {
    definition: RouteDefinition,
    pattern: PathPattern,
    descriptor: HandlerDescriptor,
}

impl Route {
    #[inline]
    pub fn definition(&self) -> &RouteDefinition {
        &self.definition
    }

    #[inline]
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// The path template as declared on the handler method.
    #[inline]
    pub fn template(&self) -> &str {
        self.pattern.template()
    }

    #[inline]
    pub fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    /// Returns true if this route accepts the request verb and the whole path.
    #[inline]
    pub fn matches(&self, verb: &Method, path: &str) -> bool {
        self.definition.verb == *verb && self.pattern.is_match(path)
    }

    /// The placeholder values `path` yields under this route's template.
    pub fn path_params<'r, 'p>(&'r self, path: &'p str) -> PathParams<'r, 'p> {
        self.pattern.captures(path).unwrap_or_else(PathParams::empty)
    }
}

pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::new()
    }

    /// Builds a table from every candidate method at once.
    pub fn build(methods: impl IntoIterator<Item = HandlerMethod>) -> Self {
        Self::builder().methods(methods).build()
    }

    /// Finds the route for `verb` and `path`, returning `None` when nothing matches.
    pub fn find(&self, verb: &Method, path: &str) -> Option<&Route> {
        let route = self.routes.iter().find(|route| route.matches(verb, path));
        match route {
            Some(route) => debug!(%verb, path, handler = %route.descriptor, "route matched"),
            None => debug!(%verb, path, "no route matched"),
        }
        route
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.routes.iter().map(|route| (route.definition.verb(), route.template()))).finish()
    }
}

#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    routes: Vec<Route>,
    index: HashMap<RouteDefinition, usize>,
}

impl RouteTableBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: HandlerMethod) -> Self {
        self.insert(method);
        self
    }

    pub fn methods(mut self, methods: impl IntoIterator<Item = HandlerMethod>) -> Self {
        for method in methods {
            self.insert(method);
        }
        self
    }

    pub fn build(self) -> RouteTable {
        RouteTable { routes: self.routes }
    }

    fn insert(&mut self, method: HandlerMethod) {
        let (Some(verb), Some(template), descriptor) = method.into_parts() else {
            return;
        };

        let pattern = PathPattern::compile(&template);
        if let Some(e) = pattern.error() {
            warn!(cause = %e, handler = %descriptor, "path template will never match");
        }

        match self.index.entry(RouteDefinition::of(verb, &pattern)) {
            Entry::Vacant(vacant) => {
                debug!(verb = %vacant.key().verb(), template = %template, handler = %descriptor, "route registered");
                let route = Route { definition: vacant.key().clone(), pattern, descriptor };
                vacant.insert(self.routes.len());
                self.routes.push(route);
            }
            Entry::Occupied(occupied) => {
                let existing = &mut self.routes[*occupied.get()];
                if is_generic_override(&descriptor, &existing.descriptor) {
                    debug!(template = %template, bridge = %existing.descriptor, handler = %descriptor, "concrete override replaces generic bridge");
                    *existing = Route { definition: occupied.key().clone(), pattern, descriptor };
                } else {
                    warn!(template = %template, kept = %existing.descriptor, dropped = %descriptor, "duplicate route dropped");
                }
            }
        }
    }
}

/// A candidate overrides an existing entry when the existing one is a generic
/// bridge (first parameter of the erased top type) and the candidate is concrete.
fn is_generic_override(candidate: &HandlerDescriptor, existing: &HandlerDescriptor) -> bool {
    existing.first_param_type().is_some_and(|ty| ty.is_erased())
        && candidate.first_param_type().is_some_and(|ty| !ty.is_erased())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Invocation, Param, ReturnShape};
    use crate::value::{Json, ParamType, Value};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Item {
        #[allow(dead_code, reason = "only the shape matters here")]
        name: String,
    }

    struct Items;

    fn get_ping() -> HandlerMethod {
        HandlerMethod::of::<Items>("ping").get("/ping").direct(|_: &Items| "pong")
    }

    fn table() -> RouteTable {
        RouteTable::build([
            get_ping(),
            HandlerMethod::of::<Items>("create").post("/items").param(Param::body()).direct(|_: &Items, _item: Json<Item>| ()),
            HandlerMethod::of::<Items>("find").get("/items/{id}").param(Param::path("id")).direct(|_: &Items, id: i64| id),
            HandlerMethod::of::<Items>("comment")
                .get("/items/{id}/comments/{comment}")
                .param(Param::path("comment"))
                .param(Param::path("id"))
                .direct(|_: &Items, _comment: String, _id: i64| ()),
        ])
    }

    #[test]
    fn static_routes_need_exact_verb_and_path() {
        let table = table();

        let route = table.find(&Method::GET, "/ping").unwrap();
        assert_eq!(route.descriptor().name(), "ping");
        assert_eq!(route.template(), "/ping");

        assert!(table.find(&Method::POST, "/ping").is_none());
        assert!(table.find(&Method::GET, "/ping/").is_none());
        assert!(table.find(&Method::GET, "/pin").is_none());
        assert!(table.find(&Method::GET, "/items").is_none());
        assert_eq!(table.find(&Method::POST, "/items").unwrap().descriptor().name(), "create");
    }

    #[test]
    fn placeholder_routes() {
        let table = table();

        assert_eq!(table.find(&Method::GET, "/items/42").unwrap().descriptor().name(), "find");
        assert!(table.find(&Method::GET, "/items/42/extra").is_none());
        assert_eq!(table.find(&Method::GET, "/items/42/comments/7").unwrap().descriptor().name(), "comment");
    }

    #[test]
    fn placeholder_values_by_name() {
        let table = table();
        let route = table.find(&Method::GET, "/items/42/comments/7").unwrap();
        let params = route.path_params("/items/42/comments/7");

        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get("comment"), Some("7"));
        assert_eq!(params.get("missing"), None);
        assert!(route.path_params("/items/42").is_empty());
    }

    #[test]
    fn candidates_without_markers_are_skipped() {
        let table = RouteTable::build([
            HandlerMethod::of::<Items>("no_path").verb(Method::GET).direct(|_: &Items| ()),
            HandlerMethod::of::<Items>("no_verb").path("/no-verb").direct(|_: &Items| ()),
            HandlerMethod::of::<Items>("none").direct(|_: &Items| ()),
        ]);

        assert!(table.is_empty());
    }

    fn bridge() -> HandlerMethod {
        HandlerMethod::of::<Items>("save").put("/items/{id}").param(Param::body()).erased(
            vec![ParamType::Any],
            ReturnShape::Direct,
            |_, _| Invocation::Ready(Ok(Value::Text("bridge".into()))),
        )
    }

    fn concrete() -> HandlerMethod {
        HandlerMethod::of::<Items>("save")
            .put("/items/{key}")
            .param(Param::body())
            .direct(|_: &Items, _item: Json<Item>| "concrete")
    }

    #[test]
    fn concrete_override_replaces_bridge() {
        let table = RouteTable::build([bridge(), concrete()]);

        assert_eq!(table.len(), 1);
        let route = table.find(&Method::PUT, "/items/1").unwrap();
        assert_eq!(route.descriptor().first_param_type(), Some(ParamType::Structured));
        assert_eq!(route.template(), "/items/{key}");
    }

    #[test]
    fn bridge_never_replaces_concrete() {
        let table = RouteTable::build([concrete(), bridge()]);

        assert_eq!(table.len(), 1);
        let route = table.find(&Method::PUT, "/items/1").unwrap();
        assert_eq!(route.descriptor().first_param_type(), Some(ParamType::Structured));
    }

    #[test]
    fn first_registered_duplicate_wins() {
        let table = RouteTable::build([
            HandlerMethod::of::<Items>("first").get("/dup").direct(|_: &Items| "first"),
            HandlerMethod::of::<Items>("second").get("/dup").direct(|_: &Items| "second"),
        ]);

        assert_eq!(table.len(), 1);
        assert_eq!(table.find(&Method::GET, "/dup").unwrap().descriptor().name(), "first");
    }

    #[test]
    fn same_template_different_verbs() {
        let table = RouteTable::build([
            get_ping(),
            HandlerMethod::of::<Items>("post_ping").post("/ping").direct(|_: &Items| "posted"),
        ]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.find(&Method::POST, "/ping").unwrap().descriptor().name(), "post_ping");
    }

    #[test]
    fn malformed_template_is_kept_but_never_matches() {
        let table = RouteTable::build([HandlerMethod::of::<Items>("broken").get("/broken/{id").direct(|_: &Items| ())]);

        assert_eq!(table.len(), 1);
        assert!(table.routes().all(|route| route.pattern().is_malformed()));
        assert!(table.find(&Method::GET, "/broken/{id").is_none());
        assert!(table.find(&Method::GET, "/broken/1").is_none());
    }

    #[test]
    fn malformed_template_does_not_collide_with_a_valid_shape() {
        let table = RouteTable::build([
            HandlerMethod::of::<Items>("broken").get("/items/{}").direct(|_: &Items| "broken"),
            HandlerMethod::of::<Items>("find").get("/items/{id}").param(Param::path("id")).direct(|_: &Items, id: i64| id),
        ]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.find(&Method::GET, "/items/3").unwrap().descriptor().name(), "find");
    }

    #[test]
    fn definitions_compare_by_verb_and_shape() {
        assert_eq!(RouteDefinition::new(Method::GET, "/items/{id}"), RouteDefinition::new(Method::GET, "/items/{key}"));
        assert_eq!(RouteDefinition::new(Method::GET, "/items/{id}").shape(), "/items/{}");
        assert_ne!(RouteDefinition::new(Method::GET, "/items/{id}"), RouteDefinition::new(Method::PUT, "/items/{id}"));
        assert_ne!(RouteDefinition::new(Method::GET, "/items/{}"), RouteDefinition::new(Method::GET, "/items/{id}"));
    }

    #[test]
    fn registration_order_decides_overlaps() {
        let table = RouteTable::build([
            HandlerMethod::of::<Items>("find").get("/items/{id}").param(Param::path("id")).direct(|_: &Items, id: String| id),
            HandlerMethod::of::<Items>("latest").get("/items/latest").direct(|_: &Items| "latest"),
        ]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.find(&Method::GET, "/items/latest").unwrap().descriptor().name(), "find");
    }
}
