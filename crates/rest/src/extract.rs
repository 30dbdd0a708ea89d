//! Raw argument extraction.
//!
//! Produces one raw string per declared parameter source, in declaration
//! order, before any typed conversion happens:
//!
//! - query: the first value of the named parameter; when it is missing or
//!   empty, the declared default, else the empty string
//! - path: the value the matched template captured for the named placeholder
//! - body: the whole raw body
//!
//! A path placeholder the route's template doesn't declare yields the empty
//! string.

use crate::handler::Param;
use crate::request::{PathParams, QueryParams};
use crate::route::Route;

pub fn extract_arguments(route: &Route, path: &str, query: &QueryParams, body: &str) -> Vec<String> {
    let mut path_params: Option<PathParams<'_, '_>> = None;

    route
        .descriptor()
        .params()
        .iter()
        .map(|param| match param {
            Param::Query { name, default_value } => query
                .first(name)
                .filter(|value| !value.is_empty())
                .or(default_value.as_deref())
                .unwrap_or_default()
                .to_owned(),
            Param::Path { name } => {
                let params = path_params.get_or_insert_with(|| route.path_params(path));
                params.get(name).unwrap_or_default().to_owned()
            }
            Param::Body => body.to_owned(),
        })
        .collect()
}
