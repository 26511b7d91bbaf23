use crate::config::Route;
use http::{Method, Uri};
use std::sync::Arc;

/// Matches incoming requests against the configured routes.
#[derive(Clone)]
pub struct Router {
    routes: Arc<Vec<Route>>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes: Arc::new(routes),
        }
    }

    /// Finds the first route that matches the method and path.
    pub fn find(&self, method: &Method, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| {
            let method_matches = route
                .r#match
                .method
                .is_none_or(|expected| expected.matches(method));

            method_matches && path_has_prefix(path, &route.r#match.path_prefix)
        })
    }
}

/// Prefix match on whole path segments.
fn path_has_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl Route {
    /// Path and query sent to the upstream for `uri`.
    pub fn upstream_path_and_query(&self, uri: &Uri) -> String {
        let mut path = uri.path();

        if self.strip_prefix {
            let prefix = self.r#match.path_prefix.trim_end_matches('/');
            path = path.strip_prefix(prefix).unwrap_or(path);
        }

        let path = if path.is_empty() { "/" } else { path };

        match uri.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        }
    }
}
