use std::fmt;
use std::mem;
use std::sync::Arc;

use crossbeam::queue::SegQueue;
use url::form_urlencoded;

use crate::Params;

// The reusable state behind a `RequestVars`.
#[derive(Default)]
struct Vars {
    params: Params,
    raw_query: String,
    query: Vec<(String, String)>,
    query_parsed: bool,
}

impl Vars {
    fn reset(&mut self) {
        self.params.clear();
        self.raw_query.clear();
        self.query.clear();
        self.query_parsed = false;
    }
}

/// A lock-free pool of per-request parameter buffers.
///
/// Buffers are taken with [`acquire`](VarsPool::acquire) and come back
/// automatically, cleared, when the returned [`RequestVars`] is dropped.
#[derive(Default)]
pub struct VarsPool {
    queue: SegQueue<Vars>,
}

impl VarsPool {
    /// Creates an empty pool.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Takes an idle buffer, or creates one able to hold `capacity`
    /// parameters without reallocating.
    pub fn acquire(self: &Arc<Self>, capacity: usize) -> RequestVars {
        let vars = self.queue.pop().unwrap_or_else(|| Vars {
            params: Params::with_capacity(capacity),
            ..Vars::default()
        });

        RequestVars {
            vars,
            pool: Some(Arc::clone(self)),
        }
    }

    /// Returns the number of idle buffers.
    pub fn idle(&self) -> usize {
        self.queue.len()
    }

    fn release(&self, mut vars: Vars) {
        vars.reset();
        self.queue.push(vars);
    }
}

impl fmt::Debug for VarsPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VarsPool").field("idle", &self.idle()).finish()
    }
}

/// The variables of a single request: the route parameters and the
/// lazily parsed query string.
///
/// A `RequestVars` is owned by exactly one request. Dropping it hands the
/// buffer back to its pool, even if the handler panicked or its future was
/// cancelled.
#[derive(Default)]
pub struct RequestVars {
    vars: Vars,
    pool: Option<Arc<VarsPool>>,
}

impl RequestVars {
    /// Creates vars that do not belong to any pool.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Returns the route parameters in the order they appear in the route.
    pub fn params(&self) -> &Params {
        &self.vars.params
    }

    pub(crate) fn params_mut(&mut self) -> &mut Params {
        &mut self.vars.params
    }

    /// Returns the value of the named route parameter, or `""` if the route
    /// has no such parameter.
    pub fn url_param(&self, name: &str) -> &str {
        self.vars.params.get(name).unwrap_or("")
    }

    /// Records the raw query string of the request these vars belong to.
    pub(crate) fn set_query(&mut self, query: Option<&str>) {
        self.vars.raw_query.clear();
        self.vars.raw_query.push_str(query.unwrap_or(""));
        self.vars.query.clear();
        self.vars.query_parsed = false;
    }

    /// Returns the query string of the request decoded as
    /// `application/x-www-form-urlencoded` pairs.
    ///
    /// The query is parsed on first use and cached for the rest of the
    /// request.
    pub fn query_params(&mut self) -> &[(String, String)] {
        if !self.vars.query_parsed {
            let Vars {
                raw_query, query, ..
            } = &mut self.vars;
            query.extend(
                form_urlencoded::parse(raw_query.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned())),
            );
            self.vars.query_parsed = true;
        }

        &self.vars.query
    }

    /// Returns the first value of the named query parameter.
    pub fn query_param(&mut self, name: &str) -> Option<&str> {
        self.query_params()
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl Drop for RequestVars {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(mem::take(&mut self.vars));
        }
    }
}

impl fmt::Debug for RequestVars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestVars")
            .field("params", &self.vars.params)
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_vars_are_reset() {
        let pool = VarsPool::new();

        let mut vars = pool.acquire(2);
        vars.set_query(Some("q=rust&page=2"));
        vars.params_mut().push(&Arc::from("id"), b"42");
        assert_eq!(vars.url_param("id"), "42");
        assert_eq!(vars.query_param("page"), Some("2"));
        drop(vars);

        assert_eq!(pool.idle(), 1);

        let mut vars = pool.acquire(2);
        assert_eq!(pool.idle(), 0);
        assert!(vars.params().is_empty());
        assert_eq!(vars.url_param("id"), "");
        assert!(vars.query_params().is_empty());
    }

    #[test]
    fn fresh_vars_are_presized() {
        let pool = VarsPool::new();
        let vars = pool.acquire(8);
        assert!(vars.params().capacity() >= 8);
    }

    #[test]
    fn query_is_parsed_once() {
        let mut vars = RequestVars::detached();
        vars.set_query(Some("a=1&b=x+y"));

        assert_eq!(
            vars.query_params(),
            [("a".to_owned(), "1".to_owned()), ("b".to_owned(), "x y".to_owned())]
        );
        assert_eq!(vars.query_param("a"), Some("1"));
        assert_eq!(vars.query_param("c"), None);

        vars.set_query(Some("a=2"));
        assert_eq!(vars.query_param("a"), Some("2"));
        assert_eq!(vars.query_params().len(), 1);
    }

    #[test]
    fn detached_vars_are_not_pooled() {
        let pool = VarsPool::new();
        drop(RequestVars::detached());
        assert_eq!(pool.idle(), 0);
    }
}
