use std::collections::HashMap;

use hyper::Method;

use crate::{InsertError, Node, Params};

// Order in which allowed methods are reported, custom methods go last.
const METHOD_ORDER: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
];

/// One routing tree per HTTP method.
///
/// Standard and custom methods share the same lookup; a tree is created the
/// first time a route is registered for its method.
pub struct RouteTable<T> {
    trees: HashMap<Method, Node<T>>,
    most_params: usize,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        RouteTable {
            trees: HashMap::new(),
            most_params: 0,
        }
    }
}

impl<T> RouteTable<T> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a route into the tree of `method`, returning the number of
    /// parameters it declares.
    ///
    /// A method whose first route is rejected gets no tree.
    pub fn insert(&mut self, method: Method, path: &str, value: T) -> Result<usize, InsertError> {
        let tree = self.trees.entry(method.clone()).or_default();

        match tree.insert(path, value) {
            Ok(params) => {
                self.most_params = self.most_params.max(params);
                Ok(params)
            }
            Err(err) => {
                if tree.is_empty() {
                    self.trees.remove(&method);
                }
                Err(err)
            }
        }
    }

    /// Returns the tree registered for `method`.
    pub fn tree(&self, method: &Method) -> Option<&Node<T>> {
        self.trees.get(method)
    }

    /// Returns the most parameters declared by any registered route.
    pub fn most_params(&self) -> usize {
        self.most_params
    }

    /// Returns every method with at least one route, in reporting order.
    pub fn methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.trees.keys().cloned().collect();
        sort_methods(&mut methods);
        methods
    }

    /// Returns the methods other than `except` whose tree matches `path`.
    ///
    /// `params` is used as scratch space and left empty.
    pub fn allowed(&self, path: &str, except: &Method, params: &mut Params) -> Vec<Method> {
        let mut allowed: Vec<Method> = self
            .trees
            .iter()
            .filter(|(method, _)| *method != except)
            .filter(|(_, tree)| tree.find(path, params).is_some())
            .map(|(method, _)| method.clone())
            .collect();

        params.clear();
        sort_methods(&mut allowed);
        allowed
    }
}

pub(crate) fn sort_methods(methods: &mut [Method]) {
    let rank = |method: &Method| {
        METHOD_ORDER
            .iter()
            .position(|m| m == method)
            .unwrap_or(METHOD_ORDER.len())
    };

    methods.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.as_str().cmp(b.as_str())));
}

/// Joins methods into an `Allow` header value.
pub(crate) fn allow_header(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
