use crate::escape;
use crate::{InsertError, Params};

use std::collections::HashSet;
use std::mem;
use std::sync::Arc;

/// The most parameters a single route may declare.
pub const MAX_PARAMS: usize = 255;

/// The key under which an unnamed catch-all (`/*`) stores its value.
pub const WILDCARD_PARAM: &str = "*wildcard";

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Default)]
enum NodeType {
    #[default]
    Static,
    Root,
    Param,
    CatchAll,
}

/// A node in a radix tree ordered by priority.
///
/// Priority is the number of values registered in the node's subtree
/// (children, grandchildren, and so on), so hotter branches are probed first.
///
/// A node whose `wild_child` flag is set has exactly one child, the
/// parameter or catch-all node, and no static children.
pub struct Node<T> {
    path: Vec<u8>,
    key: Option<Arc<str>>,
    wild_child: bool,
    node_type: NodeType,
    indices: Vec<u8>,
    children: Vec<Node<T>>,
    value: Option<T>,
    priority: u32,
}

/// A successful match consisting of the registered value and the URL
/// parameters, returned by [`Node::at`].
#[derive(Debug)]
pub struct Match<'n, V> {
    /// The value stored under the matched node.
    pub value: &'n V,
    /// The route parameters.
    pub params: Params,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Node {
            path: Vec::new(),
            key: None,
            wild_child: false,
            node_type: NodeType::Static,
            indices: Vec::new(),
            children: Vec::new(),
            value: None,
            priority: 0,
        }
    }
}

impl<T> Node<T> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no route has been inserted.
    pub fn is_empty(&self) -> bool {
        self.path.is_empty() && self.children.is_empty()
    }

    /// Inserts a route with the given value.
    ///
    /// The route is percent-decoded first. Returns the number of parameters
    /// the route declares.
    ///
    /// Insertion is not synchronized: all routes must be inserted before the
    /// tree is shared with concurrent readers.
    pub fn insert(&mut self, route: impl AsRef<str>, value: T) -> Result<usize, InsertError> {
        let route = match route.as_ref() {
            "" => "/",
            route => route,
        };

        let full = escape::unescape(route).map_err(|err| InsertError::Unescape {
            route: route.to_owned(),
            reason: err.to_string(),
        })?;

        let num_params = validate(&full)?;

        let mut path = full.as_bytes();
        let mut remaining = num_params;

        self.priority += 1;

        // empty tree
        if self.is_empty() {
            self.insert_child(remaining, path, &full, value)?;
            self.node_type = NodeType::Root;
            return Ok(num_params);
        }

        let mut current = self;

        'walk: loop {
            // find the longest common prefix, which can't contain a wildcard
            // since the existing path can't contain those characters
            let common = current
                .path
                .iter()
                .zip(path)
                .take_while(|(a, b)| a == b)
                .count();

            // split the edge
            if common < current.path.len() {
                let child = Node {
                    path: current.path[common..].to_vec(),
                    key: None,
                    wild_child: current.wild_child,
                    node_type: NodeType::Static,
                    indices: mem::take(&mut current.indices),
                    children: mem::take(&mut current.children),
                    value: current.value.take(),
                    priority: current.priority - 1,
                };

                current.children = vec![child];
                current.indices = vec![current.path[common]];
                current.path.truncate(common);
                current.wild_child = false;
            }

            // the route is exhausted, this node holds the value
            if common == path.len() {
                if current.value.is_some() {
                    return Err(InsertError::DuplicateRoute {
                        route: full.to_string(),
                    });
                }

                current.value = Some(value);
                return Ok(num_params);
            }

            path = &path[common..];

            if current.wild_child {
                current = &mut current.children[0];
                current.priority += 1;

                // the wildcard must match, and must not be a prefix of a
                // longer wildcard (`:name` and `:names`)
                let len = current.path.len();
                if path.len() >= len
                    && current.path[..] == path[..len]
                    && (len == path.len() || path[len] == b'/')
                {
                    remaining -= 1;
                    continue 'walk;
                }

                return Err(InsertError::WildcardConflict {
                    segment: String::from_utf8_lossy(path).into_owned(),
                    wildcard: String::from_utf8_lossy(&current.path).into_owned(),
                    route: full.to_string(),
                });
            }

            let next = path[0];

            // `/` after a parameter
            if current.node_type == NodeType::Param && next == b'/' && current.children.len() == 1
            {
                current = &mut current.children[0];
                current.priority += 1;
                continue 'walk;
            }

            // a static child with the next byte exists
            if let Some(i) = current.indices.iter().position(|&c| c == next) {
                let i = current.update_child_priority(i);
                current = &mut current.children[i];
                continue 'walk;
            }

            if next != b':' && next != b'*' {
                current.indices.push(next);
                current.children.push(Node::default());
                let i = current.update_child_priority(current.indices.len() - 1);
                current = &mut current.children[i];
            }

            current.insert_child(remaining, path, &full, value)?;
            return Ok(num_params);
        }
    }

    // Inserts the remainder of a route below this node, splitting out a
    // dedicated node for every wildcard.
    fn insert_child(
        &mut self,
        mut remaining: usize,
        path: &[u8],
        route: &str,
        value: T,
    ) -> Result<(), InsertError> {
        let mut current = self;
        // already handled bytes of the path
        let mut offset = 0;
        let mut cursor = 0;

        while remaining > 0 {
            let Some(start) = path[cursor..]
                .iter()
                .position(|&c| c == b':' || c == b'*')
                .map(|i| i + cursor)
            else {
                break;
            };

            let end = wildcard_end(path, start);

            // static children would become unreachable behind the wildcard
            if !current.children.is_empty() {
                return Err(InsertError::ChildConflict {
                    wildcard: String::from_utf8_lossy(&path[start..end]).into_owned(),
                    route: route.to_owned(),
                });
            }

            if path[start] == b':' {
                // split the path at the beginning of the wildcard
                if start > 0 {
                    current.path = path[offset..start].to_vec();
                    offset = start;
                }

                current.children = vec![Node {
                    node_type: NodeType::Param,
                    ..Node::default()
                }];
                current.wild_child = true;
                current = &mut current.children[0];
                current.priority += 1;
                current.path = path[offset..end].to_vec();
                current.key = Some(param_key(&path[offset + 1..end]));
                remaining -= 1;

                // a non-wildcard subpath starting with '/' follows
                if end < path.len() {
                    offset = end;
                    current.children = vec![Node {
                        priority: 1,
                        ..Node::default()
                    }];
                    current = &mut current.children[0];
                }

                cursor = end;
                continue;
            }

            // catch-all
            if current.path.last() == Some(&b'/') {
                return Err(InsertError::CatchAllConflict {
                    route: route.to_owned(),
                });
            }

            let slash = match start.checked_sub(1) {
                Some(slash) if path[slash] == b'/' => slash,
                _ => {
                    return Err(InsertError::MissingSlash {
                        route: route.to_owned(),
                    })
                }
            };

            current.path = path[offset..slash].to_vec();

            // first node: catch-all node with an empty path
            current.children = vec![Node {
                wild_child: true,
                node_type: NodeType::CatchAll,
                ..Node::default()
            }];
            current.indices = vec![b'/'];
            current = &mut current.children[0];
            current.priority += 1;

            // second node: holds the variable
            let name = &path[start + 1..];
            current.children = vec![Node {
                path: path[slash..].to_vec(),
                key: Some(if name.is_empty() {
                    Arc::from(WILDCARD_PARAM)
                } else {
                    param_key(name)
                }),
                node_type: NodeType::CatchAll,
                value: Some(value),
                priority: 1,
                ..Node::default()
            }];

            return Ok(());
        }

        // insert the remaining path and the value at the leaf
        current.path = path[offset..].to_vec();
        current.value = Some(value);
        Ok(())
    }

    // Increments the priority of the given child and moves it left past any
    // lower priority siblings, keeping `indices` in sync. Returns the new
    // position of the child.
    fn update_child_priority(&mut self, i: usize) -> usize {
        self.children[i].priority += 1;
        let priority = self.children[i].priority;

        let mut updated = i;
        while updated > 0 && self.children[updated - 1].priority < priority {
            self.children.swap(updated - 1, updated);
            updated -= 1;
        }

        if updated != i {
            self.indices[updated..=i].rotate_right(1);
        }

        updated
    }

    /// Finds the value registered for the given path, writing the captured
    /// parameters into `params` in the order they appear in the route.
    ///
    /// `params` is cleared first. Returns `None` if no route matches, in
    /// which case the contents of `params` are unspecified.
    pub fn find<'n>(&'n self, path: &str, params: &mut Params) -> Option<&'n T> {
        params.clear();

        let mut current = self;
        let mut path = path.as_bytes();

        loop {
            if path.len() > current.path.len() {
                if !path.starts_with(&current.path) {
                    return None;
                }

                path = &path[current.path.len()..];

                // no wildcard child, look up the next static child
                if !current.wild_child {
                    let next = path[0];
                    let i = current.indices.iter().position(|&c| c == next)?;
                    current = &current.children[i];
                    continue;
                }

                current = &current.children[0];
                let key = current.key.as_ref()?;

                match current.node_type {
                    NodeType::Param => {
                        // the parameter ends at the next '/' or the end of the path
                        let end = path.iter().position(|&c| c == b'/').unwrap_or(path.len());

                        // a parameter never matches an empty segment
                        if end == 0 {
                            return None;
                        }

                        params.push(key, &path[..end]);

                        if end < path.len() {
                            current = current.children.first()?;
                            path = &path[end..];
                            continue;
                        }

                        return current.value.as_ref();
                    }
                    NodeType::CatchAll => {
                        // the leading '/' belongs to the route, not the value
                        params.push(key, &path[1..]);
                        return current.value.as_ref();
                    }
                    _ => return None,
                }
            }

            if path == current.path.as_slice() {
                return current.value.as_ref();
            }

            return None;
        }
    }

    /// Convenience wrapper around [`find`](Node::find) that allocates a
    /// fresh parameter list.
    pub fn at(&self, path: &str) -> Option<Match<'_, T>> {
        let mut params = Params::new();
        self.find(path, &mut params)
            .map(|value| Match { value, params })
    }

    /// Checks that every node's priority equals the number of values in its subtree.
    #[cfg(feature = "__test_helpers")]
    pub fn check_priorities(&self) -> Result<u32, (u32, u32)> {
        let mut priority: u32 = 0;
        for child in &self.children {
            priority += child.check_priorities()?;
        }

        if self.value.is_some() {
            priority += 1;
        }

        if self.priority != priority {
            return Err((self.priority, priority));
        }

        Ok(priority)
    }
}

// Validates the wildcards of a decoded route and returns how many it declares.
fn validate(route: &str) -> Result<usize, InsertError> {
    let path = route.as_bytes();
    let mut names: HashSet<&[u8]> = HashSet::new();
    let mut count = 0;
    let mut i = 0;

    while i < path.len() {
        let c = path[i];
        if c != b':' && c != b'*' {
            i += 1;
            continue;
        }

        let end = wildcard_end(path, i);

        // the wildcard name must not contain ':' and '*'
        if path[i + 1..end].iter().any(|&c| c == b':' || c == b'*') {
            return Err(InsertError::TooManyParams {
                segment: String::from_utf8_lossy(&path[i..]).into_owned(),
                route: route.to_owned(),
            });
        }

        let name = &path[i + 1..end];

        if c == b':' && name.is_empty() {
            return Err(InsertError::UnnamedParam {
                route: route.to_owned(),
            });
        }

        if c == b'*' {
            if end != path.len() {
                return Err(InsertError::InvalidCatchAll {
                    route: route.to_owned(),
                });
            }

            if i == 0 || path[i - 1] != b'/' {
                return Err(InsertError::MissingSlash {
                    route: route.to_owned(),
                });
            }
        }

        let name = if name.is_empty() {
            WILDCARD_PARAM.as_bytes()
        } else {
            name
        };

        if !names.insert(name) {
            return Err(InsertError::DuplicateParam {
                param: String::from_utf8_lossy(name).into_owned(),
                route: route.to_owned(),
            });
        }

        count += 1;
        if count > MAX_PARAMS {
            return Err(InsertError::ParamLimit {
                route: route.to_owned(),
                count: path.iter().filter(|&&c| c == b':' || c == b'*').count(),
            });
        }

        i = end;
    }

    Ok(count)
}

// Returns the end of the wildcard starting at `start`: the next '/' or the
// end of the path.
fn wildcard_end(path: &[u8], start: usize) -> usize {
    path[start + 1..]
        .iter()
        .position(|&c| c == b'/')
        .map_or(path.len(), |i| i + start + 1)
}

fn param_key(name: &[u8]) -> Arc<str> {
    Arc::from(String::from_utf8_lossy(name).as_ref())
}
