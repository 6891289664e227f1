use std::fmt;

/// Represents errors that can occur when registering a route.
///
/// Registration happens once, before serving begins, so the conventional
/// registration methods on [`Routes`](crate::Routes) panic with this error's
/// message. [`Node::insert`](crate::Node::insert) and
/// [`Routes::try_handle`](crate::Routes::try_handle) return it instead.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum InsertError {
    /// A handler is already registered for the exact same route.
    DuplicateRoute {
        /// The duplicated route.
        route: String,
    },
    /// A path segment conflicts with a wildcard registered at the same position.
    WildcardConflict {
        /// The remainder of the new route, starting at the conflicting segment.
        segment: String,
        /// The wildcard that is already registered.
        wildcard: String,
        /// The full route being inserted.
        route: String,
    },
    /// A wildcard was inserted where static routes already exist.
    ChildConflict {
        /// The wildcard segment.
        wildcard: String,
        /// The full route being inserted.
        route: String,
    },
    /// Only one wildcard per path segment is allowed.
    TooManyParams {
        /// The remainder of the route, starting at the first wildcard of the segment.
        segment: String,
        /// The full route being inserted.
        route: String,
    },
    /// Parameters must be registered with a name.
    UnnamedParam {
        /// The full route being inserted.
        route: String,
    },
    /// Catch-all parameters are only allowed at the end of a route.
    InvalidCatchAll {
        /// The full route being inserted.
        route: String,
    },
    /// A catch-all was inserted below a segment root that already holds a route.
    CatchAllConflict {
        /// The full route being inserted.
        route: String,
    },
    /// Catch-all parameters must directly follow a `/`.
    MissingSlash {
        /// The full route being inserted.
        route: String,
    },
    /// The same parameter name appears twice in one route.
    DuplicateParam {
        /// The duplicated parameter name.
        param: String,
        /// The full route being inserted.
        route: String,
    },
    /// The route contains an empty segment (`//`).
    DoubleSlash {
        /// The full route being inserted.
        route: String,
        /// Byte offset of the first `//`.
        index: usize,
    },
    /// The route could not be percent-decoded.
    Unescape {
        /// The route as it was registered.
        route: String,
        /// Why decoding failed.
        reason: String,
    },
    /// The route declares more parameters than a single match can hold.
    ParamLimit {
        /// The full route being inserted.
        route: String,
        /// How many wildcards the route declares.
        count: usize,
    },
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRoute { route } => {
                write!(f, "handlers are already registered for path '{}'", route)
            }
            Self::WildcardConflict {
                segment,
                wildcard,
                route,
            } => write!(
                f,
                "path segment '{}' conflicts with existing wildcard '{}' in path '{}'",
                segment, wildcard, route
            ),
            Self::ChildConflict { wildcard, route } => write!(
                f,
                "wildcard route '{}' conflicts with existing children in path '{}'",
                wildcard, route
            ),
            Self::TooManyParams { segment, route } => write!(
                f,
                "only one wildcard per path segment is allowed, has: '{}' in path '{}'",
                segment, route
            ),
            Self::UnnamedParam { route } => write!(
                f,
                "wildcards must be named with a non-empty name in path '{}'",
                route
            ),
            Self::InvalidCatchAll { route } => write!(
                f,
                "catch-all parameters are only allowed at the end of a route, path '{}'",
                route
            ),
            Self::CatchAllConflict { route } => write!(
                f,
                "catch-all conflicts with existing handle for the path segment root in path '{}'",
                route
            ),
            Self::MissingSlash { route } => write!(f, "no / before catch-all in path '{}'", route),
            Self::DuplicateParam { param, route } => write!(
                f,
                "duplicate param name '{}' detected for route '{}'",
                param, route
            ),
            Self::DoubleSlash { route, index } => write!(
                f,
                "bad path '{}' contains duplicate // at index: {}",
                route, index
            ),
            Self::Unescape { route, reason } => {
                write!(f, "unescape error on path '{}': {}", route, reason)
            }
            Self::ParamLimit { route, count } => write!(
                f,
                "too many parameters defined in path '{}' ({}), max is {}",
                route,
                count,
                crate::tree::MAX_PARAMS
            ),
        }
    }
}

impl std::error::Error for InsertError {}
