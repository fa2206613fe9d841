use crate::escape::UnescapedRef;
use crate::params::MAX_PARAMS;
use crate::tree::Node;

use std::fmt;

/// Represents errors that can occur when inserting a new route.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum InsertError {
    /// Attempted to insert a path that conflicts with an existing route.
    Conflict {
        /// The existing route that the insertion is conflicting with.
        with: String,
    },
    /// The route contains malformed wildcard syntax: empty braces, an
    /// unterminated or stray brace, or an invalid character in a parameter
    /// name.
    InvalidParam,
    /// Only one wildcard is allowed per path segment.
    InvalidParamSegment,
    /// The route binds more parameters than the router supports.
    TooManyParams,
    /// Catch-all parameters are only allowed at the end of a route,
    /// directly after a `/`.
    InvalidCatchAll,
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict { with } => {
                write!(
                    f,
                    "insertion failed due to conflict with previously registered route: {}",
                    with
                )
            }
            Self::InvalidParam => write!(f, "route contains a malformed parameter"),
            Self::InvalidParamSegment => {
                write!(f, "only one parameter is allowed per path segment")
            }
            Self::TooManyParams => write!(f, "routes are limited to {} parameters", MAX_PARAMS),
            Self::InvalidCatchAll => write!(
                f,
                "catch-all parameters are only allowed at the end of a route, following a `/`"
            ),
        }
    }
}

impl std::error::Error for InsertError {}

impl InsertError {
    /// Reconstructs the route that the insertion conflicted with.
    ///
    /// `remaining` is the unconsumed tail of the new route and `current` the
    /// node the conflict surfaced at. The existing route is recovered by
    /// re-appending the node prefixes down the most popular branch until a
    /// value is reached, then re-doubling any escaped brackets.
    pub(crate) fn conflict<T>(
        route: UnescapedRef<'_>,
        remaining: UnescapedRef<'_>,
        current: &Node<T>,
    ) -> Self {
        let mut conflict = route.slice_until(route.len() - remaining.len()).to_owned();

        if !conflict.inner().ends_with(current.prefix.inner()) {
            conflict.append(&current.prefix);
        }

        let mut node = current;
        while node.value.is_none() {
            node = node.children.first().unwrap();
            conflict.append(&node.prefix);
        }

        InsertError::Conflict {
            with: String::from_utf8(conflict.to_escaped()).unwrap(),
        }
    }
}

/// A failed match attempt.
///
/// ```
/// use waymark::{MatchError, Router};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut router = Router::new();
/// router.insert("/home", "Welcome!")?;
/// router.insert("/blog/", "Our blog.")?;
///
/// // no routes match
/// if let Err(err) = router.at("/foobar") {
///     assert_eq!(err, MatchError::NotFound);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MatchError {
    /// No matching route was found.
    NotFound,
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "matching route not found")
    }
}

impl std::error::Error for MatchError {}

/// Represents errors that occurred while merging two routers.
///
/// Merging is best-effort: every route that does not conflict is moved into
/// the destination router, and the failures are collected here in insertion
/// order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeError(pub(crate) Vec<InsertError>);

impl MergeError {
    /// Returns an iterator over the errors encountered during the merge.
    pub fn iter(&self) -> impl Iterator<Item = &InsertError> {
        self.0.iter()
    }

    /// Consumes the error, returning the individual insertion failures.
    pub fn into_errors(self) -> Vec<InsertError> {
        self.0
    }
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.0 {
            writeln!(f, "{}", error)?;
        }

        Ok(())
    }
}

impl std::error::Error for MergeError {}

impl IntoIterator for MergeError {
    type Item = InsertError;
    type IntoIter = std::vec::IntoIter<InsertError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
