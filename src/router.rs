use crate::error::{InsertError, MatchError, MergeError};
use crate::escape::UnescapedRoute;
use crate::params::Params;
use crate::tree::{self, Node};

use std::fmt;
use std::mem;

/// A URL router.
///
/// See [the crate documentation](crate) for details.
pub struct Router<T> {
    root: Node<T>,
}

impl<T> Router<T> {
    /// Construct a new router.
    pub fn new() -> Self {
        Self { root: Node::new() }
    }

    /// Insert a route into the router.
    ///
    /// ```rust
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut router = waymark::Router::new();
    /// router.insert("/home", "Welcome!")?;
    /// router.insert("/users/{id}", "A User")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn insert(&mut self, route: impl Into<String>, value: T) -> Result<(), InsertError> {
        let route = UnescapedRoute::new(route.into().into_bytes());
        tree::validate(route.as_ref())?;

        // the tree is empty
        if self.root.prefix.is_empty() && self.root.children.is_empty() {
            self.root.insert_route(route.as_ref(), value);
            return Ok(());
        }

        self.root.insert_at(route.as_ref(), route.as_ref(), value)
    }

    /// Tries to find a value in the router matching the given path.
    ///
    /// ```rust
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut router = waymark::Router::new();
    /// router.insert("/home", "Welcome!")?;
    ///
    /// let matched = router.at("/home")?;
    /// assert_eq!(*matched.value, "Welcome!");
    /// # Ok(())
    /// # }
    /// ```
    pub fn at<'path>(&self, path: &'path str) -> Result<Match<'_, 'path, &T>, MatchError> {
        match self.root.at(path.as_bytes()) {
            Ok((value, params)) => Ok(Match {
                // SAFETY: `&mut T` is only exposed through `&mut self`
                value: unsafe { &*value.get() },
                params,
            }),
            Err(err) => Err(err),
        }
    }

    /// Tries to find a value in the router matching the given path, returning
    /// a mutable reference.
    ///
    /// ```rust
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut router = waymark::Router::new();
    /// router.insert("/", 1)?;
    ///
    /// *router.at_mut("/")?.value += 1;
    /// assert_eq!(*router.at("/")?.value, 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn at_mut<'path>(
        &mut self,
        path: &'path str,
    ) -> Result<Match<'_, 'path, &mut T>, MatchError> {
        match self.root.at(path.as_bytes()) {
            Ok((value, params)) => Ok(Match {
                // SAFETY: we hold `&mut self`
                value: unsafe { &mut *value.get() },
                params,
            }),
            Err(err) => Err(err),
        }
    }

    /// Remove a given route from the router, returning the value stored for
    /// it.
    ///
    /// The pattern must match the registered route verbatim for the route to
    /// be removed.
    ///
    /// ```rust
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut router = waymark::Router::new();
    /// router.insert("/home", "Welcome!")?;
    /// assert_eq!(router.remove("/home"), Some("Welcome!"));
    /// assert_eq!(router.remove("/home"), None);
    ///
    /// router.insert("/users/{id}", "A User")?;
    /// // a route is only removed by the pattern it was registered with
    /// assert_eq!(router.remove("/users/{other}"), None);
    /// assert_eq!(router.remove("/users/{id}"), Some("A User"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn remove(&mut self, route: impl Into<String>) -> Option<T> {
        let route = UnescapedRoute::new(route.into().into_bytes());
        if tree::validate(route.as_ref()).is_err() {
            return None;
        }

        let value = self.root.remove(route.as_ref());
        if value.is_some() {
            if self.root.value.is_none() && self.root.children.is_empty() {
                self.root = Node::new();
            } else {
                self.root.try_merge();
            }
        }

        value
    }

    /// Moves all routes out of `other` and inserts them into this router.
    ///
    /// The merge is best-effort: routes conflicting with routes already
    /// registered here are collected into the returned [`MergeError`], and
    /// every other route is moved. `other` is left empty either way.
    ///
    /// ```rust
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut root = waymark::Router::new();
    /// root.insert("/home", "Welcome!")?;
    ///
    /// let mut child = waymark::Router::new();
    /// child.insert("/users/{id}", "A User")?;
    ///
    /// root.merge_from(&mut child)?;
    /// assert!(root.at("/users/1").is_ok());
    /// # Ok(())
    /// # }
    /// ```
    pub fn merge_from(&mut self, other: &mut Router<T>) -> Result<(), MergeError> {
        let root = mem::take(&mut other.root);

        let mut errors = Vec::new();
        let mut route = UnescapedRoute::default();
        root.drain(&mut route, &mut |pattern, value| {
            if let Err(err) = self.insert(pattern, value) {
                errors.push(err);
            }
        });

        if errors.is_empty() {
            Ok(())
        } else {
            Err(MergeError(errors))
        }
    }

    #[doc(hidden)]
    pub fn check_priorities(&self) -> Result<u32, (u32, u32)> {
        self.root.check_priorities()
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Router<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.root)
    }
}

/// A successful match, consisting of the registered value and the URL
/// parameters captured on the way to it.
#[derive(Debug)]
pub struct Match<'k, 'v, V> {
    /// The value stored for the matched route.
    pub value: V,
    /// The parameters bound while matching.
    pub params: Params<'k, 'v>,
}
