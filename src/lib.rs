#![deny(rust_2018_idioms)]

//! A high performance URL route recognizer.
//!
//! ```rust
//! use waymark::Router;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut router = Router::new();
//! router.insert("/home", "Welcome!")?;
//! router.insert("/users/{id}", "A User")?;
//!
//! let matched = router.at("/users/978")?;
//! assert_eq!(matched.params.get("id"), Some("978"));
//! assert_eq!(*matched.value, "A User");
//! # Ok(())
//! # }
//! ```
//!
//! `waymark` relies on a tree structure that makes heavy use of *common
//! prefixes*, it is effectively a [radix
//! tree](https://en.wikipedia.org/wiki/Radix_tree). This makes lookups
//! extremely fast: matching a path takes time roughly proportional to its
//! length, independent of the number of registered routes.
//!
//! ## Parameters
//!
//! Routes can contain two types of wildcards:
//!
//! ```text
//! Syntax     Type
//! {name}     named parameter
//! {*name}    catch-all parameter
//! ```
//!
//! Named parameters are dynamic path segments. They match anything until
//! the next `/` or the end of the path:
//!
//! ```text
//! Route: /user/{user}
//!
//!  /user/gordon           match: user = "gordon"
//!  /user/you              match: user = "you"
//!  /user/gordon/profile   no match
//!  /user/                 no match
//! ```
//!
//! A named parameter may be followed by a literal *suffix* within the same
//! segment. The segment has to end with the suffix, and the parameter binds
//! the rest:
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut router = waymark::Router::new();
//! router.insert("/files/{name}.txt", true)?;
//!
//! let matched = router.at("/files/readme.txt")?;
//! assert_eq!(matched.params.get("name"), Some("readme"));
//! assert!(router.at("/files/readme.md").is_err());
//! # Ok(())
//! # }
//! ```
//!
//! Catch-all parameters match everything after a `/`, including nested
//! slashes, and are therefore only allowed at the end of a route:
//!
//! ```text
//! Route: /static/{*path}
//!
//!  /static/css/app.css   match: path = "css/app.css"
//!  /static/favicon.ico   match: path = "favicon.ico"
//!  /static/              no match
//!  /static               no match
//! ```
//!
//! Static routes take precedence over parameters, and parameters take
//! precedence over catch-alls: the matcher descends into the most specific
//! branch first and backtracks through the skipped alternatives if it
//! fails.
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut router = waymark::Router::new();
//! router.insert("/a/b", "static")?;
//! router.insert("/a/{x}", "param")?;
//!
//! assert_eq!(*router.at("/a/b")?.value, "static");
//! assert_eq!(*router.at("/a/c")?.value, "param");
//! # Ok(())
//! # }
//! ```
//!
//! To match a literal `{` or `}`, escape it by doubling: `{{` and `}}`.
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut router = waymark::Router::new();
//! router.insert("/lit/{{a}}", true)?;
//!
//! // matches the path "/lit/{a}" literally, no parameters are bound
//! assert!(router.at("/lit/{a}")?.params.is_empty());
//! assert!(router.at("/lit/a").is_err());
//! # Ok(())
//! # }
//! ```
//!
//! ## How does it work?
//!
//! The router relies on a compressing dynamic trie (radix tree). Nodes with
//! a common prefix share a parent, so the routing problem shrinks with
//! every byte matched. Here is what the tree for a handful of routes could
//! look like:
//!
//! ```text
//! Priority   Path             Value
//! 9          \                *<1>
//! 3          ├s               None
//! 2          |├earch\         *<2>
//! 1          |└upport\        *<3>
//! 2          ├blog\           *<4>
//! 1          |    └{post}     None
//! 1          |          └\    *<5>
//! 2          ├about-us\       *<6>
//! 1          |        └team\  *<7>
//! 1          └contact\        *<8>
//! ```
//!
//! Every `*<num>` represents a stored value. Following a path from the root
//! to a leaf spells out the complete route, e.g. `/blog/{post}/`.
//!
//! Because URL paths are hierarchical and draw from a limited set of bytes,
//! there are lots of common prefixes. On each level, the children are
//! ordered by priority, where the priority is just the number of values
//! registered in that subtree. This helps in two ways:
//!
//! 1. Nodes that are part of the most routing paths are evaluated first.
//! 2. It acts as a cost compensation: the longest reachable path is always
//!    evaluated first.

mod error;
mod escape;
mod params;
mod router;
mod tree;

pub use error::{InsertError, MatchError, MergeError};
pub use params::{Params, ParamsIter};
pub use router::{Match, Router};

#[cfg(doctest)]
mod test_readme {
    macro_rules! doc_comment {
        ($x:expr) => {
            #[doc = $x]
            extern "C" {}
        };
    }

    doc_comment!(include_str!("../README.md"));
}
