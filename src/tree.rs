use crate::escape::{UnescapedRef, UnescapedRoute};
use crate::error::{InsertError, MatchError};
use crate::params::{Params, MAX_PARAMS};

use std::cell::UnsafeCell;
use std::cmp::min;
use std::fmt;
use std::mem;
use std::ops::Range;

/// The types of nodes the tree can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// A literal prefix, e.g. `/users/`.
    Static,
    /// A route parameter, e.g. `{id}`, optionally followed by a literal
    /// suffix within the same segment, e.g. `{name}.txt`.
    Param,
    /// A catch-all parameter, e.g. `{*filepath}`.
    CatchAll,
}

/// A node in a radix tree ordered by priority.
///
/// Priority is the number of routes stored in the subtree rooted at the
/// node. Static children are addressed by their first byte through
/// `indices`, sorted so the most populated branches are tried first. The
/// wildcard child, if any, is always the last child and is not listed in
/// `indices`.
pub(crate) struct Node<T> {
    priority: u32,
    wild_child: bool,
    indices: Vec<u8>,
    pub(crate) kind: NodeKind,
    pub(crate) prefix: UnescapedRoute,
    pub(crate) value: Option<UnsafeCell<T>>,
    pub(crate) children: Vec<Node<T>>,
}

// SAFETY: we expose `&mut T` through `&UnsafeCell<T>` only behind
// `&mut Node<T>`, the usual rules apply
unsafe impl<T: Send> Send for Node<T> {}
unsafe impl<T: Sync> Sync for Node<T> {}

impl<T> Node<T> {
    pub(crate) fn new() -> Self {
        Self {
            priority: 0,
            wild_child: false,
            indices: Vec::new(),
            kind: NodeKind::Static,
            prefix: UnescapedRoute::default(),
            value: None,
            children: Vec::new(),
        }
    }
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Insertion.
impl<T> Node<T> {
    /// Inserts the route into the subtree rooted at this node.
    ///
    /// `remaining` is the unconsumed tail of `route`, which must have been
    /// validated with [`validate`]. Priorities are only incremented on the
    /// way out of a successful insertion, so a failed insert leaves every
    /// priority accurate.
    pub(crate) fn insert_at(
        &mut self,
        mut remaining: UnescapedRef<'_>,
        route: UnescapedRef<'_>,
        val: T,
    ) -> Result<(), InsertError> {
        // find the longest common prefix, comparing bytes and escape flags
        let len = min(remaining.len(), self.prefix.len());
        let common = (0..len)
            .find(|&i| {
                remaining[i] != self.prefix[i]
                    || remaining.is_escaped(i) != self.prefix.is_escaped(i)
            })
            .unwrap_or(len);

        // the new route diverges inside this node's prefix, split the node
        if common < self.prefix.len() {
            self.split(common);
        }

        // the route ends at this node
        if common == remaining.len() {
            if self.value.is_some() {
                return Err(InsertError::conflict(
                    route,
                    remaining.slice_off(common),
                    self,
                ));
            }

            self.value = Some(UnsafeCell::new(val));
            self.priority += 1;
            return Ok(());
        }

        remaining = remaining.slice_off(common);

        // an unescaped '{' always starts a wildcard
        if remaining[0] == b'{' && !remaining.is_escaped(0) {
            return self.insert_wild(remaining, route, val);
        }

        // descend into the static child sharing the next byte
        if let Some(i) = self.indices.iter().position(|&c| c == remaining[0]) {
            let result = self.children[i].insert_at(remaining, route, val);
            if result.is_ok() {
                self.priority += 1;
                self.sort_child(i);
            }
            return result;
        }

        // a catch-all child admits no siblings
        if self.wild_child && self.children.last().unwrap().kind == NodeKind::CatchAll {
            return Err(InsertError::conflict(
                route,
                remaining,
                self.children.last().unwrap(),
            ));
        }

        // create a new static branch
        self.indices.push(remaining[0]);
        let i = self.add_child(Node::new());
        self.children[i].insert_route(remaining, val);
        self.priority += 1;
        self.sort_child(i);
        Ok(())
    }

    /// Inserts a route whose next token is a wildcard.
    fn insert_wild(
        &mut self,
        remaining: UnescapedRef<'_>,
        route: UnescapedRef<'_>,
        val: T,
    ) -> Result<(), InsertError> {
        let catchall = remaining[1] == b'*';

        if self.wild_child {
            let i = self.children.len() - 1;

            // the wildcard slot must agree with the existing wildcard
            // verbatim: a differing name, suffix or kind is a conflict
            let token = if catchall {
                remaining
            } else {
                remaining.slice_until(param_token_end(remaining))
            };

            if self.children[i].kind == NodeKind::CatchAll
                || token != self.children[i].prefix.as_ref()
            {
                return Err(InsertError::conflict(route, remaining, &self.children[i]));
            }

            let result = self.children[i].insert_at(remaining, route, val);
            if result.is_ok() {
                self.priority += 1;
            }
            return result;
        }

        // attaching a catch-all requires the node to have no other children
        if catchall && !self.children.is_empty() {
            return Err(InsertError::conflict(route, remaining, self));
        }

        self.insert_route(remaining, val);
        Ok(())
    }

    /// Builds a fresh chain of nodes for `remaining` below this node and
    /// stores the value at its end.
    ///
    /// Infallible: conflicts can only arise against existing children, and
    /// the route itself was validated upfront.
    pub(crate) fn insert_route(&mut self, mut remaining: UnescapedRef<'_>, val: T) {
        let mut current = self;

        loop {
            current.priority += 1;

            // the route was validated upfront
            let wildcard = match find_wildcard(remaining).unwrap() {
                Some(wildcard) => wildcard,
                // no wildcard left, this node holds the value
                None => {
                    current.prefix = remaining.to_owned();
                    current.value = Some(UnsafeCell::new(val));
                    return;
                }
            };

            // attach the catch-all leaf and finish
            if remaining[wildcard.start + 1] == b'*' {
                if wildcard.start > 0 {
                    current.prefix = remaining.slice_until(wildcard.start).to_owned();
                }

                let child = Node {
                    prefix: remaining.slice_off(wildcard.start).to_owned(),
                    kind: NodeKind::CatchAll,
                    value: Some(UnsafeCell::new(val)),
                    priority: 1,
                    ..Node::new()
                };

                current.wild_child = true;
                current.children.push(child);
                return;
            }

            // the parameter token spans the wildcard plus any literal
            // suffix within the segment
            let token_end = match remaining[wildcard.end..].iter().position(|&c| c == b'/') {
                Some(i) => wildcard.end + i,
                None => remaining.len(),
            };

            if wildcard.start > 0 {
                current.prefix = remaining.slice_until(wildcard.start).to_owned();
            }

            let child = Node {
                prefix: remaining
                    .slice_until(token_end)
                    .slice_off(wildcard.start)
                    .to_owned(),
                kind: NodeKind::Param,
                ..Node::new()
            };

            current.wild_child = true;
            current.children.push(child);
            current = current.children.last_mut().unwrap();
            current.priority += 1;

            remaining = remaining.slice_off(token_end);

            // the route ends at the parameter
            if remaining.is_empty() {
                current.value = Some(UnsafeCell::new(val));
                return;
            }

            // the rest of the route continues in a new segment
            current.indices.push(b'/');
            current.children.push(Node::new());
            current = current.children.last_mut().unwrap();
        }
    }

    /// Splits the node at the given position in its prefix. The tail of the
    /// prefix, along with the value and children, moves into a new child.
    fn split(&mut self, at: usize) {
        let suffix = self.prefix.as_ref().slice_off(at).to_owned();
        let first = suffix[0];

        let child = Node {
            prefix: suffix,
            priority: self.priority,
            value: self.value.take(),
            kind: self.kind,
            indices: mem::take(&mut self.indices),
            children: mem::take(&mut self.children),
            wild_child: mem::replace(&mut self.wild_child, false),
        };

        self.prefix = self.prefix.as_ref().slice_until(at).to_owned();
        self.kind = NodeKind::Static;
        self.indices = vec![first];
        self.children = vec![child];
    }

    /// Inserts a static child, keeping the wildcard child last. Returns the
    /// index of the new child.
    fn add_child(&mut self, child: Node<T>) -> usize {
        if self.wild_child {
            let i = self.children.len() - 1;
            self.children.insert(i, child);
            i
        } else {
            self.children.push(child);
            self.children.len() - 1
        }
    }

    /// Restores the descending priority order of the static children after
    /// the child at `i` gained a route. Stable for equal priorities.
    fn sort_child(&mut self, mut i: usize) {
        while i > 0 && self.children[i - 1].priority < self.children[i].priority {
            self.children.swap(i - 1, i);
            self.indices.swap(i - 1, i);
            i -= 1;
        }
    }
}

/// Removal.
impl<T> Node<T> {
    /// Removes the route matching the pattern verbatim, returning its value.
    ///
    /// The tree is left untouched when the pattern is not present. The
    /// parent of every node on a successful removal path prunes detached
    /// children and re-merges single-child static chains on the way out.
    pub(crate) fn remove(&mut self, remaining: UnescapedRef<'_>) -> Option<T> {
        // the node's prefix must be fully present, bytes and escapes alike
        if remaining.len() < self.prefix.len() {
            return None;
        }

        let matches = (0..self.prefix.len()).all(|i| {
            remaining[i] == self.prefix[i] && remaining.is_escaped(i) == self.prefix.is_escaped(i)
        });
        if !matches {
            return None;
        }

        if remaining.len() == self.prefix.len() {
            let value = self.value.take()?;
            self.priority -= 1;
            self.try_merge();
            return Some(value.into_inner());
        }

        let remaining = remaining.slice_off(self.prefix.len());

        // statics first, then the wildcard slot
        if let Some(i) = self.indices.iter().position(|&c| c == remaining[0]) {
            if let Some(value) = self.children[i].remove(remaining) {
                self.priority -= 1;
                self.prune_child(i);
                return Some(value);
            }
        }

        if self.wild_child {
            let i = self.children.len() - 1;
            if let Some(value) = self.children[i].remove(remaining) {
                self.priority -= 1;
                self.prune_child(i);
                return Some(value);
            }
        }

        None
    }

    /// Drops the child at `i` if it no longer holds a route, then re-merges
    /// this node with a lone static child.
    fn prune_child(&mut self, i: usize) {
        if self.children[i].value.is_none() && self.children[i].children.is_empty() {
            self.children.remove(i);
            if i < self.indices.len() {
                self.indices.remove(i);
            } else {
                self.wild_child = false;
            }
        }

        self.try_merge();
    }

    /// Absorbs a lone static child into this node's prefix.
    pub(crate) fn try_merge(&mut self) {
        if self.kind == NodeKind::Static
            && self.value.is_none()
            && !self.wild_child
            && self.children.len() == 1
        {
            let child = self.children.remove(0);
            self.prefix.append(&child.prefix);
            self.value = child.value;
            self.indices = child.indices;
            self.children = child.children;
            self.wild_child = child.wild_child;
        }
    }
}

/// A wildcard branch that was bypassed in favor of a static child, kept for
/// backtracking.
struct Skipped<'node, 'path, T> {
    path: &'path [u8],
    node: &'node Node<T>,
    params: usize,
}

#[rustfmt::skip]
macro_rules! backtracker {
    ($skipped_nodes:ident, $path:ident, $current:ident, $params:ident, $backtracking:ident, $walk:lifetime) => {
        macro_rules! try_backtrack {
            () => {
                // try backtracking to any wildcard nodes that we skipped
                // while descending the tree
                while let Some(skipped) = $skipped_nodes.pop() {
                    if skipped.path.ends_with($path) {
                        $path = skipped.path;
                        $current = skipped.node;
                        $params.truncate(skipped.params);
                        $backtracking = true;
                        continue $walk;
                    }
                }
            };
        }
    };
}

/// Matching.
impl<T> Node<T> {
    /// Matches the path against the subtree rooted at this node, binding
    /// parameters as it descends.
    pub(crate) fn at<'node, 'path>(
        &'node self,
        full_path: &'path [u8],
    ) -> Result<(&'node UnsafeCell<T>, Params<'node, 'path>), MatchError> {
        let mut current = self;
        let mut path = full_path;
        let mut backtracking = false;
        let mut params = Params::new();
        let mut skipped_nodes: Vec<Skipped<'node, 'path, T>> = Vec::new();

        'walk: loop {
            backtracker!(skipped_nodes, path, current, params, backtracking, 'walk);

            // the path is longer than this node's prefix, expect a child
            if path.len() > current.prefix.len() {
                let (prefix, rest) = path.split_at(current.prefix.len());

                if prefix == current.prefix.inner() {
                    let consumed = path;
                    path = rest;

                    // try a matching static child first, unless we are
                    // backtracking and already went down that branch
                    if !backtracking {
                        if let Some(i) = current.indices.iter().position(|&c| c == path[0]) {
                            // remember the wildcard alternative in case the
                            // static branch fails
                            if current.wild_child {
                                skipped_nodes.push(Skipped {
                                    path: consumed,
                                    node: current,
                                    params: params.len(),
                                });
                            }

                            current = &current.children[i];
                            continue 'walk;
                        }
                    }

                    if !current.wild_child {
                        try_backtrack!();
                        return Err(MatchError::NotFound);
                    }

                    // the wildcard child is always the last child
                    let wild = current.children.last().unwrap();
                    match wild.kind {
                        NodeKind::Param => {
                            // the parameter binds until the next `/` or the
                            // end of the path, minus the literal suffix
                            let boundary =
                                path.iter().position(|&c| c == b'/').unwrap_or(path.len());
                            let suffix = wild.param_suffix();

                            if boundary <= suffix.len() || !path[..boundary].ends_with(suffix) {
                                try_backtrack!();
                                return Err(MatchError::NotFound);
                            }

                            let value = &path[..boundary - suffix.len()];

                            // this is the final segment of the path
                            if boundary == path.len() {
                                if let Some(ref cell) = wild.value {
                                    params.push(wild.param_name(), value);
                                    return Ok((cell, params));
                                }

                                try_backtrack!();
                                return Err(MatchError::NotFound);
                            }

                            // continue with the child holding the rest of
                            // the route
                            if let [child] = wild.children.as_slice() {
                                params.push(wild.param_name(), value);
                                path = &path[boundary..];
                                current = child;
                                backtracking = false;
                                continue 'walk;
                            }

                            try_backtrack!();
                            return Err(MatchError::NotFound);
                        }
                        NodeKind::CatchAll => {
                            // binds everything that remains; `path` is
                            // non-empty here and the `/` before the
                            // catch-all stays with the parent prefix
                            if let Some(ref cell) = wild.value {
                                params.push(wild.catchall_name(), path);
                                return Ok((cell, params));
                            }

                            try_backtrack!();
                            return Err(MatchError::NotFound);
                        }
                        NodeKind::Static => unreachable!("wildcard child has a static kind"),
                    }
                }

                // the prefix does not match
                try_backtrack!();
                return Err(MatchError::NotFound);
            }

            // we should have reached the node containing the value
            if path == current.prefix.inner() {
                if let Some(ref cell) = current.value {
                    return Ok((cell, params));
                }
            }

            // a catch-all never binds the empty path, nothing left to try
            try_backtrack!();
            return Err(MatchError::NotFound);
        }
    }
}

/// Draining and introspection.
impl<T> Node<T> {
    /// Consumes the subtree, reporting every stored route in top-down,
    /// priority order. `route` carries the prefix accumulated so far.
    pub(crate) fn drain(self, route: &mut UnescapedRoute, f: &mut impl FnMut(String, T)) {
        let len = route.len();
        route.append(&self.prefix);

        if let Some(value) = self.value {
            f(
                String::from_utf8(route.to_escaped()).unwrap(),
                value.into_inner(),
            );
        }

        for child in self.children {
            child.drain(route, f);
        }

        route.truncate(len);
    }

    /// Checks that the priority of every node in the subtree equals the
    /// number of routes below it, returning `(got, expected)` on the first
    /// mismatch.
    pub(crate) fn check_priorities(&self) -> Result<u32, (u32, u32)> {
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

/// Accessors for the wildcard name stored in a node's prefix.
impl<T> Node<T> {
    fn param_name(&self) -> &[u8] {
        &self.prefix[1..self.param_name_end()]
    }

    fn param_suffix(&self) -> &[u8] {
        &self.prefix[self.param_name_end() + 1..]
    }

    fn param_name_end(&self) -> usize {
        (1..self.prefix.len())
            .find(|&i| self.prefix[i] == b'}' && !self.prefix.is_escaped(i))
            .unwrap()
    }

    fn catchall_name(&self) -> &[u8] {
        &self.prefix[2..self.prefix.len() - 1]
    }
}

impl<T: Clone> Clone for Node<T> {
    fn clone(&self) -> Self {
        let value = self.value.as_ref().map(|value| {
            // SAFETY: `&mut T` is only exposed behind `&mut Node<T>`, and we
            // hold a shared reference
            let value = unsafe { &*value.get() };
            UnsafeCell::new(value.clone())
        });

        Self {
            priority: self.priority,
            wild_child: self.wild_child,
            indices: self.indices.clone(),
            kind: self.kind,
            prefix: self.prefix.clone(),
            value,
            children: self.children.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // SAFETY: `&mut T` is only exposed behind `&mut Node<T>`, and we
        // hold a shared reference
        let value = self.value.as_ref().map(|value| unsafe { &*value.get() });

        let mut fmt = f.debug_struct("Node");
        fmt.field("prefix", &self.prefix);
        fmt.field("kind", &self.kind);
        fmt.field("priority", &self.priority);
        fmt.field("value", &value);
        fmt.field("children", &self.children);
        fmt.finish()
    }
}

/// The end of the parameter token beginning at `remaining[0]`: the wildcard
/// plus any literal suffix before the next `/`.
fn param_token_end(remaining: UnescapedRef<'_>) -> usize {
    let close = (1..remaining.len())
        .find(|&i| remaining[i] == b'}' && !remaining.is_escaped(i))
        .unwrap();

    match remaining[close + 1..].iter().position(|&c| c == b'/') {
        Some(i) => close + 1 + i,
        None => remaining.len(),
    }
}

/// Checks a whole route before any of it reaches the tree.
///
/// Beyond the per-wildcard checks in [`find_wildcard`], this enforces the
/// route-level rules: the total parameter bound, one wildcard per segment,
/// and catch-alls only as the final segment directly after a `/`.
pub(crate) fn validate(route: UnescapedRef<'_>) -> Result<(), InsertError> {
    if route.is_empty() {
        return Err(InsertError::InvalidParam);
    }

    let mut params = 0;
    let mut prev_end: Option<usize> = None;
    let mut rest = route;
    let mut offset = 0;

    while let Some(wildcard) = find_wildcard(rest)? {
        let start = offset + wildcard.start;
        let end = offset + wildcard.end;

        params += 1;
        if params > MAX_PARAMS {
            return Err(InsertError::TooManyParams);
        }

        // wildcards within one segment are not separable by the matcher
        if let Some(prev) = prev_end {
            if route[prev..start].iter().all(|&c| c != b'/') {
                return Err(InsertError::InvalidParamSegment);
            }
        }

        // a catch-all ends the route and directly follows a `/`
        if route[start + 1] == b'*'
            && (end != route.len() || start == 0 || route[start - 1] != b'/')
        {
            return Err(InsertError::InvalidCatchAll);
        }

        prev_end = Some(end);
        rest = rest.slice_off(wildcard.end);
        offset = end;
    }

    Ok(())
}

/// Searches for the next wildcard in the route, checking it for invalid
/// characters. Escaped brackets are skipped as literals, both outside a
/// wildcard and within a parameter name.
pub(crate) fn find_wildcard(route: UnescapedRef<'_>) -> Result<Option<Range<usize>>, InsertError> {
    let mut i = 0;
    while i < route.len() {
        if route.is_escaped(i) {
            i += 1;
            continue;
        }

        match route[i] {
            b'{' => {
                let start = i;
                let mut j = start + 1;
                while j < route.len() {
                    if route.is_escaped(j) {
                        j += 1;
                        continue;
                    }

                    match route[j] {
                        b'}' => {
                            let catchall = route[start + 1] == b'*';
                            let name_start = if catchall { start + 2 } else { start + 1 };

                            // `{}` and `{*}` have no name
                            if j == name_start {
                                return Err(InsertError::InvalidParam);
                            }

                            return Ok(Some(start..j + 1));
                        }
                        // `/` cannot appear in a parameter name, and `*` is
                        // only the leading catch-all marker
                        b'/' => return Err(InsertError::InvalidParam),
                        b'*' if j != start + 1 => return Err(InsertError::InvalidParam),
                        b'{' => return Err(InsertError::InvalidParam),
                        _ => {}
                    }

                    j += 1;
                }

                // unterminated wildcard
                return Err(InsertError::InvalidParam);
            }
            // stray bytes that only have meaning inside a wildcard
            b'}' | b'*' => return Err(InsertError::InvalidParam),
            _ => {}
        }

        i += 1;
    }

    Ok(None)
}
