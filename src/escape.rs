use std::ops::{Deref, Range};

/// An unescaped route, with the positions of any characters that were
/// escaped ('{{' or '}}') recorded alongside the collapsed bytes.
///
/// The escape list is strictly increasing and always in bounds; every
/// mutation below maintains the buffer and the list together.
///
/// Note that this type dereferences to `[u8]`.
#[derive(Clone, Default, PartialEq, Eq)]
pub(crate) struct UnescapedRoute {
    inner: Vec<u8>,
    escaped: Vec<usize>,
}

impl UnescapedRoute {
    /// Unescapes escaped brackets ('{{' or '}}') in a route.
    pub fn new(inner: Vec<u8>) -> UnescapedRoute {
        let mut route = UnescapedRoute {
            inner,
            escaped: Vec::new(),
        };

        let mut i = 0;
        while i < route.inner.len() {
            let c = route.inner[i];
            if (c == b'{' || c == b'}') && route.inner.get(i + 1) == Some(&c) {
                route.splice(i..i + 2, &[c]);
                route.escaped.push(i);
            }

            i += 1;
        }

        route
    }

    /// Replaces the bytes in the given range.
    ///
    /// Escape positions inside the range are dropped, and positions past it
    /// shift by the difference in length.
    pub fn splice(&mut self, range: Range<usize>, replacement: &[u8]) {
        let offset = replacement.len() as isize - range.len() as isize;
        self.escaped.retain(|&i| !range.contains(&i));
        for i in &mut self.escaped {
            if *i >= range.end {
                *i = i.checked_add_signed(offset).unwrap();
            }
        }

        self.inner.splice(range, replacement.iter().copied());
    }

    /// Truncates the route to the given length.
    pub fn truncate(&mut self, to: usize) {
        self.escaped.retain(|&i| i < to);
        self.inner.truncate(to);
    }

    /// Appends another route to the end of this one.
    pub fn append(&mut self, other: &UnescapedRoute) {
        for &i in &other.escaped {
            self.escaped.push(self.inner.len() + i);
        }

        self.inner.extend_from_slice(&other.inner);
    }

    /// Returns true if the character at the given index was escaped.
    pub fn is_escaped(&self, i: usize) -> bool {
        self.escaped.binary_search(&i).is_ok()
    }

    /// Returns a reference to this route.
    pub fn as_ref(&self) -> UnescapedRef<'_> {
        UnescapedRef {
            inner: &self.inner,
            escaped: &self.escaped,
            offset: 0,
        }
    }

    /// Restores the original spelling of the route, re-doubling the bracket
    /// at every escape position.
    pub fn to_escaped(&self) -> Vec<u8> {
        let mut escaped = Vec::with_capacity(self.inner.len() + self.escaped.len());
        for (i, &c) in self.inner.iter().enumerate() {
            escaped.push(c);
            if self.is_escaped(i) {
                escaped.push(c);
            }
        }

        escaped
    }

    /// Returns a reference to the inner slice.
    pub fn inner(&self) -> &[u8] {
        &self.inner
    }
}

impl Deref for UnescapedRoute {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for UnescapedRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.inner))
    }
}

/// A borrowed view of an [`UnescapedRoute`].
///
/// The view keeps the full escape list of the route it was sliced from and
/// maps indices back through `offset`, avoiding any copying.
#[derive(Copy, Clone)]
pub(crate) struct UnescapedRef<'a> {
    inner: &'a [u8],
    escaped: &'a [usize],
    offset: usize,
}

impl<'a> UnescapedRef<'a> {
    /// Converts this view into an owned route.
    pub fn to_owned(self) -> UnescapedRoute {
        let mut escaped = Vec::new();
        for &i in self.escaped {
            if i >= self.offset && i - self.offset < self.inner.len() {
                escaped.push(i - self.offset);
            }
        }

        UnescapedRoute {
            inner: self.inner.to_owned(),
            escaped,
        }
    }

    /// Returns true if the character at the given index was escaped.
    pub fn is_escaped(&self, i: usize) -> bool {
        self.escaped.binary_search(&(i + self.offset)).is_ok()
    }

    /// Slices the view with `start..`.
    pub fn slice_off(&self, start: usize) -> UnescapedRef<'a> {
        UnescapedRef {
            inner: &self.inner[start..],
            escaped: self.escaped,
            offset: self.offset + start,
        }
    }

    /// Slices the view with `..end`.
    pub fn slice_until(&self, end: usize) -> UnescapedRef<'a> {
        UnescapedRef {
            inner: &self.inner[..end],
            escaped: self.escaped,
            offset: self.offset,
        }
    }
}

impl PartialEq for UnescapedRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.len() == other.inner.len()
            && (0..self.inner.len())
                .all(|i| self.inner[i] == other.inner[i] && self.is_escaped(i) == other.is_escaped(i))
    }
}

impl Deref for UnescapedRef<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_escape_invariant(route: &UnescapedRoute) {
        assert!(
            route.escaped.windows(2).all(|w| w[0] < w[1]),
            "escape indices out of order: {:?}",
            route.escaped
        );
        assert!(route.escaped.iter().all(|&i| i < route.inner.len()));
    }

    #[test]
    fn unescape() {
        let route = UnescapedRoute::new(b"/foo/{{bar}}/{baz}".to_vec());
        assert_eq!(route.inner(), b"/foo/{bar}/{baz}");
        assert_eq!(route.escaped, vec![5, 9]);
        assert_escape_invariant(&route);

        assert!(route.is_escaped(5));
        assert!(route.is_escaped(9));
        assert!(!route.is_escaped(10));
    }

    #[test]
    fn unescape_consecutive() {
        let route = UnescapedRoute::new(b"{{{x}".to_vec());
        assert_eq!(route.inner(), b"{{x}");
        assert_eq!(route.escaped, vec![0]);

        let route = UnescapedRoute::new(b"{{}}{{}}".to_vec());
        assert_eq!(route.inner(), b"{}{}");
        assert_eq!(route.escaped, vec![0, 1, 2, 3]);
        assert_escape_invariant(&route);
    }

    #[test]
    fn splice() {
        let mut route = UnescapedRoute::new(b"/a/{{b}}/c".to_vec());
        assert_eq!(route.inner(), b"/a/{b}/c");
        assert_eq!(route.escaped, vec![3, 5]);

        // a longer replacement shifts the escapes right
        route.splice(0..2, b"/hello");
        assert_eq!(route.inner(), b"/hello/{b}/c");
        assert_eq!(route.escaped, vec![7, 9]);
        assert_escape_invariant(&route);

        // splicing over an escape drops it
        route.splice(7..9, b"x");
        assert_eq!(route.inner(), b"/hello/x}/c");
        assert_eq!(route.escaped, vec![8]);
        assert_escape_invariant(&route);
    }

    #[test]
    fn truncate() {
        let mut route = UnescapedRoute::new(b"/{{a}}/{{b}}".to_vec());
        assert_eq!(route.inner(), b"/{a}/{b}");
        assert_eq!(route.escaped, vec![1, 3, 5, 7]);

        route.truncate(4);
        assert_eq!(route.inner(), b"/{a}");
        assert_eq!(route.escaped, vec![1, 3]);
        assert_escape_invariant(&route);
    }

    #[test]
    fn append() {
        let mut route = UnescapedRoute::new(b"/x/{{y}}".to_vec());
        let other = UnescapedRoute::new(b"/{{z}}".to_vec());
        route.append(&other);

        assert_eq!(route.inner(), b"/x/{y}/{z}");
        assert_eq!(route.escaped, vec![3, 5, 7, 9]);
        assert_escape_invariant(&route);
    }

    #[test]
    fn slicing() {
        let route = UnescapedRoute::new(b"/a/{{b}}/c".to_vec());
        let sliced = route.as_ref().slice_off(3);

        assert_eq!(&sliced[..], b"{b}/c");
        assert!(sliced.is_escaped(0));
        assert!(!sliced.is_escaped(1));
        assert!(sliced.is_escaped(2));

        let owned = sliced.to_owned();
        assert_eq!(owned.escaped, vec![0, 2]);
        assert_escape_invariant(&owned);

        let head = route.as_ref().slice_until(4);
        assert!(head.is_escaped(3));
        assert_eq!(head.to_owned().escaped, vec![3]);
    }

    #[test]
    fn escape_round_trip() {
        for pattern in [
            &b"/users/{id}"[..],
            b"/lit/{{a}}",
            b"}}yy{{}}{{}}y{{",
            b"/xxx/{x{{}}y}",
        ] {
            let route = UnescapedRoute::new(pattern.to_vec());
            assert_eq!(route.to_escaped(), pattern);
        }
    }

    #[test]
    fn view_equality() {
        let literal = UnescapedRoute::new(b"/{{a}}".to_vec());
        let param = UnescapedRoute::new(b"/{a}".to_vec());

        assert_eq!(literal.inner(), param.inner());
        assert!(literal.as_ref() != param.as_ref());
        assert!(literal.as_ref() == literal.clone().as_ref());
    }
}
