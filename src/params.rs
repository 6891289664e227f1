use std::ops::Index;
use std::sync::Arc;
use std::{fmt, slice};

/// A single URL parameter, consisting of a key and a value.
///
/// The key is shared with the tree node that declared it, the value buffer
/// is kept across requests so a pooled [`Params`] stops allocating once warm.
#[derive(Clone)]
struct Param {
    key: Arc<str>,
    value: String,
}

/// The parameters captured by a route match.
///
/// Parameters are stored in the order they appear in the route pattern, so
/// reading them by index is safe.
///
/// ```rust
/// use muxtree::Node;
///
/// let mut tree = Node::new();
/// tree.insert("/users/:id/files/*path", "files").unwrap();
///
/// let matched = tree.at("/users/1/files/a/b.txt").unwrap();
/// assert_eq!(matched.params.get("id"), Some("1"));
/// assert_eq!(&matched.params[1], "a/b.txt");
///
/// for (key, value) in matched.params.iter() {
///     println!("{} = {}", key, value);
/// }
/// ```
#[derive(Clone, Default)]
pub struct Params {
    slots: Vec<Param>,
    len: usize,
}

impl Params {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Params {
            slots: Vec::with_capacity(capacity),
            len: 0,
        }
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if there are no parameters in the list.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the value of the first parameter registered under the given key.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Returns an iterator over the parameters in the list.
    pub fn iter(&self) -> ParamsIter<'_> {
        ParamsIter {
            inner: self.slots[..self.len].iter(),
        }
    }

    /// Appends a parameter, reusing a previously allocated slot if one exists.
    pub(crate) fn push(&mut self, key: &Arc<str>, value: &[u8]) {
        // values are always cut at ASCII boundaries of a `&str`
        let value = String::from_utf8_lossy(value);

        match self.slots.get_mut(self.len) {
            Some(slot) => {
                if !Arc::ptr_eq(&slot.key, key) {
                    slot.key = Arc::clone(key);
                }
                slot.value.clear();
                slot.value.push_str(&value);
            }
            None => self.slots.push(Param {
                key: Arc::clone(key),
                value: value.into_owned(),
            }),
        }

        self.len += 1;
    }

    /// Empties the list while keeping every slot for reuse.
    pub(crate) fn clear(&mut self) {
        for slot in &mut self.slots[..self.len] {
            slot.value.clear();
        }
        self.len = 0;
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }
}

impl PartialEq for Params {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for Params {}

impl Index<usize> for Params {
    type Output = str;

    fn index(&self, i: usize) -> &Self::Output {
        self.slots[..self.len][i].value.as_str()
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'p> IntoIterator for &'p Params {
    type Item = (&'p str, &'p str);
    type IntoIter = ParamsIter<'p>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the keys and values of a route's [parameters](crate::Params).
pub struct ParamsIter<'p> {
    inner: slice::Iter<'p, Param>,
}

impl<'p> Iterator for ParamsIter<'p> {
    type Item = (&'p str, &'p str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|p| (&*p.key, p.value.as_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ParamsIter<'_> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}
