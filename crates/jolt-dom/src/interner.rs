//! String Interner - Deduplicate names to save memory
//!
//! Tag names ("div", "input") and attribute names ("id", "value") repeat on
//! every render, so they are stored once per tree and referenced by ID.

use std::collections::HashMap;

/// Interned string ID - just 4 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct InternedString(pub u32);

impl InternedString {
    /// Empty string (also the "no namespace" marker)
    pub const EMPTY: InternedString = InternedString(0);

    /// Whether this is the empty string
    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

/// String interner backed by a single contiguous buffer
#[derive(Debug)]
pub struct StringInterner {
    /// All strings concatenated
    buffer: String,
    /// Map from string content to ID
    map: HashMap<Box<str>, u32>,
    /// (start, len) spans into `buffer` for each ID
    spans: Vec<(u32, u32)>,
}

impl StringInterner {
    /// Create a new interner with common markup names pre-interned
    pub fn new() -> Self {
        let mut interner = Self {
            buffer: String::with_capacity(1024),
            map: HashMap::with_capacity(128),
            spans: Vec::with_capacity(128),
        };

        // Index 0 is always the empty string
        interner.intern("");

        const COMMON_NAMES: &[&str] = &[
            crate::HTML_NAMESPACE,
            "html", "head", "body", "div", "span", "p", "a", "ul", "ol", "li",
            "h1", "h2", "h3", "button", "form", "label", "input", "select",
            "option", "textarea", "template", "slot", "style",
            "id", "class", "style", "type", "name", "value", "checked",
            "selected", "disabled", "href", "src", "title",
        ];

        for name in COMMON_NAMES {
            interner.intern(name);
        }

        interner
    }

    /// Intern a string, returning its ID
    pub fn intern(&mut self, s: &str) -> InternedString {
        if let Some(&id) = self.map.get(s) {
            return InternedString(id);
        }

        let id = self.spans.len() as u32;
        let start = self.buffer.len() as u32;
        self.buffer.push_str(s);
        self.spans.push((start, s.len() as u32));
        self.map.insert(s.into(), id);

        InternedString(id)
    }

    /// Look up a string without interning it
    pub fn lookup(&self, s: &str) -> Option<InternedString> {
        self.map.get(s).map(|&id| InternedString(id))
    }

    /// Get the string for an interned ID
    #[inline]
    pub fn get(&self, id: InternedString) -> &str {
        match self.spans.get(id.0 as usize) {
            Some(&(start, len)) => &self.buffer[start as usize..(start + len) as usize],
            None => "",
        }
    }

    /// Number of interned strings
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Approximate memory used by the interner
    pub fn memory_usage(&self) -> usize {
        self.buffer.capacity()
            + self.map.capacity() * (std::mem::size_of::<Box<str>>() + std::mem::size_of::<u32>())
            + self.spans.capacity() * std::mem::size_of::<(u32, u32)>()
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut interner = StringInterner::new();
        let a = interner.intern("my-counter");
        let b = interner.intern("my-counter");
        assert_eq!(a, b);
    }

    #[test]
    fn test_get_string() {
        let mut interner = StringInterner::new();
        let id = interner.intern("data-key");
        assert_eq!(interner.get(id), "data-key");
        assert_eq!(interner.get(InternedString::EMPTY), "");
    }

    #[test]
    fn test_lookup_does_not_intern() {
        let interner = StringInterner::new();
        let before = interner.len();
        assert!(interner.lookup("never-seen").is_none());
        assert_eq!(interner.len(), before);
        assert!(interner.lookup("div").is_some());
    }
}
