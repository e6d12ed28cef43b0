//! String interning for the high-repetition split fields (§3 C3): `memo`,
//! `action`, `num`/`description`. Interning lets `TransEqual`-style
//! comparisons (§9) compare handles instead of bytes, the same shortcut
//! `commodities.rs`'s `Commodity(Rc<RefCell<..>>)` takes for identity
//! comparison rather than string comparison.

use std::collections::HashMap;

/// A handle into a `StringInterner`. Two handles are equal iff they were
/// interned from equal strings in the same `StringInterner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternedStr(u32);

#[derive(Debug, Default)]
pub struct StringInterner {
    strings: Vec<String>,
    lookup: HashMap<String, InternedStr>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> InternedStr {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        let id = InternedStr(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.lookup.insert(s.to_string(), id);
        id
    }

    pub fn resolve(&self, id: InternedStr) -> &str {
        self.strings
            .get(id.0 as usize)
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_string_same_handle() {
        let mut interner = StringInterner::new();
        let a = interner.intern("Deposit");
        let b = interner.intern("Deposit");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_strings_different_handles() {
        let mut interner = StringInterner::new();
        let a = interner.intern("Deposit");
        let b = interner.intern("Withdrawal");
        assert_ne!(a, b);
    }

    #[test]
    fn test_resolve_round_trip() {
        let mut interner = StringInterner::new();
        let id = interner.intern("rent");
        assert_eq!(interner.resolve(id), "rent");
    }
}
