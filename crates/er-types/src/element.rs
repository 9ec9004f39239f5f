use serde::{Deserialize, Serialize};

use crate::bits::{Bit, BitVector};
use crate::error::{TypeError, TypeResult};

/// Longest accepted element name, in characters.
pub const MAX_NAME_CHARS: usize = 100;

/// Validate an element name: 1 to 100 characters.
pub fn validate_name(name: &str) -> TypeResult<()> {
    if name.is_empty() {
        return Err(TypeError::InvalidName("name must not be empty".into()));
    }
    let chars = name.chars().count();
    if chars > MAX_NAME_CHARS {
        return Err(TypeError::InvalidName(format!(
            "name has {chars} characters (max {MAX_NAME_CHARS})"
        )));
    }
    Ok(())
}

/// A named entity owning exactly one [`BitVector`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    name: String,
    flags: BitVector,
}

impl Element {
    /// Create an element with all flags clear.
    pub fn create(name: impl Into<String>) -> TypeResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            flags: BitVector::new(),
        })
    }

    /// Create an element with the given flags.
    pub fn with_flags(name: impl Into<String>, flags: BitVector) -> TypeResult<Self> {
        let mut element = Self::create(name)?;
        element.flags = flags;
        Ok(element)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename, re-validating the new name. The old name is kept on failure.
    pub fn rename(&mut self, name: impl Into<String>) -> TypeResult<()> {
        let name = name.into();
        validate_name(&name)?;
        self.name = name;
        Ok(())
    }

    pub fn flags(&self) -> &BitVector {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut BitVector {
        &mut self.flags
    }

    /// Consume the element, returning its parts.
    pub fn into_parts(self) -> (String, BitVector) {
        (self.name, self.flags)
    }
}

/// Read-side projection of a stored element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementView {
    pub name: String,
    /// Set positions, ascending, truncated to the requested limit.
    pub bits: Vec<Bit>,
    /// Total number of set positions before truncation.
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_valid() {
        let e = Element::create("alpha").unwrap();
        assert_eq!(e.name(), "alpha");
        assert!(e.flags().is_empty());
    }

    #[test]
    fn name_bounds() {
        assert!(Element::create("").is_err());
        assert!(Element::create("x".repeat(100)).is_ok());
        let err = Element::create("x".repeat(101)).unwrap_err();
        assert!(matches!(err, TypeError::InvalidName(_)));
    }

    #[test]
    fn name_limit_counts_characters() {
        // 100 two-byte characters is 200 bytes but still valid.
        assert!(Element::create("é".repeat(100)).is_ok());
        assert!(Element::create("é".repeat(101)).is_err());
    }

    #[test]
    fn rename_keeps_old_name_on_failure() {
        let mut e = Element::create("alpha").unwrap();
        assert!(e.rename("y".repeat(101)).is_err());
        assert_eq!(e.name(), "alpha");
        e.rename("beta").unwrap();
        assert_eq!(e.name(), "beta");
    }

    #[test]
    fn flags_are_owned() {
        let mut e = Element::create("alpha").unwrap();
        e.flags_mut().set(3).unwrap();
        let copy = e.clone();
        e.flags_mut().set(4).unwrap();
        assert!(!copy.flags().test(4).unwrap());
        let (name, flags) = e.into_parts();
        assert_eq!(name, "alpha");
        assert_eq!(flags.count_ones(), 2);
    }
}
