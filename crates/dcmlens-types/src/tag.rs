use std::fmt;

use serde::{Deserialize, Serialize};

/// Group number of the file meta information.
pub const FILE_META_GROUP: u16 = 0x0002;

/// A `(group, element)` pair identifying one attribute of a DICOM data set.
///
/// Ordered by group, then element, which matches the on-disk order of a
/// well-formed data set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementTag {
    pub group: u16,
    pub element: u16,
}

impl ElementTag {
    pub const fn new(group: u16, element: u16) -> Self {
        Self { group, element }
    }

    /// Returns `true` for tags of the file meta information group (0002).
    pub fn is_file_meta(&self) -> bool {
        self.group == FILE_META_GROUP
    }
}

impl From<(u16, u16)> for ElementTag {
    fn from((group, element): (u16, u16)) -> Self {
        Self { group, element }
    }
}

impl fmt::Debug for ElementTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementTag{self}")
    }
}

impl fmt::Display for ElementTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.group, self.element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_padded_uppercase_hex() {
        assert_eq!(ElementTag::new(0x0010, 0x0010).to_string(), "(0010,0010)");
        assert_eq!(ElementTag::new(0x7fe0, 0x10).to_string(), "(7FE0,0010)");
    }

    #[test]
    fn file_meta_group_detection() {
        assert!(ElementTag::new(0x0002, 0x0010).is_file_meta());
        assert!(!ElementTag::new(0x0008, 0x0060).is_file_meta());
    }

    #[test]
    fn ordering_is_group_then_element() {
        let a = ElementTag::new(0x0008, 0xffff);
        let b = ElementTag::new(0x0010, 0x0000);
        let c = ElementTag::new(0x0010, 0x0010);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn equality_is_componentwise() {
        assert_eq!(ElementTag::from((0x0028, 0x0010)), ElementTag::new(0x0028, 0x0010));
        assert_ne!(ElementTag::new(0x0028, 0x0010), ElementTag::new(0x0028, 0x0011));
    }
}
