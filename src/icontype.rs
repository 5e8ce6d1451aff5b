//! Static tables relating Apple element types to generic
//! `"<size> <encoding>"` layouts.

use std::fmt;
use std::str::FromStr;

use super::entry::EntryKind;

/// A Macintosh OSType (also known as a ResType), used in ICNS files to
/// identify the type of each icon element.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct OSType(pub [u8; 4]);

impl OSType {
    /// The table of contents element.
    pub const TABLE_OF_CONTENTS: OSType = OSType(*b"TOC ");

    /// Returns true if this type names an RLE-compressed 24-bit RGB element
    /// that pairs with an 8-bit mask.
    pub fn is_rgb24(self) -> bool {
        RGB24_TYPES.contains(&self)
    }

    /// Returns true if this type may hold an RLE-compressed ARGB element.
    pub fn may_hold_argb(self) -> bool {
        ARGB_TYPES.contains(&self)
    }
}

impl fmt::Display for OSType {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        let &OSType(raw) = self;
        for &byte in &raw {
            write!(out, "{}", char::from(byte))?;
        }
        Ok(())
    }
}

impl FromStr for OSType {
    type Err = String;

    /// Parses a four-character type.  Three-character types are padded
    /// with a trailing space, the way `TOC ` is written.
    fn from_str(input: &str) -> Result<OSType, String> {
        let bytes = input.as_bytes();
        match bytes.len() {
            3 => Ok(OSType([bytes[0], bytes[1], bytes[2], b' '])),
            4 => {
                let mut raw = [0u8; 4];
                raw.clone_from_slice(bytes);
                Ok(OSType(raw))
            }
            len => Err(format!("OSType string must be 3 or 4 bytes (was {})", len)),
        }
    }
}

/// Elements holding 24-bit RGB data that is joined with a separate mask.
const RGB24_TYPES: [OSType; 6] = [
    OSType(*b"is32"),
    OSType(*b"il32"),
    OSType(*b"ih32"),
    OSType(*b"it32"),
    OSType(*b"icp4"),
    OSType(*b"icp5"),
];

/// Elements that may hold ARGB data instead of PNG or JPEG 2000.
const ARGB_TYPES: [OSType; 3] = [OSType(*b"ic04"), OSType(*b"ic05"), OSType(*b"icsb")];

/// Every element type Apple has used, with a description.
static DESCRIPTIONS: [(OSType, &str); 40] = [
    (OSType(*b"TOC "), "Table of contents"),
    (OSType(*b"ICON"), "32 1-bit mono"),
    (OSType(*b"ICN#"), "32 1-bit mono"),
    (OSType(*b"icm#"), "16x12 1-bit mono"),
    (OSType(*b"icm4"), "16x12 4-bit"),
    (OSType(*b"icm8"), "16x12 8-bit"),
    (OSType(*b"ics#"), "16 1-bit mono"),
    (OSType(*b"ics4"), "16 4-bit"),
    (OSType(*b"ics8"), "16 8-bit"),
    (OSType(*b"is32"), "16 24-bit RGB"),
    (OSType(*b"s8mk"), "16 8-bit mask"),
    (OSType(*b"icl4"), "32 4-bit"),
    (OSType(*b"icl8"), "32 8-bit"),
    (OSType(*b"il32"), "32 24-bit RGB"),
    (OSType(*b"l8mk"), "32 8-bit mask"),
    (OSType(*b"ich#"), "48 1-bit mono"),
    (OSType(*b"ich4"), "48 4-bit"),
    (OSType(*b"ich8"), "48 8-bit"),
    (OSType(*b"ih32"), "48 24-bit RGB"),
    (OSType(*b"h8mk"), "48 8-bit mask"),
    (OSType(*b"it32"), "128 24-bit RGB"),
    (OSType(*b"t8mk"), "128 8-bit mask"),
    (OSType(*b"icp4"), "16 JPEG or PNG or 24-bit RGB"),
    (OSType(*b"icp5"), "32 JPEG or PNG or 24-bit RGB"),
    (OSType(*b"icp6"), "48 JPEG or PNG"),
    (OSType(*b"ic07"), "128 JPEG or PNG"),
    (OSType(*b"ic08"), "256 JPEG or PNG"),
    (OSType(*b"ic09"), "512 JPEG or PNG"),
    (OSType(*b"ic10"), "1024² JPEG or PNG"),
    (OSType(*b"ic11"), "32² JPEG or PNG"),
    (OSType(*b"ic12"), "64² JPEG or PNG"),
    (OSType(*b"ic13"), "256² JPEG or PNG"),
    (OSType(*b"ic14"), "512² JPEG or PNG"),
    (OSType(*b"ic04"), "16 ARGB or JPEG or PNG"),
    (OSType(*b"ic05"), "32² ARGB or JPEG or PNG"),
    (OSType(*b"icsb"), "18 ARGB or JPEG or PNG"),
    (OSType(*b"icsB"), "36² JPEG or PNG"),
    (OSType(*b"sb24"), "24 JPEG or PNG"),
    (OSType(*b"SB24"), "48² JPEG or PNG"),
    (OSType(*b"info"), "Info binary plist"),
];

/// One way of storing a layout in an ICNS file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TypeMatch {
    /// The element type to write.
    pub ostype: OSType,
    /// The generic `"<size> <encoding>"` layout this row stores.
    pub layout: &'static str,
    /// How the element payload is encoded.
    pub kind: EntryKind,
    /// The mask element written alongside, for 24-bit RGB elements.
    pub mask: Option<OSType>,
}

const fn row(
    ostype: &[u8; 4],
    layout: &'static str,
    kind: EntryKind,
    mask: Option<&[u8; 4]>,
) -> TypeMatch {
    TypeMatch {
        ostype: OSType(*ostype),
        layout,
        kind,
        mask: match mask {
            Some(mask) => Some(OSType(*mask)),
            None => None,
        },
    }
}

/// The element types this library writes, keyed by layout.  When several
/// rows share a layout, the last one is the default.
static MATCHES: [TypeMatch; 26] = [
    row(b"is32", "16 32-bit", EntryKind::PlanarRgb, Some(b"s8mk")),
    row(b"il32", "32 32-bit", EntryKind::PlanarRgb, Some(b"l8mk")),
    row(b"ih32", "48 32-bit", EntryKind::PlanarRgb, Some(b"h8mk")),
    row(b"it32", "128 32-bit", EntryKind::PlanarRgb, Some(b"t8mk")),
    row(b"icp4", "16 PNG", EntryKind::Raster, None),
    row(b"icp4", "16 32-bit", EntryKind::PlanarRgb, Some(b"s8mk")),
    row(b"icp5", "32 PNG", EntryKind::Raster, None),
    row(b"icp5", "32 32-bit", EntryKind::PlanarRgb, Some(b"l8mk")),
    row(b"icp6", "48 PNG", EntryKind::Raster, None),
    row(b"ic07", "128 PNG", EntryKind::Raster, None),
    row(b"ic08", "256 PNG", EntryKind::Raster, None),
    row(b"ic09", "512 PNG", EntryKind::Raster, None),
    row(b"ic10", "1024 PNG", EntryKind::Raster, None),
    row(b"ic11", "32 PNG", EntryKind::Raster, None),
    row(b"ic12", "64 PNG", EntryKind::Raster, None),
    row(b"ic13", "256 PNG", EntryKind::Raster, None),
    row(b"ic14", "512 PNG", EntryKind::Raster, None),
    row(b"ic04", "16 PNG", EntryKind::Raster, None),
    row(b"ic04", "16 32-bit", EntryKind::PlanarArgb, None),
    row(b"ic05", "32 PNG", EntryKind::Raster, None),
    row(b"ic05", "32 32-bit", EntryKind::PlanarArgb, None),
    row(b"icsb", "18 PNG", EntryKind::Raster, None),
    row(b"icsb", "18 32-bit", EntryKind::PlanarArgb, None),
    row(b"icsB", "36 PNG", EntryKind::Raster, None),
    row(b"sb24", "24 PNG", EntryKind::Raster, None),
    row(b"SB24", "48 PNG", EntryKind::Raster, None),
];

/// Returns the description of an element type, if it is a known one.
pub fn describe(ostype: OSType) -> Option<&'static str> {
    DESCRIPTIONS
        .iter()
        .find(|(candidate, _)| *candidate == ostype)
        .map(|&(_, description)| description)
}

/// Picks the element type that stores `layout`.  A row whose type equals
/// `preferred` wins; otherwise the last row for the layout is used.
pub fn resolve(layout: &str, preferred: &str) -> Option<&'static TypeMatch> {
    let mut fallback = None;
    for candidate in MATCHES.iter().filter(|candidate| candidate.layout == layout) {
        if candidate.ostype.to_string() == preferred {
            return Some(candidate);
        }
        fallback = Some(candidate);
    }
    fallback
}

/// Lists every element type able to store `layout`, in table order.
pub fn tags_for_layout(layout: &str) -> Vec<OSType> {
    MATCHES
        .iter()
        .filter(|candidate| candidate.layout == layout)
        .map(|candidate| candidate.ostype)
        .collect()
}

/// Returns the pixel size leading a layout or description, such as 512 for
/// `"512² PNG"` or 16 for `"16x12 4-bit"`.
pub fn leading_size(text: &str) -> Option<u32> {
    text.split(|c: char| c == ' ' || c == 'x' || c == '²')
        .next()
        .and_then(|size| size.parse().ok())
}

/// Returns the encoding part of a layout, such as `"PNG"` for `"256 PNG"`,
/// or an empty string if there is none.
pub fn encoding_token(layout: &str) -> &str {
    layout.split(' ').nth(1).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ostype_to_and_from_str() {
        let ostype = OSType::from_str("abcd").expect("failed to parse OSType");
        assert_eq!(ostype.to_string(), "abcd".to_string());
        assert_eq!(OSType::from_str("TOC").unwrap(), OSType::TABLE_OF_CONTENTS);
    }

    #[test]
    fn ostype_from_str_failure() {
        assert_eq!(OSType::from_str("ab"),
                   Err("OSType string must be 3 or 4 bytes (was 2)".to_string()));
        assert_eq!(OSType::from_str("abcde"),
                   Err("OSType string must be 3 or 4 bytes (was 5)".to_string()));
    }

    #[test]
    fn descriptions() {
        assert_eq!(describe(OSType(*b"it32")), Some("128 24-bit RGB"));
        assert_eq!(describe(OSType(*b"TOC ")), Some("Table of contents"));
        assert_eq!(describe(OSType(*b"zzzz")), None);
    }

    #[test]
    fn every_match_has_a_description() {
        for candidate in MATCHES.iter() {
            let description = describe(candidate.ostype).expect("undescribed type");
            assert_eq!(leading_size(description), leading_size(candidate.layout));
            if let Some(mask) = candidate.mask {
                assert_eq!(leading_size(describe(mask).unwrap()), leading_size(candidate.layout));
            }
        }
    }

    #[test]
    fn resolve_prefers_current_type() {
        let found = resolve("16 32-bit", "is32").unwrap();
        assert_eq!(found.ostype, OSType(*b"is32"));
        assert_eq!(found.mask, Some(OSType(*b"s8mk")));
        let found = resolve("16 32-bit", "ICO").unwrap();
        assert_eq!(found.ostype, OSType(*b"ic04"));
        assert_eq!(found.kind, EntryKind::PlanarArgb);
        assert_eq!(found.mask, None);
        let found = resolve("256 PNG", "PNG").unwrap();
        assert_eq!(found.ostype, OSType(*b"ic13"));
        assert_eq!(resolve("256 PNG", "ic08").unwrap().ostype, OSType(*b"ic08"));
        assert!(resolve("17 PNG", "PNG").is_none());
        assert!(resolve("256 32-bit", "ic08").is_none());
    }

    #[test]
    fn tags_for_editors() {
        let tags = tags_for_layout("32 PNG");
        assert_eq!(tags, vec![OSType(*b"icp5"), OSType(*b"ic11"), OSType(*b"ic05")]);
        assert!(tags_for_layout("1 PNG").is_empty());
    }

    #[test]
    fn layout_parts() {
        assert_eq!(leading_size("512² PNG"), Some(512));
        assert_eq!(leading_size("16x12 4-bit"), Some(16));
        assert_eq!(leading_size("Table of contents"), None);
        assert_eq!(encoding_token("48 32-bit"), "32-bit");
        assert_eq!(encoding_token("48"), "");
    }

    #[test]
    fn rgb24_and_argb_types() {
        assert!(OSType(*b"it32").is_rgb24());
        assert!(!OSType(*b"ic04").is_rgb24());
        assert!(OSType(*b"icsb").may_hold_argb());
        assert!(!OSType(*b"ic08").may_hold_argb());
    }
}
