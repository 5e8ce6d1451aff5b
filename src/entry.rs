use std::fmt;

use super::icontype::{encoding_token, leading_size};
use super::image::Image;

/// What an entry was found to contain when its container was read.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EntryKind {
    /// Data that is not a decodable icon (an unpaired mask, JPEG 2000, an
    /// unknown element, ...).
    NotAnIcon,
    /// The Apple table of contents element.
    TableOfContents,
    /// A PNG stream.
    Raster,
    /// A 32-bit device-independent bitmap with a 1-bit mask.
    PaddedBitmap,
    /// An Apple RLE-compressed 24-bit RGB element, joined with its mask.
    PlanarRgb,
    /// An Apple uncompressed 8-bit mask element.
    PlanarMask,
    /// An Apple RLE-compressed 32-bit ARGB element.
    PlanarArgb,
}

impl EntryKind {
    /// Returns true for kinds that carry a decoded image.
    pub fn is_icon(self) -> bool {
        !matches!(self, EntryKind::NotAnIcon | EntryKind::TableOfContents)
    }

    /// Returns the name used in dumps, e.g. `PLANAR_RGB`.
    pub fn name(self) -> &'static str {
        match self {
            EntryKind::NotAnIcon => "NOT_AN_ICON",
            EntryKind::TableOfContents => "TABLE_OF_CONTENTS",
            EntryKind::Raster => "RASTER",
            EntryKind::PaddedBitmap => "PADDED_BITMAP",
            EntryKind::PlanarRgb => "PLANAR_RGB",
            EntryKind::PlanarMask => "PLANAR_MASK",
            EntryKind::PlanarArgb => "PLANAR_ARGB",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        out.write_str(self.name())
    }
}

/// What should happen to an entry on the next write.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Target {
    /// Let the writer decide from the entry's layout.
    #[default]
    Unset,
    /// Leave the entry out of the output.
    Omit,
    /// The writer resolved the entry to this kind.
    Encode(EntryKind),
}

/// One image (or other element) embedded in a container.
///
/// Fields are public: callers select, drop and relabel entries by editing
/// them in place before asking for a new container to be created.
#[derive(Clone, Debug)]
pub struct IconEntry {
    /// What was found when the container was read.
    pub kind: EntryKind,
    /// What to do with the entry when writing.
    pub target: Target,
    /// Start of the entry's payload in the source container.
    pub offset: u64,
    /// Length of the entry's payload, or 0 for entries not backed by a
    /// container (pasted images).
    pub length: u64,
    /// Pixel side length, for decoded square icons.
    pub size: u32,
    /// Apple four-character type, or the container's name (`ICO`, `PNG`).
    pub tag: String,
    /// Human-readable summary of the entry.
    pub description: Option<String>,
    /// `"<size> <encoding>"` join key, e.g. `"32 32-bit"` or `"256 PNG"`.
    pub layout: Option<String>,
    /// Decoded RGBA pixels.
    pub image: Option<Image>,
}

impl IconEntry {
    /// Creates an undecoded entry for the given byte range.
    pub fn new<S: Into<String>>(tag: S, offset: u64, length: u64) -> IconEntry {
        IconEntry {
            kind: EntryKind::NotAnIcon,
            target: Target::Unset,
            offset,
            length,
            size: 0,
            tag: tag.into(),
            description: None,
            layout: None,
            image: None,
        }
    }

    /// Creates a raster entry from an image that does not come from any
    /// container, such as a pasted image.
    pub fn from_image(image: Image) -> IconEntry {
        let description = if image.is_square() {
            format!("{} PNG", image.width())
        } else {
            format!("{}x{} PNG", image.width(), image.height())
        };
        IconEntry {
            kind: EntryKind::Raster,
            target: Target::Unset,
            offset: 0,
            length: 0,
            size: image.width(),
            tag: "PNG".to_string(),
            layout: Some(description.clone()),
            description: Some(description),
            image: Some(image),
        }
    }

    /// Returns true if the entry holds a decoded icon that has not been
    /// dropped by the caller.
    pub fn is_selected(&self) -> bool {
        self.kind.is_icon() && self.image.is_some() && self.target != Target::Omit
    }

    /// Returns true if the entry's bytes can be read back from the source
    /// container.
    pub fn has_source_range(&self) -> bool {
        self.length > 0
    }

    /// Returns the pixel size to write: `size`, or the size named by the
    /// layout when `size` is zero.
    pub fn output_size(&self) -> Option<u32> {
        if self.size > 0 {
            Some(self.size)
        } else {
            self.layout.as_deref().and_then(leading_size)
        }
    }

    /// Returns the normalized `"<size> <encoding>"` layout used to pick an
    /// output type, e.g. `"512 PNG"` for a `"512² PNG"` layout.
    pub fn output_layout(&self) -> Option<String> {
        let size = self.output_size()?;
        let encoding = encoding_token(self.layout.as_deref()?);
        Some(format!("{} {}", size, encoding))
    }

    /// Returns true if the entry's layout asks for PNG output.
    pub fn wants_raster(&self) -> bool {
        self.layout.as_deref().map_or(false, |layout| layout.ends_with("PNG"))
    }
}
