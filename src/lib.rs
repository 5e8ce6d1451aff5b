//! Library for converting icons between Apple Icon Image (.icns), Windows
//! icon (.ico) and PNG files.
//!
//! See https://en.wikipedia.org/wiki/Apple_Icon_Image_format and
//! https://en.wikipedia.org/wiki/ICO_(file_format) for more information
//! about the container formats.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> iconvert::IconResult<()> {
//! let mut source = iconvert::open("app.icns")?;
//! for entry in source.entries() {
//!     println!("{} {:?}", entry.tag, entry.description);
//! }
//! // Everything as PNG except entry 2, which is left out.
//! let created = iconvert::create("ico", "app.ico", &mut source, Some("2=*"))?;
//! println!("{}", created.summary());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

#[macro_use]
mod error;

pub mod bitmap;
pub mod chunks;
mod container;
mod entry;
mod icns;
mod ico;
pub mod icontype;
mod image;
mod pngfile;
mod pngio;
pub mod reader;
pub mod rle;
pub mod selector;

pub use self::container::{ContainerKind, IconContainer, ReadOptions};
pub use self::entry::{EntryKind, IconEntry, Target};
pub use self::error::{IconError, IconResult};
pub use self::icontype::OSType;
pub use self::image::Image;

use std::path::Path;

/// Opens an ICNS, ICO or PNG file and reads its entries.
pub fn open<P: AsRef<Path>>(path: P) -> IconResult<IconContainer> {
    IconContainer::open(path)
}

/// Opens an ICNS, ICO or PNG file with explicit read options.
pub fn open_with<P: AsRef<Path>>(path: P, options: &ReadOptions) -> IconResult<IconContainer> {
    IconContainer::open_with(path, options)
}

/// Writes the entries of `source` to a new file of the named kind (`apple`,
/// `microsoft` or `raster`, or the extensions `icns`, `ico` and `png`).
pub fn create<P: AsRef<Path>>(
    kind: &str,
    path: P,
    source: &mut IconContainer,
    selector: Option<&str>,
) -> IconResult<IconContainer> {
    let kind: ContainerKind = kind.parse()?;
    IconContainer::create(kind, path, source, selector)
}
