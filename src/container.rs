//! Opening and creating icon containers of any supported kind.

use std::fmt::{self, Write as _};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::chunks::PNG_SIGNATURE;
use super::entry::IconEntry;
use super::error::{IconError, IconResult};
use super::ico::ICO_MAGIC;
use super::icns::ICNS_MAGIC_LITERAL;
use super::reader::ByteRangeReader;
use super::{icns, ico, pngfile, selector};

/// The container formats this library reads and writes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ContainerKind {
    /// An Apple icon family (`.icns`).
    Apple,
    /// A Microsoft icon file (`.ico`).
    Microsoft,
    /// A single PNG image.
    Raster,
}

impl ContainerKind {
    /// Picks the container kind whose magic value starts `magic`.
    pub fn sniff(magic: &[u8]) -> Option<ContainerKind> {
        let magic = magic.get(0..4)?;
        if magic == ICNS_MAGIC_LITERAL {
            Some(ContainerKind::Apple)
        } else if magic == ICO_MAGIC {
            Some(ContainerKind::Microsoft)
        } else if magic == &PNG_SIGNATURE[0..4] {
            Some(ContainerKind::Raster)
        } else {
            None
        }
    }

    /// Returns the short name of the format, e.g. `ICNS`.
    pub fn name(self) -> &'static str {
        match self {
            ContainerKind::Apple => "ICNS",
            ContainerKind::Microsoft => "ICO",
            ContainerKind::Raster => "PNG",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        out.write_str(self.name())
    }
}

impl FromStr for ContainerKind {
    type Err = IconError;

    /// Parses an output kind, ignoring case: `apple` or `icns`, `microsoft`
    /// or `ico`, `raster` or `png`.
    fn from_str(input: &str) -> Result<ContainerKind, IconError> {
        match input.to_ascii_lowercase().as_str() {
            "apple" | "icns" => Ok(ContainerKind::Apple),
            "microsoft" | "ico" => Ok(ContainerKind::Microsoft),
            "raster" | "png" => Ok(ContainerKind::Raster),
            _ => Err(argument_error!("unknown container kind {:?}", input)),
        }
    }
}

/// Options that change how containers are read.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReadOptions {
    /// Fail to open an Apple container when a 24-bit RGB element has no
    /// usable mask, instead of listing that element as `NotAnIcon`.
    pub strict_masks: bool,
}

/// An open icon file and the entries found in it.
///
/// The container owns its file; it is released when the container is
/// closed or dropped.
pub struct IconContainer {
    path: PathBuf,
    kind: ContainerKind,
    media: ByteRangeReader<File>,
    entries: Vec<IconEntry>,
}

impl IconContainer {
    /// Opens a container, picking its kind from the first four bytes.
    pub fn open<P: AsRef<Path>>(path: P) -> IconResult<IconContainer> {
        IconContainer::open_with(path, &ReadOptions::default())
    }

    /// Opens a container with explicit read options.
    pub fn open_with<P: AsRef<Path>>(path: P, options: &ReadOptions) -> IconResult<IconContainer> {
        let path = path.as_ref();
        let mut media = ByteRangeReader::new(File::open(path)?)?;
        let magic = media.read_at(0, 4)?;
        if magic.len() < 4 {
            return Err(format_error!("{} is too short to be an icon file", path.display()));
        }
        let kind = ContainerKind::sniff(&magic)
            .ok_or_else(|| format_error!("{} is not an ICNS, ICO or PNG file", path.display()))?;
        let entries = read_entries(kind, &mut media, options)?;
        tracing::info!(
            path = %path.display(),
            %kind,
            length = media.len(),
            entries = entries.len(),
            "opened container"
        );
        Ok(IconContainer {
            path: path.to_path_buf(),
            kind,
            media,
            entries,
        })
    }

    /// Writes the entries of `source` to a new container of the given kind
    /// at `path`, replacing any file there.  `selector` is applied to the
    /// source entries first (see [`selector::apply`]).
    ///
    /// The new container is read back, so its entries list what was
    /// written.  When no source entry could be written the file is left
    /// empty and so is the entry list.
    pub fn create<P: AsRef<Path>>(
        kind: ContainerKind,
        path: P,
        source: &mut IconContainer,
        selector: Option<&str>,
    ) -> IconResult<IconContainer> {
        let path = path.as_ref();
        if is_same_file(path, &source.path) {
            return Err(argument_error!(
                "cannot write {} over its own source",
                path.display()
            ));
        }
        selector::apply(selector, &mut source.entries)?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        {
            let mut out = BufWriter::new(&mut file);
            let entries = &mut source.entries;
            let media = &mut source.media;
            match kind {
                ContainerKind::Apple => icns::write_entries(entries, media, &mut out)?,
                ContainerKind::Microsoft => ico::write_entries(entries, media, &mut out)?,
                ContainerKind::Raster => pngfile::write_entries(entries, media, &mut out)?,
            };
            out.flush()?;
        }
        let mut media = ByteRangeReader::new(file)?;
        let entries = if media.is_empty() {
            Vec::new()
        } else {
            read_entries(kind, &mut media, &ReadOptions::default())?
        };
        tracing::info!(
            path = %path.display(),
            %kind,
            source = %source.path.display(),
            length = media.len(),
            entries = entries.len(),
            "created container"
        );
        Ok(IconContainer {
            path: path.to_path_buf(),
            kind,
            media,
            entries,
        })
    }

    /// Returns the path the container was opened from or created at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the format of the container.
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Returns the length of the backing file, in bytes.
    pub fn len(&self) -> u64 {
        self.media.len()
    }

    /// Returns true if the backing file is empty.
    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }

    /// Returns the entries, in file order.
    pub fn entries(&self) -> &[IconEntry] {
        &self.entries
    }

    /// Returns the entries for editing before a `create`.
    pub fn entries_mut(&mut self) -> &mut [IconEntry] {
        &mut self.entries
    }

    /// Appends an entry, such as one made with [`IconEntry::from_image`].
    pub fn add_entry(&mut self, entry: IconEntry) {
        self.entries.push(entry);
    }

    /// Renders a listing of the container and its entries.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{}: {} container, {} bytes, {} entries\n",
            self.path.display(),
            self.kind,
            self.len(),
            self.entries.len()
        );
        for (index, entry) in self.entries.iter().enumerate() {
            let _ = write!(
                text,
                "{:3} {:<17} offset={:<8} length={:<8} {:<4} {}",
                index,
                entry.kind,
                entry.offset,
                entry.length,
                entry.tag,
                entry.description.as_deref().unwrap_or("?")
            );
            if let Some(image) = &entry.image {
                let _ = write!(text, " ({}x{})", image.width(), image.height());
            }
            text.push('\n');
        }
        text
    }

    /// Closes the container, releasing its file.
    pub fn close(self) {
        tracing::debug!(path = %self.path.display(), "closed container");
    }
}

impl fmt::Debug for IconContainer {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        out.debug_struct("IconContainer")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("length", &self.media.len())
            .field("entries", &self.entries)
            .finish()
    }
}

fn read_entries<R: Read + Seek>(
    kind: ContainerKind,
    media: &mut ByteRangeReader<R>,
    options: &ReadOptions,
) -> IconResult<Vec<IconEntry>> {
    match kind {
        ContainerKind::Apple => icns::read_entries(media, options),
        ContainerKind::Microsoft => ico::read_entries(media),
        ContainerKind::Raster => pngfile::read_entries(media),
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
