//! Indexed-colour PNG encoding of suitability classes.
//!
//! Pixels hold a class index; the colour table always spans the full 8-bit
//! index space. [`TRANSPARENT_INDEX`] is reserved for no-data and class values
//! must stay strictly below it.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

use crate::error::{Error, Result};
use crate::raster::ReprojectedGrid;

/// Index reserved for no-data / out-of-footprint pixels.
pub const TRANSPARENT_INDEX: u8 = 255;

/// Entries in an 8-bit colour table.
pub const TABLE_SIZE: usize = 256;

/// Colour written into table slots that no pixel references.
const FILLER: Rgba = Rgba {
    r: 0,
    g: 0,
    b: 0,
    a: 255,
};

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn opaque(self) -> Rgba {
        Rgba {
            r: self.r,
            g: self.g,
            b: self.b,
            a: 255,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = Error;

    /// Parses `#RRGGBB`.
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(Error::Format(format!("invalid colour: {s}")));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| Error::Format(format!("invalid colour: {s}")))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Discrete crop-growing suitability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SuitabilityClass {
    Bad = 0,
    Possible = 1,
    Suitable = 2,
}

impl SuitabilityClass {
    pub const ALL: [SuitabilityClass; 3] = [
        SuitabilityClass::Bad,
        SuitabilityClass::Possible,
        SuitabilityClass::Suitable,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            SuitabilityClass::Bad => "Bad",
            SuitabilityClass::Possible => "Possible",
            SuitabilityClass::Suitable => "Suitable",
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            SuitabilityClass::Bad => Rgb::new(0xFF, 0xF8, 0xDC),
            SuitabilityClass::Possible => Rgb::new(0xEE, 0xC9, 0x00),
            SuitabilityClass::Suitable => Rgb::new(0x2E, 0x8B, 0x57),
        }
    }

    /// e.g. `Possible (1)`
    pub fn label(self) -> String {
        format!("{} ({})", self.name(), self.value())
    }

    /// Class colours in class order, ready for [`ColorTable::new`].
    pub fn colors() -> Vec<Rgb> {
        Self::ALL.iter().map(|class| class.color()).collect()
    }
}

/// A full 256-entry colour table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTable {
    entries: Vec<Rgba>,
}

impl ColorTable {
    /// Class colours occupy indices `0..classes.len()`; `transparent_index`
    /// maps to a fully transparent entry.
    pub fn new(classes: &[Rgb], transparent_index: u8) -> Result<Self> {
        if classes.len() > transparent_index as usize {
            return Err(Error::PaletteCollision {
                value: classes.len() as f64 - 1.0,
                transparent_index,
            });
        }

        let mut entries = vec![FILLER; TABLE_SIZE];
        for (entry, color) in entries.iter_mut().zip(classes) {
            *entry = color.opaque();
        }
        entries[transparent_index as usize] = Rgba {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        };

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[Rgba] {
        &self.entries
    }

    pub fn get(&self, index: u8) -> Rgba {
        self.entries[index as usize]
    }
}

/// One class index per pixel plus the table that colours them.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteImage {
    pub width: usize,
    pub height: usize,
    pub indices: Vec<u8>,
    pub table: ColorTable,
    pub transparent_index: u8,
}

impl PaletteImage {
    /// Map a float grid onto palette indices.
    ///
    /// `NaN` becomes `transparent_index`. Every other value must be a
    /// non-negative number below `transparent_index`.
    pub fn from_grid(
        values: &[f64],
        width: usize,
        height: usize,
        classes: &[Rgb],
        transparent_index: u8,
    ) -> Result<Self> {
        if values.len() != width * height {
            return Err(Error::Format(format!(
                "grid has {} values, expected {}x{}",
                values.len(),
                width,
                height
            )));
        }

        let table = ColorTable::new(classes, transparent_index)?;
        let indices = values
            .iter()
            .map(|&value| class_index(value, transparent_index))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            width,
            height,
            indices,
            table,
            transparent_index,
        })
    }

    /// Serialise as an 8-bit indexed PNG with a `tRNS` chunk.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut png = Vec::new();
        png.extend_from_slice(&PNG_SIGNATURE);

        // IHDR
        let mut ihdr = Vec::with_capacity(13);
        ihdr.extend_from_slice(&(self.width as u32).to_be_bytes());
        ihdr.extend_from_slice(&(self.height as u32).to_be_bytes());
        ihdr.push(8); // bit depth
        ihdr.push(3); // colour type: indexed
        ihdr.push(0); // compression
        ihdr.push(0); // filter
        ihdr.push(0); // interlace
        write_chunk(&mut png, b"IHDR", &ihdr);

        let entries = self.table.entries();
        let plte: Vec<u8> = entries.iter().flat_map(|c| [c.r, c.g, c.b]).collect();
        write_chunk(&mut png, b"PLTE", &plte);

        let trns: Vec<u8> = entries.iter().map(|c| c.a).collect();
        write_chunk(&mut png, b"tRNS", &trns);

        let idat = self.deflate_scanlines()?;
        write_chunk(&mut png, b"IDAT", &idat);

        write_chunk(&mut png, b"IEND", &[]);

        debug!(
            "Encoded {}x{} palette PNG ({} bytes)",
            self.width,
            self.height,
            png.len()
        );
        Ok(png)
    }

    fn deflate_scanlines(&self) -> Result<Vec<u8>> {
        let mut raw = Vec::with_capacity(self.height * (self.width + 1));
        for row in self.indices.chunks_exact(self.width.max(1)).take(self.height) {
            raw.push(0); // filter: none
            raw.extend_from_slice(row);
        }

        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&raw)?;
        Ok(encoder.finish()?)
    }
}

/// Colourise a reprojected grid and return PNG bytes.
pub fn encode(grid: &ReprojectedGrid, classes: &[Rgb], transparent_index: u8) -> Result<Vec<u8>> {
    PaletteImage::from_grid(
        &grid.values,
        grid.width,
        grid.height,
        classes,
        transparent_index,
    )?
    .to_png()
}

pub fn to_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

fn class_index(value: f64, transparent_index: u8) -> Result<u8> {
    if value.is_nan() {
        return Ok(transparent_index);
    }
    if !value.is_finite() || value < 0.0 || value >= transparent_index as f64 {
        return Err(Error::PaletteCollision {
            value,
            transparent_index,
        });
    }
    Ok(value as u8)
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}
