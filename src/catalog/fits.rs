// src/catalog/fits.rs

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};
use tracing::{debug, instrument, trace};

use super::Catalog;
use crate::error::{DigestError, Result};

const BLOCK: usize = 2880;
const CARD: usize = 80;

/// Header cards of one HDU, keyword → raw value text.
#[derive(Debug, Default)]
struct Header {
    cards: HashMap<String, String>,
}

impl Header {
    fn string(&self, key: &str) -> Option<String> {
        self.cards.get(key).map(|v| parse_string_value(v))
    }

    fn int(&self, key: &str) -> Option<i64> {
        self.cards
            .get(key)
            .and_then(|v| strip_comment(v).trim().parse::<i64>().ok())
    }

    /// Size of the data unit following this header, padded to whole blocks.
    fn data_len(&self) -> Result<u64> {
        let naxis = self.int("NAXIS").unwrap_or(0);
        if naxis == 0 {
            return Ok(0);
        }
        let bitpix = self
            .int("BITPIX")
            .ok_or_else(|| DigestError::Fits("missing BITPIX".to_string()))?;
        let mut elements: i64 = 1;
        for n in 1..=naxis {
            let axis = self
                .int(&format!("NAXIS{n}"))
                .ok_or_else(|| DigestError::Fits(format!("missing NAXIS{n}")))?;
            elements = elements.checked_mul(axis).ok_or_else(overflow)?;
        }
        let pcount = self.int("PCOUNT").unwrap_or(0);
        let gcount = self.int("GCOUNT").unwrap_or(1);
        let width = bitpix.checked_abs().ok_or_else(overflow)? / 8;
        let bytes = pcount
            .checked_add(elements)
            .and_then(|n| n.checked_mul(gcount))
            .and_then(|n| n.checked_mul(width))
            .ok_or_else(overflow)?;
        let bytes = u64::try_from(bytes)
            .map_err(|_| DigestError::Fits("negative data size".to_string()))?;
        bytes
            .div_ceil(BLOCK as u64)
            .checked_mul(BLOCK as u64)
            .ok_or_else(overflow)
    }

    /// Seek offset that skips the data unit following this header.
    fn skip_offset(&self) -> Result<i64> {
        i64::try_from(self.data_len()?).map_err(|_| overflow())
    }
}

fn overflow() -> DigestError {
    DigestError::Fits("data unit size overflows".to_string())
}

/// Read the column names and `TFORM` codes of the first `BINTABLE`
/// extension in a FITS file.
#[instrument(level = "debug", skip(path), fields(path = %path.display()))]
pub fn read_catalog(path: &Path) -> Result<Catalog> {
    let mut reader = BufReader::new(File::open(path)?);
    read_catalog_from(&mut reader)
}

pub fn read_catalog_from<R: Read + Seek>(reader: &mut R) -> Result<Catalog> {
    let primary = read_header(reader)?;
    if primary.cards.get("SIMPLE").map(|v| strip_comment(v).trim()) != Some("T") {
        return Err(DigestError::Fits("not a FITS file (SIMPLE = T missing)".to_string()));
    }
    reader.seek(SeekFrom::Current(primary.skip_offset()?))?;

    loop {
        let header = read_header(reader)?;
        let xtension = header.string("XTENSION").unwrap_or_default();
        if xtension == "BINTABLE" {
            return bintable_columns(&header);
        }
        debug!(xtension = %xtension, "skipping extension");
        reader.seek(SeekFrom::Current(header.skip_offset()?))?;
    }
}

fn bintable_columns(header: &Header) -> Result<Catalog> {
    let tfields = header
        .int("TFIELDS")
        .ok_or_else(|| DigestError::Fits("BINTABLE without TFIELDS".to_string()))?;
    let mut catalog = Catalog::new();
    for n in 1..=tfields {
        let name = header
            .string(&format!("TTYPE{n}"))
            .ok_or_else(|| DigestError::Fits(format!("missing TTYPE{n}")))?;
        let code = header
            .string(&format!("TFORM{n}"))
            .ok_or_else(|| DigestError::Fits(format!("missing TFORM{n}")))?;
        trace!(name = %name, code = %code, "catalog column");
        catalog.insert(&name, &code)?;
    }
    debug!(columns = catalog.len(), "read BINTABLE header");
    Ok(catalog)
}

/// Read header blocks up to and including the one holding `END`.
fn read_header<R: Read>(reader: &mut R) -> Result<Header> {
    let mut header = Header::default();
    let mut block = [0u8; BLOCK];
    loop {
        reader.read_exact(&mut block).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                DigestError::Fits("no BINTABLE extension found".to_string())
            }
            _ => DigestError::Io(e),
        })?;
        for card in block.chunks(CARD) {
            let keyword = String::from_utf8_lossy(&card[..8]);
            let keyword = keyword.trim_end();
            if keyword == "END" {
                return Ok(header);
            }
            if &card[8..10] == b"= " {
                header.cards.insert(
                    keyword.to_string(),
                    String::from_utf8_lossy(&card[10..]).into_owned(),
                );
            }
        }
    }
}

/// Quoted string value with `''` escapes; trailing blanks are not significant.
fn parse_string_value(raw: &str) -> String {
    let raw = raw.trim_start();
    let Some(body) = raw.strip_prefix('\'') else {
        return strip_comment(raw).trim().to_string();
    };
    let mut out = String::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                out.push('\'');
                continue;
            }
            break;
        }
        out.push(c);
    }
    out.trim_end().to_string()
}

fn strip_comment(raw: &str) -> &str {
    raw.split('/').next().unwrap_or(raw)
}
