//! Per-cell number formats of an `.xlsx` package.
//!
//! calamine exposes values but not the format codes applied to them, so the
//! package parts are read directly: `xl/workbook.xml` and its relationships
//! locate the first worksheet, `xl/styles.xml` maps style indices to format
//! codes and the worksheet maps cells to style indices.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

use super::number_format::NumberFormat;

/// First id of workbook-defined formats; lower ids are built in.
const FIRST_CUSTOM_FORMAT_ID: u32 = 164;

/// Failure to read the styling parts of a package.
#[derive(Error, Debug)]
pub enum StyleError {
    #[error("Zip error: {0}")]
    Zip(#[from] ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Number formats applied to the cells of the first worksheet.
#[derive(Debug, Default)]
pub struct CellFormats {
    /// Format per `cellXfs` index; `None` for General and locale dates.
    styles: Vec<Option<NumberFormat>>,
    /// Zero-based (row, column) to `cellXfs` index.
    cells: HashMap<(u32, u32), usize>,
    is_1904: bool,
}

impl CellFormats {
    /// Reads the formats of the first worksheet from `.xlsx` bytes.
    ///
    /// # Errors
    /// Returns `StyleError` if the package or one of its XML parts is malformed.
    pub fn from_xlsx(bytes: &[u8]) -> Result<Self, StyleError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let Some(workbook) = read_part(&mut archive, "xl/workbook.xml")? else {
            return Ok(Self::default());
        };
        let (first_sheet, is_1904) = parse_workbook(&workbook)?;

        let styles = match read_part(&mut archive, "xl/styles.xml")? {
            Some(xml) => parse_styles(&xml)?,
            None => Vec::new(),
        };

        let relationships = read_part(&mut archive, "xl/_rels/workbook.xml.rels")?;
        let sheet_path = match (first_sheet, relationships) {
            (Some(id), Some(rels)) => parse_relationship_target(&rels, &id)?,
            _ => None,
        };
        let cells = match sheet_path {
            Some(path) => match read_part(&mut archive, &path)? {
                Some(xml) => parse_cell_styles(&xml)?,
                None => HashMap::new(),
            },
            None => HashMap::new(),
        };

        tracing::trace!(styles = styles.len(), cells = cells.len(), "Cell formats read");
        Ok(Self {
            styles,
            cells,
            is_1904,
        })
    }

    /// Format code applied at the zero-based (row, column), unless General.
    #[must_use]
    pub fn get(&self, row: u32, col: u32) -> Option<&NumberFormat> {
        let style = *self.cells.get(&(row, col))?;
        self.styles.get(style)?.as_ref()
    }

    /// Whether the workbook counts dates from 1904.
    #[must_use]
    pub const fn is_1904(&self) -> bool {
        self.is_1904
    }
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, StyleError> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            Ok(Some(bytes))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .and_then(|attr| {
            // Same as `Attribute::unescape_value`, which is unavailable when
            // quick-xml's `encoding` feature is enabled (calamine enables it).
            std::str::from_utf8(&attr.value)
                .ok()
                .and_then(|v| quick_xml::escape::unescape(v).ok().map(|v| v.into_owned()))
        })
}

fn parse_number<T: std::str::FromStr>(element: &BytesStart<'_>, name: &[u8]) -> Option<T> {
    attribute(element, name).and_then(|v| v.parse().ok())
}

/// Relationship id of the first `<sheet>` and the `date1904` flag.
fn parse_workbook(xml: &[u8]) -> Result<(Option<String>, bool), StyleError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut first_sheet = None;
    let mut is_1904 = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"workbookPr" => {
                    is_1904 = attribute(&e, b"date1904")
                        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
                }
                b"sheet" if first_sheet.is_none() => {
                    first_sheet = attribute(&e, b"r:id");
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((first_sheet, is_1904))
}

/// Package path of the relationship `id`, resolved against `xl/`.
fn parse_relationship_target(xml: &[u8], id: &str) -> Result<Option<String>, StyleError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e)
                if e.local_name().as_ref() == b"Relationship"
                    && attribute(&e, b"Id").as_deref() == Some(id) =>
            {
                return Ok(attribute(&e, b"Target").map(|target| {
                    target
                        .strip_prefix('/')
                        .map_or_else(|| format!("xl/{target}"), str::to_string)
                }));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// `cellXfs` entries resolved to their format codes.
fn parse_styles(xml: &[u8]) -> Result<Vec<Option<NumberFormat>>, StyleError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut custom: HashMap<u32, String> = HashMap::new();
    let mut xf_format_ids = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Event::End(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"numFmt" => {
                    if let (Some(id), Some(code)) =
                        (parse_number(&e, b"numFmtId"), attribute(&e, b"formatCode"))
                    {
                        custom.insert(id, code);
                    }
                }
                b"xf" if in_cell_xfs => {
                    xf_format_ids.push(parse_number::<u32>(&e, b"numFmtId").unwrap_or(0));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(xf_format_ids
        .into_iter()
        .map(|id| {
            let code = if id < FIRST_CUSTOM_FORMAT_ID {
                builtin_format(id)
            } else {
                custom.get(&id).map(String::as_str)
            };
            code.map(NumberFormat::parse)
        })
        .collect())
}

/// Style index of every `<c>` element carrying an `s` attribute.
fn parse_cell_styles(xml: &[u8]) -> Result<HashMap<(u32, u32), usize>, StyleError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut cells = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let position = attribute(&e, b"r").and_then(|r| parse_cell_ref(&r));
                if let (Some(position), Some(style)) = (position, parse_number(&e, b"s")) {
                    cells.insert(position, style);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(cells)
}

/// `"B12"` to zero-based `(11, 1)`.
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let col = letters.chars().try_fold(0_u32, |acc, c| {
        c.is_ascii_alphabetic()
            .then(|| acc * 26 + (u32::from(c.to_ascii_uppercase()) - u32::from('A') + 1))
    })?;
    let row: u32 = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col - 1))
}

/// Built-in format codes that do not depend on the reader's locale.
///
/// Ids 14 to 22 are short date and time formats whose rendering follows the
/// regional settings; those cells use the configured chrono formats instead.
const fn builtin_format(id: u32) -> Option<&'static str> {
    match id {
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        5 => Some("$#,##0_);($#,##0)"),
        6 => Some("$#,##0_);[Red]($#,##0)"),
        7 => Some("$#,##0.00_);($#,##0.00)"),
        8 => Some("$#,##0.00_);[Red]($#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        37 => Some("#,##0_);(#,##0)"),
        38 => Some("#,##0_);[Red](#,##0)"),
        39 => Some("#,##0.00_);(#,##0.00)"),
        40 => Some("#,##0.00_);[Red](#,##0.00)"),
        41 => Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
        42 => Some("_($* #,##0_);_($* (#,##0);_($* \"-\"_);_(@_)"),
        43 => Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
        44 => Some("_($* #,##0.00_);_($* (#,##0.00);_($* \"-\"??_);_(@_)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mm:ss.0"),
        48 => Some("##0.0E+0"),
        _ => None,
    }
}
