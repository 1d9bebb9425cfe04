//! Tile identifiers.
//!
//! Grammar:
//!
//! ```text
//! tile-id   = dataset *( "|" key ":" value ) "." zoom 1*2( "." position ) [ "." transform ]
//! zoom      = 1*DIGIT
//! position  = [ "-" ] 1*DIGIT
//! transform = 1*( any char except "." )
//! ```
//!
//! The number of positions is fixed by the dataset (1 for signal tracks, 2 for
//! matrices), so parsing needs to know the dimensionality up front; use
//! [`dataset_of`] to find the dataset first.
//!
//! Examples: `abc.3.5`, `abc.3.5.KR`, `hic.4.2.3`, `abc|cos:hg38.2.1`.

use std::fmt;

use crate::error::TileError;

/// Transform used when an identifier does not name one.
pub const DEFAULT_TRANSFORM: &str = "default";

/// Option key selecting an alternate chromosome-size set.
pub const CHROMSIZES_OPTION: &str = "cos";

/// A `key:value` option attached to the dataset id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileOption {
    pub key: String,
    pub value: String,
}

/// A parsed tile address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileCoordinate {
    /// Dataset the tile belongs to
    pub dataset_id: String,

    /// Options attached to the dataset id, in identifier order
    pub options: Vec<TileOption>,

    /// Zoom level (0 = whole extent)
    pub zoom: u32,

    /// Tile position, one entry per data dimension
    pub position: Vec<i64>,

    /// Value transform; [`DEFAULT_TRANSFORM`] when not given
    pub transform: String,
}

impl TileCoordinate {
    /// Parse an identifier whose dataset has `dimensions` position fields.
    pub fn parse(id: &str, dimensions: usize) -> Result<Self, TileError> {
        let mut fields = id.split('.');

        // split always yields at least one field
        let head = fields.next().unwrap_or_default();
        let (dataset_id, options) = parse_head(id, head)?;

        let zoom_field = fields
            .next()
            .ok_or_else(|| TileError::malformed(id, "missing zoom level"))?;
        let zoom = Some(zoom_field)
            .filter(|f| f.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|f| f.parse::<u32>().ok())
            .ok_or_else(|| TileError::malformed(id, format!("invalid zoom level {zoom_field:?}")))?;

        let mut position = Vec::with_capacity(dimensions);
        for _ in 0..dimensions {
            let field = fields.next().ok_or_else(|| {
                TileError::malformed(id, format!("expected {dimensions} position field(s)"))
            })?;
            let value = parse_position(field).ok_or_else(|| {
                TileError::malformed(id, format!("invalid position {field:?}"))
            })?;
            position.push(value);
        }

        let transform = match fields.next() {
            None => DEFAULT_TRANSFORM.to_string(),
            Some("") => return Err(TileError::malformed(id, "empty transform")),
            Some(transform) => transform.to_string(),
        };

        if fields.next().is_some() {
            return Err(TileError::malformed(id, "unexpected trailing fields"));
        }

        Ok(Self {
            dataset_id: dataset_id.to_string(),
            options,
            zoom,
            position,
            transform,
        })
    }

    /// Value of option `key`, if present.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.key == key)
            .map(|o| o.value.as_str())
    }

    /// Alternate chromosome-size set requested by this tile.
    pub fn chromsizes_selector(&self) -> Option<&str> {
        self.option(CHROMSIZES_OPTION)
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dataset_id)?;
        for option in &self.options {
            write!(f, "|{}:{}", option.key, option.value)?;
        }
        write!(f, ".{}", self.zoom)?;
        for p in &self.position {
            write!(f, ".{p}")?;
        }
        write!(f, ".{}", self.transform)
    }
}

impl AsRef<TileCoordinate> for TileCoordinate {
    fn as_ref(&self) -> &TileCoordinate {
        self
    }
}

/// Dataset id of an identifier, without options or coordinates.
pub fn dataset_of(id: &str) -> Result<&str, TileError> {
    let head = id.split('.').next().unwrap_or_default();
    let dataset_id = head.split('|').next().unwrap_or_default();
    if dataset_id.is_empty() {
        return Err(TileError::malformed(id, "empty dataset id"));
    }
    Ok(dataset_id)
}

fn parse_head<'a>(id: &str, head: &'a str) -> Result<(&'a str, Vec<TileOption>), TileError> {
    let mut parts = head.split('|');
    let dataset_id = parts.next().unwrap_or_default();
    if dataset_id.is_empty() {
        return Err(TileError::malformed(id, "empty dataset id"));
    }

    let options = parts
        .map(|part| match part.split_once(':') {
            Some((key, value)) if !key.is_empty() => Ok(TileOption {
                key: key.to_string(),
                value: value.to_string(),
            }),
            _ => Err(TileError::malformed(
                id,
                format!("option {part:?} is not key:value"),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((dataset_id, options))
}

fn parse_position(field: &str) -> Option<i64> {
    let digits = field.strip_prefix('-').unwrap_or(field);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

// =============================================================================
// Tests
// =============================================================================
