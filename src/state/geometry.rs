//! Crop region geometry and its persisted text form
//!
//! Rectangles live in canvas-local coordinates, which are the template
//! image's pixel coordinates because the editor shows the image at 1:1.
//! They are stored in the template as JSON objects:
//! `{"x":10.0,"y":10.0,"width":100.0,"height":150.0}`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use crate::error::ParseError;

/// A pointer position on the crop canvas
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<iced::Point> for Point {
    fn from(p: iced::Point) -> Self {
        Self::new(f64::from(p.x), f64::from(p.y))
    }
}

/// An axis-aligned rectangle. Width and height are never negative.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub const ZERO: Rectangle = Rectangle {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Zero-size rectangle sitting on `point`
    pub fn at(point: Point) -> Self {
        Self::new(point.x, point.y, 0.0, 0.0)
    }

    /// Rectangle spanned by two opposite corners, in any order
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    /// A region counts as drawn only when it has area
    pub fn is_defined(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Which semantic crop a rectangle represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Photo,
    Number,
}

impl RegionKind {
    /// Order used whenever both regions are reported
    pub const ALL: [RegionKind; 2] = [RegionKind::Photo, RegionKind::Number];
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionKind::Photo => write!(f, "photo"),
            RegionKind::Number => write!(f, "number"),
        }
    }
}

/// One rectangle per region kind
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Regions {
    photo: Rectangle,
    number: Rectangle,
}

impl Regions {
    pub fn get(&self, kind: RegionKind) -> Rectangle {
        match kind {
            RegionKind::Photo => self.photo,
            RegionKind::Number => self.number,
        }
    }

    pub fn set(&mut self, kind: RegionKind, rect: Rectangle) {
        match kind {
            RegionKind::Photo => self.photo = rect,
            RegionKind::Number => self.number = rect,
        }
    }

    /// First region (photo before number) that has no area
    pub fn first_undefined(&self) -> Option<RegionKind> {
        RegionKind::ALL
            .into_iter()
            .find(|kind| !self.get(*kind).is_defined())
    }
}

/// Convert a rectangle to its persisted JSON form
pub fn serialize(rect: &Rectangle) -> String {
    // Serializing four f64 fields into a String cannot fail
    serde_json::to_string(rect).unwrap_or_default()
}

/// Quote bare object keys: `{x:10}` becomes `{"x":10}`
fn quote_bare_keys(text: &str) -> Cow<'_, str> {
    static BARE_KEY: OnceLock<Regex> = OnceLock::new();
    let bare_key = BARE_KEY.get_or_init(|| {
        Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:"#).expect("valid key pattern")
    });
    bare_key.replace_all(text, r#"$1"$2":"#)
}

/// Parse a persisted rectangle.
///
/// Accepts canonical JSON and the hand-written form with bare keys
/// (`{x:10,y:10,width:100,height:150}`).
pub fn deserialize(text: &str) -> Result<Rectangle, ParseError> {
    let rect: Rectangle = match serde_json::from_str(text) {
        Ok(rect) => rect,
        Err(strict) => serde_json::from_str(&quote_bare_keys(text))
            .map_err(|_| ParseError::Malformed(strict.to_string()))?,
    };

    for (field, value) in [
        ("x", rect.x),
        ("y", rect.y),
        ("width", rect.width),
        ("height", rect.height),
    ] {
        if !value.is_finite() {
            return Err(ParseError::NonFinite { field });
        }
    }
    if rect.width < 0.0 {
        return Err(ParseError::Negative { field: "width" });
    }
    if rect.height < 0.0 {
        return Err(ParseError::Negative { field: "height" });
    }

    Ok(rect)
}

/// Parse a persisted rectangle, falling back to the zero rectangle
pub fn deserialize_or_zero(kind: RegionKind, text: &str) -> Rectangle {
    match deserialize(text) {
        Ok(rect) => rect,
        Err(e) => {
            log::warn!("Ignoring stored {} region ({}), using an empty one", kind, e);
            Rectangle::ZERO
        }
    }
}
