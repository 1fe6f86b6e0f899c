//! Root margin parsing.
//!
//! A root margin grows (or, with negative values, shrinks) the viewport
//! before intersections are computed, so a sentinel can be reported as
//! visible slightly before it actually scrolls into view. The syntax is the
//! CSS `margin` shorthand restricted to `px` and `%` lengths:
//!
//! | Input                  | top   | right | bottom | left  |
//! |------------------------|-------|-------|--------|-------|
//! | `100px`                | 100px | 100px | 100px  | 100px |
//! | `10px 5%`              | 10px  | 5%    | 10px   | 5%    |
//! | `10px 0 20px`          | 10px  | 0     | 20px   | 0     |
//! | `1px 2px 3px 4px`      | 1px   | 2px   | 3px    | 4px   |

use std::fmt;
use std::str::FromStr;

use cssparser::{
    BasicParseErrorKind, ParseError as CssParseError, ParseErrorKind, Parser, ParserInput, Token,
};
use serde::{Deserialize, Deserializer};

use crate::error::{Result, RevealError};
use crate::geometry::Rect;

/// One edge of a root margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginLength {
    /// Absolute length in layout pixels.
    Px(f32),
    /// Percentage of the viewport's size along the edge's axis.
    Percent(f32),
}

impl MarginLength {
    /// Resolve to pixels against the viewport extent along this edge's axis.
    pub fn resolve(self, extent: f32) -> f32 {
        match self {
            Self::Px(px) => px,
            Self::Percent(pct) => extent * pct / 100.0,
        }
    }
}

impl fmt::Display for MarginLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Px(px) => write!(f, "{px}px"),
            Self::Percent(pct) => write!(f, "{pct}%"),
        }
    }
}

/// Per-edge margin applied to the viewport before intersection tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    /// Growth above the viewport; percentages use its height.
    pub top: MarginLength,
    /// Growth to the right; percentages use the viewport width.
    pub right: MarginLength,
    /// Growth below the viewport; percentages use its height.
    pub bottom: MarginLength,
    /// Growth to the left; percentages use the viewport width.
    pub left: MarginLength,
}

impl RootMargin {
    /// No margin.
    pub const ZERO: RootMargin = RootMargin::uniform(MarginLength::Px(0.0));

    /// The same length on every edge.
    pub const fn uniform(length: MarginLength) -> Self {
        Self {
            top: length,
            right: length,
            bottom: length,
            left: length,
        }
    }

    /// A uniform pixel margin.
    pub const fn px(px: f32) -> Self {
        Self::uniform(MarginLength::Px(px))
    }

    /// Parse CSS margin shorthand (1 to 4 lengths).
    pub fn parse(input: &str) -> Result<Self> {
        let mut css_input = ParserInput::new(input);
        let mut parser = Parser::new(&mut css_input);
        let mut values = Vec::with_capacity(4);

        loop {
            parser.skip_whitespace();
            if parser.is_exhausted() {
                break;
            }
            if values.len() == 4 {
                let column = parser.current_source_location().column;
                return Err(RevealError::invalid_root_margin(
                    input,
                    "expected at most four lengths",
                    column,
                ));
            }
            match parse_margin_length(&mut parser) {
                Ok(length) => values.push(length),
                Err(err) => return Err(margin_error(input, err)),
            }
        }

        match values[..] {
            [all] => Ok(Self::uniform(all)),
            [vertical, horizontal] => Ok(Self {
                top: vertical,
                right: horizontal,
                bottom: vertical,
                left: horizontal,
            }),
            [top, horizontal, bottom] => Ok(Self {
                top,
                right: horizontal,
                bottom,
                left: horizontal,
            }),
            [top, right, bottom, left] => Ok(Self {
                top,
                right,
                bottom,
                left,
            }),
            _ => Err(RevealError::invalid_root_margin(
                input,
                "expected at least one length",
                1,
            )),
        }
    }

    /// Apply the margin to a viewport rectangle.
    ///
    /// Vertical percentages resolve against the viewport height, horizontal
    /// ones against its width.
    pub fn apply(&self, viewport: Rect) -> Rect {
        viewport.expand(
            self.top.resolve(viewport.height),
            self.right.resolve(viewport.width),
            self.bottom.resolve(viewport.height),
            self.left.resolve(viewport.width),
        )
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::px(100.0)
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

impl FromStr for RootMargin {
    type Err = RevealError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for RootMargin {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum MarginErrorKind {
    UnsupportedUnit(String),
    UnitlessNonZero,
}

/// Parse a single margin length.
fn parse_margin_length<'i>(
    parser: &mut Parser<'i, '_>,
) -> std::result::Result<MarginLength, CssParseError<'i, MarginErrorKind>> {
    let token = parser.next()?.clone();

    match token {
        // CSS `0` is a valid length without a unit.
        Token::Number { value, .. } if value == 0.0 => Ok(MarginLength::Px(0.0)),
        Token::Number { .. } => Err(parser.new_custom_error(MarginErrorKind::UnitlessNonZero)),
        Token::Dimension { value, unit, .. } => {
            if unit.eq_ignore_ascii_case("px") {
                Ok(MarginLength::Px(value))
            } else {
                Err(parser.new_custom_error(MarginErrorKind::UnsupportedUnit(
                    unit.as_ref().to_string(),
                )))
            }
        }
        Token::Percentage { unit_value, .. } => Ok(MarginLength::Percent(unit_value * 100.0)),
        other => Err(parser.new_unexpected_token_error(other)),
    }
}

fn margin_error(input: &str, err: CssParseError<'_, MarginErrorKind>) -> RevealError {
    let message = match err.kind {
        ParseErrorKind::Custom(MarginErrorKind::UnsupportedUnit(unit)) => {
            format!("unsupported unit '{unit}', expected px or %")
        }
        ParseErrorKind::Custom(MarginErrorKind::UnitlessNonZero) => {
            "non-zero lengths need a px or % unit".to_string()
        }
        ParseErrorKind::Basic(BasicParseErrorKind::EndOfInput) => {
            "unexpected end of input".to_string()
        }
        ParseErrorKind::Basic(BasicParseErrorKind::UnexpectedToken(token)) => {
            format!("unexpected token {token:?}")
        }
        ParseErrorKind::Basic(other) => format!("{other:?}"),
    };
    RevealError::invalid_root_margin(input, message, err.location.column)
}
