use std::fmt;

// ── Geometry ────────────────────────────────────────────────────────────────

/// A position in image space. One unit is one pixel of the decoded image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Line,
    Rectangle,
    Text,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Line, Kind::Rectangle, Kind::Text];

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Line => "line",
            Kind::Rectangle => "rectangle",
            Kind::Text => "text",
        }
    }

    /// Accepts the current names and the plural names older sidecars used.
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        match token {
            "line" | "lines" => Ok(Kind::Line),
            "rectangle" | "rectangles" => Ok(Kind::Rectangle),
            "text" => Ok(Kind::Text),
            other => Err(ParseError::UnknownKind(other.to_owned())),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finalized annotation.
///
/// Line and rectangle records always carry an endpoint and an empty text;
/// text records never carry an endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub kind: Kind,
    pub origin: Point,
    pub endpoint: Option<Point>,
    pub text: String,
}

impl Record {
    pub fn text(origin: Point, text: impl Into<String>) -> Self {
        Self {
            kind: Kind::Text,
            origin,
            endpoint: None,
            text: text.into(),
        }
    }

    pub(crate) fn shape(kind: Kind, origin: Point, endpoint: Point) -> Self {
        debug_assert!(kind != Kind::Text, "text records have no endpoint");
        Self {
            kind,
            origin,
            endpoint: Some(endpoint),
            text: String::new(),
        }
    }

    // ── Line codec ──────────────────────────────────────────────────────────

    /// Renders the record as one sidecar line, without the trailing newline.
    pub fn to_line(&self) -> String {
        let (x1, y1) = match self.endpoint {
            Some(p) => (Some(p.x), Some(p.y)),
            None => (None, None),
        };
        format!(
            "kind: {}, text: {}, x0: {}, y0: {}, x1: {}, y1: {}",
            self.kind,
            self.text,
            coord(Some(self.origin.x)),
            coord(Some(self.origin.y)),
            coord(x1),
            coord(y1),
        )
    }

    pub fn from_line(line: &str) -> Result<Self, ParseError> {
        let fields = Fields::split(line)?;
        let kind = Kind::parse(fields.kind.trim())?;

        let x0 = parse_coord("x0", fields.x0)?;
        let y0 = parse_coord("y0", fields.y0)?;
        let x1 = parse_coord("x1", fields.x1)?;
        let y1 = parse_coord("y1", fields.y1)?;

        let origin = Point::new(
            x0.ok_or(ParseError::MissingCoordinate { kind, field: "x0" })?,
            y0.ok_or(ParseError::MissingCoordinate { kind, field: "y0" })?,
        );

        match kind {
            Kind::Text => {
                if x1.is_some() || y1.is_some() {
                    return Err(ParseError::UnexpectedEndpoint);
                }
                Ok(Record::text(origin, fields.text))
            }
            Kind::Line | Kind::Rectangle => {
                if !fields.text.is_empty() {
                    return Err(ParseError::UnexpectedText { kind });
                }
                let endpoint = Point::new(
                    x1.ok_or(ParseError::MissingCoordinate { kind, field: "x1" })?,
                    y1.ok_or(ParseError::MissingCoordinate { kind, field: "y1" })?,
                );
                Ok(Record::shape(kind, origin, endpoint))
            }
        }
    }
}

#[cfg(test)]
impl Record {
    pub fn line(origin: Point, endpoint: Point) -> Self {
        Self::shape(Kind::Line, origin, endpoint)
    }

    pub fn rectangle(origin: Point, endpoint: Point) -> Self {
        Self::shape(Kind::Rectangle, origin, endpoint)
    }
}

fn coord(value: Option<f32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("unknown annotation kind `{0}`")]
    UnknownKind(String),
    #[error("field `{field}` is not a number: `{token}`")]
    InvalidNumber { field: &'static str, token: String },
    #[error("{kind} annotation is missing `{field}`")]
    MissingCoordinate { kind: Kind, field: &'static str },
    #[error("text annotation must not have an endpoint")]
    UnexpectedEndpoint,
    #[error("{kind} annotation must not carry text")]
    UnexpectedText { kind: Kind },
}

// ── Field grammar ───────────────────────────────────────────────────────────
//
// line   := kind-key ": " KIND ", text: " TEXT ", x0: " C ", y0: " C ", x1: " C ", y1: " C
// C      := "" | NUMBER | "None"
//
// The space after the final "y1:" may have been stripped. TEXT is raw and
// ends at the last ", x0: " of the line, so the coordinate tail is always
// found even when the text itself holds `,` or `:`.

struct Fields<'a> {
    kind: &'a str,
    text: &'a str,
    x0: &'a str,
    y0: &'a str,
    x1: &'a str,
    y1: &'a str,
}

impl<'a> Fields<'a> {
    fn split(line: &'a str) -> Result<Self, ParseError> {
        let line = line.trim_start().trim_end_matches(['\r', '\n']);
        let rest = ["kind: ", "objectType: "]
            .iter()
            .find_map(|key| line.strip_prefix(key))
            .ok_or(ParseError::MissingField("kind"))?;

        let (kind, rest) = rest
            .split_once(", text: ")
            .ok_or(ParseError::MissingField("text"))?;
        let (text, rest) = rest
            .rsplit_once(", x0: ")
            .ok_or(ParseError::MissingField("x0"))?;
        let (x0, rest) = rest
            .split_once(", y0: ")
            .ok_or(ParseError::MissingField("y0"))?;
        let (y0, rest) = rest
            .split_once(", x1: ")
            .ok_or(ParseError::MissingField("x1"))?;
        let (x1, y1) = rest
            .split_once(", y1:")
            .ok_or(ParseError::MissingField("y1"))?;

        Ok(Self {
            kind,
            text,
            x0,
            y0,
            x1,
            y1,
        })
    }
}

fn parse_coord(field: &'static str, token: &str) -> Result<Option<f32>, ParseError> {
    let token = token.trim();
    // "None" is what the first releases wrote for absent text endpoints.
    if token.is_empty() || token == "None" {
        return Ok(None);
    }
    let invalid = || ParseError::InvalidNumber {
        field,
        token: token.to_owned(),
    };
    if !is_numeric_literal(token) {
        return Err(invalid());
    }
    token.parse::<f32>().map(Some).map_err(|_| invalid())
}

/// `[+-]? (digits ("." digits?)? | "." digits) ([eE] [+-]? digits)?`
fn is_numeric_literal(token: &str) -> bool {
    let bytes = token.as_bytes();
    let mut i = 0;

    let digits = |i: &mut usize| {
        let start = *i;
        while *i < bytes.len() && bytes[*i].is_ascii_digit() {
            *i += 1;
        }
        *i - start
    };

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_digits = digits(&mut i);
    let mut frac_digits = 0;
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        frac_digits = digits(&mut i);
    }
    if int_digits == 0 && frac_digits == 0 {
        return false;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if digits(&mut i) == 0 {
            return false;
        }
    }
    i == bytes.len()
}
