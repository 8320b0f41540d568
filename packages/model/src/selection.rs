use crate::error::ModelError;
use crate::path::Path;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Location in the document: a text run plus a character offset, or a void
/// node with offset zero.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: impl Into<Path>, offset: usize) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.offset)
    }
}

/// Parses `path:offset`, e.g. `0.1:4`. A missing offset means zero.
impl FromStr for Point {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, offset) = match s.split_once(':') {
            Some((path, offset)) => {
                let offset = offset
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| ModelError::invalid_point(s))?;
                (path, offset)
            }
            None => (s, 0),
        };
        Ok(Point {
            path: path.parse()?,
            offset,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_backward(&self) -> bool {
        self.focus < self.anchor
    }

    /// Endpoints in document order
    pub fn ordered(&self) -> (&Point, &Point) {
        if self.is_backward() {
            (&self.focus, &self.anchor)
        } else {
            (&self.anchor, &self.focus)
        }
    }

    pub fn start(&self) -> &Point {
        self.ordered().0
    }

    pub fn end(&self) -> &Point {
        self.ordered().1
    }
}
