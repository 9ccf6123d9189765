use std::fmt;

use serde::Serialize;

use super::{
    color::Bgr,
    geometry::{ClosedShape, LineGeometry},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTarget {
    pub shape: ClosedShape,
    pub pen_color: Bgr,
    pub pen_width: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineTarget {
    pub line: LineGeometry,
    pub pen_color: Bgr,
    pub pen_width: u32,
    pub note_text: Option<String>,
    pub label_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowMode {
    #[default]
    None,
    Start,
    End,
    Both,
}

impl ArrowMode {
    pub fn from_ends(start: bool, end: bool) -> Self {
        match (start, end) {
            (false, false) => ArrowMode::None,
            (true, false) => ArrowMode::Start,
            (false, true) => ArrowMode::End,
            (true, true) => ArrowMode::Both,
        }
    }

    pub fn has_start(self) -> bool {
        matches!(self, ArrowMode::Start | ArrowMode::Both)
    }

    pub fn has_end(self) -> bool {
        matches!(self, ArrowMode::End | ArrowMode::Both)
    }
}

impl fmt::Display for ArrowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArrowMode::None => "none",
            ArrowMode::Start => "start",
            ArrowMode::End => "end",
            ArrowMode::Both => "both",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "pattern", rename_all = "lowercase")]
pub enum LinePattern {
    #[default]
    Solid,
    Dashed {
        #[serde(rename = "dash_pattern_length")]
        dash_length: u32,
        #[serde(rename = "dash_gap_length")]
        gap_length: u32,
    },
}

impl LinePattern {
    pub fn is_dashed(&self) -> bool {
        matches!(self, LinePattern::Dashed { .. })
    }
}

impl fmt::Display for LinePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinePattern::Solid => f.write_str("solid"),
            LinePattern::Dashed {
                dash_length,
                gap_length,
            } => write!(f, "dashed({dash_length}on/{gap_length}off)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeAlignment {
    #[serde(flatten)]
    pub shape: ClosedShape,
    pub pen_width: u32,
    pub pen_color: Bgr,
}

impl ShapeAlignment {
    /// The target echoed back untouched.
    pub fn unchanged(target: &ShapeTarget) -> Self {
        Self {
            shape: target.shape,
            pen_width: target.pen_width,
            pen_color: target.pen_color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineAlignment {
    #[serde(flatten)]
    pub line: LineGeometry,
    pub pen_width: u32,
    pub pen_color: Bgr,
    pub arrow_mode: ArrowMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrow_size: Option<f32>,
    #[serde(flatten)]
    pub pattern: LinePattern,
}

impl LineAlignment {
    /// The target echoed back untouched, without arrowheads.
    pub fn unchanged(target: &LineTarget) -> Self {
        Self {
            line: target.line,
            pen_width: target.pen_width,
            pen_color: target.pen_color,
            arrow_mode: ArrowMode::None,
            arrow_size: None,
            pattern: LinePattern::Solid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_mode_from_ends() {
        assert_eq!(ArrowMode::from_ends(false, false), ArrowMode::None);
        assert_eq!(ArrowMode::from_ends(false, true), ArrowMode::End);
        assert!(ArrowMode::Both.has_start() && ArrowMode::Both.has_end());
        assert!(!ArrowMode::End.has_start());
        assert_eq!(ArrowMode::Start.to_string(), "start");
    }

    #[test]
    fn unchanged_line_has_no_arrow() {
        let target = LineTarget {
            line: LineGeometry::new(1.0, 2.0, 3.0, 4.0),
            pen_color: Bgr::BLACK,
            pen_width: 3,
            ..Default::default()
        };
        let result = LineAlignment::unchanged(&target);
        assert_eq!(result.line, target.line);
        assert_eq!(result.arrow_mode, ArrowMode::None);
        assert_eq!(result.pattern, LinePattern::Solid);
    }
}
