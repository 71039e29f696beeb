//! YOLO label lines: `<label> <center_x> <center_y> <width> <height>`, six decimals, image y down.

use std::{fmt, str::FromStr};

use synthgen_core::Real;
use thiserror::Error;

use crate::{bbox::YoloBox, resolver::VisibilityRecord};

#[derive(Clone, Debug, PartialEq)]
pub struct YoloRecord {
    pub label: String,
    pub bbox: YoloBox,
}

impl From<&VisibilityRecord> for YoloRecord {
    fn from(record: &VisibilityRecord) -> Self {
        Self {
            label: record.label.clone(),
            bbox: record.bbox.to_yolo(),
        }
    }
}

impl fmt::Display for YoloRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.label, self.bbox.center_x, self.bbox.center_y, self.bbox.width, self.bbox.height
        )
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LabelParseError {
    #[error("expected 5 whitespace separated fields, found {0}")]
    FieldCount(usize),
    #[error("field `{field}` is not a number: {value:?}")]
    Number { field: &'static str, value: String },
    #[error("empty label")]
    EmptyLabel,
}

impl FromStr for YoloRecord {
    type Err = LabelParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        parse_label_line(line)
    }
}

/// One line per record, input order kept.
pub fn format_records(records: &[VisibilityRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| YoloRecord::from(r).to_string())
        .collect()
}

pub fn parse_label_line(line: &str) -> Result<YoloRecord, LabelParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [label, cx, cy, w, h] = fields[..] else {
        if fields.is_empty() {
            return Err(LabelParseError::EmptyLabel);
        }
        return Err(LabelParseError::FieldCount(fields.len()));
    };

    let number = |field: &'static str, value: &str| {
        value
            .parse::<Real>()
            .map_err(|_| LabelParseError::Number {
                field,
                value: value.to_string(),
            })
    };
    Ok(YoloRecord {
        label: label.to_string(),
        bbox: YoloBox {
            center_x: number("center_x", cx)?,
            center_y: number("center_y", cy)?,
            width: number("width", w)?,
            height: number("height", h)?,
        },
    })
}
