//! Handoff to the external chart renderer.
//!
//! The renderer receives the derived table plus a [`ChartSpec`] naming the
//! chart kind and which columns feed which visual channel. Colours, fonts
//! and themes are the renderer's business.

use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::error::{CsvResult, PipelineResult};
use crate::table::Table;

/// Chart kinds the analyses produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    /// Bars along the y axis, first row on top
    HorizontalBar,
    /// Bars counted per x, stacked by fill
    StackedBar,
    /// Rectangles spanning `x_start..x_end`, centred on `y_center`
    Rect,
    Line,
}

/// Column → channel mapping. Unused channels are omitted from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_center: Option<String>,
}

impl Encoding {
    pub fn xy(x: &str, y: &str) -> Self {
        Self {
            x: Some(x.to_string()),
            y: Some(y.to_string()),
            ..Self::default()
        }
    }

    pub fn with_fill(mut self, fill: &str) -> Self {
        self.fill = Some(fill.to_string());
        self
    }

    /// Every column the encoding refers to.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        [
            &self.x,
            &self.y,
            &self.fill,
            &self.x_start,
            &self.x_end,
            &self.y_center,
        ]
        .into_iter()
        .filter_map(|c| c.as_deref())
    }
}

/// What to draw and how to label it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub encoding: Encoding,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, title: &str, encoding: Encoding) -> Self {
        Self {
            kind,
            title: title.to_string(),
            subtitle: None,
            x_label: None,
            y_label: None,
            caption: None,
            encoding,
        }
    }

    pub fn with_subtitle(mut self, subtitle: &str) -> Self {
        self.subtitle = Some(subtitle.to_string());
        self
    }

    pub fn with_labels(mut self, x: &str, y: &str) -> Self {
        self.x_label = Some(x.to_string());
        self.y_label = Some(y.to_string());
        self
    }

    pub fn with_caption(mut self, caption: &str) -> Self {
        self.caption = Some(caption.to_string());
        self
    }
}

/// Everything the renderer needs, as one JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct RenderHandoff<'a> {
    pub chart: &'a ChartSpec,
    pub table: &'a Table,
}

impl<'a> RenderHandoff<'a> {
    pub fn new(chart: &'a ChartSpec, table: &'a Table) -> Self {
        Self { chart, table }
    }

    /// Encoded columns the table does not have.
    pub fn missing_columns(&self) -> Vec<&'a str> {
        self.chart
            .encoding
            .columns()
            .filter(|c| self.table.schema().index_of(c).is_none())
            .collect()
    }

    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Write `table` as CSV with a header row. Nulls are empty fields.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> CsvResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.schema().names())?;
    for row in table.rows() {
        wtr.write_record(row.values().iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnType, Schema, Value};

    fn by_decade() -> Table {
        let schema = Schema::of(&[
            ("decade", ColumnType::Integer),
            ("winner_margin_min", ColumnType::Float),
        ])
        .unwrap();
        Table::new(
            schema,
            vec![
                vec![Value::Int(1910), Value::Float(90.5)],
                vec![Value::Int(1920), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_write_csv() {
        let mut out = Vec::new();
        write_csv(&by_decade(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "decade,winner_margin_min\n1910,90.5\n1920,\n"
        );
    }

    #[test]
    fn test_handoff_json() {
        let chart = ChartSpec::new(
            ChartKind::Line,
            "Tour de France margin of victory has been getting smaller",
            Encoding::xy("decade", "winner_margin_min"),
        )
        .with_labels("Decade", "Average victory margin (min)");
        let table = by_decade();
        let handoff = RenderHandoff::new(&chart, &table);
        assert!(handoff.missing_columns().is_empty());

        let json: serde_json::Value = serde_json::from_str(&handoff.to_json().unwrap()).unwrap();
        assert_eq!(json["chart"]["kind"], "line");
        assert_eq!(json["chart"]["encoding"]["y"], "winner_margin_min");
        assert!(json["chart"]["encoding"].get("fill").is_none());
        assert!(json["chart"].get("subtitle").is_none());
        assert_eq!(json["table"]["columns"][0]["type"], "integer");
        assert_eq!(json["table"]["rows"][1][1], serde_json::Value::Null);
    }

    #[test]
    fn test_missing_encoded_column() {
        let chart = ChartSpec::new(
            ChartKind::StackedBar,
            "African-American firsts",
            Encoding::xy("decade", "count").with_fill("category"),
        );
        let table = by_decade();
        assert_eq!(
            RenderHandoff::new(&chart, &table).missing_columns(),
            vec!["count", "category"]
        );
    }
}
