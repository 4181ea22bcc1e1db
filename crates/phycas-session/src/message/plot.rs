//! Rows streamed to the chart ingester.

use crate::xml::Element;

/// One cell of a plot row.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotValue {
    /// A numeric sample.
    Number(f64),
    /// A cell that did not parse as a number.
    Text(String),
}

impl PlotValue {
    fn parse(token: &str) -> Self {
        token
            .parse::<f64>()
            .map_or_else(|_| Self::Text(token.to_owned()), Self::Number)
    }
}

/// A child of a `plot` element.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotRow {
    /// Column labels; starts a new series.
    Labels(Vec<String>),
    /// One sample per column.
    Values(Vec<PlotValue>),
}

impl PlotRow {
    /// Decodes the children of a `plot` element.
    ///
    /// # Errors
    ///
    /// Returns a description of the first child that is neither `label` nor
    /// `entry`.
    pub fn from_plot(element: &Element) -> Result<Vec<Self>, String> {
        element
            .children()
            .iter()
            .map(|child| match child.name() {
                "label" => Ok(Self::Labels(
                    child.text().split_whitespace().map(str::to_owned).collect(),
                )),
                "entry" => Ok(Self::Values(
                    child.text().split_whitespace().map(PlotValue::parse).collect(),
                )),
                other => Err(format!("unexpected plot element '{other}'")),
            })
            .collect()
    }
}
