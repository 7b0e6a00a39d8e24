// Chart data reduction - raw rows into per-chart-kind render data
//
// The first column is always the category / x key and the second the value.
use super::row::Row;
use super::widget::ChartKind;
use serde::Serialize;

const IMPLICIT_SERIES: &str = "Series 1";
const IMPLICIT_GROUP: &str = "Group";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub category: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub id: String,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePoint {
    pub x: String,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub id: String,
    pub data: Vec<LinePoint>,
}

/// Summary statistics for one boxplot group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPlotGroup {
    pub group: String,
    /// Median of the group's values.
    pub mu: f64,
    /// Standard deviation measured around the median.
    pub sd: f64,
    pub n: usize,
    /// Always empty: outlier detection is not performed.
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartData {
    Bar {
        index_by: String,
        value_key: String,
        bars: Vec<Bar>,
    },
    Pie {
        slices: Vec<PieSlice>,
    },
    Line {
        series: Vec<LineSeries>,
    },
    Boxplot {
        groups: Vec<BoxPlotGroup>,
    },
}

impl ChartData {
    fn empty(kind: ChartKind) -> Self {
        match kind {
            ChartKind::Bar => Self::Bar {
                index_by: String::new(),
                value_key: String::new(),
                bars: Vec::new(),
            },
            ChartKind::Pie => Self::Pie { slices: Vec::new() },
            ChartKind::Line => Self::Line { series: Vec::new() },
            ChartKind::Boxplot => Self::Boxplot { groups: Vec::new() },
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bar { bars, .. } => bars.is_empty(),
            Self::Pie { slices } => slices.is_empty(),
            Self::Line { series } => series.is_empty(),
            Self::Boxplot { groups } => groups.is_empty(),
        }
    }
}

fn text_at(row: &Row, column: &str) -> String {
    row.get(column).map(|v| v.to_text()).unwrap_or_default()
}

fn number_at(row: &Row, column: &str) -> f64 {
    row.get(column).and_then(|v| v.to_number()).unwrap_or(0.0)
}

/// Keys are read from the first row; fewer than two columns yields an empty chart.
pub fn reduce(rows: &[Row], kind: ChartKind) -> ChartData {
    let Some(first) = rows.first() else {
        return ChartData::empty(kind);
    };
    let keys: Vec<String> = first.columns().map(str::to_string).collect();
    if keys.len() < 2 {
        return ChartData::empty(kind);
    }
    let x_key = &keys[0];
    let y_key = &keys[1];

    match kind {
        ChartKind::Bar => ChartData::Bar {
            index_by: x_key.clone(),
            value_key: y_key.clone(),
            bars: rows
                .iter()
                .map(|row| Bar {
                    category: text_at(row, x_key),
                    value: number_at(row, y_key),
                })
                .collect(),
        },
        ChartKind::Pie => ChartData::Pie {
            slices: rows
                .iter()
                .map(|row| {
                    let label = text_at(row, x_key);
                    PieSlice {
                        id: label.clone(),
                        label,
                        value: number_at(row, y_key),
                    }
                })
                .collect(),
        },
        ChartKind::Line => {
            let group_key = keys.get(2);
            let mut series: Vec<LineSeries> = Vec::new();
            for row in rows {
                let id = match group_key {
                    Some(key) => text_at(row, key),
                    None => IMPLICIT_SERIES.to_string(),
                };
                let point = LinePoint {
                    x: text_at(row, x_key),
                    y: number_at(row, y_key),
                };
                match series.iter_mut().find(|s| s.id == id) {
                    Some(existing) => existing.data.push(point),
                    None => series.push(LineSeries {
                        id,
                        data: vec![point],
                    }),
                }
            }
            ChartData::Line { series }
        }
        ChartKind::Boxplot => {
            let mut grouped: Vec<(String, Vec<f64>)> = Vec::new();
            for row in rows {
                let mut group = text_at(row, x_key);
                if group.is_empty() {
                    group = IMPLICIT_GROUP.to_string();
                }
                let values = keys[1..]
                    .iter()
                    .filter_map(|key| row.get(key).and_then(|v| v.to_number()));
                match grouped.iter_mut().find(|(g, _)| *g == group) {
                    Some((_, existing)) => existing.extend(values),
                    None => grouped.push((group, values.collect())),
                }
            }
            ChartData::Boxplot {
                groups: grouped
                    .into_iter()
                    .filter_map(|(group, values)| box_stats(group, values))
                    .collect(),
            }
        }
    }
}

fn box_stats(group: String, mut values: Vec<f64>) -> Option<BoxPlotGroup> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();
    let median = values[n / 2];
    let variance = values.iter().map(|v| (v - median).powi(2)).sum::<f64>() / n as f64;

    Some(BoxPlotGroup {
        group,
        mu: median,
        sd: variance.sqrt(),
        n,
        outliers: Vec::new(),
    })
}
