use chrono::{DateTime, Utc};
use plotly::common::{Mode, Title};
use plotly::layout::Axis;
use plotly::{Layout, Plot, Scatter};

/// plotly.js build matching the `plotly` crate's generated markup.
pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.12.1.min.js";

/// Titles and element id for one line chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSpec {
    /// DOM id of the chart `<div>`; must be unique within the report.
    pub div_id: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series_name: String,
}

impl ChartSpec {
    pub fn cpu_usage() -> Self {
        Self {
            div_id: "cpu-usage-chart".to_string(),
            title: "Server CPU Usage (sar)".to_string(),
            x_label: "Time".to_string(),
            y_label: "CPU Usage (%)".to_string(),
            series_name: "CPU %user + %system".to_string(),
        }
    }

    pub fn latency() -> Self {
        Self {
            div_id: "latency-chart".to_string(),
            title: "Response Times (JMeter)".to_string(),
            x_label: "Time".to_string(),
            y_label: "Latency (ms)".to_string(),
            series_name: "elapsed".to_string(),
        }
    }
}

/// Render a time series as an embeddable HTML fragment.
///
/// The fragment pulls plotly.js from its CDN, so it only renders online.
/// Points are drawn in the order given.
pub fn render_line_chart(points: &[(DateTime<Utc>, f64)], spec: &ChartSpec) -> String {
    let x: Vec<String> = points
        .iter()
        .map(|(ts, _)| ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .collect();
    let y: Vec<f64> = points.iter().map(|(_, v)| *v).collect();

    let trace = Scatter::new(x, y)
        .mode(Mode::Lines)
        .name(&spec.series_name);

    let layout = Layout::new()
        .title(Title::new(&spec.title))
        .x_axis(Axis::new().title(Title::new(&spec.x_label)))
        .y_axis(Axis::new().title(Title::new(&spec.y_label)));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);

    format!(
        "<script src=\"{PLOTLY_CDN}\"></script>\n{}",
        plot.to_inline_html(Some(&spec.div_id))
    )
}
