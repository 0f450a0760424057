//! SVG charts rendered with plotters
//!
//! Charts are rendered to strings so the report can embed them inline; the
//! pipeline also writes each one to its own `.svg` file.

use crate::error::{AnalysisError, Result};
use plotters::prelude::*;

const PANEL_WIDTH: u32 = 460;
const HEIGHT: u32 = 480;
const FONT: &str = "sans-serif";

const PALETTE: [RGBColor; 3] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
];

/// One bar with its standard error
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub mean: f64,
    pub se: f64,
}

/// A bar panel with text lines drawn at fixed positions above the bars
#[derive(Debug, Clone, PartialEq)]
pub struct BarPanel {
    pub title: String,
    pub bars: Vec<Bar>,
    pub annotations: Vec<String>,
}

/// One line per series of (value, relative frequency) points
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyPanel {
    pub title: String,
    pub series: Vec<(String, Vec<(f64, f64)>)>,
}

/// A rendered chart
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Output file stem, e.g. `give_by_treatment`
    pub name: String,
    pub title: String,
    pub svg: String,
}

type Panel<'a> = DrawingArea<SVGBackend<'a>, plotters::coord::Shift>;
type DrawResult = std::result::Result<(), DrawingAreaErrorKind<std::io::Error>>;

fn render_err<E: std::fmt::Display>(what: &str, e: E) -> AnalysisError {
    AnalysisError::Render {
        what: what.to_string(),
        reason: e.to_string(),
    }
}

/// Mean ± SE bars, one panel per entry
pub fn mean_se_chart(name: &str, title: &str, y_desc: &str, panels: &[BarPanel]) -> Result<Chart> {
    if panels.is_empty() {
        return Err(render_err(title, "no panels to draw"));
    }
    let mut svg = String::new();
    {
        let size = (PANEL_WIDTH * panels.len() as u32, HEIGHT);
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(|e| render_err(title, e))?;
        let root = root
            .titled(title, (FONT, 22))
            .map_err(|e| render_err(title, e))?;

        for (area, panel) in root.split_evenly((1, panels.len())).iter().zip(panels) {
            draw_bar_panel(area, panel, y_desc).map_err(|e| render_err(title, e))?;
        }
        root.present().map_err(|e| render_err(title, e))?;
    }
    Ok(Chart {
        name: name.to_string(),
        title: title.to_string(),
        svg,
    })
}

fn draw_bar_panel(
    area: &Panel<'_>,
    panel: &BarPanel,
    y_desc: &str,
) -> DrawResult {
    let top = panel
        .bars
        .iter()
        .map(|b| b.mean + if b.se.is_finite() { b.se } else { 0.0 })
        .fold(1.0_f64, f64::max);
    // Headroom for the annotation lines
    let y_max = top * (1.35 + 0.12 * panel.annotations.len() as f64);
    let n = panel.bars.len() as u32;
    let labels: Vec<String> = panel.bars.iter().map(|b| b.label.clone()).collect();

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (FONT, 18))
        .margin(12)
        .x_label_area_size(36)
        .y_label_area_size(48)
        .build_cartesian_2d((0u32..n).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc(y_desc)
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    chart.draw_series(panel.bars.iter().enumerate().map(|(i, bar)| {
        let i = i as u32;
        let color = PALETTE[i as usize % PALETTE.len()];
        let mut rect = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), bar.mean)],
            color.mix(0.75).filled(),
        );
        rect.set_margin(0, 0, 14, 14);
        rect
    }))?;

    chart.draw_series(
        panel
            .bars
            .iter()
            .enumerate()
            .filter(|(_, bar)| bar.se.is_finite())
            .map(|(i, bar)| {
                ErrorBar::new_vertical(
                    SegmentValue::CenterOf(i as u32),
                    bar.mean - bar.se,
                    bar.mean,
                    bar.mean + bar.se,
                    BLACK.stroke_width(2),
                    12,
                )
            }),
    )?;

    for (line, text) in panel.annotations.iter().enumerate() {
        area.draw(&Text::new(
            text.clone(),
            (64, 44 + 17 * line as i32),
            (FONT, 13).into_font(),
        ))?;
    }
    Ok(())
}

/// Relative frequency lines, one panel per entry
pub fn frequency_chart(name: &str, title: &str, x_desc: &str, panels: &[FrequencyPanel]) -> Result<Chart> {
    if panels.is_empty() {
        return Err(render_err(title, "no panels to draw"));
    }
    let mut svg = String::new();
    {
        let size = (PANEL_WIDTH * panels.len() as u32, HEIGHT);
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(|e| render_err(title, e))?;
        let root = root
            .titled(title, (FONT, 22))
            .map_err(|e| render_err(title, e))?;

        for (area, panel) in root.split_evenly((1, panels.len())).iter().zip(panels) {
            draw_frequency_panel(area, panel, x_desc).map_err(|e| render_err(title, e))?;
        }
        root.present().map_err(|e| render_err(title, e))?;
    }
    Ok(Chart {
        name: name.to_string(),
        title: title.to_string(),
        svg,
    })
}

fn draw_frequency_panel(
    area: &Panel<'_>,
    panel: &FrequencyPanel,
    x_desc: &str,
) -> DrawResult {
    let points = panel.series.iter().flat_map(|(_, pts)| pts.iter());
    let (x_max, y_max) = points.fold((1.0_f64, 0.05_f64), |(x, y), &(px, py)| (x.max(px), y.max(py)));

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (FONT, 18))
        .margin(12)
        .x_label_area_size(36)
        .y_label_area_size(48)
        .build_cartesian_2d(0f64..x_max, 0f64..y_max * 1.15)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("Relative frequency")
        .draw()?;

    for (idx, (label, pts)) in panel.series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        chart
            .draw_series(LineSeries::new(pts.iter().copied(), color.stroke_width(2)))?
            .label(label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2)));
        chart.draw_series(pts.iter().map(|&p| Circle::new(p, 3, color.filled())))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}
