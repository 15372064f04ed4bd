//! Histogram plots.
//!
//! Every numeric column is drawn as a 30-bin histogram panel. Panels are laid out on a grid at
//! most three panels wide, and the page grows in height to fit all of them. Grid cells beyond the
//! last panel are left blank.

use crate::artifacts::Artifact;
use crate::error::DatasetError;
use crate::table::Table;

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rect,
    Rgb,
};

/// Number of bins per histogram.
pub const BINS: usize = 30;
/// Maximum number of panels per grid row.
pub const MAX_GRID_COLUMNS: usize = 3;

// Dimensions in millimetres.
const PANEL_WIDTH: f32 = 100.0;
const PANEL_HEIGHT: f32 = 75.0;
const MARGIN: f32 = 10.0;
const PAD_LEFT: f32 = 16.0;
const PAD_RIGHT: f32 = 6.0;
const PAD_TOP: f32 = 12.0;
const PAD_BOTTOM: f32 = 12.0;

const TITLE_SIZE: f32 = 11.0;
const LABEL_SIZE: f32 = 7.0;

/// Equal-width histogram of a set of values
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    /// Lower edge of the first bin
    pub lower: f64,
    /// Upper edge of the last bin
    pub upper: f64,
    /// Number of values in each bin
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` into `bins` equal-width bins spanning their range.
    ///
    /// All bins are half-open except the last, which includes the maximum. A set of identical
    /// values is given a unit-wide range centred on the value, and an empty set the range 0 to 1.
    /// With no bins, no values are counted.
    pub fn new(values: &[f64], bins: usize) -> Self {
        let (lower, upper) = match values.iter().copied().fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        }) {
            None => (0.0, 1.0),
            Some((lo, hi)) if lo == hi => (lo - 0.5, hi + 0.5),
            Some(range) => range,
        };

        let mut counts = vec![0; bins];
        if bins == 0 {
            return Histogram {
                lower,
                upper,
                counts,
            };
        }
        let width = (upper - lower) / bins as f64;
        for v in values {
            let index = ((v - lower) / width).floor() as usize;
            counts[index.min(bins - 1)] += 1;
        }
        Histogram {
            lower,
            upper,
            counts,
        }
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Return the number of grid (columns, rows) needed for `panels` panels.
pub fn grid_shape(panels: usize) -> (usize, usize) {
    let columns = panels.clamp(1, MAX_GRID_COLUMNS);
    (columns, panels.div_ceil(columns).max(1))
}

fn pdf_error<E: std::fmt::Debug>(err: E) -> DatasetError {
    DatasetError::Plot {
        reason: format!("{:?}", err),
    }
}

/// Format an axis label compactly.
fn format_tick(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e9 {
        format!("{}", value as i64)
    } else if value.abs() >= 1e5 || value.abs() < 1e-3 {
        format!("{:.2e}", value)
    } else {
        format!("{:.3}", value)
    }
}

fn line(layer: &PdfLayerReference, from: (f32, f32), to: (f32, f32)) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(from.0), Mm(from.1)), false),
            (Point::new(Mm(to.0), Mm(to.1)), false),
        ],
        is_closed: false,
    });
}

/// Draw one histogram panel whose top-left corner is at (`left`, `top`).
fn draw_panel(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    title: &str,
    histogram: &Histogram,
    left: f32,
    top: f32,
) {
    let x0 = left + PAD_LEFT;
    let x1 = left + PANEL_WIDTH - PAD_RIGHT;
    let y0 = top - PANEL_HEIGHT + PAD_BOTTOM;
    let y1 = top - PAD_TOP;

    let black = Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None));
    layer.set_fill_color(black.clone());
    layer.use_text(title, TITLE_SIZE, Mm(x0), Mm(top - PAD_TOP / 2.0), font);

    // Bars
    let max_count = histogram.max_count().max(1) as f32;
    let bar_width = (x1 - x0) / histogram.counts.len() as f32;
    layer.set_fill_color(Color::Rgb(Rgb::new(0.12, 0.47, 0.71, None)));
    for (i, count) in histogram.counts.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        let bar_left = x0 + i as f32 * bar_width;
        let bar_top = y0 + (*count as f32 / max_count) * (y1 - y0);
        layer.add_rect(Rect::new(
            Mm(bar_left),
            Mm(y0),
            Mm(bar_left + bar_width),
            Mm(bar_top),
        ));
    }

    // Axes
    layer.set_outline_color(black.clone());
    layer.set_outline_thickness(0.5);
    line(layer, (x0, y0), (x1, y0));
    line(layer, (x0, y0), (x0, y1));

    // Tick labels
    layer.set_fill_color(black);
    let label_y = y0 - LABEL_SIZE * 0.6;
    layer.use_text(format_tick(histogram.lower), LABEL_SIZE, Mm(x0), Mm(label_y), font);
    layer.use_text(
        format_tick(histogram.upper),
        LABEL_SIZE,
        Mm(x1 - PAD_RIGHT * 2.0),
        Mm(label_y),
        font,
    );
    layer.use_text("0", LABEL_SIZE, Mm(left + 2.0), Mm(y0), font);
    layer.use_text(
        histogram.max_count().to_string(),
        LABEL_SIZE,
        Mm(left + 2.0),
        Mm(y1 - LABEL_SIZE * 0.3),
        font,
    );
}

/// One histogram panel and the position of its top-left corner on the page.
#[derive(Debug)]
struct Panel<'a> {
    title: &'a str,
    histogram: Histogram,
    left: f32,
    top: f32,
}

/// Page size, grid shape and panels for a table.
#[derive(Debug)]
struct Layout<'a> {
    page_width: f32,
    page_height: f32,
    grid: (usize, usize),
    panels: Vec<Panel<'a>>,
}

impl<'a> Layout<'a> {
    /// Lay out one panel per numeric column, filling grid rows left to right.
    fn new(table: &'a Table) -> Result<Self, DatasetError> {
        let series: Vec<(&str, Histogram)> = table
            .numeric_columns()
            .filter_map(|column| {
                column
                    .numeric_values()
                    .map(|values| (column.name.as_str(), Histogram::new(&values, BINS)))
            })
            .collect();
        if series.is_empty() {
            return Err(DatasetError::NoNumericColumns);
        }

        let grid = grid_shape(series.len());
        let (grid_columns, grid_rows) = grid;
        let page_width = 2.0 * MARGIN + grid_columns as f32 * PANEL_WIDTH;
        let page_height = 2.0 * MARGIN + grid_rows as f32 * PANEL_HEIGHT;
        let panels = series
            .into_iter()
            .enumerate()
            .map(|(i, (title, histogram))| Panel {
                title,
                histogram,
                left: MARGIN + (i % grid_columns) as f32 * PANEL_WIDTH,
                top: page_height - MARGIN - (i / grid_columns) as f32 * PANEL_HEIGHT,
            })
            .collect();
        Ok(Layout {
            page_width,
            page_height,
            grid,
            panels,
        })
    }
}

/// Render a histogram of every numeric column into a PDF document.
pub struct HistogramPlot {}

impl Artifact for HistogramPlot {
    type Output = Vec<u8>;

    fn generate(table: &Table) -> Result<Vec<u8>, DatasetError> {
        let layout = Layout::new(table)?;

        let (doc, page, layer) = PdfDocument::new(
            "Histograms",
            Mm(layout.page_width),
            Mm(layout.page_height),
            "Histograms",
        );
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?;
        {
            let layer = doc.get_page(page).get_layer(layer);
            for panel in &layout.panels {
                draw_panel(
                    &layer,
                    &font,
                    panel.title,
                    &panel.histogram,
                    panel.left,
                    panel.top,
                );
            }
        }
        tracing::debug!(
            "rendered {} histogram panels on a {}x{} grid",
            layout.panels.len(),
            layout.grid.0,
            layout.grid.1
        );

        doc.save_to_bytes().map_err(pdf_error)
    }
}
