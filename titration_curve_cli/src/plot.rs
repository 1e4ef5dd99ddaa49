use std::panic;
use std::path::Path;

use anyhow::Result;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use titration_curve::sampler::PH_DISPLAY_RANGE;
use titration_curve::{Curve, Landmarks};

#[derive(Clone, Copy, Debug)]
pub enum ChartKind {
    Png,
    Svg,
}

impl ChartKind {
    pub fn from_path(path: &Path) -> ChartKind {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => ChartKind::Svg,
            _ => ChartKind::Png,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PlotOptions {
    pub title: String,
    /// Draw equivalence / half-equivalence markers. Off for quiz charts.
    pub show_landmarks: bool,
    /// Whether the half-equivalence marker is meaningful (weak titrations).
    pub show_half_equivalence: bool,
}

/// Render inside a panic guard; font lookup failures in the backends panic
/// rather than returning an error.
pub fn render_chart_guard(
    curve: &Curve,
    marks: &Landmarks,
    path: &Path,
    kind: ChartKind,
    opts: &PlotOptions,
) -> Result<(), String> {
    let render = || -> Result<(), String> {
        render_chart(curve, marks, path, kind, opts).map_err(|e| format!("plotting error: {e}"))
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
}

fn render_chart(
    curve: &Curve,
    marks: &Landmarks,
    path: &Path,
    kind: ChartKind,
    opts: &PlotOptions,
) -> Result<()> {
    if curve.is_empty() {
        return Ok(());
    }
    match kind {
        ChartKind::Png => {
            let root = BitMapBackend::new(path, (1024, 720)).into_drawing_area();
            draw_chart(root, curve, marks, opts)?;
        }
        ChartKind::Svg => {
            let root = SVGBackend::new(path, (1024, 720)).into_drawing_area();
            draw_chart(root, curve, marks, opts)?;
        }
    }
    Ok(())
}

fn draw_chart<DB>(
    root: DrawingArea<DB, plotters::coord::Shift>,
    curve: &Curve,
    marks: &Landmarks,
    opts: &PlotOptions,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let volumes_ml: Vec<f64> = curve.volumes().iter().map(|v| v * 1000.0).collect();
    let ph = curve.display_ph_values();
    let x_min = volumes_ml.first().copied().unwrap_or(0.0);
    let x_max = volumes_ml.last().copied().unwrap_or(1.0).max(x_min + 1e-6);
    let (ph_min, ph_max) = PH_DISPLAY_RANGE;

    root.fill(&WHITE)?;
    let title_font = FontDesc::new(FontFamily::SansSerif, 26.0, FontStyle::Normal);
    let mut chart = ChartBuilder::on(&root)
        .caption(&opts.title, title_font)
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 50)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(x_min..x_max, ph_min..ph_max)?;

    let axis_font = FontDesc::new(FontFamily::SansSerif, 18.0, FontStyle::Normal);
    chart
        .configure_mesh()
        .x_desc(format!(
            "Volume of {} added (mL)",
            curve.titration_type.titrant_name()
        ))
        .y_desc("pH")
        .x_label_formatter(&|v| format!("{:.0}", v))
        .y_label_formatter(&|v| format!("{:.0}", v))
        .label_style(axis_font.color(&BLACK.mix(0.85)))
        .draw()?;

    let curve_color = RGBColor(31, 119, 180);
    chart
        .draw_series(LineSeries::new(
            volumes_ml.iter().copied().zip(ph.iter().copied()),
            ShapeStyle {
                color: curve_color.to_rgba(),
                filled: false,
                stroke_width: 2,
            },
        ))?
        .label("Titration curve")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 30, y)], curve_color));

    if opts.show_landmarks {
        let mut markers = vec![(
            "Equivalence point",
            marks.equivalence_volume * 1000.0,
            marks.ph_at_equivalence,
            RGBColor(128, 128, 128),
        )];
        if opts.show_half_equivalence {
            markers.push((
                "Half-equivalence (pH = pKa)",
                marks.half_equivalence_volume * 1000.0,
                marks.ph_at_half_equivalence,
                RGBColor(44, 160, 44),
            ));
        }
        for (label, x, y, color) in markers {
            if x < x_min || x > x_max {
                continue;
            }
            chart
                .draw_series(LineSeries::new(vec![(x, ph_min), (x, ph_max)], &color.mix(0.6)))?
                .label(label)
                .legend(move |(lx, ly)| PathElement::new(vec![(lx, ly), (lx + 30, ly)], color));
            chart.draw_series(std::iter::once(Circle::new(
                (x, y.clamp(ph_min, ph_max)),
                5,
                color.filled(),
            )))?;
        }
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK.mix(0.3))
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;

    root.present()?;
    Ok(())
}
