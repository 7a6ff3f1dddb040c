//! Evolution chart rendering (plotters)
//!
//! Temperature on the left axis and C-reactive protein on the right. When no
//! observation carries either value, the relapse risk from evolution notes is
//! plotted instead.

use image::{DynamicImage, ImageFormat, RgbImage};
use plotters::prelude::*;

use crate::models::{ClinicalObservation, EvolutionNote};

/// Default raster size; 6x3 inch at 100 dpi
pub const CHART_WIDTH_PX: u32 = 600;
pub const CHART_HEIGHT_PX: u32 = 300;

const COLOR_TEMPERATURE: RGBColor = RGBColor(214, 39, 40);
const COLOR_CRP: RGBColor = RGBColor(31, 119, 180);
const COLOR_RISK: RGBColor = RGBColor(44, 160, 44);

/// PNG chart ready to be embedded
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl RenderedChart {
    pub fn new(png: Vec<u8>, width_px: u32, height_px: u32) -> Self {
        Self {
            png,
            width_px,
            height_px,
        }
    }

    /// Height over width
    pub fn aspect_ratio(&self) -> Option<f32> {
        if self.width_px == 0 || self.height_px == 0 {
            None
        } else {
            Some(self.height_px as f32 / self.width_px as f32)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: &'static str,
    /// (x index, value); indices with no value are skipped
    pub points: Vec<(i32, f64)>,
}

/// Plottable data extracted from the clinical sequences
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionSeries {
    /// One label per x index (MM/DD)
    pub labels: Vec<String>,
    pub primary: Series,
    pub secondary: Option<Series>,
}

pub fn evolution_series(
    observations: &[ClinicalObservation],
    notes: &[EvolutionNote],
) -> Option<EvolutionSeries> {
    let temperature = collect(observations, |o| o.temperature);
    let crp = collect(observations, |o| o.crp_mg_l);

    if !temperature.is_empty() || !crp.is_empty() {
        let labels = observations.iter().map(|o| short_date(&o.timestamp)).collect();
        // CRP alone goes on the primary axis
        let (primary, secondary) = if temperature.is_empty() {
            (Series { label: "CRP (mg/L)", points: crp }, None)
        } else {
            let secondary = (!crp.is_empty()).then_some(Series {
                label: "CRP (mg/L)",
                points: crp,
            });
            (Series { label: "Temperature (C)", points: temperature }, secondary)
        };
        return Some(EvolutionSeries {
            labels,
            primary,
            secondary,
        });
    }

    let risk = collect(notes, |n| n.relapse_risk.map(|r| r * 100.0));
    if risk.is_empty() {
        return None;
    }
    Some(EvolutionSeries {
        labels: notes.iter().map(|n| short_date(&n.timestamp)).collect(),
        primary: Series {
            label: "Relapse risk (%)",
            points: risk,
        },
        secondary: None,
    })
}

fn collect<T>(items: &[T], value: impl Fn(&T) -> Option<f64>) -> Vec<(i32, f64)> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| value(item).filter(|v| v.is_finite()).map(|v| (i as i32, v)))
        .collect()
}

/// "2025-03-04T08:00:00" -> "03/04"
fn short_date(timestamp: &str) -> String {
    let date = timestamp.split(|c: char| c == 'T' || c == ' ').next().unwrap_or(timestamp);
    date.split('-').skip(1).collect::<Vec<_>>().join("/")
}

/// Value range with 10% headroom; flat series get +/- 1
fn padded_range(points: &[(i32, f64)]) -> (f64, f64) {
    let min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if (max - min).abs() < f64::EPSILON {
        return (min - 1.0, max + 1.0);
    }
    let pad = (max - min) * 0.1;
    (min - pad, max + pad)
}

/// Render the evolution chart as PNG
pub fn render_evolution_chart(
    observations: &[ClinicalObservation],
    notes: &[EvolutionNote],
    width: u32,
    height: u32,
) -> Result<RenderedChart, String> {
    let data = evolution_series(observations, notes).ok_or("No data to chart")?;
    let n = data.labels.len().max(1) as i32;
    let primary_color = if data.primary.label.starts_with("Relapse") {
        COLOR_RISK
    } else if data.primary.label.starts_with("CRP") {
        COLOR_CRP
    } else {
        COLOR_TEMPERATURE
    };

    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        let (y_min, y_max) = padded_range(&data.primary.points);
        let (y2_min, y2_max) = data
            .secondary
            .as_ref()
            .map(|s| padded_range(&s.points))
            .unwrap_or((0.0, 1.0));

        let mut chart = ChartBuilder::on(&root)
            .caption("Clinical evolution and biomarkers", ("sans-serif", 18))
            .margin(15)
            .x_label_area_size(35)
            .y_label_area_size(50)
            .right_y_label_area_size(if data.secondary.is_some() { 50 } else { 0 })
            .build_cartesian_2d(0..n, y_min..y_max)
            .map_err(|e| e.to_string())?
            .set_secondary_coord(0..n, y2_min..y2_max);

        chart
            .configure_mesh()
            .x_labels(data.labels.len().min(10))
            .x_label_formatter(&|x| {
                data.labels
                    .get(*x as usize)
                    .filter(|_| *x >= 0)
                    .cloned()
                    .unwrap_or_default()
            })
            .x_desc("Date")
            .y_desc(data.primary.label)
            .draw()
            .map_err(|e| e.to_string())?;

        chart
            .draw_series(LineSeries::new(
                data.primary.points.clone(),
                primary_color.stroke_width(2),
            ))
            .map_err(|e| e.to_string())?
            .label(data.primary.label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], primary_color.stroke_width(2))
            });

        chart
            .draw_series(
                data.primary
                    .points
                    .iter()
                    .map(|(x, y)| Circle::new((*x, *y), 3, primary_color.filled())),
            )
            .map_err(|e| e.to_string())?;

        if let Some(secondary) = &data.secondary {
            chart
                .configure_secondary_axes()
                .y_desc(secondary.label)
                .draw()
                .map_err(|e| e.to_string())?;

            chart
                .draw_secondary_series(LineSeries::new(
                    secondary.points.clone(),
                    COLOR_CRP.stroke_width(2),
                ))
                .map_err(|e| e.to_string())?
                .label(secondary.label)
                .legend(|(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], COLOR_CRP.stroke_width(2))
                });

            chart
                .draw_secondary_series(
                    secondary
                        .points
                        .iter()
                        .map(|(x, y)| Cross::new((*x, *y), 4, COLOR_CRP.stroke_width(2))),
                )
                .map_err(|e| e.to_string())?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(|e| e.to_string())?;

        root.present().map_err(|e| e.to_string())?;
    }

    let png = encode_png(buffer, width, height)?;
    Ok(RenderedChart::new(png, width, height))
}

/// Encode a packed RGB buffer as PNG
pub fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, String> {
    let img = RgbImage::from_raw(width, height, buffer).ok_or("Failed to create image from buffer")?;

    let mut png_bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    Ok(png_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(ts: &str, temperature: Option<f64>, crp: Option<f64>) -> ClinicalObservation {
        ClinicalObservation {
            timestamp: ts.into(),
            temperature,
            crp_mg_l: crp,
            ..Default::default()
        }
    }

    #[test]
    fn test_temperature_and_crp_on_two_axes() {
        let observations = vec![
            obs("2025-03-01T08:00:00", Some(38.4), Some(120.0)),
            obs("2025-03-02T08:00:00", None, Some(80.0)),
            obs("2025-03-03T08:00:00", Some(37.1), None),
        ];
        let series = evolution_series(&observations, &[]).unwrap();
        assert_eq!(series.labels, ["03/01", "03/02", "03/03"]);
        assert_eq!(series.primary.label, "Temperature (C)");
        assert_eq!(series.primary.points, [(0, 38.4), (2, 37.1)]);
        assert_eq!(series.secondary.unwrap().points, [(0, 120.0), (1, 80.0)]);
    }

    #[test]
    fn test_crp_only_goes_primary() {
        let observations = vec![obs("2025-03-01", None, Some(12.0))];
        let series = evolution_series(&observations, &[]).unwrap();
        assert_eq!(series.primary.label, "CRP (mg/L)");
        assert!(series.secondary.is_none());
    }

    #[test]
    fn test_falls_back_to_relapse_risk() {
        let notes = vec![EvolutionNote {
            timestamp: "2025-03-05T10:00:00".into(),
            relapse_risk: Some(0.25),
            ..Default::default()
        }];
        let series = evolution_series(&[], &notes).unwrap();
        assert_eq!(series.primary.label, "Relapse risk (%)");
        assert_eq!(series.primary.points, [(0, 25.0)]);
    }

    #[test]
    fn test_nothing_to_chart() {
        assert!(evolution_series(&[], &[]).is_none());
        let err = render_evolution_chart(&[], &[], CHART_WIDTH_PX, CHART_HEIGHT_PX).unwrap_err();
        assert_eq!(err, "No data to chart");
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range(&[(0, 5.0)]), (4.0, 6.0));
        let (lo, hi) = padded_range(&[(0, 10.0), (1, 20.0)]);
        assert!((lo - 9.0).abs() < 1e-9 && (hi - 21.0).abs() < 1e-9);
        assert_eq!(padded_range(&[]), (0.0, 1.0));
    }

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(vec![255; 4 * 2 * 3], 4, 2).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
        assert!(encode_png(vec![0; 5], 4, 2).is_err());
    }

    #[test]
    fn test_aspect_ratio() {
        assert_eq!(RenderedChart::new(vec![], 500, 700).aspect_ratio(), Some(1.4));
        assert_eq!(RenderedChart::new(vec![], 0, 700).aspect_ratio(), None);
    }
}
