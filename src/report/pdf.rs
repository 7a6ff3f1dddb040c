//! PDF rendering (printpdf)
//!
//! Draws a finished [`DocumentPlan`]. No layout decisions are made here.

use std::io::BufWriter;

use printpdf::image_crate::{DynamicImage, GenericImageView};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Polygon, Rgb,
};

use crate::report::chart::RenderedChart;
use crate::report::error::{ReportError, ReportResult};
use crate::report::layout::{DocumentPlan, Element, FontStyle, Rgb8};

fn pt_to_mm(pt: f32) -> Mm {
    Mm(pt * 0.352_777_8)
}

fn rgb_to_printpdf((r, g, b): Rgb8) -> Color {
    Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> ReportResult<Self> {
        let font = |f| doc.add_builtin_font(f).map_err(|e| ReportError::Pdf(e.to_string()));
        Ok(Self {
            regular: font(BuiltinFont::Helvetica)?,
            bold: font(BuiltinFont::HelveticaBold)?,
            oblique: font(BuiltinFont::HelveticaOblique)?,
        })
    }

    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Oblique => &self.oblique,
        }
    }
}

/// Decode the chart PNG so a broken image is caught before layout
pub fn decode_chart(chart: &RenderedChart) -> ReportResult<DynamicImage> {
    if chart.aspect_ratio().is_none() {
        return Err(ReportError::ImagePlacement(format!(
            "chart has degenerate size {}x{}",
            chart.width_px, chart.height_px
        )));
    }
    let image = printpdf::image_crate::load_from_memory(&chart.png)
        .map_err(|e| ReportError::ImagePlacement(e.to_string()))?;
    // Layout sizes the block from the declared pixels; the drawn image must agree
    let (width, height) = image.dimensions();
    if (width, height) != (chart.width_px, chart.height_px) {
        return Err(ReportError::ImagePlacement(format!(
            "chart declared {}x{} but decodes to {}x{}",
            chart.width_px, chart.height_px, width, height
        )));
    }
    Ok(image)
}

/// Render the plan to PDF bytes; `chart` fills every chart slot in the plan
pub fn render_pdf(plan: &DocumentPlan, chart: Option<&DynamicImage>) -> ReportResult<Vec<u8>> {
    let width = pt_to_mm(plan.page_width);
    let height = pt_to_mm(plan.page_height);
    let (doc, first_page, first_layer) = PdfDocument::new(&plan.title, width, height, "Layer 1");
    let fonts = Fonts::load(&doc)?;

    for (index, page) in plan.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_idx, layer_idx) = doc.add_page(width, height, "Layer 1");
            doc.get_page(page_idx).get_layer(layer_idx)
        };

        for element in &page.elements {
            draw_element(&layer, &fonts, element, chart);
        }
    }

    let mut writer = BufWriter::new(Vec::new());
    doc.save(&mut writer).map_err(|e| ReportError::Pdf(e.to_string()))?;
    writer.into_inner().map_err(|e| ReportError::Pdf(e.to_string()))
}

fn draw_element(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    element: &Element,
    chart: Option<&DynamicImage>,
) {
    match element {
        Element::Text {
            x,
            y,
            size,
            font,
            color,
            text,
        } => {
            layer.set_fill_color(rgb_to_printpdf(*color));
            layer.use_text(text.as_str(), *size, pt_to_mm(*x), pt_to_mm(*y), fonts.get(*font));
        }
        Element::Rule {
            x1,
            x2,
            y,
            color,
            thickness,
        } => {
            layer.set_outline_color(rgb_to_printpdf(*color));
            layer.set_outline_thickness(*thickness);
            layer.add_line(Line {
                points: vec![
                    (Point::new(pt_to_mm(*x1), pt_to_mm(*y)), false),
                    (Point::new(pt_to_mm(*x2), pt_to_mm(*y)), false),
                ],
                is_closed: false,
            });
        }
        Element::Band {
            x,
            y,
            width,
            height,
            color,
        } => {
            let (x0, y0, x1, y1) = (
                pt_to_mm(*x),
                pt_to_mm(*y),
                pt_to_mm(x + width),
                pt_to_mm(y + height),
            );
            layer.set_fill_color(rgb_to_printpdf(*color));
            layer.add_polygon(Polygon {
                rings: vec![vec![
                    (Point::new(x0, y0), false),
                    (Point::new(x1, y0), false),
                    (Point::new(x1, y1), false),
                    (Point::new(x0, y1), false),
                ]],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
        }
        Element::Chart { x, y, width, .. } => {
            let Some(image) = chart else {
                tracing::warn!("Chart slot in layout but no decoded image; leaving it blank");
                return;
            };
            // Pick the dpi that maps the pixel width onto the slot width
            let dpi = image.width() as f32 * 72.0 / width;
            let transform = ImageTransform {
                translate_x: Some(pt_to_mm(*x)),
                translate_y: Some(pt_to_mm(*y)),
                dpi: Some(dpi),
                ..Default::default()
            };
            Image::from_dynamic_image(image).add_to_layer(layer.clone(), transform);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::chart::encode_png;
    use crate::report::layout::{PagePlan, COLOR_BLACK, COLOR_NAVY};

    fn sample_plan() -> DocumentPlan {
        let text = |y: f32, s: &str| Element::Text {
            x: 56.0,
            y,
            size: 10.0,
            font: FontStyle::Regular,
            color: COLOR_BLACK,
            text: s.to_string(),
        };
        DocumentPlan {
            title: "Test report".into(),
            page_width: 595.28,
            page_height: 841.89,
            pages: vec![
                PagePlan {
                    elements: vec![
                        text(780.0, "Page one"),
                        Element::Band {
                            x: 56.0,
                            y: 700.0,
                            width: 200.0,
                            height: 14.0,
                            color: COLOR_NAVY,
                        },
                        Element::Rule {
                            x1: 56.0,
                            x2: 538.0,
                            y: 690.0,
                            color: COLOR_BLACK,
                            thickness: 0.5,
                        },
                        Element::Chart {
                            x: 56.0,
                            y: 400.0,
                            width: 200.0,
                            height: 100.0,
                        },
                    ],
                },
                PagePlan {
                    elements: vec![text(780.0, "Page two")],
                },
            ],
        }
    }

    #[test]
    fn test_renders_pdf_bytes() {
        let bytes = render_pdf(&sample_plan(), None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_renders_with_chart() {
        let png = encode_png(vec![200; 20 * 10 * 3], 20, 10).unwrap();
        let chart = RenderedChart::new(png, 20, 10);
        let image = decode_chart(&chart).unwrap();
        let bytes = render_pdf(&sample_plan(), Some(&image)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let chart = RenderedChart::new(b"not a png".to_vec(), 10, 10);
        assert!(matches!(decode_chart(&chart), Err(ReportError::ImagePlacement(_))));

        let empty = RenderedChart::new(Vec::new(), 0, 0);
        assert!(matches!(decode_chart(&empty), Err(ReportError::ImagePlacement(_))));
    }

    #[test]
    fn test_decode_rejects_mismatched_dimensions() {
        let png = encode_png(vec![90; 300 * 600 * 3], 300, 600).unwrap();
        let chart = RenderedChart::new(png, 600, 300);
        match decode_chart(&chart) {
            Err(ReportError::ImagePlacement(msg)) => assert!(msg.contains("300x600")),
            other => panic!("unexpected: {:?}", other.map(|i| i.dimensions())),
        }
    }

    #[test]
    fn test_pt_to_mm() {
        assert!((pt_to_mm(72.0).0 - 25.4).abs() < 0.01);
    }
}
