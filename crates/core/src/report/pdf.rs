use crate::report::layout::{DrawOp, Font, Page, PageGeometry, RgbColor};
use anyhow::Context;
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Polygon,
    Rgb,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Writes laid-out pages to `path` using the built-in Helvetica faces.
pub fn write_pdf(
    pages: &[Page],
    geometry: &PageGeometry,
    title: &str,
    path: &Path,
) -> anyhow::Result<()> {
    anyhow::ensure!(!pages.is_empty(), "refusing to write a PDF without pages");

    let (doc, first_page, first_layer) =
        PdfDocument::new(title, mm(geometry.width), mm(geometry.height), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow::anyhow!("failed to load Helvetica: {e:?}"))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow::anyhow!("failed to load Helvetica-Bold: {e:?}"))?;
    let fonts = Fonts { regular, bold };

    for (idx, page) in pages.iter().enumerate() {
        let layer = if idx == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_idx, layer_idx) = doc.add_page(
                mm(geometry.width),
                mm(geometry.height),
                format!("Page {} Layer 1", idx + 1),
            );
            doc.get_page(page_idx).get_layer(layer_idx)
        };
        draw_page(&layer, page, &fonts);
    }

    let file = File::create(path)
        .with_context(|| format!("failed to create PDF file {}", path.display()))?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| anyhow::anyhow!("failed to write PDF {}: {e:?}", path.display()))?;
    Ok(())
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn get(&self, font: Font) -> &IndirectFontRef {
        match font {
            Font::Helvetica => &self.regular,
            Font::HelveticaBold => &self.bold,
        }
    }
}

fn draw_page(layer: &PdfLayerReference, page: &Page, fonts: &Fonts) {
    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                y,
                size,
                font,
                color,
                text,
            } => {
                layer.set_fill_color(color_of(*color));
                layer.use_text(text.as_str(), *size, mm(*x), mm(*y), fonts.get(*font));
            }
            DrawOp::FillRect { x, y, w, h, color } => {
                layer.set_fill_color(color_of(*color));
                layer.add_polygon(Polygon {
                    rings: vec![rect_points(*x, *y, *w, *h)],
                    mode: PaintMode::Fill,
                    winding_order: WindingOrder::NonZero,
                });
            }
            DrawOp::StrokeRect {
                x,
                y,
                w,
                h,
                color,
                line_width,
            } => {
                layer.set_outline_color(color_of(*color));
                layer.set_outline_thickness(*line_width);
                layer.add_line(Line {
                    points: rect_points(*x, *y, *w, *h),
                    is_closed: true,
                });
            }
        }
    }
}

fn rect_points(x: f32, y: f32, w: f32, h: f32) -> Vec<(Point, bool)> {
    vec![
        (Point::new(mm(x), mm(y)), false),
        (Point::new(mm(x + w), mm(y)), false),
        (Point::new(mm(x + w), mm(y + h)), false),
        (Point::new(mm(x), mm(y + h)), false),
    ]
}

fn color_of(c: RgbColor) -> Color {
    Color::Rgb(Rgb::new(c.r, c.g, c.b, None))
}

fn mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}
