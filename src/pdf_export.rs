//! PDF report writer: minimal PDF 1.4, no document-format dependency.
//!
//! One A4-ish page sequence containing the report title, a generation
//! timestamp, optionally one rasterized chart (FlateDecode RGB image
//! XObject), and the line-wrapped insights block. A new page starts when
//! the vertical cursor passes the low-margin threshold.

use color_eyre::Result;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

use crate::chart_export::RasterImage;
use crate::insight::InsightStatement;

const PAGE_WIDTH: f64 = 595.0;
const PAGE_HEIGHT: f64 = 842.0;
const MARGIN: f64 = 50.0;
/// Below this y position the current page is considered full.
const LOW_MARGIN: f64 = 60.0;
/// Insight lines wrap at roughly this many characters.
const WRAP_COLUMNS: usize = 100;

const TITLE_SIZE: f64 = 18.0;
const BODY_SIZE: f64 = 11.0;
const SMALL_SIZE: f64 = 9.0;

/// Escape a string for a PDF literal string: ( ) and \.
fn pdf_escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Greedy word wrap at `columns` characters. Words longer than a full line
/// are emitted on their own line rather than split.
pub(crate) fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.len() + 1 + word.len() <= columns {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Accumulates numbered objects and renders the body + xref + trailer.
struct PdfBuilder {
    objects: Vec<Vec<u8>>,
}

impl PdfBuilder {
    fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    /// Reserve an object id to be filled in later (ids are 1-based).
    fn reserve(&mut self) -> usize {
        self.objects.push(Vec::new());
        self.objects.len()
    }

    fn set(&mut self, id: usize, body: Vec<u8>) {
        self.objects[id - 1] = body;
    }

    fn add(&mut self, body: Vec<u8>) -> usize {
        self.objects.push(body);
        self.objects.len()
    }

    fn add_stream(&mut self, dict_entries: &str, data: &[u8]) -> usize {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!("<< {} /Length {} >>\nstream\n", dict_entries, data.len()).as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.add(body)
    }

    fn finish(self) -> Vec<u8> {
        let mut out: Vec<u8> = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(self.objects.len());
        for (idx, body) in self.objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", idx + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", self.objects.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                self.objects.len() + 1,
                xref_offset
            )
            .as_bytes(),
        );
        out
    }
}

/// Builds page content streams with a downward-moving cursor.
struct PageComposer {
    pages: Vec<String>,
    y: f64,
}

impl PageComposer {
    fn new() -> Self {
        Self {
            pages: vec![String::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn ensure_room(&mut self, needed: f64) {
        if self.y - needed < LOW_MARGIN {
            self.pages.push(String::new());
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn text_line(&mut self, size: f64, text: &str) {
        let leading = size * 1.35;
        self.ensure_room(leading);
        self.y -= leading;
        let content = self.pages.last_mut().expect("at least one page");
        content.push_str(&format!(
            "BT /F1 {:.1} Tf 1 0 0 1 {:.1} {:.1} Tm ({}) Tj ET\n",
            size,
            MARGIN,
            self.y,
            pdf_escape(text)
        ));
    }

    fn blank(&mut self, height: f64) {
        self.ensure_room(height);
        self.y -= height;
    }

    /// Place the image scaled to the content width (or less, to fit the
    /// remaining page), preserving aspect ratio.
    fn image(&mut self, image: &RasterImage) {
        let content_width = PAGE_WIDTH - 2.0 * MARGIN;
        let aspect = image.height as f64 / image.width as f64;
        let mut display_w = content_width;
        let mut display_h = display_w * aspect;
        let max_h = PAGE_HEIGHT - MARGIN - LOW_MARGIN;
        if display_h > max_h {
            display_h = max_h;
            display_w = display_h / aspect;
        }
        self.ensure_room(display_h);
        self.y -= display_h;
        let content = self.pages.last_mut().expect("at least one page");
        content.push_str(&format!(
            "q {:.1} 0 0 {:.1} {:.1} {:.1} cm /Im0 Do Q\n",
            display_w, display_h, MARGIN, self.y
        ));
    }
}

/// Render the report. `image` is the rasterized representative chart;
/// `notice` is the visible degradation message when rasterization failed.
pub fn pdf_report(
    title: &str,
    generated_at: &str,
    image: Option<&RasterImage>,
    insights: &[InsightStatement],
    notice: Option<&str>,
) -> Result<Vec<u8>> {
    let mut composer = PageComposer::new();
    composer.text_line(TITLE_SIZE, title);
    composer.text_line(SMALL_SIZE, &format!("Generated {}", generated_at));
    if let Some(notice) = notice {
        composer.text_line(SMALL_SIZE, &format!("Note: {}", notice));
    }
    composer.blank(12.0);

    if let Some(image) = image {
        composer.image(image);
        composer.blank(16.0);
    }

    composer.text_line(14.0, "Insights");
    composer.blank(4.0);
    if insights.is_empty() {
        composer.text_line(BODY_SIZE, "No insights available for the current selection.");
    }
    for insight in insights {
        let mut first = true;
        for line in wrap_text(&insight.text, WRAP_COLUMNS) {
            let prefix = if first { "- " } else { "  " };
            composer.text_line(BODY_SIZE, &format!("{}{}", prefix, line));
            first = false;
        }
    }

    let mut builder = PdfBuilder::new();
    let catalog_id = builder.reserve();
    let pages_id = builder.reserve();
    let font_id = builder.add(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec(),
    );

    let image_id = match image {
        Some(image) => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&image.rgb)?;
            let compressed = encoder.finish()?;
            Some(builder.add_stream(
                &format!(
                    "/Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode",
                    image.width, image.height
                ),
                &compressed,
            ))
        }
        None => None,
    };

    let mut resources = format!("<< /Font << /F1 {} 0 R >>", font_id);
    if let Some(image_id) = image_id {
        resources.push_str(&format!(" /XObject << /Im0 {} 0 R >>", image_id));
    }
    resources.push_str(" >>");
    let resources_id = builder.add(resources.into_bytes());

    let mut page_ids = Vec::with_capacity(composer.pages.len());
    for content in &composer.pages {
        let content_id = builder.add_stream("", content.as_bytes());
        let page_id = builder.add(
            format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] \
                 /Resources {} 0 R /Contents {} 0 R >>",
                pages_id, PAGE_WIDTH as u32, PAGE_HEIGHT as u32, resources_id, content_id
            )
            .into_bytes(),
        );
        page_ids.push(page_id);
    }

    let kids = page_ids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");
    builder.set(
        pages_id,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_ids.len()
        )
        .into_bytes(),
    );
    builder.set(
        catalog_id,
        format!("<< /Type /Catalog /Pages {} 0 R >>", pages_id).into_bytes(),
    );

    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::InsightRule;

    fn insight(text: &str) -> InsightStatement {
        InsightStatement {
            rule: InsightRule::Correlation,
            text: text.to_string(),
        }
    }

    #[test]
    fn wrap_respects_column_limit() {
        let text = "one two three four five six seven eight nine ten";
        let lines = wrap_text(text, 20);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.len() <= 20, "line too long: {}", line);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn wrap_handles_oversized_word() {
        let lines = wrap_text("short aaaaaaaaaaaaaaaaaaaaaaaaa end", 10);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn escape_parentheses() {
        assert_eq!(pdf_escape("a(b)c\\d"), "a\\(b\\)c\\\\d");
    }

    #[test]
    fn text_only_report_is_valid_pdf() {
        let bytes = pdf_report(
            "Sales EDA Dashboard",
            "2024-06-01T00:00:00Z",
            None,
            &[insight("Sales and profit show no strong correlation.")],
            Some("chart rasterization unavailable; exported text-only report"),
        )
        .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.contains("%%EOF"));
        assert!(text.contains("no strong correlation"));
        assert!(text.contains("text-only report"));
        // No image XObject in the degraded report.
        assert!(!text.contains("/Subtype /Image"));
    }

    #[test]
    fn report_with_image_embeds_xobject() {
        let image = RasterImage {
            width: 4,
            height: 2,
            rgb: vec![255u8; 4 * 2 * 3],
        };
        let bytes = pdf_report("t", "now", Some(&image), &[insight("i")], None).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Subtype /Image"));
        assert!(text.contains("/FlateDecode"));
        assert!(text.contains("/Im0 Do"));
    }

    #[test]
    fn long_insight_list_paginates() {
        let many: Vec<InsightStatement> = (0..120)
            .map(|i| insight(&format!("insight number {} with a reasonably long tail of words", i)))
            .collect();
        let bytes = pdf_report("t", "now", None, &many, None).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        let pages = text.matches("/Type /Page ").count();
        assert!(pages > 1, "expected pagination, got {} page(s)", pages);
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let bytes = pdf_report("t", "now", None, &[insight("i")], None).unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        let xref_pos = text.rfind("xref\n").unwrap();
        // First object offset (second xref line after the free entry).
        let entries: Vec<&str> = text[xref_pos..].lines().skip(3).take(1).collect();
        let offset: usize = entries[0][..10].parse().unwrap();
        assert!(text[offset..].starts_with("1 0 obj"));
    }
}
