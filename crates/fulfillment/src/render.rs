//! Sale document rendering.

use std::fmt::Write as _;

use domain::SaleSnapshot;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to lay out document: {0}")]
    Layout(String),

    #[error("Failed to write PDF: {0}")]
    Pdf(String),
}

/// A rendered document, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// File extension used when building the artifact key.
    pub extension: String,
}

/// Turns a sale snapshot into a document. Rendering is pure.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, sale: &SaleSnapshot) -> Result<RenderedDocument, RenderError>;
}

const TITLE: &str = "SALE RECEIPT";

/// Labelled header lines, in print order.
fn header_fields(sale: &SaleSnapshot) -> [(&'static str, String); 6] {
    let customer = sale.customer();
    [
        ("Folio", sale.folio().to_string()),
        ("Customer", customer.name.clone()),
        ("Tax ID", customer.tax_id_or_generic().to_string()),
        (
            "Date",
            sale.created_at()
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string(),
        ),
        ("Payment method", or_dash(sale.payment_method()).to_string()),
        (
            "Delivery address",
            or_dash(sale.delivery_address().unwrap_or_default()).to_string(),
        ),
    ]
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}

// ---------------------------------------------------------------------------
// PDF
// ---------------------------------------------------------------------------

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;

/// A4 PDF sale receipt.
///
/// Text is set in the PDF base-14 Helvetica faces, so no font files are
/// needed. Characters outside Windows-1252 are dropped by the PDF writer.
/// Long baskets continue on further pages.
#[derive(Debug, Clone, Default)]
pub struct PdfReceiptRenderer;

impl PdfReceiptRenderer {
    fn draw(sale: &SaleSnapshot) -> Result<Vec<u8>, RenderError> {
        let mut canvas = PdfCanvas::new(format!("Sale receipt {}", sale.folio()))?;

        canvas.advance(8.0);
        canvas.text(TITLE, 18.0, MARGIN, true);
        canvas.advance(4.0);

        for (label, value) in header_fields(sale) {
            canvas.advance(6.0);
            canvas.text(&format!("{label}: {value}"), 10.0, MARGIN, false);
        }

        canvas.advance(12.0);
        canvas.text("DETAIL", 12.0, MARGIN, true);
        canvas.rule();

        for item in sale.items() {
            canvas.advance(6.0);
            canvas.text(
                &format!("{} x{}", item.snapshot.name, item.quantity),
                10.0,
                MARGIN,
                false,
            );
            canvas.text_right(
                &item.subtotal().to_string(),
                10.0,
                PAGE_WIDTH - MARGIN,
                false,
            );
        }

        canvas.rule();
        canvas.advance(7.0);
        canvas.text_right(
            &format!("TOTAL: {}", sale.total()),
            12.0,
            PAGE_WIDTH - MARGIN,
            true,
        );

        canvas.finish()
    }
}

impl DocumentRenderer for PdfReceiptRenderer {
    fn render(&self, sale: &SaleSnapshot) -> Result<RenderedDocument, RenderError> {
        Ok(RenderedDocument {
            bytes: Self::draw(sale)?,
            content_type: "application/pdf".to_string(),
            extension: "pdf".to_string(),
        })
    }
}

fn pdf_error(e: printpdf::Error) -> RenderError {
    RenderError::Pdf(e.to_string())
}

/// Top-down writing cursor over a PDF document.
struct PdfCanvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Baseline of the current line, in mm from the bottom of the page.
    y: f32,
}

impl PdfCanvas {
    fn new(title: String) -> Result<Self, RenderError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "receipt");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
        })
    }

    /// Moves down by `height`, breaking onto a new page at the bottom margin.
    fn advance(&mut self, height: f32) {
        if self.y - height < MARGIN {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "receipt");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
        self.y -= height;
    }

    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn text_right(&self, text: &str, size: f32, right: f32, bold: bool) {
        self.text(text, size, right - text_width(text, size), bold);
    }

    fn rule(&mut self) {
        self.advance(3.0);
        let y = Mm(self.y);
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), y), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), y), false),
            ],
            is_closed: false,
        });
    }

    fn finish(self) -> Result<Vec<u8>, RenderError> {
        self.doc.save_to_bytes().map_err(pdf_error)
    }
}

/// Approximate Helvetica advance width of `text` at `size` points, in mm.
///
/// Exact for digits and amount punctuation, which is what gets right-aligned.
fn text_width(text: &str, size: f32) -> f32 {
    const MM_PER_PT: f32 = 0.352_778;
    let units: u32 = text
        .chars()
        .map(|c| match c {
            '.' | ',' | ' ' | ':' => 278,
            '-' => 333,
            'T' | 'L' => 611,
            'O' => 778,
            'A' => 667,
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0 * MM_PER_PT
}

// ---------------------------------------------------------------------------
// Plain text
// ---------------------------------------------------------------------------

/// Plain-text sale receipt with the same content as the PDF one.
#[derive(Debug, Clone, Default)]
pub struct TextReceiptRenderer;

impl TextReceiptRenderer {
    const RULE: &'static str = "----------------------------------------";

    fn layout(sale: &SaleSnapshot) -> Result<String, std::fmt::Error> {
        let mut out = String::new();

        writeln!(out, "{TITLE}")?;
        writeln!(out, "{}", Self::RULE)?;
        for (label, value) in header_fields(sale) {
            writeln!(out, "{label}: {value}")?;
        }
        writeln!(out)?;
        writeln!(out, "DETAIL")?;
        writeln!(out, "{}", Self::RULE)?;
        for item in sale.items() {
            writeln!(
                out,
                "{} x{} - {}",
                item.snapshot.name,
                item.quantity,
                item.subtotal()
            )?;
        }
        writeln!(out, "{}", Self::RULE)?;
        writeln!(out, "TOTAL: {}", sale.total())?;

        Ok(out)
    }
}

impl DocumentRenderer for TextReceiptRenderer {
    fn render(&self, sale: &SaleSnapshot) -> Result<RenderedDocument, RenderError> {
        let text = Self::layout(sale).map_err(|e| RenderError::Layout(e.to_string()))?;
        Ok(RenderedDocument {
            bytes: text.into_bytes(),
            content_type: "text/plain; charset=utf-8".to_string(),
            extension: "txt".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::{CustomerId, Money, SaleId};
    use domain::{Customer, CustomerSnapshot, LineItem, Product};
    use printpdf::lopdf;

    fn snapshot_with(
        tax_id: Option<&str>,
        address: Option<&str>,
        items: Vec<LineItem>,
    ) -> SaleSnapshot {
        let mut customer = Customer::new(
            CustomerId::new(),
            "Ana Diaz",
            "ana@example.com",
            "555",
            "Street 1",
        );
        if let Some(tax_id) = tax_id {
            customer = customer.with_tax_id(tax_id);
        }

        SaleSnapshot::new(
            SaleId::new(),
            customer.id,
            CustomerSnapshot::from(&customer),
            items,
            "card".to_string(),
            address.map(str::to_string),
            Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
        )
    }

    fn snapshot(tax_id: Option<&str>, address: Option<&str>) -> SaleSnapshot {
        let widget = Product::new("P1", "Widget", Money::from_cents(100), 5);
        let gadget = Product::new("P2", "Gadget", Money::from_cents(1250), 5);
        snapshot_with(
            tax_id,
            address,
            vec![
                LineItem::from_product(&widget, 2),
                LineItem::from_product(&gadget, 1),
            ],
        )
    }

    fn render_text(sale: &SaleSnapshot) -> String {
        let doc = TextReceiptRenderer.render(sale).unwrap();
        assert_eq!(doc.extension, "txt");
        assert!(doc.content_type.starts_with("text/plain"));
        String::from_utf8(doc.bytes).unwrap()
    }

    /// Every string shown with `Tj`, one per line, across all pages.
    fn pdf_strings(bytes: &[u8]) -> (usize, String) {
        let doc = lopdf::Document::load_mem(bytes).unwrap();
        let pages = doc.get_pages();
        let mut text = String::new();

        for page_id in pages.values() {
            let content = doc.get_and_decode_page_content(*page_id).unwrap();
            for operation in content.operations.iter().filter(|op| op.operator == "Tj") {
                for operand in &operation.operands {
                    if let lopdf::Object::String(raw, _) = operand {
                        text.push_str(&String::from_utf8_lossy(raw));
                        text.push('\n');
                    }
                }
            }
        }

        (pages.len(), text)
    }

    #[test]
    fn test_pdf_receipt_contents() {
        let sale = snapshot(Some("DIAA800101XYZ"), Some("Street 9"));
        let doc = PdfReceiptRenderer.render(&sale).unwrap();

        assert_eq!(doc.content_type, "application/pdf");
        assert_eq!(doc.extension, "pdf");
        assert!(doc.bytes.starts_with(b"%PDF"));

        let (pages, text) = pdf_strings(&doc.bytes);
        assert_eq!(pages, 1);
        assert!(text.starts_with("SALE RECEIPT\n"));
        assert!(text.contains(&format!("Folio: {}\n", sale.folio())));
        assert!(text.contains("Customer: Ana Diaz\n"));
        assert!(text.contains("Tax ID: DIAA800101XYZ\n"));
        assert!(text.contains("Date: 2026-03-14 09:30:00 UTC\n"));
        assert!(text.contains("Payment method: card\n"));
        assert!(text.contains("Delivery address: Street 9\n"));
        assert!(text.contains("Widget x2\n$2.00\n"));
        assert!(text.contains("Gadget x1\n$12.50\n"));
        assert!(text.ends_with("TOTAL: $14.50\n"));
    }

    #[test]
    fn test_pdf_receipt_uses_placeholders() {
        let doc = PdfReceiptRenderer.render(&snapshot(None, None)).unwrap();
        let (_, text) = pdf_strings(&doc.bytes);

        assert!(text.contains("Tax ID: GENERIC\n"));
        assert!(text.contains("Delivery address: -\n"));
    }

    #[test]
    fn test_pdf_receipt_with_no_items() {
        let doc = PdfReceiptRenderer
            .render(&snapshot_with(None, None, Vec::new()))
            .unwrap();
        let (_, text) = pdf_strings(&doc.bytes);

        assert!(text.contains("DETAIL\nTOTAL: $0.00\n"));
    }

    #[test]
    fn test_long_basket_continues_on_next_page() {
        let items: Vec<LineItem> = (0..80)
            .map(|i| {
                let product = Product::new(
                    format!("P{i}"),
                    format!("Item {i}"),
                    Money::from_cents(100),
                    5,
                );
                LineItem::from_product(&product, 1)
            })
            .collect();
        let doc = PdfReceiptRenderer
            .render(&snapshot_with(None, None, items))
            .unwrap();

        let (pages, text) = pdf_strings(&doc.bytes);
        assert!(pages > 1);
        assert!(text.contains("Item 0 x1\n"));
        assert!(text.contains("Item 79 x1\n"));
        assert!(text.ends_with("TOTAL: $80.00\n"));
    }

    #[test]
    fn test_text_receipt_contents() {
        let sale = snapshot(Some("DIAA800101XYZ"), Some("Street 9"));
        let text = render_text(&sale);

        assert!(text.starts_with("SALE RECEIPT\n"));
        assert!(text.contains(&format!("Folio: {}\n", sale.folio())));
        assert!(text.contains("Customer: Ana Diaz\n"));
        assert!(text.contains("Tax ID: DIAA800101XYZ\n"));
        assert!(text.contains("Date: 2026-03-14 09:30:00 UTC\n"));
        assert!(text.contains("Payment method: card\n"));
        assert!(text.contains("Delivery address: Street 9\n"));
        assert!(text.contains("Widget x2 - $2.00\n"));
        assert!(text.contains("Gadget x1 - $12.50\n"));
        assert!(text.ends_with("TOTAL: $14.50\n"));
    }

    #[test]
    fn test_text_receipt_uses_placeholders() {
        let text = render_text(&snapshot(None, None));
        assert!(text.contains("Tax ID: GENERIC\n"));
        assert!(text.contains("Delivery address: -\n"));
    }
}
