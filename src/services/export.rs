use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::ExportError;
use crate::models::Bill;
use crate::utils::format_decimal;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 56;
const LINE_HEIGHT: i64 = 16;
const MAX_ROWS: usize = 40;

/// Produces a printable document from a bill snapshot.
pub trait BillRenderer: Send + Sync {
    fn render(&self, bill: &Bill) -> Result<Vec<u8>, ExportError>;
}

/// Single A4 page, Helvetica text.
pub struct PdfRenderer;

impl BillRenderer for PdfRenderer {
    fn render(&self, bill: &Bill) -> Result<Vec<u8>, ExportError> {
        if bill.items().len() > MAX_ROWS {
            return Err(ExportError::Render(format!(
                "Bill has {} items, a single page holds {}",
                bill.items().len(),
                MAX_ROWS
            )));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
                "F2" => bold_id,
            },
        });

        let content = Content {
            operations: layout(bill)?,
        };
        let encoded = content
            .encode()
            .map_err(|e| ExportError::Render(format!("Encode content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| ExportError::Render(format!("Write PDF: {}", e)))?;
        Ok(bytes)
    }
}

struct Cursor {
    operations: Vec<Operation>,
    y: i64,
}

impl Cursor {
    fn text(&mut self, font: &str, size: i64, x: i64, value: &str) -> Result<(), ExportError> {
        let encoded = win_ansi(value)?;
        self.operations.push(Operation::new("BT", vec![]));
        self.operations
            .push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.operations
            .push(Operation::new("Td", vec![x.into(), self.y.into()]));
        self.operations
            .push(Operation::new("Tj", vec![Object::String(encoded, StringFormat::Literal)]));
        self.operations.push(Operation::new("ET", vec![]));
        Ok(())
    }

    fn line(&mut self, font: &str, size: i64, columns: &[(i64, String)]) -> Result<(), ExportError> {
        for (x, value) in columns {
            self.text(font, size, *x, value)?;
        }
        self.y -= LINE_HEIGHT;
        Ok(())
    }

    fn gap(&mut self) {
        self.y -= LINE_HEIGHT / 2;
    }
}

/// Encodes text for the standard fonts. Characters outside Windows-1252 are
/// refused rather than printed as garbage.
fn win_ansi(value: &str) -> Result<Vec<u8>, ExportError> {
    value
        .chars()
        .map(|c| {
            let code = c as u32;
            let byte = match c {
                ' '..='~' => Some(code as u8),
                '\u{a0}'..='\u{ff}' => Some(code as u8),
                '€' => Some(0x80),
                '‚' => Some(0x82),
                'ƒ' => Some(0x83),
                '„' => Some(0x84),
                '…' => Some(0x85),
                '†' => Some(0x86),
                '‡' => Some(0x87),
                'ˆ' => Some(0x88),
                '‰' => Some(0x89),
                'Š' => Some(0x8a),
                '‹' => Some(0x8b),
                'Œ' => Some(0x8c),
                'Ž' => Some(0x8e),
                '‘' => Some(0x91),
                '’' => Some(0x92),
                '“' => Some(0x93),
                '”' => Some(0x94),
                '•' => Some(0x95),
                '–' => Some(0x96),
                '—' => Some(0x97),
                '˜' => Some(0x98),
                '™' => Some(0x99),
                'š' => Some(0x9a),
                '›' => Some(0x9b),
                'œ' => Some(0x9c),
                'ž' => Some(0x9e),
                'Ÿ' => Some(0x9f),
                _ => None,
            };
            byte.ok_or_else(|| {
                ExportError::Render(format!("Character '{}' cannot be printed on the bill", c))
            })
        })
        .collect()
}

/// The bill as displayed: amounts rounded to two places.
fn layout(bill: &Bill) -> Result<Vec<Operation>, ExportError> {
    let columns = [MARGIN, MARGIN + 200, MARGIN + 280, MARGIN + 380];
    let mut cursor = Cursor {
        operations: Vec::new(),
        y: PAGE_HEIGHT - MARGIN,
    };

    cursor.line("F2", 20, &[(MARGIN, "Invoice".to_string())])?;
    cursor.gap();
    cursor.line("F1", 11, &[(MARGIN, format!("Bill No: {}", bill.bill_number()))])?;
    cursor.line("F1", 11, &[(MARGIN, format!("Date: {}", bill.date()))])?;
    cursor.line("F1", 11, &[(MARGIN, format!("Customer: {}", bill.customer_name()))])?;
    cursor.gap();

    cursor.line(
        "F2",
        11,
        &[
            (columns[0], "Design No.".to_string()),
            (columns[1], "Quantity".to_string()),
            (columns[2], "Price".to_string()),
            (columns[3], "Amount".to_string()),
        ],
    )?;
    for item in bill.items() {
        let design = if item.design_number().is_empty() {
            "-".to_string()
        } else {
            item.design_number().to_string()
        };
        cursor.line(
            "F1",
            11,
            &[
                (columns[0], design),
                (columns[1], item.quantity().to_string()),
                (columns[2], format_decimal(item.price())),
                (columns[3], format_decimal(item.amount())),
            ],
        )?;
    }
    cursor.gap();

    cursor.line(
        "F1",
        11,
        &[
            (columns[2], "Subtotal:".to_string()),
            (columns[3], format_decimal(bill.subtotal())),
        ],
    )?;
    cursor.line(
        "F1",
        11,
        &[
            (columns[2], format!("GST {}%:", bill.gst_percentage())),
            (columns[3], format_decimal(bill.gst_amount())),
        ],
    )?;
    cursor.line(
        "F2",
        12,
        &[
            (columns[2], "Total:".to_string()),
            (columns[3], format_decimal(bill.total())),
        ],
    )?;

    Ok(cursor.operations)
}

pub fn export_file_name(bill_number: &str) -> String {
    let safe: String = bill_number
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}.pdf", safe)
}

/// Renders the snapshot off the async runtime and writes `<bill number>.pdf`
/// into `folder`. The caller's bill state is never touched.
pub async fn export_bill(
    renderer: Arc<dyn BillRenderer>,
    bill: Bill,
    folder: PathBuf,
    timeout: Duration,
) -> Result<PathBuf, ExportError> {
    let bill_number = bill.bill_number().to_string();
    info!(bill_number = %bill_number, folder = %folder.display(), "Exporting bill");

    let task = tokio::task::spawn_blocking(move || write_export(renderer.as_ref(), &bill, &folder));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => {
            let path = result?;
            info!(bill_number = %bill_number, path = %path.display(), "Bill exported");
            Ok(path)
        }
        Ok(Err(join)) => Err(ExportError::Render(join.to_string())),
        Err(_) => {
            warn!(bill_number = %bill_number, ?timeout, "Export timed out");
            Err(ExportError::TimedOut(timeout))
        }
    }
}

fn write_export(renderer: &dyn BillRenderer, bill: &Bill, folder: &Path) -> Result<PathBuf, ExportError> {
    let bytes = renderer.render(bill)?;
    std::fs::create_dir_all(folder)?;
    let path = folder.join(export_file_name(bill.bill_number()));
    std::fs::write(&path, bytes)?;
    Ok(path)
}
