//! # 보고서 내보내기
//!
//! 관리자 보고서를 CSV, JSON, PDF로 만들고 인보이스 한 장을 PDF로 렌더링합니다.
//!
//! PDF는 내장 Helvetica 글꼴을 씁니다. 이 글꼴은 라틴 문자만 그리므로
//! 그 밖의 문자(데바나가리, ₹ 등)는 `?`로 바뀝니다.
//! 원문 그대로가 필요하면 CSV나 JSON을 받아야 합니다.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use serde::Serialize;
use thiserror::Error;

use crate::config::CompanyInfo;
use crate::models::{AdminUserRow, CorrectionReportRow, ExportFormat, Invoice, MonthlyRevenue};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF export failed: {0}")]
    Pdf(String),
}

/// 내보낸 파일 하나
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub content_type: &'static str,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// 표 형태 보고서의 한 행
pub trait ReportRow: Serialize {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

/// 파이사를 "INR 199.00" 형식으로
pub fn format_paise(paise: i64) -> String {
    let sign = if paise < 0 { "-" } else { "" };
    let abs = paise.abs();
    format!("{sign}INR {}.{:02}", abs / 100, abs % 100)
}

impl ReportRow for AdminUserRow {
    const HEADERS: &'static [&'static str] = &["Username", "Email", "Role", "Words", "Corrections", "Joined"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.username.clone(),
            self.email.clone().unwrap_or_default(),
            self.role.clone(),
            self.words_available.to_string(),
            self.total_corrections.to_string(),
            date_part(&self.created_at),
        ]
    }
}

impl ReportRow for Invoice {
    const HEADERS: &'static [&'static str] = &["Invoice", "Plan", "Base", "CGST", "SGST", "Total", "Date"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.invoice_number.clone(),
            self.plan_name.clone(),
            format_paise(self.base_paise),
            format_paise(self.cgst_paise),
            format_paise(self.sgst_paise),
            format_paise(self.total_paise),
            date_part(&self.created_at),
        ]
    }
}

impl ReportRow for CorrectionReportRow {
    const HEADERS: &'static [&'static str] = &["User", "Mode", "Words", "Text", "Date"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.username.clone(),
            self.processing_type.clone(),
            self.words_used.to_string(),
            self.text_sample.clone(),
            date_part(&self.created_at),
        ]
    }
}

impl ReportRow for MonthlyRevenue {
    const HEADERS: &'static [&'static str] = &["Month", "Orders", "Revenue"];

    fn cells(&self) -> Vec<String> {
        vec![self.month.clone(), self.orders.to_string(), format_paise(self.revenue_paise)]
    }
}

fn date_part(timestamp: &str) -> String {
    timestamp.chars().take(10).collect()
}

/// 행 목록을 요청한 형식으로 내보냅니다.
pub fn render<T: ReportRow>(name: &str, title: &str, rows: &[T], format: ExportFormat) -> Result<ExportFile, ExportError> {
    let (content_type, extension, bytes) = match format {
        ExportFormat::Csv => ("text/csv; charset=utf-8", "csv", to_csv(rows)?),
        ExportFormat::Json => ("application/json", "json", to_json(rows)?),
        ExportFormat::Pdf => ("application/pdf", "pdf", report_pdf(title, rows)?),
    };
    Ok(ExportFile {
        content_type,
        filename: format!("{name}.{extension}"),
        bytes,
    })
}

pub fn to_csv<T: ReportRow>(rows: &[T]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(T::HEADERS)?;
    for row in rows {
        writer.write_record(row.cells())?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))
}

pub fn to_json<T: Serialize>(rows: &[T]) -> Result<Vec<u8>, ExportError> {
    Ok(serde_json::to_vec_pretty(rows)?)
}

// ── PDF ──

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 6.0;

fn pdf_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('~');
    cut
}

/// 위에서 아래로 줄을 채우고, 페이지가 차면 새 페이지를 엽니다.
struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self, ExportError> {
        let (doc, page, layer) = PdfDocument::new(pdf_text(title), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1".to_string());
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
        })
    }

    fn ensure_room(&mut self) {
        if self.y < MARGIN + LINE_HEIGHT {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn text_at(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(pdf_text(text), size, Mm(x), Mm(self.y), font);
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        self.ensure_room();
        self.text_at(text, size, MARGIN, bold);
        self.y -= LINE_HEIGHT;
    }

    /// 열을 같은 너비로 나눠 한 행을 씁니다.
    fn row(&mut self, cells: &[String], bold: bool) {
        self.ensure_room();
        let columns = cells.len().max(1);
        let width = (PAGE_WIDTH - 2.0 * MARGIN) / columns as f32;
        // 9pt Helvetica 기준 대략 1.9mm당 한 글자
        let max_chars = ((width / 1.9) as usize).max(4);
        for (i, cell) in cells.iter().enumerate() {
            self.text_at(&truncate(cell, max_chars), 9.0, MARGIN + width * i as f32, bold);
        }
        self.y -= LINE_HEIGHT;
    }

    fn gap(&mut self) {
        self.y -= LINE_HEIGHT / 2.0;
    }

    fn finish(self) -> Result<Vec<u8>, ExportError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| ExportError::Pdf(e.to_string()))
    }
}

pub fn report_pdf<T: ReportRow>(title: &str, rows: &[T]) -> Result<Vec<u8>, ExportError> {
    let mut pdf = PdfWriter::new(title)?;
    pdf.line(title, 16.0, true);
    pdf.line(
        &format!("Generated {} - {} rows", chrono::Utc::now().format("%Y-%m-%d %H:%M UTC"), rows.len()),
        9.0,
        false,
    );
    pdf.gap();

    let headers: Vec<String> = T::HEADERS.iter().map(|h| h.to_string()).collect();
    pdf.row(&headers, true);
    for row in rows {
        pdf.row(&row.cells(), false);
    }
    pdf.finish()
}

/// 인보이스 한 장 (회사 머리글, 고객, 세액 내역)
pub fn invoice_pdf(invoice: &Invoice, company: &CompanyInfo, customer: &str) -> Result<Vec<u8>, ExportError> {
    let mut pdf = PdfWriter::new(&format!("Invoice {}", invoice.invoice_number))?;

    pdf.line(&company.name, 18.0, true);
    if !company.address.is_empty() {
        pdf.line(&company.address, 10.0, false);
    }
    if !company.gstin.is_empty() {
        pdf.line(&format!("GSTIN: {}", company.gstin), 10.0, false);
    }
    pdf.gap();

    pdf.line("TAX INVOICE", 14.0, true);
    pdf.line(&format!("Invoice number: {}", invoice.invoice_number), 10.0, false);
    pdf.line(&format!("Date: {}", date_part(&invoice.created_at)), 10.0, false);
    pdf.line(&format!("Billed to: {customer}"), 10.0, false);
    pdf.gap();

    pdf.row(&["Description".to_string(), "Amount".to_string()], true);
    let lines = [
        (invoice.plan_name.clone(), invoice.base_paise),
        ("CGST @ 9%".to_string(), invoice.cgst_paise),
        ("SGST @ 9%".to_string(), invoice.sgst_paise),
    ];
    for (label, paise) in lines {
        pdf.row(&[label, format_paise(paise)], false);
    }
    pdf.row(&["Total (GST inclusive)".to_string(), format_paise(invoice.total_paise)], true);

    pdf.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revenue() -> Vec<MonthlyRevenue> {
        vec![
            MonthlyRevenue { month: "2026-01".to_string(), orders: 2, revenue_paise: 29800 },
            MonthlyRevenue { month: "2026-02".to_string(), orders: 1, revenue_paise: 9900 },
        ]
    }

    #[test]
    fn paise_are_formatted_as_rupees() {
        assert_eq!(format_paise(19900), "INR 199.00");
        assert_eq!(format_paise(5), "INR 0.05");
        assert_eq!(format_paise(-250), "-INR 2.50");
    }

    #[test]
    fn csv_has_header_and_one_line_per_row() {
        let bytes = to_csv(&revenue()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Month,Orders,Revenue");
        assert_eq!(lines[1], "2026-01,2,INR 298.00");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn render_picks_content_type_and_extension() {
        let file = render("revenue", "Revenue", &revenue(), ExportFormat::Json).unwrap();
        assert_eq!(file.content_type, "application/json");
        assert_eq!(file.filename, "revenue.json");
        let parsed: serde_json::Value = serde_json::from_slice(&file.bytes).unwrap();
        assert_eq!(parsed[1]["revenue_paise"], 9900);
    }

    #[test]
    fn pdf_output_is_a_pdf_document() {
        let rows: Vec<MonthlyRevenue> = (1..=80)
            .map(|i| MonthlyRevenue { month: format!("m{i}"), orders: i, revenue_paise: i * 100 })
            .collect();
        let bytes = report_pdf("Revenue", &rows).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn non_latin_text_is_replaced_for_pdf() {
        assert_eq!(pdf_text("नमस्ते ok"), "?????? ok");
        assert_eq!(truncate("abcdefgh", 5), "abcd~");
    }
}
