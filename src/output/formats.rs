//! Export writers, one per `ExportFormat`
//!
//! Tabular formats (CSV, Excel, HTML) share one column layout: `source_url`,
//! then every field name in first-seen order, then `media_refs`.

use crate::output::record::{field_columns, ExtractedRecord};
use crate::output::traits::{ExportFormat, OutputResult, RecordWriter};
use rust_xlsxwriter::{Format, Workbook};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Excel refuses longer cell strings
const XLSX_MAX_CELL_CHARS: usize = 32_767;

/// Returns the writer for a format
pub fn writer_for(format: ExportFormat) -> Box<dyn RecordWriter> {
    match format {
        ExportFormat::Json => Box::new(JsonWriter),
        ExportFormat::Csv => Box::new(CsvWriter),
        ExportFormat::Xlsx => Box::new(XlsxWriter),
        ExportFormat::Text => Box::new(TextWriter),
        ExportFormat::Html => Box::new(HtmlWriter),
    }
}

/// Header row and data rows of the flattened table
fn table(records: &[ExtractedRecord]) -> (Vec<String>, Vec<Vec<String>>) {
    let fields = field_columns(records);

    let mut header = Vec::with_capacity(fields.len() + 2);
    header.push("source_url".to_string());
    header.extend(fields.iter().cloned());
    header.push("media_refs".to_string());

    let rows = records
        .iter()
        .map(|record| {
            let mut row = Vec::with_capacity(header.len());
            row.push(record.source_url.clone());
            row.extend(fields.iter().map(|field| record.cell(field)));
            row.push(record.media_refs.join(","));
            row
        })
        .collect();

    (header, rows)
}

/// Pretty-printed JSON array of records
pub struct JsonWriter;

impl RecordWriter for JsonWriter {
    fn write(&self, records: &[ExtractedRecord], path: &Path) -> OutputResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

pub struct CsvWriter;

impl RecordWriter for CsvWriter {
    fn write(&self, records: &[ExtractedRecord], path: &Path) -> OutputResult<()> {
        let (header, rows) = table(records);

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&header)?;
        for row in rows {
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

pub struct XlsxWriter;

impl RecordWriter for XlsxWriter {
    fn write(&self, records: &[ExtractedRecord], path: &Path) -> OutputResult<()> {
        let (header, rows) = table(records);
        let bold = Format::new().set_bold();

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Records")?;

        for (col, name) in header.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, name.as_str(), &bold)?;
        }

        for (row_index, row) in rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                worksheet.write_string((row_index + 1) as u32, col as u16, clip(value))?;
            }
        }

        workbook.save(path)?;
        Ok(())
    }
}

/// Cuts a cell down to what Excel accepts
fn clip(value: &str) -> String {
    if value.chars().count() <= XLSX_MAX_CELL_CHARS {
        value.to_string()
    } else {
        value.chars().take(XLSX_MAX_CELL_CHARS).collect()
    }
}

/// Blocks of `field: value` lines separated by blank lines
pub struct TextWriter;

impl RecordWriter for TextWriter {
    fn write(&self, records: &[ExtractedRecord], path: &Path) -> OutputResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);

        for (index, record) in records.iter().enumerate() {
            if index > 0 {
                writeln!(writer)?;
            }
            writeln!(writer, "source_url: {}", record.source_url)?;
            for key in record.fields.keys() {
                writeln!(writer, "{}: {}", key, record.cell(key))?;
            }
            if !record.media_refs.is_empty() {
                writeln!(writer, "media_refs: {}", record.media_refs.join(", "))?;
            }
        }

        writer.flush()?;
        Ok(())
    }
}

/// A standalone HTML document holding one table
pub struct HtmlWriter;

impl RecordWriter for HtmlWriter {
    fn write(&self, records: &[ExtractedRecord], path: &Path) -> OutputResult<()> {
        let (header, rows) = table(records);
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str("<title>Extracted records</title>\n</head>\n<body>\n<table>\n<thead>\n<tr>");
        for name in &header {
            html.push_str(&format!("<th>{}</th>", escape_html(name)));
        }
        html.push_str("</tr>\n</thead>\n<tbody>\n");

        for row in &rows {
            html.push_str("<tr>");
            for value in row {
                html.push_str(&format!("<td>{}</td>", escape_html(value)));
            }
            html.push_str("</tr>\n");
        }

        html.push_str("</tbody>\n</table>\n</body>\n</html>\n");

        std::fs::write(path, html)?;
        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
