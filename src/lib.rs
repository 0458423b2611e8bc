//! xlsxcsv - Pure-Rust Excel (XLSX) to CSV converter
//!
//! This crate decodes an XLSX workbook and turns every worksheet into a
//! rectangular matrix of display strings and its CSV serialization, one result
//! per sheet in workbook order.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = std::fs::read("report.xlsx")?;
//!
//!     // Convert with default settings
//!     let sheets = xlsxcsv::convert(&bytes)?;
//!
//!     let base = xlsxcsv::export_base_name("report.xlsx");
//!     for sheet in &sheets {
//!         // report_Sales.csv, report_Notes.csv, ...
//!         std::fs::write(sheet.export_file_name(&base), &sheet.csv)?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use xlsxcsv::{ConverterBuilder, DEFAULT_PREVIEW_ROWS};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = ConverterBuilder::new()
//!         .with_parallel(false)                    // Process sheets sequentially
//!         .with_max_input_size(256 * 1024 * 1024)  // Reject inputs above 256MB
//!         .build()?;
//!
//!     let input = std::fs::File::open("report.xlsx")?;
//!     for sheet in converter.convert_reader(input)? {
//!         println!("{} ({} rows)", sheet.name, sheet.row_count);
//!         print!("{}", sheet.render_preview(DEFAULT_PREVIEW_ROWS));
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Working with the Cell Model
//!
//! The extraction and serialization steps are pure functions over the cell
//! model, so a workbook from another source can be converted directly:
//!
//! ```rust
//! use xlsxcsv::{extract_sheet, serialize_matrix, Cell, Row, Sheet};
//!
//! let sheet = Sheet::new("Contacts")
//!     .with_row(Row::from_cells(vec![Cell::text("name"), Cell::text("email")]))
//!     .with_row(Row::from_cells(vec![Cell::text("Smith, John")]));
//!
//! let matrix = extract_sheet(&sheet);
//! assert_eq!(serialize_matrix(&matrix), "name,email\r\n\"Smith, John\",");
//! ```

mod api;
mod builder;
mod error;
mod formatter;
mod grid;
mod output;
mod parser;
mod security;
mod types;

// 公開API
pub use api::{export_base_name, SheetResult, DEFAULT_PREVIEW_ROWS};
pub use builder::{convert, Converter, ConverterBuilder};
pub use error::{CellReadError, Result, XlsxToCsvError};
pub use formatter::normalize_cell;
pub use grid::{extract_sheet, ExtractedMatrix};
pub use output::{render_table, serialize_matrix, CsvSerializer};
pub use types::{
    Cell, CellContent, CellValue, DateValue, HyperlinkText, RichText, Row, Sheet, Workbook,
};
