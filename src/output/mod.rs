//! Output Module
//!
//! 抽出済み行列の出力（CSVシリアライズとプレビュー表）を提供するモジュール。

mod csv;
mod preview;

pub use self::csv::{serialize_matrix, CsvSerializer};
pub use self::preview::render_table;
