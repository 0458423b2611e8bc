//! Preview Table Rendering
//!
//! 抽出済み行列の先頭行を、端末表示用に列揃えしたテキスト表として出力するモジュール。
//! 全角文字は表示幅2として扱います（`unicode-width`）。

use std::io::Write;

use unicode_width::UnicodeWidthStr;

use crate::error::XlsxToCsvError;

/// 列の最小表示幅（区切り行の最小幅）
const MIN_COLUMN_WIDTH: usize = 3;

/// 行列を列揃えした表として書き出す
///
/// 1行目をヘッダーとみなし、その直後に区切り行を挿入します。
/// 行数0または列数0の行列は何も出力しません。
pub fn render_table<W: Write>(rows: &[Vec<String>], writer: &mut W) -> Result<(), XlsxToCsvError> {
    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    if rows.is_empty() || cols == 0 {
        return Ok(());
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|value| display_cell(value)).collect())
        .collect();

    let col_widths = calculate_column_widths(&cells, cols);
    let separator = generate_separator(&col_widths);

    for (row_idx, row) in cells.iter().enumerate() {
        write!(writer, "|")?;

        for (col_idx, &width) in col_widths.iter().enumerate() {
            let content = row.get(col_idx).map(String::as_str).unwrap_or("");
            let padding = width.saturating_sub(content.width());
            write!(writer, " {}{} |", content, " ".repeat(padding))?;
        }

        writeln!(writer)?;

        if row_idx == 0 {
            writeln!(writer, "{}", separator)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// 表示用にセル内容を1行化する
///
/// 改行とタブは空白に置き換えます。
fn display_cell(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '\r' | '\n' | '\t') { ' ' } else { c })
        .collect()
}

/// 各列の最大表示幅を計算
fn calculate_column_widths(cells: &[Vec<String>], cols: usize) -> Vec<usize> {
    let mut widths = vec![MIN_COLUMN_WIDTH; cols];

    for row in cells {
        for (col_idx, cell) in row.iter().enumerate() {
            widths[col_idx] = widths[col_idx].max(cell.width());
        }
    }

    widths
}

/// ヘッダー区切り行を生成
///
/// セルの前後の空白（各1文字）を含めた幅のハイフンを`|`で連結します。
fn generate_separator(col_widths: &[usize]) -> String {
    let mut separator = String::from("|");
    for &width in col_widths {
        separator.push_str(&"-".repeat(width + 2));
        separator.push('|');
    }
    separator
}
