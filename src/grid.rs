//! Grid Module
//!
//! シートの行を走査し、矩形の文字列行列を構築するモジュール（Sheet Extractor）。
//!
//! 行ごとの列数は一様ではない（末尾の疎なセル）ため、行列の幅はシート全体を
//! 走査し終えるまで確定しません。そのため2パスで処理します。
//!
//! 1. 全行の`cell_count()`の最大値を求める
//! 2. 各行について列1..=最大列数のセルを正規化し、不足分を`""`で埋める

use crate::formatter::normalize_cell;
use crate::types::Sheet;

/// 抽出済み行列（行 × 列の表示文字列）
///
/// すべての行は同じ長さ（シートの最大列数）を持ちます。
pub type ExtractedMatrix = Vec<Vec<String>>;

/// シートを矩形の文字列行列に変換する
///
/// - 行列の行数はシートの行数と一致します（空行も全列空の行として保持）
/// - 各行の長さはシート内の最大列数と一致します（空シートは0）
/// - 存在しない位置のセルは空文字列になります
///
/// # 使用例
///
/// ```rust
/// use xlsxcsv::{extract_sheet, Cell, Row, Sheet};
///
/// let sheet = Sheet::new("Sales")
///     .with_row(Row::from_cells(vec![Cell::text("a"), Cell::text("b")]))
///     .with_row(Row::from_cells(vec![Cell::text("c")]));
///
/// let matrix = extract_sheet(&sheet);
/// assert_eq!(matrix, vec![vec!["a", "b"], vec!["c", ""]]);
/// ```
pub fn extract_sheet(sheet: &Sheet) -> ExtractedMatrix {
    // 1パス目: 最大列数
    let max_cells = max_cell_count(sheet);

    // 2パス目: 正規化とパディング
    let mut matrix = Vec::with_capacity(sheet.rows.len());
    for (row_idx, row) in sheet.rows.iter().enumerate() {
        let mut values = Vec::with_capacity(max_cells as usize);

        for col in 1..=max_cells {
            let span = tracing::trace_span!("cell", sheet = %sheet.name, row = row_idx + 1, col);
            let _guard = span.enter();
            values.push(normalize_cell(row.cell(col)));
        }

        // cell_count()より後ろにセルを持たない行も幅を揃える
        pad_row(&mut values, max_cells as usize);

        matrix.push(values);
    }

    tracing::debug!(
        sheet = %sheet.name,
        rows = matrix.len(),
        cols = max_cells,
        "extracted sheet"
    );

    matrix
}

/// シート内の最大列数（空シートは0）
fn max_cell_count(sheet: &Sheet) -> u32 {
    sheet
        .rows
        .iter()
        .map(|row| row.cell_count())
        .max()
        .unwrap_or(0)
}

/// 行を指定の幅まで空文字列で埋める
fn pad_row(values: &mut Vec<String>, width: usize) {
    if values.len() < width {
        values.resize(width, String::new());
    }
}
