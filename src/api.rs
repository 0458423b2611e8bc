//! Public API Types
//!
//! 変換結果（シートごとの行列とCSVテキスト）と、エクスポート時の命名規則を
//! 定義するモジュール。

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::XlsxToCsvError;
use crate::output::render_table;

/// プレビュー表示するデフォルトの行数
pub const DEFAULT_PREVIEW_ROWS: usize = 100;

/// エクスポートファイルの拡張子
const CSV_EXTENSION: &str = "csv";

/// 入力ファイルの拡張子（ベース名から取り除く）
const XLSX_EXTENSION: &str = ".xlsx";

/// シートごとの変換結果
///
/// 変換後は不変で、プレビュー（`matrix`）とファイル出力（`csv`）の両方に使用します。
/// 結果のリストはワークブック内のシート順を保持します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetResult {
    /// 元のシート名
    pub name: String,

    /// 抽出済み行列（矩形）
    pub matrix: Vec<Vec<String>>,

    /// 行列の行数
    pub row_count: usize,

    /// シリアライズ済みCSVテキスト
    pub csv: String,
}

impl SheetResult {
    /// 先頭から`limit`行を返す
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use xlsxcsv::{SheetResult, DEFAULT_PREVIEW_ROWS};
    ///
    /// let result = SheetResult {
    ///     name: "Sales".to_string(),
    ///     matrix: vec![vec!["a".to_string()]; 150],
    ///     row_count: 150,
    ///     csv: String::new(),
    /// };
    /// assert_eq!(result.preview(DEFAULT_PREVIEW_ROWS).len(), 100);
    /// ```
    pub fn preview(&self, limit: usize) -> &[Vec<String>] {
        let end = limit.min(self.matrix.len());
        &self.matrix[..end]
    }

    /// 先頭`limit`行を列揃えした表として返す
    pub fn render_preview(&self, limit: usize) -> String {
        let mut buffer = Vec::new();
        // Vec<u8>への書き込みは失敗しない
        if render_table(self.preview(limit), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// エクスポートファイル名（`{base}_{sheet}.csv`）
    ///
    /// シート名に含まれるパス区切りやファイル名に使えない文字は`_`に置き換えます。
    pub fn export_file_name(&self, base: &str) -> String {
        format!(
            "{}_{}.{}",
            base,
            sanitize_file_component(&self.name),
            CSV_EXTENSION
        )
    }

    /// CSVテキストをライターへ書き出す
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> Result<(), XlsxToCsvError> {
        writer.write_all(self.csv.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// 入力ファイルのパスからエクスポート用のベース名を求める
///
/// ディレクトリ部分と末尾の`.xlsx`（大文字小文字を区別しない）を取り除きます。
///
/// ```rust
/// use xlsxcsv::export_base_name;
///
/// assert_eq!(export_base_name("reports/Q1 Sales.XLSX"), "Q1 Sales");
/// ```
pub fn export_base_name(path: impl AsRef<Path>) -> String {
    let file_name = path
        .as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let split = file_name.len().saturating_sub(XLSX_EXTENSION.len());
    match file_name.get(split..) {
        Some(ext) if ext.eq_ignore_ascii_case(XLSX_EXTENSION) => file_name[..split].to_string(),
        _ => file_name,
    }
}

/// ファイル名の構成要素として使えない文字を`_`に置き換える
fn sanitize_file_component(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
