//! CSV Serializer
//!
//! 抽出済み行列をCSVテキストに変換するモジュール。
//!
//! # 出力規則
//!
//! - 区切り文字はカンマ1文字
//! - フィールドがカンマ、ダブルクォート、改行（`\n`または`\r`）を含む場合のみ
//!   `"`で囲み、内部の`"`を`""`に二重化する
//! - 行区切りはCRLF（`\r\n`）で統一し、最終行の後には付けない
//! - 空フィールドはクォートしない（幅0の行は空行になる）

use std::borrow::Cow;
use std::io::Write;

use crate::error::XlsxToCsvError;

/// フィールド区切り文字
pub const FIELD_DELIMITER: char = ',';

/// 行区切り
pub const ROW_TERMINATOR: &str = "\r\n";

/// CSVシリアライザー
///
/// 区切り文字やクォート規則は固定で、設定項目を持ちません。
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSerializer;

impl CsvSerializer {
    /// 新しいシリアライザーを生成
    pub fn new() -> Self {
        Self
    }

    /// 行列をCSV文字列に変換する
    ///
    /// 行数0の行列は空文字列になります。
    pub fn serialize(&self, matrix: &[Vec<String>]) -> String {
        let mut out = String::new();

        for (row_idx, row) in matrix.iter().enumerate() {
            if row_idx > 0 {
                out.push_str(ROW_TERMINATOR);
            }
            push_row(&mut out, row);
        }

        out
    }

    /// 行列をCSVとしてライターへ書き出す
    ///
    /// 出力されるバイト列は`serialize`の結果と同一です。
    pub fn write_to<W: Write>(
        &self,
        matrix: &[Vec<String>],
        writer: &mut W,
    ) -> Result<(), XlsxToCsvError> {
        let mut line = String::new();

        for (row_idx, row) in matrix.iter().enumerate() {
            if row_idx > 0 {
                writer.write_all(ROW_TERMINATOR.as_bytes())?;
            }
            line.clear();
            push_row(&mut line, row);
            writer.write_all(line.as_bytes())?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// 行列をCSV文字列に変換する
///
/// # 使用例
///
/// ```rust
/// use xlsxcsv::serialize_matrix;
///
/// let matrix = vec![
///     vec!["name".to_string(), "note".to_string()],
///     vec!["Smith, John".to_string(), "He said \"hi\"".to_string()],
/// ];
///
/// assert_eq!(
///     serialize_matrix(&matrix),
///     "name,note\r\n\"Smith, John\",\"He said \"\"hi\"\"\""
/// );
/// ```
pub fn serialize_matrix(matrix: &[Vec<String>]) -> String {
    CsvSerializer.serialize(matrix)
}

/// 1行分のフィールドを連結して追加
fn push_row(out: &mut String, row: &[String]) {
    for (col_idx, field) in row.iter().enumerate() {
        if col_idx > 0 {
            out.push(FIELD_DELIMITER);
        }
        out.push_str(&escape_csv(field));
    }
}

/// CSVフィールドをエスケープ
///
/// 区切り文字・ダブルクォート・改行を含む場合のみクォートします。
fn escape_csv(field: &str) -> Cow<'_, str> {
    if field.contains(|c| c == FIELD_DELIMITER || c == '"' || c == '\n' || c == '\r') {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
