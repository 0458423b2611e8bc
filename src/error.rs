//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// `XlsxToCsvError`を使用する`Result`型エイリアス
pub type Result<T> = std::result::Result<T, XlsxToCsvError>;

/// 変換処理全体を中断するエラー型
///
/// いずれのバリアントも変換要求全体を中断し、部分的なシート結果は返されません。
///
/// # エラーの種類
///
/// - `Io`: I/O操作中に発生したエラー
/// - `Decode`: calamineがワークブックを解析できなかったエラー
/// - `UnsupportedFormat`: XLSX以外のコンテナ形式
/// - `Zip` / `Xml` / `Utf8`: パッケージメタデータの読み取りエラー
/// - `Config`: 設定の検証に失敗したエラー
/// - `SecurityViolation`: 入力サイズなどの制限に違反したエラー
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxcsv::XlsxToCsvError;
///
/// fn read_input(path: &str) -> Result<Vec<u8>, XlsxToCsvError> {
///     let bytes = std::fs::read(path)?;  // Ioエラーが自動的に変換される
///     Ok(bytes)
/// }
/// ```
#[derive(Error, Debug)]
pub enum XlsxToCsvError {
    /// I/O操作中に発生したエラー
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ワークブックの解析エラー（calamine由来）
    ///
    /// 破損したファイルや、スプレッドシートではないファイルが原因となります。
    #[error("Failed to decode workbook: {0}")]
    Decode(#[from] calamine::Error),

    /// サポートされていないコンテナ形式（XLSX以外）
    #[error("Unsupported workbook format: {0}")]
    UnsupportedFormat(String),

    /// ZIPアーカイブの解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// パッケージ内XMLの解析エラー
    #[error("XML parse error: {0}")]
    Xml(String),

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// 設定の検証に失敗したエラー
    ///
    /// `ConverterBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。
    ///
    /// ```rust,no_run
    /// use xlsxcsv::{ConverterBuilder, XlsxToCsvError};
    ///
    /// match ConverterBuilder::new().with_max_input_size(0).build() {
    ///     Err(XlsxToCsvError::Config(msg)) => println!("設定エラー: {}", msg),
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// 入力サイズ、ZIPエントリ数、展開後サイズ、不正なエントリパスなどが対象です。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl XlsxToCsvError {
    /// 入力バイト列そのものに起因するエラー（デコードエラー）かどうか
    ///
    /// `Io`と`Config`以外はすべて入力ファイルの問題として扱います。
    pub fn is_decode_error(&self) -> bool {
        !matches!(self, XlsxToCsvError::Io(_) | XlsxToCsvError::Config(_))
    }
}

impl From<zip::result::ZipError> for XlsxToCsvError {
    fn from(err: zip::result::ZipError) -> Self {
        XlsxToCsvError::Zip(err.to_string())
    }
}

impl From<quick_xml::Error> for XlsxToCsvError {
    fn from(err: quick_xml::Error) -> Self {
        XlsxToCsvError::Xml(err.to_string())
    }
}

/// 個々のセルの読み取りエラー
///
/// セル正規化の内部でのみ使用され、正規化の境界で空文字列に変換されます。
/// 呼び出し元へ伝播することはありません。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CellReadError {
    /// シリアル日付値が表現可能な範囲外
    #[error("date serial {serial} is out of range")]
    DateOutOfRange {
        /// 元のシリアル値
        serial: f64,
    },

    /// 日付文字列を解釈できない
    #[error("invalid date '{0}'")]
    InvalidDate(String),

    /// 数値が有限でない（NaN / 無限大）
    #[error("number is not finite")]
    NonFiniteNumber,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error: XlsxToCsvError = io_err.into();

        match error {
            XlsxToCsvError::Io(e) => {
                assert_eq!(e.kind(), io::ErrorKind::NotFound);
                assert_eq!(e.to_string(), "File not found");
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_decode_error_display() {
        let error: XlsxToCsvError = calamine::Error::Msg("Corrupted file").into();

        let error_msg = error.to_string();
        assert!(error_msg.starts_with("Failed to decode workbook"));
        assert!(error_msg.contains("Corrupted file"));
        assert!(error.is_decode_error());
    }

    #[test]
    fn test_config_error_is_not_decode_error() {
        let error = XlsxToCsvError::Config("max input size must be positive".to_string());
        assert!(error.to_string().starts_with("Configuration error"));
        assert!(!error.is_decode_error());
    }

    #[test]
    fn test_zip_error_conversion() {
        let error: XlsxToCsvError = zip::result::ZipError::InvalidArchive("bad header").into();
        match error {
            XlsxToCsvError::Zip(msg) => assert!(msg.contains("bad header")),
            _ => panic!("Expected Zip error"),
        }
    }

    #[test]
    fn test_error_conversion_with_question_mark() {
        fn io_operation() -> Result<()> {
            let _bytes = std::fs::read("nonexistent_file.xlsx")?;
            Ok(())
        }

        match io_operation() {
            Err(XlsxToCsvError::Io(_)) => {}
            _ => panic!("Expected Io error from ? operator"),
        }
    }

    #[test]
    fn test_all_error_formats() {
        let cases: Vec<(XlsxToCsvError, &str)> = vec![
            (io::Error::other("test io").into(), "IO error"),
            (
                XlsxToCsvError::UnsupportedFormat("xls".to_string()),
                "Unsupported workbook format",
            ),
            (XlsxToCsvError::Xml("eof".to_string()), "XML parse error"),
            (
                XlsxToCsvError::SecurityViolation("too big".to_string()),
                "Security violation",
            ),
        ];

        for (error, prefix) in cases {
            assert!(error.to_string().starts_with(prefix), "{}", error);
        }
    }

    #[test]
    fn test_cell_read_error_display() {
        let error = CellReadError::DateOutOfRange { serial: -3.0 };
        assert_eq!(error.to_string(), "date serial -3 is out of range");
        assert_eq!(
            CellReadError::InvalidDate("soon".to_string()).to_string(),
            "invalid date 'soon'"
        );
    }
}
