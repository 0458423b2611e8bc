//! Builder Module
//!
//! Fluent Builder APIを提供し、`Converter`インスタンスを段階的に構築する。

use std::io::Read;

use rayon::prelude::*;

use crate::api::SheetResult;
use crate::error::XlsxToCsvError;
use crate::grid::extract_sheet;
use crate::output::CsvSerializer;
use crate::parser::WorkbookLoader;
use crate::security::{
    SecurityConfig, DEFAULT_MAX_ARCHIVE_ENTRIES, DEFAULT_MAX_DECOMPRESSED_SIZE,
    DEFAULT_MAX_INPUT_SIZE,
};
use crate::types::{Sheet, Workbook};

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConversionConfig {
    /// シートを並列に処理するか
    pub parallel: bool,

    /// 入力ファイルの最大サイズ（バイト）
    pub max_input_size: u64,

    /// ZIPアーカイブ内の最大エントリ数
    pub max_archive_entries: usize,

    /// 展開後の合計最大サイズ（バイト）
    pub max_decompressed_size: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            max_archive_entries: DEFAULT_MAX_ARCHIVE_ENTRIES,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

impl ConversionConfig {
    /// セキュリティ設定を生成
    fn security(&self) -> SecurityConfig {
        SecurityConfig {
            max_input_size: self.max_input_size,
            max_archive_entries: self.max_archive_entries,
            max_decompressed_size: self.max_decompressed_size,
            ..SecurityConfig::default()
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Converter`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxcsv::ConverterBuilder;
///
/// # fn main() -> Result<(), xlsxcsv::XlsxToCsvError> {
/// let converter = ConverterBuilder::new()
///     .with_parallel(false)
///     .with_max_input_size(64 * 1024 * 1024)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConverterBuilder {
    /// 内部設定（構築中）
    config: ConversionConfig,
}

impl ConverterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 並列処理: 有効
    /// - 入力ファイルの最大サイズ: 2GB
    /// - ZIPエントリ数の上限: 10,000
    /// - 展開後の合計最大サイズ: 1GB
    pub fn new() -> Self {
        Self::default()
    }

    /// シートを並列に処理するかを指定する
    ///
    /// 結果のシート順序と内容は、並列・逐次のどちらでも同一です。
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// 入力ファイルの最大サイズ（バイト）を指定する
    pub fn with_max_input_size(mut self, bytes: u64) -> Self {
        self.config.max_input_size = bytes;
        self
    }

    /// ZIPアーカイブ内の最大エントリ数を指定する
    pub fn with_max_archive_entries(mut self, entries: usize) -> Self {
        self.config.max_archive_entries = entries;
        self
    }

    /// 展開後の合計最大サイズ（バイト）を指定する
    pub fn with_max_decompressed_size(mut self, bytes: u64) -> Self {
        self.config.max_decompressed_size = bytes;
        self
    }

    /// 設定を検証し、`Converter`を構築する
    ///
    /// # エラー
    ///
    /// いずれかの上限値が0の場合は`XlsxToCsvError::Config`を返します。
    pub fn build(self) -> Result<Converter, XlsxToCsvError> {
        if self.config.max_input_size == 0 {
            return Err(XlsxToCsvError::Config(
                "max input size must be greater than zero".to_string(),
            ));
        }

        if self.config.max_archive_entries == 0 {
            return Err(XlsxToCsvError::Config(
                "max archive entries must be greater than zero".to_string(),
            ));
        }

        if self.config.max_decompressed_size == 0 {
            return Err(XlsxToCsvError::Config(
                "max decompressed size must be greater than zero".to_string(),
            ));
        }

        Ok(Converter::new(self.config))
    }
}

/// XLSX → CSV 変換器
///
/// ワークブックを読み込み、シートごとに行列を抽出してCSVへシリアライズします。
/// 変換要求ごとに状態を持たないため、複数スレッドから共有できます。
#[derive(Debug, Clone)]
pub struct Converter {
    config: ConversionConfig,
    loader: WorkbookLoader,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConversionConfig::default())
    }
}

impl Converter {
    pub(crate) fn new(config: ConversionConfig) -> Self {
        Self {
            loader: WorkbookLoader::new(config.security()),
            config,
        }
    }

    /// XLSXのバイト列を変換する
    ///
    /// 結果はワークブック内のシート順に並びます。デコードに失敗した場合は
    /// エラーを返し、部分的な結果は返しません。
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxcsv::ConverterBuilder;
    ///
    /// # fn main() -> Result<(), xlsxcsv::XlsxToCsvError> {
    /// let converter = ConverterBuilder::new().build()?;
    /// let bytes = std::fs::read("report.xlsx")?;
    ///
    /// for sheet in converter.convert(&bytes)? {
    ///     println!("{} ({} rows)", sheet.name, sheet.row_count);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert(&self, bytes: &[u8]) -> Result<Vec<SheetResult>, XlsxToCsvError> {
        let workbook = self.load(bytes)?;
        Ok(self.convert_workbook(&workbook))
    }

    /// リーダーから読み込んで変換する
    ///
    /// 入力サイズの上限を超えた時点で読み込みを打ち切ります。
    pub fn convert_reader<R: Read>(&self, input: R) -> Result<Vec<SheetResult>, XlsxToCsvError> {
        let mut buffer = Vec::new();
        input
            .take(self.config.max_input_size.saturating_add(1))
            .read_to_end(&mut buffer)?;
        self.convert(&buffer)
    }

    /// XLSXのバイト列をセルモデルとして読み込む
    pub fn load(&self, bytes: &[u8]) -> Result<Workbook, XlsxToCsvError> {
        self.loader.load(bytes)
    }

    /// 読み込み済みのワークブックを変換する
    ///
    /// セル単位の読み取りエラーは空文字列として回復されるため、この処理は失敗しません。
    pub fn convert_workbook(&self, workbook: &Workbook) -> Vec<SheetResult> {
        tracing::debug!(
            sheets = workbook.sheets.len(),
            parallel = self.config.parallel,
            "converting workbook"
        );

        if self.config.parallel {
            // collect()は入力順を保持する
            workbook.sheets.par_iter().map(convert_sheet).collect()
        } else {
            workbook.sheets.iter().map(convert_sheet).collect()
        }
    }
}

/// 1シートを抽出・シリアライズする
fn convert_sheet(sheet: &Sheet) -> SheetResult {
    let matrix = extract_sheet(sheet);
    let csv = CsvSerializer.serialize(&matrix);

    tracing::debug!(
        sheet = %sheet.name,
        rows = matrix.len(),
        bytes = csv.len(),
        "converted sheet"
    );

    SheetResult {
        name: sheet.name.clone(),
        row_count: matrix.len(),
        matrix,
        csv,
    }
}

/// デフォルト設定でXLSXのバイト列を変換する
///
/// # 使用例
///
/// ```rust,no_run
/// # fn main() -> Result<(), xlsxcsv::XlsxToCsvError> {
/// let bytes = std::fs::read("report.xlsx")?;
/// let sheets = xlsxcsv::convert(&bytes)?;
/// # Ok(())
/// # }
/// ```
pub fn convert(bytes: &[u8]) -> Result<Vec<SheetResult>, XlsxToCsvError> {
    Converter::default().convert(bytes)
}
