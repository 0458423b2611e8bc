//! Workbook Loader Module
//!
//! calamineを使用してXLSXファイルを解析し、セルモデル（`Workbook`）を構築するモジュール。
//! calamineで取得できないリッチテキストとハイパーリンクは`PackageMetadata`で補完します。

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets, Xlsx};
use zip::ZipArchive;

use crate::error::XlsxToCsvError;
use crate::parser::metadata::{PackageMetadata, SheetMetadata};
use crate::security::SecurityConfig;
use crate::types::{
    Cell, CellContent, CellCoord, CellValue, DateValue, HyperlinkText, Row, Sheet, Workbook,
};

/// OLE2複合ドキュメント（.xls）のシグネチャ
const OLE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// ワークブックローダー
///
/// 生のバイト列を受け取り、`Workbook`を返します。XLSX形式のみ対応します。
#[derive(Debug, Clone, Default)]
pub(crate) struct WorkbookLoader {
    security: SecurityConfig,
}

impl WorkbookLoader {
    /// セキュリティ設定を指定してローダーを生成
    pub fn new(security: SecurityConfig) -> Self {
        Self { security }
    }

    /// バイト列からワークブックを読み込む
    ///
    /// # エラー
    ///
    /// - 入力がセキュリティ制限に違反する場合は`SecurityViolation`
    /// - XLSX以外の形式は`UnsupportedFormat`
    /// - 解析に失敗した場合は`Zip` / `Xml` / `Decode`
    pub fn load(&self, bytes: &[u8]) -> Result<Workbook, XlsxToCsvError> {
        self.security.check_input_size(bytes.len())?;

        if bytes.starts_with(&OLE_SIGNATURE) {
            return Err(XlsxToCsvError::UnsupportedFormat(
                "legacy binary workbook (.xls); only XLSX is supported".to_string(),
            ));
        }

        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        self.security.inspect_archive(&mut archive)?;

        let mut workbook = match open_workbook_auto_from_rs(Cursor::new(bytes))? {
            Sheets::Xlsx(workbook) => workbook,
            other => {
                return Err(XlsxToCsvError::UnsupportedFormat(format!(
                    "{} workbook; only XLSX is supported",
                    container_name(&other)
                )))
            }
        };

        let metadata = PackageMetadata::parse(&mut archive)?;
        let is_1904 = metadata.is_1904();

        let sheet_names = workbook.sheet_names().to_vec();
        tracing::debug!(sheets = sheet_names.len(), is_1904, "opened workbook");

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for name in sheet_names {
            let sheet = load_sheet(&mut workbook, &name, &metadata)?;
            tracing::debug!(sheet = %name, rows = sheet.row_count(), "loaded sheet");
            sheets.push(sheet);
        }

        Ok(Workbook::new(sheets))
    }
}

/// calamineが判別したコンテナ形式の名前
fn container_name<RS>(sheets: &Sheets<RS>) -> &'static str
where
    RS: std::io::Read + std::io::Seek,
{
    match sheets {
        Sheets::Xls(_) => "XLS",
        Sheets::Xlsx(_) => "XLSX",
        Sheets::Xlsb(_) => "XLSB",
        Sheets::Ods(_) => "ODS",
    }
}

/// 1シート分のセルモデルを構築
///
/// 行・列の位置はA1を原点とする絶対位置です。
fn load_sheet<RS>(
    workbook: &mut Xlsx<RS>,
    name: &str,
    metadata: &PackageMetadata,
) -> Result<Sheet, XlsxToCsvError>
where
    RS: std::io::Read + std::io::Seek,
{
    let range = workbook
        .worksheet_range(name)
        .map_err(calamine::Error::from)?;
    let formulas = match workbook.worksheet_formula(name) {
        Ok(formulas) => Some(formulas),
        Err(e) => {
            tracing::debug!(sheet = %name, error = %e, "formulas unavailable");
            None
        }
    };

    let default_metadata = SheetMetadata::default();
    let sheet_metadata = metadata.sheet(name).unwrap_or(&default_metadata);
    let is_1904 = metadata.is_1904();

    let mut cells: BTreeMap<CellCoord, Cell> = BTreeMap::new();

    // 1. 値を持つセル
    for (coord, data) in used_cells(&range) {
        let rich = metadata.rich_text(sheet_metadata, coord);
        let content = match rich {
            Some(rich) if matches!(data, Data::String(_)) => CellContent::RichText(rich.clone()),
            _ => content_from_data(data, is_1904),
        };
        cells.insert(coord, Cell::new(content));
    }

    // 2. 数式（キャッシュ値で包む）
    if let Some(formulas) = &formulas {
        for (coord, expression) in used_cells(formulas) {
            if expression.is_empty() {
                continue;
            }
            let result = range
                .get_value((coord.row, coord.col))
                .map(|data| value_from_data(data, is_1904))
                .filter(|value| !value.is_empty());
            cells.insert(coord, Cell::formula(expression.clone(), result));
        }
    }

    // 3. ハイパーリンク
    apply_hyperlinks(&mut cells, &sheet_metadata.hyperlinks);

    Ok(build_sheet(name, cells))
}

/// 値を持つセルを絶対座標とともに列挙
fn used_cells<T>(range: &Range<T>) -> impl Iterator<Item = (CellCoord, &T)> + '_
where
    T: calamine::CellType,
{
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    range.used_cells().map(move |(row, col, value)| {
        (
            CellCoord::new(start_row + row as u32, start_col + col as u32),
            value,
        )
    })
}

/// セル座標のマップから行のリストを構築
///
/// 最後に値を持つ行までを、途中の空行も含めて生成します。
fn build_sheet(name: &str, cells: BTreeMap<CellCoord, Cell>) -> Sheet {
    let row_count = cells
        .keys()
        .next_back()
        .map(|coord| coord.row as usize + 1)
        .unwrap_or(0);

    let mut sheet = Sheet::new(name);
    sheet.rows = vec![Row::new(); row_count];
    for (coord, cell) in cells {
        sheet.rows[coord.row as usize].set(coord.col + 1, cell);
    }
    sheet
}

/// 値を持つセルにのみハイパーリンクを適用
///
/// 範囲指定のリンクが空白セルを含んでいても、新しいセルは作りません。
fn apply_hyperlinks(cells: &mut BTreeMap<CellCoord, Cell>, links: &HashMap<CellCoord, String>) {
    for (coord, cell) in cells.iter_mut() {
        if let Some(target) = links.get(coord) {
            *cell = apply_hyperlink(std::mem::take(cell), target);
        }
    }
}

/// ハイパーリンクをセルに適用
///
/// 文字列・リッチテキストのセルはハイパーリンク型に変換し、
/// それ以外の型のセルにはリンク先を注記として付与します（空セルは空のまま）。
fn apply_hyperlink(cell: Cell, target: &str) -> Cell {
    let display = match cell.content {
        CellContent::Text(text) => HyperlinkText::Plain(text),
        CellContent::RichText(rich) => HyperlinkText::Rich(rich),
        content => return Cell { content, ..cell }.with_hyperlink(target),
    };

    Cell::hyperlink(Some(display), Some(target.to_string()))
}

/// calamineのセル値をセル内容に変換
fn content_from_data(data: &Data, is_1904: bool) -> CellContent {
    match value_from_data(data, is_1904) {
        CellValue::Empty => CellContent::Empty,
        CellValue::Text(text) => CellContent::Text(text),
        CellValue::Number(n) => CellContent::Number(n),
        CellValue::Bool(b) => CellContent::Bool(b),
        CellValue::Error(e) => CellContent::Error(e),
        CellValue::Date(date) => CellContent::Date(date),
    }
}

/// calamineのセル値を値に変換
///
/// 期間（duration）として書式設定されたシリアル値は数値として扱います。
fn value_from_data(data: &Data, is_1904: bool) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::DateTime(dt) if dt.is_duration() => CellValue::Number(dt.as_f64()),
        Data::DateTime(dt) => CellValue::Date(DateValue::Serial {
            value: dt.as_f64(),
            is_1904,
        }),
        Data::DateTimeIso(s) => CellValue::Date(DateValue::Iso(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
