//! Parser Module
//!
//! XLSXファイルを解析し、セルモデルを構築するワークブックローダー。
//! セル値はcalamineで、calamineで取得できない情報はパッケージ内のXMLから取得します。

mod metadata;
mod workbook;

pub(crate) use workbook::WorkbookLoader;
