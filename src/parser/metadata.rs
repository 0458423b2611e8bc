//! XML Metadata Parser Module
//!
//! XLSX内部のXMLファイルから、calamineで取得できない情報を抽出するモジュール。
//! シート名とワークシートパーツの対応、1904年エポック判定、リッチテキスト、
//! ハイパーリンクを提供します。

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::XlsxToCsvError;
use crate::types::{CellCoord, RichText};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// 範囲指定のハイパーリンクを展開する最大セル数
///
/// これを超える範囲は左上のセルにのみ適用します。
const MAX_HYPERLINK_RANGE_CELLS: u64 = 10_000;

/// シート単位のメタデータ
#[derive(Debug, Clone, Default)]
pub(crate) struct SheetMetadata {
    /// セル座標 -> リッチテキストの共有文字列インデックス
    pub rich_string_cells: HashMap<CellCoord, u32>,
    /// セル座標 -> リンク先（外部URI、またはブック内リンクの`#location`）
    pub hyperlinks: HashMap<CellCoord, String>,
}

/// XLSXパッケージのメタデータ
#[derive(Debug, Clone, Default)]
pub(crate) struct PackageMetadata {
    /// 1904年エポックを使用するかどうか
    is_1904: bool,
    /// 共有文字列インデックス -> リッチテキスト（`<r>`を持つものだけ）
    rich_strings: HashMap<u32, RichText>,
    /// シート名 -> シートメタデータ
    sheets: HashMap<String, SheetMetadata>,
}

impl PackageMetadata {
    /// ZIPアーカイブからメタデータを解析
    ///
    /// アーカイブは事前に`SecurityConfig::inspect_archive`で検査済みである前提です。
    pub fn parse<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Self, XlsxToCsvError> {
        let (sheet_refs, is_1904) = match read_part(archive, WORKBOOK_PART)? {
            Some(xml) => parse_workbook_xml(&xml)?,
            None => (Vec::new(), false),
        };

        let workbook_rels = match read_part(archive, WORKBOOK_RELS_PART)? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };

        let rich_strings = match read_part(archive, SHARED_STRINGS_PART)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => HashMap::new(),
        };

        let mut sheets = HashMap::new();
        for sheet_ref in sheet_refs {
            let Some(target) = workbook_rels.get(&sheet_ref.rel_id) else {
                tracing::debug!(sheet = %sheet_ref.name, "sheet has no workbook relationship");
                continue;
            };
            let part = resolve_part_path("xl", target);

            let Some(sheet_xml) = read_part(archive, &part)? else {
                tracing::debug!(sheet = %sheet_ref.name, part = %part, "worksheet part not found");
                continue;
            };

            let sheet_rels = match read_part(archive, &rels_path_for(&part))? {
                Some(xml) => parse_relationships(&xml)?,
                None => HashMap::new(),
            };

            let metadata = parse_worksheet_xml(&sheet_xml, &rich_strings, &sheet_rels)?;
            sheets.insert(sheet_ref.name, metadata);
        }

        Ok(Self {
            is_1904,
            rich_strings,
            sheets,
        })
    }

    /// 1904年エポックを使用するかどうか
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    /// シートのメタデータを取得
    pub fn sheet(&self, name: &str) -> Option<&SheetMetadata> {
        self.sheets.get(name)
    }

    /// セルのリッチテキストを取得
    pub fn rich_text(&self, sheet: &SheetMetadata, coord: CellCoord) -> Option<&RichText> {
        sheet
            .rich_string_cells
            .get(&coord)
            .and_then(|index| self.rich_strings.get(index))
    }
}

/// workbook.xmlの`<sheet>`要素
#[derive(Debug, Clone, PartialEq)]
struct SheetRef {
    name: String,
    rel_id: String,
}

/// ZIPエントリを読み込む（存在しない場合は`None`）
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, XlsxToCsvError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    Ok(Some(content))
}

/// 属性値を取得（名前空間プレフィックスは無視）
fn attribute(e: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<String>, XlsxToCsvError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| XlsxToCsvError::Xml(e.to_string()))?;
        if attr.key.local_name().as_ref() == local_name {
            let raw = std::str::from_utf8(&attr.value)?;
            let value = unescape(raw).map_err(|e| XlsxToCsvError::Xml(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// `1` / `true` 形式の真偽値属性
fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// xl/workbook.xml を解析
///
/// シート名とリレーションシップIDの一覧（ブック内の順序）と、
/// `<workbookPr date1904="1"/>`の値を返します。
fn parse_workbook_xml(xml: &[u8]) -> Result<(Vec<SheetRef>, bool), XlsxToCsvError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut is_1904 = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"workbookPr" => {
                    if let Some(value) = attribute(&e, b"date1904")? {
                        is_1904 = is_truthy(&value);
                    }
                }
                b"sheet" => {
                    let name = attribute(&e, b"name")?;
                    let rel_id = attribute(&e, b"id")?;
                    if let (Some(name), Some(rel_id)) = (name, rel_id) {
                        sheets.push(SheetRef { name, rel_id });
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((sheets, is_1904))
}

/// リレーションシップファイル（*.rels）を解析
///
/// Id -> Target のマッピングを返します。
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, XlsxToCsvError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                {
                    relationships.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// xl/sharedStrings.xml を解析
///
/// `<r>`要素を持つ文字列だけをリッチテキストとして返します。
/// フリガナ（`<rPh>`）のテキストは含めません。
fn parse_shared_strings(xml: &[u8]) -> Result<HashMap<u32, RichText>, XlsxToCsvError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut rich_strings = HashMap::new();

    let mut index: u32 = 0;
    let mut in_si = false;
    let mut in_t = false;
    let mut phonetic_depth = 0usize;
    let mut has_runs = false;
    let mut runs: Vec<String> = Vec::new();
    let mut fragment = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    has_runs = false;
                    runs.clear();
                }
                b"r" if in_si && phonetic_depth == 0 => has_runs = true,
                b"rPh" if in_si => phonetic_depth += 1,
                b"t" if in_si && phonetic_depth == 0 => {
                    in_t = true;
                    fragment.clear();
                }
                _ => {}
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"si" {
                    // 空の<si/>も1つのインデックスを消費する
                    index += 1;
                }
            }
            Event::Text(e) if in_t => fragment.push_str(&e.unescape()?),
            Event::CData(e) if in_t => fragment.push_str(&String::from_utf8_lossy(&e)),
            Event::End(e) => match e.local_name().as_ref() {
                b"t" if in_t => {
                    in_t = false;
                    runs.push(std::mem::take(&mut fragment));
                }
                b"rPh" if phonetic_depth > 0 => phonetic_depth -= 1,
                b"si" => {
                    if has_runs {
                        rich_strings.insert(index, RichText::new(runs.drain(..)));
                    }
                    in_si = false;
                    index += 1;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(rich_strings)
}

/// ワークシートXMLを解析
///
/// リッチテキストを参照するセルの座標と、`<hyperlinks>`要素を抽出します。
/// `<c>`の`r`属性が省略されている場合は直前のセルの位置から補完します。
fn parse_worksheet_xml(
    xml: &[u8],
    rich_strings: &HashMap<u32, RichText>,
    relationships: &HashMap<String, String>,
) -> Result<SheetMetadata, XlsxToCsvError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut metadata = SheetMetadata::default();

    let mut next_row: u32 = 0;
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 0;
    let mut cell: Option<(CellCoord, bool)> = None;
    let mut in_v = false;
    let mut value = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                current_row = match attribute(&e, b"r")?.and_then(|r| r.parse::<u32>().ok()) {
                    Some(r) if r > 0 => r - 1,
                    _ => next_row,
                };
                next_row = current_row + 1;
                next_col = 0;
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let coord = attribute(&e, b"r")?
                    .and_then(|r| CellCoord::parse_a1(&r))
                    .unwrap_or(CellCoord::new(current_row, next_col));
                next_col = coord.col + 1;

                let is_shared = attribute(&e, b"t")?.as_deref() == Some("s");
                cell = Some((coord, is_shared));
                value.clear();
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                if let Some(coord) = attribute(&e, b"r")?.and_then(|r| CellCoord::parse_a1(&r)) {
                    next_col = coord.col + 1;
                } else {
                    next_col += 1;
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"v" => in_v = cell.is_some(),
            Event::Text(e) if in_v => value.push_str(&e.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"v" => in_v = false,
                b"c" => {
                    if let Some((coord, true)) = cell.take() {
                        if let Ok(index) = value.trim().parse::<u32>() {
                            if rich_strings.contains_key(&index) {
                                metadata.rich_string_cells.insert(coord, index);
                            }
                        }
                    }
                    cell = None;
                }
                _ => {}
            },
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"hyperlink" => {
                parse_hyperlink_element(&e, relationships, &mut metadata.hyperlinks)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(metadata)
}

/// `<hyperlink ref="A1" r:id="rId1" location="Sheet2!A1"/>`を解析
///
/// リンク先を持たない要素は無視します。
fn parse_hyperlink_element(
    e: &BytesStart<'_>,
    relationships: &HashMap<String, String>,
    hyperlinks: &mut HashMap<CellCoord, String>,
) -> Result<(), XlsxToCsvError> {
    let Some(reference) = attribute(e, b"ref")? else {
        return Ok(());
    };

    let external = attribute(e, b"id")?.and_then(|id| relationships.get(&id).cloned());
    let location = attribute(e, b"location")?.filter(|l| !l.is_empty());
    let target = match (external, location) {
        (Some(url), Some(location)) => format!("{}#{}", url, location),
        (Some(url), None) => url,
        (None, Some(location)) => format!("#{}", location),
        (None, None) => return Ok(()),
    };

    let mut bounds = reference.split(':');
    let Some(first) = bounds.next().and_then(CellCoord::parse_a1) else {
        return Ok(());
    };
    let last = bounds.next().and_then(CellCoord::parse_a1).unwrap_or(first);

    let height = u64::from(last.row.saturating_sub(first.row)) + 1;
    let width = u64::from(last.col.saturating_sub(first.col)) + 1;
    if height * width > MAX_HYPERLINK_RANGE_CELLS {
        tracing::debug!(reference = %reference, "hyperlink range too large, applying to first cell only");
        hyperlinks.insert(first, target);
        return Ok(());
    }

    for row in first.row..=last.row.max(first.row) {
        for col in first.col..=last.col.max(first.col) {
            hyperlinks.insert(CellCoord::new(row, col), target.clone());
        }
    }
    Ok(())
}

/// リレーションシップのターゲットをパッケージ内のパスに解決
///
/// 絶対パス（`/xl/...`）はそのまま、相対パスは`base_dir`からの相対として扱います。
fn resolve_part_path(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("{}/{}", base_dir, target),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// パーツに対応するリレーションシップファイルのパス
///
/// 例: `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}
