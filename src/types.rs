//! Types Module
//!
//! ワークブックのセルモデルを定義するモジュール。
//! ローダー（calamineアダプター）が生成し、コア（正規化・抽出・シリアライズ）は
//! 読み取り専用で参照します。

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

/// ワークブック（シートの順序付きリスト）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    /// ワークブック内の順序を保持したシート
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// シートのリストからワークブックを生成
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }
}

/// シート
///
/// シート名は一意である保証はありません。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    /// シート名
    pub name: String,

    /// 行のリスト（空行も保持する）
    pub rows: Vec<Row>,
}

impl Sheet {
    /// 空のシートを生成
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// 行を追加（ビルダー形式）
    pub fn with_row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    /// シートの行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// 行
///
/// 1始まりの列インデックスをキーとする疎なセル集合です。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// 列インデックス（1始まり） -> セル
    pub cells: BTreeMap<u32, Cell>,
}

impl Row {
    /// 空の行を生成
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定列にセルを設定（ビルダー形式）
    ///
    /// 列インデックスは1始まりです。0を指定した場合は1として扱います。
    pub fn with_cell(mut self, col: u32, cell: Cell) -> Self {
        self.set(col, cell);
        self
    }

    /// 指定列にセルを設定
    pub fn set(&mut self, col: u32, cell: Cell) {
        self.cells.insert(col.max(1), cell);
    }

    /// 行のセル数（最大の列インデックス、空行は0）
    pub fn cell_count(&self) -> u32 {
        self.cells.keys().next_back().copied().unwrap_or(0)
    }

    /// 指定列のセルを取得（存在しない位置は`None`）
    pub fn cell(&self, col: u32) -> Option<&Cell> {
        self.cells.get(&col)
    }

    /// 値の並びから行を生成（列1から順に配置）
    pub fn from_cells<I: IntoIterator<Item = Cell>>(cells: I) -> Self {
        let cells = cells
            .into_iter()
            .enumerate()
            .map(|(idx, cell)| (idx as u32 + 1, cell))
            .collect();
        Self { cells }
    }
}

/// セル
///
/// 主たる内容（`content`）に加えて、内容の型とは独立したハイパーリンク注記を持てます。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// セルの内容
    pub content: CellContent,

    /// ハイパーリンク注記（内容が`Hyperlink`型でないセルに付与されたリンク先）
    pub hyperlink: Option<String>,
}

impl Cell {
    /// 内容からセルを生成
    pub fn new(content: CellContent) -> Self {
        Self {
            content,
            hyperlink: None,
        }
    }

    /// 空セル
    pub fn empty() -> Self {
        Self::new(CellContent::Empty)
    }

    /// 文字列セル
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(CellContent::Text(value.into()))
    }

    /// 数値セル
    pub fn number(value: f64) -> Self {
        Self::new(CellContent::Number(value))
    }

    /// 日付セル
    pub fn date(value: DateValue) -> Self {
        Self::new(CellContent::Date(value))
    }

    /// リッチテキストセル
    pub fn rich_text<I, S>(runs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CellContent::RichText(RichText::new(runs)))
    }

    /// 数式セル（`result`はキャッシュされた計算結果）
    pub fn formula(expression: impl Into<String>, result: Option<CellValue>) -> Self {
        Self::new(CellContent::Formula {
            expression: expression.into(),
            result,
        })
    }

    /// ハイパーリンクセル
    pub fn hyperlink(display: Option<HyperlinkText>, target: Option<String>) -> Self {
        Self::new(CellContent::Hyperlink { display, target })
    }

    /// ハイパーリンク注記を付与（ビルダー形式）
    pub fn with_hyperlink(mut self, target: impl Into<String>) -> Self {
        self.hyperlink = Some(target.into());
        self
    }

    /// 値が空（null相当）かどうか
    pub fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty)
    }
}

/// セル内容（タグ付き共用体）
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellContent {
    /// 空セル
    #[default]
    Empty,

    /// 文字列
    Text(String),

    /// 数値
    Number(f64),

    /// 論理値
    Bool(bool),

    /// エラー値（例: `#DIV/0!`）
    Error(String),

    /// 日付
    Date(DateValue),

    /// リッチテキスト（書式付きフラグメントの連結）
    RichText(RichText),

    /// 数式（式と、キャッシュされた計算結果）
    Formula {
        /// 数式文字列
        expression: String,
        /// 計算結果（キャッシュ値が無い場合は`None`）
        result: Option<CellValue>,
    },

    /// ハイパーリンク（表示値とリンク先）
    Hyperlink {
        /// 表示テキスト
        display: Option<HyperlinkText>,
        /// リンク先URI
        target: Option<String>,
    },
}

/// 数式の計算結果として現れる値
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    /// 空
    #[default]
    Empty,

    /// 文字列
    Text(String),

    /// 数値
    Number(f64),

    /// 論理値
    Bool(bool),

    /// エラー値
    Error(String),

    /// 日付
    Date(DateValue),
}

impl CellValue {
    /// 値が空かどうかを判定
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// 値が日付なら参照を返す
    pub fn as_date(&self) -> Option<&DateValue> {
        match self {
            CellValue::Date(date) => Some(date),
            _ => None,
        }
    }
}

/// 日付値
///
/// 内部表現が複数あるため、正規化時に`YYYY-MM-DD`へ統一します。
#[derive(Debug, Clone, PartialEq)]
pub enum DateValue {
    /// Excelのシリアル日付値
    Serial {
        /// シリアル値（小数部は時刻）
        value: f64,
        /// 1904年エポックを使用するか
        is_1904: bool,
    },

    /// ISO 8601形式の文字列（`t="d"`セル）
    Iso(String),

    /// 暦日時（タイムゾーンなし）
    Calendar(NaiveDateTime),
}

/// リッチテキスト
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RichText {
    /// テキストフラグメント（書式情報は保持しない）
    pub runs: Vec<String>,
}

impl RichText {
    /// フラグメントのリストから生成
    pub fn new<I, S>(runs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            runs: runs.into_iter().map(Into::into).collect(),
        }
    }

    /// プレーンテキスト（フラグメントの連結）
    pub fn plain_text(&self) -> String {
        self.runs.concat()
    }
}

/// ハイパーリンクの表示テキスト
#[derive(Debug, Clone, PartialEq)]
pub enum HyperlinkText {
    /// 通常の文字列
    Plain(String),

    /// リッチテキスト
    Rich(RichText),
}

impl HyperlinkText {
    /// プレーンテキスト表現
    pub fn plain_text(&self) -> String {
        match self {
            HyperlinkText::Plain(text) => text.clone(),
            HyperlinkText::Rich(rich) => rich.plain_text(),
        }
    }
}

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1形式の文字列を座標に変換（例: "B3" -> (2, 1)）
    ///
    /// `$`による絶対参照記号は無視します。
    pub fn parse_a1(reference: &str) -> Option<Self> {
        let reference = reference.trim().replace('$', "");
        let split = reference.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = reference.split_at(split);

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        let mut col: u32 = 0;
        for ch in letters.chars() {
            let val = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
            col = col.checked_mul(26)?.checked_add(val)?;
        }

        let row: u32 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }

        Some(Self::new(row - 1, col - 1))
    }
}
