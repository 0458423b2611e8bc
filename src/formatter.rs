//! Formatter Module
//!
//! セル値を正規化された表示文字列に変換するモジュール（Cell Normalizer）。
//!
//! 優先順位:
//!
//! 1. 空セル → `""`
//! 2. 日付（数式の場合は計算結果が日付） → `YYYY-MM-DD`
//! 3. リッチテキスト → 連結したプレーンテキスト
//! 4. 数式 → 計算結果の文字列表現
//! 5. ハイパーリンク → 表示テキスト、`mailto:`を除いたメールアドレス、リンク先URIの順
//! 6. その他 → 生の値の文字列表現（ハイパーリンク注記がある場合は表示テキスト）
//!
//! いずれも前後の空白を除去します。

use chrono::{Duration, NaiveDate};

use crate::error::CellReadError;
use crate::types::{Cell, CellContent, CellValue, DateValue};

/// セルを正規化された表示文字列に変換する
///
/// 全域関数であり、失敗しません。セルの解釈中に発生した`CellReadError`は
/// ここで空文字列に変換されます（診断ログのみ出力）。
///
/// # 使用例
///
/// ```rust
/// use xlsxcsv::{normalize_cell, Cell};
///
/// let cell = Cell::hyperlink(None, Some("mailto:user@example.com".to_string()));
/// assert_eq!(normalize_cell(Some(&cell)), "user@example.com");
/// assert_eq!(normalize_cell(None), "");
/// ```
pub fn normalize_cell(cell: Option<&Cell>) -> String {
    let Some(cell) = cell else {
        return String::new();
    };

    match CellFormatter.format_cell(cell) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read cell, using empty value");
            String::new()
        }
    }
}

/// セルフォーマッター
///
/// セル値のフォーマット処理のファサードとして機能します。
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct CellFormatter;

impl CellFormatter {
    /// セル値をフォーマット（失敗し得る内部処理）
    pub fn format_cell(&self, cell: &Cell) -> Result<String, CellReadError> {
        // 1. 空セル
        if cell.is_empty() {
            return Ok(String::new());
        }

        // 2. 日付（数式の計算結果を含む）
        if let Some(date) = resolved_date(&cell.content) {
            return DateFormatter.format(date);
        }

        let formatted = match &cell.content {
            // 3. リッチテキスト
            CellContent::RichText(rich) => rich.plain_text(),

            // 4. 数式（計算結果が日付でない場合）
            CellContent::Formula { result, .. } => match result {
                Some(value) => value_string(value)?,
                None => String::new(),
            },

            // 5. ハイパーリンク
            CellContent::Hyperlink { display, target } => {
                let display = display.as_ref().map(|d| d.plain_text());
                if let Some(text) = display.filter(|t| !t.is_empty()) {
                    text
                } else if let Some(target) = target.as_deref().filter(|t| !t.is_empty()) {
                    strip_mailto(target).unwrap_or(target).to_string()
                } else {
                    display_text(&cell.content)?
                }
            }

            // 6. その他
            content if cell.hyperlink.is_some() => display_text(content)?,
            content => raw_string(content)?,
        };

        Ok(formatted.trim().to_string())
    }
}

/// 解決済みの値が日付であれば返す（数式の場合は計算結果を見る）
fn resolved_date(content: &CellContent) -> Option<&DateValue> {
    match content {
        CellContent::Date(date) => Some(date),
        CellContent::Formula {
            result: Some(value),
            ..
        } => value.as_date(),
        _ => None,
    }
}

/// `mailto:`スキームを除去（大文字小文字を区別しない）
fn strip_mailto(target: &str) -> Option<&str> {
    const SCHEME: &str = "mailto:";
    let head = target.get(..SCHEME.len())?;
    if head.eq_ignore_ascii_case(SCHEME) {
        Some(&target[SCHEME.len()..])
    } else {
        None
    }
}

/// セルの表示テキスト（text projection）
///
/// 型ごとに人間が目にする文字列を返します。前後の空白は除去しません。
pub(crate) fn display_text(content: &CellContent) -> Result<String, CellReadError> {
    match content {
        CellContent::RichText(rich) => Ok(rich.plain_text()),
        CellContent::Formula { result, .. } => match result {
            Some(value) => value_string(value),
            None => Ok(String::new()),
        },
        CellContent::Hyperlink { display, target } => Ok(display
            .as_ref()
            .map(|d| d.plain_text())
            .or_else(|| target.clone())
            .unwrap_or_default()),
        content => raw_string(content),
    }
}

/// 生の値の文字列表現
fn raw_string(content: &CellContent) -> Result<String, CellReadError> {
    match content {
        CellContent::Empty => Ok(String::new()),
        CellContent::Text(text) => Ok(text.clone()),
        CellContent::Number(n) => NumberFormatter.format(*n),
        CellContent::Bool(b) => Ok(bool_string(*b)),
        CellContent::Error(e) => Ok(e.clone()),
        CellContent::Date(date) => DateFormatter.format(date),
        CellContent::RichText(_)
        | CellContent::Formula { .. }
        | CellContent::Hyperlink { .. } => display_text(content),
    }
}

/// 数式の計算結果の文字列表現
fn value_string(value: &CellValue) -> Result<String, CellReadError> {
    match value {
        CellValue::Empty => Ok(String::new()),
        CellValue::Text(text) => Ok(text.clone()),
        CellValue::Number(n) => NumberFormatter.format(*n),
        CellValue::Bool(b) => Ok(bool_string(*b)),
        CellValue::Error(e) => Ok(e.clone()),
        CellValue::Date(date) => DateFormatter.format(date),
    }
}

fn bool_string(value: bool) -> String {
    if value { "TRUE" } else { "FALSE" }.to_string()
}

/// 日付フォーマッター
///
/// どの内部表現の日付も`YYYY-MM-DD`に変換します。時刻部分は出力しません。
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct DateFormatter;

impl DateFormatter {
    /// 日付値をフォーマット
    pub fn format(&self, date: &DateValue) -> Result<String, CellReadError> {
        let date = match date {
            DateValue::Serial { value, is_1904 } => self.from_serial(*value, *is_1904)?,
            DateValue::Iso(text) => self.from_iso(text)?,
            DateValue::Calendar(datetime) => datetime.date(),
        };

        Ok(date.format("%Y-%m-%d").to_string())
    }

    /// シリアル日付値を暦日に変換
    ///
    /// # エポックシステム
    ///
    /// - 1900年システム（デフォルト）: 1899年12月30日起算
    ///   - シリアル値1 = 1900年1月1日
    ///   - シリアル値60はExcelのうるう年バグによる架空の1900年2月29日。
    ///     60未満は1日ずらして補正する
    /// - 1904年システム: 1904年1月1日起算
    ///   - シリアル値0 = 1904年1月1日
    #[allow(clippy::wrong_self_convention)]
    fn from_serial(&self, serial: f64, is_1904: bool) -> Result<NaiveDate, CellReadError> {
        let out_of_range = || CellReadError::DateOutOfRange { serial };

        if !serial.is_finite() || serial < 0.0 {
            return Err(out_of_range());
        }

        let days = serial.floor();
        // chronoの表現範囲を大きく超える値はi64変換前に弾く
        if days > 3_000_000.0 {
            return Err(out_of_range());
        }
        let days = days as i64;

        let (epoch, days) = if is_1904 {
            (NaiveDate::from_ymd_opt(1904, 1, 1), days)
        } else if days < 60 {
            (NaiveDate::from_ymd_opt(1899, 12, 31), days)
        } else {
            (NaiveDate::from_ymd_opt(1899, 12, 30), days)
        };

        epoch
            .and_then(|epoch| epoch.checked_add_signed(Duration::days(days)))
            .ok_or_else(out_of_range)
    }

    /// ISO 8601文字列（先頭の`YYYY-MM-DD`）を暦日に変換
    #[allow(clippy::wrong_self_convention)]
    fn from_iso(&self, text: &str) -> Result<NaiveDate, CellReadError> {
        let trimmed = text.trim();
        trimmed
            .get(..10)
            .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
            .ok_or_else(|| CellReadError::InvalidDate(trimmed.to_string()))
    }
}

/// 数値フォーマッター
///
/// 最短の往復可能な10進表現を使用します（`100.0` → `100`）。
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NumberFormatter;

impl NumberFormatter {
    /// 数値をフォーマット
    pub fn format(&self, value: f64) -> Result<String, CellReadError> {
        if !value.is_finite() {
            return Err(CellReadError::NonFiniteNumber);
        }
        Ok(value.to_string())
    }
}
