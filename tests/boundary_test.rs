//! Boundary Tests for xlsxcsv
//!
//! 空シート、最大行・列、長いセル、日付のエポック境界、
//! 破損した入力などの境界条件を検証します。

use rust_xlsxwriter::*;
use std::io::{Cursor, Read, Write};
use xlsxcsv::ConverterBuilder;

// Helper module for generating boundary test fixtures
mod fixtures {
    use super::*;

    /// セルを持たないシート
    pub fn generate_empty_sheet() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("EmptySheet")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// 最初と最後の行に値を持つシート（1,048,576行）
    pub fn generate_max_rows() -> Result<Vec<u8>, XlsxError> {
        const MAX_ROWS: u32 = 1_048_576;

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("MaxRows")?;
        worksheet.write_string(0, 0, "FirstRow")?;
        worksheet.write_string(MAX_ROWS - 1, 0, "LastRow")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// 最初と最後の列（A, XFD）に値を持つシート
    pub fn generate_max_columns() -> Result<Vec<u8>, XlsxError> {
        const MAX_COLS: u16 = 16_384;

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("MaxCols")?;
        worksheet.write_string(0, 0, "FirstCol")?;
        worksheet.write_string(0, MAX_COLS - 1, "LastCol")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// 1000行 x 50列の表
    pub fn generate_large_table() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Large")?;

        for row in 0..1000u32 {
            for col in 0..50u16 {
                worksheet.write_number(row, col, f64::from(row) * 100.0 + f64::from(col))?;
            }
        }
        Ok(workbook.save_to_buffer()?)
    }

    /// Excelのセル文字数上限（32,767文字）のセル
    pub fn generate_long_cell() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, &"x".repeat(32_767))?;
        worksheet.write_string(0, 1, &"a,b".repeat(1_000))?;
        Ok(workbook.save_to_buffer()?)
    }

    /// 1900年システムのエポック付近のシリアル値
    pub fn generate_epoch_dates() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        for (row, serial) in [1.0, 59.0, 61.0, 45723.75, 73050.0].into_iter().enumerate() {
            worksheet.write_number_with_format(row as u32, 0, serial, &date_format)?;
        }
        Ok(workbook.save_to_buffer()?)
    }

    /// 数値の表現
    pub fn generate_numbers() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_number(0, 0, 100.0)?;
        worksheet.write_number(0, 1, -3.5)?;
        worksheet.write_number(0, 2, 0.1 + 0.2)?;
        worksheet.write_number(0, 3, 1_234_567_890_123.0)?;
        worksheet.write_number(0, 4, 0.0)?;
        Ok(workbook.save_to_buffer()?)
    }

    /// 多言語の文字列
    pub fn generate_unicode() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("日本語シート")?;
        worksheet.write_string(0, 0, "売上高")?;
        worksheet.write_string(0, 1, "Ünïcödé")?;
        worksheet.write_string(0, 2, "🦀")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// 既存パッケージの`xl/workbook.xml`を1904年システムに書き換える
    pub fn with_date1904(bytes: &[u8]) -> Vec<u8> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut output = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut output));
            for i in 0..archive.len() {
                let mut entry = archive.by_index(i).unwrap();
                let name = entry.name().to_string();
                let mut content = Vec::new();
                entry.read_to_end(&mut content).unwrap();

                if name == "xl/workbook.xml" {
                    let xml = String::from_utf8(content).unwrap();
                    content = xml
                        .replacen("<workbookPr", "<workbookPr date1904=\"1\"", 1)
                        .into_bytes();
                }

                writer
                    .start_file(name, zip::write::FileOptions::default())
                    .unwrap();
                writer.write_all(&content).unwrap();
            }
            writer.finish().unwrap();
        }
        output
    }

    /// 1904年システムの日付セル（シリアル値0と1）
    pub fn generate_1904_dates() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        worksheet.write_number_with_format(0, 0, 0.0, &date_format)?;
        worksheet.write_number_with_format(0, 1, 1.0, &date_format)?;
        Ok(with_date1904(&workbook.save_to_buffer()?))
    }
}

#[test]
fn test_empty_sheet() {
    let bytes = fixtures::generate_empty_sheet().unwrap();
    let results = xlsxcsv::convert(&bytes).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "EmptySheet");
    assert_eq!(results[0].row_count, 0);
    assert!(results[0].matrix.is_empty());
    assert_eq!(results[0].csv, "");
}

#[test]
#[ignore] // 100万行の行列を生成するため時間がかかる
fn test_max_rows() {
    let bytes = fixtures::generate_max_rows().unwrap();
    let results = xlsxcsv::convert(&bytes).unwrap();
    let sheet = &results[0];

    assert_eq!(sheet.row_count, 1_048_576);
    assert_eq!(sheet.matrix[0], vec!["FirstRow"]);
    assert_eq!(sheet.matrix[1_048_575], vec!["LastRow"]);
    assert!(sheet.csv.starts_with("FirstRow\r\n\r\n"));
    assert!(sheet.csv.ends_with("\r\nLastRow"));
}

#[test]
fn test_max_columns() {
    let bytes = fixtures::generate_max_columns().unwrap();
    let results = xlsxcsv::convert(&bytes).unwrap();
    let row = &results[0].matrix[0];

    assert_eq!(row.len(), 16_384);
    assert_eq!(row[0], "FirstCol");
    assert_eq!(row[16_383], "LastCol");
    assert_eq!(results[0].csv.matches(',').count(), 16_383);
}

#[test]
fn test_large_table() {
    let bytes = fixtures::generate_large_table().unwrap();
    let results = xlsxcsv::convert(&bytes).unwrap();
    let sheet = &results[0];

    assert_eq!(sheet.row_count, 1000);
    assert!(sheet.matrix.iter().all(|row| row.len() == 50));
    assert_eq!(sheet.matrix[999][49], "99949");
    assert_eq!(sheet.csv.matches("\r\n").count(), 999);
}

#[test]
fn test_long_cell() {
    let bytes = fixtures::generate_long_cell().unwrap();
    let results = xlsxcsv::convert(&bytes).unwrap();
    let row = &results[0].matrix[0];

    assert_eq!(row[0].len(), 32_767);
    assert_eq!(row[1], "a,b".repeat(1_000));
    assert!(results[0].csv.ends_with(&format!(",\"{}\"", "a,b".repeat(1_000))));
}

#[test]
fn test_epoch_dates() {
    let bytes = fixtures::generate_epoch_dates().unwrap();
    let results = xlsxcsv::convert(&bytes).unwrap();

    let column: Vec<&str> = results[0].matrix.iter().map(|row| row[0].as_str()).collect();
    assert_eq!(
        column,
        vec!["1900-01-01", "1900-02-28", "1900-03-01", "2025-03-07", "2099-12-31"]
    );
}

#[test]
fn test_1904_date_system() {
    let bytes = fixtures::generate_1904_dates().unwrap();
    let results = xlsxcsv::convert(&bytes).unwrap();

    assert_eq!(results[0].matrix[0], vec!["1904-01-01", "1904-01-02"]);
}

#[test]
fn test_number_representation() {
    let bytes = fixtures::generate_numbers().unwrap();
    let results = xlsxcsv::convert(&bytes).unwrap();

    assert_eq!(
        results[0].matrix[0],
        vec!["100", "-3.5", "0.30000000000000004", "1234567890123", "0"]
    );
}

#[test]
fn test_unicode_content() {
    let bytes = fixtures::generate_unicode().unwrap();
    let results = xlsxcsv::convert(&bytes).unwrap();

    assert_eq!(results[0].name, "日本語シート");
    assert_eq!(results[0].csv, "売上高,Ünïcödé,🦀");
}

#[test]
fn test_truncated_file() {
    let bytes = fixtures::generate_empty_sheet().unwrap();
    let truncated = &bytes[..bytes.len() / 2];

    let err = xlsxcsv::convert(truncated).unwrap_err();
    assert!(err.is_decode_error());
}

#[test]
fn test_invalid_zip_structure() {
    // ZIPシグネチャの後に不正なデータ
    let mut bytes = b"PK\x03\x04".to_vec();
    bytes.extend_from_slice(&[0xFF; 128]);

    let err = xlsxcsv::convert(&bytes).unwrap_err();
    assert!(err.is_decode_error());
}

#[test]
fn test_empty_input() {
    let err = ConverterBuilder::new()
        .build()
        .unwrap()
        .convert(&[])
        .unwrap_err();
    assert!(err.is_decode_error());
}
