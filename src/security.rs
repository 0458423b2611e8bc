//! Security Module
//!
//! 入力ファイルに対するセキュリティ制限を実装するモジュール。
//! ZIP bomb攻撃、パストラバーサル攻撃などへの対策を提供します。
//!
//! 制限はワークブックのデコード前に、ZIPのセントラルディレクトリに記録された
//! 情報のみを用いて検査します。

use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::error::XlsxToCsvError;

/// 入力ファイルの最大サイズのデフォルト（2GB）
pub(crate) const DEFAULT_MAX_INPUT_SIZE: u64 = 2_147_483_648;

/// ZIPアーカイブ内の最大エントリ数のデフォルト
pub(crate) const DEFAULT_MAX_ARCHIVE_ENTRIES: usize = 10_000;

/// 展開後の合計最大サイズのデフォルト（1GB）
pub(crate) const DEFAULT_MAX_DECOMPRESSED_SIZE: u64 = 1_073_741_824;

/// 単一エントリの最大展開サイズ（100MB）
const MAX_ENTRY_SIZE: u64 = 104_857_600;

/// セキュリティ設定
///
/// `ConverterBuilder`の設定から生成されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SecurityConfig {
    /// 入力ファイルの最大サイズ（バイト）
    pub max_input_size: u64,
    /// ZIPアーカイブ内の最大エントリ数
    pub max_archive_entries: usize,
    /// 単一エントリの最大展開サイズ（バイト）
    pub max_entry_size: u64,
    /// 展開後の合計最大サイズ（バイト）
    pub max_decompressed_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            max_archive_entries: DEFAULT_MAX_ARCHIVE_ENTRIES,
            max_entry_size: MAX_ENTRY_SIZE,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

impl SecurityConfig {
    /// 入力バイト列のサイズを検査
    pub fn check_input_size(&self, len: usize) -> Result<(), XlsxToCsvError> {
        if len as u64 > self.max_input_size {
            return Err(XlsxToCsvError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                len, self.max_input_size
            )));
        }
        Ok(())
    }

    /// ZIPアーカイブのエントリ数・パス・展開サイズを検査
    pub fn inspect_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
    ) -> Result<(), XlsxToCsvError> {
        if archive.len() > self.max_archive_entries {
            return Err(XlsxToCsvError::SecurityViolation(format!(
                "ZIP archive contains too many entries: {} (max: {})",
                archive.len(),
                self.max_archive_entries
            )));
        }

        let mut total_size = 0u64;
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            let name = entry.name();

            validate_zip_path(name)?;

            let size = entry.size();
            let entry_limit = self.max_entry_size.min(self.max_decompressed_size);
            if size > entry_limit {
                return Err(XlsxToCsvError::SecurityViolation(format!(
                    "Entry '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    name, size, entry_limit
                )));
            }

            total_size = total_size.checked_add(size).ok_or_else(|| {
                XlsxToCsvError::SecurityViolation(
                    "Total decompressed size calculation overflow".to_string(),
                )
            })?;

            if total_size > self.max_decompressed_size {
                return Err(XlsxToCsvError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total_size, self.max_decompressed_size
                )));
            }
        }

        tracing::debug!(
            entries = archive.len(),
            decompressed_bytes = total_size,
            "archive passed security checks"
        );
        Ok(())
    }
}

/// ZIPエントリのパスを検証
///
/// 空のパス、絶対パス（`/`やドライブレター始まり）、`..`セグメント、
/// バックスラッシュを含むパスを拒否します。
pub(crate) fn validate_zip_path(path: &str) -> Result<(), XlsxToCsvError> {
    let violation = |reason: &str| {
        Err(XlsxToCsvError::SecurityViolation(format!(
            "Invalid ZIP path '{}': {}",
            path, reason
        )))
    };

    if path.is_empty() {
        return violation("empty path");
    }

    let bytes = path.as_bytes();
    let has_drive_letter = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if path.starts_with('/') || has_drive_letter {
        return violation("absolute path");
    }

    if path.contains('\\') {
        return violation("backslash separator");
    }

    if path.split('/').any(|segment| segment == "..") {
        return violation("path traversal");
    }

    Ok(())
}
