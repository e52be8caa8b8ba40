//! 収集結果のZIP化

use std::collections::HashSet;
use std::io::{Cursor, Write};

use chrono::{Local, NaiveDate};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::CollectorError;
use crate::moodle::{AttachmentFile, CollectedFiles};

/// `collected_files_<YYYY-MM-DD>.zip`
pub fn archive_file_name(date: NaiveDate) -> String {
    format!("collected_files_{}.zip", date.format("%Y-%m-%d"))
}

/// 今日の日付 (ローカル時刻) でのアーカイブ名
pub fn today_archive_file_name() -> String {
    archive_file_name(Local::now().date_naive())
}

/// 収集結果をメモリ上のZIPに書き出す
///
/// ファイルが0件のフォルダは `<folder>/` のディレクトリエントリとして残す。
/// 同じフォルダ内で同名ファイルがあれば後のものが勝つ。
pub fn build_zip(collected: &CollectedFiles) -> Result<Vec<u8>, CollectorError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for folder in collected.iter() {
        if folder.files.is_empty() {
            zip.add_directory(format!("{}/", folder.folder_name), options)?;
            debug!("Added empty folder {}/", folder.folder_name);
            continue;
        }

        for file in last_write_wins(&folder.files) {
            zip.start_file(format!("{}/{}", folder.folder_name, file.file_name), options)?;
            zip.write_all(&file.content)?;
        }
        debug!(
            "Added folder {}/ with {} files",
            folder.folder_name,
            folder.files.len()
        );
    }

    let buffer = zip.finish()?.into_inner();
    info!(
        "Archive built: {} folders, {} bytes",
        collected.len(),
        buffer.len()
    );
    Ok(buffer)
}

/// 同名ファイルは最後の1つだけ残す (順序は残ったものの位置)
fn last_write_wins(files: &[AttachmentFile]) -> Vec<&AttachmentFile> {
    let mut seen = HashSet::new();
    let mut kept: Vec<&AttachmentFile> = files
        .iter()
        .rev()
        .filter(|f| seen.insert(f.file_name.as_str()))
        .collect();
    kept.reverse();
    kept
}
