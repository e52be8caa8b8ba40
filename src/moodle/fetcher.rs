//! 添付ファイルのダウンロード

use tracing::{debug, warn};

use crate::traits::PortalClient;

use super::types::{AttachmentFile, AttachmentLink, MissingFileNote};

/// 1ファイルをダウンロード。失敗したらフォルダ名とファイル名で問題メモを残す
///
/// 本文が空のレスポンスも失敗として扱う。
pub async fn download_attachment<C>(
    client: &C,
    folder_name: &str,
    link: &AttachmentLink,
    notes: &mut Vec<MissingFileNote>,
) -> Option<AttachmentFile>
where
    C: PortalClient + ?Sized,
{
    match client.fetch(&link.url).await {
        Some(content) if !content.is_empty() => {
            debug!(
                "Downloaded {}/{} ({} bytes)",
                folder_name,
                link.file_name,
                content.len()
            );
            Some(AttachmentFile {
                file_name: link.file_name.clone(),
                content,
            })
        }
        _ => {
            warn!("Failed to download {} for {}: {}", link.file_name, folder_name, link.url);
            notes.push(MissingFileNote::download_failed(folder_name, &link.file_name));
            None
        }
    }
}

/// リンクを順番にダウンロード (1件ずつ、リトライなし)
pub async fn download_attachments<C>(
    client: &C,
    folder_name: &str,
    links: &[AttachmentLink],
    notes: &mut Vec<MissingFileNote>,
) -> Vec<AttachmentFile>
where
    C: PortalClient + ?Sized,
{
    let mut files = Vec::with_capacity(links.len());
    for link in links {
        if let Some(file) = download_attachment(client, folder_name, link, notes).await {
            files.push(file);
        }
    }
    files
}
