use std::io::{Cursor, Write};

use anyhow::{Context, Result};
use bytes::Bytes;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Clip and report objects belonging to one interview video.
pub fn is_archive_member(key: &str, video_prefix: &str) -> bool {
    key.starts_with(video_prefix) && (key.ends_with(".mp4") || key.ends_with(".pdf"))
}

/// Builds a deflated zip with one entry per `(key, data)`, named by the key's basename.
pub fn build_zip(entries: &[(String, Bytes)]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (key, data) in entries {
        let name = key.rsplit('/').next().unwrap_or(key);
        writer
            .start_file(name, options)
            .with_context(|| format!("adding {name} to archive"))?;
        writer.write_all(data)?;
    }

    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_archive_member_filter() {
        let prefix = "clips/kim/0614-2_";
        assert!(is_archive_member("clips/kim/0614-2_q1_seg1.mp4", prefix));
        assert!(is_archive_member("clips/kim/0614-2_report.pdf", prefix));
        assert!(!is_archive_member("clips/kim/0614-2_q1_seg1.jpg", prefix));
        assert!(!is_archive_member("clips/kim/0614-21_report.pdf", prefix));
    }

    #[test]
    fn test_build_zip_uses_basenames() {
        let entries = vec![
            ("clips/kim/v_report.pdf".to_string(), Bytes::from_static(b"%PDF-1.4")),
            ("clips/kim/v_q1_seg1.mp4".to_string(), Bytes::from_static(b"mp4data")),
        ];
        let bytes = build_zip(&entries).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut pdf = archive.by_name("v_report.pdf").unwrap();
        let mut content = String::new();
        pdf.read_to_string(&mut content).unwrap();
        assert_eq!(content, "%PDF-1.4");
    }
}
