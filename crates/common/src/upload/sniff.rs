//! Content-type detection for upload sources.
//!
//! Only the first [`SNIFF_LEN`] bytes are inspected. Detection runs in three
//! steps: a magic-byte signature table, then the file extension, then a
//! text-or-binary check on the bytes themselves.

use std::io::SeekFrom;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

pub const SNIFF_LEN: usize = 512;
pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Every `(offset, bytes)` part must match for the signature to apply.
struct Signature {
    parts: &'static [(usize, &'static [u8])],
    mime: &'static str,
}

#[rustfmt::skip]
const SIGNATURES: &[Signature] = &[
    Signature { parts: &[(0, b"%PDF-")], mime: "application/pdf" },
    Signature { parts: &[(0, b"%!PS-Adobe-")], mime: "application/postscript" },
    Signature { parts: &[(0, b"\x89PNG\r\n\x1a\n")], mime: "image/png" },
    Signature { parts: &[(0, b"\xff\xd8\xff")], mime: "image/jpeg" },
    Signature { parts: &[(0, b"GIF87a")], mime: "image/gif" },
    Signature { parts: &[(0, b"GIF89a")], mime: "image/gif" },
    Signature { parts: &[(0, b"BM")], mime: "image/bmp" },
    Signature { parts: &[(0, b"\x00\x00\x01\x00")], mime: "image/x-icon" },
    Signature { parts: &[(0, b"RIFF"), (8, b"WEBPVP")], mime: "image/webp" },
    Signature { parts: &[(0, b"RIFF"), (8, b"WAVE")], mime: "audio/wave" },
    Signature { parts: &[(0, b"RIFF"), (8, b"AVI ")], mime: "video/avi" },
    Signature { parts: &[(0, b"ID3")], mime: "audio/mpeg" },
    Signature { parts: &[(0, b"OggS\x00")], mime: "application/ogg" },
    Signature { parts: &[(0, b"fLaC")], mime: "audio/flac" },
    Signature { parts: &[(0, b"MThd\x00\x00\x00\x06")], mime: "audio/midi" },
    Signature { parts: &[(4, b"ftyp")], mime: "video/mp4" },
    Signature { parts: &[(0, b"\x1a\x45\xdf\xa3")], mime: "video/webm" },
    Signature { parts: &[(0, b"PK\x03\x04")], mime: "application/zip" },
    Signature { parts: &[(0, b"\x1f\x8b\x08")], mime: "application/x-gzip" },
    Signature { parts: &[(0, b"Rar!\x1a\x07")], mime: "application/x-rar-compressed" },
    Signature { parts: &[(0, b"7z\xbc\xaf\x27\x1c")], mime: "application/x-7z-compressed" },
    Signature { parts: &[(0, b"\x00asm")], mime: "application/wasm" },
    Signature { parts: &[(0, b"wOFF")], mime: "font/woff" },
    Signature { parts: &[(0, b"wOF2")], mime: "font/woff2" },
    Signature { parts: &[(0, b"\xfe\xff")], mime: "text/plain; charset=utf-16be" },
    Signature { parts: &[(0, b"\xff\xfe")], mime: "text/plain; charset=utf-16le" },
    Signature { parts: &[(0, b"\xef\xbb\xbf")], mime: TEXT_PLAIN },
];

/// Markup recognised after leading whitespace, compared case-insensitively.
const MARKUP: &[(&[u8], &str)] = &[
    (b"<!doctype html", "text/html; charset=utf-8"),
    (b"<html", "text/html; charset=utf-8"),
    (b"<?xml", "text/xml; charset=utf-8"),
];

impl Signature {
    fn matches(&self, head: &[u8]) -> bool {
        self.parts.iter().all(|(offset, magic)| {
            head.get(*offset..offset + magic.len())
                .map(|window| window == *magic)
                .unwrap_or(false)
        })
    }
}

/// Detect the content type of a file from its leading bytes and path.
pub fn detect(head: &[u8], path: &Path) -> String {
    let head = &head[..head.len().min(SNIFF_LEN)];
    if head.is_empty() {
        return OCTET_STREAM.to_string();
    }

    if let Some(signature) = SIGNATURES.iter().find(|s| s.matches(head)) {
        return signature.mime.to_string();
    }

    let trimmed = trim_leading_whitespace(head);
    for (tag, mime) in MARKUP {
        if trimmed.len() >= tag.len() && trimmed[..tag.len()].eq_ignore_ascii_case(tag) {
            return mime.to_string();
        }
    }

    if let Some(guess) = mime_guess::from_path(path).first_raw() {
        return guess.to_string();
    }

    if head.iter().any(|b| is_binary_byte(*b)) {
        OCTET_STREAM.to_string()
    } else {
        TEXT_PLAIN.to_string()
    }
}

/// Read the head of `file`, detect its type, and rewind to the start.
pub async fn sniff_file(file: &mut File, path: &Path) -> std::io::Result<String> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    (&mut *file).take(SNIFF_LEN as u64).read_to_end(&mut head).await?;
    file.seek(SeekFrom::Start(0)).await?;
    Ok(detect(&head, path))
}

fn trim_leading_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_ext() -> &'static Path {
        Path::new("/data/blob")
    }

    #[test]
    fn test_signatures() {
        assert_eq!(detect(b"%PDF-1.7\n...", no_ext()), "application/pdf");
        assert_eq!(detect(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR", no_ext()), "image/png");
        assert_eq!(detect(b"\xff\xd8\xff\xe0\0\x10JFIF", no_ext()), "image/jpeg");
        assert_eq!(detect(b"RIFF\0\0\0\0WEBPVP8 ", no_ext()), "image/webp");
        assert_eq!(detect(b"RIFF\0\0\0\0WAVEfmt ", no_ext()), "audio/wave");
        assert_eq!(detect(b"\0\0\0\x18ftypmp42", no_ext()), "video/mp4");
        assert_eq!(detect(b"PK\x03\x04rest", no_ext()), "application/zip");
    }

    #[test]
    fn test_signature_beats_extension() {
        assert_eq!(detect(b"%PDF-1.4", Path::new("notes.txt")), "application/pdf");
    }

    #[test]
    fn test_markup_ignores_case_and_whitespace() {
        assert_eq!(
            detect(b"\n  <!DOCTYPE HTML><html>", no_ext()),
            "text/html; charset=utf-8"
        );
        assert_eq!(detect(b"<?xml version=\"1.0\"?>", no_ext()), "text/xml; charset=utf-8");
    }

    #[test]
    fn test_extension_fallback() {
        assert_eq!(detect(b"{\"a\": 1}", Path::new("a.json")), "application/json");
    }

    #[test]
    fn test_text_and_binary_fallback() {
        assert_eq!(detect(b"just some words", no_ext()), TEXT_PLAIN);
        assert_eq!(detect(b"\x00\x01\x02\x03", no_ext()), OCTET_STREAM);
    }

    #[test]
    fn test_empty_is_octet_stream() {
        assert_eq!(detect(b"", Path::new("empty.txt")), OCTET_STREAM);
    }

    #[test]
    fn test_short_input_does_not_match_long_signature() {
        assert_eq!(detect(b"RIFF", no_ext()), TEXT_PLAIN);
    }

    #[tokio::test]
    async fn test_sniff_file_rewinds() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("doc");
        let mut body = b"%PDF-1.5\n".to_vec();
        body.extend(std::iter::repeat(b'a').take(1024));
        std::fs::write(&path, &body).unwrap();

        let mut file = File::open(&path).await.unwrap();
        let mime = sniff_file(&mut file, &path).await.unwrap();
        assert_eq!(mime, "application/pdf");

        let mut all = Vec::new();
        file.read_to_end(&mut all).await.unwrap();
        assert_eq!(all, body);
    }
}
