//! Extension to type-tag classification.

use std::collections::HashMap;
use std::sync::LazyLock;

use protocol::FileType;

/// Extension table, built once on first use and never mutated.
static EXTENSION_TABLE: LazyLock<HashMap<&'static str, FileType>> = LazyLock::new(|| {
    HashMap::from([
        ("txt", FileType::Txt),
        ("jpeg", FileType::Jpeg),
        ("jpg", FileType::Jpg),
        ("zip", FileType::Zip),
        ("tar", FileType::Tar),
        ("mp3", FileType::Mp3),
        ("json", FileType::Json),
        ("png", FileType::Png),
        ("mkv", FileType::Mkv),
        ("mp4", FileType::Mp4),
        ("img", FileType::Img),
        ("pdf", FileType::Pdf),
        ("doc", FileType::Doc),
        ("docx", FileType::Docx),
        ("gz", FileType::Gz),
        ("part", FileType::Part),
        ("deb", FileType::Deb),
        ("exe", FileType::Exe),
        ("xlsx", FileType::Xlsx),
        ("xls", FileType::Xls),
        ("csv", FileType::Csv),
        ("xz", FileType::Xz),
        ("tgz", FileType::Tgz),
        ("appimage", FileType::AppImage),
        ("conf", FileType::Conf),
        ("mov", FileType::Mov),
        ("gif", FileType::Gif),
        ("bmp", FileType::Bmp),
        ("webm", FileType::Webm),
        ("webp", FileType::Webp),
        ("log", FileType::Log),
        ("md", FileType::Md),
    ])
});

/// Map an extension (without the dot) to its type tag.
///
/// Lookup is case-insensitive. Anything not in the table, including the
/// empty string, is [`FileType::Unknown`].
pub fn classify(extension: &str) -> FileType {
    EXTENSION_TABLE
        .get(extension.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(FileType::Unknown)
}

/// Extension of a file name: the text after the last `.`, lowercased.
///
/// A leading dot marks a hidden file, not an extension, so `.bashrc` and
/// `README` both yield `""`.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx + 1..].to_ascii_lowercase(),
        _ => String::new(),
    }
}
