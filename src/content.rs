use std::path::Path;

/// Fallback for unknown or missing extensions
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Detect Content-Type based on file extension
///
/// The extension is whatever follows the last `.` of the file name. Textual types get an
/// explicit UTF-8 charset so browsers render them correctly when served from the bucket.
pub fn classify(path: &Path) -> String {
    let Some(mime) = extension(path).and_then(|ext| mime_guess::from_ext(ext).first()) else {
        return OCTET_STREAM.to_string();
    };

    if mime.type_() == mime_guess::mime::TEXT && mime.get_param("charset").is_none() {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.to_string()
    }
}

fn extension(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty()).then_some(ext)
}
