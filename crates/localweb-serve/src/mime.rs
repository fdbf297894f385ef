//! MIME type detection for served resources.

/// Fallback for anything unrecognised.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Detect the MIME type of a request path from its file extension.
///
/// A fixed table covers the web-relevant types so CSS, scripts and fonts
/// always load with the type the engine expects; other extensions go
/// through the `mime_guess` database, then whole-name guessing, then
/// [`OCTET_STREAM`].
pub fn guess_mime_type(path_or_name: &str) -> String {
    let clean = strip_query_and_fragment(path_or_name);
    let ext = extension(clean).to_ascii_lowercase();
    if let Some(mime) = from_extension(&ext) {
        return mime.to_string();
    }
    mime_guess::from_ext(&ext)
        .first()
        .or_else(|| mime_guess::from_path(clean).first())
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// The fixed extension table.
pub fn from_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "wasm" => "application/wasm",
        _ => return None,
    };
    Some(mime)
}

/// Character set declared for a MIME type: UTF-8 for text, none otherwise.
pub fn charset_for(mime: &str) -> Option<&'static str> {
    if mime.starts_with("text/") || mime == "application/json" {
        Some("utf-8")
    } else {
        None
    }
}

/// Audio and video bodies get close logging.
pub fn is_media(mime: &str) -> bool {
    mime.starts_with("video/") || mime.starts_with("audio/")
}

fn strip_query_and_fragment(path: &str) -> &str {
    let path = path.split('?').next().unwrap_or(path);
    path.split('#').next().unwrap_or(path)
}

/// Text after the last `.` of the final path segment, `""` if none.
fn extension(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(i) => &name[i + 1..],
        None => "",
    }
}
