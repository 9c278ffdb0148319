use crate::wizard::options::SubtitleFormat;

/// Pull the suggested filename out of a `Content-Disposition` header.
///
/// Accepts both `filename="name.srt"` and bare `filename=name.srt`. Any
/// directory part is dropped so a hostile header cannot steer the save
/// location.
pub fn suggested_filename(header: &str) -> Option<String> {
    let lower = header.to_ascii_lowercase();
    let start = lower.find("filename=")? + "filename=".len();
    let rest = &header[start..];

    let raw = match rest.strip_prefix('"') {
        Some(quoted) => quoted.split('"').next().unwrap_or(""),
        None => rest.split(';').next().unwrap_or("").trim(),
    };

    let name = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

/// Name to save a download under: the server's suggestion, else
/// `subtitles.<format>`.
pub fn download_filename(content_disposition: Option<&str>, format: SubtitleFormat) -> String {
    content_disposition
        .and_then(suggested_filename)
        .unwrap_or_else(|| format.default_filename())
}
