use std::fmt;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Avif,
    Heic,
    Svg,
    Mp4,
    Webm,
    Mov,
    M4v,
}

const KNOWN: [MediaFormat; 11] = [
    MediaFormat::Jpeg,
    MediaFormat::Png,
    MediaFormat::Gif,
    MediaFormat::Webp,
    MediaFormat::Avif,
    MediaFormat::Heic,
    MediaFormat::Svg,
    MediaFormat::Mp4,
    MediaFormat::Webm,
    MediaFormat::Mov,
    MediaFormat::M4v,
];

impl MediaFormat {
    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "jpg",
            MediaFormat::Png => "png",
            MediaFormat::Gif => "gif",
            MediaFormat::Webp => "webp",
            MediaFormat::Avif => "avif",
            MediaFormat::Heic => "heic",
            MediaFormat::Svg => "svg",
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Webm => "webm",
            MediaFormat::Mov => "mov",
            MediaFormat::M4v => "m4v",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "image/jpeg",
            MediaFormat::Png => "image/png",
            MediaFormat::Gif => "image/gif",
            MediaFormat::Webp => "image/webp",
            MediaFormat::Avif => "image/avif",
            MediaFormat::Heic => "image/heic",
            MediaFormat::Svg => "image/svg+xml",
            MediaFormat::Mp4 => "video/mp4",
            MediaFormat::Webm => "video/webm",
            MediaFormat::Mov => "video/quicktime",
            MediaFormat::M4v => "video/x-m4v",
        }
    }

    pub fn is_video(self) -> bool {
        matches!(
            self,
            MediaFormat::Mp4 | MediaFormat::Webm | MediaFormat::Mov | MediaFormat::M4v
        )
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim().to_ascii_lowercase();
        match ext.as_str() {
            "jpeg" | "jpe" => Some(MediaFormat::Jpeg),
            "heif" => Some(MediaFormat::Heic),
            _ => KNOWN.into_iter().find(|format| format.extension() == ext),
        }
    }

    /// Parameters after `;` are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "image/jpg" | "image/pjpeg" => Some(MediaFormat::Jpeg),
            "image/heif" => Some(MediaFormat::Heic),
            _ => KNOWN.into_iter().find(|format| format.mime_type() == mime),
        }
    }

    /// Extension of the URL's last path segment, if it names a known format.
    pub fn from_url(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let segment = parsed.path_segments()?.next_back()?;
        let (_, ext) = segment.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// URL extension first, then the declared content type.
    pub fn detect(url: &str, content_type: Option<&str>) -> Option<Self> {
        Self::from_url(url).or_else(|| content_type.and_then(Self::from_content_type))
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
