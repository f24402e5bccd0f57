use super::wire_enum;

wire_enum! {
    /// Media types used by Accept, Content-Type and the file answer
    /// extension table. The minimal set covers what an embedded server
    /// actually serves; `max-support` brings in the long tail.
    pub enum MimeType {
        All = "*/*",
        #[cfg(feature = "max-support")]
        ApplicationAll = "application/*",
        #[cfg(feature = "max-support")]
        ApplicationEcmascript = "application/ecmascript",
        ApplicationJavascript = "application/javascript",
        ApplicationJson = "application/json",
        ApplicationOctetStream = "application/octet-stream",
        #[cfg(feature = "max-support")]
        ApplicationPdf = "application/pdf",
        ApplicationXWwwFormUrlencoded = "application/x-www-form-urlencoded",
        #[cfg(feature = "max-support")]
        ApplicationXhtmlXml = "application/xhtml+xml",
        ApplicationXml = "application/xml",
        #[cfg(feature = "max-support")]
        ApplicationZip = "application/zip",
        #[cfg(feature = "max-support")]
        AudioAll = "audio/*",
        #[cfg(feature = "max-support")]
        AudioMpeg = "audio/mpeg",
        #[cfg(feature = "max-support")]
        AudioVorbis = "audio/vorbis",
        #[cfg(feature = "max-support")]
        FontAll = "font/*",
        #[cfg(feature = "max-support")]
        FontOtf = "font/otf",
        #[cfg(feature = "max-support")]
        FontTtf = "font/ttf",
        #[cfg(feature = "max-support")]
        FontWoff = "font/woff",
        #[cfg(feature = "max-support")]
        ImageAll = "image/*",
        #[cfg(feature = "max-support")]
        ImageApng = "image/apng",
        #[cfg(feature = "max-support")]
        ImageAvif = "image/avif",
        ImageGif = "image/gif",
        ImageJpeg = "image/jpeg",
        ImagePng = "image/png",
        ImageSvgXml = "image/svg+xml",
        #[cfg(feature = "max-support")]
        ImageVndMicrosoftIcon = "image/vnd.microsoft.icon",
        ImageWebp = "image/webp",
        #[cfg(feature = "max-support")]
        ModelAll = "model/*",
        #[cfg(feature = "max-support")]
        Model3mf = "model/3mf",
        #[cfg(feature = "max-support")]
        ModelVrml = "model/vrml",
        #[cfg(feature = "max-support")]
        MultipartByteranges = "multipart/byteranges",
        MultipartFormData = "multipart/form-data",
        #[cfg(feature = "max-support")]
        TextAll = "text/*",
        TextCss = "text/css",
        #[cfg(feature = "max-support")]
        TextCsv = "text/csv",
        TextHtml = "text/html",
        #[cfg(feature = "max-support")]
        TextJavascript = "text/javascript",
        TextPlain = "text/plain",
    }
}

impl MimeType {
    /// Map a file extension to the Content-Type a file answer advertises.
    /// Unknown extensions become `application/octet-stream`.
    pub fn from_extension(ext: &[u8]) -> MimeType {
        let lower = |b: &[u8], s: &str| crate::util::eq_ignore_case(b, s.as_bytes());
        if lower(ext, "html") || lower(ext, "htm") {
            MimeType::TextHtml
        } else if lower(ext, "css") {
            MimeType::TextCss
        } else if lower(ext, "js") {
            MimeType::ApplicationJavascript
        } else if lower(ext, "png") {
            MimeType::ImagePng
        } else if lower(ext, "jpg") || lower(ext, "jpeg") {
            MimeType::ImageJpeg
        } else if lower(ext, "gif") {
            MimeType::ImageGif
        } else if lower(ext, "svg") {
            MimeType::ImageSvgXml
        } else if lower(ext, "webp") {
            MimeType::ImageWebp
        } else if lower(ext, "xml") {
            MimeType::ApplicationXml
        } else if lower(ext, "txt") {
            MimeType::TextPlain
        } else {
            MimeType::ApplicationOctetStream
        }
    }
}
