use super::wire_enum;

wire_enum! {
    /// The headers this library can recognize by name. Everything else on
    /// the wire is skipped silently. The `max-support` feature widens the
    /// set; both configurations speak the same wire format.
    pub enum Header {
        Accept = "Accept",
        #[cfg(feature = "max-support")]
        AcceptCharset = "Accept-Charset",
        #[cfg(feature = "max-support")]
        AcceptDatetime = "Accept-Datetime",
        AcceptEncoding = "Accept-Encoding",
        AcceptLanguage = "Accept-Language",
        #[cfg(feature = "max-support")]
        AcceptPatch = "Accept-Patch",
        AcceptRanges = "Accept-Ranges",
        #[cfg(feature = "max-support")]
        AccessControlAllowCredentials = "Access-Control-Allow-Credentials",
        #[cfg(feature = "max-support")]
        AccessControlAllowHeaders = "Access-Control-Allow-Headers",
        #[cfg(feature = "max-support")]
        AccessControlAllowMethods = "Access-Control-Allow-Methods",
        AccessControlAllowOrigin = "Access-Control-Allow-Origin",
        #[cfg(feature = "max-support")]
        AccessControlExposeHeaders = "Access-Control-Expose-Headers",
        #[cfg(feature = "max-support")]
        AccessControlMaxAge = "Access-Control-Max-Age",
        #[cfg(feature = "max-support")]
        AccessControlRequestMethod = "Access-Control-Request-Method",
        #[cfg(feature = "max-support")]
        Allow = "Allow",
        Authorization = "Authorization",
        CacheControl = "Cache-Control",
        Connection = "Connection",
        ContentDisposition = "Content-Disposition",
        ContentEncoding = "Content-Encoding",
        ContentLanguage = "Content-Language",
        ContentLength = "Content-Length",
        #[cfg(feature = "max-support")]
        ContentLocation = "Content-Location",
        ContentRange = "Content-Range",
        ContentType = "Content-Type",
        Cookie = "Cookie",
        Date = "Date",
        #[cfg(feature = "max-support")]
        ETag = "ETag",
        #[cfg(feature = "max-support")]
        Expect = "Expect",
        Expires = "Expires",
        #[cfg(feature = "max-support")]
        Forwarded = "Forwarded",
        #[cfg(feature = "max-support")]
        From = "From",
        Host = "Host",
        #[cfg(feature = "max-support")]
        IfMatch = "If-Match",
        #[cfg(feature = "max-support")]
        IfModifiedSince = "If-Modified-Since",
        #[cfg(feature = "max-support")]
        IfNoneMatch = "If-None-Match",
        #[cfg(feature = "max-support")]
        IfRange = "If-Range",
        #[cfg(feature = "max-support")]
        IfUnmodifiedSince = "If-Unmodified-Since",
        LastModified = "Last-Modified",
        #[cfg(feature = "max-support")]
        Link = "Link",
        Location = "Location",
        #[cfg(feature = "max-support")]
        MaxForwards = "Max-Forwards",
        Origin = "Origin",
        Pragma = "Pragma",
        #[cfg(feature = "max-support")]
        Prefer = "Prefer",
        #[cfg(feature = "max-support")]
        ProxyAuthorization = "Proxy-Authorization",
        Range = "Range",
        Referer = "Referer",
        Server = "Server",
        SetCookie = "Set-Cookie",
        #[cfg(feature = "max-support")]
        StrictTransportSecurity = "Strict-Transport-Security",
        Te = "TE",
        #[cfg(feature = "max-support")]
        Trailer = "Trailer",
        TransferEncoding = "Transfer-Encoding",
        Upgrade = "Upgrade",
        UserAgent = "User-Agent",
        #[cfg(feature = "max-support")]
        Via = "Via",
        WwwAuthenticate = "WWW-Authenticate",
        #[cfg(feature = "max-support")]
        XForwardedFor = "X-Forwarded-For",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(Header::from_bytes(b"content-length"), Some(Header::ContentLength));
        assert_eq!(Header::from_bytes(b"CONTENT-TYPE"), Some(Header::ContentType));
        assert_eq!(Header::from_bytes(b"Host"), Some(Header::Host));
        assert_eq!(Header::from_bytes(b"te"), Some(Header::Te));
        assert_eq!(Header::from_bytes(b"X-Stuff"), None);
    }

    #[test]
    fn table_sorted() {
        let names: Vec<&str> = Header::ALL.iter().map(|h| h.as_str()).collect();
        super::super::assert_table_sorted(&names);
    }

    #[test]
    fn wire_names() {
        assert_eq!(Header::WwwAuthenticate.as_str(), "WWW-Authenticate");
        assert_eq!(Header::UserAgent.as_str(), "User-Agent");
    }
}
