//! The smaller token vocabularies: charsets, transfer/content codings,
//! languages, cache directives and connection options.

use super::wire_enum;

wire_enum! {
    /// Accept-Charset values.
    pub enum Charset {
        Iso8859_1 = "ISO-8859-1",
        Iso8859_10 = "ISO-8859-10",
        Iso8859_11 = "ISO-8859-11",
        Iso8859_12 = "ISO-8859-12",
        Iso8859_13 = "ISO-8859-13",
        Iso8859_14 = "ISO-8859-14",
        Iso8859_15 = "ISO-8859-15",
        Iso8859_16 = "ISO-8859-16",
        Iso8859_2 = "ISO-8859-2",
        Iso8859_3 = "ISO-8859-3",
        Iso8859_4 = "ISO-8859-4",
        Iso8859_5 = "ISO-8859-5",
        Iso8859_6 = "ISO-8859-6",
        Iso8859_7 = "ISO-8859-7",
        Iso8859_8 = "ISO-8859-8",
        Iso8859_9 = "ISO-8859-9",
        UsAscii = "us-ascii",
        Utf16 = "utf-16",
        Utf32 = "utf-32",
        Utf8 = "utf-8",
    }
}

wire_enum! {
    /// Accept-Encoding / Content-Encoding / TE / Transfer-Encoding values.
    pub enum Encoding {
        All = "*",
        Br = "br",
        Chunked = "chunked",
        Compress = "compress",
        Deflate = "deflate",
        Gzip = "gzip",
        Identity = "identity",
    }
}

wire_enum! {
    /// Accept-Language / Content-Language tags. The minimal build only
    /// carries the wildcard and `en`; `max-support` has the usual list.
    pub enum Lang {
        All = "*",
        #[cfg(feature = "max-support")]
        Af = "af",
        #[cfg(feature = "max-support")]
        Am = "am",
        #[cfg(feature = "max-support")]
        Ar = "ar",
        #[cfg(feature = "max-support")]
        Az = "az",
        #[cfg(feature = "max-support")]
        Be = "be",
        #[cfg(feature = "max-support")]
        Bg = "bg",
        #[cfg(feature = "max-support")]
        Bn = "bn",
        #[cfg(feature = "max-support")]
        Bs = "bs",
        #[cfg(feature = "max-support")]
        Ca = "ca",
        #[cfg(feature = "max-support")]
        Co = "co",
        #[cfg(feature = "max-support")]
        Cs = "cs",
        #[cfg(feature = "max-support")]
        Cy = "cy",
        #[cfg(feature = "max-support")]
        Da = "da",
        #[cfg(feature = "max-support")]
        De = "de",
        #[cfg(feature = "max-support")]
        El = "el",
        En = "en",
        #[cfg(feature = "max-support")]
        Eo = "eo",
        #[cfg(feature = "max-support")]
        Es = "es",
        #[cfg(feature = "max-support")]
        Et = "et",
        #[cfg(feature = "max-support")]
        Eu = "eu",
        #[cfg(feature = "max-support")]
        Fa = "fa",
        #[cfg(feature = "max-support")]
        Fi = "fi",
        #[cfg(feature = "max-support")]
        Fr = "fr",
        #[cfg(feature = "max-support")]
        Fy = "fy",
        #[cfg(feature = "max-support")]
        Ga = "ga",
        #[cfg(feature = "max-support")]
        Gd = "gd",
        #[cfg(feature = "max-support")]
        Gl = "gl",
        #[cfg(feature = "max-support")]
        Gu = "gu",
        #[cfg(feature = "max-support")]
        Ha = "ha",
        #[cfg(feature = "max-support")]
        He = "he",
        #[cfg(feature = "max-support")]
        Hi = "hi",
        #[cfg(feature = "max-support")]
        Hr = "hr",
        #[cfg(feature = "max-support")]
        Hu = "hu",
        #[cfg(feature = "max-support")]
        Hy = "hy",
        #[cfg(feature = "max-support")]
        Id = "id",
        #[cfg(feature = "max-support")]
        Is = "is",
        #[cfg(feature = "max-support")]
        It = "it",
        #[cfg(feature = "max-support")]
        Ja = "ja",
        #[cfg(feature = "max-support")]
        Jv = "jv",
        #[cfg(feature = "max-support")]
        Ka = "ka",
        #[cfg(feature = "max-support")]
        Kk = "kk",
        #[cfg(feature = "max-support")]
        Km = "km",
        #[cfg(feature = "max-support")]
        Kn = "kn",
        #[cfg(feature = "max-support")]
        Ko = "ko",
        #[cfg(feature = "max-support")]
        Kr = "kr",
        #[cfg(feature = "max-support")]
        Ku = "ku",
        #[cfg(feature = "max-support")]
        Ky = "ky",
        #[cfg(feature = "max-support")]
        Lb = "lb",
        #[cfg(feature = "max-support")]
        Lt = "lt",
        #[cfg(feature = "max-support")]
        Lv = "lv",
        #[cfg(feature = "max-support")]
        Me = "me",
        #[cfg(feature = "max-support")]
        Mg = "mg",
        #[cfg(feature = "max-support")]
        Mi = "mi",
        #[cfg(feature = "max-support")]
        Mk = "mk",
        #[cfg(feature = "max-support")]
        Ml = "ml",
        #[cfg(feature = "max-support")]
        Mn = "mn",
        #[cfg(feature = "max-support")]
        Mr = "mr",
        #[cfg(feature = "max-support")]
        Ms = "ms",
        #[cfg(feature = "max-support")]
        Mt = "mt",
        #[cfg(feature = "max-support")]
        My = "my",
        #[cfg(feature = "max-support")]
        Nb = "nb",
        #[cfg(feature = "max-support")]
        Ne = "ne",
        #[cfg(feature = "max-support")]
        Nl = "nl",
        #[cfg(feature = "max-support")]
        No = "no",
        #[cfg(feature = "max-support")]
        Pa = "pa",
        #[cfg(feature = "max-support")]
        Pl = "pl",
        #[cfg(feature = "max-support")]
        Ps = "ps",
        #[cfg(feature = "max-support")]
        Pt = "pt",
        #[cfg(feature = "max-support")]
        Ro = "ro",
        #[cfg(feature = "max-support")]
        Ru = "ru",
        #[cfg(feature = "max-support")]
        Sd = "sd",
        #[cfg(feature = "max-support")]
        Si = "si",
        #[cfg(feature = "max-support")]
        Sk = "sk",
        #[cfg(feature = "max-support")]
        Sl = "sl",
        #[cfg(feature = "max-support")]
        Sm = "sm",
        #[cfg(feature = "max-support")]
        Sn = "sn",
        #[cfg(feature = "max-support")]
        So = "so",
        #[cfg(feature = "max-support")]
        Sq = "sq",
        #[cfg(feature = "max-support")]
        Sr = "sr",
        #[cfg(feature = "max-support")]
        St = "st",
        #[cfg(feature = "max-support")]
        Su = "su",
        #[cfg(feature = "max-support")]
        Sv = "sv",
        #[cfg(feature = "max-support")]
        Sw = "sw",
        #[cfg(feature = "max-support")]
        Ta = "ta",
        #[cfg(feature = "max-support")]
        Te = "te",
        #[cfg(feature = "max-support")]
        Tg = "tg",
        #[cfg(feature = "max-support")]
        Th = "th",
        #[cfg(feature = "max-support")]
        Tr = "tr",
        #[cfg(feature = "max-support")]
        Tt = "tt",
        #[cfg(feature = "max-support")]
        Uk = "uk",
        #[cfg(feature = "max-support")]
        Ur = "ur",
        #[cfg(feature = "max-support")]
        Uz = "uz",
        #[cfg(feature = "max-support")]
        Vi = "vi",
        #[cfg(feature = "max-support")]
        Xh = "xh",
        #[cfg(feature = "max-support")]
        Yi = "yi",
        #[cfg(feature = "max-support")]
        Yo = "yo",
        #[cfg(feature = "max-support")]
        Zh = "zh",
        #[cfg(feature = "max-support")]
        Zu = "zu",
    }
}

wire_enum! {
    /// Cache-Control directives.
    pub enum CacheDirective {
        MaxAge = "max-age",
        MaxStale = "max-stale",
        MinFresh = "min-fresh",
        MustRevalidate = "must-revalidate",
        NoCache = "no-cache",
        NoStore = "no-store",
        NoTransform = "no-transform",
        OnlyIfCached = "only-if-cached",
    }
}

wire_enum! {
    /// Connection header options.
    pub enum ConnectionOption {
        Close = "close",
        KeepAlive = "keep-alive",
        Upgrade = "upgrade",
    }
}
