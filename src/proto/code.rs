/// HTTP status code, with the reason phrase table used when emitting the
/// status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Code {
    Continue = 100,

    Ok = 200,
    Created = 201,
    Accepted = 202,
    NonAuthInfo = 203,
    NoContent = 204,
    ResetContent = 205,
    PartialContent = 206,

    MultipleChoices = 300,
    MovedForever = 301,
    MovedTemporarily = 302,
    SeeOther = 303,
    NotModified = 304,
    UseProxy = 305,
    Unused = 306,
    TemporaryRedirect = 307,

    BadRequest = 400,
    Unauthorized = 401,
    PaymentRequired = 402,
    Forbidden = 403,
    NotFound = 404,
    BadMethod = 405,
    NotAcceptable = 406,
    ProxyRequired = 407,
    TimedOut = 408,
    Conflict = 409,
    Gone = 410,
    LengthRequired = 411,
    PreconditionFail = 412,
    EntityTooLarge = 413,
    UriTooLarge = 414,
    UnsupportedMime = 415,
    RequestRange = 416,
    ExpectationFail = 417,

    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    Unavailable = 503,
    GatewayTimedOut = 504,
    UnsupportedHttpVersion = 505,
    ConnectionTimedOut = 522,
}

impl Code {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(v: u16) -> Option<Code> {
        use Code::*;
        let c = match v {
            100 => Continue,
            200 => Ok,
            201 => Created,
            202 => Accepted,
            203 => NonAuthInfo,
            204 => NoContent,
            205 => ResetContent,
            206 => PartialContent,
            300 => MultipleChoices,
            301 => MovedForever,
            302 => MovedTemporarily,
            303 => SeeOther,
            304 => NotModified,
            305 => UseProxy,
            306 => Unused,
            307 => TemporaryRedirect,
            400 => BadRequest,
            401 => Unauthorized,
            402 => PaymentRequired,
            403 => Forbidden,
            404 => NotFound,
            405 => BadMethod,
            406 => NotAcceptable,
            407 => ProxyRequired,
            408 => TimedOut,
            409 => Conflict,
            410 => Gone,
            411 => LengthRequired,
            412 => PreconditionFail,
            413 => EntityTooLarge,
            414 => UriTooLarge,
            415 => UnsupportedMime,
            416 => RequestRange,
            417 => ExpectationFail,
            500 => InternalServerError,
            501 => NotImplemented,
            502 => BadGateway,
            503 => Unavailable,
            504 => GatewayTimedOut,
            505 => UnsupportedHttpVersion,
            522 => ConnectionTimedOut,
            _ => return None,
        };
        Some(c)
    }

    /// The reason phrase sent on the status line.
    pub fn reason(self) -> &'static str {
        use Code::*;
        match self {
            Continue => "Continue",
            Ok => "Ok",
            Created => "Created",
            Accepted => "Accepted",
            NonAuthInfo => "Non Auth Info",
            NoContent => "No Content",
            ResetContent => "Reset Content",
            PartialContent => "Partial Content",
            MultipleChoices => "Multiple Choices",
            MovedForever => "Moved Forever",
            MovedTemporarily => "Moved Temporarily",
            SeeOther => "See Other",
            NotModified => "Not Modified",
            UseProxy => "Use Proxy",
            Unused => "Unused",
            TemporaryRedirect => "Temporary Redirect",
            BadRequest => "Bad Request",
            Unauthorized => "Unauthorized",
            PaymentRequired => "Payment Required",
            Forbidden => "Forbidden",
            NotFound => "Not Found",
            BadMethod => "Bad Method",
            NotAcceptable => "Not Acceptable",
            ProxyRequired => "Proxy Required",
            TimedOut => "Timed Out",
            Conflict => "Conflict",
            Gone => "Gone",
            LengthRequired => "Length Required",
            PreconditionFail => "Precondition Fail",
            EntityTooLarge => "Entity Too Large",
            UriTooLarge => "URI Too Large",
            UnsupportedMime => "Unsupported MIME",
            RequestRange => "Request Range",
            ExpectationFail => "Expectation Fail",
            InternalServerError => "Internal Server Error",
            NotImplemented => "Not Implemented",
            BadGateway => "Bad Gateway",
            Unavailable => "Unavailable",
            GatewayTimedOut => "Gateway Timed Out",
            UnsupportedHttpVersion => "Unsupported HTTP Version",
            ConnectionTimedOut => "Connection Timed Out",
        }
    }

    /// A longer human description, for status pages.
    #[cfg(feature = "max-support")]
    pub fn description(self) -> &'static str {
        use Code::*;
        match self {
            Ok => "The request processing succeeded",
            Created => "The request was created",
            Accepted => "The request was accepted",
            NonAuthInfo => "Non authoritative information provided",
            NoContent => "No content found",
            ResetContent => "The server reset the content",
            PartialContent => "The server sent partial content",
            MultipleChoices => "The server gave redirection choices",
            MovedForever => "The content moved permanently",
            MovedTemporarily => "The content moved temporarily",
            SeeOther => "Please see the other url",
            NotModified => "The content wasn't modified",
            UseProxy => "The use of a proxy is not allowed",
            Unused => "This content is not used",
            TemporaryRedirect => "There is a temporary redirection in place",
            BadRequest => "The server doesn't understand the request",
            Unauthorized => "The server doesn't grant access to this resource",
            PaymentRequired => "Access to this resource requires payment",
            Forbidden => "The server denied access to the content",
            NotFound => "The requested content wasn't found",
            BadMethod => "The used method is not allowed",
            NotAcceptable => "The request is not acceptable",
            ProxyRequired => "Proxy authentication required",
            TimedOut => "The request timed out",
            Conflict => "The server encountered a conflict on the resource",
            Gone => "The content is gone",
            LengthRequired => "The request length is required",
            PreconditionFail => "The precondition failed",
            EntityTooLarge => "The request entity is too large",
            UriTooLarge => "The request URI is too large",
            UnsupportedMime => "The given media type is not supported",
            RequestRange => "Requested range is not correct",
            ExpectationFail => "Expectation failed",
            InternalServerError => "The server present an internal error",
            NotImplemented => "The requested resource or method isn't implemented",
            BadGateway => "The server use a bad gateway",
            Unavailable => "The service is unavailable",
            GatewayTimedOut => "The gateway timed out",
            UnsupportedHttpVersion => "The given HTTP version is not supported",
            ConnectionTimedOut => "The connection to the server timed out",
            Continue => "",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn roundtrip_u16() {
        assert_eq!(Code::Ok.as_u16(), 200);
        assert_eq!(Code::from_u16(404), Some(Code::NotFound));
        assert_eq!(Code::from_u16(418), None);
    }

    #[test]
    fn reasons() {
        assert_eq!(Code::EntityTooLarge.reason(), "Entity Too Large");
        assert_eq!(Code::Ok.reason(), "Ok");
    }
}
