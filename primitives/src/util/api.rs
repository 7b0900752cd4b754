use std::{fmt, str::FromStr};

use parse_display::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid scheme '{0}', only 'http' & 'https' are allowed")]
    InvalidScheme(String),
    #[error("The Url has to be a base, i.e. `data:`, `mailto:` etc. are not allowed")]
    ShouldBeABase,
    #[error("Fragments and query parameters are not allowed in the base Url")]
    HasFragmentOrQuery,
    #[error("Parsing the url: {0}")]
    Parsing(#[from] url::ParseError),
}

/// The base Url of a REST API, e.g. the clearnode.
///
/// It's always `http` or `https` without a query or a fragment and its path
/// always ends with `/`, so [`ApiUrl::join`] appends endpoints instead of
/// replacing the last path segment.
#[derive(Clone, Hash, Display, Eq, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "Url", into = "Url")]
pub struct ApiUrl(Url);

impl ApiUrl {
    pub fn parse(input: &str) -> Result<Self, Error> {
        Self::from_str(input)
    }

    /// Joins the endpoint to the base Url, a leading `/` of the endpoint is ignored.
    pub fn join(&self, endpoint: &str) -> Result<Url, url::ParseError> {
        self.0.join(endpoint.trim_start_matches('/'))
    }

    /// Appends the percent-encoded path segments to the base Url,
    /// a `/` inside a segment does not start a new one.
    pub fn join_segments<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.0.clone();
        // always a base Url
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        url
    }

    pub fn to_url(&self) -> Url {
        self.0.clone()
    }
}

impl fmt::Debug for ApiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiUrl({})", self)
    }
}

impl TryFrom<Url> for ApiUrl {
    type Error = Error;

    fn try_from(mut url: Url) -> Result<Self, Self::Error> {
        if url.cannot_be_a_base() {
            return Err(Error::ShouldBeABase);
        }

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidScheme(url.scheme().to_string()));
        }

        if url.fragment().is_some() || url.query().is_some() {
            return Err(Error::HasFragmentOrQuery);
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self(url))
    }
}

impl From<ApiUrl> for Url {
    fn from(api_url: ApiUrl) -> Self {
        api_url.0
    }
}

impl FromStr for ApiUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.parse::<Url>()?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn api_url_normalizes_the_path() {
        let cases = [
            ("http://127.0.0.1:8000", "http://127.0.0.1:8000/"),
            ("https://clearnode.example.com/api", "https://clearnode.example.com/api/"),
            ("https://clearnode.example.com/api/", "https://clearnode.example.com/api/"),
        ];

        for (input, expected) in cases {
            let api_url = ApiUrl::parse(input).expect("Should be a valid ApiUrl");
            assert_eq!(expected, api_url.to_string());
        }
    }

    #[test]
    fn api_url_rejects_invalid_urls() {
        assert_eq!(
            Err(Error::InvalidScheme("ws".into())),
            ApiUrl::parse("ws://127.0.0.1/")
        );
        assert_eq!(Err(Error::ShouldBeABase), ApiUrl::parse("data:text/plain,Stuff"));
        assert_eq!(
            Err(Error::HasFragmentOrQuery),
            ApiUrl::parse("http://127.0.0.1/?chain=1")
        );
        assert!(matches!(ApiUrl::parse("/relative"), Err(Error::Parsing(_))));
    }

    #[test]
    fn joins_endpoints() {
        let api_url = ApiUrl::parse("http://127.0.0.1/v1").unwrap();

        let expected = "http://127.0.0.1/v1/config/31337/custody";
        assert_eq!(expected, api_url.join("config/31337/custody").unwrap().as_str());
        assert_eq!(expected, api_url.join("/config/31337/custody").unwrap().as_str());
    }

    #[test]
    fn joins_escaped_segments() {
        let api_url = ApiUrl::parse("http://127.0.0.1/v1/").unwrap();

        assert_eq!(
            "http://127.0.0.1/v1/channels/home/US%2FDC%3Fx",
            api_url
                .join_segments(["channels", "home", "US/DC?x"])
                .as_str()
        );
        assert_eq!(
            "http://127.0.0.1/v1/channels/home/USDC",
            api_url.join_segments(["channels", "home", "USDC"]).as_str()
        );
    }
}
