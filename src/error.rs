use thiserror::Error;

/// Failure to turn a response body into a feed.
///
/// The two kinds are deliberately distinct: `MalformedXml` is a syntax
/// problem (the body is not XML at all), `MissingChannel` is a structural
/// one (valid XML that is not an RSS feed).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("document is not well-formed XML")]
    MalformedXml,

    #[error("no <channel> element in document")]
    MissingChannel,
}

/// Transport-level failure from the fetch gateway.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("proxy returned an invalid envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

/// Failure of a single fetch+parse pipeline run for one feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("network error: {0}")]
    Network(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Failure surfaced to the caller of `App::submit`.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("feed already added: {0}")]
    DuplicateFeed(String),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Clonable classification of a submission failure, carried in
/// `FormState::Failed` so event consumers can pick a message for it
/// without holding the error value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitErrorKind {
    InvalidUrl,
    DuplicateFeed,
    NetworkError,
    MalformedXml,
    MissingChannel,
}

impl SubmitError {
    pub fn kind(&self) -> SubmitErrorKind {
        match self {
            SubmitError::InvalidUrl(_) => SubmitErrorKind::InvalidUrl,
            SubmitError::DuplicateFeed(_) => SubmitErrorKind::DuplicateFeed,
            SubmitError::Feed(FeedError::Network(_)) => SubmitErrorKind::NetworkError,
            SubmitError::Feed(FeedError::Parse(ParseError::MalformedXml)) => {
                SubmitErrorKind::MalformedXml
            }
            SubmitError::Feed(FeedError::Parse(ParseError::MissingChannel)) => {
                SubmitErrorKind::MissingChannel
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_error_kinds_map_to_taxonomy() {
        let invalid = SubmitError::InvalidUrl(url::ParseError::EmptyHost);
        assert_eq!(invalid.kind(), SubmitErrorKind::InvalidUrl);

        let dup = SubmitError::DuplicateFeed("https://example.com/rss".into());
        assert_eq!(dup.kind(), SubmitErrorKind::DuplicateFeed);

        let malformed = SubmitError::Feed(FeedError::Parse(ParseError::MalformedXml));
        assert_eq!(malformed.kind(), SubmitErrorKind::MalformedXml);

        let no_channel = SubmitError::Feed(FeedError::Parse(ParseError::MissingChannel));
        assert_eq!(no_channel.kind(), SubmitErrorKind::MissingChannel);
    }

    #[test]
    fn parse_error_messages_name_the_failure() {
        assert!(ParseError::MalformedXml.to_string().contains("XML"));
        assert!(ParseError::MissingChannel.to_string().contains("channel"));
    }
}
