//! The three-state result every call ends in.

use crate::codec::Decoder;
use crate::error::{DecodeError, ErrorKind};

/// Outcome of a call: success, failure with a payload, or bare failure.
///
/// A failure always carries an [`ErrorKind`]; a success never does. The
/// payload of [`Response::FailureWithPayload`] is whatever the server sent
/// alongside a non-acceptable status, raw or decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response<S, F> {
    Success(S),
    FailureWithPayload(F, ErrorKind),
    Failure(ErrorKind),
}

impl<S, F> Response<S, F> {
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    pub fn success(&self) -> Option<&S> {
        match self {
            Response::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_success(self) -> Option<S> {
        match self {
            Response::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorKind> {
        match self {
            Response::Success(_) => None,
            Response::FailureWithPayload(_, error) | Response::Failure(error) => Some(error),
        }
    }

    pub fn payload(&self) -> Option<&F> {
        match self {
            Response::FailureWithPayload(payload, _) => Some(payload),
            _ => None,
        }
    }

    /// Convert both sides.
    ///
    /// A success whose conversion fails becomes `Failure(Decode)`, never a
    /// success. A failure payload is converted only when `failure` is given;
    /// if that conversion fails the payload is dropped and the original
    /// error is kept.
    pub fn map<T, G, SF, FF>(self, success: SF, failure: Option<FF>) -> Response<T, G>
    where
        SF: FnOnce(S) -> Result<T, DecodeError>,
        FF: FnOnce(F) -> Result<G, DecodeError>,
    {
        match self {
            Response::Success(value) => match success(value) {
                Ok(value) => Response::Success(value),
                Err(err) => Response::Failure(ErrorKind::Decode(err)),
            },
            Response::FailureWithPayload(payload, error) => match failure {
                Some(convert) => match convert(payload) {
                    Ok(payload) => Response::FailureWithPayload(payload, error),
                    Err(err) => {
                        tracing::debug!(error = %err, "failed to decode error payload");
                        Response::Failure(error)
                    }
                },
                None => Response::Failure(error),
            },
            Response::Failure(error) => Response::Failure(error),
        }
    }
}

impl Response<Vec<u8>, Vec<u8>> {
    /// Decode raw bodies with the descriptor's codecs.
    pub fn decode<S, F>(self, success: &Decoder<S>, failure: Option<&Decoder<F>>) -> Response<S, F> {
        self.map(
            |body| success.decode(&body),
            failure.map(|decoder| move |body: Vec<u8>| decoder.decode(&body)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct ApiMessage {
        message: String,
    }

    type Raw = Response<Vec<u8>, Vec<u8>>;

    #[test]
    fn malformed_success_body_degrades_to_decode_failure() {
        let raw: Raw = Response::Success(b"not json".to_vec());
        let decoded = raw.decode(&Decoder::<Item>::json(), None::<&Decoder<ApiMessage>>);
        assert!(matches!(decoded, Response::Failure(ErrorKind::Decode(_))));
    }

    #[test]
    fn success_body_is_decoded() {
        let raw: Raw = Response::Success(br#"{"id":7}"#.to_vec());
        let decoded = raw.decode(&Decoder::<Item>::json(), None::<&Decoder<ApiMessage>>);
        assert_eq!(decoded, Response::Success(Item { id: 7 }));
    }

    #[test]
    fn failure_payload_decoded_when_decoder_present() {
        let raw: Raw = Response::FailureWithPayload(
            br#"{"message":"expired"}"#.to_vec(),
            HttpError::Unauthorized.into(),
        );
        let decoded = raw.decode(&Decoder::<Item>::json(), Some(&Decoder::<ApiMessage>::json()));
        assert_eq!(
            decoded,
            Response::FailureWithPayload(
                ApiMessage {
                    message: "expired".to_string()
                },
                HttpError::Unauthorized.into()
            )
        );
    }

    #[test]
    fn failure_payload_dropped_without_decoder() {
        let raw: Raw = Response::FailureWithPayload(b"{}".to_vec(), HttpError::NotFound.into());
        let decoded = raw.decode(&Decoder::<Item>::json(), None::<&Decoder<ApiMessage>>);
        assert_eq!(decoded, Response::Failure(HttpError::NotFound.into()));
    }

    #[test]
    fn undecodable_failure_payload_keeps_original_error() {
        let raw: Raw = Response::FailureWithPayload(b"<html>".to_vec(), HttpError::ServerError.into());
        let decoded = raw.decode(&Decoder::<Item>::json(), Some(&Decoder::<ApiMessage>::json()));
        assert_eq!(decoded, Response::Failure(HttpError::ServerError.into()));
    }

    #[test]
    fn bare_failure_passes_through() {
        let raw: Raw = Response::Failure(ErrorKind::EmptyResponse);
        let mapped: Response<u8, u8> = raw.map(
            |_| Ok(1),
            Some(|_: Vec<u8>| -> Result<u8, DecodeError> { panic!("no payload to convert") }),
        );
        assert_eq!(mapped, Response::Failure(ErrorKind::EmptyResponse));
    }
}
