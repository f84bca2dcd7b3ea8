//! Client layer: orchestrates one send invocation over an injectable HTTP
//! transport.
//!
//! The pipeline is linear with no retries: resolve recipients, normalize,
//! build the request, then either stop (test mode) or dispatch and
//! interpret the reply. Any failure aborts the whole invocation; nothing
//! is ever sent after a validation error.

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::{ConfigError, ResolvedProfile};
use crate::contacts::{self, ContactBook, ContactError, CsvContacts};
use crate::domain::{MessageText, PhoneNumber, ValidationError};
use crate::transport::{RequestError, ResponseError, Verdict, interpret};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone)]
struct HttpResponse {
    status: u16,
    body: Vec<u8>,
}

trait HttpTransport: Send + Sync {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>>;
}

#[derive(Debug, Clone)]
struct ReqwestTransport {
    client: reqwest::Client,
}

impl HttpTransport for ReqwestTransport {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>> {
        Box::pin(async move {
            let response = self.client.get(url).send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?.to_vec();
            Ok(HttpResponse { status, body })
        })
    }
}

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`SmslClient`].
pub enum SmsError {
    /// HTTP client / transport failure (DNS, TLS, connection loss, etc).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    /// Non-successful HTTP status code returned by the server.
    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: u16, body: Option<String> },

    /// The finished request string is not a fetchable url.
    #[error("constructed request is not a valid url: {0}")]
    InvalidRequestUrl(#[source] url::ParseError),

    /// One of the domain constructors rejected an invalid value.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Recipient resolution failed.
    #[error("contact error: {0}")]
    Contacts(#[from] ContactError),

    /// Profile or configuration lookup failed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The url template could not be satisfied.
    #[error("request error: {0}")]
    Request(#[from] RequestError),

    /// The provider reply could not be interpreted.
    #[error("response error: {0}")]
    Response(#[from] ResponseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Values for the external history sink, produced after a real send.
pub struct HistoryRecord {
    pub profile: String,
    pub recipients: String,
    pub message: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
/// Result of one pipeline invocation.
pub enum Outcome {
    /// Test mode: the request was built but not dispatched.
    Test { request: String },
    /// The request was dispatched and the reply interpreted.
    Sent {
        request: String,
        answer: String,
        verdict: Verdict,
        record: HistoryRecord,
    },
}

#[derive(Clone)]
/// High-level send client.
///
/// Owns nothing but the HTTP transport; every invocation receives its own
/// resolved profile and contact snapshot, so separate invocations are
/// independent.
pub struct SmslClient {
    http: Arc<dyn HttpTransport>,
}

impl SmslClient {
    pub fn new() -> Self {
        Self {
            http: Arc::new(ReqwestTransport {
                client: reqwest::Client::new(),
            }),
        }
    }

    /// Run the pipeline for one invocation.
    ///
    /// `to` may name several comma-separated recipients; each token is
    /// resolved and normalized independently before the single request is
    /// built. With `test` set the pipeline stops after building the
    /// request and reports it instead of dispatching.
    pub async fn send(
        &self,
        profile: &ResolvedProfile,
        book: &ContactBook,
        csv: Option<&CsvContacts>,
        to: &str,
        message: &MessageText,
        test: bool,
    ) -> Result<Outcome, SmsError> {
        let mut numbers = Vec::new();
        for token in to.split(',') {
            let number =
                contacts::resolve_receiver(token.trim(), book, csv, profile.country_code())?;
            tracing::debug!("resolved '{}' to {}", token.trim(), number.as_str());
            numbers.push(number);
        }
        let recipients = numbers
            .iter()
            .map(PhoneNumber::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let request = profile
            .template()
            .build(&recipients, message.as_str(), profile.params())?;

        if test {
            return Ok(Outcome::Test { request });
        }

        let body = self.dispatch(&request).await?;
        let verdict = interpret(&body)?;
        let answer = String::from_utf8_lossy(&body).into_owned();
        tracing::debug!(
            "provider answered with result code {} ({})",
            verdict.result_code,
            verdict.summary()
        );

        let record = HistoryRecord {
            profile: profile.name().to_owned(),
            recipients,
            message: message.as_str().to_owned(),
            answer: answer.clone(),
        };
        Ok(Outcome::Sent {
            request,
            answer,
            verdict,
            record,
        })
    }

    /// Fetch the finished request and return the reply body.
    ///
    /// Url escaping is applied here, at the transport boundary.
    async fn dispatch(&self, request: &str) -> Result<Vec<u8>, SmsError> {
        let url = url::Url::parse(request).map_err(SmsError::InvalidRequestUrl)?;
        let response = self
            .http
            .fetch(url.as_str())
            .await
            .map_err(SmsError::Transport)?;

        if !(200..=299).contains(&response.status) {
            let text = String::from_utf8_lossy(&response.body);
            let body = if text.trim().is_empty() {
                None
            } else {
                Some(text.into_owned())
            };
            return Err(SmsError::HttpStatus {
                status: response.status,
                body,
            });
        }
        Ok(response.body)
    }
}

impl Default for SmslClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use crate::config::{ConfigStore, resolve_profile};
    use crate::config::profile::SecretPrompt;

    use super::*;

    #[derive(Debug, Clone)]
    struct FakeTransport {
        state: Arc<Mutex<FakeTransportState>>,
    }

    #[derive(Debug)]
    struct FakeTransportState {
        last_url: Option<String>,
        response_status: u16,
        response_body: Vec<u8>,
    }

    impl FakeTransport {
        fn new(response_status: u16, response_body: impl Into<Vec<u8>>) -> Self {
            Self {
                state: Arc::new(Mutex::new(FakeTransportState {
                    last_url: None,
                    response_status,
                    response_body: response_body.into(),
                })),
            }
        }

        fn last_url(&self) -> Option<String> {
            self.state.lock().unwrap().last_url.clone()
        }
    }

    impl HttpTransport for FakeTransport {
        fn fetch<'a>(
            &'a self,
            url: &'a str,
        ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>> {
            Box::pin(async move {
                let (status, body) = {
                    let mut state = self.state.lock().unwrap();
                    state.last_url = Some(url.to_owned());
                    (state.response_status, state.response_body.clone())
                };
                Ok(HttpResponse { status, body })
            })
        }
    }

    struct NoPrompt;

    impl SecretPrompt for NoPrompt {
        fn read_secret(&self, field: &str) -> std::io::Result<String> {
            panic!("unexpected prompt for {field}");
        }
    }

    fn make_client(transport: FakeTransport) -> SmslClient {
        SmslClient {
            http: Arc::new(transport),
        }
    }

    fn example_profile() -> ResolvedProfile {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smsl.json");
        std::fs::write(
            &path,
            r#"{
                "default_profile": "example",
                "example": {
                    "url": "https://x.test/sendsms?user={user}&pw={pw}&to={to}&text={text}",
                    "user": "alice",
                    "pw": "secret"
                }
            }"#,
        )
        .unwrap();
        let store = ConfigStore::load(&path).unwrap();
        resolve_profile(&store, None, &BTreeMap::new(), &NoPrompt).unwrap()
    }

    fn book_with_dude() -> ContactBook {
        let mut book = ContactBook::new();
        book.insert("dude", "+1234567890");
        book
    }

    #[tokio::test]
    async fn test_mode_reports_the_literal_substituted_url() {
        let client = make_client(FakeTransport::new(200, ""));
        let profile = example_profile();
        let message = MessageText::new("Hi").unwrap();

        let outcome = client
            .send(&profile, &book_with_dude(), None, "dude", &message, true)
            .await
            .unwrap();

        match outcome {
            Outcome::Test { request } => assert_eq!(
                request,
                "https://x.test/sendsms?user=alice&pw=secret&to=+1234567890&text=Hi"
            ),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_dispatches_and_interprets_the_reply() {
        let transport = FakeTransport::new(
            200,
            &b"<result>1</result><resultstring>success</resultstring>"[..],
        );
        let client = make_client(transport.clone());
        let profile = example_profile();
        let message = MessageText::new("Hi").unwrap();

        let outcome = client
            .send(&profile, &book_with_dude(), None, "dude", &message, false)
            .await
            .unwrap();

        match outcome {
            Outcome::Sent {
                verdict, record, ..
            } => {
                assert!(verdict.success);
                assert_eq!(record.profile, "example");
                assert_eq!(record.recipients, "+1234567890");
                assert_eq!(record.message, "Hi");
                assert!(record.answer.contains("success"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        // escaping happens at the transport boundary, not in the template
        let url = transport.last_url().unwrap();
        assert!(url.starts_with("https://x.test/sendsms?user=alice"));
        assert!(url.contains("to=+1234567890"));
    }

    #[tokio::test]
    async fn message_text_is_url_escaped_at_dispatch() {
        let transport = FakeTransport::new(200, &b"<result>1</result>"[..]);
        let client = make_client(transport.clone());
        let profile = example_profile();
        let message = MessageText::new("Hi there").unwrap();

        client
            .send(&profile, &book_with_dude(), None, "dude", &message, false)
            .await
            .unwrap();

        let url = transport.last_url().unwrap();
        assert!(url.contains("text=Hi%20there"), "got: {url}");
    }

    #[tokio::test]
    async fn comma_separated_recipients_share_one_request() {
        let client = make_client(FakeTransport::new(200, ""));
        let profile = example_profile();
        let message = MessageText::new("Hi").unwrap();

        let outcome = client
            .send(
                &profile,
                &book_with_dude(),
                None,
                "dude, +49176123456",
                &message,
                true,
            )
            .await
            .unwrap();

        match outcome {
            Outcome::Test { request } => {
                assert!(request.contains("to=+1234567890,+49176123456"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unresolvable_recipient_aborts_before_dispatch() {
        let transport = FakeTransport::new(200, &b"<result>1</result>"[..]);
        let client = make_client(transport.clone());
        let profile = example_profile();
        let message = MessageText::new("Hi").unwrap();

        let err = client
            .send(&profile, &ContactBook::new(), None, "nobody", &message, false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SmsError::Contacts(ContactError::ReceiverNotFound { .. })
        ));
        assert!(transport.last_url().is_none());
    }

    #[tokio::test]
    async fn non_success_http_status_is_an_error() {
        let client = make_client(FakeTransport::new(503, &b"oops"[..]));
        let profile = example_profile();
        let message = MessageText::new("Hi").unwrap();

        let err = client
            .send(&profile, &book_with_dude(), None, "dude", &message, false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SmsError::HttpStatus {
                status: 503,
                body: Some(_)
            }
        ));
    }

    #[tokio::test]
    async fn empty_http_error_body_becomes_none() {
        let client = make_client(FakeTransport::new(500, &b"   "[..]));
        let profile = example_profile();
        let message = MessageText::new("Hi").unwrap();

        let err = client
            .send(&profile, &book_with_dude(), None, "dude", &message, false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SmsError::HttpStatus {
                status: 500,
                body: None
            }
        ));
    }

    #[tokio::test]
    async fn reply_without_result_tag_is_a_response_error() {
        let client = make_client(FakeTransport::new(200, &b"all good"[..]));
        let profile = example_profile();
        let message = MessageText::new("Hi").unwrap();

        let err = client
            .send(&profile, &book_with_dude(), None, "dude", &message, false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SmsError::Response(ResponseError::MissingResultTag)
        ));
    }
}
