// crates/toop-interface-server/src/callback.rs
// ============================================================================
// Module: Inbound Callbacks
// Description: Application hooks invoked for accepted inbound messages.
// Purpose: Decouple the HTTP surface from what the application does with data.
// Dependencies: toop-interface-core, ed25519-dalek
// ============================================================================

//! ## Overview
//! [`DataProviderCallback`] receives parsed requests on the data-provider
//! route. The data-consumer route hands raw bodies to an
//! [`InboundBodyHandler`]; [`ResponseContainerHandler`] is the stock handler
//! that parses a response container and forwards it to a
//! [`DataConsumerCallback`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use ed25519_dalek::VerifyingKey;
use thiserror::Error;
use toop_interface_core::SignedContainerReader;
use toop_interface_core::ToopRequest;
use toop_interface_core::ToopResponse;
use toop_interface_core::parse_response_reader;

// ============================================================================
// SECTION: Callbacks
// ============================================================================

/// Failure reported by an application callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("callback failed: {0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    /// Creates a callback error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Application hook for requests arriving on the data-provider route.
pub trait DataProviderCallback: Send + Sync {
    /// Handles one parsed request.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError`] when the request cannot be processed; the
    /// server answers 500.
    fn on_request(&self, request: ToopRequest) -> Result<(), CallbackError>;
}

/// Application hook for responses arriving on the data-consumer route.
pub trait DataConsumerCallback: Send + Sync {
    /// Handles one parsed response.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError`] when the response cannot be processed.
    fn on_response(&self, response: ToopResponse) -> Result<(), CallbackError>;
}

// ============================================================================
// SECTION: Body Handlers
// ============================================================================

/// Result of handling an inbound body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Body accepted and processed.
    Accepted {
        /// Request identifier, when the body carried one.
        request_id: Option<String>,
    },
    /// Body malformed or not recognized.
    Rejected(String),
    /// Body recognized but processing failed.
    Failed(String),
}

/// Handler for raw bodies on the data-consumer route.
pub trait InboundBodyHandler: Send + Sync {
    /// Handles one inbound body.
    fn handle(&self, body: &[u8]) -> InboundOutcome;
}

/// Signature enforcement for inbound containers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SignatureCheck {
    /// Containers are parsed without verification.
    #[default]
    Disabled,
    /// Integrity and a valid signature by any signer are required.
    AnySigner,
    /// Integrity and a valid signature by one of the given keys are required.
    Trusted(Vec<VerifyingKey>),
}

impl SignatureCheck {
    /// Runs the configured check against an opened container.
    ///
    /// # Errors
    ///
    /// Returns the verification failures joined into one message.
    pub fn enforce(&self, reader: &SignedContainerReader) -> Result<(), String> {
        let report = match self {
            Self::Disabled => return Ok(()),
            Self::AnySigner => reader.verify(None),
            Self::Trusted(keys) => {
                let mut last = None;
                for key in keys {
                    let report = reader.verify(Some(key));
                    if report.is_pass() {
                        return Ok(());
                    }
                    last = Some(report);
                }
                last.ok_or_else(|| "no trusted signer keys configured".to_string())?
            }
        };
        if report.is_pass() {
            Ok(())
        } else {
            Err(format!("signature verification failed: {}", report.errors.join("; ")))
        }
    }
}

/// Stock data-consumer handler: parses a response container and forwards it.
pub struct ResponseContainerHandler {
    /// Application hook.
    callback: Arc<dyn DataConsumerCallback>,
    /// Signature enforcement.
    signature: SignatureCheck,
}

impl ResponseContainerHandler {
    /// Creates a handler without signature enforcement.
    #[must_use]
    pub fn new(callback: Arc<dyn DataConsumerCallback>) -> Self {
        Self {
            callback,
            signature: SignatureCheck::Disabled,
        }
    }

    /// Sets signature enforcement.
    #[must_use]
    pub fn with_signature_check(mut self, signature: SignatureCheck) -> Self {
        self.signature = signature;
        self
    }
}

impl InboundBodyHandler for ResponseContainerHandler {
    fn handle(&self, body: &[u8]) -> InboundOutcome {
        let reader = match SignedContainerReader::open(body) {
            Ok(reader) => reader,
            Err(err) => return InboundOutcome::Rejected(err.to_string()),
        };
        if let Err(message) = self.signature.enforce(&reader) {
            return InboundOutcome::Rejected(message);
        }
        let response = match parse_response_reader(&reader) {
            Ok(Some(response)) => response,
            Ok(None) => {
                return InboundOutcome::Rejected("container carries no response".to_string());
            }
            Err(err) => return InboundOutcome::Rejected(err.to_string()),
        };
        let request_id = Some(response.request.request_id.as_str().to_string());
        match self.callback.on_response(response) {
            Ok(()) => InboundOutcome::Accepted {
                request_id,
            },
            Err(err) => InboundOutcome::Failed(err.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use std::sync::Arc;
    use std::sync::Mutex;

    use ed25519_dalek::SigningKey;
    use toop_interface_core::DataRequestSubject;
    use toop_interface_core::EnvelopeMessageBuilder;
    use toop_interface_core::ParticipantId;
    use toop_interface_core::RequestParams;
    use toop_interface_core::SignedContainerReader;
    use toop_interface_core::SignedMessageBuilder;
    use toop_interface_core::ToopRequest;
    use toop_interface_core::ToopResponse;

    use super::CallbackError;
    use super::DataConsumerCallback;
    use super::InboundBodyHandler;
    use super::InboundOutcome;
    use super::ResponseContainerHandler;
    use super::SignatureCheck;

    #[derive(Default)]
    struct Collect {
        responses: Mutex<Vec<ToopResponse>>,
    }

    impl DataConsumerCallback for Collect {
        fn on_response(&self, response: ToopResponse) -> Result<(), CallbackError> {
            self.responses.lock().unwrap().push(response);
            Ok(())
        }
    }

    fn response() -> ToopResponse {
        let request = ToopRequest::from_params(RequestParams {
            subject: DataRequestSubject::legal_entity("AT/FN123456a"),
            dc_country_code: "SE".into(),
            dp_country_code: "AT".into(),
            sender_participant_id: ParticipantId::new("9914:sender"),
            document_type_id: "urn:doc".into(),
            process_id: "urn:process".into(),
            concepts: None,
        })
        .unwrap();
        ToopResponse::for_request(request)
    }

    #[test]
    fn forwards_parsed_response() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let response = response();
        let bytes = EnvelopeMessageBuilder.build_response(&response, &key).unwrap();
        let collect = Arc::new(Collect::default());
        let handler = ResponseContainerHandler::new(collect.clone())
            .with_signature_check(SignatureCheck::Trusted(vec![key.verifying_key()]));

        let outcome = handler.handle(&bytes);
        assert!(matches!(outcome, InboundOutcome::Accepted { .. }), "{outcome:?}");
        assert_eq!(*collect.responses.lock().unwrap(), vec![response]);
    }

    #[test]
    fn untrusted_signer_is_rejected() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let other = SigningKey::from_bytes(&[9u8; 32]);
        let bytes = EnvelopeMessageBuilder.build_response(&response(), &key).unwrap();
        let collect = Arc::new(Collect::default());
        let handler = ResponseContainerHandler::new(collect.clone())
            .with_signature_check(SignatureCheck::Trusted(vec![other.verifying_key()]));

        assert!(matches!(handler.handle(&bytes), InboundOutcome::Rejected(_)));
        assert!(collect.responses.lock().unwrap().is_empty());
    }

    #[test]
    fn request_container_is_not_a_response() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let bytes = EnvelopeMessageBuilder.build_request(&response().request, &key).unwrap();
        let handler = ResponseContainerHandler::new(Arc::new(Collect::default()));
        assert!(matches!(handler.handle(&bytes), InboundOutcome::Rejected(_)));
    }

    #[test]
    fn any_listed_trusted_key_is_accepted() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let other = SigningKey::from_bytes(&[9u8; 32]);
        let bytes = EnvelopeMessageBuilder.build_response(&response(), &key).unwrap();
        let reader = SignedContainerReader::open(bytes.as_slice()).unwrap();

        let listed = SignatureCheck::Trusted(vec![other.verifying_key(), key.verifying_key()]);
        assert!(listed.enforce(&reader).is_ok());
        assert!(SignatureCheck::Trusted(vec![other.verifying_key()]).enforce(&reader).is_err());
        assert!(SignatureCheck::Trusted(Vec::new()).enforce(&reader).is_err());
    }
}
