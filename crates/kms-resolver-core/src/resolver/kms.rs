//! KMS ciphertext resolution
//!
//! Turns a base64 ciphertext from stack config into plaintext with a single
//! `kms:decrypt` call made through the stack's connection manager.
//!
//! Flow:
//! 1. base64-decode the argument (exactly once, before dispatch)
//! 2. `decrypt` with `CiphertextBlob` and the stack's profile/region
//! 3. read the binary `Plaintext` field and decode it as UTF-8

use std::fmt;
use std::sync::Arc;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{DecodeError, Engine};

use crate::connection::{CallError, ParamValue, ServiceCall, ServiceResponse};
use crate::error::{ResolverError, ResolverResult};
use crate::logging::{SharedLogger, TracingLogger};
use crate::stack::Stack;
use crate::{log_debug, log_error};

use super::traits::Resolver;

/// Service id of the key-management service
pub const KMS_SERVICE: &str = "kms";
/// Decrypt command id
pub const DECRYPT_COMMAND: &str = "decrypt";
/// Request argument carrying the decoded ciphertext
pub const CIPHERTEXT_BLOB: &str = "CiphertextBlob";
/// Response field carrying the plaintext bytes
pub const PLAINTEXT_FIELD: &str = "Plaintext";
/// Substring of the service error code mapped to `ResolverError::ParameterNotFound`
pub const PARAMETER_NOT_FOUND_CODE: &str = "ParameterNotFound";

/// Standard alphabet; padding and trailing bits are checked in `decode_ciphertext`
const CIPHERTEXT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode a base64 ciphertext as written in stack config
///
/// ASCII whitespace is dropped so wrapped (block or folded YAML) values
/// decode. The last group must be padded, but padding beyond that is
/// ignored: `QQ==` and `QQ===` decode, `QQ` does not.
pub fn decode_ciphertext(param: &str) -> Result<Vec<u8>, DecodeError> {
    let compact: String = param.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let data = compact.trim_end_matches('=');

    let padding = compact.len() - data.len();
    let required = (4 - data.len() % 4) % 4;
    if padding < required {
        return Err(DecodeError::InvalidPadding);
    }

    CIPHERTEXT_ENGINE.decode(data)
}

/// Shared KMS decryption behaviour
///
/// Implementors supply the stack and a logger; the provided methods do the
/// rest. Error mapping:
/// - malformed request: returned unchanged as `ResolverError::Call`
/// - service error whose code contains `ParameterNotFound`: logged, then
///   `ResolverError::ParameterNotFound` with the service message
/// - any other service error: returned unchanged as `ResolverError::Call`
///
/// The error-path log lines name the stack and the requested *ciphertext*.
/// The ciphertext is not a secret in itself, but it is still disclosed to
/// whoever reads the logs. Decrypted values are never logged.
pub trait KmsBase {
    /// Stack the value is resolved for
    fn stack(&self) -> &Stack;

    /// Logger for diagnostics
    fn logger(&self) -> &SharedLogger;

    /// Decrypt `param` and return the plaintext as text
    fn get_decoded_value(
        &self,
        param: &str,
        profile: Option<&str>,
        region: Option<&str>,
    ) -> ResolverResult<String> {
        let response = self.request_kms_value(param, profile, region)?;

        let Some(binary_value) = response.get_blob(PLAINTEXT_FIELD) else {
            log_error!(
                self.logger(),
                "{} - Invalid response looking for: {}",
                self.stack().name(),
                param
            );
            return Err(ResolverError::missing_field(PLAINTEXT_FIELD));
        };

        let decoded_value = std::str::from_utf8(binary_value)?;
        Ok(decoded_value.to_string())
    }

    /// Send the `decrypt` request for `param` and return the raw response
    fn request_kms_value(
        &self,
        param: &str,
        profile: Option<&str>,
        region: Option<&str>,
    ) -> ResolverResult<ServiceResponse> {
        let ciphertext_blob = decode_ciphertext(param)?;

        let call = ServiceCall::new(KMS_SERVICE, DECRYPT_COMMAND)
            .with_kwarg(CIPHERTEXT_BLOB, ParamValue::Blob(ciphertext_blob))
            .with_profile(profile)
            .with_region(region);

        match self.stack().connection_manager().call(call) {
            Ok(response) => Ok(response),
            Err(CallError::Service(err)) if err.code.contains(PARAMETER_NOT_FOUND_CODE) => {
                log_error!(
                    self.logger(),
                    "{} - ParameterNotFound: {}",
                    self.stack().name(),
                    param
                );
                Err(ResolverError::ParameterNotFound(err.message))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Resolve `argument` with the stack's profile/region through `base`
///
/// Returns `None` without any remote call when the argument is absent or
/// empty. Otherwise calls [`KmsBase::get_decoded_value`] exactly once.
pub fn resolve_argument<B: KmsBase + ?Sized>(
    base: &B,
    argument: Option<&str>,
) -> ResolverResult<Option<String>> {
    let stack = base.stack();
    let profile = stack.profile();
    let region = stack.region();

    match argument {
        Some(param) if !param.is_empty() => {
            log_debug!(base.logger(), "Resolving KMS parameter: {}", param);
            base.get_decoded_value(param, profile, region).map(Some)
        }
        _ => Ok(None),
    }
}

/// Resolver for retrieving the plaintext of a KMS ciphertext
///
/// Bound to the `kms` tag in stack config:
///
/// ```yaml
/// parameters:
///   DbPassword: !kms AQICAHjd17DKHzNyNq9XvuZzboDpt6OhdLG7eDPA
/// ```
pub struct KmsResolver {
    argument: Option<String>,
    stack: Arc<Stack>,
    logger: SharedLogger,
}

impl KmsResolver {
    /// Create a resolver logging through `tracing`
    pub fn new(argument: Option<String>, stack: Arc<Stack>) -> Self {
        Self {
            argument,
            stack,
            logger: Arc::new(TracingLogger::new()),
        }
    }

    /// Replace the logger
    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    /// The configured ciphertext argument
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

impl KmsBase for KmsResolver {
    fn stack(&self) -> &Stack {
        &self.stack
    }

    fn logger(&self) -> &SharedLogger {
        &self.logger
    }
}

impl Resolver for KmsResolver {
    fn name(&self) -> &str {
        KMS_SERVICE
    }

    fn resolve(&self) -> ResolverResult<Option<String>> {
        resolve_argument(self, self.argument.as_deref())
    }
}

impl fmt::Debug for KmsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KmsResolver")
            .field("argument", &self.argument)
            .field("stack", &self.stack.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MockConnectionManager;
    use crate::logging::{LogLevel, MemoryLogger};
    use base64::engine::general_purpose::STANDARD;
    use std::sync::Mutex;

    const CIPHERTEXT: &str = "AQICAHjd17DKHzNyNq9XvuZzboDpt6OhdLG7eDPA==";

    /// Minimal `KmsBase` over a mock connection
    struct TestBase {
        stack: Stack,
        logger: SharedLogger,
    }

    impl KmsBase for TestBase {
        fn stack(&self) -> &Stack {
            &self.stack
        }

        fn logger(&self) -> &SharedLogger {
            &self.logger
        }
    }

    fn base_with(manager: Arc<MockConnectionManager>) -> (TestBase, Arc<MemoryLogger>) {
        let logger = Arc::new(MemoryLogger::new());
        let base = TestBase {
            stack: Stack::new("test_name", manager),
            logger: logger.clone(),
        };
        (base, logger)
    }

    #[test]
    fn test_get_decoded_value_with_valid_key() {
        let manager = Arc::new(MockConnectionManager::plaintext("Secret"));
        let (base, logger) = base_with(manager.clone());

        let value = base.get_decoded_value(CIPHERTEXT, None, None).unwrap();

        assert_eq!(value, "Secret");
        assert_eq!(manager.call_count(), 1);
        assert!(!logger.contains("Secret"));
    }

    #[test]
    fn test_get_decoded_value_returns_plaintext_for_any_ciphertext() {
        let manager = Arc::new(MockConnectionManager::plaintext("pässwörd ✓"));
        let (base, _) = base_with(manager);

        for ciphertext in ["U2VjcmV0", "aHVudGVyMg==", CIPHERTEXT, ""] {
            assert_eq!(base.get_decoded_value(ciphertext, None, None).unwrap(), "pässwörd ✓");
        }
    }

    #[test]
    fn test_get_decoded_value_with_invalid_response() {
        let manager = Arc::new(MockConnectionManager::responding(
            ServiceResponse::new().with_field("KeyId", MockConnectionManager::KEY_ID),
        ));
        let (base, logger) = base_with(manager);

        let err = base.get_decoded_value(CIPHERTEXT, None, None).unwrap_err();

        assert!(matches!(err, ResolverError::MissingField { ref field } if field == "Plaintext"));
        assert_eq!(
            logger.messages(LogLevel::Error),
            vec![format!("test_name - Invalid response looking for: {}", CIPHERTEXT)]
        );
    }

    #[test]
    fn test_text_plaintext_field_counts_as_missing() {
        let manager = Arc::new(MockConnectionManager::responding(
            ServiceResponse::new().with_field("Plaintext", "not bytes"),
        ));
        let (base, _) = base_with(manager);

        let err = base.get_decoded_value(CIPHERTEXT, None, None).unwrap_err();
        assert!(matches!(err, ResolverError::MissingField { .. }));
    }

    /// Skips the remote call entirely, like patching the request step
    struct StubbedRequest {
        stack: Stack,
        logger: SharedLogger,
        response: ServiceResponse,
    }

    impl KmsBase for StubbedRequest {
        fn stack(&self) -> &Stack {
            &self.stack
        }

        fn logger(&self) -> &SharedLogger {
            &self.logger
        }

        fn request_kms_value(
            &self,
            _param: &str,
            _profile: Option<&str>,
            _region: Option<&str>,
        ) -> ResolverResult<ServiceResponse> {
            Ok(self.response.clone())
        }
    }

    #[test]
    fn test_missing_field_regardless_of_input() {
        let base = StubbedRequest {
            stack: Stack::new("test_name", Arc::new(MockConnectionManager::echo())),
            logger: Arc::new(MemoryLogger::new()),
            response: ServiceResponse::new().with_field("KeyId", MockConnectionManager::KEY_ID),
        };

        for param in ["", "not base64 at all", CIPHERTEXT] {
            let err = base.get_decoded_value(param, None, None).unwrap_err();
            assert!(matches!(err, ResolverError::MissingField { .. }), "input {:?}", param);
        }
    }

    #[test]
    fn test_request_kms_value_with_invalid_input() {
        let manager = Arc::new(MockConnectionManager::failing(CallError::malformed(
            "Parameter validation failed: Invalid type for parameter CiphertextBlob",
        )));
        let (base, logger) = base_with(manager);

        let err = base.request_kms_value(CIPHERTEXT, None, None).unwrap_err();

        match err {
            ResolverError::Call(CallError::Malformed(message)) => {
                assert_eq!(message, "Parameter validation failed: Invalid type for parameter CiphertextBlob");
            }
            other => panic!("expected malformed request, got {:?}", other),
        }
        assert!(logger.is_empty());
    }

    #[test]
    fn test_request_kms_value_with_parameter_not_found() {
        let manager = Arc::new(MockConnectionManager::failing(CallError::service(
            "ParameterNotFound",
            "Boom!",
        )));
        let (base, logger) = base_with(manager);

        let err = base.request_kms_value(CIPHERTEXT, None, None).unwrap_err();

        match err {
            ResolverError::ParameterNotFound(message) => assert_eq!(message, "Boom!"),
            other => panic!("expected ParameterNotFound, got {:?}", other),
        }
        assert_eq!(
            logger.messages(LogLevel::Error),
            vec![format!("test_name - ParameterNotFound: {}", CIPHERTEXT)]
        );
    }

    #[test]
    fn test_parameter_not_found_matches_code_substring() {
        let manager = Arc::new(MockConnectionManager::failing(CallError::service(
            "ssm.ParameterNotFoundException",
            "no such key",
        )));
        let (base, _) = base_with(manager);

        let err = base.get_decoded_value(CIPHERTEXT, None, None).unwrap_err();
        assert!(err.is_parameter_not_found());
        assert_eq!(err.to_string(), "Parameter not found: no such key");
    }

    #[test]
    fn test_other_service_errors_propagate_unchanged() {
        let original = CallError::service("AccessDeniedException", "not allowed to decrypt");
        let manager = Arc::new(MockConnectionManager::failing(original.clone()));
        let (base, logger) = base_with(manager);

        let err = base.get_decoded_value(CIPHERTEXT, None, None).unwrap_err();

        match err {
            ResolverError::Call(call_error) => assert_eq!(call_error, original),
            other => panic!("expected service error, got {:?}", other),
        }
        assert!(logger.is_empty());
    }

    #[test]
    fn test_invalid_base64_fails_before_dispatch() {
        let manager = Arc::new(MockConnectionManager::echo());
        let (base, _) = base_with(manager.clone());

        let err = base.get_decoded_value("/dev/DbPassword", None, None).unwrap_err();

        assert!(matches!(err, ResolverError::Decoding(_)));
        assert_eq!(manager.call_count(), 0);
    }

    #[test]
    fn test_decode_ciphertext_padding() {
        assert_eq!(decode_ciphertext("U2VjcmV0").unwrap(), b"Secret");
        assert_eq!(decode_ciphertext("U2VjcmV0==").unwrap(), b"Secret");
        assert_eq!(decode_ciphertext("QQ==").unwrap(), b"A");
        assert_eq!(decode_ciphertext("QQ===").unwrap(), b"A");
        assert_eq!(decode_ciphertext("").unwrap(), b"");

        assert!(matches!(decode_ciphertext("QQ"), Err(DecodeError::InvalidPadding)));
        assert!(matches!(decode_ciphertext("QQ="), Err(DecodeError::InvalidPadding)));
        assert!(decode_ciphertext("U2Vj!mV0").is_err());
    }

    #[test]
    fn test_decode_ciphertext_ignores_whitespace() {
        assert_eq!(decode_ciphertext("U2Vj\ncmV0").unwrap(), b"Secret");
        assert_eq!(decode_ciphertext("U2VjcmV0 ").unwrap(), b"Secret");
        assert_eq!(decode_ciphertext("  U2Vj cmV0\r\n\t").unwrap(), b"Secret");
    }

    #[test]
    fn test_decode_ciphertext_ignores_trailing_bits() {
        // "QR==" carries non-zero bits after the last full byte
        assert_eq!(decode_ciphertext("QR==").unwrap(), b"A");
    }

    #[test]
    fn test_padded_and_wrapped_ciphertexts_reach_the_service() {
        let manager = Arc::new(MockConnectionManager::plaintext("Secret"));
        let (base, _) = base_with(manager.clone());
        let expected = STANDARD.decode("AQICAHjd17DKHzNyNq9XvuZzboDpt6OhdLG7eDPA").unwrap();

        for ciphertext in [
            CIPHERTEXT,
            "AQICAHjd17DKHzNyNq9XvuZz\nboDpt6OhdLG7eDPA\n",
            "AQICAHjd17DKHzNyNq9XvuZz boDpt6OhdLG7eDPA",
        ] {
            assert_eq!(base.get_decoded_value(ciphertext, None, None).unwrap(), "Secret");
            let call = manager.last_call().unwrap();
            assert_eq!(
                call.kwarg("CiphertextBlob").and_then(ParamValue::as_blob),
                Some(expected.as_slice()),
                "input {:?}",
                ciphertext
            );
        }
        assert_eq!(manager.call_count(), 3);
    }

    #[test]
    fn test_ciphertext_is_decoded_once_before_dispatch() {
        let blob: Vec<u8> = (0..=255u8).rev().collect();
        let encoded = STANDARD.encode(&blob);
        let manager = Arc::new(MockConnectionManager::plaintext("ok"));
        let (base, _) = base_with(manager.clone());

        base.get_decoded_value(&encoded, Some("test_profile"), Some("test_region"))
            .unwrap();

        let call = manager.last_call().unwrap();
        assert_eq!(call.service, "kms");
        assert_eq!(call.command, "decrypt");
        assert_eq!(call.kwargs.len(), 1);
        assert_eq!(call.kwarg("CiphertextBlob").and_then(ParamValue::as_blob), Some(blob.as_slice()));
        assert_eq!(call.profile.as_deref(), Some("test_profile"));
        assert_eq!(call.region.as_deref(), Some("test_region"));
    }

    #[test]
    fn test_non_utf8_plaintext() {
        let manager = Arc::new(MockConnectionManager::plaintext(vec![0xffu8, 0xfe, 0x00]));
        let (base, logger) = base_with(manager);

        let err = base.get_decoded_value(CIPHERTEXT, None, None).unwrap_err();

        assert!(matches!(err, ResolverError::InvalidUtf8(_)));
        assert!(logger.is_empty());
    }

    /// Records what `resolve` delegates, like patching the decode step
    struct RecordingBase {
        stack: Stack,
        logger: SharedLogger,
        calls: Mutex<Vec<(String, Option<String>, Option<String>)>>,
    }

    impl KmsBase for RecordingBase {
        fn stack(&self) -> &Stack {
            &self.stack
        }

        fn logger(&self) -> &SharedLogger {
            &self.logger
        }

        fn get_decoded_value(
            &self,
            param: &str,
            profile: Option<&str>,
            region: Option<&str>,
        ) -> ResolverResult<String> {
            self.calls.lock().unwrap().push((
                param.to_string(),
                profile.map(str::to_string),
                region.map(str::to_string),
            ));
            Ok("parameter_value".to_string())
        }
    }

    fn recording_base() -> RecordingBase {
        let stack = Stack::new("test_name", Arc::new(MockConnectionManager::echo()))
            .with_profile("test_profile")
            .with_region("test_region");
        RecordingBase {
            stack,
            logger: Arc::new(MemoryLogger::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_resolve_delegates_once_with_stack_profile_and_region() {
        let base = recording_base();

        let value = resolve_argument(&base, Some("/dev/DbPassword")).unwrap();

        assert_eq!(value, Some("parameter_value".to_string()));
        assert_eq!(
            *base.calls.lock().unwrap(),
            vec![(
                "/dev/DbPassword".to_string(),
                Some("test_profile".to_string()),
                Some("test_region".to_string()),
            )]
        );
    }

    #[test]
    fn test_resolve_without_argument_skips_delegation() {
        let base = recording_base();

        assert_eq!(resolve_argument(&base, None).unwrap(), None);
        assert_eq!(resolve_argument(&base, Some("")).unwrap(), None);
        assert!(base.calls.lock().unwrap().is_empty());
    }

    fn resolver_with(
        argument: Option<&str>,
        manager: Arc<MockConnectionManager>,
    ) -> (KmsResolver, Arc<MemoryLogger>) {
        let stack = Stack::new("test_name", manager)
            .with_profile("test_profile")
            .with_region("test_region");
        let logger = Arc::new(MemoryLogger::new());
        let resolver = KmsResolver::new(argument.map(str::to_string), Arc::new(stack))
            .with_logger(logger.clone());
        (resolver, logger)
    }

    #[test]
    fn test_resolve_with_empty_argument_makes_no_call() {
        let manager = Arc::new(MockConnectionManager::plaintext("Secret"));

        for argument in [None, Some("")] {
            let (resolver, logger) = resolver_with(argument, manager.clone());
            assert_eq!(resolver.resolve().unwrap(), None);
            assert!(logger.is_empty());
        }

        assert_eq!(manager.call_count(), 0);
    }

    #[test]
    fn test_resolve_end_to_end() {
        let manager = Arc::new(MockConnectionManager::plaintext("Secret"));
        let (resolver, logger) = resolver_with(Some(CIPHERTEXT), manager.clone());

        assert_eq!(resolver.name(), "kms");
        assert_eq!(resolver.argument(), Some(CIPHERTEXT));
        assert_eq!(resolver.resolve().unwrap(), Some("Secret".to_string()));

        assert_eq!(manager.call_count(), 1);
        let call = manager.last_call().unwrap();
        assert_eq!(call.profile.as_deref(), Some("test_profile"));
        assert_eq!(call.region.as_deref(), Some("test_region"));

        assert_eq!(
            logger.messages(LogLevel::Debug),
            vec![format!("Resolving KMS parameter: {}", CIPHERTEXT)]
        );
        assert!(!logger.contains("Secret"));
    }

    #[test]
    fn test_resolve_propagates_failure() {
        let manager = Arc::new(MockConnectionManager::failing(CallError::service(
            "ParameterNotFound",
            "Key 'alias/missing' does not exist",
        )));
        let (resolver, logger) = resolver_with(Some(CIPHERTEXT), manager);

        let err = resolver.resolve().unwrap_err();

        assert!(err.is_parameter_not_found());
        assert!(logger.contains("test_name - ParameterNotFound"));
    }

    #[test]
    fn test_debug_omits_connection() {
        let (resolver, _) = resolver_with(Some(CIPHERTEXT), Arc::new(MockConnectionManager::echo()));
        let debug = format!("{:?}", resolver);
        assert!(debug.contains("KmsResolver"));
        assert!(debug.contains("test_name"));
    }
}
