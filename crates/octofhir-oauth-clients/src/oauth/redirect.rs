//! Callback (redirect URI) resolution for authorization requests.
//!
//! Decides whether the authorization result may be delivered to the callback
//! a request names, or to the client's default callback when it names none.
//! This check runs before the client has proven its identity, so the only
//! trustworthy input is the registered record.
//!
//! Resolution order:
//!
//! 1. No callback requested: use the default callback, or reject.
//! 2. Callback is not an absolute URI: reject.
//! 3. Callback is registered: accept it as-is.
//! 4. Otherwise reject. The default is never substituted for a bad callback.
//!
//! Expected rejections are returned as `Ok` outcomes. `Err` is reserved for
//! records that should never have reached the validator.

use crate::AuthResult;
use crate::config::CallbackPolicyConfig;
use crate::error::AuthError;
use crate::types::{AbsoluteUri, CallbackMatching, ClientRecord, UriError};

// =============================================================================
// Resolution Types
// =============================================================================

/// Outcome of resolving a requested callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackOutcome {
    /// No callback requested; the default callback is used.
    AcceptedDefault,
    /// The requested callback is registered and is used.
    AcceptedExplicit,
    /// No callback requested and the client has no default.
    RejectedNoCallback,
    /// The requested callback is not an absolute URI.
    RejectedInvalidUri,
    /// The requested callback is absolute but not registered.
    RejectedNotRegistered,
}

impl CallbackOutcome {
    /// Returns `true` for the two accepting outcomes.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::AcceptedDefault | Self::AcceptedExplicit)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AcceptedDefault => "accepted_default",
            Self::AcceptedExplicit => "accepted_explicit",
            Self::RejectedNoCallback => "rejected_no_callback",
            Self::RejectedInvalidUri => "rejected_invalid_uri",
            Self::RejectedNotRegistered => "rejected_not_registered",
        }
    }
}

impl std::fmt::Display for CallbackOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`resolve_callback`].
///
/// The effective callback is present exactly when the outcome is an
/// acceptance. A rejected URI is never stored here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackResolution {
    outcome: CallbackOutcome,
    effective_callback: Option<AbsoluteUri>,
    invalid_reason: Option<UriError>,
}

impl CallbackResolution {
    fn accepted(outcome: CallbackOutcome, callback: AbsoluteUri) -> Self {
        Self {
            outcome,
            effective_callback: Some(callback),
            invalid_reason: None,
        }
    }

    fn rejected(outcome: CallbackOutcome) -> Self {
        Self {
            outcome,
            effective_callback: None,
            invalid_reason: None,
        }
    }

    fn invalid(reason: UriError) -> Self {
        Self {
            outcome: CallbackOutcome::RejectedInvalidUri,
            effective_callback: None,
            invalid_reason: Some(reason),
        }
    }

    #[must_use]
    pub fn outcome(&self) -> CallbackOutcome {
        self.outcome
    }

    /// The callback to deliver the authorization result to, if accepted.
    #[must_use]
    pub fn effective_callback(&self) -> Option<&AbsoluteUri> {
        self.effective_callback.as_ref()
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.outcome.is_accepted()
    }

    /// Why the requested callback failed to parse, for `RejectedInvalidUri`.
    #[must_use]
    pub fn invalid_reason(&self) -> Option<&UriError> {
        self.invalid_reason.as_ref()
    }

    /// Converts the resolution into the effective callback or an error.
    ///
    /// # Errors
    ///
    /// - `NoCallbackAvailable` for `RejectedNoCallback`
    /// - `InvalidCallbackUri` for `RejectedInvalidUri`
    /// - `CallbackNotRegistered` for `RejectedNotRegistered`
    pub fn into_result(self) -> AuthResult<AbsoluteUri> {
        match (self.outcome, self.effective_callback) {
            (CallbackOutcome::AcceptedDefault | CallbackOutcome::AcceptedExplicit, Some(cb)) => {
                Ok(cb)
            }
            (CallbackOutcome::RejectedNoCallback, _) => Err(AuthError::NoCallbackAvailable),
            (CallbackOutcome::RejectedInvalidUri, _) => Err(AuthError::invalid_callback_uri(
                self.invalid_reason
                    .map_or_else(|| "malformed URI".to_string(), |r| r.to_string()),
            )),
            (CallbackOutcome::RejectedNotRegistered, _) => Err(AuthError::CallbackNotRegistered),
            (outcome, None) => Err(AuthError::integrity(format!(
                "accepted outcome {outcome} without a callback"
            ))),
        }
    }

    /// Decides where a rejection may be reported.
    ///
    /// Only a well-formed but unregistered callback may be answered at the
    /// client's default callback, and only when `redirect_errors_to_default`
    /// is enabled. The requested callback is never used for error delivery.
    #[must_use]
    pub fn error_delivery(
        &self,
        record: &ClientRecord,
        redirect_errors_to_default: bool,
    ) -> ErrorDelivery {
        match (self.outcome, &record.default_callback) {
            (CallbackOutcome::RejectedNotRegistered, Some(default))
                if redirect_errors_to_default =>
            {
                ErrorDelivery::RedirectToDefault(default.clone())
            }
            _ => ErrorDelivery::InBand,
        }
    }
}

/// Where an authorization error is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDelivery {
    /// Render the error to the user agent; do not redirect.
    InBand,
    /// Redirect the error to the client's registered default callback.
    RedirectToDefault(AbsoluteUri),
}

// =============================================================================
// Redirect Validator
// =============================================================================

/// Callback resolver with a configurable matching policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedirectValidator {
    matching: CallbackMatching,
    redirect_errors_to_default: bool,
}

impl RedirectValidator {
    /// Creates a validator with exact matching and in-band error delivery.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator from the callback policy configuration.
    #[must_use]
    pub fn from_config(config: &CallbackPolicyConfig) -> Self {
        Self {
            matching: config.matching,
            redirect_errors_to_default: config.redirect_errors_to_default,
        }
    }

    /// Sets the matching mode.
    #[must_use]
    pub fn with_matching(mut self, matching: CallbackMatching) -> Self {
        self.matching = matching;
        self
    }

    /// Allows unregistered-callback errors to be sent to the default callback.
    #[must_use]
    pub fn with_redirect_errors_to_default(mut self, enabled: bool) -> Self {
        self.redirect_errors_to_default = enabled;
        self
    }

    #[must_use]
    pub fn matching(&self) -> CallbackMatching {
        self.matching
    }

    #[must_use]
    pub fn redirects_errors_to_default(&self) -> bool {
        self.redirect_errors_to_default
    }

    /// Resolves the callback for an authorization request.
    ///
    /// # Errors
    ///
    /// Returns `Integrity` if the record has no allowed callbacks. Every
    /// request-level rejection is an `Ok` outcome.
    pub fn resolve(
        &self,
        record: &ClientRecord,
        requested: Option<&str>,
    ) -> AuthResult<CallbackResolution> {
        if record.allowed_callbacks.is_empty() {
            tracing::warn!(
                client_id = %record.client_id,
                "Client record has no allowed callbacks"
            );
            return Err(AuthError::integrity(
                "client record has an empty allowed callback set",
            ));
        }

        let Some(requested) = requested else {
            return Ok(match &record.default_callback {
                Some(default) => {
                    tracing::debug!(client_id = %record.client_id, "Using default callback");
                    CallbackResolution::accepted(CallbackOutcome::AcceptedDefault, default.clone())
                }
                None => {
                    tracing::debug!(
                        client_id = %record.client_id,
                        "No callback requested and no default registered"
                    );
                    CallbackResolution::rejected(CallbackOutcome::RejectedNoCallback)
                }
            });
        };

        let uri = match AbsoluteUri::parse(requested) {
            Ok(uri) => uri,
            Err(reason) => {
                tracing::debug!(
                    client_id = %record.client_id,
                    reason = %reason,
                    "Requested callback is not an absolute URI"
                );
                return Ok(CallbackResolution::invalid(reason));
            }
        };

        if record.is_callback_allowed_with(&uri, self.matching) {
            tracing::debug!(client_id = %record.client_id, "Requested callback accepted");
            Ok(CallbackResolution::accepted(
                CallbackOutcome::AcceptedExplicit,
                uri,
            ))
        } else {
            tracing::warn!(
                client_id = %record.client_id,
                matching = %self.matching,
                "Requested callback is not registered"
            );
            tracing::debug!(client_id = %record.client_id, requested = %uri, "Rejected callback");
            Ok(CallbackResolution::rejected(
                CallbackOutcome::RejectedNotRegistered,
            ))
        }
    }

    /// Decides where a rejection may be reported under this validator's policy.
    #[must_use]
    pub fn error_delivery(
        &self,
        record: &ClientRecord,
        resolution: &CallbackResolution,
    ) -> ErrorDelivery {
        resolution.error_delivery(record, self.redirect_errors_to_default)
    }
}

/// Resolves a callback with exact matching.
///
/// # Errors
///
/// See [`RedirectValidator::resolve`].
pub fn resolve_callback(
    record: &ClientRecord,
    requested: Option<&str>,
) -> AuthResult<CallbackResolution> {
    RedirectValidator::new().resolve(record, requested)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_c1() -> ClientRecord {
        ClientRecord::builder("c1")
            .secret("s3cr3t")
            .default_callback("https://a.example/cb")
            .allow_callback("https://a.example/cb")
            .build()
            .unwrap()
    }

    fn make_c2() -> ClientRecord {
        ClientRecord::builder("c2")
            .secret("s3cr3t")
            .allow_callback("https://b.example/x")
            .build()
            .unwrap()
    }

    fn uri(s: &str) -> AbsoluteUri {
        AbsoluteUri::parse(s).unwrap()
    }

    #[test]
    fn test_absent_uses_default() {
        let resolution = resolve_callback(&make_c1(), None).unwrap();
        assert_eq!(resolution.outcome(), CallbackOutcome::AcceptedDefault);
        assert_eq!(
            resolution.effective_callback(),
            Some(&uri("https://a.example/cb"))
        );
    }

    #[test]
    fn test_absent_without_default() {
        let resolution = resolve_callback(&make_c2(), None).unwrap();
        assert_eq!(resolution.outcome(), CallbackOutcome::RejectedNoCallback);
        assert!(resolution.effective_callback().is_none());
    }

    #[test]
    fn test_explicit_registered() {
        let resolution = resolve_callback(&make_c2(), Some("https://b.example/x")).unwrap();
        assert_eq!(resolution.outcome(), CallbackOutcome::AcceptedExplicit);
        assert_eq!(
            resolution.effective_callback(),
            Some(&uri("https://b.example/x"))
        );
    }

    #[test]
    fn test_explicit_normalized_equivalent_is_accepted() {
        let resolution = resolve_callback(&make_c2(), Some("HTTPS://B.EXAMPLE:443/x")).unwrap();
        assert_eq!(resolution.outcome(), CallbackOutcome::AcceptedExplicit);
    }

    #[test]
    fn test_unregistered_never_falls_back_to_default() {
        let resolution = resolve_callback(&make_c1(), Some("https://evil.example/cb")).unwrap();
        assert_eq!(resolution.outcome(), CallbackOutcome::RejectedNotRegistered);
        assert!(resolution.effective_callback().is_none());
    }

    #[test]
    fn test_relative_is_invalid() {
        let resolution = resolve_callback(&make_c1(), Some("/cb")).unwrap();
        assert_eq!(resolution.outcome(), CallbackOutcome::RejectedInvalidUri);
        assert_eq!(resolution.invalid_reason(), Some(&UriError::Relative));
        assert!(resolution.effective_callback().is_none());
    }

    #[test]
    fn test_empty_string_is_present_and_invalid() {
        for requested in ["", "   "] {
            let resolution = resolve_callback(&make_c1(), Some(requested)).unwrap();
            assert_eq!(resolution.outcome(), CallbackOutcome::RejectedInvalidUri);
        }
    }

    #[test]
    fn test_query_and_fragment_are_significant() {
        let record = make_c1();
        for requested in [
            "https://a.example/cb?next=https://evil.example",
            "https://a.example/cb#x",
            "https://a.example/cb/",
            "https://a.example:444/cb",
            "http://a.example/cb",
        ] {
            let resolution = resolve_callback(&record, Some(requested)).unwrap();
            assert_eq!(
                resolution.outcome(),
                CallbackOutcome::RejectedNotRegistered,
                "{requested}"
            );
        }
    }

    #[test]
    fn test_default_not_requestable_unless_listed() {
        let record = ClientRecord::builder("c3")
            .default_callback("https://a.example/default")
            .allow_callback("https://a.example/cb")
            .build()
            .unwrap();
        let resolution = resolve_callback(&record, Some("https://a.example/default")).unwrap();
        assert_eq!(resolution.outcome(), CallbackOutcome::RejectedNotRegistered);
    }

    #[test]
    fn test_empty_allowed_set_is_integrity_error() {
        let mut record = make_c1();
        record.allowed_callbacks.clear();

        let err = resolve_callback(&record, None).unwrap_err();
        assert!(matches!(err, AuthError::Integrity { .. }));
    }

    #[test]
    fn test_loopback_any_port_mode() {
        let record = ClientRecord::builder("native")
            .allow_callback("http://127.0.0.1/callback")
            .build()
            .unwrap();
        let requested = Some("http://127.0.0.1:53127/callback");

        let exact = resolve_callback(&record, requested).unwrap();
        assert_eq!(exact.outcome(), CallbackOutcome::RejectedNotRegistered);

        let validator = RedirectValidator::new().with_matching(CallbackMatching::LoopbackAnyPort);
        let loose = validator.resolve(&record, requested).unwrap();
        assert_eq!(loose.outcome(), CallbackOutcome::AcceptedExplicit);
        // The requested port is preserved in the effective callback.
        assert_eq!(
            loose.effective_callback().unwrap().as_str(),
            "http://127.0.0.1:53127/callback"
        );
    }

    #[test]
    fn test_into_result() {
        let record = make_c1();
        let cb = resolve_callback(&record, None)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(cb, uri("https://a.example/cb"));

        let err = resolve_callback(&record, Some("cb"))
            .unwrap()
            .into_result()
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCallbackUri { .. }));

        let err = resolve_callback(&record, Some("https://evil.example/"))
            .unwrap()
            .into_result()
            .unwrap_err();
        assert!(matches!(err, AuthError::CallbackNotRegistered));

        let err = resolve_callback(&make_c2(), None)
            .unwrap()
            .into_result()
            .unwrap_err();
        assert!(matches!(err, AuthError::NoCallbackAvailable));
    }

    #[test]
    fn test_error_delivery() {
        let record = make_c1();
        let validator = RedirectValidator::new().with_redirect_errors_to_default(true);

        let not_registered = validator
            .resolve(&record, Some("https://evil.example/cb"))
            .unwrap();
        assert_eq!(
            validator.error_delivery(&record, &not_registered),
            ErrorDelivery::RedirectToDefault(uri("https://a.example/cb"))
        );

        // Disabled by default.
        assert_eq!(
            RedirectValidator::new().error_delivery(&record, &not_registered),
            ErrorDelivery::InBand
        );

        let invalid = validator.resolve(&record, Some("/cb")).unwrap();
        assert_eq!(
            validator.error_delivery(&record, &invalid),
            ErrorDelivery::InBand
        );

        let c2 = make_c2();
        let no_default = validator
            .resolve(&c2, Some("https://evil.example/"))
            .unwrap();
        assert_eq!(
            validator.error_delivery(&c2, &no_default),
            ErrorDelivery::InBand
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let record = make_c1();
        for requested in [
            None,
            Some("https://a.example/cb"),
            Some("https://x.example/"),
        ] {
            assert_eq!(
                resolve_callback(&record, requested).unwrap(),
                resolve_callback(&record, requested).unwrap()
            );
        }
    }
}
