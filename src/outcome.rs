use crate::errors::TransportError;

/// Tri-state outcome of a single chain stage.
///
/// Every HTTP-backed stage distinguishes three mutually exclusive results:
/// the service answered with a usable value, the service explicitly rejected
/// the request with a stage-specific payload, or the call itself failed
/// (network, timeout, malformed body). A structured rejection often carries a
/// human-remediable cause and must never be conflated with a transport
/// failure, which is generically retryable.
///
/// Exactly one alternative is populated and the value is never reassigned;
/// the accessors for the other alternatives return `None`.
#[derive(Debug)]
pub enum StageOutcome<T, E> {
    /// The stage succeeded and produced its value.
    Value(T),
    /// The service explicitly rejected the request.
    DomainError(E),
    /// The call never produced an interpretable response.
    TransportFailure(TransportError),
}

impl<T, E> StageOutcome<T, E> {
    pub fn has_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    pub fn has_domain_error(&self) -> bool {
        matches!(self, Self::DomainError(_))
    }

    pub fn has_transport_failure(&self) -> bool {
        matches!(self, Self::TransportFailure(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn domain_error(&self) -> Option<&E> {
        match self {
            Self::DomainError(error) => Some(error),
            _ => None,
        }
    }

    pub fn transport_failure(&self) -> Option<&TransportError> {
        match self {
            Self::TransportFailure(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_domain_error(self) -> Option<E> {
        match self {
            Self::DomainError(error) => Some(error),
            _ => None,
        }
    }

    pub fn into_transport_failure(self) -> Option<TransportError> {
        match self {
            Self::TransportFailure(failure) => Some(failure),
            _ => None,
        }
    }
}
