use igdupnp::{DescriptionError, SoapBuildError, SoapParseError, UpnpError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IgdError {
    /// Faute UPnP renvoyée par le device (713 et 714 sont des signaux de
    /// contrôle pour la passerelle, pas des échecs)
    #[error(transparent)]
    Upnp(#[from] UpnpError),
    #[error("HTTP transport error: {0}")]
    Transport(String),
    #[error("Unexpected SOAP response: {0}")]
    Soap(SoapParseError),
    #[error("Invalid device description: {0}")]
    Description(#[from] DescriptionError),
    #[error("Service {0} is not attached to a device and cannot be invoked")]
    DetachedService(String),
    #[error("Service description is missing {0}")]
    InvalidService(&'static str),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Cannot build SOAP request: {0}")]
    SoapBuild(#[from] SoapBuildError),
}

impl IgdError {
    pub fn transport(message: impl Into<String>) -> Self {
        IgdError::Transport(message.into())
    }

    pub fn invalid_url(message: impl Into<String>) -> Self {
        IgdError::InvalidUrl(message.into())
    }

    /// Code UPnP si l'erreur est une faute renvoyée par le device.
    pub fn upnp_code(&self) -> Option<i32> {
        match self {
            IgdError::Upnp(error) => Some(error.code),
            _ => None,
        }
    }

    pub fn is_upnp_code(&self, code: i32) -> bool {
        self.upnp_code() == Some(code)
    }
}

impl From<SoapParseError> for IgdError {
    fn from(error: SoapParseError) -> Self {
        match error {
            SoapParseError::Fault(fault) => IgdError::Upnp(fault),
            other => IgdError::Soap(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_becomes_upnp_error() {
        let error: IgdError = SoapParseError::Fault(UpnpError::new(714, "NoSuchEntryInArray")).into();
        assert_eq!(error.upnp_code(), Some(714));
        assert!(error.is_upnp_code(714));
        assert!(!error.is_upnp_code(713));
    }

    #[test]
    fn shape_error_has_no_upnp_code() {
        let error: IgdError = SoapParseError::MissingResponse("urn:x:1".to_string()).into();
        assert!(matches!(error, IgdError::Soap(_)));
        assert_eq!(error.upnp_code(), None);
    }
}
