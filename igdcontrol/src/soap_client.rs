use crate::errors::IgdError;
use crate::result::InvocationResult;
use crate::service::UpnpService;
use crate::transport::{HttpRequest, HttpTransport};
use igdupnp::soap::{decode_soap_response, encode_soap_envelope};
use std::sync::Arc;
use tracing::debug;

/// Invocation des actions SOAP sur l'URL de contrôle d'un service.
#[derive(Clone)]
pub struct SoapInvoker {
    transport: Arc<dyn HttpTransport>,
}

impl SoapInvoker {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// Invoke a UPnP SOAP action on a service.
    ///
    /// - `service`: must be attached to its device, a detached service fails
    ///   before any network call
    /// - `action`: action name, e.g. "GetExternalIPAddress"
    /// - `args`: list of (name, value) pairs, sent in order
    ///
    /// A UPnP fault in the response is returned as [`IgdError::Upnp`].
    pub async fn invoke(
        &self,
        service: &UpnpService,
        action: &str,
        args: &[(&str, String)],
    ) -> Result<InvocationResult, IgdError> {
        if service.device().is_none() {
            return Err(IgdError::DetachedService(service.service_type().to_string()));
        }

        let control_url = service.control_endpoint()?;
        let body = encode_soap_envelope(service.service_type(), action, args)?;

        // SOAPAction header: "urn:service#Action"
        let soap_action_header = format!(r#""{}#{}""#, service.service_type(), action);

        let request = HttpRequest::post(control_url.clone(), body)
            .header("Content-Type", r#"text/xml; charset="utf-8""#)
            .header("SOAPAction", soap_action_header);

        debug!("📨 SOAP {} -> {}", action, control_url);
        let response = self.transport.send(request).await?;

        let data = decode_soap_response(&response.body, service.service_type()).map_err(|e| {
            let error = IgdError::from(e);
            debug!(
                "❌ SOAP {} failed (HTTP status {}): {}",
                action, response.status, error
            );
            error
        })?;

        Ok(InvocationResult::new(service.clone(), action, data))
    }
}
