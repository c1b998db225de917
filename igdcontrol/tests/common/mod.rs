//! Shared fixtures for the igdcontrol integration tests
#![allow(dead_code)]

use igdcontrol::{
    DiscoveryOptions, GatewaySettings, HttpTransport, NetworkEnvironment, ReqwestTransport,
    SoapInvoker, TransportOptions, UpnpDevice, UpnpDiscoverer, UpnpGateway, UpnpService,
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

pub const WAN_IP: &str = "urn:schemas-upnp-org:service:WANIPConnection:1";
pub const LAN_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);

/// Host without network interfaces, so discovery only sees injected responses
pub struct TestEnvironment {
    pub process_name: Option<String>,
}

impl NetworkEnvironment for TestEnvironment {
    fn local_ipv4_addresses(&self) -> Vec<Ipv4Addr> {
        Vec::new()
    }

    fn lan_ip(&self) -> Ipv4Addr {
        LAN_IP
    }

    fn process_name(&self) -> Option<String> {
        self.process_name.clone()
    }
}

pub fn transport() -> Arc<dyn HttpTransport> {
    let options = TransportOptions {
        timeout: Duration::from_secs(5),
        ..TransportOptions::default()
    };
    Arc::new(ReqwestTransport::new(&options).unwrap())
}

pub fn root_description(service_type: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:InternetGatewayDevice:1</deviceType>
    <friendlyName>Test Router</friendlyName>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:Layer3Forwarding:1</serviceType>
        <serviceId>urn:upnp-org:serviceId:L3Forwarding1</serviceId>
        <controlURL>/ctl/L3F</controlURL>
        <eventSubURL>/evt/L3F</eventSubURL>
        <SCPDURL>/L3F.xml</SCPDURL>
      </service>
    </serviceList>
    <deviceList>
      <device>
        <deviceType>urn:schemas-upnp-org:device:WANConnectionDevice:1</deviceType>
        <serviceList>
          <service>
            <serviceType>{service_type}</serviceType>
            <serviceId>urn:upnp-org:serviceId:WANIPConn1</serviceId>
            <controlURL>/ctl/IPConn</controlURL>
            <eventSubURL>/evt/IPConn</eventSubURL>
            <SCPDURL>/WANIPCn.xml</SCPDURL>
          </service>
        </serviceList>
      </device>
    </deviceList>
  </device>
</root>"#
    )
}

/// Description whose last service lacks `SCPDURL`
pub fn root_description_with_vendor_service(service_type: &str) -> String {
    let vendor = r#"</serviceList>
        <serviceList>
          <service>
            <serviceType>urn:vendor-com:service:Diag:1</serviceType>
            <serviceId>urn:vendor-com:serviceId:Diag1</serviceId>
            <controlURL>/ctl/Diag</controlURL>
          </service>
        </serviceList>
      </device>
    </deviceList>"#;
    root_description(service_type).replacen(
        "</serviceList>\n      </device>\n    </deviceList>",
        vendor,
        1,
    )
}

pub fn soap_response(action: &str, values: &[(&str, &str)]) -> String {
    let children: String = values
        .iter()
        .map(|(name, value)| format!("<{name}>{value}</{name}>"))
        .collect();
    format!(
        r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>
    <u:{action}Response xmlns:u="{WAN_IP}">{children}</u:{action}Response>
  </s:Body>
</s:Envelope>"#
    )
}

pub fn upnp_fault(code: i32, description: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>
    <s:Fault>
      <faultcode>s:Client</faultcode>
      <faultstring>UPnPError</faultstring>
      <detail>
        <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
          <errorCode>{code}</errorCode>
          <errorDescription>{description}</errorDescription>
        </UPnPError>
      </detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#
    )
}

pub fn generic_entry(index: usize) -> String {
    let port = (8000 + index).to_string();
    let description = format!("entry {index}");
    soap_response(
        "GetGenericPortMappingEntry",
        &[
            ("NewRemoteHost", ""),
            ("NewExternalPort", port.as_str()),
            ("NewProtocol", "TCP"),
            ("NewInternalPort", port.as_str()),
            ("NewInternalClient", "192.168.1.10"),
            ("NewEnabled", "1"),
            ("NewPortMappingDescription", description.as_str()),
            ("NewLeaseDuration", "0"),
        ],
    )
}

pub fn ssdp_response(server: &MockServer) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nCACHE-CONTROL: max-age=120\r\nST: urn:schemas-upnp-org:device:InternetGatewayDevice:1\r\nSERVER: Test/1.0 UPnP/1.0 testigd/1.0\r\nLOCATION: {}/rootDesc.xml\r\n\r\n",
        server.uri()
    )
}

pub fn device(server: &MockServer) -> Arc<UpnpDevice> {
    Arc::new(UpnpDevice::from_ssdp(&ssdp_response(server)))
}

/// WANIPConnection service attached to a device served by `server`
pub fn wan_service(server: &MockServer) -> UpnpService {
    UpnpService::new(
        Some("urn:upnp-org:serviceId:WANIPConn1".to_string()),
        Some(WAN_IP.to_string()),
        Some("/ctl/IPConn".to_string()),
        Some("/WANIPCn.xml".to_string()),
        Some(device(server)),
    )
    .unwrap()
}

pub fn invoker() -> SoapInvoker {
    SoapInvoker::new(transport())
}

/// Gateway whose discovery already knows the device served by `server`
pub fn gateway(server: &MockServer, process_name: Option<&str>) -> UpnpGateway {
    let environment: Arc<dyn NetworkEnvironment> = Arc::new(TestEnvironment {
        process_name: process_name.map(str::to_string),
    });
    let options = DiscoveryOptions {
        timeout: Duration::from_millis(300),
        idle_poll: Duration::from_millis(5),
    };
    let discoverer = UpnpDiscoverer::new(environment.clone(), options);
    discoverer
        .handle_response(ssdp_response(server).as_bytes())
        .unwrap();

    UpnpGateway::new(discoverer, invoker(), environment, GatewaySettings::default())
}
