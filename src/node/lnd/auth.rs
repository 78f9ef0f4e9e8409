use std::fs;
use std::path::Path;

use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::Interceptor;
use tonic::transport::{Certificate, ClientTlsConfig};
use tonic::{Request, Status};

use crate::node::NodeError;

/// Attaches the hex-encoded admin macaroon to every call.
#[derive(Clone)]
pub struct MacaroonInterceptor {
    macaroon: MetadataValue<Ascii>,
}

impl MacaroonInterceptor {
    /// Build from the raw (binary) macaroon bytes.
    pub fn new(macaroon: &[u8]) -> Result<Self, NodeError> {
        let macaroon = hex::encode(macaroon)
            .parse::<MetadataValue<Ascii>>()
            .map_err(|e| NodeError::Credentials(format!("invalid macaroon metadata: {}", e)))?;
        Ok(MacaroonInterceptor { macaroon })
    }
}

impl Interceptor for MacaroonInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        request
            .metadata_mut()
            .insert("macaroon", self.macaroon.clone());
        Ok(request)
    }
}

impl std::fmt::Debug for MacaroonInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacaroonInterceptor").finish_non_exhaustive()
    }
}

/// Read the macaroon file. An empty file is rejected.
pub fn load_macaroon(path: impl AsRef<Path>) -> Result<MacaroonInterceptor, NodeError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| {
        NodeError::Credentials(format!("cannot read macaroon {}: {}", path.display(), e))
    })?;
    if bytes.is_empty() {
        return Err(NodeError::Credentials(format!(
            "macaroon {} is empty",
            path.display()
        )));
    }
    MacaroonInterceptor::new(&bytes)
}

/// Read the node's self-signed TLS certificate and trust it as the CA.
pub fn load_tls_config(path: impl AsRef<Path>, domain: &str) -> Result<ClientTlsConfig, NodeError> {
    let path = path.as_ref();
    let pem = fs::read(path).map_err(|e| {
        NodeError::Credentials(format!("cannot read tls cert {}: {}", path.display(), e))
    })?;
    if !pem.starts_with(b"-----BEGIN") {
        return Err(NodeError::Credentials(format!(
            "tls cert {} is not PEM encoded",
            path.display()
        )));
    }

    Ok(ClientTlsConfig::new()
        .ca_certificate(Certificate::from_pem(pem))
        .domain_name(domain.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_macaroon_is_hex_encoded() {
        let mut interceptor = MacaroonInterceptor::new(&[0x02, 0x01, 0xff]).unwrap();
        let request = interceptor.call(Request::new(())).unwrap();

        assert_eq!(
            request.metadata().get("macaroon").unwrap().to_str().unwrap(),
            "0201ff"
        );
    }

    #[test]
    fn test_load_macaroon_missing_file() {
        let result = load_macaroon("/nonexistent/admin.macaroon");
        assert!(matches!(result, Err(NodeError::Credentials(_))));
    }

    #[test]
    fn test_load_macaroon_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let err = load_macaroon(file.path()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_load_tls_rejects_non_pem() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"\x30\x82binary-der").unwrap();

        let err = load_tls_config(file.path(), "localhost").unwrap_err();
        assert!(err.to_string().contains("PEM"));
    }

    #[test]
    fn test_load_tls_accepts_pem() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----").unwrap();

        assert!(load_tls_config(file.path(), "localhost").is_ok());
    }
}
