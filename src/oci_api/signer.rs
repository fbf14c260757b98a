//! OCI HTTP request signing (signature version 1, `rsa-sha256`).
//!
//! Every request signs `date`, `(request-target)` and `host`. Requests with
//! a body (POST/PUT) additionally sign `content-length`, `content-type` and
//! `x-content-sha256`, where the latter is the base64 SHA-256 of the body.

use crate::config::OciConfig;
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Method, Url};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use std::fmt;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Headers to attach to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub date: String,
    pub authorization: String,
    /// Present only for requests with a body
    pub content_sha256: Option<String>,
}

pub struct RequestSigner {
    key_id: String,
    key: SigningKey<Sha256>,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Build a signer from the profile's key file.
    ///
    /// Passphrase-protected keys are not supported, whether announced by a
    /// `pass_phrase` entry or by an encrypted PEM.
    pub fn from_config(config: &OciConfig) -> Result<Self> {
        if config.pass_phrase.is_some() {
            return Err(Error::AuthConfig(format!(
                "profile [{}] sets pass_phrase, but passphrase-protected API keys are not supported; \
                 decrypt {} and remove pass_phrase",
                config.profile,
                config.key_file.display()
            )));
        }
        let pem = config.read_private_key()?;
        if pem.contains("ENCRYPTED") {
            return Err(Error::AuthConfig(format!(
                "API key {} is passphrase-protected; decrypt it first (openssl rsa -in <key> -out <key>.plain)",
                config.key_file.display()
            )));
        }
        Self::from_pem(config.key_id(), &pem)
    }

    /// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) and PKCS#1 (`BEGIN RSA PRIVATE KEY`) PEM.
    pub fn from_pem(key_id: String, pem: &str) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| Error::AuthConfig(format!("cannot parse RSA private key: {}", e)))?;
        Ok(Self {
            key_id,
            key: SigningKey::<Sha256>::new(key),
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn sign(&self, method: &Method, url: &Url, date: &str, body: Option<&[u8]>) -> SignedHeaders {
        let content_sha256 = body.map(body_sha256);
        let body_meta = body
            .zip(content_sha256.as_deref())
            .map(|(b, sha)| (b.len(), sha));
        let (headers, signing_string) = signing_string(method, url, date, body_meta);
        let signature = self.key.sign(signing_string.as_bytes());
        let authorization = format!(
            "Signature version=\"1\",keyId=\"{}\",algorithm=\"rsa-sha256\",headers=\"{}\",signature=\"{}\"",
            self.key_id,
            headers,
            BASE64.encode(signature.to_bytes())
        );

        SignedHeaders {
            date: date.to_string(),
            authorization,
            content_sha256,
        }
    }
}

/// Base64 SHA-256 of a request body, for `x-content-sha256`.
pub fn body_sha256(body: &[u8]) -> String {
    BASE64.encode(Sha256::digest(body))
}

/// The signed header list and the string to sign.
///
/// `body` is `(content length, base64 sha256)` for requests that carry one.
pub fn signing_string(
    method: &Method,
    url: &Url,
    date: &str,
    body: Option<(usize, &str)>,
) -> (String, String) {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    let host = match url.port() {
        Some(port) => format!("{}:{}", url.host_str().unwrap_or_default(), port),
        None => url.host_str().unwrap_or_default().to_string(),
    };

    let mut headers = vec!["date", "(request-target)", "host"];
    let mut lines = vec![
        format!("date: {}", date),
        format!(
            "(request-target): {} {}",
            method.as_str().to_lowercase(),
            target
        ),
        format!("host: {}", host),
    ];

    if let Some((length, sha256)) = body {
        headers.extend(["content-length", "content-type", "x-content-sha256"]);
        lines.push(format!("content-length: {}", length));
        lines.push(format!("content-type: {}", JSON_CONTENT_TYPE));
        lines.push(format!("x-content-sha256: {}", sha256));
    }

    (headers.join(" "), lines.join("\n"))
}

/// RFC 7231 `Date` header value for now.
pub fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}
