use crate::audit::fetcher::{AuditSource, EventPage};
use crate::audit::range::Chunk;
use crate::config::OciConfig;
use crate::error::{Error, Result};
use crate::oci_api::models::{
    Compartment, Instance, InstanceAgentPlugin, NetworkSecurityGroup, Policy, RegionSubscription,
    UpdateVnicNsgs, Vnic, VnicAttachment,
};
use crate::oci_api::signer::{http_date, RequestSigner, JSON_CONTENT_TYPE};
use crate::oci_api::tree::CompartmentSource;
use crate::utils::time::to_query_timestamp;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, DATE};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

const IDENTITY_API: &str = "/20160918";
const CORE_API: &str = "/20160918";
const AUDIT_API: &str = "/20190901";
const AGENT_API: &str = "/20180530";
const NEXT_PAGE_HEADER: &str = "opc-next-page";
const REQUEST_ID_HEADER: &str = "opc-request-id";

/// OCI service families and their regional endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Identity,
    Audit,
    /// Compute, networking and the compute instance agent
    Core,
}

impl Service {
    pub fn endpoint(self, region: &str) -> String {
        match self {
            Self::Identity => format!("https://identity.{}.oci.oraclecloud.com", region),
            Self::Audit => format!("https://audit.{}.oraclecloud.com", region),
            Self::Core => format!("https://iaas.{}.oraclecloud.com", region),
        }
    }
}

/// A decoded response plus its continuation token.
#[derive(Debug)]
pub struct Page<T> {
    pub items: T,
    pub next_page: Option<String>,
}

/// Error body returned by every OCI service.
#[derive(Debug, Deserialize)]
struct ServiceError {
    code: Option<String>,
    message: Option<String>,
}

/// Signed client for one profile and region.
#[derive(Debug)]
pub struct OciClient {
    region: String,
    tenancy: String,
    signer: RequestSigner,
    client: Client,
}

impl OciClient {
    pub fn new(config: &OciConfig) -> Result<Self> {
        let signer = RequestSigner::from_config(config)?;
        let client = Client::builder()
            .user_agent(concat!("oci-ops-tools/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::AuthConfig(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            region: config.region.clone(),
            tenancy: config.tenancy.clone(),
            signer,
            client,
        })
    }

    /// Load `profile` from the config file and build a client for it.
    pub fn from_profile(config_file: Option<&str>, profile: &str) -> Result<(OciConfig, Self)> {
        let config = OciConfig::load(config_file, profile)?;
        let client = Self::new(&config)?;
        Ok((config, client))
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Tenancy OCID, the root of the compartment tree.
    pub fn tenancy(&self) -> &str {
        &self.tenancy
    }

    fn url(&self, service: Service, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let base = format!("{}{}", service.endpoint(&self.region), path);
        let url = if query.is_empty() {
            Url::parse(&base)
        } else {
            Url::parse_with_params(&base, query)
        };
        url.map_err(|e| Error::provider(format!("invalid request URL {}: {}", base, e)))
    }

    async fn send(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Result<Page<String>> {
        let signed = self
            .signer
            .sign(&method, &url, &http_date(), body.as_deref());

        let mut headers = HeaderMap::new();
        headers.insert(DATE, header_value(&signed.date)?);
        headers.insert(AUTHORIZATION, header_value(&signed.authorization)?);
        if let Some(sha) = &signed.content_sha256 {
            headers.insert("x-content-sha256", header_value(sha)?);
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }

        let mut request = self.client.request(method, url.clone()).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::provider(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        let next_page = response
            .headers()
            .get(NEXT_PAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| Error::provider(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            let parsed: Option<ServiceError> = serde_json::from_str(&body).ok();
            let code = parsed.as_ref().and_then(|e| e.code.clone());
            let mut message = parsed
                .and_then(|e| e.message)
                .unwrap_or_else(|| body.trim().to_string());
            if let Some(id) = request_id {
                message = format!("{} (opc-request-id: {})", message, id);
            }
            return Err(Error::ProviderQuery {
                status: Some(status.as_u16()),
                code,
                message,
            });
        }

        Ok(Page {
            items: body,
            next_page,
        })
    }

    /// GET one page and decode it.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Page<T>> {
        let url = self.url(service, path, query)?;
        let page = self.send(Method::GET, url, None).await?;
        let items = serde_json::from_str(&page.items).map_err(|e| {
            Error::provider(format!("failed to parse JSON response from {}: {}", path, e))
        })?;
        Ok(Page {
            items,
            next_page: page.next_page,
        })
    }

    /// GET a single resource.
    pub async fn get<T: DeserializeOwned>(&self, service: Service, path: &str) -> Result<T> {
        Ok(self.get_page(service, path, &[]).await?.items)
    }

    /// GET every page of a list endpoint.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut params = query.to_vec();
            if let Some(token) = token.as_deref() {
                params.push(("page", token));
            }
            let page: Page<Vec<T>> = self.get_page(service, path, &params).await?;
            items.extend(page.items);

            match page.next_page {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => return Ok(items),
            }
        }
    }

    /// Send a JSON body; an empty response body decodes as `Null`.
    async fn send_json(
        &self,
        method: Method,
        service: Service,
        path: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value> {
        let url = self.url(service, path, query)?;
        let payload = serde_json::to_vec(body)
            .map_err(|e| Error::provider(format!("failed to encode request body: {}", e)))?;
        let page = self.send(method, url, Some(payload)).await?;
        if page.items.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&page.items).map_err(|e| {
            Error::provider(format!("failed to parse JSON response from {}: {}", path, e))
        })
    }

    // Identity

    pub async fn get_compartment(&self, compartment_id: &str) -> Result<Compartment> {
        let path = format!("{}/compartments/{}", IDENTITY_API, compartment_id);
        self.get(Service::Identity, &path).await
    }

    /// Direct children of `parent_id`, any lifecycle state.
    pub async fn list_compartments(&self, parent_id: &str) -> Result<Vec<Compartment>> {
        let path = format!("{}/compartments", IDENTITY_API);
        self.list_all(
            Service::Identity,
            &path,
            &[
                ("compartmentId", parent_id),
                ("compartmentIdInSubtree", "false"),
                ("accessLevel", "ANY"),
            ],
        )
        .await
    }

    pub async fn list_policies(&self, compartment_id: &str) -> Result<Vec<Policy>> {
        let path = format!("{}/policies", IDENTITY_API);
        self.list_all(Service::Identity, &path, &[("compartmentId", compartment_id)])
            .await
    }

    pub async fn list_region_subscriptions(&self) -> Result<Vec<RegionSubscription>> {
        let path = format!("{}/tenancies/{}/regionSubscriptions", IDENTITY_API, self.tenancy);
        self.get(Service::Identity, &path).await
    }

    // Compute

    pub async fn list_instances(&self, compartment_id: &str) -> Result<Vec<Instance>> {
        let path = format!("{}/instances", CORE_API);
        self.list_all(Service::Core, &path, &[("compartmentId", compartment_id)])
            .await
    }

    pub async fn get_instance(&self, instance_id: &str) -> Result<Instance> {
        let path = format!("{}/instances/{}", CORE_API, instance_id);
        self.get(Service::Core, &path).await
    }

    /// `action` is one of the InstanceAction values, e.g. `START` or `STOP`.
    pub async fn instance_action(&self, instance_id: &str, action: &str) -> Result<Instance> {
        let path = format!("{}/instances/{}", CORE_API, instance_id);
        let empty = Value::Object(Default::default());
        let value = self
            .send_json(Method::POST, Service::Core, &path, &[("action", action)], &empty)
            .await?;
        serde_json::from_value(value)
            .map_err(|e| Error::provider(format!("unexpected instance action response: {}", e)))
    }

    pub async fn list_vnic_attachments(
        &self,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VnicAttachment>> {
        let path = format!("{}/vnicAttachments", CORE_API);
        self.list_all(
            Service::Core,
            &path,
            &[("compartmentId", compartment_id), ("instanceId", instance_id)],
        )
        .await
    }

    pub async fn get_vnic(&self, vnic_id: &str) -> Result<Vnic> {
        let path = format!("{}/vnics/{}", CORE_API, vnic_id);
        self.get(Service::Core, &path).await
    }

    pub async fn update_vnic_nsgs(&self, vnic_id: &str, nsg_ids: &[String]) -> Result<Vnic> {
        let path = format!("{}/vnics/{}", CORE_API, vnic_id);
        let body = serde_json::to_value(UpdateVnicNsgs { nsg_ids })
            .map_err(|e| Error::provider(format!("failed to encode VNIC update: {}", e)))?;
        let value = self.send_json(Method::PUT, Service::Core, &path, &[], &body).await?;
        serde_json::from_value(value)
            .map_err(|e| Error::provider(format!("unexpected VNIC update response: {}", e)))
    }

    pub async fn list_network_security_groups(
        &self,
        compartment_id: &str,
    ) -> Result<Vec<NetworkSecurityGroup>> {
        let path = format!("{}/networkSecurityGroups", CORE_API);
        self.list_all(Service::Core, &path, &[("compartmentId", compartment_id)])
            .await
    }

    pub async fn list_instance_agent_plugins(
        &self,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<InstanceAgentPlugin>> {
        let path = format!("{}/instanceagents/{}/plugins", AGENT_API, instance_id);
        self.list_all(Service::Core, &path, &[("compartmentId", compartment_id)])
            .await
    }
}

impl AuditSource for OciClient {
    async fn list_events(
        &self,
        compartment_id: &str,
        chunk: &Chunk,
        page: Option<&str>,
    ) -> Result<EventPage> {
        let path = format!("{}/auditEvents", AUDIT_API);
        let start = to_query_timestamp(&chunk.start);
        let end = to_query_timestamp(&chunk.end);
        let mut query = vec![
            ("compartmentId", compartment_id),
            ("startTime", start.as_str()),
            ("endTime", end.as_str()),
        ];
        if let Some(page) = page {
            query.push(("page", page));
        }

        let page: Page<Vec<Value>> = self.get_page(Service::Audit, &path, &query).await?;
        Ok(EventPage {
            events: page.items,
            next_page: page.next_page,
        })
    }
}

impl CompartmentSource for OciClient {
    async fn get_compartment(&self, compartment_id: &str) -> Result<Compartment> {
        OciClient::get_compartment(self, compartment_id).await
    }

    async fn list_child_compartments(&self, parent_id: &str) -> Result<Vec<Compartment>> {
        self.list_compartments(parent_id).await
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::AuthConfig(format!("invalid header value: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_endpoints() {
        assert_eq!(
            Service::Identity.endpoint("eu-frankfurt-1"),
            "https://identity.eu-frankfurt-1.oci.oraclecloud.com"
        );
        assert_eq!(
            Service::Audit.endpoint("us-ashburn-1"),
            "https://audit.us-ashburn-1.oraclecloud.com"
        );
        assert_eq!(
            Service::Core.endpoint("ap-tokyo-1"),
            "https://iaas.ap-tokyo-1.oraclecloud.com"
        );
    }

    #[test]
    fn test_client_requires_readable_key() {
        let config = OciConfig {
            profile: "DEFAULT".to_string(),
            user: "ocid1.user.oc1..u".to_string(),
            fingerprint: "aa:bb".to_string(),
            tenancy: "ocid1.tenancy.oc1..t".to_string(),
            region: "eu-frankfurt-1".to_string(),
            key_file: "/nonexistent/key.pem".into(),
            pass_phrase: None,
        };
        let err = OciClient::new(&config).unwrap_err();
        assert!(matches!(err, Error::AuthConfig(_)));
    }
}
