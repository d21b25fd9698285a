//! etcd v3 JSON gateway client.
//!
//! # Responsibilities
//! - Encode key and value as base64 the way the gateway expects
//! - `POST {endpoint}/v3/kv/put` with a per-attempt deadline
//! - Try each endpoint in order until one accepts the put
//!
//! reqwest fixes the connect timeout per client, so one client is kept per
//! dial timeout seen in `PutOptions`. A reloaded `dial_timeout_secs` takes
//! effect on the next put.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use dashmap::DashMap;
use serde::Serialize;
use tokio::time::timeout;

use crate::kv::{KvError, KvResult, KvStore, PutOptions};

#[derive(Debug, Serialize)]
struct PutRequest {
    key: String,
    value: String,
}

/// Client for etcd's gRPC-gateway HTTP API.
#[derive(Default)]
pub struct EtcdGateway {
    clients: DashMap<Duration, reqwest::Client>,
}

fn build_client(dial_timeout: Duration) -> KvResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(dial_timeout)
        .build()
        .map_err(|e| KvError::Client(e.to_string()))
}

impl EtcdGateway {
    /// Build a gateway with a client ready for `dial_timeout`.
    pub fn new(dial_timeout: Duration) -> KvResult<Self> {
        let clients = DashMap::new();
        clients.insert(dial_timeout, build_client(dial_timeout)?);
        Ok(Self { clients })
    }

    fn client_for(&self, dial_timeout: Duration) -> KvResult<reqwest::Client> {
        if let Some(client) = self.clients.get(&dial_timeout) {
            return Ok(client.value().clone());
        }
        let client = build_client(dial_timeout)?;
        tracing::debug!(dial_timeout_ms = dial_timeout.as_millis() as u64, "Built KV client");
        Ok(self.clients.entry(dial_timeout).or_insert(client).value().clone())
    }

    async fn put_one(
        &self,
        endpoint: &str,
        request: &PutRequest,
        options: &PutOptions,
    ) -> KvResult<()> {
        let url = put_url(endpoint);
        let send = self
            .client_for(options.dial_timeout)?
            .post(&url)
            .json(request)
            .send();

        let response = match timeout(options.deadline(), send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_timeout() => {
                return Err(KvError::Timeout {
                    endpoint: endpoint.to_string(),
                    after: options.deadline(),
                })
            }
            Ok(Err(e)) => {
                return Err(KvError::Connect {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(KvError::Timeout {
                    endpoint: endpoint.to_string(),
                    after: options.deadline(),
                })
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(KvError::Rejected {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

fn put_url(endpoint: &str) -> String {
    format!("{}/v3/kv/put", endpoint.trim_end_matches('/'))
}

fn encode(key: &str, value: &str) -> PutRequest {
    PutRequest {
        key: STANDARD.encode(key),
        value: STANDARD.encode(value),
    }
}

#[async_trait]
impl KvStore for EtcdGateway {
    async fn put(
        &self,
        endpoints: &[String],
        key: &str,
        value: &str,
        options: &PutOptions,
    ) -> KvResult<()> {
        let request = encode(key, value);
        let mut last = None;

        for (i, endpoint) in endpoints.iter().enumerate() {
            match self.put_one(endpoint, &request, options).await {
                Ok(()) => {
                    tracing::debug!(endpoint = %endpoint, key = %key, "KV put accepted");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(endpoint_idx = i, endpoint = %endpoint, error = %e, "KV put failed, trying next endpoint");
                    last = Some(e);
                }
            }
        }

        match last {
            None => Err(KvError::NoEndpoints {
                environment: String::new(),
            }),
            Some(e) if endpoints.len() == 1 => Err(e),
            Some(e) => Err(KvError::AllEndpointsFailed {
                tried: endpoints.len(),
                last: Box::new(e),
            }),
        }
    }

    fn backend(&self) -> &'static str {
        "etcd"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_encoding() {
        let request = encode("/confgate/billing", "[app.conf]\na=1\n");
        assert_eq!(request.key, "L2NvbmZnYXRlL2JpbGxpbmc=");
        let decoded = STANDARD.decode(&request.value).unwrap();
        assert_eq!(decoded, b"[app.conf]\na=1\n");
    }

    #[test]
    fn test_put_url() {
        assert_eq!(put_url("http://etcd:2379/"), "http://etcd:2379/v3/kv/put");
        assert_eq!(put_url("http://etcd:2379"), "http://etcd:2379/v3/kv/put");
    }

    #[tokio::test]
    async fn test_unreachable_endpoints_fail_over_then_error() {
        let gateway = EtcdGateway::new(Duration::from_millis(200)).unwrap();
        let options = PutOptions {
            dial_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_millis(200),
        };
        // Port 9 on localhost (discard) is not expected to serve HTTP.
        let endpoints = vec![
            "http://127.0.0.1:9".to_string(),
            "http://127.0.0.1:9".to_string(),
        ];
        let err = gateway.put(&endpoints, "/k", "v", &options).await.unwrap_err();
        assert!(matches!(err, KvError::AllEndpointsFailed { tried: 2, .. }));
    }

    #[tokio::test]
    async fn test_dial_timeout_follows_put_options() {
        let gateway = EtcdGateway::new(Duration::from_secs(5)).unwrap();
        let endpoints = vec!["http://127.0.0.1:9".to_string()];

        let reloaded = PutOptions {
            dial_timeout: Duration::from_millis(150),
            request_timeout: Duration::from_millis(150),
        };
        let _ = gateway.put(&endpoints, "/k", "v", &reloaded).await;
        let _ = gateway.put(&endpoints, "/k", "v", &reloaded).await;

        assert_eq!(gateway.clients.len(), 2);
        assert!(gateway.clients.contains_key(&Duration::from_millis(150)));
    }
}
