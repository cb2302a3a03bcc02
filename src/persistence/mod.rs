//! Persistent listener records.
//!
//! Each listener created by the job workflow is written once, as a flat JSON
//! object, into the `listeners` bucket under
//! `listener.<protocol>_<host>-<port>_<id>`. Records are never updated or
//! deleted here; [`ListenerPersistence::load_all`] reads them back so the
//! server can restart persistent listeners.

pub mod store;

use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub use store::{Bucket, FsStore, KvStore, MemoryStore};

pub const LISTENER_BUCKET: &str = "listeners";
pub const LISTENER_NAMESPACE: &str = "listener";

/// Stored listener configuration. Empty fields are left out of the JSON.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub id: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub lhost: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub lport: u16,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    // DNS
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_domains: Vec<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub enable_canaries: bool,

    // HTTPS
    #[serde(skip_serializing_if = "String::is_empty")]
    pub http_domain: String,
    #[serde(skip_serializing_if = "is_false")]
    pub secure: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub certificate: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(skip_serializing_if = "is_false")]
    pub lets_encrypt: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub website: String,

    // Stagers
    #[serde(skip_serializing_if = "String::is_empty")]
    pub implant_stage: String,
}

/// The job fields the listener workflow hands over when a listener starts.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub port: u16,
    pub protocol: String,
    pub name: String,
    pub description: String,
}

/// HTTPS-specific listener settings.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HttpsListener {
    pub lhost: String,
    pub certificate: String,
    pub key: String,
    pub secure: bool,
    pub domain: String,
    pub website: String,
    pub lets_encrypt: bool,
}

/// A record as written to (or read from) the bucket.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PersistedListener {
    pub key: String,
    pub config: ListenerConfig,
}

pub struct ListenerPersistence {
    store: Arc<dyn KvStore>,
    bucket: String,
    namespace: String,
}

fn is_zero(value: &u16) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ListenerConfig {
    fn from_job(job: &JobDescriptor) -> Self {
        Self {
            lport: job.port,
            protocol: job.protocol.clone(),
            name: job.name.clone(),
            description: job.description.clone(),
            ..Self::default()
        }
    }

    /// Storage key for this record under `namespace`.
    pub fn storage_key(&self, namespace: &str) -> String {
        format!(
            "{namespace}.{}_{}-{}_{}",
            self.protocol, self.lhost, self.lport, self.id
        )
    }
}

/// Random non-zero 31-bit listener id.
fn random_listener_id() -> i32 {
    rand::thread_rng().gen_range(1..=i32::MAX)
}

impl ListenerPersistence {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            bucket: LISTENER_BUCKET.to_string(),
            namespace: LISTENER_NAMESPACE.to_string(),
        }
    }

    pub fn persist_mtls(&self, job: &JobDescriptor, lhost: &str) -> Result<PersistedListener> {
        let config = ListenerConfig {
            lhost: lhost.to_string(),
            ..ListenerConfig::from_job(job)
        };
        self.persist(config)
    }

    /// DNS listeners bind every interface, so no host is recorded.
    pub fn persist_dns(
        &self,
        job: &JobDescriptor,
        enable_canaries: bool,
        dns_domains: &[String],
    ) -> Result<PersistedListener> {
        let config = ListenerConfig {
            dns_domains: dns_domains.to_vec(),
            enable_canaries,
            ..ListenerConfig::from_job(job)
        };
        self.persist(config)
    }

    pub fn persist_https(
        &self,
        job: &JobDescriptor,
        https: &HttpsListener,
    ) -> Result<PersistedListener> {
        let config = ListenerConfig {
            lhost: https.lhost.clone(),
            secure: https.secure,
            certificate: https.certificate.clone(),
            key: https.key.clone(),
            http_domain: https.domain.clone(),
            website: https.website.clone(),
            lets_encrypt: https.lets_encrypt,
            ..ListenerConfig::from_job(job)
        };
        self.persist(config)
    }

    /// TCP, HTTP and HTTPS stagers share one record shape; the job's protocol tells them apart.
    pub fn persist_stager(
        &self,
        job: &JobDescriptor,
        lhost: &str,
        implant_stage: &str,
    ) -> Result<PersistedListener> {
        let config = ListenerConfig {
            lhost: lhost.to_string(),
            implant_stage: implant_stage.to_string(),
            ..ListenerConfig::from_job(job)
        };
        self.persist(config)
    }

    /// Serialize and write one record under a freshly drawn id.
    ///
    /// Records are write-once: the id is always replaced so no two calls share a key.
    fn persist(&self, mut config: ListenerConfig) -> Result<PersistedListener> {
        config.id = random_listener_id();
        let bucket = self.store.bucket(&self.bucket)?;
        let raw = serde_json::to_vec(&config)
            .map_err(|err| Error::persistence("serialize listener", err))?;
        let key = config.storage_key(&self.namespace);
        bucket.set(&key, &raw)?;

        info!(
            name = %config.name,
            protocol = %config.protocol,
            address = %format!("{}:{}", config.lhost, config.lport),
            "saved persistent listener"
        );
        Ok(PersistedListener { key, config })
    }

    /// Read back every stored listener in this namespace, sorted by key.
    pub fn load_all(&self) -> Result<Vec<PersistedListener>> {
        let bucket = self.store.bucket(&self.bucket)?;
        let prefix = format!("{}.", self.namespace);
        let mut listeners = Vec::new();
        for key in bucket.keys()? {
            if !key.starts_with(&prefix) {
                continue;
            }
            let Some(raw) = bucket.get(&key)? else {
                continue;
            };
            let config: ListenerConfig = serde_json::from_slice(&raw)
                .map_err(|err| Error::persistence("decode listener", format!("{key}: {err}")))?;
            listeners.push(PersistedListener { key, config });
        }
        Ok(listeners)
    }
}
