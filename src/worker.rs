//! Worker descriptors for the clustering back end.
//!
//! [`WorkerSpec`] is the JSON document a container manager receives to start a
//! clustering worker, and [`ClusteringWorker`] resolves which endpoint of a
//! running worker serves a given algorithm and phase. Sending the request is
//! left to the caller's HTTP stack.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, Result};

pub const DEFAULT_IMAGE: &str = "secure-clustering-worker:latest";
pub const DEFAULT_WORKER_PORT: u16 = 9000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    pub driver: String,
}

impl Default for Network {
    fn default() -> Self {
        Network {
            name: "test".to_string(),
            driver: "bridge".to_string(),
        }
    }
}

/// Container port and the host port it is published on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ports {
    pub docker: u16,
    pub host: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    pub cpu_count: u32,
    pub cpu_period: u64,
    pub cpu_quota: u64,
    pub memory: u64,
}

impl Default for Resources {
    fn default() -> Self {
        Resources {
            cpu_count: 1,
            cpu_period: 0,
            cpu_quota: 0,
            memory: 1_000_000_000,
        }
    }
}

/// Optional settings for [`WorkerSpec::new`].
#[derive(Clone, Debug, PartialEq)]
pub struct WorkerOptions {
    pub node_index: usize,
    pub image: String,
    pub network: Network,
    pub manager_hostname: String,
    pub manager_port: u16,
    pub host_log_path: String,
    /// Prefix of the per-node sink directory on the host.
    pub host_sink_path: String,
    /// Entries overriding the default environment.
    pub envs: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    /// Replaces the default log and sink mounts when set.
    pub volumes: Option<BTreeMap<String, String>>,
    pub resources: Resources,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        WorkerOptions {
            node_index: 0,
            image: DEFAULT_IMAGE.to_string(),
            network: Network::default(),
            manager_hostname: "scm-0".to_string(),
            manager_port: 6000,
            host_log_path: "/log".to_string(),
            host_sink_path: "/test/sink/".to_string(),
            envs: BTreeMap::new(),
            labels: BTreeMap::new(),
            volumes: None,
            resources: Resources::default(),
        }
    }
}

/// Creation request for one clustering worker container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSpec {
    pub node_id: String,
    pub node_index: usize,
    pub image: String,
    pub network: Network,
    pub ports: Ports,
    pub envs: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    /// Host path to container path.
    pub volumes: BTreeMap<String, String>,
    pub resources: Resources,
}

impl WorkerSpec {
    pub fn new(node_id: impl Into<String>, ports: Ports, options: WorkerOptions) -> Self {
        let node_id = node_id.into();

        let mut envs = BTreeMap::new();
        envs.insert("NODE_ID".to_string(), node_id.clone());
        envs.insert("NODE_PORT".to_string(), ports.docker.to_string());
        envs.insert("HOST_PORT".to_string(), ports.host.to_string());
        envs.insert("NODE_INDEX".to_string(), options.node_index.to_string());
        envs.insert(
            "SECURE_CLUSTERING_MANAGER_HOSTNAME".to_string(),
            options.manager_hostname,
        );
        envs.insert(
            "SECURE_CLUSTERING_MANAGER_PORT".to_string(),
            options.manager_port.to_string(),
        );
        envs.insert("LOG_PATH".to_string(), "/logs".to_string());
        envs.insert("SINK_PATH".to_string(), "/sink".to_string());
        envs.extend(options.envs);

        let volumes = options.volumes.unwrap_or_else(|| {
            let mut volumes = BTreeMap::new();
            volumes.insert(options.host_log_path, "/logs".to_string());
            volumes.insert(format!("{}{}", options.host_sink_path, node_id), "/sink".to_string());
            volumes
        });

        WorkerSpec {
            node_id,
            node_index: options.node_index,
            image: options.image,
            network: options.network,
            ports,
            envs,
            labels: options.labels,
            volumes,
            resources: options.resources,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Clustering algorithms a worker can run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClusteringAlgorithm {
    KMeans,
    SkMeans,
    DbsKMeans,
    Dbsnnc,
}

impl ClusteringAlgorithm {
    pub fn tag(&self) -> &'static str {
        match self {
            ClusteringAlgorithm::KMeans => "KMEANS",
            ClusteringAlgorithm::SkMeans => "SK_MEANS",
            ClusteringAlgorithm::DbsKMeans => "DBSKMEANS",
            ClusteringAlgorithm::Dbsnnc => "DBSNNC",
        }
    }

    /// Whether the algorithm runs in two rounds with distinct endpoints.
    pub fn is_two_phase(&self) -> bool {
        matches!(self, ClusteringAlgorithm::SkMeans | ClusteringAlgorithm::DbsKMeans)
    }
}

impl FromStr for ClusteringAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "KMEANS" => Ok(ClusteringAlgorithm::KMeans),
            "SK_MEANS" => Ok(ClusteringAlgorithm::SkMeans),
            "DBSKMEANS" => Ok(ClusteringAlgorithm::DbsKMeans),
            "DBSNNC" => Ok(ClusteringAlgorithm::Dbsnnc),
            other => Err(CryptoError::InvalidParameter(format!(
                "unknown clustering algorithm {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for ClusteringAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Round of a two-phase algorithm. Single-phase algorithms ignore it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    First,
    Second,
}

/// A POST to a clustering worker, ready to hand to an HTTP client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

/// A running worker bound to one algorithm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusteringWorker {
    worker_id: String,
    port: u16,
    algorithm: ClusteringAlgorithm,
}

impl ClusteringWorker {
    pub fn new(worker_id: impl Into<String>, algorithm: ClusteringAlgorithm) -> Self {
        ClusteringWorker {
            worker_id: worker_id.into(),
            port: DEFAULT_WORKER_PORT,
            algorithm,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn algorithm(&self) -> ClusteringAlgorithm {
        self.algorithm
    }

    fn path(&self, phase: Phase) -> &'static str {
        match (self.algorithm, phase) {
            (ClusteringAlgorithm::KMeans, _) => "/clustering/kmeans",
            (ClusteringAlgorithm::SkMeans, Phase::First) => "/clustering/skmeans/1",
            (ClusteringAlgorithm::SkMeans, Phase::Second) => "/clustering/skmeans/2",
            (ClusteringAlgorithm::DbsKMeans, Phase::First) => "/clustering/dbskmeans/1",
            (ClusteringAlgorithm::DbsKMeans, Phase::Second) => "/clustering/dbskmeans/2",
            (ClusteringAlgorithm::Dbsnnc, _) => "/clustering/dbsnnc",
        }
    }

    /// Resolves the endpoint for `phase`; `headers` are passed through unchanged.
    pub fn request(&self, phase: Phase, headers: BTreeMap<String, String>) -> DispatchRequest {
        DispatchRequest {
            url: format!("http://{}:{}{}", self.worker_id, self.port, self.path(phase)),
            headers,
        }
    }
}
