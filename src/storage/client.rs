use std::collections::BTreeMap;

use rand::Rng;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::error::{CryptoError, Result};
use crate::storage::protocol::{
    checksum, format_shape, matrix_from_bytes, matrix_to_bytes, parse_shape, read_frame, read_payload,
    verify_checksum, write_frame, Command, GetParameters, GetResponse, ObjectMetadata, PutParameters,
    MATRIX_DTYPE,
};

/// Address of a storage node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    pub hostname: String,
    pub port: u16,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            hostname: "localhost".to_string(),
            port: 3000,
        }
    }
}

fn random_hex(len_bytes: usize) -> String {
    let mut bytes = vec![0u8; len_bytes];
    rand::rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

/// Client of the object storage service. Each request opens its own connection.
#[derive(Clone, Debug)]
pub struct StorageClient {
    config: StorageConfig,
    client_id: String,
}

impl StorageClient {
    pub fn new(config: StorageConfig) -> Self {
        StorageClient {
            config,
            client_id: random_hex(16),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    async fn connect(&self) -> Result<TcpStream> {
        let stream = TcpStream::connect((self.config.hostname.as_str(), self.config.port)).await?;
        Ok(stream)
    }

    /// Stores `bytes` under a generated `ball-xxxx` id.
    pub async fn put(&self, bytes: &[u8]) -> Result<serde_json::Value> {
        let params = PutParameters {
            id: format!("ball-{}", random_hex(2)),
            size: bytes.len() as u64,
            client_id: self.client_id.clone(),
            checksum: None,
            tags: BTreeMap::new(),
        };
        self.put_with(&params, bytes).await
    }

    /// Stores `bytes` with caller-supplied parameters and returns the store's response.
    pub async fn put_with(&self, params: &PutParameters, bytes: &[u8]) -> Result<serde_json::Value> {
        if params.size != bytes.len() as u64 {
            return Err(CryptoError::Validation(format!(
                "declared size {} does not match payload of {} bytes",
                params.size,
                bytes.len()
            )));
        }

        let mut stream = self.connect().await?;
        stream.write_all(&[Command::Put.as_byte()]).await?;
        write_frame(&mut stream, &serde_json::to_vec(params)?).await?;
        stream.write_all(bytes).await?;
        stream.flush().await?;

        let response = read_frame(&mut stream).await?;
        info!(id = %params.id, size = params.size, "stored object");
        Ok(serde_json::from_slice(&response)?)
    }

    /// Fetches an object by id.
    pub async fn get(&self, id: &str) -> Result<(ObjectMetadata, Vec<u8>)> {
        self.get_with(&GetParameters::new(id)).await
    }

    /// Fetches an object and verifies its payload against the announced checksum.
    ///
    /// # Errors
    /// Returns [`CryptoError::Integrity`] when the payload does not hash to the
    /// checksum in the response metadata.
    pub async fn get_with(&self, params: &GetParameters) -> Result<(ObjectMetadata, Vec<u8>)> {
        let mut stream = self.connect().await?;
        stream.write_all(&[Command::Get.as_byte()]).await?;
        write_frame(&mut stream, &serde_json::to_vec(params)?).await?;
        stream.flush().await?;

        let response: GetResponse = serde_json::from_slice(&read_frame(&mut stream).await?)?;
        let metadata = response.metadata;
        let bytes = read_payload(&mut stream, metadata.size).await?;
        if let Err(e) = verify_checksum(&bytes, &metadata.checksum) {
            warn!(id = %metadata.id, "checksum mismatch on retrieved object");
            return Err(e);
        }

        debug!(id = %metadata.id, size = metadata.size, "retrieved object");
        Ok((metadata, bytes))
    }

    /// Stores a rectangular matrix tagged with its dtype and shape.
    ///
    /// Without an explicit id a `matrix-xxxx` id is generated.
    pub async fn put_matrix<Row: AsRef<[f64]>>(
        &self,
        id: Option<&str>,
        rows: &[Row],
    ) -> Result<serde_json::Value> {
        let (bytes, shape) = matrix_to_bytes(rows)?;
        let mut tags = BTreeMap::new();
        tags.insert("dtype".to_string(), MATRIX_DTYPE.to_string());
        tags.insert("shape".to_string(), format_shape(shape));

        let params = PutParameters {
            id: id.map_or_else(|| format!("matrix-{}", random_hex(2)), str::to_string),
            size: bytes.len() as u64,
            client_id: self.client_id.clone(),
            checksum: Some(checksum(&bytes)),
            tags,
        };
        self.put_with(&params, &bytes).await
    }

    /// Fetches a matrix stored by [`put_matrix`](Self::put_matrix).
    pub async fn get_matrix(&self, id: &str) -> Result<(ObjectMetadata, Vec<Vec<f64>>)> {
        let (metadata, bytes) = self.get(id).await?;
        let tag = |name: &str| {
            metadata
                .tags
                .get(name)
                .ok_or_else(|| CryptoError::Protocol(format!("object {} has no {} tag", metadata.id, name)))
        };

        let dtype = tag("dtype")?;
        if dtype != MATRIX_DTYPE {
            return Err(CryptoError::Validation(format!(
                "unsupported matrix dtype {}",
                dtype
            )));
        }
        let shape = parse_shape(tag("shape")?)?;
        let matrix = matrix_from_bytes(&bytes, shape)?;
        Ok((metadata, matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    type Objects = Arc<Mutex<HashMap<String, (ObjectMetadata, Vec<u8>)>>>;

    /// Minimal in-process storage node.
    async fn spawn_store() -> (StorageConfig, Objects) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let objects: Objects = Arc::new(Mutex::new(HashMap::new()));

        let store = Arc::clone(&objects);
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut cmd = [0u8; 1];
                    stream.read_exact(&mut cmd).await.unwrap();
                    let params = read_frame(&mut stream).await.unwrap();
                    match Command::from_byte(cmd[0]).unwrap() {
                        Command::Put => {
                            let params: PutParameters = serde_json::from_slice(&params).unwrap();
                            let bytes = read_payload(&mut stream, params.size).await.unwrap();
                            let metadata = ObjectMetadata {
                                id: params.id.clone(),
                                size: params.size,
                                checksum: params.checksum.unwrap_or_else(|| checksum(&bytes)),
                                tags: params.tags,
                            };
                            store.lock().unwrap().insert(params.id.clone(), (metadata, bytes));
                            let response = serde_json::json!({ "id": params.id, "size": params.size });
                            write_frame(&mut stream, &serde_json::to_vec(&response).unwrap())
                                .await
                                .unwrap();
                        }
                        Command::Get => {
                            let params: GetParameters = serde_json::from_slice(&params).unwrap();
                            let (metadata, bytes) = store.lock().unwrap()[&params.id].clone();
                            let response = GetResponse { metadata };
                            write_frame(&mut stream, &serde_json::to_vec(&response).unwrap())
                                .await
                                .unwrap();
                            stream.write_all(&bytes).await.unwrap();
                        }
                    }
                    stream.flush().await.unwrap();
                });
            }
        });

        let config = StorageConfig {
            hostname: "127.0.0.1".to_string(),
            port,
        };
        (config, objects)
    }

    #[test]
    fn test_default_config() {
        let config = StorageConfig::default();
        assert_eq!(config.hostname, "localhost");
        assert_eq!(config.port, 3000);
        assert_eq!(StorageClient::new(config).client_id().len(), 32);
    }

    #[test]
    fn test_random_hex_ids() {
        let id = random_hex(16);
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hex::decode(&id).unwrap().len(), 16);
        assert_ne!(random_hex(16), id);
    }

    #[tokio::test]
    async fn test_put_get_bytes() {
        let (config, objects) = spawn_store().await;
        let client = StorageClient::new(config);

        let response = client.put(b"encrypted blob").await.unwrap();
        let id = response["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("ball-"));
        assert_eq!(objects.lock().unwrap()[&id].0.size, 14);

        let (metadata, bytes) = client.get(&id).await.unwrap();
        assert_eq!(metadata.id, id);
        assert_eq!(bytes, b"encrypted blob");
    }

    #[tokio::test]
    async fn test_put_get_matrix() {
        let (config, _) = spawn_store().await;
        let client = StorageClient::new(config);
        let rows = vec![vec![0.73, 8.84], vec![-49.93, 34.44], vec![0.57, 65.04]];

        client.put_matrix(Some("matrix-test"), &rows).await.unwrap();
        let (metadata, matrix) = client.get_matrix("matrix-test").await.unwrap();
        assert_eq!(metadata.tags["shape"], "(3, 2)");
        assert_eq!(metadata.tags["dtype"], "float64");
        assert_eq!(matrix, rows);
    }

    #[tokio::test]
    async fn test_tampered_object_is_rejected() {
        let (config, objects) = spawn_store().await;
        let client = StorageClient::new(config);

        client.put_matrix(Some("m"), &[[1.0, 2.0]]).await.unwrap();
        objects.lock().unwrap().get_mut("m").unwrap().1[0] ^= 0xff;

        assert!(matches!(
            client.get_matrix("m").await,
            Err(CryptoError::Integrity { .. })
        ));
    }

    #[tokio::test]
    async fn test_size_mismatch_is_rejected_locally() {
        let client = StorageClient::new(StorageConfig::default());
        let params = PutParameters {
            id: "x".to_string(),
            size: 10,
            client_id: client.client_id().to_string(),
            checksum: None,
            tags: BTreeMap::new(),
        };
        assert!(matches!(
            client.put_with(&params, b"short").await,
            Err(CryptoError::Validation(_))
        ));
    }
}
