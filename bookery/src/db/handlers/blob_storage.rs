use crate::errors::{Error, Result};
use crate::types::ContainerId;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One object in a listing page
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub key: String,
    pub metadata: HashMap<String, String>,
}

/// One page of object listings
///
/// `continuation` is an opaque token: pass it back to [`BlobStorage::list_objects`]
/// to fetch the next page. `None` means the listing is complete.
#[derive(Debug, Clone)]
pub struct ObjectPage {
    pub entries: Vec<ObjectEntry>,
    pub continuation: Option<String>,
}

/// Trait for physical blob storage backends
///
/// Backends expose containers addressed by ID and objects addressed by string
/// key. Listings come back page at a time in stable key order; callers that
/// need the whole listing follow the continuation tokens.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Whether the physical container exists
    async fn container_exists(&self, container_id: ContainerId) -> Result<bool>;

    /// Create the physical container. Succeeds if it already exists
    async fn create_container(&self, container_id: ContainerId) -> Result<()>;

    /// Fetch one page of object listings for a container
    async fn list_objects(&self, container_id: ContainerId, continuation: Option<String>) -> Result<ObjectPage>;

    /// Upload an object under the given key
    async fn put_object(&self, container_id: ContainerId, key: &str, content: Vec<u8>, metadata: HashMap<String, String>)
    -> Result<()>;

    /// Download an object's content
    async fn get_object(&self, container_id: ContainerId, key: &str) -> Result<Vec<u8>>;
}

// ============================================================================
// S3 Implementation
// ============================================================================

/// S3-backed blob storage - each container maps to its own bucket
///
/// Works against AWS as well as S3-compatible servers (MinIO, RustFS,
/// localstack) via the endpoint override in the storage configuration.
pub struct S3BlobStorage {
    client: aws_sdk_s3::Client,
    bucket_prefix: String,
    region: Option<String>,
}

impl S3BlobStorage {
    pub fn new(client: aws_sdk_s3::Client, bucket_prefix: String, region: Option<String>) -> Self {
        Self {
            client,
            bucket_prefix,
            region,
        }
    }

    fn bucket_name(&self, container_id: ContainerId) -> String {
        format!("{}{}", self.bucket_prefix, container_id)
    }
}

#[async_trait]
impl BlobStorage for S3BlobStorage {
    async fn container_exists(&self, container_id: ContainerId) -> Result<bool> {
        let bucket = self.bucket_name(container_id);

        match self.client.head_bucket().bucket(&bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(Error::Storage {
                        message: format!("head bucket {bucket}: {service_err}"),
                    })
                }
            }
        }
    }

    async fn create_container(&self, container_id: ContainerId) -> Result<()> {
        let bucket = self.bucket_name(container_id);
        tracing::debug!("CREATE BUCKET {}", bucket);

        let mut request = self.client.create_bucket().bucket(&bucket);

        // us-east-1 is the default location and must not be sent as a constraint
        if let Some(region) = self.region.as_deref().filter(|r| *r != "us-east-1") {
            let constraint = BucketLocationConstraint::from(region);
            request = request.create_bucket_configuration(CreateBucketConfiguration::builder().location_constraint(constraint).build());
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_bucket_already_owned_by_you() || service_err.is_bucket_already_exists() {
                    Ok(())
                } else {
                    Err(Error::Storage {
                        message: format!("create bucket {bucket}: {service_err}"),
                    })
                }
            }
        }
    }

    async fn list_objects(&self, container_id: ContainerId, continuation: Option<String>) -> Result<ObjectPage> {
        let bucket = self.bucket_name(container_id);
        tracing::debug!("LIST {} (continuation: {:?})", bucket, continuation);

        let mut request = self.client.list_objects_v2().bucket(&bucket);
        if let Some(token) = continuation {
            request = request.continuation_token(token);
        }

        let response = request.send().await.map_err(|e| Error::Storage {
            message: format!("list objects in {bucket}: {e}"),
        })?;

        // ListObjectsV2 does not return user metadata, so each key needs a
        // head request to recover it
        let mut entries = Vec::with_capacity(response.contents().len());
        for object in response.contents() {
            let Some(key) = object.key() else { continue };

            let head = self.client.head_object().bucket(&bucket).key(key).send().await.map_err(|e| Error::Storage {
                message: format!("head object {key} in {bucket}: {e}"),
            })?;

            entries.push(ObjectEntry {
                key: key.to_string(),
                metadata: head.metadata().cloned().unwrap_or_default(),
            });
        }

        let next = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(|t| t.to_string())
        } else {
            None
        };

        Ok(ObjectPage {
            entries,
            continuation: next,
        })
    }

    async fn put_object(
        &self,
        container_id: ContainerId,
        key: &str,
        content: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let bucket = self.bucket_name(container_id);
        tracing::debug!("PUT {}/{} ({} bytes)", bucket, key, content.len());

        self.client
            .put_object()
            .bucket(&bucket)
            .key(key)
            .body(ByteStream::from(content))
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|e| Error::Storage {
                message: format!("put object {key} in {bucket}: {e}"),
            })?;

        Ok(())
    }

    async fn get_object(&self, container_id: ContainerId, key: &str) -> Result<Vec<u8>> {
        let bucket = self.bucket_name(container_id);
        tracing::debug!("GET {}/{}", bucket, key);

        let response = self.client.get_object().bucket(&bucket).key(key).send().await.map_err(|e| Error::Storage {
            message: format!("get object {key} in {bucket}: {e}"),
        })?;

        let content = response.body.collect().await.map_err(|e| Error::Storage {
            message: format!("read object {key} in {bucket}: {e}"),
        })?;

        Ok(content.to_vec())
    }
}

// ============================================================================
// In-Memory Implementation
// ============================================================================

struct StoredObject {
    content: Vec<u8>,
    metadata: HashMap<String, String>,
}

/// In-memory blob storage backend
/// Useful for development and testing
///
/// Objects are held per container in key order, matching the stable listing
/// order of the S3 backend. A `page_size` can be set to exercise paged
/// listings without a real object store.
pub struct InMemoryBlobStorage {
    page_size: Option<usize>,
    containers: RwLock<HashMap<ContainerId, BTreeMap<String, StoredObject>>>,
}

impl InMemoryBlobStorage {
    pub fn new(page_size: Option<usize>) -> Self {
        Self {
            page_size,
            containers: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl BlobStorage for InMemoryBlobStorage {
    async fn container_exists(&self, container_id: ContainerId) -> Result<bool> {
        Ok(self.containers.read().await.contains_key(&container_id))
    }

    async fn create_container(&self, container_id: ContainerId) -> Result<()> {
        self.containers.write().await.entry(container_id).or_default();
        Ok(())
    }

    async fn list_objects(&self, container_id: ContainerId, continuation: Option<String>) -> Result<ObjectPage> {
        let containers = self.containers.read().await;
        let objects = containers.get(&container_id).ok_or_else(|| Error::Storage {
            message: format!("container {container_id} does not exist"),
        })?;

        let start_bound = match continuation.as_deref() {
            Some(start) => Bound::Included(start),
            None => Bound::Unbounded,
        };
        let range = objects.range::<str, _>((start_bound, Bound::Unbounded));

        let limit = self.page_size.unwrap_or(usize::MAX);
        let mut entries = Vec::new();
        let mut next = None;
        for (key, object) in range {
            if entries.len() == limit {
                next = Some(key.clone());
                break;
            }
            entries.push(ObjectEntry {
                key: key.clone(),
                metadata: object.metadata.clone(),
            });
        }

        Ok(ObjectPage {
            entries,
            continuation: next,
        })
    }

    async fn put_object(
        &self,
        container_id: ContainerId,
        key: &str,
        content: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let mut containers = self.containers.write().await;
        let objects = containers.get_mut(&container_id).ok_or_else(|| Error::Storage {
            message: format!("container {container_id} does not exist"),
        })?;

        objects.insert(key.to_string(), StoredObject { content, metadata });
        Ok(())
    }

    async fn get_object(&self, container_id: ContainerId, key: &str) -> Result<Vec<u8>> {
        let containers = self.containers.read().await;
        let objects = containers.get(&container_id).ok_or_else(|| Error::Storage {
            message: format!("container {container_id} does not exist"),
        })?;

        let object = objects.get(key).ok_or_else(|| Error::Storage {
            message: format!("object {key} not found in container {container_id}"),
        })?;

        Ok(object.content.clone())
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Create a blob storage backend based on configuration
pub async fn create_blob_storage(config: &crate::config::StorageConfig) -> Result<Arc<dyn BlobStorage>> {
    match config {
        crate::config::StorageConfig::S3 {
            bucket_prefix,
            region,
            endpoint_url,
            force_path_style,
            access_key_id,
            secret_access_key,
        } => {
            tracing::info!("Creating S3 blob storage backend (bucket prefix: {})", bucket_prefix);

            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(region) = region {
                loader = loader.region(aws_config::Region::new(region.clone()));
            }
            if let Some(endpoint) = endpoint_url {
                loader = loader.endpoint_url(endpoint.as_str());
            }
            // Static credentials for S3-compatible servers; otherwise the
            // default AWS provider chain applies
            if let (Some(access_key_id), Some(secret_access_key)) = (access_key_id, secret_access_key) {
                loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                    access_key_id,
                    secret_access_key,
                    None,
                    None,
                    "config",
                ));
            }
            let sdk_config = loader.load().await;

            let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(*force_path_style)
                .build();
            let client = aws_sdk_s3::Client::from_conf(s3_config);

            Ok(Arc::new(S3BlobStorage::new(client, bucket_prefix.clone(), region.clone())))
        }
        crate::config::StorageConfig::Memory { page_size } => {
            tracing::info!("Creating in-memory blob storage backend");
            Ok(Arc::new(InMemoryBlobStorage::new(*page_size)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn name_metadata(name: &str) -> HashMap<String, String> {
        HashMap::from([("name".to_string(), name.to_string())])
    }

    #[tokio::test]
    async fn test_create_container_is_idempotent() {
        let storage = InMemoryBlobStorage::new(None);
        let id = Uuid::new_v4();

        assert!(!storage.container_exists(id).await.unwrap());

        storage.create_container(id).await.unwrap();
        assert!(storage.container_exists(id).await.unwrap());

        // Second create keeps existing objects
        storage.put_object(id, "key", b"data".to_vec(), name_metadata("x")).await.unwrap();
        storage.create_container(id).await.unwrap();
        assert_eq!(storage.get_object(id, "key").await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_put_and_get_object() {
        let storage = InMemoryBlobStorage::new(None);
        let id = Uuid::new_v4();
        storage.create_container(id).await.unwrap();

        storage.put_object(id, "key-1", b"hello".to_vec(), name_metadata("greeting.txt")).await.unwrap();

        assert_eq!(storage.get_object(id, "key-1").await.unwrap(), b"hello");

        let page = storage.list_objects(id, None).await.unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].key, "key-1");
        assert_eq!(page.entries[0].metadata.get("name").unwrap(), "greeting.txt");
        assert!(page.continuation.is_none());
    }

    #[tokio::test]
    async fn test_get_missing_object_is_storage_error() {
        let storage = InMemoryBlobStorage::new(None);
        let id = Uuid::new_v4();
        storage.create_container(id).await.unwrap();

        let err = storage.get_object(id, "missing").await.unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }

    #[tokio::test]
    async fn test_operations_on_missing_container_are_storage_errors() {
        let storage = InMemoryBlobStorage::new(None);
        let id = Uuid::new_v4();

        assert!(matches!(storage.list_objects(id, None).await.unwrap_err(), Error::Storage { .. }));
        assert!(matches!(
            storage.put_object(id, "k", Vec::new(), HashMap::new()).await.unwrap_err(),
            Error::Storage { .. }
        ));
        assert!(matches!(storage.get_object(id, "k").await.unwrap_err(), Error::Storage { .. }));
    }

    #[tokio::test]
    async fn test_paged_listing_walks_all_objects_in_key_order() {
        let storage = InMemoryBlobStorage::new(Some(2));
        let id = Uuid::new_v4();
        storage.create_container(id).await.unwrap();

        for key in ["e", "a", "c", "b", "d"] {
            storage.put_object(id, key, Vec::new(), name_metadata(key)).await.unwrap();
        }

        let mut keys = Vec::new();
        let mut continuation = None;
        let mut pages = 0;
        loop {
            let page = storage.list_objects(id, continuation).await.unwrap();
            pages += 1;
            keys.extend(page.entries.into_iter().map(|e| e.key));
            match page.continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_unlimited_page_size_returns_single_page() {
        let storage = InMemoryBlobStorage::new(None);
        let id = Uuid::new_v4();
        storage.create_container(id).await.unwrap();

        for key in ["a", "b", "c"] {
            storage.put_object(id, key, Vec::new(), name_metadata(key)).await.unwrap();
        }

        let page = storage.list_objects(id, None).await.unwrap();
        assert_eq!(page.entries.len(), 3);
        assert!(page.continuation.is_none());
    }
}
