//! S3-compatible object storage backend implementation.
//!
//! Works against AWS S3 and any provider exposing the S3 API (MinIO,
//! LocalStack, Aliyun OSS, Tencent COS, JD Cloud OSS).

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{ByteStream, collect_stream};
use crate::config::S3Config;
use crate::object::{
	BucketListing, ListedFile, ObjectStorage, ObjectStorageManager, UploadTicket,
	check_bucket_name, check_page_size, check_ttl, effective_marker,
};
use crate::path::{join_prefix, normalize_key, normalize_prefix};
use crate::{Result, Storage, StorageError};

/// Longest lifetime SigV4 presigning accepts.
const MAX_PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// S3 storage backend.
#[derive(Debug, Clone)]
pub struct S3Storage {
	name: String,
	client: Client,
	bucket: String,
	prefix: Option<String>,
	public_base_url: String,
	settings: S3Config,
}

impl S3Storage {
	/// Create a new S3 storage backend.
	///
	/// Credentials come from the default AWS provider chain (environment,
	/// profile, instance metadata).
	///
	/// # Errors
	///
	/// Returns `` `StorageError::ConfigError` `` if the bucket name is empty.
	pub async fn new(config: S3Config) -> Result<Self> {
		if config.bucket.trim().is_empty() {
			return Err(StorageError::ConfigError(
				"S3 bucket name must not be empty".to_string(),
			));
		}

		let mut loader = aws_config::defaults(BehaviorVersion::latest());
		if let Some(region) = &config.region {
			loader = loader.region(Region::new(region.clone()));
		}
		let shared_config = loader.load().await;

		let mut builder = aws_sdk_s3::config::Builder::from(&shared_config)
			.force_path_style(config.force_path_style);
		if let Some(endpoint) = &config.endpoint {
			builder = builder.endpoint_url(endpoint);
		}

		let client = Client::from_conf(builder.build());
		Ok(Self::with_client(client, config))
	}

	/// Create a backend around an already configured client.
	pub fn with_client(client: Client, config: S3Config) -> Self {
		let public_base_url = public_url_base(&config);
		let prefix = config
			.prefix
			.as_deref()
			.map(|p| p.trim_matches('/').to_string())
			.filter(|p| !p.is_empty());

		Self {
			name: config.name.clone().unwrap_or_else(|| "s3".to_string()),
			client,
			bucket: config.bucket.clone(),
			prefix,
			public_base_url,
			settings: config,
		}
	}

	pub fn bucket_name(&self) -> &str {
		&self.bucket
	}

	/// Storage for another bucket, reached through the same client and
	/// settings. An explicit public URL belongs to this bucket only and is
	/// not carried over.
	fn sibling(&self, bucket: &str) -> Self {
		Self::with_client(
			self.client.clone(),
			S3Config {
				bucket: bucket.to_string(),
				name: Some(bucket.to_string()),
				public_base_url: None,
				..self.settings.clone()
			},
		)
	}

	/// Map a logical path to `(normalised key, object key in the bucket)`.
	fn object_key(&self, path: &str) -> Result<(String, String)> {
		let key = normalize_key(path)?;
		let object_key = join_prefix(self.prefix.as_deref(), &key);
		Ok((key, object_key))
	}

	fn namespace(&self) -> String {
		match &self.prefix {
			Some(prefix) => format!("{}/", prefix),
			None => String::new(),
		}
	}
}

/// Base URL objects of this bucket are publicly reachable under.
fn public_url_base(config: &S3Config) -> String {
	if let Some(url) = &config.public_base_url {
		return url.trim_end_matches('/').to_string();
	}

	match (&config.endpoint, &config.region) {
		(Some(endpoint), _) => {
			let endpoint = endpoint.trim_end_matches('/');
			if config.force_path_style {
				return format!("{}/{}", endpoint, config.bucket);
			}
			match endpoint.split_once("://") {
				Some((scheme, host)) => format!("{}://{}.{}", scheme, config.bucket, host),
				None => format!("https://{}.{}", config.bucket, endpoint),
			}
		}
		(None, Some(region)) => format!("https://{}.s3.{}.amazonaws.com", config.bucket, region),
		(None, None) => format!("https://{}.s3.amazonaws.com", config.bucket),
	}
}

fn http_status<E>(err: &SdkError<E>) -> Option<u16> {
	err.raw_response().map(|response| response.status().as_u16())
}

#[async_trait]
impl Storage for S3Storage {
	fn name(&self) -> &str {
		&self.name
	}

	async fn store(&self, path: &str, content: ByteStream, overwrite: bool) -> Result<String> {
		let (key, object_key) = self.object_key(path)?;

		// Providers without conditional-write support ignore If-None-Match,
		// so check first and rely on the header where it is honoured
		if !overwrite && self.exists(&key).await? {
			return Err(StorageError::AlreadyExists(key));
		}

		let body = collect_stream(content).await?;
		let mut request = self
			.client
			.put_object()
			.bucket(&self.bucket)
			.key(&object_key)
			.body(S3ByteStream::from(body));
		if !overwrite {
			request = request.if_none_match("*");
		}

		match request.send().await {
			Ok(_) => {
				tracing::debug!(storage = %self.name, key = %object_key, "stored object");
				Ok(key)
			}
			Err(e) if http_status(&e) == Some(412) => Err(StorageError::AlreadyExists(key)),
			Err(e) => Err(StorageError::transport(
				format!("Failed to put s3://{}/{}", self.bucket, object_key),
				e,
			)),
		}
	}

	async fn read(&self, path: &str) -> Result<ByteStream> {
		let (key, object_key) = self.object_key(path)?;

		let result = self
			.client
			.get_object()
			.bucket(&self.bucket)
			.key(&object_key)
			.send()
			.await;

		match result {
			Ok(output) => Ok(Box::pin(output.body.into_async_read())),
			Err(e)
				if http_status(&e) == Some(404)
					|| e.as_service_error().is_some_and(|s| s.is_no_such_key()) =>
			{
				Err(StorageError::NotFound(key))
			}
			Err(e) => Err(StorageError::transport(
				format!("Failed to get s3://{}/{}", self.bucket, object_key),
				e,
			)),
		}
	}

	async fn exists(&self, path: &str) -> Result<bool> {
		let (_, object_key) = self.object_key(path)?;

		let result = self
			.client
			.head_object()
			.bucket(&self.bucket)
			.key(&object_key)
			.send()
			.await;

		match result {
			Ok(_) => Ok(true),
			Err(e)
				if http_status(&e) == Some(404)
					|| e.as_service_error().is_some_and(|s| s.is_not_found()) =>
			{
				Ok(false)
			}
			Err(e) => Err(StorageError::transport(
				format!("Failed to head s3://{}/{}", self.bucket, object_key),
				e,
			)),
		}
	}

	async fn absolute_path(&self, path: &str) -> Result<String> {
		let (key, object_key) = self.object_key(path)?;

		if !self.exists(&key).await? {
			return Err(StorageError::NotFound(key));
		}

		Ok(format!("{}/{}", self.public_base_url, object_key))
	}
}

#[async_trait]
impl ObjectStorage for S3Storage {
	async fn list_objects(
		&self,
		page_size: usize,
		marker: Option<&str>,
		prefix: &str,
	) -> Result<BucketListing> {
		check_page_size(page_size)?;
		let namespace = self.namespace();
		let full_prefix = format!("{}{}", namespace, normalize_prefix(prefix)?);
		let max_keys = i32::try_from(page_size).unwrap_or(i32::MAX);

		let output = self
			.client
			.list_objects_v2()
			.bucket(&self.bucket)
			.prefix(&full_prefix)
			.delimiter("/")
			.max_keys(max_keys)
			.set_continuation_token(effective_marker(marker).map(str::to_string))
			.send()
			.await
			.map_err(|e| {
				StorageError::transport(
					format!("Failed to list s3://{}/{}", self.bucket, full_prefix),
					e,
				)
			})?;

		let strip = |key: &str| key.strip_prefix(&namespace).unwrap_or(key).to_string();

		let files = output
			.contents()
			.iter()
			.filter_map(|object| {
				object.key().map(|key| ListedFile {
					key: strip(key),
					size: object.size().unwrap_or(0).max(0) as u64,
				})
			})
			.collect();
		let directories = output
			.common_prefixes()
			.iter()
			.filter_map(|p| p.prefix())
			.map(strip)
			.collect();
		let next_marker = if output.is_truncated().unwrap_or(false) {
			output.next_continuation_token().map(str::to_string)
		} else {
			None
		};

		Ok(BucketListing {
			files,
			directories,
			next_marker,
		})
	}

	async fn create_upload_ticket(
		&self,
		allowed_prefix_or_name: &str,
		ttl: Duration,
	) -> Result<UploadTicket> {
		check_ttl(ttl, MAX_PRESIGN_TTL)?;
		if allowed_prefix_or_name.ends_with(['/', '*']) {
			return Err(StorageError::Unsupported(format!(
				"S3 upload tickets are scoped to a single key, got prefix {}",
				allowed_prefix_or_name
			)));
		}

		let (key, object_key) = self.object_key(allowed_prefix_or_name)?;
		let presigning = PresigningConfig::expires_in(ttl)
			.map_err(|e| StorageError::InvalidArgument(format!("Invalid ticket lifetime: {}", e)))?;
		let expires_at = Utc::now()
			+ chrono::Duration::from_std(ttl).map_err(|e| {
				StorageError::InvalidArgument(format!("Invalid ticket lifetime: {}", e))
			})?;

		let request = self
			.client
			.put_object()
			.bucket(&self.bucket)
			.key(&object_key)
			.presigned(presigning)
			.await
			.map_err(|e| {
				StorageError::transport(
					format!("Failed to presign upload to s3://{}/{}", self.bucket, object_key),
					e,
				)
			})?;

		Ok(UploadTicket {
			url: request.uri().to_string(),
			method: request.method().to_string(),
			headers: request
				.headers()
				.map(|(name, value)| (name.to_string(), value.to_string()))
				.collect(),
			scope: key,
			expires_at,
		})
	}
}

#[async_trait]
impl ObjectStorageManager for S3Storage {
	async fn create_bucket(&self, name: &str) -> Result<()> {
		check_bucket_name(name)?;

		let mut request = self.client.create_bucket().bucket(name);
		// us-east-1 rejects an explicit location constraint
		if let Some(region) = self.settings.region.as_deref().filter(|r| *r != "us-east-1") {
			request = request.create_bucket_configuration(
				CreateBucketConfiguration::builder()
					.location_constraint(BucketLocationConstraint::from(region))
					.build(),
			);
		}

		match request.send().await {
			Ok(_) => {
				tracing::info!(storage = %self.name, bucket = %name, "created bucket");
				Ok(())
			}
			Err(e)
				if http_status(&e) == Some(409)
					|| e.as_service_error().is_some_and(|s| {
						s.is_bucket_already_exists() || s.is_bucket_already_owned_by_you()
					}) =>
			{
				Err(StorageError::BucketAlreadyExists(name.to_string()))
			}
			Err(e) => Err(StorageError::transport(
				format!("Failed to create bucket {}", name),
				e,
			)),
		}
	}

	async fn bucket(&self, name: &str, auto_create: bool) -> Result<Arc<dyn ObjectStorage>> {
		check_bucket_name(name)?;

		let result = self.client.head_bucket().bucket(name).send().await;
		match result {
			Ok(_) => {}
			Err(e)
				if http_status(&e) == Some(404)
					|| e.as_service_error().is_some_and(|s| s.is_not_found()) =>
			{
				if !auto_create {
					return Err(StorageError::BucketNotFound(name.to_string()));
				}
				// Another client may create it between the HEAD and the PUT
				match self.create_bucket(name).await {
					Ok(()) | Err(StorageError::BucketAlreadyExists(_)) => {}
					Err(e) => return Err(e),
				}
			}
			Err(e) if http_status(&e) == Some(403) => {
				return Err(StorageError::transport(
					format!("Access denied to bucket {}", name),
					e,
				));
			}
			Err(e) => {
				return Err(StorageError::transport(
					format!("Failed to head bucket {}", name),
					e,
				));
			}
		}

		Ok(Arc::new(self.sibling(name)))
	}
}
