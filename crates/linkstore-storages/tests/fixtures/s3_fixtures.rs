//! S3 storage fixtures backed by a LocalStack container.

use aws_config::Region;
use aws_sdk_s3::config::{BehaviorVersion, Credentials};
use linkstore_storages::S3Storage;
use linkstore_storages::config::S3Config;
use std::sync::Arc;
use testcontainers::{
	ContainerAsync, GenericImage,
	core::{IntoContainerPort, WaitFor},
	runners::AsyncRunner,
};

/// S3 test container wrapper.
pub struct S3TestContainer {
	/// LocalStack container, stopped on drop
	_container: ContainerAsync<GenericImage>,
	client: aws_sdk_s3::Client,
	pub endpoint: String,
	pub bucket: String,
}

impl S3TestContainer {
	/// Start LocalStack and create a test bucket.
	pub async fn new() -> Self {
		let container = GenericImage::new("localstack/localstack", "latest")
			.with_exposed_port(4566.tcp())
			.with_wait_for(WaitFor::message_on_stdout("Ready."))
			.start()
			.await
			.expect("Failed to start LocalStack container");

		let port = container
			.get_host_port_ipv4(4566)
			.await
			.expect("Failed to get host port");
		let endpoint = format!("http://localhost:{}", port);
		let bucket = "linkstore-test".to_string();

		let credentials = Credentials::new("test", "test", None, None, "test");
		let s3_config = aws_sdk_s3::Config::builder()
			.behavior_version(BehaviorVersion::latest())
			.region(Region::new("us-east-1"))
			.endpoint_url(&endpoint)
			.credentials_provider(credentials)
			.force_path_style(true)
			.build();
		let client = aws_sdk_s3::Client::from_conf(s3_config);

		client
			.create_bucket()
			.bucket(&bucket)
			.send()
			.await
			.expect("Failed to create test bucket");

		Self {
			_container: container,
			client,
			endpoint,
			bucket,
		}
	}

	/// Backend for the test bucket, optionally below a key prefix.
	pub fn backend(&self, name: &str, prefix: Option<&str>) -> Arc<S3Storage> {
		let config = S3Config {
			bucket: self.bucket.clone(),
			region: Some("us-east-1".to_string()),
			endpoint: Some(self.endpoint.clone()),
			prefix: prefix.map(str::to_string),
			force_path_style: true,
			name: Some(name.to_string()),
			..Default::default()
		};
		Arc::new(S3Storage::with_client(self.client.clone(), config))
	}
}
