use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use uuid::Uuid;

use crate::config::get_config;
use crate::error::AppError;

/// Uploads are capped at 2 MB before any row mutation happens.
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct StorageService {
    client: Client,
    pub bucket_name: String,
}

impl StorageService {
    pub async fn new() -> Self {
        let config = get_config();

        let credentials = aws_sdk_s3::config::Credentials::new(
            config.aws_access_key_id.clone(),
            config.aws_secret_access_key.clone(),
            None,
            None,
            "manual_config",
        );

        let region = aws_sdk_s3::config::Region::new(config.aws_region.clone());

        let mut s3_config_builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(region)
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.s3_endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Self {
            client,
            bucket_name: config.s3_bucket_name.clone(),
        }
    }

    pub async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .acl(aws_sdk_s3::types::ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| {
                eprintln!("S3 Upload Error: {:?}", e);
                AppError::InternalServerError(format!("Failed to upload file: {}", e))
            })?;

        Ok(())
    }

    pub async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                eprintln!("S3 Delete Error: {}", e);
                AppError::InternalServerError("Failed to delete file".to_string())
            })?;

        Ok(())
    }

    pub async fn ensure_bucket_exists(&self) -> Result<(), AppError> {
        let resp = self.client.head_bucket().bucket(&self.bucket_name).send().await;

        match resp {
            Ok(_) => Ok(()),
            Err(_) => {
                println!(
                    "Bucket {} does not exist, attempting to create...",
                    self.bucket_name
                );
                self.client
                    .create_bucket()
                    .bucket(&self.bucket_name)
                    .send()
                    .await
                    .map_err(|e| {
                        eprintln!("Failed to create bucket: {:?}", e);
                        AppError::InternalServerError(format!("Failed to create bucket: {}", e))
                    })?;

                self.set_public_policy().await
            }
        }
    }

    async fn set_public_policy(&self) -> Result<(), AppError> {
        let policy = format!(
            r#"{{
                "Version": "2012-10-17",
                "Statement": [
                    {{
                        "Sid": "PublicReadGetObject",
                        "Effect": "Allow",
                        "Principal": "*",
                        "Action": "s3:GetObject",
                        "Resource": "arn:aws:s3:::{}/*"
                    }}
                ]
            }}"#,
            self.bucket_name
        );

        self.client
            .put_bucket_policy()
            .bucket(&self.bucket_name)
            .policy(policy)
            .send()
            .await
            .map_err(|e| {
                eprintln!("Failed to set bucket policy: {:?}", e);
                AppError::InternalServerError(format!("Failed to set bucket policy: {}", e))
            })?;

        Ok(())
    }
}

/// Product-scoped object key for an uploaded image. Only this key is
/// ever persisted on the product row.
pub fn image_object_key(filename: &str) -> String {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("bin");
    format!("products/{}.{}", Uuid::new_v4(), ext)
}

/// Public URL derived from the stored key and the configured base.
pub fn public_url(key: &str) -> String {
    let config = get_config();
    match &config.s3_endpoint {
        // Path-style: {endpoint}/{bucket}/{key}
        Some(endpoint) => match url::Url::parse(endpoint) {
            Ok(base) => base
                .join(&format!("{}/{}", config.s3_bucket_name, key))
                .map(|u| u.to_string())
                .unwrap_or_else(|_| {
                    format!(
                        "{}/{}/{}",
                        endpoint.trim_end_matches('/'),
                        config.s3_bucket_name,
                        key
                    )
                }),
            Err(_) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                config.s3_bucket_name,
                key
            ),
        },
        None => format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            config.s3_bucket_name, config.aws_region, key
        ),
    }
}

/// Gate an upload before anything touches the database: image MIME
/// types only, sniffed magic bytes, bounded size.
pub fn validate_image_upload(content_type: &str, data: &[u8]) -> Result<(), String> {
    if !content_type.starts_with("image/") {
        return Err("The file must be an image".to_string());
    }
    if data.len() > MAX_IMAGE_BYTES {
        return Err("The image may not be larger than 2 MB".to_string());
    }
    if image::guess_format(data).is_err() {
        return Err("The file is not a valid image".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    #[test]
    fn accepts_a_png_upload() {
        let mut data = PNG_MAGIC.to_vec();
        data.extend_from_slice(&[0; 64]);
        assert!(validate_image_upload("image/png", &data).is_ok());
    }

    #[test]
    fn rejects_non_image_content_types() {
        let err = validate_image_upload("application/pdf", &PNG_MAGIC).unwrap_err();
        assert!(err.contains("must be an image"));
    }

    #[test]
    fn rejects_oversized_uploads() {
        let mut data = PNG_MAGIC.to_vec();
        data.resize(MAX_IMAGE_BYTES + 1, 0);
        let err = validate_image_upload("image/png", &data).unwrap_err();
        assert!(err.contains("2 MB"));
    }

    #[test]
    fn rejects_spoofed_content_type() {
        let err = validate_image_upload("image/png", b"plain text payload").unwrap_err();
        assert!(err.contains("not a valid image"));
    }

    #[test]
    fn object_keys_are_product_scoped_and_keep_the_extension() {
        let key = image_object_key("photo.webp");
        assert!(key.starts_with("products/"));
        assert!(key.ends_with(".webp"));

        let fallback = image_object_key("noextension");
        assert!(fallback.ends_with(".bin"));
    }
}
