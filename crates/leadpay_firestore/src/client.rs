//! Firestore REST client.
//!
//! Talks to `{api_base}/v1/projects/{project}/databases/{database}/documents`.
//! Only the three calls the ledger needs are implemented: a create through
//! `documents:commit` (so `createdAt` can be a server timestamp), a field-level
//! `PATCH`, and a `GET`.

use crate::auth::TokenSource;
use crate::models::{CommitRequest, Document, FieldTransform, Fields, Precondition, Write};
use leadpay_common::{api_error_message, HTTP_CLIENT};
use leadpay_config::FirestoreConfig;
use reqwest::{header, Response, Url};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

/// Errors that can occur when talking to Firestore.
#[derive(Error, Debug)]
pub enum FirestoreError {
    /// Obtaining an access token failed
    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Missing required configuration
    #[error("Missing configuration: {0}")]
    ConfigError(String),

    /// The addressed document does not exist
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Error returned by the Firestore API
    #[error("Firestore API error: {message} (Status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Failed to parse Firestore response: {0}")]
    ParseError(#[from] serde_json::Error),
}

const REQUEST_TIME: &str = "REQUEST_TIME";

/// Client for one Firestore database.
#[derive(Debug, Clone)]
pub struct FirestoreClient {
    config: FirestoreConfig,
    project_id: String,
    tokens: TokenSource,
}

impl FirestoreClient {
    /// Builds a client. Fails when the project id or credentials are missing.
    pub fn new(config: FirestoreConfig) -> Result<Self, FirestoreError> {
        let project_id = config
            .project_id
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                FirestoreError::ConfigError("Missing project_id in FirestoreConfig".to_string())
            })?;
        let tokens = TokenSource::from_config(&config)?;
        Ok(Self {
            config,
            project_id,
            tokens,
        })
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    /// `projects/{p}/databases/{d}/documents`
    fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.config.database
        )
    }

    /// Full resource name of a document.
    pub fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_root(), collection, id)
    }

    /// Builds `{api_base}/v1/projects/{p}/databases/{d}/{segments...}`, encoding each segment.
    fn url(&self, segments: &[&str]) -> Result<Url, FirestoreError> {
        let mut url = Url::parse(&self.config.api_base).map_err(|e| {
            FirestoreError::ConfigError(format!("Invalid Firestore api_base: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                FirestoreError::ConfigError("Firestore api_base cannot be a base URL".to_string())
            })?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                self.config.database.as_str(),
            ])
            .extend(segments);
        Ok(url)
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, FirestoreError> {
        self.url(&["documents", collection, id])
    }

    /// Creates a document with a generated id and returns that id.
    ///
    /// Every field named in `server_timestamp_fields` is set to the commit time
    /// by Firestore. The write fails if the id is already taken.
    pub async fn create_document(
        &self,
        collection: &str,
        fields: Fields,
        server_timestamp_fields: &[&str],
    ) -> Result<String, FirestoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let name = self.document_name(collection, &id);

        let request = CommitRequest {
            writes: vec![Write {
                update: Document {
                    name: name.clone(),
                    fields,
                    ..Document::default()
                },
                update_transforms: server_timestamp_fields
                    .iter()
                    .map(|field| FieldTransform {
                        field_path: field.to_string(),
                        set_to_server_value: REQUEST_TIME,
                    })
                    .collect(),
                current_document: Precondition { exists: false },
            }],
        };

        let url = self.url(&["documents:commit"])?;
        let bearer = self.bearer().await?;
        debug!("Committing new document {}", name);
        let response = HTTP_CLIENT
            .post(url)
            .header(header::AUTHORIZATION, bearer)
            .json(&request)
            .send()
            .await?;
        check_status(response, &name).await?;
        Ok(id)
    }

    /// Overwrites the given fields of an existing document, leaving others untouched.
    ///
    /// Returns [`FirestoreError::NotFound`] if the document does not exist.
    pub async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), FirestoreError> {
        let name = self.document_name(collection, id);
        let mut url = self.document_url(collection, id)?;
        {
            let mut query = url.query_pairs_mut();
            for field in fields.keys() {
                query.append_pair("updateMask.fieldPaths", field);
            }
            query.append_pair("currentDocument.exists", "true");
        }

        let bearer = self.bearer().await?;
        debug!("Updating {} on {}", fields.len(), name);
        let body = Document {
            fields,
            ..Document::default()
        };
        let response = HTTP_CLIENT
            .patch(url)
            .header(header::AUTHORIZATION, bearer)
            .json(&body)
            .send()
            .await?;
        check_status(response, &name).await?;
        Ok(())
    }

    pub async fn get_document(&self, collection: &str, id: &str) -> Result<Document, FirestoreError> {
        let name = self.document_name(collection, id);
        let url = self.document_url(collection, id)?;
        let bearer = self.bearer().await?;
        let response = HTTP_CLIENT
            .get(url)
            .header(header::AUTHORIZATION, bearer)
            .send()
            .await?;
        let body = check_status(response, &name).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn bearer(&self) -> Result<String, FirestoreError> {
        Ok(format!("Bearer {}", self.tokens.token().await?))
    }
}

/// Returns the body of a successful response; maps 404 to `NotFound`.
async fn check_status(response: Response, name: &str) -> Result<String, FirestoreError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(FirestoreError::NotFound(name.to_string()));
    }
    let message = api_error_message(&body);
    error!("Firestore request for {} failed: {} - {}", name, status, message);
    Err(FirestoreError::ApiError {
        status_code: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FirestoreClient {
        FirestoreClient::new(FirestoreConfig {
            project_id: Some("demo-project".to_string()),
            api_base: "http://localhost:8080/".to_string(),
            access_token: Some("owner".to_string()),
            ..FirestoreConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_document_name() {
        assert_eq!(
            client().document_name("payments", "abc"),
            "projects/demo-project/databases/(default)/documents/payments/abc"
        );
    }

    #[test]
    fn test_urls_encode_ids() {
        let client = client();
        assert_eq!(
            client.url(&["documents:commit"]).unwrap().as_str(),
            "http://localhost:8080/v1/projects/demo-project/databases/(default)/documents:commit"
        );
        assert_eq!(
            client.document_url("leads", "a/b").unwrap().as_str(),
            "http://localhost:8080/v1/projects/demo-project/databases/(default)/documents/leads/a%2Fb"
        );
    }

    #[test]
    fn test_new_requires_project_id() {
        let err = FirestoreClient::new(FirestoreConfig {
            access_token: Some("owner".to_string()),
            ..FirestoreConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, FirestoreError::ConfigError(msg) if msg.contains("project_id")));
    }
}
