//! Document Store client
//!
//! Upload, list, and delete documents. Each document carries a processing
//! status the indexing pipeline advances server-side.

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::client::ApiClient;
use crate::error::Result;

/// A stored document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    pub original_filename: String,
    pub file_type: String,
    pub file_size: u64,
    /// Processing state: `uploaded`, `processing`, `ready`, or `failed`
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentList {
    pub documents: Vec<Document>,
    pub total: usize,
}

impl ApiClient {
    /// Upload a document for indexing
    pub async fn upload_document(&self, filename: &str, contents: Vec<u8>) -> Result<Document> {
        let part = Part::bytes(contents).file_name(filename.to_string());
        let form = Form::new().part("file", part);
        let response = self
            .request(Method::POST, "/api/documents")?
            .multipart(form)
            .send()
            .await?;
        let response = self.handle_error_response(response).await?;
        Ok(response.json().await?)
    }

    /// List the caller's documents
    pub async fn list_documents(&self) -> Result<DocumentList> {
        let response = self.request(Method::GET, "/api/documents")?.send().await?;
        let response = self.handle_error_response(response).await?;
        Ok(response.json().await?)
    }

    /// Delete a document and its index entries
    pub async fn delete_document(&self, document_id: Uuid) -> Result<()> {
        let path = format!("/api/documents/{document_id}");
        let response = self.request(Method::DELETE, &path)?.send().await?;
        self.handle_error_response(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_deserializes_store_shape() {
        let json = r#"{
            "id": "8c7f9a8e-2c1d-4f6a-9b2e-000000000001",
            "filename": "8c7f_handbook.pdf",
            "original_filename": "handbook.pdf",
            "file_type": "pdf",
            "file_size": 52441,
            "status": "ready",
            "created_at": "2026-08-01T10:30:00Z"
        }"#;
        let document: Document = serde_json::from_str(json).unwrap();
        assert_eq!(document.original_filename, "handbook.pdf");
        assert_eq!(document.status, "ready");
    }
}
