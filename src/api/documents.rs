//! Document endpoints: upload, listing, selection, and embedding triggers.
//!
//! These are passthroughs: the backend owns parsing, chunking, and vector
//! storage; the client only moves bytes and reads status payloads.

use std::path::Path;

use reqwest::multipart::{Form, Part};

use crate::error::ChatError;

use super::ApiClient;
use super::check_status;
use super::types::{DocumentInfo, DocumentList, EmbedRequest, EmbedResponse};

impl ApiClient {
    /// Upload a local file as a new document.
    ///
    /// The MIME type is guessed from the file name; unknown extensions fall
    /// back to `application/octet-stream` and the backend decides.
    pub async fn upload_document(&self, path: &Path) -> Result<DocumentInfo, ChatError> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ChatError::Validation(format!("not a file path: {}", path.display())))?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let part = Part::bytes(bytes)
            .file_name(filename)
            .mime_str(mime.as_ref())?;
        let form = Form::new().part("file", part);

        let response = self
            .http()
            .post(self.endpoint("/documents/upload"))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// List all stored documents.
    pub async fn list_documents(&self) -> Result<DocumentList, ChatError> {
        self.get("/documents").await
    }

    /// Fetch one document's metadata.
    pub async fn get_document(&self, document_id: &str) -> Result<DocumentInfo, ChatError> {
        self.get(&format!("/documents/{document_id}")).await
    }

    /// Delete a document and its vectors.
    pub async fn delete_document(&self, document_id: &str) -> Result<(), ChatError> {
        self.delete(&format!("/documents/{document_id}")).await
    }

    /// Mark a document as selected for retrieval.
    pub async fn select_document(&self, document_id: &str) -> Result<(), ChatError> {
        let _: serde_json::Value = self
            .post(
                &format!("/documents/{document_id}/select"),
                &serde_json::json!({ "selected": true }),
            )
            .await?;
        Ok(())
    }

    /// Chunk and embed a stored document into the vector index.
    pub async fn embed_document(
        &self,
        document_id: &str,
        request: &EmbedRequest,
    ) -> Result<EmbedResponse, ChatError> {
        self.post(&format!("/embed/document/{document_id}"), request)
            .await
    }

    /// Embed a free-standing text. Payload shape is backend-defined.
    pub async fn embed_text(&self, text: &str) -> Result<serde_json::Value, ChatError> {
        self.post("/embed/text", &serde_json::json!({ "text": text }))
            .await
    }

    /// Embedding index statistics. Payload shape is backend-defined.
    pub async fn embed_stats(&self) -> Result<serde_json::Value, ChatError> {
        self.get("/embed/stats").await
    }
}
