use async_trait::async_trait;
use kernel::model::{
    document::{DocumentId, DocumentMeta, Grid},
    normalize_email,
    session::AccessCredential,
};
use kernel::repository::document::{DocumentStore, DocumentStoreFactory};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use shared::error::{AppError, AppResult};
use std::sync::Arc;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Google Sheets and Drive, acting with one user's access token.
pub struct GoogleDocumentStore {
    client: Client,
    access_token: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Deserialize)]
struct FileEntry {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spreadsheet {
    spreadsheet_id: String,
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Deserialize)]
struct Sheet {
    properties: SpreadsheetProperties,
}

impl From<Spreadsheet> for DocumentMeta {
    fn from(value: Spreadsheet) -> Self {
        DocumentMeta {
            id: DocumentId::new(value.spreadsheet_id),
            title: value.properties.title,
            sheets: value.sheets.into_iter().map(|s| s.properties.title).collect(),
        }
    }
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Grid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionList {
    #[serde(default)]
    permissions: Vec<Permission>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Permission {
    id: String,
    #[serde(default)]
    email_address: Option<String>,
}

fn external(e: impl std::fmt::Display) -> AppError {
    AppError::ExternalServiceError(e.to_string())
}

fn url_with_segments(base: &str, segments: &[&str]) -> AppResult<Url> {
    let mut url = Url::parse(base).map_err(external)?;
    url.path_segments_mut()
        .map_err(|_| external(format!("{base} cannot be a base url")))?
        .extend(segments);
    Ok(url)
}

impl GoogleDocumentStore {
    pub fn new(client: Client, access_token: String) -> Self {
        Self {
            client,
            access_token,
        }
    }

    /// Sends the request and turns non-success statuses into errors. When
    /// `document` is given, 403/404 mean the workbook is gone or unshared.
    async fn send(
        &self,
        request: RequestBuilder,
        document: Option<&DocumentId>,
    ) -> AppResult<Response> {
        let res = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(external)?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        match (status, document) {
            (StatusCode::NOT_FOUND | StatusCode::FORBIDDEN, Some(id)) => {
                tracing::warn!(document_id = %id, %status, "document not reachable");
                Err(AppError::StaleDocument(id.to_string()))
            }
            _ => Err(AppError::ExternalServiceError(format!("{status}: {body}"))),
        }
    }

    async fn permissions(&self, id: &DocumentId) -> AppResult<Vec<Permission>> {
        let url = url_with_segments(DRIVE_FILES_API, &[id.as_str(), "permissions"])?;
        let mut all = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .get(url.clone())
                .query(&[("fields", "nextPageToken,permissions(id,emailAddress)")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: PermissionList = self
                .send(request, Some(id))
                .await?
                .json()
                .await
                .map_err(external)?;
            all.extend(page.permissions);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(all),
            }
        }
    }
}

#[async_trait]
impl DocumentStore for GoogleDocumentStore {
    async fn find_by_title(&self, title: &str) -> AppResult<Option<DocumentMeta>> {
        let escaped = title.replace('\\', "\\\\").replace('\'', "\\'");
        let query = format!(
            "name='{escaped}' and mimeType='{SPREADSHEET_MIME}' and trashed=false"
        );
        let request = self.client.get(DRIVE_FILES_API).query(&[
            ("q", query.as_str()),
            ("fields", "files(id,name)"),
            ("spaces", "drive"),
        ]);
        let list: FileList = self
            .send(request, None)
            .await?
            .json()
            .await
            .map_err(external)?;

        match list.files.into_iter().next() {
            None => Ok(None),
            Some(file) => self.get(&DocumentId::new(file.id)).await.map(Some),
        }
    }

    async fn get(&self, id: &DocumentId) -> AppResult<DocumentMeta> {
        let url = url_with_segments(SHEETS_API, &[id.as_str()])?;
        let request = self.client.get(url).query(&[(
            "fields",
            "spreadsheetId,properties.title,sheets.properties.title",
        )]);
        let sheet: Spreadsheet = self
            .send(request, Some(id))
            .await?
            .json()
            .await
            .map_err(external)?;
        Ok(sheet.into())
    }

    async fn create(&self, title: &str, tabs: &[String]) -> AppResult<DocumentMeta> {
        let body = json!({
            "properties": { "title": title },
            "sheets": tabs
                .iter()
                .map(|t| json!({ "properties": { "title": t } }))
                .collect::<Vec<_>>(),
        });
        let sheet: Spreadsheet = self
            .send(self.client.post(SHEETS_API).json(&body), None)
            .await?
            .json()
            .await
            .map_err(external)?;
        tracing::info!(document_id = %sheet.spreadsheet_id, title, "created spreadsheet");
        Ok(sheet.into())
    }

    async fn read_range(&self, id: &DocumentId, range: &str) -> AppResult<Grid> {
        let url = url_with_segments(SHEETS_API, &[id.as_str(), "values", range])?;
        let values: ValueRange = self
            .send(self.client.get(url), Some(id))
            .await?
            .json()
            .await
            .map_err(external)?;
        Ok(values.values)
    }

    async fn write_range(&self, id: &DocumentId, range: &str, values: Grid) -> AppResult<()> {
        let url = url_with_segments(SHEETS_API, &[id.as_str(), "values", range])?;
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        });
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&body);
        self.send(request, Some(id)).await?;
        Ok(())
    }

    async fn share_reader(&self, id: &DocumentId, email: &str) -> AppResult<()> {
        let url = url_with_segments(DRIVE_FILES_API, &[id.as_str(), "permissions"])?;
        let body = json!({
            "role": "reader",
            "type": "user",
            "emailAddress": normalize_email(email),
        });
        let request = self
            .client
            .post(url)
            .query(&[("sendNotificationEmail", "false")])
            .json(&body);
        self.send(request, Some(id)).await?;
        tracing::info!(document_id = %id, employee = email, "granted read access");
        Ok(())
    }

    async fn revoke(&self, id: &DocumentId, email: &str) -> AppResult<()> {
        let email = normalize_email(email);
        let matching = self
            .permissions(id)
            .await?
            .into_iter()
            .filter(|p| p.email_address.as_deref().map(normalize_email).as_ref() == Some(&email));
        for permission in matching {
            let url = url_with_segments(
                DRIVE_FILES_API,
                &[id.as_str(), "permissions", permission.id.as_str()],
            )?;
            self.send(self.client.delete(url), Some(id)).await?;
            tracing::info!(document_id = %id, employee = %email, "revoked read access");
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct GoogleDocumentStoreFactory {
    client: Client,
}

impl GoogleDocumentStoreFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentStoreFactory for GoogleDocumentStoreFactory {
    async fn connect(&self, credential: &AccessCredential) -> AppResult<Arc<dyn DocumentStore>> {
        if !credential.is_usable() {
            return Err(AppError::ServiceInitError("missing access token".into()));
        }
        Ok(Arc::new(GoogleDocumentStore::new(
            self.client.clone(),
            credential.access_token.clone(),
        )))
    }
}
