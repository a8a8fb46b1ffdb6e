use axum::{
    body::Bytes,
    extract::{ConnectInfo, FromRequest, FromRequestParts, Multipart, Request},
    http::request::Parts,
};
use std::{collections::HashMap, convert::Infallible, net::SocketAddr};

use crate::{error::AppError, models::CvApplication};

/// Name of the multipart part carrying the uploaded file.
pub const FILE_FIELD: &str = "file";
/// Optional text part naming the target sub-folder.
pub const FOLDER_FIELD: &str = "folder";

/// UploadedPart
///
/// The `file` part of a multipart body, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedPart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// UploadForm
///
/// A multipart body split into its text fields and the first `file` part.
/// The whole body is read before anything is written, so the `folder` field is honoured
/// wherever it appears relative to the file.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    pub file: Option<UploadedPart>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == FILE_FIELD {
                if form.file.is_some() {
                    continue;
                }
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                form.file = Some(UploadedPart {
                    file_name,
                    content_type,
                    bytes,
                });
            } else {
                let value = field.text().await?;
                // First occurrence wins.
                form.fields.entry(name).or_insert(value);
            }
        }

        Ok(form)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn folder(&self) -> Option<&str> {
        self.field(FOLDER_FIELD).filter(|folder| !folder.is_empty())
    }

    /// Applicant fields of a CV submission. Missing required fields become empty strings.
    pub fn application(&self) -> CvApplication {
        let required = |key: &str| self.field(key).unwrap_or_default().to_string();
        let optional = |key: &str| self.field(key).map(str::to_string);

        CvApplication {
            name: required("name"),
            surname: required("surname"),
            email: required("email"),
            tax_code: required("tax_code"),
            phone: optional("phone"),
            city: optional("city"),
            zip_code: optional("zip_code"),
            address: optional("address"),
            birth_place: optional("birth_place"),
            page_slug: optional("page_slug"),
        }
    }
}

impl<S> FromRequest<S> for UploadForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
        Self::read(multipart).await
    }
}

/// ClientIp
///
/// Address recorded with a CV submission: the first `X-Forwarded-For` entry (the service
/// runs behind a reverse proxy), else the socket peer, else `unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        if let Some(ip) = forwarded {
            return Ok(ClientIp(ip.to_string()));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(ClientIp(peer.unwrap_or_else(|| "unknown".to_string())))
    }
}
