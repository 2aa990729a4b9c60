//! Vault: the service's store of previously submitted identity records.
//!
//! # Design
//! Every vault operation is a `VaultRequest` variant. `Vault::build` turns a
//! request into an `HttpRequest` for `vault/<action>`, so hosts that perform
//! their own I/O (and the C FFI, which receives requests as JSON) share the
//! same validation as the typed convenience methods.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::instrument;

use crate::client::{ApiClient, JsonObject};
use crate::config::{ClientConfig, SDK_CLIENT_ID};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::input::VAULT_IMAGE;
use crate::validate::require_non_empty;

/// Most filter statements accepted by `list`.
pub const MAX_FILTERS: usize = 5;

const ENTRY_ID_REQUIRED: &str = "Vault entry ID required.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Which slot of a vault entry an image is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    #[default]
    Document = 0,
    Face = 1,
}

/// Filtering, ordering and paging for `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    /// Statements such as `createtime>=2024/01/01`; at most five.
    pub filter: Vec<String>,
    pub orderby: String,
    pub sort: SortDirection,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: Vec::new(),
            orderby: "createtime".to_string(),
            sort: SortDirection::Desc,
            limit: 10,
            offset: 0,
        }
    }
}

impl ListQuery {
    pub fn filter(mut self, statement: impl Into<String>) -> Self {
        self.filter.push(statement.into());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, sort: SortDirection) -> Self {
        self.orderby = field.into();
        self.sort = sort;
        self
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

/// One vault operation and its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VaultRequest {
    Get {
        id: String,
    },
    List(ListQuery),
    Update {
        id: String,
        data: JsonObject,
    },
    Delete {
        ids: Vec<String>,
    },
    AddImage {
        id: String,
        /// URL or local file path.
        image: String,
        #[serde(default)]
        image_type: ImageType,
    },
    DeleteImage {
        id: String,
        image_id: String,
    },
    SearchFace {
        /// URL or local file path.
        image: String,
        #[serde(default = "default_max_entry")]
        max_entry: u32,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    TrainFace,
    TrainingStatus,
}

fn default_max_entry() -> u32 {
    10
}

fn default_threshold() -> f64 {
    0.5
}

impl VaultRequest {
    /// Path segment under `vault/`.
    pub fn action(&self) -> &'static str {
        match self {
            VaultRequest::Get { .. } => "get",
            VaultRequest::List(_) => "list",
            VaultRequest::Update { .. } => "update",
            VaultRequest::Delete { .. } => "delete",
            VaultRequest::AddImage { .. } => "addimage",
            VaultRequest::DeleteImage { .. } => "deleteimage",
            VaultRequest::SearchFace { .. } => "searchface",
            VaultRequest::TrainFace => "train",
            VaultRequest::TrainingStatus => "trainstatus",
        }
    }

    /// Validate arguments and produce the action-specific payload fields.
    fn payload(&self) -> Result<JsonObject, ApiError> {
        let mut payload = JsonObject::new();
        match self {
            VaultRequest::Get { id } => {
                require_non_empty(id, ENTRY_ID_REQUIRED)?;
                payload.insert("id".to_string(), json!(id));
            }
            VaultRequest::List(query) => {
                if query.filter.len() > MAX_FILTERS {
                    return Err(ApiError::validation(
                        "Filter should be an array containing maximum of 5 filter statements.",
                    ));
                }
                payload.insert("filter".to_string(), json!(query.filter));
                payload.insert("orderby".to_string(), json!(query.orderby));
                payload.insert("sort".to_string(), json!(query.sort));
                payload.insert("limit".to_string(), json!(query.limit));
                payload.insert("offset".to_string(), json!(query.offset));
            }
            VaultRequest::Update { id, data } => {
                require_non_empty(id, ENTRY_ID_REQUIRED)?;
                if data.is_empty() {
                    return Err(ApiError::validation("Data required."));
                }
                payload.extend(data.clone());
                payload.insert("id".to_string(), json!(id));
            }
            VaultRequest::Delete { ids } => {
                if ids.is_empty() || ids.iter().any(String::is_empty) {
                    return Err(ApiError::validation(ENTRY_ID_REQUIRED));
                }
                payload.insert("id".to_string(), json!(ids));
            }
            VaultRequest::AddImage { id, image, image_type } => {
                require_non_empty(id, ENTRY_ID_REQUIRED)?;
                payload.insert("id".to_string(), json!(id));
                payload.insert("type".to_string(), json!(*image_type as u8));
                VAULT_IMAGE.insert(&mut payload, image)?;
            }
            VaultRequest::DeleteImage { id, image_id } => {
                require_non_empty(id, ENTRY_ID_REQUIRED)?;
                require_non_empty(image_id, "Image ID required.")?;
                payload.insert("id".to_string(), json!(id));
                payload.insert("imageid".to_string(), json!(image_id));
            }
            VaultRequest::SearchFace { image, max_entry, threshold } => {
                payload.insert("maxentry".to_string(), json!(max_entry));
                payload.insert("threshold".to_string(), json!(threshold));
                VAULT_IMAGE.insert(&mut payload, image)?;
            }
            VaultRequest::TrainFace | VaultRequest::TrainingStatus => {}
        }
        Ok(payload)
    }
}

/// Client for the Vault API.
#[derive(Clone)]
pub struct Vault {
    client: ApiClient,
}

impl Vault {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: ApiClient::new(config),
        }
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            client: ApiClient::with_transport(config, transport),
        }
    }

    pub fn build(&self, request: &VaultRequest) -> Result<HttpRequest, ApiError> {
        let mut payload = request.payload()?;
        payload.insert("client".to_string(), json!(SDK_CLIENT_ID));
        self.client.build(&format!("vault/{}", request.action()), payload)
    }

    pub fn parse(&self, response: HttpResponse) -> Result<Value, ApiError> {
        self.client.parse(response)
    }

    #[instrument(skip_all, fields(action = request.action()))]
    pub fn execute(&self, request: &VaultRequest) -> Result<Value, ApiError> {
        let http = self.build(request)?;
        let response = self.client.send(&http)?;
        self.parse(response)
    }

    /// A single entry.
    pub fn get(&self, id: &str) -> Result<Value, ApiError> {
        self.execute(&VaultRequest::Get { id: id.to_string() })
    }

    /// Entries matching `query`.
    pub fn list(&self, query: ListQuery) -> Result<Value, ApiError> {
        self.execute(&VaultRequest::List(query))
    }

    /// Overwrite fields of an entry with `data`.
    pub fn update(&self, id: &str, data: JsonObject) -> Result<Value, ApiError> {
        self.execute(&VaultRequest::Update {
            id: id.to_string(),
            data,
        })
    }

    /// Delete one or more entries.
    pub fn delete(&self, ids: &[&str]) -> Result<bool, ApiError> {
        self.execute(&VaultRequest::Delete {
            ids: ids.iter().map(|s| s.to_string()).collect(),
        })?;
        Ok(true)
    }

    /// Attach a document or face image to an existing entry.
    pub fn add_image(&self, id: &str, image: &str, image_type: ImageType) -> Result<Value, ApiError> {
        self.execute(&VaultRequest::AddImage {
            id: id.to_string(),
            image: image.to_string(),
            image_type,
        })
    }

    pub fn delete_image(&self, id: &str, image_id: &str) -> Result<bool, ApiError> {
        self.execute(&VaultRequest::DeleteImage {
            id: id.to_string(),
            image_id: image_id.to_string(),
        })?;
        Ok(true)
    }

    /// Entries whose face resembles the one in `image`.
    pub fn search_face(&self, image: &str, max_entry: u32, threshold: f64) -> Result<Value, ApiError> {
        self.execute(&VaultRequest::SearchFace {
            image: image.to_string(),
            max_entry,
            threshold,
        })
    }

    /// Rebuild the face search index.
    pub fn train_face(&self) -> Result<Value, ApiError> {
        self.execute(&VaultRequest::TrainFace)
    }

    pub fn training_status(&self) -> Result<Value, ApiError> {
        self.execute(&VaultRequest::TrainingStatus)
    }
}
