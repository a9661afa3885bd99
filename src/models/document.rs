use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The shared document
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub content: String,
    pub last_editor_id: Option<u64>,
    pub version: u64,
}

/// HTML preview derived from a document version
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderedView {
    pub html: String,
    pub source_version: u64,
}
