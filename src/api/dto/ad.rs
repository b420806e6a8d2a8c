//! DTO for ad event reporting.

use serde::Deserialize;

use crate::application::services::AdKind;

/// Request body for `POST /s/{code}/ad`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AdEventRequest {
    pub kind: AdKindDto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdKindDto {
    View,
    Click,
}

impl From<AdKindDto> for AdKind {
    fn from(kind: AdKindDto) -> Self {
        match kind {
            AdKindDto::View => AdKind::View,
            AdKindDto::Click => AdKind::Click,
        }
    }
}
