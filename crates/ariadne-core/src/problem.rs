//! RFC-7807 problem-details envelope for the HTTP boundary.

use serde::{Deserialize, Serialize};

use crate::errors::AriadneError;

const TYPE_BASE: &str = "https://ariadne.dev/problems/";

/// The error envelope every external surface returns on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// Stable type URI identifying the error kind.
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl From<&AriadneError> for ProblemDetails {
    fn from(err: &AriadneError) -> Self {
        Self {
            problem_type: format!("{TYPE_BASE}{}", err.kind()),
            title: err.kind().replace('-', " "),
            status: err.http_status(),
            detail: Some(err.to_string()),
            instance: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = AriadneError::NotFound {
            kind: "symbol",
            id: "com.example.Missing".into(),
        };
        let problem = ProblemDetails::from(&err);
        assert_eq!(problem.status, 404);
        assert_eq!(
            problem.problem_type,
            "https://ariadne.dev/problems/not-found"
        );
        assert!(problem.detail.unwrap().contains("com.example.Missing"));
    }

    #[test]
    fn conflict_maps_to_409() {
        let err = AriadneError::Conflict("job already acquired".into());
        assert_eq!(ProblemDetails::from(&err).status, 409);
    }
}
