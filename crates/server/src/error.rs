//! Structured errors for the biblio-proxy server.
//!
//! Tool-level failures that have no counterpart in the core error type.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Structured errors for the MCP tools.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., no purge strategy given).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("OUTPUT_FAILED: {0}")]
    OutputFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::OutputFailed(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err: McpError = ToolError::InvalidInput("nothing to purge".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));
        assert_eq!(err.message, "nothing to purge");

        let err: McpError = ToolError::OutputFailed("bad json".into()).into();
        assert_eq!(err.code, ErrorCode(-32603));
    }
}
