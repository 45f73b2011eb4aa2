use datawrapper_mcp_error::Result;
use serde::{Deserialize, Serialize};
use url::Url;

/// Represents a resource advertised by the server
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// URI representing the resource location (e.g. "datawrapper://chart-types")
    pub uri: String,
    /// Name of the resource
    pub name: String,
    /// Optional description of the resource
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Text body of a `resources/read` reply.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", untagged)]
pub enum ResourceContents {
    TextResourceContents {
        uri: String,
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        text: String,
    },
}

impl ResourceContents {
    pub fn text<U, M, T>(uri: U, mime_type: Option<M>, text: T) -> Self
    where
        U: Into<String>,
        M: Into<String>,
        T: Into<String>,
    {
        ResourceContents::TextResourceContents {
            uri: uri.into(),
            mime_type: mime_type.map(Into::into),
            text: text.into(),
        }
    }
}

impl Resource {
    /// Creates a new Resource; the URI must parse, the name defaults to its last path segment
    pub fn new<S: AsRef<str>>(uri: S, name: Option<String>) -> Result<Self> {
        let uri = uri.as_ref();
        let url = Url::parse(uri)?;

        let name = match name {
            Some(n) => n,
            None => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|segment| !segment.is_empty())
                .or_else(|| url.host_str())
                .unwrap_or("unnamed")
                .to_string(),
        };

        Ok(Self {
            uri: uri.to_string(),
            name,
            description: None,
            mime_type: None,
        })
    }

    /// Sets the description of the resource
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the MIME type of the resource
    pub fn with_mime_type<S: Into<String>>(mut self, mime_type: S) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Returns the scheme of the URI
    pub fn scheme(&self) -> Result<String> {
        let url = Url::parse(&self.uri)?;
        Ok(url.scheme().to_string())
    }
}
