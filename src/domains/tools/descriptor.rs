//! Declarative tool descriptors.
//!
//! A [`ToolDescriptor`] is the static, config-file form of one HTTP-backed tool.
//! It is consumed by the adapter builder (`adapter.rs`), which validates it and
//! turns it into an invocable [`CompiledAdapter`](super::CompiledAdapter).

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Default per-request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

/// Static definition of one tool, as read from the `tools:` list of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name within the registry.
    pub name: String,

    /// Human-readable text surfaced to callers during discovery.
    pub description: String,

    /// HTTP method used for the outbound call.
    #[serde(default)]
    pub method: HttpMethod,

    /// Target URL, possibly containing `{param}` placeholders.
    #[serde(rename = "url")]
    pub url_template: String,

    /// Request timeout in seconds.
    #[serde(rename = "timeout", default = "default_timeout")]
    pub timeout_seconds: f64,

    /// Parameters substituted into the URL template.
    #[serde(default)]
    pub path_params: ParamMap,

    /// Parameters sent in the query string.
    #[serde(default)]
    pub query_params: ParamMap,

    /// Parameters sent as fields of the JSON request body (POST/PUT only).
    #[serde(default)]
    pub body_params: ParamMap,
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

impl ToolDescriptor {
    /// Create a GET descriptor with no parameters and the default timeout.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url_template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            method: HttpMethod::default(),
            url_template: url_template.into(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            path_params: ParamMap::default(),
            query_params: ParamMap::default(),
            body_params: ParamMap::default(),
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_path_param(mut self, name: impl Into<String>, tag: impl Into<String>) -> Self {
        self.path_params.push(name, tag);
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, tag: impl Into<String>) -> Self {
        self.query_params.push(name, tag);
        self
    }

    pub fn with_body_param(mut self, name: impl Into<String>, tag: impl Into<String>) -> Self {
        self.body_params.push(name, tag);
        self
    }

    /// Total number of declared parameters across all three categories.
    pub fn param_count(&self) -> usize {
        self.path_params.len() + self.query_params.len() + self.body_params.len()
    }
}

// ============================================================================
// HTTP method
// ============================================================================

/// The HTTP methods a tool may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Whether requests with this method carry a JSON body.
    pub fn sends_body(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }

    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!(
                "unsupported HTTP method '{other}' (expected GET, POST, PUT or DELETE)"
            )),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// Parameter types
// ============================================================================

/// Primitive type tag of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
}

impl ParamType {
    /// JSON Schema `type` keyword for this tag.
    pub fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "number",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_type())
    }
}

impl FromStr for ParamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "str" | "string" => Ok(Self::String),
            "int" | "integer" => Ok(Self::Integer),
            "float" | "number" => Ok(Self::Float),
            "bool" | "boolean" => Ok(Self::Boolean),
            other => Err(format!(
                "unrecognized type tag '{other}' (expected string, int, float or bool)"
            )),
        }
    }
}

// ============================================================================
// Ordered parameter map
// ============================================================================

/// Parameter name -> raw type tag, in declaration order.
///
/// Tags are kept as written and validated by the adapter builder, so an
/// unrecognized tag is reported as a build failure for the owning tool
/// rather than as a YAML syntax error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap(Vec<(String, String)>);

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, tag: impl Into<String>) {
        self.0.push((name.into(), tag.into()));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(n, _)| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }
}

impl<N: Into<String>, T: Into<String>> FromIterator<(N, T)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (N, T)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(n, t)| (n.into(), t.into()))
                .collect(),
        )
    }
}

impl Serialize for ParamMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, tag) in &self.0 {
            map.serialize_entry(name, tag)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParamMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParamMapVisitor;

        impl<'de> Visitor<'de> for ParamMapVisitor {
            type Value = ParamMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of parameter name to type tag")
            }

            fn visit_unit<E: de::Error>(self) -> Result<ParamMap, E> {
                Ok(ParamMap::default())
            }

            fn visit_none<E: de::Error>(self) -> Result<ParamMap, E> {
                Ok(ParamMap::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ParamMap, A::Error> {
                let mut entries: Vec<(String, String)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, tag)) = access.next_entry::<String, String>()? {
                    if entries.iter().any(|(n, _)| *n == name) {
                        return Err(de::Error::custom(format!(
                            "duplicate parameter '{name}'"
                        )));
                    }
                    entries.push((name, tag));
                }
                Ok(ParamMap(entries))
            }
        }

        deserializer.deserialize_any(ParamMapVisitor)
    }
}
