//! Adapter builder - compiles a [`ToolDescriptor`] into an invocable tool.
//!
//! A [`CompiledAdapter`] carries an ordered parameter list (path params, then
//! query params, then body params, each in declaration order) and the input
//! schema generated from it. Invocation takes a keyed argument map, checks and
//! coerces every declared argument, routes it to the URL path, the query string
//! or the JSON body, and hands the resulting [`RequestPlan`] to the executor.

use rmcp::model::{JsonObject, Tool};
use serde_json::{Map, Number, Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use super::descriptor::{HttpMethod, ParamMap, ParamType, ToolDescriptor};
use super::error::{ToolError, UpstreamError};
use super::executor::{HttpExecutor, RequestPlan};

/// Where an argument ends up in the outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamLocation {
    Path,
    Query,
    Body,
}

/// One entry of a compiled adapter's parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub location: ParamLocation,
}

/// Runtime form of a tool descriptor. Immutable once built.
#[derive(Debug, Clone)]
pub struct CompiledAdapter {
    name: String,
    description: String,
    method: HttpMethod,
    url_template: String,
    timeout: Duration,
    params: Vec<ParamSpec>,
    input_schema: Arc<JsonObject>,
    executor: HttpExecutor,
}

/// Builds [`CompiledAdapter`]s that share one HTTP executor.
#[derive(Debug, Clone, Default)]
pub struct AdapterBuilder {
    executor: HttpExecutor,
}

impl AdapterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executor(executor: HttpExecutor) -> Self {
        Self { executor }
    }

    /// Validate a descriptor and compile it.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Config`] when the descriptor declares no parameters,
    /// uses an unrecognized type tag, repeats a parameter name across
    /// categories, declares a path parameter the URL template never mentions,
    /// has a non-positive timeout, or has a URL template that is not an
    /// absolute http(s) URL.
    pub fn build(&self, descriptor: ToolDescriptor) -> Result<CompiledAdapter, ToolError> {
        let name = descriptor.name.trim().to_string();
        if name.is_empty() {
            return Err(ToolError::config("tool name must not be empty"));
        }

        if descriptor.param_count() == 0 {
            return Err(ToolError::config(format!(
                "tool '{name}' must have at least one parameter"
            )));
        }

        let timeout = parse_timeout(&name, descriptor.timeout_seconds)?;
        let params = collect_params(&name, &descriptor)?;
        validate_url_template(&name, &descriptor.url_template, &descriptor.path_params)?;
        let input_schema = Arc::new(build_input_schema(&params));

        debug!(
            tool = %name,
            method = %descriptor.method,
            params = params.len(),
            "Compiled tool adapter"
        );

        Ok(CompiledAdapter {
            name,
            description: descriptor.description,
            method: descriptor.method,
            url_template: descriptor.url_template,
            timeout,
            params,
            input_schema,
            executor: self.executor.clone(),
        })
    }
}

/// Compile a single descriptor with a fresh HTTP client.
pub fn build(descriptor: ToolDescriptor) -> Result<CompiledAdapter, ToolError> {
    AdapterBuilder::new().build(descriptor)
}

impl CompiledAdapter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ordered parameter list.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// JSON Schema of the tool input; every parameter is required.
    pub fn input_schema(&self) -> &Arc<JsonObject> {
        &self.input_schema
    }

    /// MCP tool metadata for discovery.
    pub fn to_tool(&self) -> Tool {
        Tool::new(
            self.name.clone(),
            self.description.clone(),
            self.input_schema.clone(),
        )
    }

    /// Resolve the outbound request for the given arguments without sending it.
    ///
    /// Every declared parameter must be present and convertible to its type.
    /// Undeclared arguments are ignored.
    pub fn prepare(&self, args: &JsonObject) -> Result<RequestPlan, ToolError> {
        for key in args.keys() {
            if !self.params.iter().any(|p| p.name == *key) {
                warn!(tool = %self.name, argument = %key, "Ignoring undeclared argument");
            }
        }

        let mut url = self.url_template.clone();
        let mut query = Vec::new();
        let mut body = Map::new();

        for param in &self.params {
            let raw = match args.get(&param.name) {
                Some(Value::Null) | None => {
                    return Err(ToolError::invalid_arguments(
                        &self.name,
                        format!("missing required argument '{}'", param.name),
                    ));
                }
                Some(value) => value,
            };
            let value = coerce(param.ty, raw).ok_or_else(|| {
                ToolError::invalid_arguments(
                    &self.name,
                    format!(
                        "argument '{}' must be of type {}, got {raw}",
                        param.name, param.ty
                    ),
                )
            })?;

            match param.location {
                ParamLocation::Path => {
                    let encoded = encode_path_segment(&stringify(&value));
                    url = url.replace(&format!("{{{}}}", param.name), &encoded);
                }
                ParamLocation::Query => query.push((param.name.clone(), stringify(&value))),
                ParamLocation::Body => {
                    body.insert(param.name.clone(), value);
                }
            }
        }

        let url = Url::parse(&url).map_err(|e| {
            ToolError::upstream(
                &self.name,
                UpstreamError::InvalidUrl {
                    url: url.clone(),
                    message: e.to_string(),
                },
            )
        })?;

        Ok(RequestPlan {
            method: self.method,
            url,
            query,
            body: self.method.sends_body().then_some(body),
            timeout: self.timeout,
        })
    }

    /// Run the tool: one outbound HTTP request, raw response text back.
    #[instrument(skip_all, fields(tool = %self.name))]
    pub async fn invoke(&self, args: &JsonObject) -> Result<String, ToolError> {
        let plan = self.prepare(args)?;
        self.executor
            .execute(plan)
            .await
            .map_err(|e| ToolError::upstream(&self.name, e))
    }
}

fn parse_timeout(tool: &str, seconds: f64) -> Result<Duration, ToolError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ToolError::config(format!(
            "tool '{tool}': timeout must be a positive number of seconds, got {seconds}"
        )));
    }
    Duration::try_from_secs_f64(seconds).map_err(|e| {
        ToolError::config(format!("tool '{tool}': timeout of {seconds} seconds is out of range: {e}"))
    })
}

fn collect_params(tool: &str, descriptor: &ToolDescriptor) -> Result<Vec<ParamSpec>, ToolError> {
    let sections = [
        (ParamLocation::Path, &descriptor.path_params),
        (ParamLocation::Query, &descriptor.query_params),
        (ParamLocation::Body, &descriptor.body_params),
    ];

    let mut seen = HashSet::new();
    let mut params = Vec::with_capacity(descriptor.param_count());
    for (location, section) in sections {
        for (name, tag) in section.iter() {
            if !seen.insert(name) {
                return Err(ToolError::config(format!(
                    "tool '{tool}': parameter '{name}' is declared more than once"
                )));
            }
            let ty = tag
                .parse::<ParamType>()
                .map_err(|e| ToolError::config(format!("tool '{tool}', parameter '{name}': {e}")))?;
            params.push(ParamSpec {
                name: name.to_string(),
                ty,
                location,
            });
        }
    }
    Ok(params)
}

fn validate_url_template(tool: &str, template: &str, path_params: &ParamMap) -> Result<(), ToolError> {
    let placeholders = placeholders(template);

    for (name, _) in path_params.iter() {
        if !placeholders.contains(&name) {
            return Err(ToolError::config(format!(
                "tool '{tool}': path parameter '{name}' has no {{{name}}} placeholder in '{template}'"
            )));
        }
    }
    for placeholder in &placeholders {
        if !path_params.contains(placeholder) {
            warn!(
                tool = %tool,
                placeholder = %placeholder,
                "URL placeholder has no declared path parameter and will be sent literally"
            );
        }
    }

    let mut stubbed = template.to_string();
    for placeholder in &placeholders {
        stubbed = stubbed.replace(&format!("{{{placeholder}}}"), "placeholder");
    }
    let url = Url::parse(&stubbed)
        .map_err(|e| ToolError::config(format!("tool '{tool}': invalid url '{template}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ToolError::config(format!(
            "tool '{tool}': url '{template}' must use http or https"
        )));
    }
    Ok(())
}

/// Names of all `{name}` placeholders in a URL template, in order of appearance.
fn placeholders(template: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = &after[..end];
        if !name.is_empty() && !name.contains('{') && !out.contains(&name) {
            out.push(name);
        }
        rest = &after[end + 1..];
    }
    out
}

fn build_input_schema(params: &[ParamSpec]) -> JsonObject {
    let mut properties = Map::new();
    for param in params {
        properties.insert(param.name.clone(), json!({ "type": param.ty.json_type() }));
    }
    let required: Vec<Value> = params.iter().map(|p| Value::String(p.name.clone())).collect();

    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    schema.insert("required".into(), Value::Array(required));
    schema
}

/// Convert an argument to the declared type, accepting the usual lenient
/// spellings (numeric strings, "true"/"false").
fn coerce(ty: ParamType, value: &Value) -> Option<Value> {
    match (ty, value) {
        (ParamType::String, Value::String(_)) => Some(value.clone()),
        (ParamType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ParamType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

        (ParamType::Integer, Value::Number(n)) => {
            if n.is_i64() || n.is_u64() {
                Some(value.clone())
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| Value::from(f as i64))
            }
        }
        (ParamType::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),

        (ParamType::Float, Value::Number(n)) => {
            n.as_f64().and_then(Number::from_f64).map(Value::Number)
        }
        (ParamType::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),

        (ParamType::Boolean, Value::Bool(_)) => Some(value.clone()),
        (ParamType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },

        _ => None,
    }
}

/// Percent-encode everything except RFC 3986 unreserved characters.
fn encode_path_segment(raw: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(raw.len());
    for &b in raw.as_bytes() {
        if matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

/// Text form of a coerced scalar, used for path and query values.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
