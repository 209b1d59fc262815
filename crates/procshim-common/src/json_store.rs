//! JSON file writer
//!
//! Serializes a value with `JSON.stringify`-style options (key replacer and
//! indentation), appends a single trailing newline and writes it out with the
//! caller's append/create/mode flags.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{ser::PrettyFormatter, Map, Value};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Maximum indentation width, matching `JSON.stringify`
const MAX_INDENT: usize = 10;

/// JSON store errors
#[derive(Debug, Error)]
pub enum JsonStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding failed; the message is prefixed with the target file path
    #[error("{path}: {message}")]
    Serialize { path: String, message: String },

    #[error("JSON deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("File not found: {path}")]
    NotFound { path: String },
}

/// Result type for JSON store operations
pub type JsonStoreResult<T> = Result<T, JsonStoreError>;

/// Replacer callback: receives the member key (`""` for the root, the decimal
/// index for array items) and returns the value to emit, or `None` to drop it.
pub type ReplacerFn = dyn Fn(&str, &Value) -> Option<Value> + Send + Sync;

/// Filter applied while encoding
#[derive(Clone)]
pub enum Replacer {
    /// Keep only these object keys, at every depth, in this order
    Keys(Vec<String>),
    /// Transform or drop each member
    Func(Arc<ReplacerFn>),
}

impl Replacer {
    /// Build a key allow-list replacer
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Replacer::Keys(keys.into_iter().map(Into::into).collect())
    }

    /// Build a function replacer
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        Replacer::Func(Arc::new(f))
    }
}

impl fmt::Debug for Replacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacer::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            Replacer::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// Indentation setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spaces {
    /// Number of spaces, clamped to 10
    Count(usize),
    /// Literal indent string, truncated to 10 characters
    Text(String),
}

impl Spaces {
    /// Resolved indent string, or `None` for compact output
    pub fn indent(&self) -> Option<String> {
        let indent = match self {
            Spaces::Count(n) => " ".repeat((*n).min(MAX_INDENT)),
            Spaces::Text(s) => s.chars().take(MAX_INDENT).collect(),
        };
        (!indent.is_empty()).then_some(indent)
    }
}

impl From<usize> for Spaces {
    fn from(n: usize) -> Self {
        Spaces::Count(n)
    }
}

impl From<&str> for Spaces {
    fn from(s: &str) -> Self {
        Spaces::Text(s.to_string())
    }
}

/// Options for [`write_json`] and [`write_json_sync`]
#[derive(Debug, Clone)]
pub struct WriteJsonOptions {
    pub replacer: Option<Replacer>,
    pub spaces: Option<Spaces>,
    /// Append to the file instead of truncating it
    pub append: bool,
    /// Create the file if missing
    pub create: bool,
    /// Permission bits for a newly created file (unix only)
    pub mode: Option<u32>,
}

impl Default for WriteJsonOptions {
    fn default() -> Self {
        Self {
            replacer: None,
            spaces: None,
            append: false,
            create: true,
            mode: None,
        }
    }
}

impl WriteJsonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replacer(mut self, replacer: Replacer) -> Self {
        self.replacer = Some(replacer);
        self
    }

    pub fn spaces(mut self, spaces: impl Into<Spaces>) -> Self {
        self.spaces = Some(spaces.into());
        self
    }

    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Encode `value` the way `writeJson` would, including the trailing newline
pub fn to_json_string<T>(path: &Path, value: &T, options: &WriteJsonOptions) -> JsonStoreResult<String>
where
    T: Serialize + ?Sized,
{
    let serialize_err = |message: String| JsonStoreError::Serialize {
        path: path.display().to_string(),
        message,
    };

    let value = serde_json::to_value(value).map_err(|e| serialize_err(e.to_string()))?;
    let value = match &options.replacer {
        Some(replacer) => apply_replacer(replacer, value)
            .ok_or_else(|| serialize_err("replacer dropped the root value".to_string()))?,
        None => value,
    };

    let indent = options.spaces.as_ref().and_then(Spaces::indent);
    let mut out = match indent {
        Some(indent) => {
            let mut buf = Vec::new();
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
            value
                .serialize(&mut ser)
                .map_err(|e| serialize_err(e.to_string()))?;
            String::from_utf8(buf).map_err(|e| serialize_err(e.to_string()))?
        }
        None => serde_json::to_string(&value).map_err(|e| serialize_err(e.to_string()))?,
    };
    out.push('\n');
    Ok(out)
}

fn apply_replacer(replacer: &Replacer, value: Value) -> Option<Value> {
    match replacer {
        Replacer::Keys(keys) => Some(filter_keys(keys, value)),
        Replacer::Func(f) => replace_with(f.as_ref(), "", value),
    }
}

fn filter_keys(keys: &[String], value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            let mut filtered = Map::new();
            for key in keys {
                if filtered.contains_key(key) {
                    continue;
                }
                if let Some(child) = map.remove(key) {
                    filtered.insert(key.clone(), filter_keys(keys, child));
                }
            }
            Value::Object(filtered)
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| filter_keys(keys, v)).collect())
        }
        other => other,
    }
}

fn replace_with(f: &ReplacerFn, key: &str, value: Value) -> Option<Value> {
    match f(key, &value)? {
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, child) in map {
                if let Some(child) = replace_with(f, &k, child) {
                    out.insert(k, child);
                }
            }
            Some(Value::Object(out))
        }
        // dropped array items become null, as in JSON.stringify
        Value::Array(items) => Some(Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, child)| replace_with(f, &i.to_string(), child).unwrap_or(Value::Null))
                .collect(),
        )),
        other => Some(other),
    }
}

/// Write `value` as JSON to `path`
pub async fn write_json<T, P>(path: P, value: &T, options: &WriteJsonOptions) -> JsonStoreResult<()>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = to_json_string(path, value, options)?;

    let mut open = tokio::fs::OpenOptions::new();
    if options.append {
        open.append(true);
    } else {
        open.write(true).truncate(true);
    }
    open.create(options.create);
    #[cfg(unix)]
    if let Some(mode) = options.mode {
        open.mode(mode);
    }

    let mut file = open.open(path).await?;
    // open-time mode only covers new files and is masked by the umask
    #[cfg(unix)]
    if let Some(mode) = options.mode {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(mode))
            .await?;
    }
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;

    debug!(path = %path.display(), bytes = content.len(), "Wrote JSON file");
    Ok(())
}

/// Blocking variant of [`write_json`]
pub fn write_json_sync<T, P>(path: P, value: &T, options: &WriteJsonOptions) -> JsonStoreResult<()>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = to_json_string(path, value, options)?;

    let mut open = std::fs::OpenOptions::new();
    if options.append {
        open.append(true);
    } else {
        open.write(true).truncate(true);
    }
    open.create(options.create);
    #[cfg(unix)]
    if let Some(mode) = options.mode {
        use std::os::unix::fs::OpenOptionsExt;
        open.mode(mode);
    }

    let mut file = open.open(path)?;
    #[cfg(unix)]
    if let Some(mode) = options.mode {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(mode))?;
    }
    file.write_all(content.as_bytes())?;

    debug!(path = %path.display(), bytes = content.len(), "Wrote JSON file");
    Ok(())
}

/// Load JSON from a file path
pub fn load_json<T, P>(path: P) -> JsonStoreResult<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Err(JsonStoreError::NotFound {
            path: path.display().to_string(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let value = serde_json::from_str(&content)?;
    Ok(value)
}
