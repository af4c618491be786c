use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use toml::map::Map;
use toml::Value;

use crate::catalog::Catalog;
use crate::provider::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_THINKING_BUDGET};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Json,
    Supabase,
}

impl StoreBackend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" | "file" => Some(StoreBackend::Json),
            "supabase" | "postgrest" => Some(StoreBackend::Supabase),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            StoreBackend::Json => "json",
            StoreBackend::Supabase => "supabase",
        }
    }
}

#[derive(Debug)]
pub struct ConfigStore {
    pub path: PathBuf,
    doc: Value,
}

impl ConfigStore {
    /// Loads the TOML config, filling in defaults and writing the normalized
    /// document back. A missing file is created with defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let doc = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("failed to parse TOML: {}", path.display()))?
        } else {
            Value::Table(Map::new())
        };

        let mut store = Self { path, doc };
        store.normalize_doc();
        store.save()?;
        Ok(store)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir: {}", parent.display()))?;
        }
        let serialized = toml::to_string_pretty(&self.doc).context("failed to serialize TOML")?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write config: {}", self.path.display()))
    }

    pub fn port(&self) -> u16 {
        self.table("app")
            .and_then(|t| t.get("port"))
            .and_then(value_to_i64)
            .and_then(|v| u16::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(3000)
    }

    pub fn data_dir(&self) -> PathBuf {
        let raw = self
            .table("app")
            .and_then(|t| t.get("data_dir"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("data");
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            return path;
        }
        match self.path.parent() {
            Some(parent) => parent.join(path),
            None => path,
        }
    }

    pub fn timer_enabled(&self) -> bool {
        self.table("app")
            .and_then(|t| t.get("timer_enabled"))
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    pub fn model(&self) -> String {
        self.provider_str("model", DEFAULT_MODEL)
    }

    pub fn endpoint(&self) -> String {
        self.provider_str("endpoint", DEFAULT_ENDPOINT)
    }

    pub fn thinking_budget(&self) -> u32 {
        self.table("provider")
            .and_then(|t| t.get("thinking_budget"))
            .and_then(value_to_i64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(DEFAULT_THINKING_BUDGET)
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.table("provider")
            .and_then(|t| t.get("request_timeout_secs"))
            .and_then(value_to_i64)
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(120)
    }

    pub fn store_backend(&self) -> StoreBackend {
        self.table("store")
            .and_then(|t| t.get("backend"))
            .and_then(Value::as_str)
            .and_then(StoreBackend::parse)
            .unwrap_or(StoreBackend::Json)
    }

    /// The `[catalog]` override when it yields a usable catalog, otherwise
    /// the built-in one.
    pub fn catalog(&self) -> Catalog {
        let Some(catalog) = self.table("catalog") else {
            return Catalog::default();
        };

        let domains = tables_in(catalog.get("domains"))
            .map(|t| (text_field(t, "name"), strings_in(t.get("subdomains"))))
            .collect();
        let pieces = tables_in(catalog.get("missing_pieces"))
            .map(|t| (text_field(t, "label"), text_field(t, "description")))
            .collect();
        let groups = tables_in(catalog.get("groups"))
            .map(|t| (text_field(t, "name"), strings_in(t.get("domains"))))
            .collect();

        Catalog::from_entries(domains, pieces, groups).unwrap_or_default()
    }

    fn provider_str(&self, key: &str, default: &str) -> String {
        self.table("provider")
            .and_then(|t| t.get(key))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    }

    fn normalize_doc(&mut self) {
        if !self.doc.is_table() {
            self.doc = Value::Table(Map::new());
        }

        let port = i64::from(self.port());
        let data_dir = self
            .table("app")
            .and_then(|t| t.get("data_dir"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("data")
            .to_string();
        let timer_enabled = self.timer_enabled();
        {
            let app = self.ensure_table_mut("app");
            app.insert("port".to_string(), Value::Integer(port));
            app.insert("data_dir".to_string(), Value::String(data_dir));
            app.insert("timer_enabled".to_string(), Value::Boolean(timer_enabled));
        }

        let model = self.model();
        let endpoint = self.endpoint();
        let budget = i64::from(self.thinking_budget());
        let timeout = i64::try_from(self.request_timeout_secs()).unwrap_or(120);
        {
            let provider = self.ensure_table_mut("provider");
            provider.insert("model".to_string(), Value::String(model));
            provider.insert("endpoint".to_string(), Value::String(endpoint));
            provider.insert("thinking_budget".to_string(), Value::Integer(budget));
            provider.insert("request_timeout_secs".to_string(), Value::Integer(timeout));
        }

        let backend = self.store_backend().as_str().to_string();
        self.ensure_table_mut("store")
            .insert("backend".to_string(), Value::String(backend));
    }

    fn table(&self, name: &str) -> Option<&Map<String, Value>> {
        self.doc
            .as_table()
            .and_then(|root| root.get(name))
            .and_then(Value::as_table)
    }

    fn ensure_table_mut(&mut self, name: &str) -> &mut Map<String, Value> {
        if !self.doc.is_table() {
            self.doc = Value::Table(Map::new());
        }
        let root = self
            .doc
            .as_table_mut()
            .expect("root should be table after normalization");
        let entry = root
            .entry(name.to_string())
            .or_insert_with(|| Value::Table(Map::new()));
        if !entry.is_table() {
            *entry = Value::Table(Map::new());
        }
        entry
            .as_table_mut()
            .expect("entry should be table after normalization")
    }
}

fn tables_in(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .map(|items| items.as_slice())
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_table)
}

fn text_field(table: &Map<String, Value>, key: &str) -> String {
    table.get(key).map(value_to_text).unwrap_or_default()
}

fn strings_in(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().map(value_to_text).collect())
        .unwrap_or_default()
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(v) => v.clone(),
        Value::Integer(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Boolean(v) => v.to_string(),
        Value::Datetime(v) => v.to_string(),
        Value::Array(_) | Value::Table(_) => String::new(),
    }
}

fn value_to_i64(value: &Value) -> Option<i64> {
    value
        .as_integer()
        .or_else(|| value.as_float().map(|v| v as i64))
        .or_else(|| value.as_str().and_then(|v| v.trim().parse::<i64>().ok()))
}
