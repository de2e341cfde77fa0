use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    /// Defaults, then the rc file at `path`, then the environment.
    pub fn load_from(path: &Path) -> Self {
        let mut map = default_map();

        if let Ok(file) = fs::File::open(path) {
            merge_rc(&mut map, BufReader::new(file));
        }

        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path: path.to_path_buf() }
    }

    /// Defaults only, ignoring the rc file and environment.
    pub fn defaults() -> Self {
        Self { inner: default_map(), config_path: default_config_path() }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_secs(&self, key: &str, default: u64) -> Duration {
        Duration::from_secs(self.get_u64(key).unwrap_or(default))
    }

    pub fn get_millis(&self, key: &str, default: u64) -> Duration {
        Duration::from_millis(self.get_u64(key).unwrap_or(default))
    }

    pub fn preview_path(&self) -> PathBuf {
        self.get("PREVIEW_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("neoncode").join("preview.html"))
    }
}

fn merge_rc(map: &mut HashMap<String, String>, reader: impl BufRead) {
    for line in reader.lines().map_while(Result::ok) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "API_BASE_URL",
        "REQUEST_TIMEOUT",
        "ANALYSIS_TIMEOUT",
        "DEFAULT_MODEL",
        "PYTHON_BIN",
        "BOOTSTRAP_TIMEOUT",
        "PREVIEW_DEBOUNCE_MS",
        "PREVIEW_PATH",
        "AUTO_PREVIEW",
        "PRETTIFY_MARKDOWN",
    ];

    KEYS.contains(&k) || k.starts_with("NEONCODE_") || k.starts_with("OPENAI_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("neoncode").join(".neoncoderc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    let temp = env::temp_dir().join("neoncode");

    m.insert(
        "PREVIEW_PATH".into(),
        temp.join("preview.html").to_string_lossy().into_owned(),
    );

    // Numbers
    m.insert("REQUEST_TIMEOUT".into(), "60".into());
    m.insert("ANALYSIS_TIMEOUT".into(), "30".into());
    m.insert("BOOTSTRAP_TIMEOUT".into(), "30".into());
    m.insert("PREVIEW_DEBOUNCE_MS".into(), "500".into());

    // Strings
    m.insert("DEFAULT_MODEL".into(), "gpt-4o".into());
    m.insert("API_BASE_URL".into(), "default".into());
    m.insert("PYTHON_BIN".into(), "auto".into());

    // Bools as strings
    m.insert("AUTO_PREVIEW".into(), "true".into());
    m.insert("PRETTIFY_MARKDOWN".into(), "true".into());

    m
}
