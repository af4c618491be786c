use std::env;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.toml";

pub fn get_base_dir() -> PathBuf {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if has_config_candidate(&exe_dir) {
        return exe_dir;
    }

    // Without a config next to the binary, a fresh config lands in the
    // working directory.
    env::current_dir().unwrap_or(exe_dir)
}

pub fn resolve_config_path(raw: Option<String>, base_dir: &Path) -> PathBuf {
    if let Some(path) = raw {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            return path;
        }
        if let Ok(cwd) = env::current_dir() {
            return cwd.join(path);
        }
        return path;
    }

    let candidates = [
        base_dir.join(CONFIG_FILE_NAME),
        base_dir.join("config").join(CONFIG_FILE_NAME),
    ];
    for path in candidates {
        if path.exists() {
            return path;
        }
    }

    base_dir.join(CONFIG_FILE_NAME)
}

fn has_config_candidate(base_dir: &Path) -> bool {
    base_dir.join(CONFIG_FILE_NAME).exists()
        || base_dir.join("config").join(CONFIG_FILE_NAME).exists()
}
