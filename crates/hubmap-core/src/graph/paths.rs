//! Repository-relative path helpers.

/// Replace backslashes and resolve `.` / `..` segments.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                if !parts.is_empty() && parts.last() != Some(&"..") {
                    parts.pop();
                }
            }
            _ => parts.push(segment),
        }
    }
    parts.join("/")
}

/// Directory part of a repo-relative path (`""` for files at the root).
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[..pos],
        None => "",
    }
}

pub fn join(dir: &str, rel: &str) -> String {
    if dir.is_empty() {
        normalize_path(rel)
    } else {
        normalize_path(&format!("{dir}/{rel}"))
    }
}

/// Drop a trailing source extension and collapse a trailing `/index`, so
/// `src/Card/index.tsx`, `src/Card/index` and `src/Card` all become `src/Card`.
pub fn to_module_path(path: &str, extensions: &[String]) -> String {
    let mut module = path;
    if let Some((stem, ext)) = module.rsplit_once('.') {
        if !stem.is_empty() && !ext.contains('/') && extensions.iter().any(|e| e == ext) {
            module = stem;
        }
    }
    if module == "index" {
        return String::new();
    }
    module.strip_suffix("/index").unwrap_or(module).to_string()
}
