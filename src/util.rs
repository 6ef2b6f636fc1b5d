use std::path::{Path, PathBuf};

use colored::Colorize;

pub enum LogType {
    Info,
    Warning,
    Error,
}

pub fn log(msg: String, log_type: LogType) {
    match log_type {
        LogType::Info => println!("{}", msg),
        LogType::Warning => println!("{}", msg.yellow()),
        LogType::Error => println!("{}", msg.red().bold()),
    }
}

pub fn home_path(name: &str) -> PathBuf {
    match home::home_dir() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Turn a clip or track name into something every filesystem accepts.
pub fn sanitize_filename(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect();
    out = out.trim_matches(|c| c == '.' || c == ' ').to_string();
    if out.chars().count() > 200 {
        out = out.chars().take(200).collect();
    }
    if out.is_empty() {
        out = "unnamed".to_string();
    }
    out
}

/// First `<stem>.<ext>` style path in `dir` that doesn't exist yet,
/// counting up with `_1`, `_2`, ... suffixes on collision.
pub fn unique_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let mut path = dir.join(format!("{}.{}", stem, extension));
    let mut counter = 1;
    while path.exists() {
        path = dir.join(format!("{}_{}.{}", stem, counter, extension));
        counter += 1;
    }
    path
}
