//! Navigation operations implementation

use crate::error::PathError;

/// Resolves a client path parameter against the current directory.
///
/// The result always starts with `/` and has no trailing slash unless it is
/// the root. `.` and `..` segments are collapsed; `..` never climbs above
/// the root. A resolved path longer than `capacity` bytes is rejected.
pub fn resolve_path(current_directory: &str, param: &str, capacity: usize) -> Result<String, PathError> {
    if param.is_empty() || param == "/" {
        return Ok("/".to_string());
    }

    let candidate = if param.starts_with('/') {
        param.to_string()
    } else if current_directory.ends_with('/') {
        format!("{current_directory}{param}")
    } else {
        format!("{current_directory}/{param}")
    };

    let resolved = normalize(&candidate);
    if resolved.len() > capacity {
        return Err(PathError::TooLong {
            len: resolved.len(),
            capacity,
        });
    }

    Ok(resolved)
}

fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Strips the last segment of `current_directory`; the root stays the root.
pub fn parent_directory(current_directory: &str) -> String {
    let trimmed = current_directory.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => trimmed[..index].to_string(),
    }
}
