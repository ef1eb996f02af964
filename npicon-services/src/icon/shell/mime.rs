// SPDX-License-Identifier: LGPL-3.0-only
//! Maps files to freedesktop icon names via their MIME type.

use std::path::Path;

/// Extensions mime_guess2 gets wrong or does not know.
const MIME_OVERRIDES: &[(&str, &str)] = &[("toml", "text/x-toml"), ("rs", "text/x-rust")];

/// Detect a file's MIME type.
///
/// Extension first (override table, then mime_guess2); files without a
/// usable extension are sniffed by content. Returns `None` when nothing
/// better than `application/octet-stream` is known.
pub fn detect_mime_type(path: &Path) -> Option<String> {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let ext = ext.to_lowercase();
        if let Some((_, mime)) = MIME_OVERRIDES.iter().find(|(o, _)| *o == ext) {
            return Some(mime.to_string());
        }
        if let Some(mime) = mime_guess2::from_ext(&ext).first() {
            return Some(mime.to_string());
        }
    }

    let sniffed = tree_magic_mini::from_filepath(path)?;
    if sniffed == "application/octet-stream" {
        log::debug!("MIME: Only got octet-stream for {:?}", path);
        None
    } else {
        Some(sniffed.to_string())
    }
}

/// Icon names to try for a MIME type, most specific first.
///
/// `text/x-python` yields `text-x-python`, then `text-x-generic`.
pub fn icon_names_for_mime(mime: &str) -> Vec<String> {
    let Some((main_type, sub_type)) = mime.split_once('/') else {
        return vec!["unknown".to_string()];
    };

    let mut names = Vec::with_capacity(3);
    names.push(format!("{}-{}", main_type, sub_type.replace(['/', '+', '.'], "-")));

    if main_type == "inode" && sub_type == "directory" {
        return vec!["folder".to_string()];
    }

    names.push(generic_icon_name(main_type).to_string());
    names.dedup();
    names
}

fn generic_icon_name(main_type: &str) -> &'static str {
    match main_type {
        "text" => "text-x-generic",
        "image" => "image-x-generic",
        "audio" => "audio-x-generic",
        "video" => "video-x-generic",
        "font" => "font-x-generic",
        "application" => "application-x-generic",
        _ => "unknown",
    }
}

/// Icon names to try for a path, ending with the catch-all `unknown`.
pub fn icon_names_for_path(path: &Path, is_dir: bool) -> Vec<String> {
    let mut names = if is_dir {
        vec!["folder".to_string()]
    } else {
        match detect_mime_type(path) {
            Some(mime) => icon_names_for_mime(&mime),
            None => vec!["application-x-generic".to_string()],
        }
    };

    if is_dir {
        names.push("inode-directory".to_string());
    } else if !names.iter().any(|n| n == "text-x-generic") {
        names.push("text-x-generic".to_string());
    }
    names.push("unknown".to_string());
    names
}
