// Output planner - pure mapping from probe result + request to an output plan

use std::path::{Path, PathBuf};

use super::models::{MediaRequest, OutputPlan, ProbeResult};

/// Directory for items that are not part of a collection.
pub const SINGLES_DIR: &str = "all";

/// Fetcher placeholder used when a collection has no usable title.
const COLLECTION_TITLE_PLACEHOLDER: &str = "%(playlist_title)s";

const SINGLE_FILE_TEMPLATE: &str = "%(title)s.%(ext)s";
const COLLECTION_FILE_TEMPLATE: &str = "%(playlist_index)03d - %(title)s.%(ext)s";

/// Plan where and how the fetcher writes `probe`'s media.
///
/// Collections go to `<base>/<media>/<collection title>/NNN - <title>.<ext>`,
/// single items to `<base>/<media>/all/<title>.<ext>`.
pub fn plan(probe: &ProbeResult, request: &MediaRequest, base_dir: &Path) -> OutputPlan {
    let destination = base_dir.join(request.media_dir());
    // the fetcher expands `%` anywhere in the template, including the base path
    let template_root = PathBuf::from(escape_template(&destination.to_string_lossy()));

    let template = if probe.is_collection() {
        let dir = probe
            .collection_title()
            .map(collection_dir_name)
            // empty, "." and ".." are not usable directory names
            .filter(|name| !name.chars().all(|c| c == '.'))
            .unwrap_or_else(|| COLLECTION_TITLE_PLACEHOLDER.to_string());
        template_root.join(dir).join(COLLECTION_FILE_TEMPLATE)
    } else {
        template_root.join(SINGLES_DIR).join(SINGLE_FILE_TEMPLATE)
    };

    OutputPlan {
        template: template.to_string_lossy().into_owned(),
        is_collection: probe.is_collection(),
        destination,
        format: request.format_selector(),
        postprocessors: request.postprocessors(),
        merge_output_format: request.merge_output_format(),
    }
}

/// Make a literal collection title safe as one template path segment.
///
/// Separators would split the segment and `%` would be read as a placeholder.
fn collection_dir_name(title: &str) -> String {
    let segment: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect();
    escape_template(&segment)
}

/// Escape literal text so the fetcher does not expand it as a placeholder.
fn escape_template(text: &str) -> String {
    text.replace('%', "%%")
}
