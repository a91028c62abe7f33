use std::path::PathBuf;

use percent_encoding::percent_decode_str;
use url::Url;

/// Percent-decode the path component of a locator.
#[must_use]
pub fn decode_path(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

/// The directory a source document's relative paths are resolved against.
///
/// `id` is normally a locator such as `tmsource:///home/me/project`, whose
/// decoded path is the project directory. Anything that does not parse as a
/// URL with a real scheme is taken to be a filesystem path.
#[must_use]
pub fn base_dir(id: &str) -> Option<PathBuf> {
    if id.is_empty() {
        return None;
    }
    match Url::parse(id) {
        // a single letter scheme is a windows drive, e.g. C:\projects
        Ok(url) if url.scheme().len() > 1 => {
            let path = format!("{}{}", url.host_str().unwrap_or_default(), url.path());
            if path.is_empty() {
                None
            } else {
                Some(PathBuf::from(decode_path(&path)))
            }
        }
        _ => Some(PathBuf::from(id)),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::locator("tmsource:///projects/demo", "/projects/demo")]
    #[case::escaped("tmsource:///projects/my%20demo", "/projects/my demo")]
    #[case::file_url("file:///srv/tiles", "/srv/tiles")]
    #[case::plain_path("/projects/demo", "/projects/demo")]
    #[case::relative_path("demo/project", "demo/project")]
    fn resolves_base_dir(#[case] id: &str, #[case] expected: &str) {
        assert_eq!(base_dir(id), Some(PathBuf::from(expected)));
    }

    #[test]
    fn empty_id_has_no_base() {
        assert_eq!(base_dir(""), None);
    }

    #[test]
    fn decodes_utf8() {
        assert_eq!(decode_path("/caf%C3%A9"), "/café");
    }
}
