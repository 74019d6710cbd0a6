//! Two-line element sets: downloading fresh ones and reading them from disk.

use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Element lines are the only lines this long in a TLE file.
const MIN_ELEMENT_LINE_LEN: usize = 50;

#[derive(Debug, Error)]
pub enum ElementsError {
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("download failed: {0}")]
    Network(String),
    #[error("invalid element set: {0}")]
    Parse(String),
}

/// Downloads the element set at `url` into `tmp_file`, then copies it over `file`.
///
/// `file` is left untouched unless the download succeeds and holds an element set.
pub async fn update(url: &str, tmp_file: &Path, file: &Path) -> Result<(), ElementsError> {
    info!(url, "Downloading orbital elements");

    let client = reqwest::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(|e| ElementsError::Network(format!("failed to create HTTP client: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ElementsError::Network(format!("request failed: {e}")))?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(ElementsError::Network(format!(
            "server answered {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ElementsError::Network(format!("failed to read response: {e}")))?;

    // Reject anything that would not load later, such as an HTML error page.
    parse(&body)?;

    tokio::fs::write(tmp_file, &body)
        .await
        .map_err(|source| ElementsError::Io {
            path: tmp_file.to_path_buf(),
            source,
        })?;

    tokio::fs::copy(tmp_file, file)
        .await
        .map_err(|source| ElementsError::Io {
            path: file.to_path_buf(),
            source,
        })?;

    info!(file = %file.display(), "Orbital elements updated");

    Ok(())
}

/// Reads the first element set in `path`.
pub fn load(path: &Path) -> Result<sgp4::Elements, ElementsError> {
    let text = std::fs::read_to_string(path).map_err(|source| ElementsError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse(&text)
}

/// Parses the first element set in `text`.
///
/// The first two long lines are the element lines. The closest short,
/// non-empty line before them, if any, names the object.
pub fn parse(text: &str) -> Result<sgp4::Elements, ElementsError> {
    let mut name = None;
    let mut lines = Vec::with_capacity(2);

    for line in text.lines().map(str::trim) {
        if line.len() > MIN_ELEMENT_LINE_LEN {
            lines.push(line);

            if lines.len() == 2 {
                break;
            }
        } else if !line.is_empty() && lines.is_empty() {
            name = Some(line.to_owned());
        }
    }

    let [line1, line2] = lines[..] else {
        return Err(ElementsError::Parse(format!(
            "expected two element lines, found {}",
            lines.len()
        )));
    };

    debug!(?name, line1, line2, "Parsing element set");

    sgp4::Elements::from_tle(name, line1.as_bytes(), line2.as_bytes())
        .map_err(|e| ElementsError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ISS: &str = "ISS (ZARYA)
1 25544U 98067A   25186.50618345  .00006730  00000+0  12412-3 0  9992
2 25544  51.6343 216.2777 0002492 336.9059  23.1817 15.50384048518002
";

    #[test]
    fn parses_named_element_set() {
        let elements = parse(ISS).unwrap();

        assert_eq!(elements.object_name.as_deref(), Some("ISS (ZARYA)"));
        assert_eq!(elements.norad_id, 25544);
    }

    #[test]
    fn name_line_is_optional() {
        let unnamed = ISS.lines().skip(1).collect::<Vec<_>>().join("\n");

        let elements = parse(&unnamed).unwrap();

        assert_eq!(elements.object_name, None);
        assert_eq!(elements.norad_id, 25544);
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let padded = format!("\n\n  {}\r\n", ISS.replace('\n', "\r\n  "));

        let elements = parse(&padded).unwrap();

        assert_eq!(elements.norad_id, 25544);
    }

    #[test]
    fn missing_second_line_is_a_parse_error() {
        let truncated = ISS.lines().take(2).collect::<Vec<_>>().join("\n");

        assert!(matches!(parse(&truncated), Err(ElementsError::Parse(_))));
    }

    #[test]
    fn html_error_page_is_rejected() {
        let page = "<html><body><h1>404 Not Found</h1></body></html>";

        assert!(matches!(parse(page), Err(ElementsError::Parse(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ISS.as_bytes()).unwrap();

        let elements = load(file.path()).unwrap();

        assert_eq!(elements.norad_id, 25544);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iss.txt");

        assert!(matches!(load(&path), Err(ElementsError::Io { .. })));
    }
}
