use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use tempfile::NamedTempFile;

use crate::consolidator::{ConsolidationSummary, Consolidator};
use crate::error::ConsolidateError;
use crate::gpx_types::SourceDocument;
use crate::options::ConsolidateOptions;
use crate::parser::parse_gpx;
use crate::writer::write_gpx;

type Result<T> = std::result::Result<T, ConsolidateError>;

pub const GPX_EXTENSION: &str = "gpx";
pub const DEFAULT_INPUT_DIR: &str = "./gpx_files";
pub const DEFAULT_OUTPUT: &str = "./consolidated.gpx";

/// Everything one consolidation run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub output: PathBuf,
    pub options: ConsolidateOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output: PathBuf::from(DEFAULT_OUTPUT),
            options: ConsolidateOptions::default(),
        }
    }
}

/// Merge every GPX file of the input directory into the output file.
///
/// The output check happens before any input is touched, and the output only
/// appears once the whole document has been written.
pub fn run(config: &RunConfig) -> Result<ConsolidationSummary> {
    ensure_output_absent(&config.output)?;
    let files = discover_gpx_files(&config.input_dir)?;
    info!("Found {} GPX files to process", files.len());

    let mut consolidator = Consolidator::new(config.options.clone());
    for path in &files {
        debug!("reading {}", path.display());
        consolidator.add_source(read_source(path)?);
    }

    let (document, summary) = consolidator.finish();
    let xml = write_gpx(&document)?;
    write_atomically(&config.output, &xml)?;
    info!(
        "Successfully created consolidated file: {}",
        config.output.display()
    );
    Ok(summary)
}

pub fn ensure_output_absent(path: &Path) -> Result<()> {
    if path.exists() || path.is_symlink() {
        return Err(ConsolidateError::Configuration(format!(
            "output file {} already exists",
            path.display()
        )));
    }
    Ok(())
}

/// Regular `*.gpx` files directly inside `dir`, sorted by path.
pub fn discover_gpx_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ConsolidateError::Configuration(format!(
            "input directory {} does not exist or is not a directory",
            dir.display()
        )));
    }

    let entries = fs::read_dir(dir)
        .map_err(|e| ConsolidateError::io(format!("cannot list {}", dir.display()), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| ConsolidateError::io(format!("cannot list {}", dir.display()), e))?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == GPX_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(ConsolidateError::Configuration(format!(
            "no GPX files found in {}",
            dir.display()
        )));
    }
    Ok(files)
}

/// File name with its extension stripped.
pub fn base_name_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parse in-memory GPX text that came from a file called `file_name`.
pub fn source_from_str(file_name: &str, xml: &str) -> Result<SourceDocument> {
    let data = parse_gpx(xml).map_err(|source| ConsolidateError::Parse {
        source_name: file_name.to_string(),
        source,
    })?;
    Ok(SourceDocument {
        base_name: base_name_of(Path::new(file_name)),
        data,
    })
}

pub fn read_source(path: &Path) -> Result<SourceDocument> {
    let xml = fs::read_to_string(path)
        .map_err(|e| ConsolidateError::io(format!("cannot read {}", path.display()), e))?;
    let data = parse_gpx(&xml).map_err(|source| ConsolidateError::Parse {
        source_name: path.display().to_string(),
        source,
    })?;
    Ok(SourceDocument {
        base_name: base_name_of(path),
        data,
    })
}

/// Write through a temporary file next to `path`, then move it into place
/// without replacing anything that appeared there in the meantime.
pub fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let context = || format!("cannot write {}", path.display());

    let mut file = NamedTempFile::new_in(dir).map_err(|e| ConsolidateError::io(context(), e))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| ConsolidateError::io(context(), e))?;
    file.as_file()
        .sync_all()
        .map_err(|e| ConsolidateError::io(context(), e))?;

    file.persist_noclobber(path).map_err(|e| {
        if e.error.kind() == ErrorKind::AlreadyExists {
            ConsolidateError::Configuration(format!(
                "output file {} already exists",
                path.display()
            ))
        } else {
            ConsolidateError::io(context(), e.error)
        }
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TRACK: &str = r#"<gpx><trk><trkseg><trkpt lat="1" lon="2"/></trkseg></trk></gpx>"#;

    #[test]
    fn test_base_name_strips_extension() {
        assert_eq!(base_name_of(Path::new("dir/morning.gpx")), "morning");
        assert_eq!(base_name_of(Path::new("track.v2.gpx")), "track.v2");
        assert_eq!(base_name_of(Path::new("plain")), "plain");
    }

    #[test]
    fn test_discover_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.gpx"), TRACK).unwrap();
        fs::write(dir.path().join("a.gpx"), TRACK).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("sub.gpx")).unwrap();

        let files = discover_gpx_files(dir.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| base_name_of(p)).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_discover_refuses_missing_or_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            discover_gpx_files(dir.path()),
            Err(ConsolidateError::Configuration(_))
        ));
        assert!(matches!(
            discover_gpx_files(&dir.path().join("missing")),
            Err(ConsolidateError::Configuration(_))
        ));
    }

    #[test]
    fn test_existing_output_refused() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.gpx");
        assert!(ensure_output_absent(&out).is_ok());
        fs::write(&out, "keep").unwrap();
        assert!(ensure_output_absent(&out).is_err());
    }

    #[test]
    fn test_run_checks_output_before_reading_inputs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.gpx"), "<gpx><trk></gpx>").unwrap();
        let output = dir.path().join("out.gpx");
        fs::write(&output, "keep").unwrap();

        let config = RunConfig {
            input_dir: dir.path().to_path_buf(),
            output: output.clone(),
            ..Default::default()
        };
        match run(&config) {
            Err(ConsolidateError::Configuration(msg)) => assert!(msg.contains("already exists")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(fs::read_to_string(&output).unwrap(), "keep");
    }

    #[test]
    fn test_write_atomically_does_not_clobber() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.gpx");
        write_atomically(&out, "first").unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "first");

        let err = write_atomically(&out, "second").unwrap_err();
        assert!(matches!(err, ConsolidateError::Configuration(_)));
        assert_eq!(fs::read_to_string(&out).unwrap(), "first");
        // No temporary files left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_source_from_str_reports_name_on_parse_error() {
        let err = source_from_str("broken.gpx", "<gpx><trk></gpx>").unwrap_err();
        match err {
            ConsolidateError::Parse { source_name, .. } => assert_eq!(source_name, "broken.gpx"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
