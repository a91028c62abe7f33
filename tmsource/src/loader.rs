//! Opening `tmsource://` projects.
//!
//! A project is a directory holding a `data.yml` document. Opening it reads
//! and parses the document, normalizes it and compiles the stylesheet. The
//! result can then be handed to a [`RenderDelegate`].

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::fs;
use std::io;
use std::path::{self, Path, PathBuf};

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Serialize;
use serde_yaml::Value;
use tilejson::VectorLayer;
use tmsource_core::source::{Normalizer, Source, decode_path};
use tmsource_core::stylesheet::{MapnikXmlCompiler, StylesheetCompiler, assemble};
use tmsource_core::to_sorted_yaml;
use tracing::{debug, info};
use url::Url;

use crate::{TmError, TmResult};

/// Protocol served by [`TmSource`].
pub const PROTOCOL: &str = "tmsource:";

/// Name of the document inside a project directory.
pub const DOCUMENT: &str = "data.yml";

/// Characters escaped in the path of a locator.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Error returned by a [`RenderDelegate`].
pub type DelegateError = Box<dyn Error + Send + Sync>;

/// The project directory a `tmsource://` locator points to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Locator {
    dir: PathBuf,
}

impl Locator {
    /// Parse a `tmsource://` locator.
    ///
    /// Host and path are joined, so `tmsource://./project` and
    /// `tmsource:///home/me/project` both work. Relative paths are resolved
    /// against the current directory.
    pub fn parse(locator: &str) -> TmResult<Self> {
        let invalid = |reason: String| TmError::InvalidLocator(locator.to_string(), reason);
        let url = Url::parse(locator).map_err(|e| invalid(e.to_string()))?;
        if format!("{}:", url.scheme()) != PROTOCOL {
            return Err(invalid(format!("expected the {PROTOCOL} protocol")));
        }
        let path = decode_path(&format!("{}{}", url.host_str().unwrap_or_default(), url.path()));
        if path.is_empty() {
            return Err(invalid("no project directory".to_string()));
        }
        Self::from_path(Path::new(&path)).map_err(|e| invalid(e.to_string()))
    }

    /// The locator of the project directory `dir`.
    pub fn from_path(dir: &Path) -> io::Result<Self> {
        Ok(Self {
            dir: path::absolute(dir)?,
        })
    }

    /// Absolute path of the project directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the project's document.
    #[must_use]
    pub fn document(&self) -> PathBuf {
        self.dir.join(DOCUMENT)
    }
}

impl Display for Locator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let dir = self.dir.to_string_lossy();
        write!(f, "{PROTOCOL}//{}", utf8_percent_encode(&dir, PATH))
    }
}

/// Normalizer and stylesheet compiler used to open projects.
pub struct Pipeline {
    normalizer: Normalizer,
    compiler: Box<dyn StylesheetCompiler>,
}

impl Debug for Pipeline {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Normalizer::default())
    }
}

impl Pipeline {
    /// A pipeline compiling Mapnik XML.
    #[must_use]
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            compiler: Box::new(MapnikXmlCompiler),
        }
    }

    /// Replace the stylesheet compiler.
    #[must_use]
    pub fn with_compiler(mut self, compiler: impl StylesheetCompiler + 'static) -> Self {
        self.compiler = Box::new(compiler);
        self
    }

    #[must_use]
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}

/// Receives the compiled stylesheet of a project, e.g. to render tiles.
pub trait RenderDelegate {
    /// `base` is the directory relative paths in `stylesheet` are resolved against.
    fn render(&self, stylesheet: &str, base: &Path) -> Result<(), DelegateError>;
}

/// An opened project.
#[derive(Clone, Debug)]
pub struct TmSource {
    locator: Locator,
    info: Source,
    stylesheet: String,
}

#[derive(Serialize)]
struct VectorLayers<'a> {
    vector_layers: &'a [VectorLayer],
}

impl TmSource {
    /// Parse `locator`, then [`load`](Self::load) the project.
    pub fn open(locator: &str, pipeline: &Pipeline) -> TmResult<Self> {
        Self::load(Locator::parse(locator)?, pipeline)
    }

    /// Read, normalize and compile the project at `locator`.
    ///
    /// The document `id` is always replaced by the locator.
    pub fn load(locator: Locator, pipeline: &Pipeline) -> TmResult<Self> {
        let id = locator.to_string();
        let path = locator.document();
        info!("Loading {id}");

        let text = fs::read_to_string(&path).map_err(|e| TmError::Load(e, id.clone()))?;
        let mut document: Value =
            serde_yaml::from_str(&text).map_err(|e| TmError::Parse(e, id.clone()))?;
        if let Value::Mapping(map) = &mut document {
            map.insert("id".into(), id.clone().into());
        }

        let info = pipeline
            .normalizer
            .normalize(document)
            .map_err(|e| TmError::Normalize(e, id.clone()))?;
        debug!("Normalized {id} with {} layer(s)", info.layers.len());

        let stylesheet = assemble(&info, pipeline.compiler.as_ref())
            .map_err(|e| TmError::Assemble(e, id.clone()))?;

        Ok(Self {
            locator,
            info,
            stylesheet,
        })
    }

    #[must_use]
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// The normalized document.
    #[must_use]
    pub fn info(&self) -> &Source {
        &self.info
    }

    #[must_use]
    pub fn stylesheet(&self) -> &str {
        &self.stylesheet
    }

    /// Directory the stylesheet's relative paths are resolved against.
    #[must_use]
    pub fn base(&self) -> &Path {
        self.locator.dir()
    }

    /// Hand the stylesheet to `delegate`.
    pub fn render(&self, delegate: &dyn RenderDelegate) -> TmResult<()> {
        delegate
            .render(&self.stylesheet, self.base())
            .map_err(|e| TmError::Render(e, self.locator.to_string()))
    }

    /// The normalized document as YAML, with sorted keys.
    pub fn info_yaml(&self) -> TmResult<String> {
        to_sorted_yaml(&self.info).map_err(|e| TmError::YamlError(e, self.locator.to_string()))
    }

    /// `{"vector_layers": [...]}` as pretty printed JSON.
    pub fn vector_layers_json(&self) -> TmResult<String> {
        serde_json::to_string_pretty(&VectorLayers {
            vector_layers: &self.info.vector_layers,
        })
        .map_err(|e| TmError::JsonError(e, self.locator.to_string()))
    }
}

/// Opens a project from a locator.
pub type Opener = fn(&str, &Pipeline) -> TmResult<TmSource>;

/// Maps protocols such as `tmsource:` to the function that opens their locators.
#[derive(Clone, Debug)]
pub struct ProtocolRegistry {
    protocols: BTreeMap<String, Opener>,
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(PROTOCOL, TmSource::open);
        registry
    }
}

impl ProtocolRegistry {
    /// A registry without any protocol.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            protocols: BTreeMap::new(),
        }
    }

    /// Register `opener` for `protocol`, e.g. `tmsource:`. Returns the opener
    /// it replaces.
    pub fn register(&mut self, protocol: &str, opener: Opener) -> Option<Opener> {
        self.protocols.insert(protocol.to_lowercase(), opener)
    }

    /// Registered protocols, in alphabetical order.
    pub fn protocols(&self) -> impl Iterator<Item = &str> {
        self.protocols.keys().map(String::as_str)
    }

    /// Open `locator` with the opener registered for its protocol.
    pub fn open(&self, locator: &str, pipeline: &Pipeline) -> TmResult<TmSource> {
        let opener = locator
            .split_once(':')
            .and_then(|(scheme, _)| self.protocols.get(&format!("{}:", scheme.to_lowercase())))
            .ok_or_else(|| TmError::UnknownProtocol(locator.to_string()))?;
        opener(locator, pipeline)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::absolute("tmsource:///srv/projects/roads", "/srv/projects/roads")]
    #[case::encoded("tmsource:///srv/my%20project", "/srv/my project")]
    fn parses_locators(#[case] locator: &str, #[case] dir: &str) {
        let parsed = Locator::parse(locator).unwrap();
        assert_eq!(parsed.dir(), Path::new(dir));
        assert_eq!(parsed.document(), Path::new(dir).join("data.yml"));
    }

    #[test]
    fn host_is_part_of_the_path() {
        let parsed = Locator::parse("tmsource://projects/roads").unwrap();
        assert_eq!(parsed.dir(), path::absolute("projects/roads").unwrap());
    }

    #[test]
    fn relative_locator_resolves_against_current_dir() {
        let parsed = Locator::parse("tmsource://./roads.tm2source").unwrap();
        assert_eq!(
            parsed.dir(),
            path::absolute("./roads.tm2source").unwrap()
        );
    }

    #[rstest]
    #[case::other_protocol("mbtiles:///tmp/a.mbtiles")]
    #[case::no_protocol("just/a/path")]
    #[case::no_path("tmsource://")]
    fn rejects_locators(#[case] locator: &str) {
        let err = Locator::parse(locator).unwrap_err();
        assert!(matches!(err, TmError::InvalidLocator(ref l, _) if l == locator));
    }

    #[test]
    fn displays_as_locator() {
        let locator = Locator::from_path(Path::new("/srv/roads")).unwrap();
        assert_eq!(locator.to_string(), "tmsource:///srv/roads");
        assert_eq!(Locator::parse(&locator.to_string()).unwrap(), locator);
    }

    #[rstest]
    #[case::fragment("/srv/proj#1", "tmsource:///srv/proj%231")]
    #[case::query("/srv/what?", "tmsource:///srv/what%3F")]
    #[case::escape("/srv/%41", "tmsource:///srv/%2541")]
    #[case::space("/srv/my project", "tmsource:///srv/my%20project")]
    fn escapes_special_characters(#[case] dir: &str, #[case] expected: &str) {
        let locator = Locator::from_path(Path::new(dir)).unwrap();
        assert_eq!(locator.to_string(), expected);
        assert_eq!(Locator::parse(expected).unwrap().dir(), Path::new(dir));
    }

    #[test]
    fn registry_dispatches_on_protocol() {
        let registry = ProtocolRegistry::default();
        assert_eq!(registry.protocols().collect::<Vec<_>>(), ["tmsource:"]);

        let err = registry
            .open("mbtiles:///tmp/a.mbtiles", &Pipeline::default())
            .unwrap_err();
        assert!(matches!(err, TmError::UnknownProtocol(_)));

        let err = registry
            .open("TMSOURCE:///does/not/exist", &Pipeline::default())
            .unwrap_err();
        assert!(matches!(err, TmError::Load(..)));

        let err = ProtocolRegistry::empty()
            .open("tmsource:///does/not/exist", &Pipeline::default())
            .unwrap_err();
        assert!(matches!(err, TmError::UnknownProtocol(_)));
    }
}
