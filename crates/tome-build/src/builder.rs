//! Build driver: load, resolve, navigate, render, write.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tome_cache::{Cache, CacheBucket, FileCache, NullCache};
use tome_config::Config;
use tome_markup::Document;
use tome_render::{RenderedPage, Renderer, STYLESHEET, STYLESHEET_PATH, SiteContext, ThemeSettings};
use tome_site::{NavTree, XrefTable};
use tome_source::{Corpus, LoaderOptions, SourceLoader, worker_pool};

use crate::writer::{Asset, OutputWriter, collect_assets};
use crate::{BuildError, WriteError};

/// Tool version mixed into cache etags and the cache `VERSION` file.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the navigation index written next to the pages.
pub const NAVIGATION_FILE: &str = "navigation.json";

/// Directory under the source root copied verbatim into the output.
const STATIC_DIR: &str = "_static";

/// Everything one build needs.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Document whose toctrees form the navigation root. Without one, every
    /// document no toctree includes is a top-level navigation entry.
    pub root_doc: Option<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Worker threads; 0 uses one per available core.
    pub jobs: usize,
    pub theme: ThemeSettings,
    /// Page cache directory; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
}

impl BuildSettings {
    /// Settings from a loaded configuration.
    ///
    /// The project name becomes the theme's `project_name` unless the theme
    /// options set one.
    pub fn from_config(config: &Config) -> Self {
        let mut options = config.theme.options_as_strings();
        options
            .entry("project_name".to_owned())
            .or_insert_with(|| config.project.name.clone());

        Self {
            source_dir: config.source_resolved.dir.clone(),
            output_dir: config.build_resolved.output_dir.clone(),
            root_doc: config.project.root_doc.clone(),
            include: config.source_resolved.include.clone(),
            exclude: config.source_resolved.exclude.clone(),
            jobs: config.build_resolved.jobs,
            theme: ThemeSettings {
                name: config.theme.name.clone(),
                options,
            },
            cache_dir: config
                .build_resolved
                .cache_enabled
                .then(|| config.build_resolved.cache_dir()),
        }
    }

    /// Loader options, excluding the output directory when it lives inside
    /// the source tree.
    fn loader_options(&self) -> LoaderOptions {
        let mut exclude = self.exclude.clone();
        if let Ok(rel) = self.output_dir.strip_prefix(&self.source_dir)
            && !rel.as_os_str().is_empty()
        {
            let rel: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            exclude.push(format!("{}/**", rel.join("/")));
        }
        LoaderOptions {
            include: self.include.clone(),
            exclude,
            jobs: self.jobs,
        }
    }
}

/// Outcome of a successful build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Pages rendered during this build.
    pub pages_rendered: usize,
    /// Pages reused from the cache.
    pub pages_cached: usize,
    /// Non-page files written (stylesheet, navigation index, static files).
    pub assets_written: usize,
    /// Documents outside the navigation tree that are not `:orphan:`.
    pub unreachable: Vec<String>,
}

impl BuildReport {
    pub fn pages(&self) -> usize {
        self.pages_rendered + self.pages_cached
    }
}

/// Outcome of a successful check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub documents: usize,
    pub unreachable: Vec<String>,
}

/// Runs the whole pipeline for one source tree.
pub struct StaticSiteBuilder {
    settings: BuildSettings,
    cache: Arc<dyn Cache>,
    cancel: Arc<AtomicBool>,
}

/// State shared by `build` and `check` once the tree is validated.
struct Site {
    corpus: Corpus,
    xref: XrefTable,
    nav: NavTree,
}

impl StaticSiteBuilder {
    /// Create a builder. Opens the file cache when a cache directory is set.
    pub fn new(settings: BuildSettings) -> Self {
        let cache: Arc<dyn Cache> = match &settings.cache_dir {
            Some(dir) => Arc::new(FileCache::new(dir.clone(), VERSION)),
            None => Arc::new(NullCache),
        };
        Self {
            settings,
            cache,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = cache;
        self
    }

    /// Share a cancellation flag with the caller.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Flag that stops the build at the next checkpoint when set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Validate the source tree without rendering or writing anything.
    pub fn check(&self) -> Result<CheckReport, BuildError> {
        Renderer::new(&self.settings.theme)?;
        let pool = worker_pool(self.settings.jobs)?;
        let site = self.prepare(&pool)?;
        self.static_assets()?;
        Ok(CheckReport {
            documents: site.corpus.len(),
            unreachable: site.nav.unreachable().to_vec(),
        })
    }

    /// Build the site into the output directory.
    ///
    /// Nothing is written unless every page rendered.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let renderer = Renderer::new(&self.settings.theme)?;
        let pool = worker_pool(self.settings.jobs)?;
        let site = self.prepare(&pool)?;
        let static_assets = self.static_assets()?;

        let navigation = serde_json::to_vec_pretty(&site.nav.index()).map_err(WriteError::from)?;
        let site_fingerprint = site_fingerprint(&site, &navigation);
        let theme_fingerprint = renderer.fingerprint();
        let bucket = self.cache.bucket("pages");
        let ctx = SiteContext::new(&site.xref, &site.nav);

        let rendered: Vec<Result<(RenderedPage, bool), BuildError>> = pool.install(|| {
            site.corpus
                .documents()
                .par_iter()
                .map(|doc| {
                    self.checkpoint()?;
                    let etag = page_etag(doc, &site_fingerprint, &theme_fingerprint);
                    render_cached(&renderer, &ctx, bucket.as_ref(), doc, &etag)
                })
                .collect()
        });

        let mut pages = Vec::with_capacity(rendered.len());
        let mut cached = 0;
        for result in rendered {
            let (page, from_cache) = result?;
            cached += usize::from(from_cache);
            pages.push(page);
        }
        self.checkpoint()?;

        let mut assets = vec![
            Asset::new(STYLESHEET_PATH, STYLESHEET),
            Asset::new(NAVIGATION_FILE, navigation),
        ];
        assets.extend(static_assets);

        let writer = OutputWriter::new(self.settings.output_dir.clone());
        writer.write_all(&pages, &assets)?;

        let report = BuildReport {
            pages_rendered: pages.len() - cached,
            pages_cached: cached,
            assets_written: assets.len(),
            unreachable: site.nav.unreachable().to_vec(),
        };
        tracing::info!(
            rendered = report.pages_rendered,
            cached = report.pages_cached,
            assets = report.assets_written,
            "Build complete"
        );
        Ok(report)
    }

    fn prepare(&self, pool: &rayon::ThreadPool) -> Result<Site, BuildError> {
        let loader = SourceLoader::new(self.settings.source_dir.clone(), self.settings.loader_options())?;
        self.checkpoint()?;
        let corpus = loader.load_with(pool)?;
        self.checkpoint()?;
        let xref = XrefTable::resolve(&corpus)?;
        let nav = NavTree::build(&xref, self.settings.root_doc.as_deref())?;
        self.checkpoint()?;
        Ok(Site { corpus, xref, nav })
    }

    /// Files under the source `_static/` directory. A file that would
    /// replace a generated asset is an error.
    fn static_assets(&self) -> Result<Vec<Asset>, WriteError> {
        let assets = collect_assets(&self.settings.source_dir.join(STATIC_DIR), STATIC_DIR)?;
        if let Some(asset) = assets
            .iter()
            .find(|a| a.path == STYLESHEET_PATH || a.path == NAVIGATION_FILE)
        {
            return Err(WriteError::ReservedPath(asset.path.clone()));
        }
        Ok(assets)
    }

    fn checkpoint(&self) -> Result<(), BuildError> {
        if self.cancel.load(Ordering::Relaxed) {
            tracing::info!("Build cancelled");
            return Err(BuildError::Cancelled);
        }
        Ok(())
    }

    /// Output directory of the build.
    pub fn output_dir(&self) -> &Path {
        &self.settings.output_dir
    }
}

fn render_cached(
    renderer: &Renderer,
    ctx: &SiteContext<'_>,
    bucket: &dyn CacheBucket,
    doc: &Document,
    etag: &str,
) -> Result<(RenderedPage, bool), BuildError> {
    if let Some(html) = bucket.get_string(&doc.id, etag) {
        tracing::debug!(doc = %doc.id, "Page served from cache");
        let page = RenderedPage {
            doc_id: doc.id.clone(),
            path: tome_render::page_path(&doc.id),
            html,
        };
        return Ok((page, true));
    }
    let page = renderer.render(doc, ctx)?;
    bucket.put(&doc.id, etag, page.html.as_bytes());
    Ok((page, false))
}

/// Hash of everything one page can show about the rest of the site: the
/// navigation index, every anchor title and every resolved toctree.
fn site_fingerprint(site: &Site, navigation: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(navigation);
    for (key, title) in site.xref.anchors().titles() {
        hasher.update(key.as_bytes());
        hasher.update([0]);
        hasher.update(title.as_bytes());
        hasher.update([0]);
    }
    for id in site.corpus.ids() {
        hasher.update(format!("{id}:{:?}", site.xref.toctrees(id)).as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn page_etag(doc: &Document, site_fingerprint: &str, theme_fingerprint: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [doc.content_hash.as_str(), site_fingerprint, theme_fingerprint, VERSION] {
        hasher.update(part.as_bytes());
        hasher.update([0]);
    }
    hex::encode(hasher.finalize())
}
