use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, Result};
use indicatif::{ProgressBar, ProgressStyle};
use seeker_compat::SiteUrls;
use seeker_core::{
    model::{DedupPolicy, MetadataEntry, SearchOptions},
    traits::{ContentRepository, ContentStore, MetadataStore},
    validate::{normalize_content_types, DEFAULT_MAX_KEYWORD_CHARS},
};
use seeker_server::{Server, ServerOptions, DEFAULT_TIMEOUT_MS};
use seeker_storage_ephemeral::EphemeralStore;
use seeker_storage_local::LocalStore;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::PathBuf, sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_ROOT: &str = "./data";
const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Backend {
    Local,
    Ephemeral,
}

#[derive(Parser, Debug)]
#[command(name = "seeker", version, about = "Keyword search over site content and metadata")]
struct Cli {
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the search operation over stdio JSON-RPC or HTTP.
    Serve(ServeArgs),
    /// Run one search and print the rows.
    Search(SearchArgs),
    /// Load a content dump into the local repository.
    Import(ImportArgs),
    /// Rebuild the local manifest from the content files.
    Reindex(ReindexArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, value_enum)]
    backend: Option<Backend>,
    #[arg(long)]
    root: Option<String>,
    #[arg(long, default_value_t = false)]
    http: bool,
    #[arg(long)]
    addr: Option<String>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    keyword: String,
    #[arg(long, value_enum)]
    backend: Option<Backend>,
    #[arg(long)]
    root: Option<String>,
    #[arg(long, default_value_t = false)]
    json: bool,
    /// `keep_all` or `first_seen`.
    #[arg(long)]
    dedup: Option<String>,
}

#[derive(Args, Debug)]
struct ImportArgs {
    #[arg(long)]
    from: String,
    #[arg(long)]
    root: Option<String>,
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Site address used to derive missing view and edit links.
    #[arg(long = "base-url")]
    base_url: Option<String>,
    /// Separate JSONL file of `{owner, key, value}` records.
    #[arg(long)]
    metadata: Option<String>,
}

#[derive(Args, Debug)]
struct ReindexArgs {
    #[arg(long)]
    root: Option<String>,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let cfg = load_config(cli.config.as_deref())?.unwrap_or_default();
    match cli.command {
        Commands::Serve(args) => serve(args, &cfg).await?,
        Commands::Search(args) => search_cmd(args, &cfg).await?,
        Commands::Import(args) => import_cmd(args, &cfg)?,
        Commands::Reindex(args) => reindex_cmd(args, &cfg)?,
    }
    Ok(())
}

async fn serve(args: ServeArgs, cfg: &AppConfig) -> Result<()> {
    let serve_cfg = cfg.serve.clone().unwrap_or_default();
    let backend = args
        .backend
        .or(serve_cfg.backend)
        .unwrap_or_else(|| cfg.backend());
    let root = args
        .root
        .or(serve_cfg.root)
        .unwrap_or_else(|| cfg.root());
    let http = args.http || serve_cfg.http.unwrap_or(false);
    let addr = args
        .addr
        .or(serve_cfg.addr)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let options = server_options(cfg, None)?;
    info!(backend = ?backend, root = %root, http, "starting server");
    match backend {
        Backend::Ephemeral => {
            let store = Arc::new(EphemeralStore::new());
            let server = Server::new_with_options(Arc::clone(&store), store, options);
            run_server(server, http, &addr).await;
        }
        Backend::Local => {
            let store = Arc::new(LocalStore::new(expand_path(&root)));
            let server = Server::new_with_options(Arc::clone(&store), store, options);
            run_server(server, http, &addr).await;
        }
    }
    Ok(())
}

async fn run_server<C, M>(server: Server<C, M>, http: bool, addr: &str)
where
    C: ContentStore + Send + Sync + 'static,
    M: MetadataStore + Send + Sync + 'static,
{
    if http {
        if let Err(e) = server.run_http(addr).await {
            tracing::error!(error=%e, "http server exited with error");
        }
    } else if let Err(e) = server.run_stdio().await {
        tracing::error!(error=%e, "stdio server exited with error");
    }
}

async fn search_cmd(args: SearchArgs, cfg: &AppConfig) -> Result<()> {
    let backend = args.backend.unwrap_or_else(|| cfg.backend());
    let root = args.root.unwrap_or_else(|| cfg.root());
    let dedup = match args.dedup.as_deref() {
        Some(raw) => Some(
            DedupPolicy::parse(raw)
                .ok_or_else(|| eyre!("unknown dedup policy '{}' (keep_all | first_seen)", raw))?,
        ),
        None => None,
    };
    let options = server_options(cfg, dedup)?;
    match backend {
        Backend::Ephemeral => {
            let store = Arc::new(EphemeralStore::new());
            let server = Server::new_with_options(Arc::clone(&store), store, options);
            print_search(&server, &args.keyword, args.json).await
        }
        Backend::Local => {
            let store = Arc::new(LocalStore::new(expand_path(&root)));
            let server = Server::new_with_options(Arc::clone(&store), store, options);
            print_search(&server, &args.keyword, args.json).await
        }
    }
}

async fn print_search<C, M>(server: &Server<C, M>, keyword: &str, json: bool) -> Result<()>
where
    C: ContentStore + Send + Sync + 'static,
    M: MetadataStore + Send + Sync + 'static,
{
    let results = server
        .search(keyword)
        .await
        .map_err(|e| eyre!("search failed: {}", e))?;
    let rows = seeker_proto::encode_results(&results);
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No results");
        return Ok(());
    }
    println!("{:<8} {:<8} {:<40} Edit Link", "Page ID", "Source", "Title");
    for row in &rows {
        println!(
            "{:<8} {:<8} {:<40} {}",
            row.page_id, row.source, row.title, row.edit_link
        );
    }
    Ok(())
}

fn import_cmd(args: ImportArgs, cfg: &AppConfig) -> Result<()> {
    let root = args.root.unwrap_or_else(|| cfg.root());
    let base_url = args
        .base_url
        .or_else(|| cfg.site.as_ref().and_then(|s| s.base_url.clone()));
    let site = match base_url.as_deref() {
        Some(raw) => Some(SiteUrls::parse(raw).map_err(|e| eyre!("invalid base url '{}': {}", raw, e))?),
        None => None,
    };

    let mut batch = seeker_compat::import_content_from_path(expand_path(&args.from), site.as_ref())
        .map_err(|e| eyre!("{}: {}", args.from, e))?;
    if let Some(meta_path) = &args.metadata {
        let extra = seeker_compat::import_metadata_from_path(expand_path(meta_path))
            .map_err(|e| eyre!("{}: {}", meta_path, e))?;
        batch.metadata.extend(extra);
    }

    // first record wins within one input
    let mut seen = HashSet::new();
    let before_len = batch.items.len();
    batch.items.retain(|item| seen.insert(item.id));
    let deduped = before_len - batch.items.len();

    let pb = ProgressBar::new((batch.items.len() + batch.metadata.len()) as u64);
    pb.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    )?);

    let mut imported: u64 = 0;
    let mut updated: u64 = 0;
    let mut metadata_written: u64 = 0;
    let mut metadata_skipped: u64 = 0;
    let mut errors: u64 = 0;
    let store = (!args.dry_run).then(|| LocalStore::new(expand_path(&root)));
    // metadata is append-only on disk; identical entries are written once
    let mut stored_metadata: HashSet<MetadataEntry> = match &store {
        Some(store) => store
            .metadata_entries()
            .map_err(|e| eyre!("reading stored metadata: {}", e))?
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };
    for item in &batch.items {
        pb.inc(1);
        let Some(store) = &store else {
            imported += 1;
            continue;
        };
        let existed = store.get_by_id(item.id).ok().flatten().is_some();
        match store.put_item(item) {
            Ok(()) if existed => updated += 1,
            Ok(()) => imported += 1,
            Err(e) => {
                tracing::warn!(id = item.id, error = %e, "skipping record");
                errors += 1;
            }
        }
    }
    for entry in &batch.metadata {
        pb.inc(1);
        let Some(store) = &store else {
            metadata_written += 1;
            continue;
        };
        if !stored_metadata.insert(entry.clone()) {
            metadata_skipped += 1;
            continue;
        }
        match store.put_metadata(entry) {
            Ok(()) => metadata_written += 1,
            Err(e) => {
                tracing::warn!(owner = entry.owner, key = %entry.key, error = %e, "skipping metadata entry");
                errors += 1;
            }
        }
    }
    pb.finish_with_message(if args.dry_run { "dry run" } else { "done" });
    println!(
        "Total input: {}\nDeduped (within input): {}\nImported: {}\nUpdated: {}\nMetadata entries: {}\nMetadata skipped (already stored): {}\nErrors: {}",
        before_len, deduped, imported, updated, metadata_written, metadata_skipped, errors
    );
    Ok(())
}

fn reindex_cmd(args: ReindexArgs, cfg: &AppConfig) -> Result<()> {
    let root = args.root.unwrap_or_else(|| cfg.root());
    let store = LocalStore::new(expand_path(&root));
    let report = store
        .reindex()
        .map_err(|e| eyre!("reindex failed: {}", e))?;
    info!(root = %root, indexed = report.indexed, "reindex complete");
    println!(
        "Scanned: {}\nIndexed: {}\nSkipped: {}",
        report.scanned, report.indexed, report.skipped
    );
    Ok(())
}

fn server_options(cfg: &AppConfig, dedup_override: Option<DedupPolicy>) -> Result<ServerOptions> {
    let section = cfg.search.clone().unwrap_or_default();
    let mut search = SearchOptions::default();
    if let Some(types) = &section.content_types {
        search.content_types =
            normalize_content_types(types).map_err(|e| eyre!("invalid search.content_types: {}", e))?;
    }
    search.dedup = dedup_override.or(section.dedup).unwrap_or_default();
    search.max_keyword_chars = section
        .max_keyword_chars
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_KEYWORD_CHARS);
    Ok(ServerOptions {
        search,
        timeout: Duration::from_millis(
            section
                .timeout_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_TIMEOUT_MS),
        ),
    })
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct SectionDefaults {
    backend: Option<Backend>,
    root: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct ServeSection {
    backend: Option<Backend>,
    root: Option<String>,
    addr: Option<String>,
    http: Option<bool>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct SearchSection {
    content_types: Option<Vec<String>>,
    dedup: Option<DedupPolicy>,
    max_keyword_chars: Option<usize>,
    timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct SiteSection {
    base_url: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct AppConfig {
    #[serde(default)]
    default: Option<SectionDefaults>,
    #[serde(default)]
    serve: Option<ServeSection>,
    #[serde(default)]
    search: Option<SearchSection>,
    #[serde(default)]
    site: Option<SiteSection>,
}

impl AppConfig {
    fn backend(&self) -> Backend {
        self.default
            .as_ref()
            .and_then(|d| d.backend)
            .unwrap_or(Backend::Local)
    }

    fn root(&self) -> String {
        self.default
            .as_ref()
            .and_then(|d| d.root.clone())
            .unwrap_or_else(|| DEFAULT_ROOT.to_string())
    }
}

fn load_config(path: Option<&str>) -> Result<Option<AppConfig>> {
    let mut builder = config::Config::builder()
        .add_source(config::Environment::with_prefix("SEEKER").separator("__"));

    let mut has_sources = false;
    if let Some(raw) = path {
        let expanded = expand_path(raw);
        has_sources = true;
        if !expanded.exists() {
            tracing::warn!(
                path = expanded.display().to_string(),
                "config file not found; continuing with defaults and env overrides"
            );
        }
        builder = builder.add_source(config::File::from(expanded).required(false));
    }

    let cfg = builder
        .build()
        .map_err(|e| eyre!("config load error: {}", e))?;
    let parsed: AppConfig = cfg
        .try_deserialize()
        .map_err(|e| eyre!("config parse error: {}", e))?;
    if has_sources || parsed_has_values(&parsed) {
        return Ok(Some(parsed));
    }
    Ok(None)
}

fn parsed_has_values(cfg: &AppConfig) -> bool {
    cfg.default.is_some() || cfg.serve.is_some() || cfg.search.is_some() || cfg.site.is_some()
}

fn expand_path(input: &str) -> PathBuf {
    if input == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from(input));
    }
    if let Some(rest) = input.strip_prefix("~/") {
        return home_dir()
            .map(|mut base| {
                base.push(rest);
                base
            })
            .unwrap_or_else(|| PathBuf::from(rest));
    }
    PathBuf::from(input)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
}
