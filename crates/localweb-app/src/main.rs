//! localweb command-line entry point.
//!
//! Serves a host folder on the synthetic origin and runs requests through
//! the interceptor, printing what the rendering engine would receive:
//!
//! ```text
//! localweb-app <folder> <entry-file> [url-path ...]
//! ```
//!
//! `RANGE=bytes=...` and `METHOD=HEAD` apply to every request. Settings are
//! read from `localweb.toml` (or `LOCALWEB_CONFIG`); the selection is
//! remembered in `localweb-prefs.toml`.

mod report;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use localweb_provider::DirectoryProvider;
use localweb_serve::{InterceptRequest, LocalServer, list_folder, load_main_document};
use localweb_types::config::ServeConfig;
use localweb_types::prefs::SessionPrefs;

use report::{EntryReport, MainDocumentReport, ResponseReport};

const CONFIG_FILE: &str = "localweb.toml";
const PREFS_FILE: &str = "localweb-prefs.toml";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (folder, entry, paths) = match args.as_slice() {
        [folder, entry, paths @ ..] => (folder, entry, paths),
        _ => bail!("usage: localweb-app <folder> <entry-file> [url-path ...]"),
    };

    let config = load_config()?;
    log::info!("Serving {folder} on {}", config.base_url());

    let provider = Arc::new(DirectoryProvider::new(folder)?);
    let folder_uri = provider.tree_uri().to_string();
    let file_uri = provider.document_uri_for(entry).to_string();

    let server = LocalServer::new(Arc::clone(&provider), config);
    let derived = server.select(Some(&folder_uri), Some(&file_uri));
    if !derived {
        log::warn!("No folder context for {folder_uri}; local requests will 404");
    }
    save_prefs(&folder_uri, &file_uri, derived)?;

    let listing = list_folder(provider.as_ref(), &provider.tree_uri())?;
    let listing: Vec<EntryReport> = listing.iter().map(EntryReport::from).collect();
    println!("{}", serde_json::to_string_pretty(&listing)?);

    let main_doc = load_main_document(provider.as_ref(), &file_uri, server.config());
    println!(
        "{}",
        serde_json::to_string_pretty(&MainDocumentReport::from(&main_doc))?
    );

    let method = std::env::var("METHOD").unwrap_or_else(|_| "GET".to_string());
    let range = std::env::var("RANGE").ok();
    let default_path = [entry.clone()];
    let paths = if paths.is_empty() { &default_path[..] } else { paths };

    for path in paths {
        let url = format!("{}{}", server.config().base_url(), path.trim_start_matches('/'));
        let mut request = InterceptRequest::get(&url).with_method(&method);
        if let Some(range) = range.as_deref() {
            request = request.with_header("Range", range);
        }
        let report = match server.intercept(&request) {
            Some(response) => ResponseReport::consume(&url, &method, response)
                .with_context(|| format!("reading body of {url}"))?,
            None => ResponseReport::passed_through(&url, &method),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let stats = server.stats();
    log::info!("Served {} responses, {} bytes", stats.served, stats.bytes);
    Ok(())
}

/// `LOCALWEB_CONFIG`, else `localweb.toml` when present, else defaults.
fn load_config() -> Result<ServeConfig> {
    let path = std::env::var("LOCALWEB_CONFIG").unwrap_or_else(|_| CONFIG_FILE.to_string());
    if !Path::new(&path).exists() {
        log::debug!("{path} not found, using defaults");
        return Ok(ServeConfig::default());
    }
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    Ok(ServeConfig::from_toml_str(&text)?)
}

/// Record the selection. A previous prefs file that no longer parses is
/// replaced rather than treated as fatal.
fn save_prefs(folder_uri: &str, file_uri: &str, derived: bool) -> Result<()> {
    let mut prefs = match std::fs::read_to_string(PREFS_FILE) {
        Ok(text) => SessionPrefs::from_toml_str(&text).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable {PREFS_FILE}: {e}");
            SessionPrefs::default()
        }),
        Err(_) => SessionPrefs::default(),
    };
    prefs.record_local_selection(file_uri, Some(folder_uri));
    if !derived {
        prefs.forget_folder();
    }
    std::fs::write(PREFS_FILE, prefs.to_toml_string()?)
        .with_context(|| format!("writing {PREFS_FILE}"))?;
    Ok(())
}
