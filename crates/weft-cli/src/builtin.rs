//! Built-in component set and adapter implementations.
//!
//! Ships a small, fully working deployment: the two singletons, an example
//! wiki product and a wiki adapter whose install patches the wiki's
//! skeleton file through the patch engine.

use std::path::{Path, PathBuf};

use anyhow::Context;
use weft_core::prelude::*;

/// Discovery source for everything compiled into this binary.
pub fn builtin_source() -> StaticSource {
    StaticSource::new()
        .register(DiscoveredComponent::new(
            ComponentDescriptor::new(server_id())
                .with_description("Coordinating Master host services")
                .with_author("weft contributors"),
            ComponentHooks::new(|_| Ok(()))
                .with_default_config(|| "# Master server settings\nlog_level = info\n".to_string()),
        ))
        .register(DiscoveredComponent::new(
            ComponentDescriptor::new(client_id())
                .with_description("Slave host action receiver")
                .with_author("weft contributors"),
            ComponentHooks::new(|_| Ok(()))
                .with_default_config(|| "# Slave client settings\nlog_level = info\n".to_string()),
        ))
        .register(DiscoveredComponent::new(
            ComponentDescriptor::new(wiki_product_id())
                .with_description("Example file-backed wiki product")
                .with_author("weft contributors")
                .with_variable(VariableOption::new(
                    "WikiDir",
                    FlagSpec::required("wikidir", "DIR")
                        .with_help("Directory holding the wiki's source files"),
                )),
            ComponentHooks::new(|env| {
                let dir = PathBuf::from(env.variable("WikiDir")?);
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create wiki dir: {}", dir.display()))?;
                seed_wiki_skeleton(&dir)
            })
            .with_check(|env| {
                // The parent must exist; the product creates its own dir.
                let dir = PathBuf::from(env.variable("WikiDir")?);
                match dir.parent() {
                    Some(parent) if parent.as_os_str().is_empty() || parent.exists() => Ok(()),
                    Some(parent) => anyhow::bail!("parent directory missing: {}", parent.display()),
                    None => Ok(()),
                }
            })
            .with_default_config(|| "# ExampleWiki settings\ntheme = plain\n".to_string()),
        ))
        .register(DiscoveredComponent::new(
            ComponentDescriptor::new(wiki_adapter_id())
                .with_description("Publishes release announcements onto the wiki front page")
                .with_author("weft contributors")
                .with_variable(VariableOption::new(
                    "WikiDir",
                    FlagSpec::required("wikidir", "DIR")
                        .with_help("Directory holding the wiki's source files"),
                )),
            ComponentHooks::new(|env| install_wiki_hook(env)),
        ))
}

pub fn server_id() -> ComponentId {
    ComponentId::new("Master", "Server")
}

pub fn client_id() -> ComponentId {
    ComponentId::new("Slave", "Client")
}

pub fn wiki_product_id() -> ComponentId {
    ComponentId::new("Slave/Products", "ExampleWiki")
}

pub fn wiki_adapter_id() -> ComponentId {
    ComponentId::new("Slave/Adapters/ExampleWiki/Wiki", "PublishVersion")
}

const FRONT_PAGE: &str = "FrontPage.txt";
const RELEASES_BEGIN: &str = "== Releases ==";
const RELEASES_END: &str = "== End of releases ==";

fn seed_wiki_skeleton(dir: &Path) -> anyhow::Result<()> {
    let page = dir.join(FRONT_PAGE);
    if page.exists() {
        return Ok(());
    }
    std::fs::write(
        &page,
        format!("= Example Wiki =\n{RELEASES_BEGIN}\n{RELEASES_END}\n"),
    )
    .with_context(|| format!("Failed to seed wiki page: {}", page.display()))
}

/// Patch the wiki front page so dispatched publish actions have a hook
/// section to write into.
fn install_wiki_hook(env: &ExecEnv<'_>) -> anyhow::Result<()> {
    let page = PathBuf::from(env.variable("WikiDir")?).join(FRONT_PAGE);
    let options = PatchOptions::insert(["(announcements are appended here)"]).between(
        Some(regex_for(RELEASES_BEGIN)?),
        Some(regex_for(RELEASES_END)?),
    );
    patch(&page, &options).map_err(anyhow::Error::from)?;
    Ok(())
}

fn regex_for(literal: &str) -> anyhow::Result<regex::Regex> {
    regex::Regex::new(&format!("^{}$", regex::escape(literal))).map_err(Into::into)
}

/// Adapter writing a release announcement line onto the wiki front page.
/// Arguments: `--wikidir <DIR>` (product-level), then the version label.
struct PublishVersion;

impl Adapter for PublishVersion {
    fn apply(&self, invocation: &AdapterInvocation<'_>) -> anyhow::Result<()> {
        let dir = argument_after(invocation.arguments, "--wikidir")
            .context("adapter invoked without --wikidir product parameter")?;
        let version = invocation
            .arguments
            .last()
            .context("publish action needs a version parameter")?;

        let page = Path::new(dir).join(FRONT_PAGE);
        let line = format!("* Version {} released by {}", version, invocation.user_id);
        let options = PatchOptions::insert([line])
            .between(Some(regex_for(RELEASES_BEGIN)?), Some(regex_for(RELEASES_END)?));
        patch(&page, &options).map_err(anyhow::Error::from)?;
        Ok(())
    }
}

fn argument_after<'a>(arguments: &'a [String], flag: &str) -> Option<&'a str> {
    arguments
        .iter()
        .position(|a| a == flag)
        .and_then(|i| arguments.get(i + 1))
        .map(String::as_str)
}

/// Resolver for the adapters compiled into this binary.
pub fn builtin_resolver() -> StaticResolver {
    StaticResolver::new().register(
        ProductId::new("ExampleWiki"),
        ToolId::Wiki,
        ActionId::new("PublishVersion"),
        Box::new(PublishVersion),
    )
}
