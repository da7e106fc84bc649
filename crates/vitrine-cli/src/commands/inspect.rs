//! `vitrine inspect`

use std::fs;

use serde::Serialize;
use vitrine::AssetStore;

use crate::cli::InspectArgs;
use crate::error::{Result, ResultExt};
use crate::ui;

#[derive(Serialize)]
struct PackListing<'a> {
    names: Vec<NameListing<'a>>,
    assets: Vec<AssetListing<'a>>,
}

#[derive(Serialize)]
struct NameListing<'a> {
    name: &'a str,
    file: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias_of: Option<&'a str>,
}

#[derive(Serialize)]
struct AssetListing<'a> {
    path: &'a str,
    size: usize,
    content_type: &'a str,
    hash: &'a str,
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let bytes = fs::read(&args.pack).with_action("read", &args.pack)?;
    let store = AssetStore::unpack(&bytes)?;
    let listing = listing(&store);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for name in &listing.names {
        match name.alias_of {
            Some(input) => println!("{} -> {} ({})", name.name, name.file, input),
            None => println!("{} -> {}", name.name, name.file),
        }
    }
    println!();
    for asset in &listing.assets {
        println!(
            "{:<48} {:>10}  {}",
            asset.path,
            ui::format_size(asset.size as u64),
            asset.content_type
        );
    }
    Ok(())
}

fn listing(store: &AssetStore) -> PackListing<'_> {
    let names = store
        .names()
        .into_iter()
        .filter_map(|name| store.resolve(name))
        .map(|resolved| NameListing {
            name: resolved.name(),
            file: resolved.file(),
            alias_of: resolved.is_alias().then(|| resolved.input()),
        })
        .collect();

    let assets = store
        .iter()
        .map(|asset| AssetListing {
            path: asset.path(),
            size: asset.len(),
            content_type: asset.content_type(),
            hash: asset.hash(),
        })
        .collect();

    PackListing { names, assets }
}
