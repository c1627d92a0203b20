use crate::catalog::{Catalog, Idiom, Scale};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONTENTS_FILE: &str = "Contents.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentsImage {
    pub filename: String,
    pub idiom: Idiom,
    pub scale: Scale,
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentsInfo {
    pub author: String,
    pub version: u32,
}

impl Default for ContentsInfo {
    fn default() -> Self {
        Self {
            author: "xcode".to_string(),
            version: 1,
        }
    }
}

/// Contents.json of an asset catalog icon set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contents {
    pub images: Vec<ContentsImage>,
    pub info: ContentsInfo,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContentsOptions {
    /// Leave out entries whose file is not present in the output directory.
    pub prune_missing: bool,
}

#[derive(Debug, Clone)]
pub struct WrittenContents {
    pub path: PathBuf,
    pub contents: Contents,
    /// Listed (or, when pruning, dropped) filenames with no file on disk.
    pub missing: Vec<String>,
}

/// One entry per catalog slot, in catalog order. Shared files appear once per
/// slot because each slot is a distinct idiom/scale role.
pub fn build_contents(catalog: &Catalog) -> Contents {
    let images = catalog
        .slots()
        .iter()
        .map(|slot| ContentsImage {
            filename: slot.filename.clone(),
            idiom: slot.idiom,
            scale: slot.scale,
            size: slot.size_label(),
        })
        .collect();

    Contents {
        images,
        info: ContentsInfo::default(),
    }
}

/// Filenames referenced by `contents` that are not regular files in `dir`,
/// deduplicated and in order of first reference.
pub fn missing_files(dir: &Path, contents: &Contents) -> Vec<String> {
    let mut seen = BTreeSet::new();
    contents
        .images
        .iter()
        .filter(|img| seen.insert(img.filename.as_str()))
        .filter(|img| !dir.join(&img.filename).is_file())
        .map(|img| img.filename.clone())
        .collect()
}

/// Write Contents.json into `dir` (created if absent), replacing any
/// existing descriptor.
pub fn write_contents(
    dir: &Path,
    catalog: &Catalog,
    opts: ContentsOptions,
) -> anyhow::Result<WrittenContents> {
    fs::create_dir_all(dir).with_context(|| format!("create output dir {}", dir.display()))?;

    let mut contents = build_contents(catalog);
    let missing = missing_files(dir, &contents);
    if opts.prune_missing {
        contents
            .images
            .retain(|img| !missing.contains(&img.filename));
    }

    let mut json = serde_json::to_string_pretty(&contents)?;
    json.push('\n');

    let path = dir.join(CONTENTS_FILE);
    fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;

    Ok(WrittenContents {
        path,
        contents,
        missing,
    })
}
