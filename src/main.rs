use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};

mod catalog;
mod generate;
mod render;

pub type Result<T> = anyhow::Result<T>;

const DEFAULT_SVG: &str = "app_icon_design.svg";
const DEFAULT_OUT: &str = "TodoList/Assets.xcassets/AppIcon.appiconset";

#[derive(Parser)]
#[command(name = "appicon-gen")]
#[command(about = "Generate an iOS AppIcon.appiconset from an SVG", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every icon size, then write Contents.json.
    Generate(GenerateArgs),

    /// Write only Contents.json.
    Manifest {
        #[arg(short = 'o', long, default_value = DEFAULT_OUT)]
        out: PathBuf,

        #[arg(long)]
        catalog: Option<PathBuf>,

        #[arg(long)]
        prune_missing: bool,
    },

    /// Print the size table.
    Sizes {
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long, default_value = DEFAULT_SVG)]
    svg: PathBuf,

    #[arg(short = 'o', long, default_value = DEFAULT_OUT)]
    out: PathBuf,

    /// Icon catalog in Contents.json shape (defaults to the built-in iOS set).
    #[arg(long)]
    catalog: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = AlphaArg::Discard)]
    alpha: AlphaArg,

    /// Background used by `--alpha flatten`.
    #[arg(long, default_value = "#ffffff")]
    background: String,

    /// Leave entries whose file is missing out of Contents.json.
    #[arg(long)]
    prune_missing: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlphaArg {
    /// Drop the alpha channel (RGB output).
    Discard,
    /// Composite onto --background (RGB output).
    Flatten,
    /// Keep the alpha channel (RGBA output).
    Keep,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Generate(args) => {
            let mut stdout = std::io::stdout().lock();
            run_generate(&args, &mut stdout)?;
        }

        Commands::Manifest {
            out,
            catalog,
            prune_missing,
        } => {
            let catalog = load_catalog(catalog.as_deref())?;
            catalog.validate_and_build()?;
            write_manifest(&out, &catalog, prune_missing, &mut std::io::stdout().lock())?;
        }

        Commands::Sizes { catalog } => {
            let catalog = load_catalog(catalog.as_deref())?;
            for row in catalog.size_table() {
                println!("{:<25} {}x{}", row.filename, row.pixels, row.pixels);
            }
        }
    }

    Ok(())
}

/// Rasterize, then write Contents.json, then print next steps.
///
/// An unreadable source is reported on stderr and returns `Ok(None)` with
/// nothing written; per-icon failures never make this return an error.
fn run_generate<W: Write>(
    args: &GenerateArgs,
    progress: &mut W,
) -> Result<Option<generate::GenerationReport>> {
    let alpha = alpha_mode(args.alpha, &args.background)?;

    // 1) Load + validate the catalog before touching any file.
    let catalog = load_catalog(args.catalog.as_deref())?;
    let targets = catalog.validate_and_build()?;

    // 2) Read the source. Without it there is nothing to do.
    let source = match render::SvgSource::read(&args.svg) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            return Ok(None);
        }
    };

    // 3) Rasterize.
    let report = generate::generate_icons(
        &source,
        &args.out,
        &targets,
        generate::GenerateOptions { alpha },
        progress,
    )?;
    for failed in report.failed() {
        if let generate::Outcome::Failed(msg) = &failed.outcome {
            eprintln!(
                "WARN: {} ({}px) was not generated: {}",
                failed.filename, failed.pixels, msg
            );
        }
    }

    // 4) Descriptor.
    writeln!(progress)?;
    write_manifest(&args.out, &catalog, args.prune_missing, progress)?;

    writeln!(progress)?;
    writeln!(progress, "Next steps:")?;
    writeln!(progress, "   1. Open the project in Xcode")?;
    writeln!(progress, "   2. Check Assets.xcassets -> AppIcon")?;
    writeln!(progress, "   3. Every icon slot should now be filled")?;
    writeln!(progress, "   4. Build and run to see the new icon")?;

    Ok(Some(report))
}

/// `background` is only looked at for `flatten`.
fn alpha_mode(alpha: AlphaArg, background: &str) -> Result<render::AlphaMode> {
    Ok(match alpha {
        AlphaArg::Discard => render::AlphaMode::Discard,
        AlphaArg::Flatten => render::AlphaMode::Flatten(
            render::parse_hex_color(background).context("--background")?,
        ),
        AlphaArg::Keep => render::AlphaMode::Keep,
    })
}

fn load_catalog(path: Option<&Path>) -> Result<catalog::Catalog> {
    let catalog = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("read catalog file {}", p.display()))?;
            catalog::Catalog::from_json(&text)?
        }
        None => catalog::Catalog::builtin(),
    };

    for msg in catalog::filename::convention_mismatches(catalog.slots())? {
        eprintln!("WARN: {}", msg);
    }

    Ok(catalog)
}

fn write_manifest<W: Write>(
    out: &Path,
    catalog: &catalog::Catalog,
    prune_missing: bool,
    progress: &mut W,
) -> Result<()> {
    let written = render::write_contents(
        out,
        catalog,
        render::ContentsOptions { prune_missing },
    )?;

    for name in &written.missing {
        if prune_missing {
            eprintln!("WARN: {} not found, left out of Contents.json", name);
        } else {
            eprintln!("WARN: Contents.json references {}, but the file is missing", name);
        }
    }

    writeln!(
        progress,
        "Wrote {} ({} images)",
        written.path.display(),
        written.contents.images.len()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    const SQUARE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="64">
  <rect width="64" height="64" fill="#3366ff"/>
</svg>"##;

    fn parse_generate(argv: &[&str]) -> GenerateArgs {
        let mut full = vec!["appicon-gen", "generate"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().cmd {
            Commands::Generate(args) => args,
            _ => panic!("not a generate command"),
        }
    }

    fn manifest_images(out: &Path) -> Vec<String> {
        let text = fs::read_to_string(out.join("Contents.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        value["images"]
            .as_array()
            .unwrap()
            .iter()
            .map(|img| format!("{} {}", img["idiom"].as_str().unwrap(), img["filename"].as_str().unwrap()))
            .collect()
    }

    /// A directory squatting on an icon's filename makes that one write fail.
    fn setup_with_blocked_icon(tmp: &Path) -> (String, String) {
        let svg = tmp.join("icon.svg");
        fs::write(&svg, SQUARE_SVG).unwrap();
        let out = tmp.join("AppIcon.appiconset");
        fs::create_dir_all(out.join("Icon-1024.png")).unwrap();
        (
            svg.to_string_lossy().into_owned(),
            out.to_string_lossy().into_owned(),
        )
    }

    #[test]
    fn failed_icon_still_gets_full_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let (svg, out) = setup_with_blocked_icon(tmp.path());
        let args = parse_generate(&["--svg", &svg, "-o", &out]);

        let mut progress = Vec::new();
        let report = run_generate(&args, &mut progress).unwrap().unwrap();

        assert_eq!(report.succeeded(), 14);
        assert_eq!(report.total(), 15);
        let failed: Vec<&str> = report.failed().map(|o| o.filename.as_str()).collect();
        assert_eq!(failed, vec!["Icon-1024.png"]);

        let images = manifest_images(Path::new(&out));
        assert_eq!(images.len(), 18);
        assert_eq!(images[17], "ios-marketing Icon-1024.png");

        let text = String::from_utf8(progress).unwrap();
        assert!(text.contains("Done: generated 14/15 icons"), "{}", text);
        assert!(text.contains("(18 images)"), "{}", text);
        assert!(text.contains("Next steps:"), "{}", text);
    }

    #[test]
    fn prune_missing_applies_after_generation() {
        let tmp = tempfile::tempdir().unwrap();
        let (svg, out) = setup_with_blocked_icon(tmp.path());
        let args = parse_generate(&["--svg", &svg, "-o", &out, "--prune-missing"]);

        run_generate(&args, &mut std::io::sink()).unwrap().unwrap();

        let images = manifest_images(Path::new(&out));
        assert_eq!(images.len(), 17);
        assert!(!images.iter().any(|i| i.ends_with("Icon-1024.png")), "{:?}", images);
    }

    #[test]
    fn unparsable_source_fails_every_icon_but_writes_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let svg = tmp.path().join("icon.svg");
        fs::write(&svg, "this is readable text but not svg").unwrap();
        let out = tmp.path().join("out");
        let args = parse_generate(&[
            "--svg",
            &svg.to_string_lossy(),
            "-o",
            &out.to_string_lossy(),
        ]);

        let mut progress = Vec::new();
        let report = run_generate(&args, &mut progress).unwrap().unwrap();

        assert_eq!(report.succeeded(), 0);
        assert_eq!(manifest_images(&out).len(), 18);
        let text = String::from_utf8(progress).unwrap();
        assert!(text.contains("Done: generated 0/15 icons"), "{}", text);
    }

    #[test]
    fn missing_source_is_reported_without_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out");
        let args = parse_generate(&[
            "--svg",
            &tmp.path().join("missing.svg").to_string_lossy(),
            "-o",
            &out.to_string_lossy(),
        ]);

        let mut progress = Vec::new();
        let report = run_generate(&args, &mut progress).unwrap();

        assert!(report.is_none());
        assert!(!out.exists());
        assert!(progress.is_empty());
    }

    #[test]
    fn background_is_parsed_only_for_flatten() {
        let args = parse_generate(&["--alpha", "flatten", "--background", "#102030"]);
        assert_eq!(
            alpha_mode(args.alpha, &args.background).unwrap(),
            render::AlphaMode::Flatten([0x10, 0x20, 0x30])
        );

        let args = parse_generate(&["--alpha", "flatten", "--background", "blue"]);
        assert!(alpha_mode(args.alpha, &args.background).is_err());

        let args = parse_generate(&["--background", "blue"]);
        assert_eq!(
            alpha_mode(args.alpha, &args.background).unwrap(),
            render::AlphaMode::Discard
        );
    }

    #[test]
    fn defaults_match_the_xcode_project_layout() {
        let args = parse_generate(&[]);
        assert_eq!(args.svg, PathBuf::from(DEFAULT_SVG));
        assert_eq!(args.out, PathBuf::from(DEFAULT_OUT));
        assert!(!args.prune_missing);
        assert_eq!(
            alpha_mode(args.alpha, &args.background).unwrap(),
            render::AlphaMode::Discard
        );
    }
}
