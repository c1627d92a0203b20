//! The rasterization loop: one source SVG in, one PNG per render target out.

pub mod outcome;

pub use outcome::{GenerationReport, Outcome, TargetOutcome};

use crate::catalog::RenderTarget;
use crate::render::{AlphaMode, IconSource, SvgSource};
use anyhow::Context;
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    pub alpha: AlphaMode,
}

/// Render every target from `source` into `out_dir`.
///
/// Reading the source is the caller's job, so a missing file never gets this
/// far. Everything after that is per target: an SVG that fails to parse
/// fails every target with the same message, and the loop still creates
/// `out_dir` and prints its summary.
pub fn generate_icons<W: Write>(
    source: &SvgSource,
    out_dir: &Path,
    targets: &[RenderTarget],
    opts: GenerateOptions,
    progress: &mut W,
) -> anyhow::Result<GenerationReport> {
    let icon = IconSource::parse(source).map_err(|e| format!("{:#}", e));

    fs::create_dir_all(out_dir)
        .with_context(|| format!("create output dir {}", out_dir.display()))?;

    writeln!(progress, "Generating app icons...")?;
    writeln!(progress, "   source: {}", source.path.display())?;
    writeln!(progress, "   output: {}", out_dir.display())?;
    writeln!(progress)?;

    let mut report = GenerationReport::default();
    for target in targets {
        let path = out_dir.join(&target.filename);
        let written = match &icon {
            Ok(icon) => icon
                .write_icon(target.pixels, opts.alpha, &path)
                .map_err(|e| format!("{:#}", e)),
            Err(msg) => Err(msg.clone()),
        };
        let outcome = match written {
            Ok(()) => {
                let roles: Vec<String> = target
                    .slots
                    .iter()
                    .map(|(idiom, scale)| format!("{} {}", idiom, scale))
                    .collect();
                writeln!(
                    progress,
                    "ok   {:<25} ({}x{}) {}",
                    target.filename,
                    target.pixels,
                    target.pixels,
                    roles.join(", ")
                )?;
                Outcome::Written
            }
            Err(msg) => {
                writeln!(progress, "FAIL {:<25} {}", target.filename, msg)?;
                Outcome::Failed(msg)
            }
        };

        report.outcomes.push(TargetOutcome {
            filename: target.filename.clone(),
            pixels: target.pixels,
            outcome,
        });
    }

    writeln!(progress)?;
    writeln!(
        progress,
        "Done: generated {}/{} icons",
        report.succeeded(),
        report.total()
    )?;

    Ok(report)
}
