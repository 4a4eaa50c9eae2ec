//! thumbkit CLI - Deterministic Thumbnail Generation
//!
//! A small front end over the thumbkit library.

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thumbkit::prelude::*;
use walkdir::WalkDir;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        return;
    }

    let result = match args[1].as_str() {
        "list" => list_strategies(),
        "name" => with_cli(&args[2..], 2, name_thumbnail),
        "generate" => with_cli(&args[2..], 2, generate_thumbnail),
        "alias" => with_cli(&args[2..], 2, alias_thumbnail),
        "aliases" => with_cli(&args[2..], 0, list_aliases),
        "batch" => with_cli(&args[2..], 1, batch),
        "help" | "--help" | "-h" => {
            print_usage(&args[0]);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_usage(&args[0]);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

fn print_usage(program: &str) {
    println!("thumbkit v{}", thumbkit::VERSION);
    println!();
    println!("Usage: {} <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  list                          List registered strategies");
    println!("  name <source> <WxH> [opts]    Print the thumbnail key without decoding");
    println!("  generate <source> <WxH> [opts]  Generate and save one thumbnail");
    println!("  alias <source> <alias>        Generate the thumbnail for an alias");
    println!("  aliases                       List configured aliases");
    println!("  batch <dir>                   Generate every alias for every image under <dir>");
    println!("  help                          Show this help message");
    println!();
    println!("Options:");
    println!("  --config <file>     TOML configuration ([thumbnails] and [aliases])");
    println!("  --root <dir>        Directory sources are named relative to (default: .)");
    println!("  --out <dir>         Directory thumbnails are saved under (default: root)");
    println!("  --target <t>        Alias target: app, app.Model or app.Model.field");
    println!("  --crop[=mode]       Crop to fill (mode: scale, smart, or X,Y edge percentages)");
    println!("  --quality <n>       Encoder quality 1-100");
    println!("  --bw                Convert to grayscale");
    println!("  --sharpen           Apply the sharpen kernel");
    println!("  --detail            Apply the detail kernel");
    println!("  --upscale           Allow scaling above the source size");
    println!("  --background <hex>  Pad to the exact size with this color");
    println!("  --transparent       Name as if the result kept transparency (name only)");
    println!("  --strict            Stop at the first failing decoder");
    println!("  --json              Print the artifact as JSON");
}

/// Parsed command line: positional arguments, options and flags.
struct Cli {
    positional: Vec<String>,
    options: OptionSet,
    config: Config,
    root: PathBuf,
    out: Option<PathBuf>,
    target: Option<AliasTarget>,
    transparent: bool,
    strict: bool,
    json: bool,
}

impl Cli {
    fn parse(args: &[String]) -> Result<Self> {
        let mut cli = Cli {
            positional: Vec::new(),
            options: OptionSet::new(),
            config: Config::default(),
            root: PathBuf::from("."),
            out: None,
            target: None,
            transparent: false,
            strict: false,
            json: false,
        };

        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();
            match arg {
                "--config" => {
                    cli.config = Config::load(value(args, i)?)?;
                    i += 2;
                }
                "--root" => {
                    cli.root = PathBuf::from(value(args, i)?);
                    i += 2;
                }
                "--out" => {
                    cli.out = Some(PathBuf::from(value(args, i)?));
                    i += 2;
                }
                "--target" => {
                    cli.target = Some(AliasTarget::parse(value(args, i)?)?);
                    i += 2;
                }
                "--quality" => {
                    let quality: i64 = value(args, i)?
                        .parse()
                        .context("--quality expects an integer")?;
                    cli.options.insert(QUALITY, quality);
                    i += 2;
                }
                "--background" => {
                    cli.options.insert("background", value(args, i)?.as_str());
                    i += 2;
                }
                "--crop" => {
                    cli.options.insert("crop", true);
                    i += 1;
                }
                "--bw" | "--sharpen" | "--detail" | "--upscale" | "--autocrop" => {
                    cli.options.insert(&arg[2..], true);
                    i += 1;
                }
                "--transparent" => {
                    cli.transparent = true;
                    i += 1;
                }
                "--strict" => {
                    cli.strict = true;
                    i += 1;
                }
                "--json" => {
                    cli.json = true;
                    i += 1;
                }
                _ if arg.starts_with("--crop=") => {
                    cli.options.insert("crop", &arg["--crop=".len()..]);
                    i += 1;
                }
                _ if arg.starts_with("--") => bail!("Unknown option: {}", arg),
                _ => {
                    cli.positional.push(arg.to_string());
                    i += 1;
                }
            }
        }
        Ok(cli)
    }

    fn out_dir(&self) -> &Path {
        self.out.as_deref().unwrap_or(&self.root)
    }

    fn aliases(&self) -> Result<Arc<AliasResolver>> {
        Ok(Arc::new(AliasResolver::from_config(&self.config.aliases)?))
    }

    fn thumbnailer(&self, source: &str) -> Result<Thumbnailer> {
        let storage: Arc<dyn Storage> = Arc::new(FileSystemStorage::new(&self.root));
        let mut builder = Thumbnailer::builder(SourceDescriptor::named(source, storage))
            .with_settings(self.config.thumbnails.clone())
            .with_aliases(self.aliases()?);
        if let Some(target) = &self.target {
            builder = builder.with_alias_target(target.clone());
        }
        Ok(builder.build()?)
    }

    /// Options with the `<WxH>` positional argument applied.
    fn sized_options(&self, size: &str) -> OptionSet {
        self.options.clone().with(SIZE, size)
    }
}

/// The argument following the flag at `i`.
fn value(args: &[String], i: usize) -> Result<&String> {
    args.get(i + 1)
        .with_context(|| format!("{} expects a value", args[i]))
}

fn with_cli(args: &[String], positional: usize, run: fn(&Cli) -> Result<()>) -> Result<()> {
    let cli = Cli::parse(args)?;
    if cli.positional.len() < positional {
        bail!(
            "Expected {} argument(s), got {}. Run 'help' for usage.",
            positional,
            cli.positional.len()
        );
    }
    run(&cli)
}

fn list_strategies() -> Result<()> {
    let registry = StrategyRegistry::builtin();
    println!("Registered strategies ({} total):", registry.len());
    for (label, kind) in [
        ("Source generators", StrategyKind::Generator),
        ("Processors", StrategyKind::Processor),
        ("Namers", StrategyKind::Namer),
    ] {
        println!();
        println!("  📁 {}", label);
        for id in registry.ids(kind) {
            println!("      • {}", id);
        }
    }
    Ok(())
}

fn name_thumbnail(cli: &Cli) -> Result<()> {
    let thumbnailer = cli.thumbnailer(&cli.positional[0])?;
    let options = cli.sized_options(&cli.positional[1]);
    let name = thumbnailer.get_thumbnail_name(&options, cli.transparent)?;
    println!("{}", name);
    Ok(())
}

fn generate_thumbnail(cli: &Cli) -> Result<()> {
    let thumbnailer = cli.thumbnailer(&cli.positional[0])?;
    let artifact = thumbnailer.get_thumbnail(&cli.sized_options(&cli.positional[1]), !cli.strict)?;
    save(cli, &artifact)
}

fn alias_thumbnail(cli: &Cli) -> Result<()> {
    let (source, alias) = (&cli.positional[0], &cli.positional[1]);
    let thumbnailer = cli.thumbnailer(source)?;
    match thumbnailer.lookup_by_alias(alias)? {
        Some(artifact) => save(cli, &artifact),
        None => bail!("No alias '{}' for '{}'", alias, source),
    }
}

fn list_aliases(cli: &Cli) -> Result<()> {
    let definitions = cli.aliases()?.definitions();
    if definitions.is_empty() {
        println!("No aliases configured.");
        return Ok(());
    }
    for definition in definitions {
        let target = definition.target.as_deref().unwrap_or("*");
        println!(
            "  • {} [{} {}] {}",
            definition.name,
            definition.scope,
            target,
            definition.options.opts_text()
        );
    }
    Ok(())
}

/// `batch` renders configured aliases only, silently, so per-request options
/// and modes have nothing to apply to.
fn check_batch_flags(cli: &Cli) -> Result<()> {
    if !cli.options.is_empty() {
        bail!(
            "batch renders configured aliases; option flags are not supported ({})",
            cli.options.opts_text()
        );
    }
    if cli.strict || cli.transparent {
        bail!("batch does not support --strict or --transparent");
    }
    Ok(())
}

fn batch(cli: &Cli) -> Result<()> {
    check_batch_flags(cli)?;
    let dir = Path::new(&cli.positional[0]);
    let sources: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| image::ImageFormat::from_path(entry.path()).is_ok())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(dir).ok()?;
            Some(relative.to_string_lossy().replace('\\', "/"))
        })
        .collect();

    println!("⚙️  Rendering aliases for {} images under {}", sources.len(), dir.display());
    let batch_cli = Cli {
        root: dir.to_path_buf(),
        out: Some(cli.out.clone().unwrap_or_else(|| dir.to_path_buf())),
        positional: Vec::new(),
        options: OptionSet::new(),
        config: cli.config.clone(),
        target: cli.target.clone(),
        transparent: false,
        strict: false,
        json: cli.json,
    };

    let failures: usize = sources
        .par_iter()
        .map(|source| {
            let thumbnailer = match batch_cli.thumbnailer(source) {
                Ok(thumbnailer) => thumbnailer,
                Err(e) => {
                    eprintln!("❌ {}: {:#}", source, e);
                    return 1;
                }
            };
            thumbnailer
                .generate_all_aliases(true)
                .into_iter()
                .filter(|(alias, result)| {
                    let outcome = match result {
                        Ok(artifact) => save(&batch_cli, artifact),
                        Err(e) => Err(anyhow::anyhow!("{}", e)),
                    };
                    match outcome {
                        Ok(()) => false,
                        Err(e) => {
                            eprintln!("❌ {} [{}]: {:#}", source, alias, e);
                            true
                        }
                    }
                })
                .count()
        })
        .sum();

    if failures > 0 {
        bail!("{} thumbnail(s) failed", failures);
    }
    println!("✅ Done");
    Ok(())
}

fn save(cli: &Cli, artifact: &ThumbnailArtifact) -> Result<()> {
    let storage = FileSystemStorage::new(cli.out_dir());
    let stored = storage
        .save(&artifact.name, &artifact.data)
        .with_context(|| format!("Failed to save {}", artifact.name))?;

    if cli.json {
        println!("{}", serde_json::to_string(artifact)?);
    } else {
        println!(
            "🎉 {} ({}x{}, {} bytes)",
            cli.out_dir().join(&stored).display(),
            artifact.width,
            artifact.height,
            artifact.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        Cli::parse(&args).unwrap()
    }

    #[test]
    fn test_parse_flags() {
        let cli = parse(&[
            "photo.png",
            "100x80",
            "--crop=smart",
            "--bw",
            "--quality",
            "70",
            "--json",
        ]);
        assert_eq!(cli.positional, vec!["photo.png", "100x80"]);
        assert_eq!(cli.options.get_str("crop"), Some("smart"));
        assert!(cli.options.flag("bw"));
        assert_eq!(cli.options.get_integer(QUALITY), Some(70));
        assert!(cli.json);
        assert!(!cli.strict);
    }

    #[test]
    fn test_parse_rejects_unknown_option() {
        let args = vec!["--nope".to_string()];
        assert!(Cli::parse(&args).is_err());
        let args = vec!["--quality".to_string()];
        assert!(Cli::parse(&args).is_err());
    }

    #[test]
    fn test_batch_rejects_request_flags() {
        assert!(check_batch_flags(&parse(&["photos"])).is_ok());
        assert!(check_batch_flags(&parse(&["photos", "--json", "--root", "."])).is_ok());
        assert!(check_batch_flags(&parse(&["photos", "--crop"])).is_err());
        assert!(check_batch_flags(&parse(&["photos", "--bw", "--sharpen"])).is_err());
        assert!(check_batch_flags(&parse(&["photos", "--strict"])).is_err());
    }
}
