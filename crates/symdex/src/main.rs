use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use symdex_core::backend::{LocalBackend, SymbolBackend};
use symdex_core::events::{event_channel, SymbolEvent};
use symdex_core::labels::LabelMap;
use symdex_core::modules::ModuleRegistry;
use symdex_core::symbols::image::ParsedImage;
use symdex_core::types::Address;
use symdex_core::{addr_from_name, Result, SymbolConfig, SymbolInfo, SymbolStoreSync, SymdexError, SyncOutcome};
use symdex_utils::{info, init_logging_with, LogFormat, LogLevel, LogSettings};

/// Images without a preferred base (and images that would overlap an
/// earlier one) are placed from here upwards.
const FIRST_FREE_BASE: u64 = 0x10000;
const BASE_ALIGNMENT: u64 = 0x10000;

/// Inspect symbols, source lines and symbol store state of executable images.
#[derive(Parser, Debug)]
#[command(name = "symdex")]
#[command(version)]
#[command(about = "Inspect symbols, source lines and symbol store state of executable images", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
    /// Log output format: pretty or json (overrides SYMDEX_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ImageArgs
{
    /// Path to the executable image
    image: PathBuf,
    /// Load address (hex format: 0x400000 or decimal). Defaults to the image's preferred base
    #[arg(long, value_parser = parse_address)]
    base: Option<Address>,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List cached symbols, the entry point and imports of an image
    Symbols
    {
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Show the symbolic name of addresses inside an image
    Resolve
    {
        #[command(flatten)]
        image: ImageArgs,
        /// Addresses to resolve
        #[arg(required = true, value_parser = parse_address)]
        addresses: Vec<Address>,
        /// User label, as ADDR=NAME (repeatable)
        #[arg(long = "label", value_parser = parse_label)]
        labels: Vec<(Address, String)>,
    },
    /// Show the source file and line of an address
    Line
    {
        #[command(flatten)]
        image: ImageArgs,
        #[arg(value_parser = parse_address)]
        address: Address,
    },
    /// Look up the address of a symbol by name
    Address
    {
        #[command(flatten)]
        image: ImageArgs,
        name: String,
    },
    /// Load images side by side and print the module list
    Modules
    {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Reload debug information of images from a symbol store
    Sync
    {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Symbol store URL (defaults to SYMDEX_SYMBOL_STORE or the public Microsoft store)
        #[arg(long)]
        store: Option<String>,
        /// Local symbol cache directory (defaults to SYMDEX_SYMBOL_CACHE)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

fn main()
{
    let cli = Cli::parse();

    let settings = LogSettings::from_env()
        .with_level(cli.log_level)
        .with_format(cli.log_format);
    let _log_guard = match init_logging_with(settings) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_command(command: Commands) -> Result<()>
{
    match command {
        Commands::Symbols { image } => {
            let (info, base) = open_image(&image, Arc::new(LabelMap::new()))?;
            let count = info.enumerate(base, |record| {
                let marker = if record.is_imported { "import" } else { "" };
                println!("{}  {:<6}  {}", record.address, marker, record.display_name());
                ControlFlow::Continue(())
            });
            info!(count, image = %image.image.display(), "listed symbols");
            Ok(())
        }
        Commands::Resolve {
            image,
            addresses,
            labels,
        } => {
            let label_map = Arc::new(LabelMap::new());
            for (address, label) in labels {
                label_map.set_label(address, label);
            }
            let (info, _) = open_image(&image, label_map)?;
            for address in addresses {
                let name = info.resolve_symbolic_name(address);
                println!("{}  {}", address, if name.is_empty() { "?" } else { name.as_str() });
            }
            Ok(())
        }
        Commands::Line { image, address } => {
            let (info, _) = open_image(&image, Arc::new(LabelMap::new()))?;
            match info.find_source_line(address) {
                Some(line) => println!("{}:{}", line.file, line.line),
                None => println!("{}  no line information", address),
            }
            Ok(())
        }
        Commands::Address { image, name } => {
            let (info, base) = open_image(&image, Arc::new(LabelMap::new()))?;
            let backend = LocalBackend::new(info.registry().clone());
            backend.load_module(&image.image, base)?;
            backend.module_info(base)?;

            match addr_from_name(&backend, &name) {
                Some(address) => println!("{}  {}", address, info.resolve_symbolic_name(address)),
                None => return Err(SymdexError::SymbolNotFound(name)),
            }
            Ok(())
        }
        Commands::Modules { images } => {
            let registry = Arc::new(ModuleRegistry::new());
            load_side_by_side(&registry, &images)?;
            let info = SymbolInfo::new(registry, Arc::new(LabelMap::new()));

            let (sender, receiver) = event_channel();
            info.update_module_list(&sender);
            drop(sender);
            for event in receiver {
                if let SymbolEvent::ModuleListUpdated(modules) = &event {
                    for module in modules {
                        println!("{}  {}", module.base, module.name);
                    }
                }
                info!("{}", event.describe());
            }
            Ok(())
        }
        Commands::Sync {
            images,
            store,
            cache_dir,
        } => {
            let mut config = SymbolConfig::from_env();
            if let Some(cache_dir) = cache_dir {
                config.cache_dir = cache_dir;
            }

            let registry = Arc::new(ModuleRegistry::new());
            load_side_by_side(&registry, &images)?;
            let backend = LocalBackend::new(registry.clone());
            let summary = SymbolStoreSync::new(&backend, &registry, &config).sync_all(store.as_deref())?;

            for result in &summary.modules {
                let outcome = match &result.outcome {
                    SyncOutcome::Full => "full".to_string(),
                    SyncOutcome::Incomplete(kind) => kind.to_string(),
                    SyncOutcome::Failed(reason) => format!("failed: {reason}"),
                };
                println!(
                    "{}  {:<24}  {} (attempts: {})",
                    result.module.base, result.module.name, outcome, result.attempts
                );
            }
            info!("{}", SymbolEvent::SyncFinished(summary).describe());
            Ok(())
        }
    }
}

/// Load one image into a fresh registry and wrap it for lookups.
fn open_image(args: &ImageArgs, labels: Arc<LabelMap>) -> Result<(SymbolInfo, Address)>
{
    let registry = Arc::new(ModuleRegistry::new());
    let module = symdex_core::symbols::image::load_module(&args.image, args.base)?;
    let base = module.base;
    info!(image = %args.image.display(), %base, "loaded image");
    registry.insert(module);
    Ok((SymbolInfo::new(registry, labels), base))
}

/// Load images at non-overlapping bases, in the order given.
fn load_side_by_side(registry: &ModuleRegistry, images: &[PathBuf]) -> Result<()>
{
    let mut next_free = FIRST_FREE_BASE;
    for path in images {
        let image = ParsedImage::parse(path)?;
        let preferred = image.preferred_base.value();
        let base = if preferred < next_free { next_free } else { preferred };
        next_free = align_up(base.saturating_add(image.size.max(1)));

        info!(image = %path.display(), base = %Address::new(base), "loaded image");
        registry.insert(image.into_module(Address::new(base)));
    }
    Ok(())
}

fn align_up(value: u64) -> u64
{
    value.div_ceil(BASE_ALIGNMENT).saturating_mul(BASE_ALIGNMENT)
}

/// Parse an address in hex (`0x` prefix) or decimal.
fn parse_address(text: &str) -> std::result::Result<Address, String>
{
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    parsed
        .map(Address::new)
        .map_err(|err| format!("invalid address `{text}`: {err}"))
}

/// Parse `ADDR=NAME`.
fn parse_label(text: &str) -> std::result::Result<(Address, String), String>
{
    let (address, name) = text
        .split_once('=')
        .ok_or_else(|| format!("expected ADDR=NAME, got `{text}`"))?;
    if name.is_empty() {
        return Err(format!("empty label name in `{text}`"));
    }
    Ok((parse_address(address)?, name.to_string()))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_address()
    {
        assert_eq!(parse_address("0x401000"), Ok(Address::new(0x401000)));
        assert_eq!(parse_address("0X10"), Ok(Address::new(0x10)));
        assert_eq!(parse_address("4096"), Ok(Address::new(4096)));
        assert!(parse_address("0xzz").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn test_parse_label()
    {
        assert_eq!(
            parse_label("0x401000=entry"),
            Ok((Address::new(0x401000), "entry".to_string()))
        );
        assert!(parse_label("0x401000").is_err());
        assert!(parse_label("0x401000=").is_err());
        assert!(parse_label("nope=entry").is_err());
    }

    #[test]
    fn test_align_up()
    {
        assert_eq!(align_up(0x10001), 0x20000);
        assert_eq!(align_up(0x20000), 0x20000);
    }

    #[test]
    fn test_cli_parses_sync()
    {
        let cli = Cli::try_parse_from(["symdex", "sync", "a.so", "b.so", "--store", "https://s.test", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        match cli.command {
            Commands::Sync { images, store, cache_dir } => {
                assert_eq!(images.len(), 2);
                assert_eq!(store.as_deref(), Some("https://s.test"));
                assert!(cache_dir.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_resolve_labels()
    {
        let cli = Cli::try_parse_from(["symdex", "resolve", "app", "0x401000", "--label", "0x401000=entry", "--base", "0x400000"]).unwrap();
        match cli.command {
            Commands::Resolve { image, addresses, labels } => {
                assert_eq!(image.base, Some(Address::new(0x400000)));
                assert_eq!(addresses, [Address::new(0x401000)]);
                assert_eq!(labels, [(Address::new(0x401000), "entry".to_string())]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
