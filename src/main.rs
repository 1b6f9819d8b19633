use clap::{Parser, Subcommand};
use std::path::PathBuf;

use au3x::{extract, AutoItResource, ExtractOptions, ResourceState, TokenType};

#[derive(Parser)]
#[command(name = "au3x", version = "1.0.0", about = "AU3 script container extraction engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate the embedded container and report its format version and resource count
    Scan { input: PathBuf },
    /// List every resource's metadata without writing anything to disk
    List {
        input: PathBuf,
        /// Emit the resource list as a JSON array instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Extract, decompress, and dump every resource to a directory
    Extract {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = "dump")]
        output_dir: PathBuf,
        /// Tokens probed before trusting a non-printable resource as a script
        #[arg(long, default_value = "3")]
        accuracy: u32,
    },
    /// Dump the raw token stream of one resource (compiled-token scripts only)
    Tokens {
        input: PathBuf,
        /// Index into the resource list, as reported by `list`
        #[arg(long, default_value = "0")]
        resource: usize,
        #[arg(long, default_value = "200")]
        limit: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Commands::Scan { input } => {
            let data = std::fs::read(&input)?;
            let file = au3x::get_scripts(&data)?;
            println!("── au3x scan ────────────────────────────────────────────");
            println!("  Source:   {}", input.display());
            println!("  Version:  {}", file.version);
            println!("  Resources: {}", file.resources.len());
        }

        Commands::List { input, json } => {
            let data = std::fs::read(&input)?;
            let opts = ExtractOptions { auto_decompress: false, ..ExtractOptions::default() };
            let file = extract(&data, &opts)?;
            if json {
                let summaries: Vec<_> = file.resources.iter().map(|r| r.summary()).collect();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                println!("{:<28} {:>12} {:>14} {:>9}  State", "Name", "Compressed", "Decompressed", "Checksum");
                for res in &file.resources {
                    println!(
                        "{:<28} {:>12} {:>14} {:>9x}  {}",
                        res.name(),
                        res.compressed_size,
                        res.decompressed_size,
                        res.checksum,
                        res.state,
                    );
                }
            }
        }

        Commands::Extract { input, output_dir, accuracy } => {
            let data = std::fs::read(&input)?;
            let opts = ExtractOptions { script_accuracy: accuracy, auto_decompress: true };
            let file = extract(&data, &opts)?;
            std::fs::create_dir_all(&output_dir)?;

            println!("── au3x extract ─────────────────────────────────────────");
            println!("  Source:   {}", input.display());
            println!("  Version:  {}", file.version);
            println!("  Output:   {}", output_dir.display());
            println!();

            let mut dumped = 0usize;
            for res in &file.resources {
                let name = au3x::util::sanitize_dump_name(res.name());
                let path = output_dir.join(&name);
                std::fs::write(&path, &res.data)?;
                let is_script = res.is_autoit_script(accuracy);
                println!(
                    "  dumped  {:<24} {:>8} B  state={:<12} script={}",
                    name,
                    res.data.len(),
                    res.state.to_string(),
                    is_script,
                );
                dumped += 1;
            }
            println!();
            println!("Extracted {dumped} resource(s) -> {}", output_dir.display());
        }

        Commands::Tokens { input, resource, limit } => {
            let data = std::fs::read(&input)?;
            let file = extract(&data, &ExtractOptions::default())?;
            let res: &AutoItResource =
                file.resources.get(resource).ok_or("resource index out of range")?;

            if res.state != ResourceState::Decompressed && res.state != ResourceState::Decompiled {
                eprintln!("warning: resource was not compressed or failed to decompress; dumping raw bytes as tokens");
            }

            let mut lexer = res.create_tokenizer();
            for i in 0..limit {
                let tok = lexer.next_token();
                if tok.token_type == TokenType::Eof {
                    println!("[{i:5}] EOF");
                    break;
                }
                if tok.token_type == TokenType::Invalid {
                    println!("[{i:5}] INVALID (id={})", tok.id);
                    break;
                }
                println!("[{i:5}] id={:#04x}  {:?} = {:?}", tok.id, tok.token_type, tok.value);
            }
        }
    }

    Ok(())
}
