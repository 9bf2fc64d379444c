use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use apngcodec::logger::Logger;
use apngcodec::writer::Writer;
use apngcodec::{log_debug, log_error, log_info, ApngCodec};
use clap::Parser;
use glob::glob;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[clap(name = "apngcodec")]
struct Cli {
    #[arg(required = true, help = "File or glob pattern")]
    path: String,

    #[arg(short, long, value_parser = ["pam", "ppm"], help = "Output format")]
    format: Option<String>,

    #[arg(short = 'o', long = "output-dir", help = "Output directory for decoded frames")]
    output_dir: Option<String>,

    #[arg(long, help = "Only decode this frame")]
    frame: Option<u32>,

    #[arg(long, help = "Print animation and frame metadata")]
    info: bool,

    #[arg(long, help = "Decode the frames without writing to a file")]
    void: bool,

    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
}

fn get_files(path: &str) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let absolute_pattern = if Path::new(path).is_relative() {
        base_dir.join(path).to_string_lossy().into_owned()
    } else {
        path.to_string()
    };

    for entry in glob(&absolute_pattern)? {
        match entry {
            Ok(path) => {
                if !path.is_file() {
                    continue;
                }

                files.push(path);
            }
            Err(e) => eprintln!("{:?}", e),
        }
    }

    Ok(files)
}

fn get_output_path(file: &Path, output_dir: Option<&str>, index: u32, format: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let file_stem = file
        .file_stem()
        .ok_or("Invalid file name")?
        .to_str()
        .ok_or("Invalid file stem")?;

    let dir = match output_dir {
        Some(dir) => {
            let output_dir = Path::new(dir);

            if !output_dir.exists() {
                fs::create_dir_all(output_dir)?;
            }

            output_dir.to_path_buf()
        }
        None => file.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
    };

    Ok(dir.join(format!("{}_frame_{}.{}", file_stem, index, format)))
}

fn print_info(file: &Path, codec: &ApngCodec<impl std::io::Read + std::io::Seek>) {
    println!("File: {}", file.display());
    println!("  Canvas: {}x{}", codec.width(), codec.height());
    println!("  Animated: {}", codec.is_animated());
    println!("  Frames: {}", codec.frame_count());
    println!("  Alpha: {}", codec.store().reports_alpha());

    if let Some(declared) = codec.store().declared_frames() {
        if declared != codec.frame_count() {
            println!("  Declared frames: {}", declared);
        }
    }

    match codec.repetition_count() {
        0 => println!("  Plays: forever"),
        n => println!("  Plays: {}", n),
    }

    let data_len = |i: usize| codec.store().frames().get(i).map_or(0, |frame| frame.data_len());

    for (i, info) in codec.frame_infos().iter().enumerate() {
        println!(
            "  #{:<3} {}x{}+{}+{} {}ms {:?}/{:?} required={:?} alpha={} fdAT={}B{}",
            i,
            info.rect.width,
            info.rect.height,
            info.rect.x,
            info.rect.y,
            info.duration_ms,
            info.disposal,
            info.blend,
            info.required_frame,
            info.has_alpha,
            data_len(i),
            if info.complete { "" } else { " (incomplete)" }
        );
    }
}

fn process_file(file: &Path, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut codec = ApngCodec::open(file)?;

    if cli.info {
        print_info(file, &codec);
        return Ok(());
    }

    let frames: Vec<u32> = match cli.frame {
        Some(index) => vec![index],
        None => (0..codec.frame_count()).collect(),
    };

    let format = cli.format.as_deref().unwrap_or("pam");

    for index in frames {
        let start = Instant::now();
        let pixels = match codec.decode_frame_to_vec(index) {
            Ok(pixels) => pixels,
            Err(e) if e.is_incomplete() => {
                eprintln!("Frame {}: {}", index, e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        log_debug!("Decoded frame {} in {:?}", index, start.elapsed());

        if cli.void {
            continue;
        }

        let output_path = get_output_path(file, cli.output_dir.as_deref(), index, format)?;
        log_info!("Writing to: {}", output_path.display());

        match format {
            "ppm" => Writer::write_ppm(&output_path, codec.width(), codec.height(), &pixels)?,
            _ => Writer::write_pam(&output_path, codec.width(), codec.height(), &pixels)?,
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    Logger::init(level)?;

    let files = get_files(&cli.path)?;

    if files.is_empty() {
        eprintln!("No files found matching pattern: {}", cli.path);
        return Ok(());
    }

    for file in files {
        if let Err(err) = process_file(&file, &cli) {
            log_error!("Error processing {}: {}", file.display(), err);
            continue;
        }
    }

    Ok(())
}
