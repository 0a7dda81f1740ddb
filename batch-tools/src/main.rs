use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

use clap::Parser;
use s3::Bucket;

use streamed_batch::driver::{run, run_async, ObjectLocation, Sink, Summary, TriggerEvent};
use streamed_batch::error::{Error, Result};
use streamed_batch::page::Page;
use streamed_batch::source::ReadChunkSource;
use streamed_batch::ReadOptions;

mod ranged;
use ranged::RangedStreamer;

/// Reads a gzip-compressed text object into pages of lines.
///
/// The object is either the one referenced by an S3 (or SNS-wrapped S3) notification,
/// an explicit bucket and key, or a local file.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path to a json notification event; `-` reads it from stdin
    #[clap(long, value_name = "PATH", conflicts_with_all = &["bucket", "file"])]
    event: Option<String>,

    /// The bucket of the object
    #[clap(long, requires = "key", conflicts_with = "file")]
    bucket: Option<String>,

    /// The key of the object
    #[clap(long, requires = "bucket")]
    key: Option<String>,

    /// A local gzip-compressed file
    #[clap(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// The region of the bucket
    #[clap(long, default_value = "us-east-1")]
    region: String,

    /// Compressed bytes read at once [env: CHUNK_SIZE_BYTES]
    #[clap(long)]
    chunk_size: Option<usize>,

    /// Lines discarded at the start of the object [env: HEADER_LINES]
    #[clap(long)]
    header_lines: Option<usize>,

    /// Lines per page [env: PAGE_SIZE]
    #[clap(long)]
    page_size: Option<usize>,

    /// Write every line to stdout
    #[clap(long)]
    print: bool,
}

impl Args {
    fn options(&self) -> Result<ReadOptions> {
        let mut options = ReadOptions::from_env()?;
        if let Some(chunk_size) = self.chunk_size {
            options.chunk_size = chunk_size;
        }
        if let Some(header_lines) = self.header_lines {
            options.header_lines = header_lines;
        }
        if let Some(page_size) = self.page_size {
            options.page_size = page_size;
        }
        options.validate()?;
        Ok(options)
    }

    fn location(&self) -> Result<ObjectLocation> {
        if let (Some(bucket), Some(key)) = (&self.bucket, &self.key) {
            return Ok(ObjectLocation {
                bucket: bucket.clone(),
                key: key.clone(),
            });
        }
        let json = match self.event.as_deref() {
            Some("-") => {
                let mut json = String::new();
                std::io::stdin().read_to_string(&mut json)?;
                json
            }
            Some(path) => std::fs::read_to_string(path)?,
            None => {
                return Err(Error::InvalidEvent(
                    "one of --event, --bucket/--key or --file is required".to_string(),
                ))
            }
        };
        TriggerEvent::from_json(&json)?.location()
    }
}

/// Placeholder for the submission of a page: logs it and optionally writes its lines.
struct LineSink {
    print: bool,
}

impl Sink for LineSink {
    fn accept(&mut self, page: &Page) -> Result<()> {
        log::info!(
            "Page {}: lines {}..{}",
            page.number(),
            page.offset(),
            page.offset() + page.len()
        );
        if self.print {
            let stdout = std::io::stdout();
            let mut stdout = stdout.lock();
            for line in page {
                writeln!(stdout, "{}", line).map_err(|e| Error::Sink(e.to_string()))?;
            }
        }
        Ok(())
    }
}

fn unavailable<E: std::fmt::Display>(e: E) -> Error {
    Error::SourceUnavailable(e.to_string())
}

async fn run_s3(
    location: &ObjectLocation,
    region: &str,
    options: &ReadOptions,
    sink: &mut LineSink,
) -> Result<Summary> {
    let region = region
        .parse()
        .map_err(|_| Error::InvalidConfiguration(format!("unknown region \"{}\"", region)))?;
    let bucket = Bucket::new_public(&location.bucket, region).map_err(unavailable)?;

    let (head, _) = bucket.head_object(&location.key).await.map_err(unavailable)?;
    let length = head.content_length.unwrap_or_default().max(0) as u64;
    log::info!(
        "Reading s3://{}/{} ({} bytes)",
        location.bucket,
        location.key,
        length
    );

    let reader = RangedStreamer::new(length, bucket, location.key.clone(), options.chunk_size);
    run_async(reader, options, sink).await
}

async fn try_main(args: Args) -> Result<Summary> {
    let options = args.options()?;
    let mut sink = LineSink { print: args.print };

    if let Some(path) = &args.file {
        log::info!("Reading {}", path.display());
        let source = ReadChunkSource::new(File::open(path)?, options.chunk_size);
        return run(source, &options, &mut sink);
    }

    let location = args.location()?;
    run_s3(&location, &args.region, &options, &mut sink).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("LOG_LEVEL", "warn")).init();

    let args = Args::parse();
    match try_main(args).await {
        Ok(summary) => log::info!("{} lines in {} pages", summary.lines, summary.pages),
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
