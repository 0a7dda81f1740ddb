//! Runs the pipeline for one invocation: resolves the object from the trigger event,
//! reads it into pages and hands every page to a [`Sink`].
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use streaming_decompression::FallibleStreamingIterator;

use crate::error::{Error, Result};
use crate::page::Page;
use crate::read::{get_page_iterator, ReadOptions};
use crate::source::ChunkSource;

/// The location of an object in an object store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    /// The name of the bucket
    pub bucket: String,
    /// The (decoded) key of the object
    pub key: String,
}

/// An object store notification, as delivered by S3 directly or wrapped in an SNS message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

/// A record of a [`TriggerEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventRecord {
    /// Set on S3 notifications
    #[serde(default)]
    pub s3: Option<S3Entity>,
    /// Set on SNS notifications
    #[serde(rename = "Sns", default)]
    pub sns: Option<SnsEntity>,
}

/// The object an S3 notification refers to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

/// The bucket of an [`S3Entity`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

/// The object of an [`S3Entity`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectEntity {
    /// The url-encoded key
    pub key: String,
    /// The size in bytes, when known
    #[serde(default)]
    pub size: Option<u64>,
}

/// An SNS notification whose message is itself a [`TriggerEvent`] serialized as json.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SnsEntity {
    #[serde(rename = "Message")]
    pub message: String,
}

impl TriggerEvent {
    /// Parses a [`TriggerEvent`] from json.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the location of the object this event refers to.
    ///
    /// Only the first record is used; object keys are url-decoded.
    pub fn location(&self) -> Result<ObjectLocation> {
        let record = self
            .records
            .first()
            .ok_or_else(|| Error::InvalidEvent("the event has no records".to_string()))?;
        if self.records.len() > 1 {
            log::warn!(
                "The event has {} records; only the first one is processed",
                self.records.len()
            );
        }

        match (&record.s3, &record.sns) {
            (Some(s3), _) => Ok(ObjectLocation {
                bucket: s3.bucket.name.clone(),
                key: decode_key(&s3.object.key)?,
            }),
            (None, Some(sns)) => TriggerEvent::from_json(&sns.message)?.location(),
            (None, None) => Err(Error::InvalidEvent(
                "the record has neither an s3 nor an sns entity".to_string(),
            )),
        }
    }
}

/// Decodes an object key as encoded in notifications (`+` for spaces and `%XX` escapes).
fn decode_key(key: &str) -> Result<String> {
    percent_decode_str(&key.replace('+', " "))
        .decode_utf8()
        .map(|key| key.into_owned())
        .map_err(|e| {
            Error::InvalidEvent(format!(
                "the object key \"{}\" is not valid utf8 once decoded: {}",
                key, e
            ))
        })
}

/// The consumer of pages.
pub trait Sink {
    /// Accepts one page. Any error aborts the invocation.
    fn accept(&mut self, page: &Page) -> Result<()>;
}

impl<F: FnMut(&Page) -> Result<()>> Sink for F {
    fn accept(&mut self, page: &Page) -> Result<()> {
        self(page)
    }
}

/// The outcome of a successful invocation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Summary {
    /// The number of pages handed to the sink
    pub pages: usize,
    /// The number of lines handed to the sink
    pub lines: usize,
}

impl Summary {
    fn add(&mut self, page: &Page) {
        self.pages += 1;
        self.lines += page.len();
    }
}

/// Reads the gzip-compressed object in `source` into pages and hands each of them to `sink`.
///
/// The first error (from the source, the decompression, the header or the sink) aborts the
/// invocation and is returned as is.
pub fn run<S: ChunkSource, K: Sink + ?Sized>(
    source: S,
    options: &ReadOptions,
    sink: &mut K,
) -> Result<Summary> {
    let mut pages = get_page_iterator(source, options)?;

    let mut summary = Summary::default();
    while let Some(page) = pages.next()? {
        log::debug!(
            "Page {} with {} lines (from line {})",
            page.number(),
            page.len(),
            page.offset()
        );
        sink.accept(page)?;
        summary.add(page);
    }
    Ok(summary)
}

/// Resolves the object of `event`, opens it with `open` and [`run`]s it into `sink`.
pub fn handle_event<S, F, K>(
    event: &TriggerEvent,
    options: &ReadOptions,
    open: F,
    sink: &mut K,
) -> Result<Summary>
where
    S: ChunkSource,
    F: FnOnce(&ObjectLocation, &ReadOptions) -> Result<S>,
    K: Sink + ?Sized,
{
    let location = event.location()?;
    log::info!("Processing s3://{}/{}", location.bucket, location.key);

    let source = open(&location, options)?;
    let summary = run(source, options, sink)?;

    log::info!(
        "Processed s3://{}/{}: {} lines in {} pages",
        location.bucket,
        location.key,
        summary.lines,
        summary.pages
    );
    Ok(summary)
}

/// Reads the gzip-compressed content of `reader` into pages and hands each of them to `sink`.
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub async fn run_async<R, K>(reader: R, options: &ReadOptions, sink: &mut K) -> Result<Summary>
where
    R: futures::AsyncRead + Unpin + Send,
    K: Sink + ?Sized,
{
    use futures::{pin_mut, StreamExt};

    let pages = crate::read::get_page_stream(reader, options)?;
    pin_mut!(pages);

    let mut summary = Summary::default();
    while let Some(page) = pages.next().await {
        let page = page?;
        sink.accept(&page)?;
        summary.add(&page);
    }
    Ok(summary)
}
