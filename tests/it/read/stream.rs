use futures::io::Cursor;
use futures::{pin_mut, StreamExt, TryStreamExt};

use streamed_batch::error::{Error, Result};
use streamed_batch::read::{get_line_stream, get_page_stream, read_pages};
use streamed_batch::{FallibleStreamingIterator, ReadOptions};

use super::utils::*;

#[tokio::test]
async fn lines() -> Result<()> {
    let text = sample_text(3000);
    let compressed = gzip(text.as_bytes());

    let lines = get_line_stream(Cursor::new(compressed), 333)
        .try_collect::<Vec<_>>()
        .await?;
    assert_eq!(lines, expected_lines(&text));
    Ok(())
}

#[tokio::test]
async fn same_pages_as_iterator() -> Result<()> {
    let text = format!("header 1\nheader 2\n{}", sample_text(2345));
    let compressed = gzip(text.as_bytes());
    let options = ReadOptions {
        chunk_size: 1000,
        page_size: 100,
        ..Default::default()
    };

    let mut expected = vec![];
    let mut pages = read_pages(std::io::Cursor::new(compressed.clone()), &options)?;
    while let Some(page) = pages.next()? {
        expected.push(page.clone());
    }

    let stream = get_page_stream(Cursor::new(compressed), &options)?;
    let result = stream.try_collect::<Vec<_>>().await?;
    assert_eq!(result, expected);
    assert_eq!(result.len(), 24);
    Ok(())
}

#[tokio::test]
async fn short_header() -> Result<()> {
    let compressed = gzip(b"only one line\n");
    let stream = get_page_stream(Cursor::new(compressed), &ReadOptions::default())?;
    pin_mut!(stream);
    assert_eq!(
        stream.next().await,
        Some(Err(Error::UnexpectedEndOfStream {
            expected: 2,
            found: 1
        }))
    );
    assert!(stream.next().await.is_none());
    Ok(())
}

#[tokio::test]
async fn truncated() -> Result<()> {
    let compressed = gzip(sample_text(100).as_bytes());
    let truncated = compressed[..compressed.len() / 2].to_vec();
    let result = get_line_stream(Cursor::new(truncated), 64)
        .try_collect::<Vec<_>>()
        .await;
    assert!(matches!(result, Err(Error::Decompression(_))));
    Ok(())
}
