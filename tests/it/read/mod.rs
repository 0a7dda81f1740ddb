#[cfg(feature = "async")]
mod stream;

use std::io::Cursor;

use streamed_batch::error::{Error, Result};
use streamed_batch::read::{get_line_reader, get_page_iterator, read_pages, LineReader};
use streamed_batch::source::ReadChunkSource;
use streamed_batch::{FallibleStreamingIterator, ReadOptions};

use utils::*;

fn read_lines(chunks: Vec<Result<Vec<u8>>>) -> Result<Vec<String>> {
    get_line_reader(chunks.into_iter()).collect()
}

fn collect_pages(chunks: Vec<Result<Vec<u8>>>, options: &ReadOptions) -> Result<Vec<Vec<String>>> {
    let mut pages = get_page_iterator(chunks.into_iter(), options)?;
    let mut result = vec![];
    while let Some(page) = pages.next()? {
        result.push(page.lines().to_vec());
    }
    Ok(result)
}

#[test]
fn independent_of_chunk_boundaries() -> Result<()> {
    let text = sample_text(2000);
    let expected = expected_lines(&text);
    let compressed = gzip(text.as_bytes());

    assert_eq!(read_lines(vec![Ok(compressed.clone())])?, expected);
    for (seed, count) in [(0, 1), (1, 2), (2, 10), (3, 100), (4, 1000)] {
        let chunks = random_split(&compressed, count, seed);
        assert_eq!(read_lines(chunks)?, expected, "seed {}", seed);
    }
    Ok(())
}

#[test]
fn one_byte_chunks() -> Result<()> {
    let text = sample_text(100);
    let compressed = gzip(text.as_bytes());
    let chunks = compressed.iter().map(|x| Ok(vec![*x])).collect();
    assert_eq!(read_lines(chunks)?, expected_lines(&text));
    Ok(())
}

#[test]
fn empty_chunks() -> Result<()> {
    let compressed = gzip(b"a\nb\n");
    let (first, second) = compressed.split_at(5);
    let chunks = vec![
        Ok(vec![]),
        Ok(first.to_vec()),
        Ok(vec![]),
        Ok(vec![]),
        Ok(second.to_vec()),
    ];
    assert_eq!(read_lines(chunks)?, vec!["a", "b"]);
    Ok(())
}

#[test]
fn terminator_around_chunk_boundary() -> Result<()> {
    let text = "first line\nsecond line\nthird line\n";
    let boundary = text.find('\n').unwrap() + 1;
    for at in [boundary - 1, boundary, boundary + 1] {
        let (compressed, offset) = gzip_with_flush(text.as_bytes(), at);
        let chunks = split_at(&compressed, &[offset]);
        assert_eq!(
            read_lines(chunks)?,
            vec!["first line", "second line", "third line"],
            "boundary at {}",
            at
        );
    }
    Ok(())
}

#[test]
fn no_terminator() -> Result<()> {
    let text = "a single line without terminator ".repeat(1000);
    let compressed = gzip(text.as_bytes());
    let chunks = random_split(&compressed, 20, 7);
    assert_eq!(read_lines(chunks)?, vec![text]);
    Ok(())
}

#[test]
fn empty_object() -> Result<()> {
    let compressed = gzip(b"");
    assert!(read_lines(vec![Ok(compressed)])?.is_empty());
    Ok(())
}

#[test]
fn lines_are_read_on_demand() -> Result<()> {
    let text = sample_text(10000);
    let compressed = gzip(text.as_bytes());
    let source = ReadChunkSource::new(Cursor::new(compressed), 64);

    let mut reader: LineReader<_> = get_line_reader(source);
    assert_eq!(reader.chunks_read(), 0);
    assert_eq!(reader.next().transpose()?, Some("0".to_string()));
    let after_first = reader.chunks_read();
    assert!(after_first > 0 && after_first < 10);

    assert_eq!(reader.by_ref().count(), 9999);
    assert_eq!(reader.lines_read(), 10000);
    Ok(())
}

#[test]
fn decompressed_bytes_are_bounded() -> Result<()> {
    let line = "a short and very repetitive line";
    let count = 1 << 18;
    let compressed = gzip(format!("{}\n", line).repeat(count).as_bytes());
    // a single chunk that expands to about 8 MiB
    let mut reader = get_line_reader(vec![Ok::<_, Error>(compressed)].into_iter());

    assert_eq!(reader.next().transpose()?.as_deref(), Some(line));
    assert!(reader.buffered() <= 64 * 1024);

    let mut read = 1;
    while let Some(next) = reader.next() {
        assert_eq!(next?, line);
        assert!(reader.buffered() <= 64 * 1024 + line.len() + 1);
        read += 1;
    }
    assert_eq!(read, count);
    Ok(())
}

#[test]
fn corrupted() -> Result<()> {
    let text = sample_text(500);
    let half = text.len() / 2;
    let at = text.as_bytes()[..half]
        .iter()
        .rposition(|&b| b == b'\n')
        .unwrap()
        + 1;
    let (mut compressed, offset) = gzip_with_flush(text.as_bytes(), at);
    // a deflate block with the reserved block type
    compressed[offset] = 0xff;

    let mut reader = get_line_reader(split_at(&compressed, &[offset]).into_iter());
    let mut lines = vec![];
    let error = loop {
        match reader.next() {
            Some(Ok(line)) => lines.push(line),
            Some(Err(e)) => break e,
            None => panic!("a corrupted stream must error"),
        }
    };
    assert!(matches!(error, Error::Decompression(_)));
    assert_eq!(lines, expected_lines(&text[..at]));
    assert!(reader.next().is_none());
    Ok(())
}

#[test]
fn truncated() {
    let compressed = gzip(b"a\nb\nc");
    let truncated = compressed[..compressed.len() - 4].to_vec();
    let result = read_lines(vec![Ok(truncated)]);
    assert!(matches!(result, Err(Error::Decompression(_))));

    let result = read_lines(vec![]);
    assert!(matches!(result, Err(Error::Decompression(_))));
}

#[test]
fn invalid_utf8() {
    let compressed = gzip(b"ok\nalso ok\n\xc3\x28\nnever read\n");
    let mut reader = get_line_reader(vec![Ok::<_, Error>(compressed)].into_iter());
    assert_eq!(reader.next(), Some(Ok("ok".to_string())));
    assert_eq!(reader.next(), Some(Ok("also ok".to_string())));
    assert!(matches!(
        reader.next(),
        Some(Err(Error::Encoding { line: 3, .. }))
    ));
    assert!(reader.next().is_none());
}

#[test]
fn source_errors() {
    let compressed = gzip(sample_text(100).as_bytes());
    let chunks = vec![
        Ok(compressed[..20].to_vec()),
        Err(Error::SourceUnavailable("connection reset".to_string())),
    ];
    let result = read_lines(chunks);
    assert_eq!(
        result,
        Err(Error::SourceUnavailable("connection reset".to_string()))
    );
}

#[test]
fn pages() -> Result<()> {
    let compressed = gzip(b"h1\nh2\nA\nB\nC\nD\nE\n");
    let options = ReadOptions {
        header_lines: 2,
        page_size: 2,
        ..Default::default()
    };
    let pages = collect_pages(random_split(&compressed, 5, 11), &options)?;
    assert_eq!(pages, vec![vec!["A", "B"], vec!["C", "D"], vec!["E"]]);
    Ok(())
}

#[test]
fn header_only() -> Result<()> {
    let compressed = gzip(b"h1\nh2\n");
    let pages = collect_pages(vec![Ok(compressed)], &ReadOptions::default())?;
    assert!(pages.is_empty());
    Ok(())
}

#[test]
fn no_header() -> Result<()> {
    let text = sample_text(2500);
    let compressed = gzip(text.as_bytes());
    let options = ReadOptions {
        header_lines: 0,
        ..Default::default()
    };
    let pages = collect_pages(vec![Ok(compressed)], &options)?;
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[2].len(), 500);
    assert_eq!(
        pages.into_iter().flatten().collect::<Vec<_>>(),
        expected_lines(&text)
    );
    Ok(())
}

#[test]
fn short_header() {
    let compressed = gzip(b"h1\n");
    let options = ReadOptions {
        header_lines: 2,
        ..Default::default()
    };
    let mut pages = get_page_iterator(vec![Ok::<_, Error>(compressed)].into_iter(), &options).unwrap();
    assert_eq!(
        pages.next().err(),
        Some(Error::UnexpectedEndOfStream {
            expected: 2,
            found: 1
        })
    );
    assert!(pages.next().unwrap().is_none());
}

#[test]
fn from_reader() -> Result<()> {
    let text = format!("#Version: 1.0\n#Fields: a b\n{}", sample_text(1234));
    let compressed = gzip(text.as_bytes());
    let options = ReadOptions {
        chunk_size: 100,
        page_size: 100,
        ..Default::default()
    };
    let mut pages = read_pages(Cursor::new(compressed), &options)?;
    let mut lines = vec![];
    while let Some(page) = pages.next()? {
        assert!(page.len() <= 100);
        lines.extend(page.lines().iter().cloned());
    }
    assert_eq!(lines, expected_lines(&sample_text(1234)));
    assert_eq!(pages.pages_read(), 13);
    Ok(())
}

#[test]
fn invalid_options() {
    let options = ReadOptions {
        page_size: 0,
        ..Default::default()
    };
    let result = get_page_iterator(std::iter::empty::<Result<Vec<u8>>>(), &options);
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
}
