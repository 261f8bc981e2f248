use bytes::Bytes;
use futures::{StreamExt, executor::block_on, stream};
use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use myro::protocol::{
    Envelope, EnvelopeEncoder,
    envelope::{UNBOUNDED_ENVELOPE_SIZE, envelopes},
};

/// Buffer owner that counts its release.
struct Tracked {
    data: Vec<u8>,
    drops: Arc<AtomicUsize>,
}

impl AsRef<[u8]> for Tracked {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn tracked(inputs: &[&str], drops: &Arc<AtomicUsize>) -> Vec<Bytes> {
    inputs
        .iter()
        .map(|data| Bytes::from_owner(Tracked { data: data.as_bytes().to_vec(), drops: drops.clone() }))
        .collect()
}

fn encode(size: usize, sequence: u8, inputs: Vec<Bytes>) -> Vec<Envelope> {
    let mut encoder = EnvelopeEncoder::new(size, sequence);
    let mut out = vec![];
    for input in inputs {
        encoder.push(input, &mut out).unwrap();
    }
    out.push(encoder.finish().unwrap());
    out
}

fn inputs() -> Vec<Vec<&'static str>> {
    vec![
        vec![],
        vec![""],
        vec!["a"],
        vec!["abc", "", "defg"],
        vec!["0123456789abcdef"],
        vec!["01", "23", "45", "67"],
        vec!["lorem ipsum dolor", " sit", " amet, consectetur adipiscing elit"],
    ]
}

#[test]
fn payloads_reproduce_input() {
    for size in [1, 2, 3, 4, 7, 8, 16, 1024, UNBOUNDED_ENVELOPE_SIZE] {
        for (i, input) in inputs().into_iter().enumerate() {
            let expected = input.concat().into_bytes();
            let out = encode(size, 250, input.into_iter().map(|s|Bytes::from_static(s.as_bytes())).collect());

            let payload = out.iter().flat_map(|e|e.payload().to_vec()).collect::<Vec<_>>();
            assert_eq!(payload, expected, "size {size}, input {i}");

            let (last, full) = out.split_last().unwrap();
            assert!(full.iter().all(|e|e.len() == size), "size {size}, input {i}");
            assert!(last.len() < size, "size {size}, input {i}");

            if !expected.is_empty() && expected.len() % size == 0 {
                assert!(last.is_empty(), "size {size}, input {i}");
            }

            for (nth, envelope) in out.iter().enumerate() {
                assert_eq!(envelope.sequence(), 250u8.wrapping_add(nth as u8));
                let header = envelope.header();
                let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
                assert_eq!(len, envelope.len());
            }
        }
    }
}

#[test]
fn empty_input_is_one_empty_envelope() {
    for input in [vec![], vec![Bytes::new()]] {
        let out = encode(4, 0, input);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_empty());
        assert_eq!(&out[0].header()[..], &[0, 0, 0, 0]);
    }
}

#[test]
fn sequence_wraps() {
    let out = encode(1, 255, vec![Bytes::from_static(b"ab")]);
    let seqs = out.iter().map(Envelope::sequence).collect::<Vec<_>>();
    assert_eq!(seqs, [255, 0, 1]);
}

#[test]
fn buffers_released_after_completion() {
    for size in [1, 3, 5, 64] {
        let drops = Arc::new(AtomicUsize::new(0));
        let inputs = tracked(&["abc", "defgh", "", "ijklmnop"], &drops);
        let len = inputs.len();

        let out = encode(size, 0, inputs);
        drop(out);

        assert_eq!(drops.load(Ordering::SeqCst), len, "size {size}");
    }
}

#[test]
fn buffers_released_after_cancellation() {
    let drops = Arc::new(AtomicUsize::new(0));
    let inputs = tracked(&["abcdef", "gh", "ijklmnop", "qr"], &drops);
    let len = inputs.len();

    let source = stream::iter(inputs.into_iter().map(Ok::<_, io::Error>));
    let mut stream = Box::pin(envelopes(source, 4, 0));

    let first = block_on(stream.next()).unwrap().unwrap();
    assert_eq!(&first.payload()[..], b"abcd");

    drop(first);
    drop(stream);

    assert_eq!(drops.load(Ordering::SeqCst), len);
}

#[test]
fn stream_envelopes() {
    let source = stream::iter([
        Ok::<_, io::Error>(Bytes::from_static(b"abc")),
        Ok(Bytes::from_static(b"defgh")),
    ]);
    let out = block_on(envelopes(source, 4, 3).collect::<Vec<_>>());
    let out = out.into_iter().collect::<Result<Vec<_>, _>>().unwrap();

    let lens = out.iter().map(Envelope::len).collect::<Vec<_>>();
    let seqs = out.iter().map(Envelope::sequence).collect::<Vec<_>>();
    assert_eq!(lens, [4, 4, 0]);
    assert_eq!(seqs, [3, 4, 5]);
}

#[test]
fn stream_upstream_error() {
    let source = stream::iter([
        Ok(Bytes::from_static(b"ab")),
        Err(io::Error::other("connection reset")),
        Ok(Bytes::from_static(b"cd")),
    ]);
    let out = block_on(envelopes(source, 4, 0).collect::<Vec<_>>());

    assert_eq!(out.len(), 1);
    let err = out.into_iter().next().unwrap().unwrap_err();
    assert!(matches!(err.kind(), myro::ErrorKind::Io(_)));
}
