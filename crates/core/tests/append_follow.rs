//! End-to-end coverage of the scenarios named in the design notes
//! (component design 4.5/4.6, "testable properties"): a real
//! `Server::bind` instance driven over real TCP by the `client`
//! library, with no component mocked out.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use httpfstream_core::client::{self, ClientError, FollowBody};
use httpfstream_core::config::Config;
use httpfstream_core::dispatch::Engine;
use httpfstream_core::server::{self, Server};
use httpfstream_core::store::{FsStore, Store};
use httpfstream_core::transport::Frame;
use test_support::TempStore;

async fn start_server() -> (Server, TempStore) {
  let td = TempStore::new();
  let store: Arc<dyn Store> = Arc::new(FsStore::new(td.path()));
  let config = Arc::new(Config {
    storage_root: td.path(),
    ..Config::default()
  });
  let engine = Engine::new(store, config);
  let (_tx, rx) = server::shutdown_channel();
  let server = Server::bind("127.0.0.1:0", engine, rx).await.unwrap();
  (server, td)
}

#[tokio::test]
async fn follow_of_an_active_writer_receives_appended_bytes() {
  let (server, _td) = start_server().await;
  let addr = server.local_addr.to_string();

  // The writer must already be active for `follow` to get a live
  // upgrade at all (4.6's dispatch rule: no writer means a plain
  // static body instead).
  let mut writer = client::append(&addr, "/live", Duration::from_secs(5)).await.unwrap();

  let follow_body = client::follow(&addr, "/live").await.unwrap();
  let mut transport = match follow_body {
    FollowBody::Live(t) => t,
    FollowBody::Static(_) => panic!("a writer is active; expected a live upgrade"),
  };

  writer.write(Bytes::from_static(b"hello")).await.unwrap();

  let read_wait = Duration::from_secs(5);
  let frame = loop {
    match transport.recv(read_wait).await.unwrap() {
      Some(Frame::Payload(bytes)) => break bytes,
      Some(Frame::Ping | Frame::Pong) => continue,
      other => panic!("unexpected frame: {other:?}"),
    }
  };
  assert_eq!(&frame[..], b"hello");

  writer.close().await.unwrap();
  server.abort();
}

#[tokio::test]
async fn appended_bytes_land_on_disk_in_order() {
  let (server, td) = start_server().await;
  let addr = server.local_addr.to_string();

  let mut writer = client::append(&addr, "/log", Duration::from_secs(5)).await.unwrap();
  writer.write(Bytes::from_static(b"abc")).await.unwrap();
  writer.write(Bytes::from_static(b"def")).await.unwrap();
  writer.close().await.unwrap();

  // give the write a moment to flush before reading the file back
  tokio::time::sleep(Duration::from_millis(50)).await;

  let contents = std::fs::read(td.path().join("log")).unwrap();
  assert_eq!(contents, b"abcdef");

  server.abort();
}

#[tokio::test]
async fn follow_of_preexisting_file_with_no_active_writer_gets_static_body() {
  let (server, td) = start_server().await;
  std::fs::write(td.path().join("done"), b"already written").unwrap();
  let addr = server.local_addr.to_string();

  match client::follow(&addr, "/done").await.unwrap() {
    FollowBody::Static(bytes) => assert_eq!(&bytes[..], b"already written"),
    FollowBody::Live(_) => panic!("no writer is active; expected a static body"),
  }

  server.abort();
}

#[tokio::test]
async fn follow_of_nonexistent_path_is_not_found() {
  let (server, _td) = start_server().await;
  let addr = server.local_addr.to_string();

  let err = client::follow(&addr, "/nope").await.unwrap_err();
  assert!(matches!(err, ClientError::NotFound));

  server.abort();
}

#[tokio::test]
async fn second_append_to_an_active_path_is_rejected() {
  let (server, _td) = start_server().await;
  let addr = server.local_addr.to_string();

  let _first = client::append(&addr, "/single", Duration::from_secs(5)).await.unwrap();
  let second = client::append(&addr, "/single", Duration::from_secs(5)).await.unwrap_err();
  assert!(matches!(second, ClientError::WriterConflict));

  server.abort();
}

#[tokio::test]
async fn catch_up_then_tail_delivers_every_chunk_exactly_once() {
  let (server, _td) = start_server().await;
  let addr = server.local_addr.to_string();

  let mut writer = client::append(&addr, "/stream", Duration::from_secs(5)).await.unwrap();
  writer.write(Bytes::from_static(b"abc")).await.unwrap();
  writer.write(Bytes::from_static(b"foo")).await.unwrap();
  // Let the appends land before the follower attaches, so "abc" and
  // "foo" must come back through catch-up rather than the tail.
  tokio::time::sleep(Duration::from_millis(50)).await;

  let follow_body = client::follow(&addr, "/stream").await.unwrap();
  let mut transport = match follow_body {
    FollowBody::Live(t) => t,
    FollowBody::Static(_) => panic!("a writer is active; expected a live upgrade"),
  };

  writer.write(Bytes::from_static(b"bar")).await.unwrap();
  writer.write(Bytes::from_static(b"baz")).await.unwrap();
  writer.write(Bytes::from_static(b"qux")).await.unwrap();

  let read_wait = Duration::from_secs(5);
  let mut received = Vec::new();
  while received.len() < b"abcfoobarbazqux".len() {
    match transport.recv(read_wait).await.unwrap() {
      Some(Frame::Payload(bytes)) => received.extend_from_slice(&bytes),
      Some(Frame::Ping | Frame::Pong) => continue,
      other => panic!("unexpected frame: {other:?}"),
    }
  }
  assert_eq!(received, b"abcfoobarbazqux");

  writer.close().await.unwrap();
  server.abort();
}

#[tokio::test]
async fn append_session_with_no_payload_leaves_an_empty_file() {
  let (server, td) = start_server().await;
  let addr = server.local_addr.to_string();

  let writer = client::append(&addr, "/foo", Duration::from_secs(5)).await.unwrap();
  writer.close().await.unwrap();

  tokio::time::sleep(Duration::from_millis(50)).await;

  let contents = std::fs::read(td.path().join("foo")).unwrap();
  assert_eq!(contents, b"");

  match client::follow(&addr, "/foo").await.unwrap() {
    FollowBody::Static(bytes) => assert_eq!(&bytes[..], b""),
    FollowBody::Live(_) => panic!("writer has closed; expected a static body"),
  }

  server.abort();
}

#[tokio::test]
async fn empty_append_produces_no_frame_and_no_persisted_bytes() {
  let (server, td) = start_server().await;
  let addr = server.local_addr.to_string();

  let mut writer = client::append(&addr, "/empty", Duration::from_secs(5)).await.unwrap();

  let follow_body = client::follow(&addr, "/empty").await.unwrap();
  let mut transport = match follow_body {
    FollowBody::Live(t) => t,
    FollowBody::Static(_) => panic!("a writer is active; expected a live upgrade"),
  };

  writer.write(Bytes::new()).await.unwrap();
  // Give the empty append a moment to reach the server before the
  // follow-up non-empty write, so an erroneous broadcast of the empty
  // frame would arrive first if the no-op branch were ever skipped.
  tokio::time::sleep(Duration::from_millis(50)).await;
  assert_eq!(std::fs::read(td.path().join("empty")).unwrap().len(), 0);

  writer.write(Bytes::from_static(b"hello")).await.unwrap();

  let read_wait = Duration::from_secs(5);
  let frame = loop {
    match transport.recv(read_wait).await.unwrap() {
      Some(Frame::Payload(bytes)) => break bytes,
      Some(Frame::Ping | Frame::Pong) => continue,
      other => panic!("unexpected frame: {other:?}"),
    }
  };
  // The empty append must never have produced a frame of its own: the
  // first (and only) payload frame the follower receives is "hello",
  // not a zero-length frame followed by "hello".
  assert_eq!(&frame[..], b"hello");

  writer.close().await.unwrap();
  server.abort();
}
