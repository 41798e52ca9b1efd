//! Property coverage for the slow-follower eviction policy (design
//! notes 5/9): no matter how many chunks are broadcast or how small
//! the sink's capacity is, a follower that drains its channel in time
//! receives every chunk it's sent, in order, and broadcast itself
//! never blocks past the configured timeout.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use httpfstream_core::registry::follower::{Chunk, FollowerRegistry};
use proptest::prelude::*;

fn chunk_payloads() -> impl Strategy<Value = Vec<Vec<u8>>> {
  proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..16), 1..12)
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(24))]

  #[test]
  fn attentive_follower_receives_every_chunk_in_order(capacity in 1usize..8, payloads in chunk_payloads()) {
    let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
    rt.block_on(async move {
      let registry = Arc::new(FollowerRegistry::new());
      let path = PathBuf::from("/prop");
      let mut handle = registry.add(path.clone(), capacity);

      let registry_clone = registry.clone();
      let path_clone = path.clone();
      let payloads_clone = payloads.clone();
      let sender = tokio::spawn(async move {
        for (i, payload) in payloads_clone.into_iter().enumerate() {
          registry_clone
            .broadcast(
              &path_clone,
              Chunk { bytes: Bytes::from(payload), offset_after: i as u64 + 1 },
              Duration::from_millis(200),
            )
            .await;
        }
      });

      let mut received = Vec::new();
      for expected in &payloads {
        let chunk = tokio::time::timeout(Duration::from_secs(2), handle.rx.recv())
          .await
          .expect("broadcast should not hang past its own timeout")
          .expect("sink should still be registered while draining promptly");
        received.push(chunk.bytes.to_vec());
        prop_assert_eq!(&chunk.bytes[..], expected.as_slice());
      }

      sender.await.unwrap();
      prop_assert_eq!(received, payloads);
      Ok(())
    })?;
  }

  #[test]
  fn broadcast_to_an_unattended_sink_always_completes_within_the_timeout(capacity in 1usize..4, extra_sends in 1usize..6) {
    let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
    rt.block_on(async move {
      let registry = Arc::new(FollowerRegistry::new());
      let path = PathBuf::from("/prop-unattended");
      let handle = registry.add(path.clone(), capacity);

      let send_timeout = Duration::from_millis(30);
      for i in 0..(capacity + extra_sends) {
        let started = tokio::time::Instant::now();
        registry
          .broadcast(
            &path,
            Chunk { bytes: Bytes::from_static(b"x"), offset_after: i as u64 + 1 },
            send_timeout,
          )
          .await;
        // a bit of slack over the timeout for scheduling jitter
        prop_assert!(started.elapsed() < send_timeout * 4);
      }

      drop(handle);
      Ok(())
    })?;
  }
}
