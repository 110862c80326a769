// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Drives the init/config-bundle/chunk-request exchange over a real TCP
//! loopback socket, coordinator side played by hand, to confirm the framing
//! and frame-ordering survive an actual `accept`/`connect` round trip.

use skycat::infrastructure::protocol_codec::Connection;
use skycat_domain::protocol::{Frame, C_INIT_R, S_INIT_R};
use skycat_domain::transaction::{TransactionId, INVALID_ID};
use tokio::net::{TcpListener, TcpStream};

#[tokio::test]
async fn init_exchange_and_end_of_work_round_trip_over_a_real_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut conn = Connection::new(stream);

        conn.recv_expecting(C_INIT_R).await.unwrap();
        conn.send(Frame::SInitR {
            name: "coordinator".into(),
            objects: 1000,
            visits: 5,
            seed: 7,
            cfg_blob: "cfg".into(),
            ingest_dict: "{}".into(),
        })
        .await
        .unwrap();
        conn.send(Frame::SPcfgA {
            index: 0,
            filename: String::new(),
            contents: String::new(),
        })
        .await
        .unwrap();
        conn.send(Frame::SPcfgA {
            index: 0,
            filename: String::new(),
            contents: String::new(),
        })
        .await
        .unwrap();

        match conn.recv().await.unwrap() {
            Frame::CChunkR { max_count } => assert_eq!(max_count, 20),
            other => panic!("unexpected frame {other:?}"),
        }
        conn.send(Frame::SCnkLst {
            transaction_id: INVALID_ID,
            chunk_ids: Vec::new(),
        })
        .await
        .unwrap();
    });

    let stream = TcpStream::connect(addr).await.unwrap();
    let mut conn = Connection::new(stream);

    conn.send(Frame::CInitR).await.unwrap();
    let init = conn.recv_expecting(S_INIT_R).await.unwrap();
    match init {
        Frame::SInitR { objects, visits, seed, .. } => {
            assert_eq!((objects, visits, seed), (1000, 5, 7));
        }
        other => panic!("unexpected frame {other:?}"),
    }

    // Two empty-filename bundles: partitioner configs, then pregenerated.
    for _ in 0..2 {
        match conn.recv().await.unwrap() {
            Frame::SPcfgA { filename, .. } => assert!(filename.is_empty()),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    conn.send(Frame::CChunkR { max_count: 20 }).await.unwrap();
    match conn.recv().await.unwrap() {
        Frame::SCnkLst { transaction_id, chunk_ids } => {
            assert_eq!(transaction_id, INVALID_ID);
            assert!(chunk_ids.is_empty());
        }
        other => panic!("unexpected frame {other:?}"),
    }

    server.await.unwrap();
}

#[test]
fn transaction_id_sentinel_is_distinguishable_from_a_real_id() {
    assert_ne!(INVALID_ID, TransactionId::new(0));
    assert_ne!(INVALID_ID, TransactionId::new(-1));
}
